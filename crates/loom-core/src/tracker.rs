// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Nested operation tracking for diagnostics.
//!
//! Long chains of work (realizing a service, building a construction plan,
//! triggering an event up a component hierarchy) are wrapped in tracked
//! operations. Each thread keeps a stack of operation descriptions; when an
//! operation fails, the stack at the point of failure is captured and logged
//! once by the outermost operation, giving a readable "how did we get here".

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::Instant;

thread_local! {
    static OPERATIONS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static FAILURE_TRACE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
    static TIMING: Cell<bool> = const { Cell::new(false) };
}

/// Tracks nested operations on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationTracker;

impl OperationTracker {
    /// Creates a tracker. Trackers are stateless handles onto thread storage.
    pub fn new() -> Self {
        Self
    }

    /// Enables per-operation timing in the trace log for the current thread.
    pub fn set_timing(enabled: bool) {
        TIMING.with(|timing| timing.set(enabled));
    }

    /// Runs `op` as a tracked operation.
    ///
    /// Errors are returned unchanged; the description stack at the innermost
    /// failure is logged at error level when the outermost operation unwinds.
    pub fn run<R, E: fmt::Display>(
        &self,
        description: impl Into<String>,
        op: impl FnOnce() -> Result<R, E>,
    ) -> Result<R, E> {
        let description = description.into();
        let depth = OPERATIONS.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(description.clone());
            stack.len()
        });
        log::trace!("[{depth:>2}] --> {description}");
        let started = TIMING.with(Cell::get).then(Instant::now);

        let result = op();

        if result.is_err() {
            let trace = Self::current_trace();
            FAILURE_TRACE.with(|failure| {
                failure.borrow_mut().get_or_insert(trace);
            });
        }
        OPERATIONS.with(|stack| {
            stack.borrow_mut().pop();
        });

        match &result {
            Ok(_) => match started {
                Some(started) => log::trace!(
                    "[{depth:>2}] <-- {description} [{:.3} ms]",
                    started.elapsed().as_secs_f64() * 1000.0
                ),
                None => log::trace!("[{depth:>2}] <-- {description}"),
            },
            Err(error) if depth == 1 => {
                let trace = FAILURE_TRACE
                    .with(|failure| failure.borrow_mut().take())
                    .unwrap_or_default();
                log::error!("{}", format_trace(&trace, error));
            }
            Err(_) => {}
        }
        result
    }

    /// The descriptions of every operation in progress on this thread, outermost first.
    pub fn current_trace() -> Vec<String> {
        OPERATIONS.with(|stack| stack.borrow().clone())
    }

    /// Number of operations in progress on this thread.
    pub fn depth() -> usize {
        OPERATIONS.with(|stack| stack.borrow().len())
    }
}

/// Formats an operations trace the way it is logged.
pub fn format_trace(trace: &[String], error: &dyn fmt::Display) -> String {
    let mut message = format!("Operation failed: {error}\nOperations trace:");
    for (index, step) in trace.iter().enumerate() {
        message.push_str(&format!("\n[{:>2}] {step}", index + 1));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_operations_expose_trace() {
        let tracker = OperationTracker::new();
        let trace = tracker
            .run("outer", || {
                tracker.run("inner", || Ok::<_, String>(OperationTracker::current_trace()))
            })
            .unwrap();
        assert_eq!(trace, vec!["outer".to_string(), "inner".to_string()]);
        assert_eq!(OperationTracker::depth(), 0);
    }

    #[test]
    fn test_errors_pass_through_unchanged() {
        let tracker = OperationTracker::new();
        let result: Result<(), String> = tracker.run("outer", || {
            tracker.run("inner", || Err("boom".to_string()))
        });
        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(OperationTracker::depth(), 0);
        assert!(FAILURE_TRACE.with(|failure| failure.borrow().is_none()));
    }

    #[test]
    fn test_format_trace_numbers_steps() {
        let text = format_trace(&["a".into(), "b".into()], &"bad");
        assert_eq!(text, "Operation failed: bad\nOperations trace:\n[ 1] a\n[ 2] b");
    }
}
