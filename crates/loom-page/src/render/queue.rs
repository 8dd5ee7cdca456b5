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

use super::{RenderCommand, RenderContext};
use crate::error::RenderError;
use crate::page::Page;
use loom_core::MarkupWriter;
use std::sync::Arc;

/// The stack of pending render commands for one render.
///
/// Also tracks which components are currently rendering so a failure can
/// report the whole component stack.
#[derive(Debug, Default)]
pub struct RenderQueue {
    commands: Vec<Arc<dyn RenderCommand>>,
    active_components: Vec<String>,
    tracing: bool,
    trace: Vec<String>,
    executed: usize,
}

impl RenderQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables recording (and trace logging) of every executed command.
    #[must_use]
    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    /// Pushes a command; the most recently pushed command runs next.
    pub fn push(&mut self, command: Arc<dyn RenderCommand>) {
        self.commands.push(command);
    }

    /// Pushes a command when there is one.
    pub fn push_opt(&mut self, command: Option<&Arc<dyn RenderCommand>>) {
        if let Some(command) = command {
            self.commands.push(Arc::clone(command));
        }
    }

    /// Records that a component started rendering.
    pub fn start_component(&mut self, complete_id: &str) {
        self.active_components.push(complete_id.to_string());
    }

    /// Records that the most recently started component finished rendering.
    pub fn end_component(&mut self) {
        self.active_components.pop();
    }

    /// Complete ids of the components currently rendering, outermost first.
    pub fn active_components(&self) -> &[String] {
        &self.active_components
    }

    /// Number of commands still pending.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is pending.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The commands executed so far, in order. Only recorded when tracing.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Number of commands executed so far.
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Drains the queue, executing each command until none remain.
    ///
    /// A failing command stops the render; the error is wrapped with the
    /// command and the active component stack.
    pub fn run(&mut self, page: &Page, writer: &mut dyn MarkupWriter) -> Result<(), RenderError> {
        while let Some(command) = self.commands.pop() {
            self.executed += 1;
            if self.tracing {
                let name = format!("{command:?}");
                log::trace!(target: "loom::render", "Executing: {name}");
                self.trace.push(name);
            }

            let mut ctx = RenderContext {
                page,
                writer: &mut *writer,
                queue: &mut *self,
            };
            if let Err(error) = command.render(&mut ctx) {
                return Err(RenderError::Queue {
                    command: format!("{command:?}"),
                    active_components: std::mem::take(&mut self.active_components),
                    source: Box::new(error),
                });
            }
        }
        Ok(())
    }
}
