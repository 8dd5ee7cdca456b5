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

//! A one-shot lock guarding structures that become read-only after construction.

use std::sync::atomic::{AtomicBool, Ordering};

/// Error returned when a mutation is attempted after a [`OneShotLock`] closed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{subject} is locked and may no longer be modified")]
pub struct LockedError {
    /// What was being modified.
    pub subject: String,
}

/// Once [`lock`](OneShotLock::lock) has been called, every later
/// [`check`](OneShotLock::check) fails. There is no way to unlock.
#[derive(Debug, Default)]
pub struct OneShotLock {
    locked: AtomicBool,
}

impl OneShotLock {
    /// Creates an open lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if the lock has been closed.
    pub fn check(&self, subject: &str) -> Result<(), LockedError> {
        if self.locked.load(Ordering::Acquire) {
            Err(LockedError {
                subject: subject.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Closes the lock. Fails if it was already closed.
    pub fn lock(&self, subject: &str) -> Result<(), LockedError> {
        if self.locked.swap(true, Ordering::AcqRel) {
            return Err(LockedError {
                subject: subject.to_string(),
            });
        }
        Ok(())
    }

    /// Whether the lock has been closed.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_until_locked() {
        let lock = OneShotLock::new();
        assert!(lock.check("page").is_ok());
        lock.lock("page").unwrap();
        let err = lock.check("page").unwrap_err();
        assert_eq!(err.subject, "page");
    }

    #[test]
    fn test_lock_twice_fails() {
        let lock = OneShotLock::new();
        lock.lock("page").unwrap();
        assert!(lock.lock("page").is_err());
        assert!(lock.is_locked());
    }
}
