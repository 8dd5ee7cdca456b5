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

//! Request-scoped storage cells.
//!
//! Pages and their element trees are built once and shared by every request
//! thread. Anything that changes while a request is processed (the rendering
//! flag, render variables, cached parameter values, the persistent field
//! bundle) lives in a [`PerThreadValue`] owned by the shared object, so each
//! request thread sees its own slot.
//!
//! Slots are torn down by [`cleanup`], which a [`RequestScope`] guard calls
//! when the outermost scope on a thread is dropped.
//!
//! ```rust
//! use loom_core::per_thread::{PerThreadValue, RequestScope};
//!
//! let rendering = PerThreadValue::<bool>::new();
//! {
//!     let _scope = RequestScope::begin();
//!     rendering.set(true);
//!     assert_eq!(rendering.get(), Some(true));
//! }
//! assert_eq!(rendering.get(), None);
//! ```

use ahash::AHashMap;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static SLOTS: RefCell<AHashMap<u64, Box<dyn Any>>> = RefCell::new(AHashMap::new());
    static CLEANUP_LISTENERS: RefCell<Vec<Box<dyn FnOnce()>>> = const { RefCell::new(Vec::new()) };
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// A value cell whose content is private to the calling thread.
///
/// The handle itself is `Send + Sync` and can be stored in shared structures;
/// only the stored values are thread-bound. Keys are never reused, so a
/// dropped handle can never alias a newer one.
pub struct PerThreadValue<T> {
    key: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> PerThreadValue<T> {
    /// Allocates a new, empty cell.
    pub fn new() -> Self {
        Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            _marker: PhantomData,
        }
    }

    /// Stores a value for the current thread, replacing any previous one.
    pub fn set(&self, value: T) {
        let previous = SLOTS.with(|slots| slots.borrow_mut().insert(self.key, Box::new(value)));
        // Dropped outside the borrow: a value's destructor may touch other cells.
        drop(previous);
    }

    /// Whether the current thread has stored a value.
    pub fn exists(&self) -> bool {
        SLOTS.with(|slots| slots.borrow().contains_key(&self.key))
    }

    /// Removes and returns the current thread's value.
    pub fn remove(&self) -> Option<T> {
        let boxed = SLOTS.with(|slots| slots.borrow_mut().remove(&self.key))?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    /// Runs `f` with mutable access to the current thread's slot.
    ///
    /// The value is moved out of thread storage while `f` runs, so `f` may
    /// freely use other cells. Reading this same cell from inside `f`
    /// observes an empty slot.
    pub fn update<R>(&self, f: impl FnOnce(&mut Option<T>) -> R) -> R {
        let mut slot = self.remove();
        let result = f(&mut slot);
        if let Some(value) = slot {
            self.set(value);
        }
        result
    }

    /// Runs `f` with shared access to the current thread's value.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.update(|slot| f(slot.as_ref()))
    }
}

impl<T: Clone + 'static> PerThreadValue<T> {
    /// Returns a clone of the current thread's value.
    pub fn get(&self) -> Option<T> {
        SLOTS.with(|slots| {
            slots
                .borrow()
                .get(&self.key)
                .and_then(|boxed| boxed.downcast_ref::<T>())
                .cloned()
        })
    }

    /// Returns the current thread's value or `default` when unset.
    pub fn get_or(&self, default: T) -> T {
        self.get().unwrap_or(default)
    }
}

impl<T: 'static> Default for PerThreadValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PerThreadValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerThreadValue").field("key", &self.key).finish()
    }
}

/// Registers a callback run by the next [`cleanup`] on this thread.
pub fn add_cleanup_listener(listener: impl FnOnce() + 'static) {
    CLEANUP_LISTENERS.with(|listeners| listeners.borrow_mut().push(Box::new(listener)));
}

/// Discards every per-thread value stored by the current thread and runs the
/// registered cleanup listeners.
pub fn cleanup() {
    let listeners = CLEANUP_LISTENERS.with(|listeners| std::mem::take(&mut *listeners.borrow_mut()));
    for listener in listeners {
        listener();
    }

    let slots = SLOTS.with(|slots| std::mem::take(&mut *slots.borrow_mut()));
    log::trace!("Discarding {} per-thread value(s)", slots.len());
    drop(slots);
}

/// Guard marking the extent of a request on the current thread.
///
/// Scopes nest; only dropping the outermost one triggers [`cleanup`].
#[derive(Debug)]
pub struct RequestScope {
    _not_send: PhantomData<*const ()>,
}

impl RequestScope {
    /// Enters a request scope on the current thread.
    pub fn begin() -> Self {
        SCOPE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }

    /// Whether the current thread is inside a request scope.
    pub fn is_active() -> bool {
        SCOPE_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let remaining = SCOPE_DEPTH.with(|depth| {
            let next = depth.get().saturating_sub(1);
            depth.set(next);
            next
        });
        if remaining == 0 {
            cleanup();
        }
    }
}
