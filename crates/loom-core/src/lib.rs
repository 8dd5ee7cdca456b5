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

//! # Loom Core
//!
//! Foundational crate containing the contracts shared by every other Loom crate:
//! source locations, case-insensitive name maps, request-scoped per-thread
//! storage, the markup writer contract, the constraint orderer used for mixins,
//! operation tracing, and the inversion-of-control construction-plan substrate.

#![warn(missing_docs)]

pub mod graph;
pub mod ioc;
pub mod location;
pub mod lock;
pub mod markup;
pub mod named_set;
pub mod per_thread;
pub mod selector;
pub mod tracker;

pub use location::{Locatable, Location};
pub use lock::{LockedError, OneShotLock};
pub use markup::{ElementHandle, MarkupWriter, StringMarkupWriter};
pub use named_set::NamedSet;
pub use per_thread::{PerThreadValue, RequestScope};
pub use selector::ComponentResourceSelector;
pub use tracker::OperationTracker;

/// The boxed error type returned by user-supplied code (component handlers,
/// service factories, instantiators).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
