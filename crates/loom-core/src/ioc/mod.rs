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

//! # Inversion of Control
//!
//! An explicit service registry and the construction plans used to build
//! objects out of it.
//!
//! Services are declared up front on a [`RegistryBuilder`], keyed by a
//! case-insensitive id and by their concrete type. Objects that need
//! dependencies describe themselves through [`Injectable::plan`]: one
//! constructor with its parameters, then any number of field injections and
//! post-injection method calls. Turning that description into a
//! [`ConstructionPlan`] resolves every dependency exactly once; invoking the
//! plan runs the constructor and steps again each time.
//!
//! Each dependency is resolved in a fixed order:
//!
//! 1. an explicit service id ([`Inject::service_id`]),
//! 2. a named service ([`Inject::named`]),
//! 3. the injection resources of the caller (skipped for [`Inject::explicit`]),
//! 4. a fresh autobuilt instance ([`Inject::autobuild`]),
//! 5. the object provider chain, ending with lookup by type.
//!
//! ```rust
//! use loom_core::ioc::{Args, Dependency, Injectable, ObjectLocatorExt, PlanBuilder, RegistryBuilder};
//! use std::sync::Arc;
//!
//! struct Clock;
//! struct Greeter { clock: Arc<Clock> }
//!
//! impl Injectable for Greeter {
//!     fn plan(plan: &mut PlanBuilder<Self>) {
//!         plan.constructor(vec![Dependency::of::<Clock>()], |args: &Args| {
//!             Ok(Greeter { clock: args.get(0)? })
//!         });
//!     }
//! }
//!
//! let registry = RegistryBuilder::new()
//!     .instance("Clock", Clock)
//!     .service::<Greeter>("Greeter")
//!     .build()
//!     .unwrap();
//!
//! let greeter = registry.service::<Greeter>("greeter").unwrap();
//! assert!(Arc::ptr_eq(&greeter.clock, &registry.service::<Clock>("Clock").unwrap()));
//! ```

mod error;
mod key;
mod plan;
mod registry;
mod resources;

pub use error::IocError;
pub use key::{Dependency, Inject, TypeKey};
pub use plan::{calculate_injection, Args, ConstructionPlan, Injectable, PlanBuilder};
pub use registry::{ObjectLocator, ObjectLocatorExt, ObjectProvider, Registry, RegistryBuilder};
pub use resources::{
    InjectionResources, MapInjectionResources, NoResources, ServiceId, ServiceLog, ServiceResources,
};

use std::any::Any;
use std::sync::Arc;

/// A type-erased, shared service or injected value.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Recovers the concrete type of a [`Service`].
pub fn downcast<T: Any + Send + Sync>(service: Service, context: &str) -> Result<Arc<T>, IocError> {
    service.downcast::<T>().map_err(|_| IocError::WrongType {
        context: context.to_string(),
        expected: std::any::type_name::<T>(),
    })
}
