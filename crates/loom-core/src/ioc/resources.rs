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

//! Directly resolvable injection resources.
//!
//! Before falling back to the registry, a dependency is offered to the
//! caller's [`InjectionResources`]: values that only make sense in the
//! context of what is being built, such as the id of the service under
//! construction or a log target named after it.

use super::{Service, TypeKey};
use ahash::AHashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// A lookup of context-specific values by type.
pub trait InjectionResources: Send + Sync {
    /// Returns a value for the requested type, if this context has one.
    fn find_resource(&self, key: &TypeKey) -> Option<Service>;
}

/// Resources with nothing in them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl InjectionResources for NoResources {
    fn find_resource(&self, _key: &TypeKey) -> Option<Service> {
        None
    }
}

/// Resources backed by a type map.
#[derive(Clone, Default)]
pub struct MapInjectionResources {
    values: AHashMap<TypeId, Service>,
}

impl MapInjectionResources {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource keyed by its concrete type, replacing any previous one.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Adds an already shared resource.
    pub fn insert_arc<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        self.values.insert(TypeId::of::<T>(), value);
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl InjectionResources for MapInjectionResources {
    fn find_resource(&self, key: &TypeKey) -> Option<Service> {
        self.values.get(&key.id()).cloned()
    }
}

/// The id of the service being constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceId(pub String);

/// A log target dedicated to one service, `loom::service::<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLog {
    target: String,
}

impl ServiceLog {
    /// The log target for the given service id.
    pub fn for_service(id: &str) -> Self {
        Self {
            target: format!("loom::service::{id}"),
        }
    }

    /// The target string to pass to the `log` macros.
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// The resources offered while a service is realized: its [`ServiceId`],
/// its [`ServiceLog`], then the registry-wide resources.
#[derive(Clone)]
pub struct ServiceResources {
    id: Arc<ServiceId>,
    log: Arc<ServiceLog>,
    shared: Arc<MapInjectionResources>,
}

impl ServiceResources {
    /// Resources for the service with the given id.
    pub fn new(id: &str, shared: Arc<MapInjectionResources>) -> Self {
        Self {
            id: Arc::new(ServiceId(id.to_string())),
            log: Arc::new(ServiceLog::for_service(id)),
            shared,
        }
    }

    /// The service id.
    pub fn service_id(&self) -> &str {
        &self.id.0
    }
}

impl InjectionResources for ServiceResources {
    fn find_resource(&self, key: &TypeKey) -> Option<Service> {
        if *key == TypeKey::of::<ServiceId>() {
            return Some(self.id.clone());
        }
        if *key == TypeKey::of::<ServiceLog>() {
            return Some(self.log.clone());
        }
        self.shared.find_resource(key)
    }
}
