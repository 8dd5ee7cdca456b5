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

//! Type keys and injection markers.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A `TypeId` paired with the type's name for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The full type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Markers steering how a single dependency is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inject {
    service_id: Option<String>,
    named: Option<String>,
    explicit: bool,
    autobuild: bool,
}

impl Inject {
    /// No markers: resources first, then the provider chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve to the service with exactly this id.
    #[must_use]
    pub fn service_id(mut self, id: impl Into<String>) -> Self {
        self.service_id = Some(id.into());
        self
    }

    /// Resolve to the service registered under this name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.named = Some(name.into());
        self
    }

    /// Explicit injection: skip the caller's injection resources.
    #[must_use]
    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }

    /// Always build a fresh instance instead of sharing a service.
    #[must_use]
    pub fn autobuild(mut self) -> Self {
        self.autobuild = true;
        self
    }

    /// The explicit service id, if any.
    pub fn get_service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    /// The injection name, if any.
    pub fn get_named(&self) -> Option<&str> {
        self.named.as_deref()
    }

    /// Whether resources are skipped.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Whether a fresh instance is required.
    pub fn is_autobuild(&self) -> bool {
        self.autobuild
    }
}

fn value_is<T: Any>(value: &(dyn Any + Send + Sync)) -> bool {
    value.is::<T>()
}

/// A dependency of a constructor, field or post-injection method: the type
/// being asked for and the markers attached to it.
#[derive(Clone)]
pub struct Dependency {
    key: TypeKey,
    inject: Inject,
    accepts: fn(&(dyn Any + Send + Sync)) -> bool,
}

impl Dependency {
    /// A dependency on `T` with no markers.
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self::with::<T>(Inject::new())
    }

    /// A dependency on `T` with the given markers.
    pub fn with<T: Any + Send + Sync>(inject: Inject) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            inject,
            accepts: value_is::<T>,
        }
    }

    /// See [`Inject::service_id`].
    #[must_use]
    pub fn service_id(mut self, id: impl Into<String>) -> Self {
        self.inject = self.inject.service_id(id);
        self
    }

    /// See [`Inject::named`].
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.inject = self.inject.named(name);
        self
    }

    /// See [`Inject::explicit`].
    #[must_use]
    pub fn explicit(mut self) -> Self {
        self.inject = self.inject.explicit();
        self
    }

    /// See [`Inject::autobuild`].
    #[must_use]
    pub fn autobuild(mut self) -> Self {
        self.inject = self.inject.autobuild();
        self
    }

    /// The requested type.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// The markers.
    pub fn inject(&self) -> &Inject {
        &self.inject
    }

    /// Whether a resolved value actually has the requested type.
    pub fn accepts(&self, value: &(dyn Any + Send + Sync)) -> bool {
        (self.accepts)(value)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("key", &self.key)
            .field("inject", &self.inject)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_key_equality_ignores_name_formatting() {
        assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
        assert_ne!(TypeKey::of::<String>(), TypeKey::of::<u32>());
        assert!(TypeKey::of::<String>().name().ends_with("String"));
    }

    #[test]
    fn test_dependency_accepts_only_its_type() {
        let dependency = Dependency::of::<u32>().named("count");
        assert!(dependency.accepts(&5u32));
        assert!(!dependency.accepts(&"five"));
        assert_eq!(dependency.inject().get_named(), Some("count"));
    }
}
