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

//! The service registry.
//!
//! Services are declared on a [`RegistryBuilder`] and realized lazily, once,
//! the first time they are requested. Lookup works by case-insensitive id or
//! by concrete type; requests that name neither fall through a chain of
//! [`ObjectProvider`]s before the by-type lookup.

use super::{
    downcast, ConstructionPlan, Inject, Injectable, InjectionResources, IocError,
    MapInjectionResources, PlanBuilder, Service, ServiceResources, TypeKey,
};
use crate::{HandlerError, OperationTracker};
use ahash::AHashMap;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

thread_local! {
    static REALIZING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Read access to services and injectable objects.
pub trait ObjectLocator: Send + Sync {
    /// The service with the given id, which must be of the requested type.
    fn service_by_id(&self, id: &str, key: &TypeKey) -> Result<Service, IocError>;

    /// The single service of the requested type.
    fn service_by_type(&self, key: &TypeKey) -> Result<Service, IocError>;

    /// Consults the object provider chain, then falls back to
    /// [`service_by_type`](ObjectLocator::service_by_type).
    fn object(&self, key: &TypeKey, inject: &Inject) -> Result<Service, IocError>;

    /// A fresh instance of the requested type, built from its recipe.
    fn autobuild_service(&self, key: &TypeKey) -> Result<Service, IocError>;
}

/// Typed conveniences over any [`ObjectLocator`].
pub trait ObjectLocatorExt: ObjectLocator {
    /// The service with the given id, as `T`.
    fn service<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, IocError> {
        downcast(self.service_by_id(id, &TypeKey::of::<T>())?, id)
    }

    /// The single service of type `T`.
    fn service_of<T: Any + Send + Sync>(&self) -> Result<Arc<T>, IocError> {
        let key = TypeKey::of::<T>();
        downcast(self.service_by_type(&key)?, key.name())
    }

    /// A fresh `T`.
    fn autobuild<T: Any + Send + Sync>(&self) -> Result<Arc<T>, IocError> {
        let key = TypeKey::of::<T>();
        downcast(self.autobuild_service(&key)?, key.name())
    }
}

impl<L: ObjectLocator + ?Sized> ObjectLocatorExt for L {}

/// One link in the master object provider chain.
pub trait ObjectProvider: Send + Sync {
    /// Supplies a value for the request, or `None` to defer to the next provider.
    fn provide(
        &self,
        key: &TypeKey,
        inject: &Inject,
        locator: &dyn ObjectLocator,
    ) -> Result<Option<Service>, IocError>;
}

impl<F> ObjectProvider for F
where
    F: Fn(&TypeKey, &Inject, &dyn ObjectLocator) -> Result<Option<Service>, IocError>
        + Send
        + Sync,
{
    fn provide(
        &self,
        key: &TypeKey,
        inject: &Inject,
        locator: &dyn ObjectLocator,
    ) -> Result<Option<Service>, IocError> {
        self(key, inject, locator)
    }
}

type Factory = Arc<dyn Fn(&Registry, &ServiceResources) -> Result<Service, IocError> + Send + Sync>;
type Autobuilder = Arc<dyn Fn(&Registry) -> Result<Service, IocError> + Send + Sync>;

struct ServiceDef {
    id: String,
    key: TypeKey,
    factory: Factory,
    instance: OnceLock<Service>,
    // Held while the factory runs so it runs once.
    realizing: Mutex<()>,
}

/// Declares services, autobuildable types and object providers.
#[derive(Default)]
pub struct RegistryBuilder {
    services: Vec<ServiceDef>,
    autobuilders: AHashMap<TypeId, Autobuilder>,
    providers: Vec<Box<dyn ObjectProvider>>,
    resources: MapInjectionResources,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a service built from `T`'s construction recipe.
    ///
    /// The recipe sees the service's [`ServiceId`](super::ServiceId) and
    /// [`ServiceLog`](super::ServiceLog) as injection resources. `T` also
    /// becomes autobuildable.
    #[must_use]
    pub fn service<T: Injectable>(mut self, id: &str) -> Self {
        let factory: Factory = Arc::new(|registry: &Registry, resources: &ServiceResources| {
            let plan = registry.construction_plan::<T>(resources)?;
            Ok(Arc::new(plan.create_object()?) as Service)
        });
        self.define(id, TypeKey::of::<T>(), factory);
        self.autobuildable::<T>()
    }

    /// Declares a service built by a factory closure.
    #[must_use]
    pub fn service_with<T: Any + Send + Sync>(
        mut self,
        id: &str,
        factory: impl Fn(&Registry) -> Result<T, HandlerError> + Send + Sync + 'static,
    ) -> Self {
        let operation = format!("factory for service {id}");
        let factory: Factory = Arc::new(move |registry: &Registry, _: &ServiceResources| {
            factory(registry)
                .map(|value| Arc::new(value) as Service)
                .map_err(|source| IocError::Invocation {
                    operation: operation.clone(),
                    source,
                })
        });
        self.define(id, TypeKey::of::<T>(), factory);
        self
    }

    /// Declares a service from an existing value.
    #[must_use]
    pub fn instance<T: Any + Send + Sync>(mut self, id: &str, value: T) -> Self {
        let value: Service = Arc::new(value);
        let factory: Factory = Arc::new(move |_: &Registry, _: &ServiceResources| Ok(value.clone()));
        self.define(id, TypeKey::of::<T>(), factory);
        self
    }

    /// Makes `T` available to autobuild requests without declaring a service.
    #[must_use]
    pub fn autobuildable<T: Injectable>(mut self) -> Self {
        let autobuilder: Autobuilder = Arc::new(|registry: &Registry| {
            let plan = registry.construction_plan::<T>(registry.resources.as_ref())?;
            Ok(Arc::new(plan.create_object()?) as Service)
        });
        self.autobuilders.insert(TypeId::of::<T>(), autobuilder);
        self
    }

    /// Appends a provider to the master object provider chain.
    #[must_use]
    pub fn object_provider(mut self, provider: impl ObjectProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Adds a registry-wide injection resource.
    #[must_use]
    pub fn resource<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.resources.insert(value);
        self
    }

    fn define(&mut self, id: &str, key: TypeKey, factory: Factory) {
        self.services.push(ServiceDef {
            id: id.to_string(),
            key,
            factory,
            instance: OnceLock::new(),
            realizing: Mutex::new(()),
        });
    }

    /// Validates the declarations and produces the registry.
    pub fn build(self) -> Result<Registry, IocError> {
        let mut by_id = AHashMap::with_capacity(self.services.len());
        let mut by_type: AHashMap<TypeId, Vec<usize>> = AHashMap::new();

        for (index, def) in self.services.iter().enumerate() {
            if by_id.insert(def.id.to_lowercase(), index).is_some() {
                return Err(IocError::DuplicateServiceId(def.id.clone()));
            }
            by_type.entry(def.key.id()).or_default().push(index);
        }

        log::debug!(
            target: "loom::ioc",
            "Registry built with {} services and {} object providers",
            self.services.len(),
            self.providers.len()
        );

        Ok(Registry {
            services: self.services,
            by_id,
            by_type,
            autobuilders: self.autobuilders,
            providers: self.providers,
            resources: Arc::new(self.resources),
            tracker: OperationTracker::new(),
        })
    }
}

/// A built registry. Services are realized on first use and shared afterwards.
pub struct Registry {
    services: Vec<ServiceDef>,
    by_id: AHashMap<String, usize>,
    by_type: AHashMap<TypeId, Vec<usize>>,
    autobuilders: AHashMap<TypeId, Autobuilder>,
    providers: Vec<Box<dyn ObjectProvider>>,
    resources: Arc<MapInjectionResources>,
    tracker: OperationTracker,
}

impl Registry {
    /// Every declared service id, sorted case-insensitively.
    #[must_use]
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.services.iter().map(|def| def.id.clone()).collect();
        ids.sort_by_key(|id| id.to_lowercase());
        ids
    }

    /// Number of declared services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Whether the service has been realized yet.
    #[must_use]
    pub fn is_realized(&self, id: &str) -> bool {
        self.by_id
            .get(&id.to_lowercase())
            .is_some_and(|&index| self.services[index].instance.get().is_some())
    }

    /// Builds a construction plan for `T`, resolving against this registry
    /// and the given resources.
    pub fn construction_plan<T: Injectable>(
        &self,
        resources: &dyn InjectionResources,
    ) -> Result<ConstructionPlan<T>, IocError> {
        PlanBuilder::<T>::for_injectable().build(self, resources)
    }

    fn realize(&self, index: usize) -> Result<Service, IocError> {
        let def = &self.services[index];
        if let Some(instance) = def.instance.get() {
            return Ok(instance.clone());
        }

        let chain = REALIZING.with(|stack| {
            let stack = stack.borrow();
            stack
                .iter()
                .any(|id| id.eq_ignore_ascii_case(&def.id))
                .then(|| stack.clone())
        });
        if let Some(mut chain) = chain {
            chain.push(def.id.clone());
            return Err(IocError::Recursion {
                id: def.id.clone(),
                chain,
            });
        }

        let _guard = def.realizing.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = def.instance.get() {
            return Ok(instance.clone());
        }

        REALIZING.with(|stack| stack.borrow_mut().push(def.id.clone()));
        let result = self.tracker.run(format!("Realizing service {}", def.id), || {
            let resources = ServiceResources::new(&def.id, self.resources.clone());
            (def.factory)(self, &resources)
        });
        REALIZING.with(|stack| {
            stack.borrow_mut().pop();
        });

        let value = result?;
        log::debug!(target: "loom::ioc", "Realized service {}", def.id);
        Ok(def.instance.get_or_init(|| value).clone())
    }
}

impl ObjectLocator for Registry {
    fn service_by_id(&self, id: &str, key: &TypeKey) -> Result<Service, IocError> {
        let index = *self
            .by_id
            .get(&id.to_lowercase())
            .ok_or_else(|| IocError::ServiceNotFound {
                id: id.to_string(),
                available: self.service_ids(),
            })?;
        let def = &self.services[index];
        if def.key != *key {
            return Err(IocError::ServiceTypeMismatch {
                id: def.id.clone(),
                expected: key.name(),
                actual: def.key.name(),
            });
        }
        self.realize(index)
    }

    fn service_by_type(&self, key: &TypeKey) -> Result<Service, IocError> {
        match self.by_type.get(&key.id()).map(Vec::as_slice) {
            None | Some([]) => Err(IocError::NoServiceForType {
                type_name: key.name(),
            }),
            Some([index]) => self.realize(*index),
            Some(indices) => Err(IocError::AmbiguousService {
                type_name: key.name(),
                ids: indices
                    .iter()
                    .map(|&index| self.services[index].id.clone())
                    .collect(),
            }),
        }
    }

    fn object(&self, key: &TypeKey, inject: &Inject) -> Result<Service, IocError> {
        for provider in &self.providers {
            if let Some(value) = provider.provide(key, inject, self)? {
                return Ok(value);
            }
        }
        self.service_by_type(key)
    }

    fn autobuild_service(&self, key: &TypeKey) -> Result<Service, IocError> {
        let autobuilder = self
            .autobuilders
            .get(&key.id())
            .ok_or(IocError::NotAutobuildable {
                type_name: key.name(),
            })?;
        self.tracker
            .run(format!("Autobuilding instance of {key}"), || autobuilder(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioc::{Args, Dependency, ServiceId, ServiceLog};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Database {
        url: String,
    }

    struct Repository {
        db: Arc<Database>,
        service_id: String,
        log_target: String,
    }

    impl Injectable for Repository {
        fn plan(plan: &mut PlanBuilder<Self>) {
            plan.constructor(
                vec![
                    Dependency::of::<Database>(),
                    Dependency::of::<ServiceId>(),
                    Dependency::of::<ServiceLog>(),
                ],
                |args: &Args| {
                    let id: Arc<ServiceId> = args.get(1)?;
                    let log: Arc<ServiceLog> = args.get(2)?;
                    Ok(Repository {
                        db: args.get(0)?,
                        service_id: id.0.clone(),
                        log_target: log.target().to_string(),
                    })
                },
            );
        }
    }

    #[test]
    fn test_lookup_by_id_is_case_insensitive() {
        let registry = RegistryBuilder::new()
            .instance(
                "MainDatabase",
                Database {
                    url: "mem://".into(),
                },
            )
            .build()
            .unwrap();
        let db = registry.service::<Database>("maindatabase").unwrap();
        assert_eq!(db.url, "mem://");
    }

    #[test]
    fn test_unknown_id_lists_available_ids() {
        let registry = RegistryBuilder::new()
            .instance("b", 1u8)
            .instance("A", 2u16)
            .build()
            .unwrap();
        match registry.service::<u8>("missing") {
            Err(IocError::ServiceNotFound { available, .. }) => {
                assert_eq!(available, vec!["A".to_string(), "b".to_string()]);
            }
            _ => panic!("expected ServiceNotFound"),
        }
    }

    #[test]
    fn test_wrong_type_for_id() {
        let registry = RegistryBuilder::new().instance("n", 1u8).build().unwrap();
        assert!(matches!(
            registry.service::<u16>("n"),
            Err(IocError::ServiceTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_services_are_realized_once_and_see_their_resources() {
        let registry = RegistryBuilder::new()
            .instance(
                "Database",
                Database {
                    url: "mem://".into(),
                },
            )
            .service::<Repository>("Repository")
            .build()
            .unwrap();

        assert!(!registry.is_realized("repository"));
        let first = registry.service::<Repository>("Repository").unwrap();
        let second = registry.service_of::<Repository>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.is_realized("repository"));
        assert_eq!(first.db.url, "mem://");
        assert_eq!(first.service_id, "Repository");
        assert_eq!(first.log_target, "loom::service::Repository");
    }

    #[test]
    fn test_concurrent_requests_run_the_factory_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = RegistryBuilder::new()
            .service_with("Slow", move |_: &Registry| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(String::from("ready"))
            })
            .build()
            .unwrap();

        let services: Vec<Arc<String>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.service::<String>("Slow").unwrap()))
                .collect();
            workers.into_iter().map(|worker| worker.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(services.iter().all(|service| Arc::ptr_eq(service, &services[0])));
    }

    #[test]
    fn test_autobuild_always_returns_a_fresh_instance() {
        let registry = RegistryBuilder::new()
            .instance(
                "Database",
                Database {
                    url: "mem://".into(),
                },
            )
            .resource(ServiceId("adhoc".into()))
            .resource(ServiceLog::for_service("adhoc"))
            .autobuildable::<Repository>()
            .build()
            .unwrap();

        let first = registry.autobuild::<Repository>().unwrap();
        let second = registry.autobuild::<Repository>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.db, &second.db));
        assert_eq!(first.service_id, "adhoc");
    }

    #[test]
    fn test_autobuild_requires_a_recipe() {
        let registry = RegistryBuilder::new().build().unwrap();
        assert!(matches!(
            registry.autobuild::<Database>(),
            Err(IocError::NotAutobuildable { .. })
        ));
    }

    #[test]
    fn test_ambiguous_type_lookup() {
        let registry = RegistryBuilder::new()
            .instance("one", 1u32)
            .instance("two", 2u32)
            .build()
            .unwrap();
        match registry.service_of::<u32>() {
            Err(IocError::AmbiguousService { ids, .. }) => assert_eq!(ids, vec!["one", "two"]),
            _ => panic!("expected AmbiguousService"),
        }
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let result = RegistryBuilder::new()
            .instance("Same", 1u8)
            .instance("same", 2u8)
            .build();
        assert!(matches!(result, Err(IocError::DuplicateServiceId(id)) if id == "same"));
    }

    #[test]
    fn test_object_providers_run_before_type_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let registry = RegistryBuilder::new()
            .instance("Default", 1u64)
            .object_provider(
                move |key: &TypeKey, inject: &Inject, _: &dyn ObjectLocator| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    if *key == TypeKey::of::<u64>() && inject.is_explicit() {
                        return Ok(Some(Arc::new(42u64) as Service));
                    }
                    Ok::<_, IocError>(None)
                },
            )
            .build()
            .unwrap();

        let provided = registry
            .object(&TypeKey::of::<u64>(), &Inject::new().explicit())
            .unwrap();
        let fallback = registry.object(&TypeKey::of::<u64>(), &Inject::new()).unwrap();

        assert_eq!(provided.downcast_ref::<u64>(), Some(&42));
        assert_eq!(fallback.downcast_ref::<u64>(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    struct Chicken;
    struct Egg;

    impl Injectable for Chicken {
        fn plan(plan: &mut PlanBuilder<Self>) {
            plan.constructor(vec![Dependency::of::<Egg>().service_id("Egg")], |_| Ok(Chicken));
        }
    }

    impl Injectable for Egg {
        fn plan(plan: &mut PlanBuilder<Self>) {
            plan.constructor(vec![Dependency::of::<Chicken>().service_id("Chicken")], |_| {
                Ok(Egg)
            });
        }
    }

    #[test]
    fn test_recursive_realization_is_detected() {
        let registry = RegistryBuilder::new()
            .service::<Chicken>("Chicken")
            .service::<Egg>("Egg")
            .build()
            .unwrap();
        let error = registry.service::<Chicken>("Chicken").err().unwrap();
        assert!(error.root_message().contains("recursion"));
        assert!(!registry.is_realized("Chicken"));
    }
}
