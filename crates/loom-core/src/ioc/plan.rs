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

//! Construction plans: a constructor plus ordered injection steps, with every
//! dependency resolved up front.

use super::{
    downcast, Dependency, Inject, InjectionResources, IocError, ObjectLocator, Service, TypeKey,
};
use crate::{HandlerError, OperationTracker};
use std::any::Any;
use std::sync::Arc;

type Constructor<T> = Arc<dyn Fn(&Args) -> Result<T, HandlerError> + Send + Sync>;
type Step<T> = Arc<dyn Fn(&mut T, &Args) -> Result<(), HandlerError> + Send + Sync>;

/// A type that knows how to describe its own construction.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Declares the constructor, injected fields and post-injection methods.
    fn plan(plan: &mut PlanBuilder<Self>);
}

/// Resolved values handed to a constructor or post-injection method.
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Service>,
}

impl Args {
    /// Wraps already resolved values.
    pub fn from_values(values: Vec<Service>) -> Self {
        Self { values }
    }

    /// The value at `index`, as `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, IocError> {
        let context = format!("argument #{}", index + 1);
        let value = self
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| IocError::WrongType {
                context: format!("{context} (only {} supplied)", self.values.len()),
                expected: std::any::type_name::<T>(),
            })?;
        downcast(value, &context)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct PendingStep<T> {
    description: String,
    points: Vec<(String, Dependency)>,
    apply: Step<T>,
}

/// Collects the construction recipe of a `T`.
pub struct PlanBuilder<T> {
    description: String,
    constructors: Vec<(Vec<Dependency>, Constructor<T>)>,
    steps: Vec<PendingStep<T>>,
}

impl<T: 'static> PlanBuilder<T> {
    /// An empty recipe for the type described by `description`.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            constructors: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// The recipe declared by an [`Injectable`] type.
    pub fn for_injectable() -> Self
    where
        T: Injectable,
    {
        let mut builder = Self::new(std::any::type_name::<T>());
        T::plan(&mut builder);
        builder
    }

    /// Declares the constructor and its parameters.
    ///
    /// Exactly one constructor must be declared before the plan is built.
    pub fn constructor(
        &mut self,
        params: Vec<Dependency>,
        construct: impl Fn(&Args) -> Result<T, HandlerError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.constructors.push((params, Arc::new(construct)));
        self
    }

    /// Declares an injected field, assigned after construction.
    pub fn field<S: Any + Send + Sync>(
        &mut self,
        name: &str,
        inject: Inject,
        set: impl Fn(&mut T, Arc<S>) + Send + Sync + 'static,
    ) -> &mut Self {
        let point = format!("field {name} of {}", self.description);
        self.steps.push(PendingStep {
            description: format!("Injecting field {name}"),
            points: vec![(point, Dependency::with::<S>(inject))],
            apply: Arc::new(move |object: &mut T, args: &Args| {
                set(object, args.get::<S>(0)?);
                Ok(())
            }),
        });
        self
    }

    /// Declares a method invoked once all fields are injected.
    pub fn post_injection(
        &mut self,
        name: &str,
        params: Vec<Dependency>,
        invoke: impl Fn(&mut T, &Args) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> &mut Self {
        let points = params
            .into_iter()
            .enumerate()
            .map(|(index, dependency)| {
                (format!("parameter #{} of method {name}", index + 1), dependency)
            })
            .collect();
        self.steps.push(PendingStep {
            description: format!("Invoking post-injection method {name}"),
            points,
            apply: Arc::new(invoke),
        });
        self
    }

    /// Resolves every dependency and produces a reusable plan.
    pub fn build(
        self,
        locator: &dyn ObjectLocator,
        resources: &dyn InjectionResources,
    ) -> Result<ConstructionPlan<T>, IocError> {
        let tracker = OperationTracker::new();
        let Self {
            description,
            mut constructors,
            steps,
        } = self;

        tracker.run(format!("Creating plan to instantiate {description}"), || {
            if constructors.len() > 1 {
                return Err(IocError::AmbiguousConstructor(description.clone()));
            }
            let (params, constructor) = constructors
                .pop()
                .ok_or_else(|| IocError::NoConstructor(description.clone()))?;

            let mut values = Vec::with_capacity(params.len());
            for (index, dependency) in params.iter().enumerate() {
                let point = format!("parameter #{} of constructor for {description}", index + 1);
                values.push(resolve(&tracker, &point, dependency, locator, resources)?);
            }

            let mut planned = Vec::with_capacity(steps.len());
            for step in steps {
                let mut step_values = Vec::with_capacity(step.points.len());
                for (point, dependency) in &step.points {
                    step_values.push(resolve(&tracker, point, dependency, locator, resources)?);
                }
                planned.push(PlannedStep {
                    description: step.description,
                    args: Args::from_values(step_values),
                    apply: step.apply,
                });
            }

            Ok(ConstructionPlan {
                description: description.clone(),
                args: Args::from_values(values),
                constructor,
                steps: planned,
            })
        })
    }
}

fn resolve(
    tracker: &OperationTracker,
    point: &str,
    dependency: &Dependency,
    locator: &dyn ObjectLocator,
    resources: &dyn InjectionResources,
) -> Result<Service, IocError> {
    tracker
        .run(format!("Determining injection value for {point}"), || {
            let value = calculate_injection(dependency, locator, resources)?;
            if dependency.accepts(value.as_ref()) {
                Ok(value)
            } else {
                Err(IocError::WrongType {
                    context: point.to_string(),
                    expected: dependency.key().name(),
                })
            }
        })
        .map_err(|source| IocError::Injection {
            point: point.to_string(),
            source: Box::new(source),
        })
}

/// Resolves one dependency: explicit service id, then injection name, then
/// the caller's resources (unless explicit), then autobuild, then the object
/// provider chain.
pub fn calculate_injection(
    dependency: &Dependency,
    locator: &dyn ObjectLocator,
    resources: &dyn InjectionResources,
) -> Result<Service, IocError> {
    let key: &TypeKey = dependency.key();
    let inject = dependency.inject();

    if let Some(id) = inject.get_service_id() {
        return locator.service_by_id(id, key);
    }
    if let Some(name) = inject.get_named() {
        return locator.service_by_id(name, key);
    }
    if !inject.is_explicit() {
        if let Some(value) = resources.find_resource(key) {
            return Ok(value);
        }
    }
    if inject.is_autobuild() {
        return locator.autobuild_service(key);
    }
    locator.object(key, inject)
}

struct PlannedStep<T> {
    description: String,
    args: Args,
    apply: Step<T>,
}

/// A constructor call followed by injection steps, with all inputs resolved.
///
/// The plan may be invoked any number of times; each invocation produces a
/// new object.
pub struct ConstructionPlan<T> {
    description: String,
    args: Args,
    constructor: Constructor<T>,
    steps: Vec<PlannedStep<T>>,
}

impl<T> ConstructionPlan<T> {
    /// Runs the constructor then every step, in declaration order.
    pub fn create_object(&self) -> Result<T, IocError> {
        let tracker = OperationTracker::new();
        let constructor = format!("constructor for {}", self.description);
        let mut object = tracker.run(format!("Invoking {constructor}"), || {
            (self.constructor)(&self.args).map_err(|source| IocError::Invocation {
                operation: constructor.clone(),
                source,
            })
        })?;

        for step in &self.steps {
            tracker.run(step.description.clone(), || {
                (step.apply)(&mut object, &step.args).map_err(|source| IocError::Invocation {
                    operation: step.description.clone(),
                    source,
                })
            })?;
        }
        Ok(object)
    }

    /// The type description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Descriptions of the post-construction steps, in order.
    pub fn step_descriptions(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.description.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioc::{MapInjectionResources, NoResources, RegistryBuilder};

    struct Counter(u32);

    struct Widget {
        base: Arc<Counter>,
        label: Option<Arc<String>>,
        ready: bool,
    }

    impl Injectable for Widget {
        fn plan(plan: &mut PlanBuilder<Self>) {
            plan.constructor(vec![Dependency::of::<Counter>()], |args| {
                Ok(Widget {
                    base: args.get(0)?,
                    label: None,
                    ready: false,
                })
            })
            .field::<String>("label", Inject::new(), |widget, label| {
                widget.label = Some(label)
            })
            .post_injection("ready", vec![], |widget, _| {
                widget.ready = widget.label.is_some();
                Ok(())
            });
        }
    }

    #[test]
    fn test_plan_runs_constructor_then_steps() {
        let registry = RegistryBuilder::new()
            .instance("Counter", Counter(3))
            .build()
            .unwrap();
        let mut resources = MapInjectionResources::new();
        resources.insert("hello".to_string());

        let plan = PlanBuilder::<Widget>::for_injectable()
            .build(&registry, &resources)
            .unwrap();
        let widget = plan.create_object().unwrap();

        assert_eq!(widget.base.0, 3);
        assert_eq!(widget.label.as_deref().map(String::as_str), Some("hello"));
        assert!(widget.ready);
        assert_eq!(
            plan.step_descriptions().collect::<Vec<_>>(),
            vec!["Injecting field label", "Invoking post-injection method ready"]
        );
    }

    #[test]
    fn test_each_invocation_builds_a_new_object_from_shared_inputs() {
        let registry = RegistryBuilder::new()
            .instance("Counter", Counter(1))
            .instance("Label", "x".to_string())
            .build()
            .unwrap();
        let plan = PlanBuilder::<Widget>::for_injectable()
            .build(&registry, &NoResources)
            .unwrap();

        let first = plan.create_object().unwrap();
        let second = plan.create_object().unwrap();
        assert!(Arc::ptr_eq(&first.base, &second.base));
    }

    #[test]
    fn test_missing_constructor_is_reported() {
        let registry = RegistryBuilder::new().build().unwrap();
        let builder = PlanBuilder::<Counter>::new("Counter");
        let error = builder.build(&registry, &NoResources).err().unwrap();
        assert!(matches!(error, IocError::NoConstructor(_)));
    }

    #[test]
    fn test_two_constructors_are_ambiguous() {
        let registry = RegistryBuilder::new().build().unwrap();
        let mut builder = PlanBuilder::<Counter>::new("Counter");
        builder.constructor(vec![], |_| Ok(Counter(0)));
        builder.constructor(vec![], |_| Ok(Counter(1)));
        let error = builder.build(&registry, &NoResources).err().unwrap();
        assert!(matches!(error, IocError::AmbiguousConstructor(_)));
    }

    #[test]
    fn test_failed_parameter_names_the_injection_point() {
        let registry = RegistryBuilder::new().build().unwrap();
        let error = PlanBuilder::<Widget>::for_injectable()
            .build(&registry, &NoResources)
            .err()
            .unwrap();
        match &error {
            IocError::Injection { point, source } => {
                assert!(point.starts_with("parameter #1 of constructor for"));
                assert!(matches!(**source, IocError::NoServiceForType { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(error.root_message().contains("No service implements type"));
    }

    #[test]
    fn test_constructor_failure_is_wrapped() {
        let registry = RegistryBuilder::new().build().unwrap();
        let mut builder = PlanBuilder::<Counter>::new("Counter");
        builder.constructor(vec![], |_| Err("no counters today".into()));
        let plan = builder.build(&registry, &NoResources).unwrap();
        let error = plan.create_object().err().unwrap();
        assert_eq!(error.root_message(), "no counters today");
    }

    #[test]
    fn test_explicit_injection_skips_resources() {
        let registry = RegistryBuilder::new()
            .instance("Number", 7u32)
            .build()
            .unwrap();
        let mut resources = MapInjectionResources::new();
        resources.insert(99u32);

        let plain = calculate_injection(&Dependency::of::<u32>(), &registry, &resources).unwrap();
        let explicit =
            calculate_injection(&Dependency::of::<u32>().explicit(), &registry, &resources)
                .unwrap();

        assert_eq!(plain.downcast_ref::<u32>(), Some(&99));
        assert_eq!(explicit.downcast_ref::<u32>(), Some(&7));
    }
}
