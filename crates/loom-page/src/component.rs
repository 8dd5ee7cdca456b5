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

//! The component contract and the instantiators that create components.

use crate::error::RenderError;
use crate::event::ComponentEvent;
use crate::model::{ComponentModel, PageLifecycle, RenderPhase};
use crate::page::resources::ComponentResources;
use crate::render::RenderCommand;
use loom_core::ioc::{Injectable, MapInjectionResources, ObjectLocator, PlanBuilder};
use loom_core::{HandlerError, MarkupWriter};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Phase handler results
// ─────────────────────────────────────────────────────────────────────────────

/// What a render phase handler asks the engine to do next.
#[derive(Debug, Clone, Default)]
pub enum PhaseResult {
    /// No opinion; later handlers still run and the phase result stays `true`.
    #[default]
    None,
    /// Stop invoking handlers for this phase; the phase result is `true`.
    Continue,
    /// Stop invoking handlers for this phase; the phase result is `false`.
    Abort,
    /// Render the command before the phase's successors.
    Command(Arc<dyn RenderCommand>),
    /// Render the renderable before the phase's successors.
    Renderable(Arc<dyn Renderable>),
}

impl From<bool> for PhaseResult {
    fn from(value: bool) -> Self {
        if value {
            PhaseResult::Continue
        } else {
            PhaseResult::Abort
        }
    }
}

/// Something that writes markup directly, without queueing further commands.
pub trait Renderable: fmt::Debug + Send + Sync {
    /// Writes the markup.
    fn render(&self, writer: &mut dyn MarkupWriter) -> Result<(), HandlerError>;
}

/// What a render phase handler can reach: the markup writer and its own
/// component resources.
pub struct PhaseContext<'a> {
    writer: &'a mut dyn MarkupWriter,
    resources: ComponentResources<'a>,
}

impl<'a> PhaseContext<'a> {
    pub(crate) fn new(writer: &'a mut dyn MarkupWriter, resources: ComponentResources<'a>) -> Self {
        Self { writer, resources }
    }

    /// The markup writer.
    pub fn writer(&mut self) -> &mut dyn MarkupWriter {
        &mut *self.writer
    }

    /// The resources of the component being invoked.
    pub fn resources(&self) -> &ComponentResources<'a> {
        &self.resources
    }

    /// Adds the informal parameters of this component as attributes of the
    /// element currently open.
    pub fn render_informal_parameters(&mut self) -> Result<(), RenderError> {
        self.resources.render_informal_parameters(&mut *self.writer)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Component
// ─────────────────────────────────────────────────────────────────────────────

/// A component or mixin instance.
///
/// One instance serves every request for its page, so implementations take
/// `&self` and keep request state in per-thread cells or render variables.
/// Every method has a no-op default; the [`ComponentModel`] says which render
/// phases are actually handled, and unhandled phases are never invoked.
pub trait Component: Send + Sync + 'static {
    /// Handles one render phase.
    fn render_phase(
        &self,
        _phase: RenderPhase,
        _ctx: &mut PhaseContext<'_>,
    ) -> Result<PhaseResult, HandlerError> {
        Ok(PhaseResult::None)
    }

    /// Offers an event to the component's handlers.
    ///
    /// Returns whether any handler matched. Handlers pass their results to
    /// [`ComponentEvent::store_result`], which may abort the event.
    fn dispatch_event(
        &self,
        _event: &mut ComponentEvent<'_>,
        _resources: &ComponentResources<'_>,
    ) -> Result<bool, HandlerError> {
        Ok(false)
    }

    /// Receives the page lifecycle notifications declared by the model.
    fn on_page_lifecycle(
        &self,
        _event: PageLifecycle,
        _resources: &ComponentResources<'_>,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called at the end of every render of the component, after the engine
    /// has reset parameter caches and render variables.
    fn post_render_cleanup(&self, _resources: &ComponentResources<'_>) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Instantiators
// ─────────────────────────────────────────────────────────────────────────────

/// The complete id of the component being created, available to injectable
/// components as an injection resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentId(pub String);

/// What an [`Instantiator`] knows about the instance it is creating.
pub struct InstantiationContext<'a> {
    page_name: &'a str,
    complete_id: &'a str,
    locator: Option<&'a dyn ObjectLocator>,
}

impl<'a> InstantiationContext<'a> {
    pub(crate) fn new(
        page_name: &'a str,
        complete_id: &'a str,
        locator: Option<&'a dyn ObjectLocator>,
    ) -> Self {
        Self {
            page_name,
            complete_id,
            locator,
        }
    }

    /// Name of the page being assembled.
    pub fn page_name(&self) -> &str {
        self.page_name
    }

    /// Complete id of the component (with the mixin id, for mixins).
    pub fn complete_id(&self) -> &str {
        self.complete_id
    }

    /// The service registry, when the page was given one.
    pub fn locator(&self) -> Option<&'a dyn ObjectLocator> {
        self.locator
    }
}

/// Creates component instances of one type and exposes their model.
pub trait Instantiator: Send + Sync {
    /// The static model shared by every instance.
    fn model(&self) -> &Arc<ComponentModel>;

    /// Creates a new instance.
    fn new_instance(&self, ctx: &InstantiationContext<'_>) -> Result<Arc<dyn Component>, HandlerError>;
}

impl<I: Instantiator + ?Sized> Instantiator for Arc<I> {
    fn model(&self) -> &Arc<ComponentModel> {
        (**self).model()
    }

    fn new_instance(&self, ctx: &InstantiationContext<'_>) -> Result<Arc<dyn Component>, HandlerError> {
        (**self).new_instance(ctx)
    }
}

/// An [`Instantiator`] backed by a closure.
pub struct FnInstantiator<F> {
    model: Arc<ComponentModel>,
    factory: F,
}

impl<F> FnInstantiator<F>
where
    F: Fn(&InstantiationContext<'_>) -> Result<Arc<dyn Component>, HandlerError> + Send + Sync,
{
    /// Wraps a factory closure.
    pub fn new(model: ComponentModel, factory: F) -> Self {
        Self {
            model: Arc::new(model),
            factory,
        }
    }
}

impl<F> Instantiator for FnInstantiator<F>
where
    F: Fn(&InstantiationContext<'_>) -> Result<Arc<dyn Component>, HandlerError> + Send + Sync,
{
    fn model(&self) -> &Arc<ComponentModel> {
        &self.model
    }

    fn new_instance(&self, ctx: &InstantiationContext<'_>) -> Result<Arc<dyn Component>, HandlerError> {
        (self.factory)(ctx)
    }
}

/// An [`Instantiator`] for components that need no injection: `make` is
/// called once per instance.
pub fn instantiator<C, M>(model: ComponentModel, make: M) -> Arc<dyn Instantiator>
where
    C: Component,
    M: Fn() -> C + Send + Sync + 'static,
{
    Arc::new(FnInstantiator::new(model, move |_ctx: &InstantiationContext<'_>| {
        let component: Arc<dyn Component> = Arc::new(make());
        Ok(component)
    }))
}

/// An [`Instantiator`] that builds each instance through a construction plan
/// resolved against the page's service registry.
///
/// The component's complete id is offered as a [`ComponentId`] injection
/// resource.
pub struct InjectableInstantiator<T> {
    model: Arc<ComponentModel>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component + Injectable> InjectableInstantiator<T> {
    /// An instantiator for `T` with the given model.
    pub fn new(model: ComponentModel) -> Self {
        Self {
            model: Arc::new(model),
            _marker: PhantomData,
        }
    }
}

impl<T: Component + Injectable> Instantiator for InjectableInstantiator<T> {
    fn model(&self) -> &Arc<ComponentModel> {
        &self.model
    }

    fn new_instance(&self, ctx: &InstantiationContext<'_>) -> Result<Arc<dyn Component>, HandlerError> {
        let locator = ctx.locator().ok_or_else(|| {
            format!(
                "Component {} requires injection, but page {} has no object locator",
                ctx.complete_id(),
                ctx.page_name()
            )
        })?;
        let mut resources = MapInjectionResources::new();
        resources.insert(ComponentId(ctx.complete_id().to_string()));

        let plan = PlanBuilder::<T>::for_injectable().build(locator, &resources)?;
        let component: Arc<dyn Component> = Arc::new(plan.create_object()?);
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::ioc::{Args, Dependency, RegistryBuilder};

    struct Greeting {
        id: Arc<ComponentId>,
        text: Arc<String>,
    }

    impl Component for Greeting {}

    impl Injectable for Greeting {
        fn plan(plan: &mut PlanBuilder<Self>) {
            plan.constructor(
                vec![Dependency::of::<ComponentId>(), Dependency::of::<String>()],
                |args: &Args| {
                    Ok(Greeting {
                        id: args.get(0)?,
                        text: args.get(1)?,
                    })
                },
            );
        }
    }

    #[test]
    fn test_phase_result_from_bool() {
        assert!(matches!(PhaseResult::from(true), PhaseResult::Continue));
        assert!(matches!(PhaseResult::from(false), PhaseResult::Abort));
    }

    #[test]
    fn test_injectable_instantiator_offers_component_id() {
        let registry = RegistryBuilder::new()
            .instance("Salutation", String::from("hello"))
            .build()
            .unwrap();
        let instantiator = InjectableInstantiator::<Greeting>::new(ComponentModel::new("Greeting"));
        let ctx = InstantiationContext::new("Index", "Index:greeting", Some(&registry));

        let instance = instantiator.new_instance(&ctx);

        assert!(instance.is_ok());
        let plan = PlanBuilder::<Greeting>::for_injectable();
        let mut resources = MapInjectionResources::new();
        resources.insert(ComponentId("Index:x".into()));
        let built = plan.build(&registry, &resources).unwrap().create_object().unwrap();
        assert_eq!(built.id.0, "Index:x");
        assert_eq!(*built.text, "hello");
    }

    #[test]
    fn test_injectable_instantiator_requires_locator() {
        let instantiator = InjectableInstantiator::<Greeting>::new(ComponentModel::new("Greeting"));
        let ctx = InstantiationContext::new("Index", "Index:greeting", None);
        let error = instantiator.new_instance(&ctx).err().unwrap();
        assert!(error.to_string().contains("has no object locator"));
    }
}
