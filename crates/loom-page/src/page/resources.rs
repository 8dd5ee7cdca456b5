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

//! Per-component resources: bindings, parameter conduits, informal
//! parameters and render variables, plus the [`ComponentResources`] view
//! handed to component code.

use super::element::ComponentPageElement;
use super::{ElementId, Page};
use crate::binding::Binding;
use crate::component::Component;
use crate::error::{EventError, RenderError, StructureError};
use crate::event::{EventContext, EventResult};
use crate::model::ComponentModel;
use crate::render::commands::{Block, PlaceholderBlock};
use crate::render::RenderCommand;
use ahash::AHashMap;
use loom_core::per_thread::PerThreadValue;
use loom_core::{HandlerError, Location, MarkupWriter, NamedSet};
use loom_json::JsonValue;
use std::sync::{Arc, OnceLock, RwLock};

type InformalBindings = Arc<[(String, Arc<dyn Binding>)]>;
type ConduitMap = Arc<AHashMap<String, Arc<ParameterConduit>>>;

// ─────────────────────────────────────────────────────────────────────────────
// Parameter conduits
// ─────────────────────────────────────────────────────────────────────────────

/// Reads and writes one formal parameter through its binding.
///
/// Invariant bindings are read once and shared by every thread. Other
/// bindings are cached per thread while the component renders; the cache is
/// dropped by [`reset`](ParameterConduit::reset) at the end of the render.
/// An unbound parameter holds a per-thread local value.
pub(crate) struct ParameterConduit {
    binding: Option<Arc<dyn Binding>>,
    invariant: OnceLock<JsonValue>,
    cached: PerThreadValue<JsonValue>,
}

impl ParameterConduit {
    fn new(binding: Option<Arc<dyn Binding>>) -> Self {
        Self {
            binding,
            invariant: OnceLock::new(),
            cached: PerThreadValue::new(),
        }
    }

    fn get(&self, rendering: bool) -> Result<JsonValue, HandlerError> {
        let Some(binding) = &self.binding else {
            return Ok(self.cached.get().unwrap_or(JsonValue::Null));
        };
        if binding.is_invariant() {
            if let Some(value) = self.invariant.get() {
                return Ok(value.clone());
            }
            let value = binding.get()?;
            return Ok(self.invariant.get_or_init(|| value).clone());
        }
        if let Some(value) = self.cached.get() {
            return Ok(value);
        }
        let value = binding.get()?;
        if rendering {
            self.cached.set(value.clone());
        }
        Ok(value)
    }

    fn set(&self, value: JsonValue, rendering: bool) -> Result<(), HandlerError> {
        match &self.binding {
            Some(binding) => {
                binding.set(value.clone())?;
                if rendering {
                    self.cached.set(value);
                }
            }
            None => self.cached.set(value),
        }
        Ok(())
    }

    fn reset(&self) {
        self.cached.remove();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InternalComponentResources
// ─────────────────────────────────────────────────────────────────────────────

/// The framework side of one component or mixin instance.
pub struct InternalComponentResources {
    mixin_id: Option<String>,
    complete_id: String,
    model: Arc<ComponentModel>,
    component: Arc<dyn Component>,
    bindings: NamedSet<Arc<dyn Binding>>,
    informal: RwLock<Option<InformalBindings>>,
    conduits: RwLock<Option<ConduitMap>>,
    render_variables: PerThreadValue<NamedSet<JsonValue>>,
}

impl InternalComponentResources {
    pub(crate) fn new(
        mixin_id: Option<String>,
        complete_id: String,
        model: Arc<ComponentModel>,
        component: Arc<dyn Component>,
    ) -> Self {
        Self {
            mixin_id,
            complete_id,
            model,
            component,
            bindings: NamedSet::new(),
            informal: RwLock::new(None),
            conduits: RwLock::new(None),
            render_variables: PerThreadValue::new(),
        }
    }

    /// The mixin id, or `None` for the core component.
    pub fn mixin_id(&self) -> Option<&str> {
        self.mixin_id.as_deref()
    }

    /// The complete id; mixins append `$` and their lowercased id.
    pub fn complete_id(&self) -> &str {
        &self.complete_id
    }

    /// The component model.
    pub fn model(&self) -> &Arc<ComponentModel> {
        &self.model
    }

    /// The component instance.
    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    /// Whether a binding exists for the parameter (formal or informal).
    pub fn is_bound(&self, parameter: &str) -> bool {
        self.bindings.contains(parameter)
    }

    /// The binding for the parameter, if any.
    pub fn binding(&self, parameter: &str) -> Option<&Arc<dyn Binding>> {
        self.bindings.get(parameter)
    }

    /// Stores a binding. Undeclared parameters are informal, and only accepted
    /// when the model supports informal parameters.
    pub(crate) fn bind_parameter(
        &mut self,
        parameter: &str,
        binding: Arc<dyn Binding>,
        location: &Location,
    ) -> Result<(), StructureError> {
        if self.model.parameter_model(parameter).is_none()
            && !self.model.supports_informal_parameters()
        {
            return Err(StructureError::InformalNotSupported {
                component: self.complete_id.clone(),
                parameter: parameter.to_string(),
                location: location.clone(),
            });
        }
        self.bindings.put(parameter, binding);
        Ok(())
    }

    pub(crate) fn verify_required_parameters(&self, location: &Location) -> Result<(), StructureError> {
        let mut missing: Vec<String> = self
            .model
            .parameters()
            .iter()
            .filter(|parameter| parameter.is_required() && !self.bindings.contains(parameter.name()))
            .map(|parameter| parameter.name().to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(StructureError::MissingParameters {
            component: self.complete_id.clone(),
            parameters: missing,
            location: location.clone(),
        })
    }

    /// The informal parameter bindings, computed on first use.
    fn informal_bindings(&self) -> InformalBindings {
        {
            let cached = self.informal.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(bindings) = cached.as_ref() {
                return Arc::clone(bindings);
            }
        }
        let mut slot = self.informal.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another thread may have filled the slot between the two locks.
        if let Some(bindings) = slot.as_ref() {
            return Arc::clone(bindings);
        }
        let bindings: InformalBindings = self
            .bindings
            .iter()
            .filter(|(name, _)| self.model.parameter_model(name).is_none())
            .map(|(name, binding)| (name.to_string(), Arc::clone(binding)))
            .collect();
        *slot = Some(Arc::clone(&bindings));
        bindings
    }

    /// The conduits of every formal parameter, computed on first use.
    fn conduits(&self) -> ConduitMap {
        {
            let cached = self.conduits.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(conduits) = cached.as_ref() {
                return Arc::clone(conduits);
            }
        }
        let mut slot = self.conduits.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(conduits) = slot.as_ref() {
            return Arc::clone(conduits);
        }
        let conduits: ConduitMap = Arc::new(
            self.model
                .parameters()
                .iter()
                .map(|parameter| {
                    let binding = self.bindings.get(parameter.name()).cloned();
                    (
                        parameter.name().to_lowercase(),
                        Arc::new(ParameterConduit::new(binding)),
                    )
                })
                .collect(),
        );
        *slot = Some(Arc::clone(&conduits));
        conduits
    }

    fn conduit(&self, parameter: &str) -> Option<Arc<ParameterConduit>> {
        self.conduits().get(&parameter.to_lowercase()).cloned()
    }

    /// Drops per-render state: cached parameter values and render variables.
    pub(crate) fn post_render_cleanup(&self) {
        let initialized = self
            .conduits
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(conduits) = initialized {
            conduits.values().for_each(|conduit| conduit.reset());
        }
        self.render_variables.remove();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentResources: the view handed to component code
// ─────────────────────────────────────────────────────────────────────────────

/// A component's window onto its page: identity, parameters, render
/// variables, blocks, events and persistent fields.
#[derive(Clone, Copy)]
pub struct ComponentResources<'a> {
    page: &'a Page,
    element: ElementId,
    index: usize,
}

impl<'a> ComponentResources<'a> {
    pub(crate) fn new(page: &'a Page, element: ElementId, index: usize) -> Self {
        Self {
            page,
            element,
            index,
        }
    }

    fn element_ref(&self) -> &'a ComponentPageElement {
        self.page.element(self.element)
    }

    /// The internal resources behind this view.
    pub fn internal(&self) -> &'a InternalComponentResources {
        self.element_ref().resources_at(self.index)
    }

    /// The page.
    pub fn page(&self) -> &'a Page {
        self.page
    }

    /// The element the component belongs to.
    pub fn element_id(&self) -> ElementId {
        self.element
    }

    /// The element the component belongs to.
    pub fn element(&self) -> &'a ComponentPageElement {
        self.element_ref()
    }

    /// The local id of the element.
    pub fn id(&self) -> &'a str {
        self.element_ref().id()
    }

    /// The dotted path of the element from the page root.
    pub fn nested_id(&self) -> &'a str {
        self.element_ref().nested_id()
    }

    /// The complete id of this component (or mixin).
    pub fn complete_id(&self) -> &'a str {
        self.internal().complete_id()
    }

    /// The mixin id, or `None` for the core component.
    pub fn mixin_id(&self) -> Option<&'a str> {
        self.internal().mixin_id()
    }

    /// Where the element was declared.
    pub fn location(&self) -> &'a Location {
        self.element_ref().location()
    }

    /// The component model.
    pub fn model(&self) -> &'a Arc<ComponentModel> {
        self.internal().model()
    }

    /// The core resources of the containing element, if any.
    pub fn container(&self) -> Option<ComponentResources<'a>> {
        self.element_ref()
            .container()
            .map(|container| ComponentResources::new(self.page, container, 0))
    }

    /// The core resources of an embedded child element.
    pub fn embedded(&self, id: &str) -> Result<ComponentResources<'a>, StructureError> {
        let element = self.element_ref();
        element
            .embedded(id)
            .map(|child| ComponentResources::new(self.page, child, 0))
            .ok_or_else(|| StructureError::UnknownComponent {
                page: self.page.name().to_string(),
                nested_id: if element.nested_id().is_empty() {
                    id.to_string()
                } else {
                    format!("{}.{id}", element.nested_id())
                },
            })
    }

    // --- Parameters ---

    /// Whether the parameter is bound.
    pub fn is_bound(&self, parameter: &str) -> bool {
        self.internal().is_bound(parameter)
    }

    /// Reads a parameter. Formal parameters go through their conduit;
    /// informal ones are read from the binding. Unknown names read as null.
    pub fn read_parameter(&self, parameter: &str) -> Result<JsonValue, RenderError> {
        let internal = self.internal();
        let rendering = self.is_rendering();
        let result = match internal.conduit(parameter) {
            Some(conduit) => conduit.get(rendering),
            None => match internal.binding(parameter) {
                Some(binding) => binding.get(),
                None => Ok(JsonValue::Null),
            },
        };
        result.map_err(|source| RenderError::Binding {
            component: internal.complete_id().to_string(),
            parameter: parameter.to_string(),
            source,
        })
    }

    /// Writes a formal parameter through its conduit.
    pub fn write_parameter(&self, parameter: &str, value: impl Into<JsonValue>) -> Result<(), RenderError> {
        let internal = self.internal();
        let binding_error = |source: HandlerError| RenderError::Binding {
            component: internal.complete_id().to_string(),
            parameter: parameter.to_string(),
            source,
        };
        let conduit = internal
            .conduit(parameter)
            .ok_or_else(|| binding_error("not a formal parameter".into()))?;
        conduit
            .set(value.into(), self.is_rendering())
            .map_err(binding_error)
    }

    /// Names of the informal parameters, in binding order.
    pub fn informal_parameter_names(&self) -> Vec<String> {
        self.internal()
            .informal_bindings()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Adds every non-null informal parameter as an attribute of the element
    /// currently open.
    pub fn render_informal_parameters(&self, writer: &mut dyn MarkupWriter) -> Result<(), RenderError> {
        let internal = self.internal();
        for (name, binding) in internal.informal_bindings().iter() {
            let value = binding.get().map_err(|source| RenderError::Binding {
                component: internal.complete_id().to_string(),
                parameter: name.clone(),
                source,
            })?;
            if !value.is_null() {
                writer.attributes(&[(name.as_str(), value.coerce_string().as_str())]);
            }
        }
        Ok(())
    }

    // --- Render state ---

    /// Whether the element is rendering on the current thread.
    pub fn is_rendering(&self) -> bool {
        self.element_ref().is_rendering()
    }

    /// Stores a value for the rest of the current render.
    pub fn store_render_variable(&self, name: &str, value: impl Into<JsonValue>) -> Result<(), StructureError> {
        let internal = self.internal();
        if !self.is_rendering() {
            return Err(StructureError::NotRendering {
                component: internal.complete_id().to_string(),
                name: name.to_string(),
            });
        }
        let value = value.into();
        internal.render_variables.update(|slot| {
            slot.get_or_insert_with(NamedSet::new).put(name, value);
        });
        Ok(())
    }

    /// A value stored earlier in the current render.
    pub fn render_variable(&self, name: &str) -> Result<JsonValue, StructureError> {
        let internal = self.internal();
        internal.render_variables.with(|variables| {
            if let Some(value) = variables.and_then(|variables| variables.get(name)) {
                return Ok(value.clone());
            }
            Err(StructureError::UnknownRenderVariable {
                component: internal.complete_id().to_string(),
                name: name.to_string(),
                available: variables.map(NamedSet::sorted_names).unwrap_or_default(),
            })
        })
    }

    // --- Body and blocks ---

    /// Whether the element has a body.
    pub fn has_body(&self) -> bool {
        self.element_ref().body().is_some()
    }

    /// The body of the element, or a block that renders nothing.
    pub fn body(&self) -> Arc<dyn RenderCommand> {
        match self.element_ref().body() {
            Some(body) => body,
            None => Arc::new(PlaceholderBlock),
        }
    }

    /// The block with the id, if declared.
    pub fn find_block(&self, id: &str) -> Option<Arc<Block>> {
        self.element_ref().block(id)
    }

    /// The block with the id.
    pub fn block(&self, id: &str) -> Result<Arc<Block>, StructureError> {
        self.find_block(id)
            .ok_or_else(|| StructureError::UnknownBlock {
                component: self.element_ref().complete_id().to_string(),
                id: id.to_string(),
                available: self.element_ref().block_ids(),
            })
    }

    // --- Events ---

    /// Triggers an event on the element, bubbling up through its containers.
    pub fn trigger_context_event(
        &self,
        event_type: &str,
        context: EventContext,
        callback: &mut dyn FnMut(EventResult) -> Result<bool, HandlerError>,
    ) -> Result<bool, EventError> {
        self.page
            .trigger_context_event(self.element, event_type, context, callback)
    }

    /// Triggers a notification event, whose handlers may not return values.
    pub fn trigger_event(&self, event_type: &str, context: EventContext) -> Result<bool, EventError> {
        self.page.trigger_event(self.element, event_type, context)
    }

    // --- Persistent fields ---

    /// Records a change to a persistent field of this component.
    pub fn persist_field_change(&self, field: &str, value: impl Into<JsonValue>) -> Result<(), StructureError> {
        self.page
            .persist_field_change(self.nested_id(), field, value.into())
    }

    /// The persisted value of a field, if a change was recorded.
    pub fn field_change(&self, field: &str) -> Option<JsonValue> {
        self.page.field_change(self.nested_id(), field)
    }

    /// Forgets every persisted change of the page.
    pub fn discard_persistent_field_changes(&self) {
        self.page.discard_persistent_field_changes();
    }
}
