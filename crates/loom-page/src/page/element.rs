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

use super::resources::{ComponentResources, InternalComponentResources};
use super::{ElementId, Page};
use crate::binding::Binding;
use crate::component::{PhaseContext, PhaseResult};
use crate::error::{ComponentEventError, RenderError, StructureError};
use crate::event::ComponentEvent;
use crate::model::{PhaseSet, RenderPhase};
use crate::render::commands::{self, Block};
use crate::render::phases::PhaseChain;
use crate::render::queue::RenderQueue;
use crate::render::RenderCommand;
use loom_core::graph::Orderer;
use loom_core::per_thread::PerThreadValue;
use loom_core::{Location, MarkupWriter, NamedSet};
use std::fmt;
use std::sync::Arc;

/// Where a mixin sits in the element's resources, and how it wants to be ordered.
#[derive(Debug)]
struct MixinSlot {
    index: usize,
    constraints: Vec<String>,
}

/// What invoking one render phase on every component of an element produced.
pub(crate) struct PhaseOutcome {
    /// `false` when a handler aborted the phase.
    pub(crate) result: bool,
    /// Commands returned by handlers, in the order they were produced.
    pub(crate) saved: Vec<Arc<dyn RenderCommand>>,
}

impl Default for PhaseOutcome {
    fn default() -> Self {
        Self {
            result: true,
            saved: Vec::new(),
        }
    }
}

/// One node of a page: a core component, its mixins and its template.
///
/// The resources at index 0 belong to the core component; mixins follow in
/// the order they were added. The invocation order is resolved when the page
/// loads: mixins marked "before" first, then the core, then mixins marked
/// "after", each group ordered by its constraints.
pub struct ComponentPageElement {
    handle: ElementId,
    id: String,
    nested_id: String,
    complete_id: String,
    element_name: Option<String>,
    location: Location,
    container: Option<ElementId>,
    children: NamedSet<ElementId>,
    resources: Vec<InternalComponentResources>,
    mixins: NamedSet<MixinSlot>,
    order: Vec<usize>,
    template: Option<Vec<Arc<dyn RenderCommand>>>,
    body: Option<Arc<Block>>,
    blocks: NamedSet<Arc<Block>>,
    phases: PhaseChain,
    rendering: PerThreadValue<bool>,
}

impl ComponentPageElement {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        handle: ElementId,
        id: String,
        nested_id: String,
        complete_id: String,
        element_name: Option<String>,
        location: Location,
        container: Option<ElementId>,
        core: InternalComponentResources,
    ) -> Self {
        let phases = PhaseChain::new(handle, &complete_id, core.model().handled_phases());
        Self {
            handle,
            id,
            nested_id,
            complete_id,
            element_name,
            location,
            container,
            children: NamedSet::new(),
            resources: vec![core],
            mixins: NamedSet::new(),
            order: vec![0],
            template: None,
            body: None,
            blocks: NamedSet::new(),
            phases,
            rendering: PerThreadValue::new(),
        }
    }

    // --- Identity ---

    /// The handle of this element within its page.
    pub fn handle(&self) -> ElementId {
        self.handle
    }

    /// The local id; empty for the root element.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The lowercased, dotted path from the root; empty for the root.
    pub fn nested_id(&self) -> &str {
        &self.nested_id
    }

    /// `PageName` for the root, `PageName:nested.id` for other elements.
    pub fn complete_id(&self) -> &str {
        &self.complete_id
    }

    /// The markup element the component was declared on, if any.
    pub fn element_name(&self) -> Option<&str> {
        self.element_name.as_deref()
    }

    /// Where the element was declared.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The containing element; `None` for the root.
    pub fn container(&self) -> Option<ElementId> {
        self.container
    }

    /// The child with the local id (case-insensitive).
    pub fn embedded(&self, id: &str) -> Option<ElementId> {
        self.children.get(id).copied()
    }

    /// Child handles, in declaration order.
    pub fn children(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.children.values().copied()
    }

    // --- Components ---

    pub(crate) fn resources_at(&self, index: usize) -> &InternalComponentResources {
        &self.resources[index]
    }

    /// The core component and then each mixin, in the order they were added.
    pub fn resources(&self) -> &[InternalComponentResources] {
        &self.resources
    }

    /// The ids of the mixins, in the order they were added.
    pub fn mixin_ids(&self) -> Vec<String> {
        self.mixins.names().map(str::to_string).collect()
    }

    /// Complete ids of the core component and mixins in invocation order.
    pub fn component_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&index| self.resources[index].complete_id())
            .collect()
    }

    /// Render phases handled by at least one component of the element.
    pub fn handled_phases(&self) -> PhaseSet {
        self.resources
            .iter()
            .fold(PhaseSet::EMPTY, |set, resources| {
                set.union(resources.model().handled_phases())
            })
    }

    /// Number of commands in the template; zero without one.
    pub fn template_len(&self) -> usize {
        self.template.as_ref().map_or(0, Vec::len)
    }

    // --- Assembly ---

    pub(crate) fn add_child(&mut self, id: &str, child: ElementId, location: &Location) -> Result<(), StructureError> {
        if !self.children.put_if_new(id, child) {
            return Err(StructureError::DuplicateChildId {
                container: self.complete_id.clone(),
                id: id.to_string(),
                location: location.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn add_mixin(
        &mut self,
        mixin_id: &str,
        resources: InternalComponentResources,
        constraints: &[&str],
    ) -> Result<(), StructureError> {
        let slot = MixinSlot {
            index: self.resources.len(),
            constraints: constraints.iter().map(|c| c.to_string()).collect(),
        };
        if !self.mixins.put_if_new(mixin_id, slot) {
            return Err(StructureError::DuplicateMixin {
                component: self.complete_id.clone(),
                mixin: mixin_id.to_string(),
            });
        }
        self.order.push(self.resources.len());
        self.resources.push(resources);
        self.phases = PhaseChain::new(self.handle, &self.complete_id, self.handled_phases());
        Ok(())
    }

    /// Routes a binding to the core component or to a mixin.
    ///
    /// `mixinId.parameter` targets a mixin explicitly. Otherwise the core's
    /// formal parameters win, then the mixins' formal parameters; anything
    /// else is informal and goes to the first mixin that accepts informal
    /// parameters, falling back to the core.
    pub(crate) fn bind_parameter(&mut self, name: &str, binding: Arc<dyn Binding>) -> Result<(), StructureError> {
        if let Some((mixin_id, parameter)) = name.split_once('.') {
            let index = self
                .mixins
                .get(mixin_id)
                .map(|slot| slot.index)
                .ok_or_else(|| StructureError::UnknownMixin {
                    component: self.complete_id.clone(),
                    mixin: mixin_id.to_string(),
                    parameter: parameter.to_string(),
                    location: self.location.clone(),
                })?;
            return self.resources[index].bind_parameter(parameter, binding, &self.location);
        }

        let formal = self
            .resources
            .iter()
            .position(|resources| resources.model().parameter_model(name).is_some());
        // Informal: the core when it takes them, else the first mixin that does.
        let index = formal
            .or_else(|| {
                self.resources
                    .iter()
                    .position(|resources| resources.model().supports_informal_parameters())
            })
            .unwrap_or(0);
        self.resources[index].bind_parameter(name, binding, &self.location)
    }

    pub(crate) fn add_to_template(&mut self, command: Arc<dyn RenderCommand>) {
        self.template.get_or_insert_with(Vec::new).push(command);
    }

    pub(crate) fn add_to_body(&mut self, command: Arc<dyn RenderCommand>) {
        let description = format!("body of {}", self.complete_id);
        let location = self.location.clone();
        let body = self
            .body
            .get_or_insert_with(|| Arc::new(Block::new(description, location)));
        Arc::make_mut(body).add(command);
    }

    pub(crate) fn add_block(&mut self, id: &str, block: Block) -> Result<(), StructureError> {
        let location = block.location().clone();
        if !self.blocks.put_if_new(id, Arc::new(block)) {
            return Err(StructureError::DuplicateBlockId {
                component: self.complete_id.clone(),
                id: id.to_string(),
                location,
            });
        }
        Ok(())
    }

    /// Resolves the mixin order and checks that every required parameter is
    /// bound.
    pub(crate) fn page_loaded(&mut self) -> Result<(), StructureError> {
        if !self.mixins.is_empty() {
            let mut before = Orderer::new();
            let mut after = Orderer::new();
            for (mixin_id, slot) in self.mixins.iter() {
                let constraints: Vec<&str> = slot.constraints.iter().map(String::as_str).collect();
                let orderer = if self.resources[slot.index].model().is_mixin_after() {
                    &mut after
                } else {
                    &mut before
                };
                orderer
                    .add(mixin_id, slot.index, &constraints)
                    .map_err(|source| self.order_error(source))?;
            }
            let before = before.into_ordered().map_err(|source| self.order_error(source))?;
            let after = after.into_ordered().map_err(|source| self.order_error(source))?;

            self.order = before
                .into_iter()
                .map(|(_, index)| index)
                .chain(std::iter::once(0))
                .chain(after.into_iter().map(|(_, index)| index))
                .collect();
        }

        for resources in &self.resources {
            resources.verify_required_parameters(&self.location)?;
        }
        Ok(())
    }

    fn order_error(&self, source: loom_core::graph::OrderError) -> StructureError {
        StructureError::MixinOrder {
            component: self.complete_id.clone(),
            source,
        }
    }

    // --- Body and blocks ---

    /// The body, if the element has one.
    pub fn body(&self) -> Option<Arc<dyn RenderCommand>> {
        self.body
            .as_ref()
            .map(|body| Arc::clone(body) as Arc<dyn RenderCommand>)
    }

    /// The block with the id (case-insensitive).
    pub fn block(&self, id: &str) -> Option<Arc<Block>> {
        self.blocks.get(id).cloned()
    }

    /// Declared block ids, sorted.
    pub fn block_ids(&self) -> Vec<String> {
        self.blocks.sorted_names()
    }

    // --- Rendering ---

    pub(crate) fn phase_chain(&self) -> &PhaseChain {
        &self.phases
    }

    /// Whether the element is rendering on the current thread.
    pub fn is_rendering(&self) -> bool {
        self.rendering.get().unwrap_or(false)
    }

    pub(crate) fn set_rendering(&self, rendering: bool) {
        if rendering {
            self.rendering.set(true);
        } else {
            self.rendering.remove();
        }
    }

    /// Invokes `phase` on each component that handles it: in component
    /// order for forward phases, in reverse for the `After*` and cleanup
    /// phases. A `true`/`false` result stops the walk.
    pub(crate) fn invoke_phase(
        &self,
        page: &Page,
        phase: RenderPhase,
        writer: &mut dyn MarkupWriter,
    ) -> Result<PhaseOutcome, RenderError> {
        let mut outcome = PhaseOutcome::default();
        let count = self.order.len();

        for position in 0..count {
            let index = if phase.is_reverse() {
                self.order[count - 1 - position]
            } else {
                self.order[position]
            };
            let resources = &self.resources[index];
            if !resources.model().handled_phases().contains(phase) {
                continue;
            }

            let mut ctx = PhaseContext::new(&mut *writer, ComponentResources::new(page, self.handle, index));
            let result = resources
                .component()
                .render_phase(phase, &mut ctx)
                .map_err(|source| RenderError::Handler {
                    phase,
                    component: resources.complete_id().to_string(),
                    location: self.location.clone(),
                    source,
                })?;

            match result {
                PhaseResult::None => {}
                PhaseResult::Continue => {
                    outcome.result = true;
                    break;
                }
                PhaseResult::Abort => {
                    outcome.result = false;
                    break;
                }
                PhaseResult::Command(command) => outcome.saved.push(command),
                PhaseResult::Renderable(renderable) => outcome.saved.push(commands::renderable(renderable)),
            }
        }
        Ok(outcome)
    }

    /// Queues the template, or the body when the component has no template.
    pub(crate) fn push_template(&self, queue: &mut RenderQueue) {
        match &self.template {
            Some(template) => {
                for command in template.iter().rev() {
                    queue.push(Arc::clone(command));
                }
            }
            None => self.enqueue_before_render_body(queue),
        }
    }

    pub(crate) fn push_body(&self, queue: &mut RenderQueue) {
        if let Some(body) = &self.body {
            queue.push(Arc::clone(body) as Arc<dyn RenderCommand>);
        }
    }

    /// Queues the body phases. Elements without a body skip them entirely.
    pub fn enqueue_before_render_body(&self, queue: &mut RenderQueue) {
        if self.body.is_some() {
            queue.push(Arc::clone(self.phases.before_body()));
        }
    }

    pub(crate) fn post_render_cleanup(&self, page: &Page) {
        for (index, resources) in self.resources.iter().enumerate() {
            resources.post_render_cleanup();
            resources
                .component()
                .post_render_cleanup(&ComponentResources::new(page, self.handle, index));
        }
    }

    // --- Events ---

    /// Offers the event to every component of the element in component
    /// order, stopping once a handler aborts it.
    pub(crate) fn dispatch_event(&self, page: &Page, event: &mut ComponentEvent<'_>) -> Result<bool, ComponentEventError> {
        let mut handled = false;
        for &index in &self.order {
            let resources = &self.resources[index];
            let matched = resources
                .component()
                .dispatch_event(event, &ComponentResources::new(page, self.handle, index))
                .map_err(|source| ComponentEventError {
                    message: source.to_string(),
                    event_type: event.event_type().to_string(),
                    component: resources.complete_id().to_string(),
                    location: self.location.clone(),
                    source,
                })?;
            handled |= matched;
            if event.is_aborted() {
                break;
            }
        }
        Ok(handled)
    }
}

impl fmt::Debug for ComponentPageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentPageElement")
            .field("complete_id", &self.complete_id)
            .field("location", &self.location)
            .field("mixins", &self.mixins.names().collect::<Vec<_>>())
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}
