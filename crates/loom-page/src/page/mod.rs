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

//! The page: an arena of component elements plus its lifecycle.
//!
//! A page is assembled through `&mut self` methods on one thread, then
//! [`loaded`](Page::loaded) resolves mixin orders, verifies parameters and
//! locks the structure. From then on the page is shared (`&Page`) by every
//! request thread.

pub mod element;
pub mod persistence;
pub mod resources;

use crate::binding::Binding;
use crate::component::{InstantiationContext, Instantiator};
use crate::error::{RenderError, StructureError};
use crate::model::{ComponentModel, PageLifecycle};
use crate::render::commands::Block;
use crate::render::phases::ElementCommand;
use crate::render::queue::RenderQueue;
use crate::render::RenderCommand;
use ahash::AHashMap;
use element::ComponentPageElement;
use loom_core::ioc::ObjectLocator;
use loom_core::per_thread::PerThreadValue;
use loom_core::{ComponentResourceSelector, HandlerError, Location, MarkupWriter, OneShotLock};
use loom_json::JsonValue;
use persistence::{InMemoryPersistentFieldManager, PersistentFieldBundle, PersistentFieldManager};
use resources::{ComponentResources, InternalComponentResources};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Handle to an element within its page's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    /// Position of the element in the arena, in creation order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A page lifecycle callback.
pub type PageCallback = Arc<dyn Fn(&Page) -> Result<(), HandlerError> + Send + Sync>;

/// Assembly statistics, recorded by whoever assembled the page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageStats {
    /// Wall time spent assembling the page.
    pub assembly_time: Duration,
    /// Number of elements (components) in the page.
    pub component_count: usize,
    /// Elements plus template commands; a rough measure of page size.
    pub weight: usize,
}

enum Listener {
    Component { element: ElementId, index: usize },
    Callback(PageCallback),
}

#[derive(Default)]
struct Listeners {
    loaded: Vec<Listener>,
    attached: Vec<Listener>,
    detached: Vec<Listener>,
    reset: Vec<Listener>,
}

impl Listeners {
    fn of(&self, event: PageLifecycle) -> &[Listener] {
        match event {
            PageLifecycle::Loaded => &self.loaded,
            PageLifecycle::Attached => &self.attached,
            PageLifecycle::Detached => &self.detached,
            PageLifecycle::Reset => &self.reset,
        }
    }

    fn of_mut(&mut self, event: PageLifecycle) -> &mut Vec<Listener> {
        match event {
            PageLifecycle::Loaded => &mut self.loaded,
            PageLifecycle::Attached => &mut self.attached,
            PageLifecycle::Detached => &mut self.detached,
            PageLifecycle::Reset => &mut self.reset,
        }
    }
}

fn lifecycle_name(event: PageLifecycle) -> &'static str {
    match event {
        PageLifecycle::Loaded => "loaded",
        PageLifecycle::Attached => "attached",
        PageLifecycle::Detached => "detached",
        PageLifecycle::Reset => "reset",
    }
}

/// A page: the root component, every embedded component and the structure
/// connecting them.
pub struct Page {
    name: String,
    selector: ComponentResourceSelector,
    elements: Vec<ComponentPageElement>,
    root: Option<ElementId>,
    nested_ids: RwLock<AHashMap<String, ElementId>>,
    lock: OneShotLock,
    listeners: Listeners,
    attach_count: AtomicUsize,
    stats: Option<PageStats>,
    field_manager: Arc<dyn PersistentFieldManager>,
    field_bundle: PerThreadValue<Arc<PersistentFieldBundle>>,
    locator: Option<Arc<dyn ObjectLocator>>,
}

impl Page {
    /// An empty page, open for assembly.
    pub fn new(name: impl Into<String>, selector: ComponentResourceSelector) -> Self {
        Self {
            name: name.into(),
            selector,
            elements: Vec::new(),
            root: None,
            nested_ids: RwLock::new(AHashMap::new()),
            lock: OneShotLock::new(),
            listeners: Listeners::default(),
            attach_count: AtomicUsize::new(0),
            stats: None,
            field_manager: Arc::new(InMemoryPersistentFieldManager::new()),
            field_bundle: PerThreadValue::new(),
            locator: None,
        }
    }

    /// Replaces the in-memory persistent field store.
    #[must_use]
    pub fn with_persistent_field_manager(mut self, manager: Arc<dyn PersistentFieldManager>) -> Self {
        self.field_manager = manager;
        self
    }

    /// Makes a service registry available to injectable components.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn ObjectLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// The logical page name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The locale and axes the page was assembled for.
    pub fn selector(&self) -> &ComponentResourceSelector {
        &self.selector
    }

    fn subject(&self) -> String {
        format!("Page {}", self.name)
    }

    fn check_open(&self) -> Result<(), StructureError> {
        Ok(self.lock.check(&self.subject())?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assembly
    // ─────────────────────────────────────────────────────────────────────────

    fn instantiate(
        &self,
        instantiator: &dyn Instantiator,
        complete_id: &str,
        mixin_id: Option<&str>,
    ) -> Result<InternalComponentResources, StructureError> {
        let ctx = InstantiationContext::new(&self.name, complete_id, self.locator.as_deref());
        let component = instantiator
            .new_instance(&ctx)
            .map_err(|source| StructureError::Instantiation {
                component: complete_id.to_string(),
                source,
            })?;
        Ok(InternalComponentResources::new(
            mixin_id.map(str::to_string),
            complete_id.to_string(),
            Arc::clone(instantiator.model()),
            component,
        ))
    }

    fn register_listeners(&mut self, model: &ComponentModel, element: ElementId, index: usize) {
        for &event in model.lifecycle() {
            self.listeners
                .of_mut(event)
                .push(Listener::Component { element, index });
        }
    }

    /// Creates the root element. Its complete id is the page name.
    pub fn create_root(&mut self, instantiator: &dyn Instantiator, location: Location) -> Result<ElementId, StructureError> {
        self.check_open()?;
        if self.root.is_some() {
            return Err(StructureError::DuplicateRoot {
                page: self.name.clone(),
                location,
            });
        }
        let handle = ElementId(self.elements.len() as u32);
        let complete_id = self.name.clone();
        let core = self.instantiate(instantiator, &complete_id, None)?;

        self.elements.push(ComponentPageElement::new(
            handle,
            String::new(),
            String::new(),
            complete_id,
            None,
            location,
            None,
            core,
        ));
        self.register_listeners(instantiator.model(), handle, 0);
        self.root = Some(handle);
        Ok(handle)
    }

    /// Creates an element embedded in `container` under the local `id`.
    pub fn new_child(
        &mut self,
        container: ElementId,
        id: &str,
        element_name: Option<&str>,
        instantiator: &dyn Instantiator,
        location: Location,
    ) -> Result<ElementId, StructureError> {
        self.check_open()?;
        let handle = ElementId(self.elements.len() as u32);
        let parent = self.element(container);
        let nested_id = if parent.nested_id().is_empty() {
            id.to_lowercase()
        } else {
            format!("{}.{}", parent.nested_id(), id.to_lowercase())
        };
        let complete_id = format!("{}:{nested_id}", self.name);

        let core = self.instantiate(instantiator, &complete_id, None)?;
        self.elements[container.index()].add_child(id, handle, &location)?;
        self.elements.push(ComponentPageElement::new(
            handle,
            id.to_string(),
            nested_id,
            complete_id,
            element_name.map(str::to_string),
            location,
            Some(container),
            core,
        ));
        self.register_listeners(instantiator.model(), handle, 0);
        Ok(handle)
    }

    /// Adds a mixin to an element. `constraints` are `before:<ids>` /
    /// `after:<ids>` orderings relative to the element's other mixins.
    pub fn add_mixin(
        &mut self,
        element: ElementId,
        mixin_id: &str,
        instantiator: &dyn Instantiator,
        constraints: &[&str],
    ) -> Result<(), StructureError> {
        self.check_open()?;
        let complete_id = format!("{}${}", self.element(element).complete_id(), mixin_id.to_lowercase());
        let resources = self.instantiate(instantiator, &complete_id, Some(mixin_id))?;

        let index = self.element(element).resources().len();
        self.elements[element.index()].add_mixin(mixin_id, resources, constraints)?;
        self.register_listeners(instantiator.model(), element, index);
        Ok(())
    }

    /// Binds a parameter of an element. `mixinId.parameter` targets a mixin.
    pub fn bind_parameter(&mut self, element: ElementId, name: &str, binding: Arc<dyn Binding>) -> Result<(), StructureError> {
        self.check_open()?;
        self.elements[element.index()].bind_parameter(name, binding)
    }

    /// Appends a command to the element's template.
    pub fn add_to_template(&mut self, element: ElementId, command: Arc<dyn RenderCommand>) -> Result<(), StructureError> {
        self.check_open()?;
        self.elements[element.index()].add_to_template(command);
        Ok(())
    }

    /// Appends a command to the element's body.
    pub fn add_to_body(&mut self, element: ElementId, command: Arc<dyn RenderCommand>) -> Result<(), StructureError> {
        self.check_open()?;
        self.elements[element.index()].add_to_body(command);
        Ok(())
    }

    /// Declares a named block on the element.
    pub fn add_block(&mut self, element: ElementId, id: &str, block: Block) -> Result<(), StructureError> {
        self.check_open()?;
        self.elements[element.index()].add_block(id, block)
    }

    /// The command that renders the element, for embedding in a template.
    pub fn element_command(&self, element: ElementId) -> Arc<dyn RenderCommand> {
        Arc::new(ElementCommand::new(element, self.element(element).complete_id()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structure
    // ─────────────────────────────────────────────────────────────────────────

    /// The root element, once created.
    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    /// The root element, once created.
    pub fn root_element(&self) -> Option<&ComponentPageElement> {
        self.root.map(|root| self.element(root))
    }

    /// The element behind a handle issued by this page.
    pub fn element(&self, element: ElementId) -> &ComponentPageElement {
        &self.elements[element.index()]
    }

    /// Every element, in creation order.
    pub fn elements(&self) -> &[ComponentPageElement] {
        &self.elements
    }

    /// Resources of the core component of an element.
    pub fn resources(&self, element: ElementId) -> ComponentResources<'_> {
        ComponentResources::new(self, element, 0)
    }

    /// The element at the nested id (case-insensitive); `""` is the root.
    ///
    /// Lookups are cached once the page is loaded.
    pub fn component_element_by_nested_id(&self, nested_id: &str) -> Result<&ComponentPageElement, StructureError> {
        let key = nested_id.to_lowercase();
        {
            let cache = self.nested_ids.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(&element) = cache.get(&key) {
                return Ok(self.element(element));
            }
        }

        let found = self
            .elements
            .iter()
            .find(|element| element.nested_id() == key)
            .ok_or_else(|| StructureError::UnknownComponent {
                page: self.name.clone(),
                nested_id: nested_id.to_string(),
            })?;
        if self.lock.is_locked() {
            self.nested_ids
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .entry(key)
                .or_insert(found.handle());
        }
        Ok(found)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    fn add_listener(&mut self, event: PageLifecycle, callback: PageCallback) -> Result<(), StructureError> {
        self.check_open()?;
        self.listeners.of_mut(event).push(Listener::Callback(callback));
        Ok(())
    }

    /// Registers a callback run once, when the page finishes loading.
    pub fn add_loaded_callback(
        &mut self,
        callback: impl Fn(&Page) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Result<(), StructureError> {
        self.add_listener(PageLifecycle::Loaded, Arc::new(callback))
    }

    /// Registers a callback run each time the page is attached to a request.
    pub fn add_attached_callback(
        &mut self,
        callback: impl Fn(&Page) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Result<(), StructureError> {
        self.add_listener(PageLifecycle::Attached, Arc::new(callback))
    }

    /// Registers a callback run each time the page is detached from a request.
    pub fn add_detached_callback(
        &mut self,
        callback: impl Fn(&Page) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Result<(), StructureError> {
        self.add_listener(PageLifecycle::Detached, Arc::new(callback))
    }

    /// Registers a callback run when the page is reset.
    pub fn add_reset_callback(
        &mut self,
        callback: impl Fn(&Page) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Result<(), StructureError> {
        self.add_listener(PageLifecycle::Reset, Arc::new(callback))
    }

    fn notify(&self, listener: &Listener, event: PageLifecycle) -> Result<(), HandlerError> {
        match listener {
            Listener::Component { element, index } => {
                let resources = ComponentResources::new(self, *element, *index);
                resources.internal().component().on_page_lifecycle(event, &resources)
            }
            Listener::Callback(callback) => callback(self),
        }
    }

    fn fire(&self, event: PageLifecycle) -> Result<(), StructureError> {
        for listener in self.listeners.of(event) {
            self.notify(listener, event)
                .map_err(|source| StructureError::Lifecycle {
                    page: self.name.clone(),
                    phase: lifecycle_name(event),
                    source,
                })?;
        }
        Ok(())
    }

    /// Finishes assembly: resolves mixin orders, verifies that required
    /// parameters are bound, locks the structure and runs the loaded
    /// callbacks.
    pub fn loaded(&mut self) -> Result<(), StructureError> {
        self.check_open()?;
        for element in &mut self.elements {
            element.page_loaded()?;
        }
        self.lock.lock(&self.subject())?;
        log::debug!("Page {} loaded with {} component(s)", self.name, self.elements.len());
        self.fire(PageLifecycle::Loaded)
    }

    /// Whether [`loaded`](Page::loaded) completed and the structure is locked.
    pub fn is_loaded(&self) -> bool {
        self.lock.is_locked()
    }

    /// Attaches the page to the current request.
    pub fn attached(&self) -> Result<(), StructureError> {
        self.attach_count.fetch_add(1, Ordering::Relaxed);
        self.fire(PageLifecycle::Attached)
    }

    /// Detaches the page from the current request. Every listener runs even
    /// when one fails; failures are logged.
    ///
    /// Returns `true` when a listener failed, in which case the page should
    /// not be reused.
    pub fn detached(&self) -> bool {
        let mut failed = false;
        for listener in self.listeners.of(PageLifecycle::Detached) {
            if let Err(error) = self.notify(listener, PageLifecycle::Detached) {
                log::error!("Failure detaching page {}: {error}", self.name);
                failed = true;
            }
        }
        self.field_bundle.remove();
        failed
    }

    /// Notifies the reset listeners.
    pub fn page_reset(&self) -> Result<(), StructureError> {
        self.fire(PageLifecycle::Reset)
    }

    /// Whether anything listens for [`page_reset`](Page::page_reset).
    pub fn has_reset_listeners(&self) -> bool {
        !self.listeners.of(PageLifecycle::Reset).is_empty()
    }

    /// How many times the page has been attached to a request.
    pub fn attach_count(&self) -> usize {
        self.attach_count.load(Ordering::Relaxed)
    }

    /// Records assembly statistics.
    pub fn set_stats(&mut self, stats: PageStats) {
        self.stats = Some(stats);
    }

    /// Assembly statistics, when recorded.
    pub fn stats(&self) -> Option<PageStats> {
        self.stats
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    /// Renders the whole page, starting at the root element.
    pub fn render(&self, writer: &mut dyn MarkupWriter) -> Result<(), RenderError> {
        let root = self.root.ok_or_else(|| StructureError::UnknownComponent {
            page: self.name.clone(),
            nested_id: String::new(),
        })?;
        let mut queue = RenderQueue::new();
        self.render_with(root, writer, &mut queue)
    }

    /// Renders one element (and whatever it contains) through the given queue.
    pub fn render_with(
        &self,
        element: ElementId,
        writer: &mut dyn MarkupWriter,
        queue: &mut RenderQueue,
    ) -> Result<(), RenderError> {
        self.render_command(self.element_command(element), writer, queue)
    }

    /// Drains the queue starting from an arbitrary command, such as markup
    /// returned by an event handler.
    ///
    /// When a command fails, every element this thread left mid-render gets
    /// its post-render cleanup, so the page stays renderable.
    pub fn render_command(
        &self,
        command: Arc<dyn RenderCommand>,
        writer: &mut dyn MarkupWriter,
        queue: &mut RenderQueue,
    ) -> Result<(), RenderError> {
        queue.push(command);
        let result = queue.run(self, writer);
        if result.is_err() {
            self.abandon_render();
        }
        result
    }

    fn abandon_render(&self) {
        for element in self.elements.iter().filter(|element| element.is_rendering()) {
            log::debug!(target: "loom::render", "Cleaning up {} after a failed render", element.complete_id());
            element.set_rendering(false);
            element.post_render_cleanup(self);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistent fields
    // ─────────────────────────────────────────────────────────────────────────

    /// Records a persistent field change of the component at `nested_id`.
    pub fn persist_field_change(&self, nested_id: &str, field: &str, value: JsonValue) -> Result<(), StructureError> {
        if !self.lock.is_locked() {
            return Err(StructureError::PersistBeforeLoad {
                page: self.name.clone(),
            });
        }
        self.field_manager
            .post_change(&self.name, nested_id, field, value);
        // The next read gathers a fresh bundle that includes the change.
        self.field_bundle.remove();
        Ok(())
    }

    /// The persisted value of a field. The bundle of changes is gathered
    /// once per thread and request.
    pub fn field_change(&self, nested_id: &str, field: &str) -> Option<JsonValue> {
        let bundle = match self.field_bundle.get() {
            Some(bundle) => bundle,
            None => {
                let bundle = Arc::new(self.field_manager.gather_field_changes(&self.name));
                self.field_bundle.set(Arc::clone(&bundle));
                bundle
            }
        };
        bundle.value(nested_id, field).cloned()
    }

    /// Forgets every persisted change of the page.
    pub fn discard_persistent_field_changes(&self) {
        self.field_manager.discard_changes(&self.name);
        self.field_bundle.remove();
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("elements", &self.elements.len())
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{instantiator, Component};

    struct Nothing;

    impl Component for Nothing {}

    fn plain(name: &str) -> Arc<dyn Instantiator> {
        instantiator(ComponentModel::new(name), || Nothing)
    }

    #[test]
    fn test_ids_follow_nesting() {
        let mut page = Page::new("Index", ComponentResourceSelector::default());
        let root = page.create_root(&plain("Index"), Location::unknown()).unwrap();
        let form = page.new_child(root, "Form", Some("form"), &plain("Form"), Location::unknown()).unwrap();
        let field = page.new_child(form, "Name", None, &plain("TextField"), Location::unknown()).unwrap();

        assert_eq!(page.element(root).complete_id(), "Index");
        assert_eq!(page.element(form).complete_id(), "Index:form");
        assert_eq!(page.element(field).nested_id(), "form.name");
        assert_eq!(page.element(field).id(), "Name");
        assert_eq!(page.element(field).container(), Some(form));
    }

    #[test]
    fn test_duplicate_child_id_is_case_insensitive() {
        let mut page = Page::new("Index", ComponentResourceSelector::default());
        let root = page.create_root(&plain("Index"), Location::unknown()).unwrap();
        page.new_child(root, "grid", None, &plain("Grid"), Location::unknown()).unwrap();

        let error = page
            .new_child(root, "Grid", None, &plain("Grid"), Location::new("Index.tml", 9))
            .unwrap_err();

        assert!(matches!(error, StructureError::DuplicateChildId { .. }));
        assert_eq!(page.elements().len(), 2);
    }

    #[test]
    fn test_second_root_rejected() {
        let mut page = Page::new("Index", ComponentResourceSelector::default());
        page.create_root(&plain("Index"), Location::unknown()).unwrap();
        let error = page.create_root(&plain("Index"), Location::unknown()).unwrap_err();
        assert!(matches!(error, StructureError::DuplicateRoot { .. }));
    }

    #[test]
    fn test_nested_id_lookup() {
        let mut page = Page::new("Index", ComponentResourceSelector::default());
        let root = page.create_root(&plain("Index"), Location::unknown()).unwrap();
        let child = page.new_child(root, "Inner", None, &plain("Inner"), Location::unknown()).unwrap();
        page.loaded().unwrap();

        assert_eq!(page.component_element_by_nested_id("").unwrap().handle(), root);
        assert_eq!(page.component_element_by_nested_id("INNER").unwrap().handle(), child);
        assert_eq!(page.component_element_by_nested_id("inner").unwrap().handle(), child);
        assert!(matches!(
            page.component_element_by_nested_id("missing"),
            Err(StructureError::UnknownComponent { .. })
        ));
    }

    #[test]
    fn test_structure_locked_after_load() {
        let mut page = Page::new("Index", ComponentResourceSelector::default());
        let root = page.create_root(&plain("Index"), Location::unknown()).unwrap();
        page.loaded().unwrap();

        assert!(page.is_loaded());
        assert!(matches!(
            page.new_child(root, "late", None, &plain("Late"), Location::unknown()),
            Err(StructureError::Locked(_))
        ));
        assert!(matches!(page.add_loaded_callback(|_| Ok(())), Err(StructureError::Locked(_))));
        assert!(matches!(page.loaded(), Err(StructureError::Locked(_))));
    }

    #[test]
    fn test_persist_requires_load() {
        let mut page = Page::new("Index", ComponentResourceSelector::default());
        page.create_root(&plain("Index"), Location::unknown()).unwrap();
        assert!(matches!(
            page.persist_field_change("", "count", JsonValue::from(1)),
            Err(StructureError::PersistBeforeLoad { .. })
        ));

        page.loaded().unwrap();
        page.persist_field_change("", "count", JsonValue::from(1)).unwrap();
        assert_eq!(page.field_change("", "COUNT"), Some(JsonValue::from(1)));

        page.discard_persistent_field_changes();
        assert_eq!(page.field_change("", "count"), None);
    }
}
