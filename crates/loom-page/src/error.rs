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

//! Errors raised while assembling, rendering and dispatching events on a page.
//!
//! Every structural error carries the [`Location`] of the component that
//! caused it.

use crate::model::RenderPhase;
use loom_core::graph::OrderError;
use loom_core::{HandlerError, Location, LockedError};
use std::sync::Arc;

fn names_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Errors in the shape of a page: detected while it is assembled, or while
/// a render or event looks something up in it.
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    /// A container already has a child with the same (case-insensitive) id.
    #[error("Component {container} already contains a child component with id '{id}' ({location})")]
    DuplicateChildId {
        /// Complete id of the container.
        container: String,
        /// The repeated child id.
        id: String,
        /// Where the second child was declared.
        location: Location,
    },

    /// A page was given a second root component.
    #[error("Page {page} already has a root component ({location})")]
    DuplicateRoot {
        /// Name of the page.
        page: String,
        /// Where the second root was declared.
        location: Location,
    },

    /// A component already has a block with the same id.
    #[error("Component {component} already contains a block with id '{id}' ({location})")]
    DuplicateBlockId {
        /// Complete id of the component.
        component: String,
        /// The repeated block id.
        id: String,
        /// Where the second block was declared.
        location: Location,
    },

    /// The same mixin id was added twice to one element.
    #[error("Mixin '{mixin}' was already added to component {component}")]
    DuplicateMixin {
        /// Complete id of the component.
        component: String,
        /// The repeated mixin id.
        mixin: String,
    },

    /// A qualified parameter name referenced a mixin the element does not have.
    #[error("Mixin '{mixin}' (for parameter '{parameter}') was not found for component {component} ({location})")]
    UnknownMixin {
        /// Complete id of the component.
        component: String,
        /// The mixin id that was not found.
        mixin: String,
        /// The parameter being bound.
        parameter: String,
        /// Where the component was declared.
        location: Location,
    },

    /// Required parameters were left unbound when the page finished loading.
    #[error("Parameter(s) '{}' are required for {component}, but have not been bound ({location})", .parameters.join("', '"))]
    MissingParameters {
        /// Complete id of the component (with the mixin id, for mixins).
        component: String,
        /// Names of the unbound parameters, sorted.
        parameters: Vec<String>,
        /// Where the component was declared.
        location: Location,
    },

    /// A binding was supplied for an undeclared parameter of a component that
    /// does not accept informal parameters.
    #[error("Component {component} does not declare parameter '{parameter}' and does not support informal parameters ({location})")]
    InformalNotSupported {
        /// Complete id of the component.
        component: String,
        /// The undeclared parameter.
        parameter: String,
        /// Where the component was declared.
        location: Location,
    },

    /// The mixin ordering constraints of an element could not be satisfied.
    #[error("Unable to order the mixins of component {component}: {source}")]
    MixinOrder {
        /// Complete id of the component.
        component: String,
        /// The orderer failure.
        #[source]
        source: OrderError,
    },

    /// No component exists at the nested id.
    #[error("Page {page} does not contain a component with nested id '{nested_id}'")]
    UnknownComponent {
        /// Name of the page.
        page: String,
        /// The id that was looked up.
        nested_id: String,
    },

    /// A component has no block with the id.
    #[error("Component {component} does not contain a block with id '{id}'. Available block ids: {}", .available.join(", "))]
    UnknownBlock {
        /// Complete id of the component.
        component: String,
        /// The id that was looked up.
        id: String,
        /// Block ids that do exist, sorted.
        available: Vec<String>,
    },

    /// A render variable was read that the current render never stored.
    #[error("Component {component} does not contain a stored render variable with name '{name}'. Stored render variables: {}", names_or_none(.available))]
    UnknownRenderVariable {
        /// Complete id of the component.
        component: String,
        /// The variable that was looked up.
        name: String,
        /// Names that are stored, sorted.
        available: Vec<String>,
    },

    /// A render variable was stored outside of a render.
    #[error("Component {component} is not rendering, so render variable '{name}' may not be stored")]
    NotRendering {
        /// Complete id of the component.
        component: String,
        /// The variable name.
        name: String,
    },

    /// A persistent field change was posted before the page finished loading.
    #[error("Page {page} may not persist field changes until it has finished loading")]
    PersistBeforeLoad {
        /// Name of the page.
        page: String,
    },

    /// The page is locked against further structural changes.
    #[error(transparent)]
    Locked(#[from] LockedError),

    /// A component or mixin instance could not be created.
    #[error("Unable to instantiate component {component}: {source}")]
    Instantiation {
        /// Complete id of the component.
        component: String,
        /// The instantiator failure.
        #[source]
        source: HandlerError,
    },

    /// A page lifecycle callback failed.
    #[error("Page {page} failed while invoking {phase} callbacks: {source}")]
    Lifecycle {
        /// Name of the page.
        page: String,
        /// The lifecycle phase, such as `loaded` or `attached`.
        phase: &'static str,
        /// The callback failure.
        #[source]
        source: HandlerError,
    },
}

/// Errors raised while the render queue is drained.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A render phase handler failed.
    #[error("{phase} handler of {component} failed: {source} ({location})")]
    Handler {
        /// The phase being rendered.
        phase: RenderPhase,
        /// Complete id of the component (with the mixin id, for mixins).
        component: String,
        /// Where the component was declared.
        location: Location,
        /// The handler failure.
        #[source]
        source: HandlerError,
    },

    /// A component left elements open (or closed too many) while rendering.
    #[error("Component {component} has rendered unbalanced elements: the element open when it started rendering is not the element open when it finished ({location})")]
    UnbalancedElements {
        /// Complete id of the component.
        component: String,
        /// Where the component was declared.
        location: Location,
    },

    /// A component was asked to render while it was already rendering.
    #[error("The template for component {component} is recursive (contains another direct or indirect reference to component {component}) ({location})")]
    RecursiveRender {
        /// Complete id of the component.
        component: String,
        /// Where the component was declared.
        location: Location,
    },

    /// Reading or writing a parameter through its binding failed.
    #[error("Failure accessing parameter '{parameter}' of {component}: {source}")]
    Binding {
        /// Complete id of the component.
        component: String,
        /// The parameter name.
        parameter: String,
        /// The binding failure.
        #[source]
        source: HandlerError,
    },

    /// A user-supplied render command or renderable failed.
    #[error("Render command {command} failed: {source}")]
    Command {
        /// Debug form of the command.
        command: String,
        /// The failure.
        #[source]
        source: HandlerError,
    },

    /// A structural lookup failed during rendering.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// A command failed while the queue was draining; carries the stack of
    /// components that were rendering at the time.
    #[error("Render queue error in {command}: {source}")]
    Queue {
        /// Debug form of the failing command.
        command: String,
        /// Complete ids of the active components, outermost first.
        active_components: Vec<String>,
        /// The underlying failure.
        #[source]
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// The error without the render queue context.
    pub fn root(&self) -> &RenderError {
        match self {
            RenderError::Queue { source, .. } => source.root(),
            other => other,
        }
    }
}

/// An event handler failure, wrapped with where it happened.
///
/// This is the value passed as context to the `exception` event, and the
/// error returned to the caller when no handler recovers from it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ComponentEventError {
    /// Message of the original failure.
    pub message: String,
    /// The event being dispatched when the handler failed.
    pub event_type: String,
    /// Complete id of the component whose handler failed.
    pub component: String,
    /// Where that component was declared.
    pub location: Location,
    /// The original failure.
    #[source]
    pub source: HandlerError,
}

/// Errors raised by event dispatch.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A handler failed and no `exception` event handler recovered from it.
    #[error(transparent)]
    Handler(Arc<ComponentEventError>),

    /// A positional context value was requested past the end of the context.
    #[error("Event context has {count} value(s); index {index} is out of range")]
    MissingContext {
        /// The requested index.
        index: usize,
        /// Number of values in the context.
        count: usize,
    },

    /// A context value could not be coerced to the requested type.
    #[error("Event context value #{index} ({value}) can not be coerced to {expected}")]
    ContextCoercion {
        /// The index of the value.
        index: usize,
        /// What the caller asked for.
        expected: &'static str,
        /// Debug form of the value.
        value: String,
    },

    /// A structural lookup failed while dispatching.
    #[error(transparent)]
    Structure(#[from] StructureError),
}
