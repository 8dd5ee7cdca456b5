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

//! # Loom Page
//!
//! The structural model of a page and the engine that renders it.
//!
//! A [`Page`] owns an arena of [`ComponentPageElement`]s addressed by
//! [`ElementId`]. Each element carries a core component, its mixins, their
//! parameter bindings, a template, an optional body and named blocks. Pages are
//! assembled once on a single thread, locked by [`Page::loaded`], and then
//! shared by every request; per-request state lives in per-thread cells.
//!
//! Rendering drains a [`RenderQueue`] of [`RenderCommand`]s. Each element
//! contributes one command per render phase, collapsed at load time to the
//! phases its components actually handle. Events bubble from an element up
//! through its containers, see [`Page::trigger_context_event`].

#![warn(missing_docs)]

pub mod binding;
pub mod component;
pub mod error;
pub mod event;
pub mod model;
pub mod page;
pub mod render;

pub use binding::{Binding, LiteralBinding, ValueBinding};
pub use component::{
    instantiator, Component, ComponentId, FnInstantiator, InjectableInstantiator, InstantiationContext, Instantiator,
    PhaseContext, PhaseResult, Renderable,
};
pub use error::{ComponentEventError, EventError, RenderError, StructureError};
pub use event::{
    notification_callback, ComponentEvent, ContextValue, EventContext, EventResult,
    EXCEPTION_EVENT,
};
pub use model::{ComponentModel, PageLifecycle, ParameterModel, PhaseSet, RenderPhase};
pub use page::element::ComponentPageElement;
pub use page::persistence::{
    InMemoryPersistentFieldManager, PersistentFieldBundle, PersistentFieldManager,
};
pub use page::resources::{ComponentResources, InternalComponentResources};
pub use page::{ElementId, Page, PageCallback, PageStats};
pub use render::commands::{Block, PlaceholderBlock};
pub use render::queue::RenderQueue;
pub use render::{RenderCommand, RenderContext};
