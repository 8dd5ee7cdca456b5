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

//! The public-facing SDK for Loom.
//!
//! Wires the page model to an application: configuration, logger setup, the
//! page cache and request rendering.

pub mod config;
pub mod logging;
pub mod page_source;
pub mod renderer;

pub use config::LoomConfig;
pub use page_source::{PageAssembler, PageSource};
pub use renderer::{EventResponse, PageRenderer};

pub use loom_core;
pub use loom_json;
pub use loom_page;

pub mod prelude {
    pub use crate::{EventResponse, LoomConfig, PageAssembler, PageRenderer, PageSource};
    pub use loom_core::ioc::{Args, Dependency, Injectable, PlanBuilder, Registry, RegistryBuilder};
    pub use loom_core::{ComponentResourceSelector, HandlerError, Location, MarkupWriter};
    pub use loom_json::{JsonArray, JsonObject, JsonValue};
    pub use loom_page::render::commands;
    pub use loom_page::{
        instantiator, Component, ComponentEvent, ComponentModel, ComponentResources, ElementId, EventContext,
        EventResult, InjectableInstantiator, LiteralBinding, Page, PageLifecycle, PhaseContext, PhaseResult,
        RenderPhase, ValueBinding,
    };
}
