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

//! Request-level rendering: full pages, partial (Ajax) replies and component
//! event requests.
//!
//! Every request runs inside a [`RequestScope`], so per-thread render state
//! never leaks from one request into the next, and between
//! [`Page::attached`] and [`Page::detached`].

use crate::config::LoomConfig;
use crate::page_source::PageSource;
use anyhow::{Context, Result};
use loom_core::{RequestScope, StringMarkupWriter};
use loom_json::{JsonObject, JsonValue};
use loom_page::{ElementId, EventContext, EventResult, Page, RenderCommand, RenderQueue};
use std::sync::Arc;

/// The reply to a component event request.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResponse {
    /// No handler matched the event.
    Unhandled,
    /// A handler matched and returned nothing to send back.
    Handled,
    /// JSON to send back. Markup returned by a handler arrives as a partial
    /// reply object.
    Json(JsonValue),
}

/// Renders pages from a [`PageSource`] according to a [`LoomConfig`].
pub struct PageRenderer {
    config: LoomConfig,
    source: Arc<PageSource>,
}

impl PageRenderer {
    /// A renderer over the given page cache.
    pub fn new(config: LoomConfig, source: Arc<PageSource>) -> Self {
        Self { config, source }
    }

    /// The configuration in use.
    pub fn config(&self) -> &LoomConfig {
        &self.config
    }

    /// The page cache.
    pub fn source(&self) -> &Arc<PageSource> {
        &self.source
    }

    /// Renders the whole page in the negotiated locale.
    pub fn render_page(&self, name: &str, locale: &str) -> Result<String> {
        self.with_page(name, locale, |page| {
            let root = page
                .root()
                .with_context(|| format!("Page {} has no root component", page.name()))?;
            self.render_element(page, root)
        })
    }

    /// Renders one component of the page and wraps its markup in a JSON
    /// reply, under the configured content key.
    pub fn render_partial(&self, name: &str, locale: &str, nested_id: &str) -> Result<JsonObject> {
        self.with_page(name, locale, |page| {
            let element = page.component_element_by_nested_id(nested_id)?.handle();
            let markup = self.render_element(page, element)?;
            self.partial_reply(markup)
        })
    }

    /// Triggers an event on a component of the page.
    ///
    /// JSON results are returned as is; markup results are rendered into a
    /// partial reply. The first result ends the event.
    pub fn handle_component_event(
        &self,
        name: &str,
        locale: &str,
        nested_id: &str,
        event_type: &str,
        context: EventContext,
    ) -> Result<EventResponse> {
        self.with_page(name, locale, |page| {
            let element = page.component_element_by_nested_id(nested_id)?.handle();
            let mut reply = None;
            let handled = page.trigger_context_event(element, event_type, context, &mut |result| match result {
                EventResult::Bool(_) => Ok(false),
                EventResult::Json(value) => {
                    reply = Some(Reply::Json(value));
                    Ok(true)
                }
                EventResult::Command(command) => {
                    reply = Some(Reply::Markup(command));
                    Ok(true)
                }
                EventResult::Object(_) => {
                    Err(format!("Event '{event_type}' returned a value that cannot be sent as a reply").into())
                }
            })?;
            log::debug!(
                "Event '{event_type}' on {}:{nested_id} {}",
                page.name(),
                if handled { "handled" } else { "unhandled" }
            );

            match reply {
                Some(Reply::Json(value)) => Ok(EventResponse::Json(value)),
                Some(Reply::Markup(command)) => {
                    let mut writer = StringMarkupWriter::new();
                    let mut queue = self.queue();
                    page.render_command(command, &mut writer, &mut queue)?;
                    Ok(EventResponse::Json(JsonValue::Object(self.partial_reply(writer.to_markup())?)))
                }
                None if handled => Ok(EventResponse::Handled),
                None => Ok(EventResponse::Unhandled),
            }
        })
    }

    fn with_page<R>(&self, name: &str, locale: &str, request: impl FnOnce(&Page) -> Result<R>) -> Result<R> {
        let _scope = RequestScope::begin();
        let page = self.source.get_page(name, &self.config.selector_for(locale))?;
        let result = page
            .attached()
            .with_context(|| format!("Failed to attach page {}", page.name()))
            .and_then(|()| request(&page));
        if page.detached() {
            log::warn!("Page {} reported failures while detaching", page.name());
        }
        result
    }

    fn queue(&self) -> RenderQueue {
        RenderQueue::new().with_tracing(self.config.render_tracing())
    }

    fn render_element(&self, page: &Page, element: ElementId) -> Result<String> {
        let mut writer = StringMarkupWriter::new();
        let mut queue = self.queue();
        if let Err(error) = page.render_with(element, &mut writer, &mut queue) {
            if !queue.trace().is_empty() {
                log::debug!("Render queue trace:\n  {}", queue.trace().join("\n  "));
            }
            return Err(error)
                .with_context(|| format!("Failed to render {}", page.element(element).complete_id()));
        }
        log::trace!(
            "Rendered {} with {} commands",
            page.element(element).complete_id(),
            queue.executed()
        );
        Ok(writer.to_markup())
    }

    fn partial_reply(&self, markup: String) -> Result<JsonObject> {
        let mut reply = JsonObject::new();
        reply.put(self.config.partial_content_key.as_str(), markup)?;
        Ok(reply)
    }
}

enum Reply {
    Json(JsonValue),
    Markup(Arc<dyn RenderCommand>),
}
