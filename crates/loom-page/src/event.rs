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

//! Component events and their propagation up the containment hierarchy.
//!
//! An event starts at one element and is offered to its core component and
//! mixins. Unless a handler aborts it, the event then moves to the container,
//! with the component id updated to the id of the child it came from, and so
//! on up to the root.
//!
//! A handler failure does not end dispatch immediately: the failure is
//! wrapped in a [`ComponentEventError`] and an [`EXCEPTION_EVENT`] carrying it
//! is dispatched from the same element. A handler that aborts that event
//! recovers from the failure. If nobody does, or if a second failure occurs
//! along the way, the first failure is returned to the caller.

use crate::error::{ComponentEventError, EventError};
use crate::page::{ElementId, Page};
use crate::render::RenderCommand;
use loom_core::{HandlerError, OperationTracker};
use loom_json::JsonValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The event dispatched when a handler of another event fails.
pub const EXCEPTION_EVENT: &str = "exception";

// ─────────────────────────────────────────────────────────────────────────────
// Event context
// ─────────────────────────────────────────────────────────────────────────────

/// One positional value of an event context.
#[derive(Debug, Clone)]
pub enum ContextValue {
    /// A plain value.
    Value(JsonValue),
    /// The failure carried by an [`EXCEPTION_EVENT`].
    Error(Arc<ComponentEventError>),
}

impl From<JsonValue> for ContextValue {
    fn from(value: JsonValue) -> Self {
        ContextValue::Value(value)
    }
}

/// The positional values passed along with an event.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    values: Vec<ContextValue>,
}

impl EventContext {
    /// A context holding the values, in order.
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self {
            values: values
                .into_iter()
                .map(|value| ContextValue::Value(value.into()))
                .collect(),
        }
    }

    /// The context of an exception event.
    pub fn from_error(error: Arc<ComponentEventError>) -> Self {
        Self {
            values: vec![ContextValue::Error(error)],
        }
    }

    /// Number of values.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Whether the context has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw value at `index`.
    pub fn get(&self, index: usize) -> Result<&ContextValue, EventError> {
        self.values.get(index).ok_or(EventError::MissingContext {
            index,
            count: self.values.len(),
        })
    }

    fn coercion(index: usize, expected: &'static str, value: &ContextValue) -> EventError {
        EventError::ContextCoercion {
            index,
            expected,
            value: match value {
                ContextValue::Value(value) => value.to_string(),
                ContextValue::Error(error) => format!("error: {error}"),
            },
        }
    }

    /// The JSON value at `index`.
    pub fn get_value(&self, index: usize) -> Result<&JsonValue, EventError> {
        match self.get(index)? {
            ContextValue::Value(value) => Ok(value),
            other => Err(Self::coercion(index, "a value", other)),
        }
    }

    /// The value at `index` as a string.
    pub fn get_string(&self, index: usize) -> Result<String, EventError> {
        self.get_value(index).map(JsonValue::coerce_string)
    }

    /// The value at `index` as an integer.
    pub fn get_i64(&self, index: usize) -> Result<i64, EventError> {
        let value = self.get(index)?;
        let coerced = match value {
            ContextValue::Value(json) => json.coerce_i64(),
            ContextValue::Error(_) => None,
        };
        coerced.ok_or_else(|| Self::coercion(index, "an integer", value))
    }

    /// The value at `index` as a float.
    pub fn get_f64(&self, index: usize) -> Result<f64, EventError> {
        let value = self.get(index)?;
        let coerced = match value {
            ContextValue::Value(json) => json.coerce_f64(),
            ContextValue::Error(_) => None,
        };
        coerced.ok_or_else(|| Self::coercion(index, "a number", value))
    }

    /// The value at `index` as a boolean.
    pub fn get_bool(&self, index: usize) -> Result<bool, EventError> {
        let value = self.get(index)?;
        let coerced = match value {
            ContextValue::Value(json) => json.coerce_bool(),
            ContextValue::Error(_) => None,
        };
        coerced.ok_or_else(|| Self::coercion(index, "a boolean", value))
    }

    /// The failure at `index` (exception events carry it at index 0).
    pub fn get_error(&self, index: usize) -> Result<Arc<ComponentEventError>, EventError> {
        match self.get(index)? {
            ContextValue::Error(error) => Ok(Arc::clone(error)),
            other => Err(Self::coercion(index, "an error", other)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event results
// ─────────────────────────────────────────────────────────────────────────────

/// A value produced by an event handler.
#[derive(Clone)]
pub enum EventResult {
    /// `true` aborts the event; `false` lets the search for handlers continue.
    /// Never reaches the caller's callback.
    Bool(bool),
    /// A JSON reply, typically for a partial page update.
    Json(JsonValue),
    /// Markup to render in reply.
    Command(Arc<dyn RenderCommand>),
    /// Anything else the caller knows how to handle.
    Object(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for EventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventResult::Bool(value) => write!(f, "Bool({value})"),
            EventResult::Json(value) => write!(f, "Json({value})"),
            EventResult::Command(command) => write!(f, "Command({command:?})"),
            EventResult::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// A callback that accepts no results: for events that only notify.
///
/// Boolean results are consumed before they reach a callback, so anything
/// this sees is an error.
pub fn notification_callback(
    event_type: &str,
    component: &str,
) -> impl FnMut(EventResult) -> Result<bool, HandlerError> {
    let event_type = event_type.to_string();
    let component = component.to_string();
    move |result: EventResult| -> Result<bool, HandlerError> {
        Err(format!(
            "Event '{event_type}' from {component} received a return value of {result:?}, \
             but the event was triggered as a notification and does not accept return values"
        )
        .into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentEvent
// ─────────────────────────────────────────────────────────────────────────────

/// An event, as offered to the handlers of one element.
pub struct ComponentEvent<'a> {
    event_type: &'a str,
    component_id: &'a str,
    context: &'a EventContext,
    callback: &'a mut dyn FnMut(EventResult) -> Result<bool, HandlerError>,
    aborted: bool,
}

impl<'a> ComponentEvent<'a> {
    pub(crate) fn new(
        event_type: &'a str,
        component_id: &'a str,
        context: &'a EventContext,
        callback: &'a mut dyn FnMut(EventResult) -> Result<bool, HandlerError>,
    ) -> Self {
        Self {
            event_type,
            component_id,
            context,
            callback,
            aborted: false,
        }
    }

    /// Whether a handler declared for `event_type` on `component_id`, taking
    /// `parameter_count` context values, should be invoked.
    ///
    /// Names compare case-insensitively; an empty component id means the
    /// event originated on the element itself. Nothing matches once the event
    /// is aborted.
    pub fn matches(&self, event_type: &str, component_id: &str, parameter_count: usize) -> bool {
        !self.aborted
            && self.event_type.eq_ignore_ascii_case(event_type)
            && self.component_id.eq_ignore_ascii_case(component_id)
            && self.context.count() >= parameter_count
    }

    /// Passes a handler result to the callback. Returns whether the event is
    /// now aborted.
    pub fn store_result(&mut self, result: EventResult) -> Result<bool, HandlerError> {
        if self.aborted {
            return Err(format!(
                "Event '{}' has already been aborted; result {result:?} can not be stored",
                self.event_type
            )
            .into());
        }
        self.aborted = (self.callback)(result)?;
        Ok(self.aborted)
    }

    /// Whether a handler aborted the event.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// The event type (`exception` while recovering from a failure).
    pub fn event_type(&self) -> &str {
        self.event_type
    }

    /// Id of the child the event bubbled up from; empty at the origin.
    pub fn component_id(&self) -> &str {
        self.component_id
    }

    /// The event context.
    pub fn context(&self) -> &EventContext {
        self.context
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

impl Page {
    /// Triggers an event on `element` and bubbles it up through the
    /// containers until a handler aborts it or the root is passed.
    ///
    /// Boolean handler results steer dispatch (`true` aborts); every other
    /// result goes to `callback`, whose return value aborts in the same way.
    /// Returns whether any handler matched.
    pub fn trigger_context_event(
        &self,
        element: ElementId,
        event_type: &str,
        context: EventContext,
        callback: &mut dyn FnMut(EventResult) -> Result<bool, HandlerError>,
    ) -> Result<bool, EventError> {
        let origin = self.element(element);
        let description = format!("Triggering event '{event_type}' on {}", origin.complete_id());

        OperationTracker::new().run(description, || {
            let mut wrapped = |result: EventResult| -> Result<bool, HandlerError> {
                match result {
                    EventResult::Bool(abort) => Ok(abort),
                    other => callback(other),
                }
            };

            let mut current = Some(element);
            let mut current_type = event_type.to_string();
            let mut current_context = context;
            let mut component_id = String::new();
            let mut root_error: Option<Arc<ComponentEventError>> = None;
            let mut handled = false;

            while let Some(handle) = current {
                let target = self.element(handle);
                log::debug!(
                    target: "loom::event",
                    "Dispatching event '{current_type}' to {} (component id '{component_id}')",
                    target.complete_id()
                );

                let mut event = ComponentEvent::new(&current_type, &component_id, &current_context, &mut wrapped);
                match target.dispatch_event(self, &mut event) {
                    Ok(matched) => {
                        handled |= matched;
                        if event.is_aborted() {
                            return Ok(true);
                        }
                    }
                    Err(error) => {
                        if let Some(root) = root_error {
                            return Err(EventError::Handler(root));
                        }
                        log::debug!(
                            target: "loom::event",
                            "Handler of {} failed: {error}; dispatching '{EXCEPTION_EVENT}'",
                            error.component
                        );
                        let error = Arc::new(error);
                        root_error = Some(Arc::clone(&error));
                        current_type = EXCEPTION_EVENT.to_string();
                        current_context = EventContext::from_error(error);
                        // The exception event starts at the element that failed.
                        continue;
                    }
                }

                component_id = target.id().to_string();
                current = target.container();
            }

            match root_error {
                Some(root) => Err(EventError::Handler(root)),
                None => {
                    if !handled {
                        log::debug!(target: "loom::event", "No handler found for event '{event_type}'");
                    }
                    Ok(handled)
                }
            }
        })
    }

    /// Triggers a notification event: handlers may abort it, but may not
    /// return values.
    pub fn trigger_event(&self, element: ElementId, event_type: &str, context: EventContext) -> Result<bool, EventError> {
        let mut callback = notification_callback(event_type, self.element(element).complete_id());
        self.trigger_context_event(element, event_type, context, &mut callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::Location;

    fn failure() -> Arc<ComponentEventError> {
        Arc::new(ComponentEventError {
            message: "boom".into(),
            event_type: "action".into(),
            component: "Index:button".into(),
            location: Location::unknown(),
            source: "boom".into(),
        })
    }

    #[test]
    fn test_context_coercions() {
        let context = EventContext::new(["42", "true", "x"]);

        assert_eq!(context.count(), 3);
        assert_eq!(context.get_i64(0).unwrap(), 42);
        assert!(context.get_bool(1).unwrap());
        assert_eq!(context.get_string(2).unwrap(), "x");
        assert!(matches!(context.get_i64(2), Err(EventError::ContextCoercion { index: 2, .. })));
        assert!(matches!(
            context.get_value(3),
            Err(EventError::MissingContext { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_error_context() {
        let context = EventContext::from_error(failure());
        assert_eq!(context.get_error(0).unwrap().component, "Index:button");
        assert!(context.get_value(0).is_err());
    }

    #[test]
    fn test_matches_is_case_insensitive_and_counts_parameters() {
        let context = EventContext::new([1, 2]);
        let mut callback = |_result: EventResult| -> Result<bool, HandlerError> { Ok(false) };
        let event = ComponentEvent::new("Action", "Delete", &context, &mut callback);

        assert!(event.matches("action", "delete", 2));
        assert!(!event.matches("action", "delete", 3));
        assert!(!event.matches("action", "", 0));
        assert!(!event.matches("select", "delete", 0));
    }

    #[test]
    fn test_store_result_aborts_once() {
        let context = EventContext::default();
        let mut seen = Vec::new();
        let mut callback = |result: EventResult| -> Result<bool, HandlerError> {
            seen.push(format!("{result:?}"));
            Ok(true)
        };
        let mut event = ComponentEvent::new("action", "", &context, &mut callback);

        assert!(event.store_result(EventResult::Json(JsonValue::from(1))).unwrap());
        assert!(event.is_aborted());
        assert!(!event.matches("action", "", 0));
        assert!(event.store_result(EventResult::Json(JsonValue::from(2))).is_err());
        drop(event);
        assert_eq!(seen, vec!["Json(1)"]);
    }

    #[test]
    fn test_notification_callback_rejects_values() {
        let mut callback = notification_callback("refresh", "Index:grid");
        let error = callback(EventResult::Json(JsonValue::from("x"))).unwrap_err();
        assert!(error.to_string().contains("does not accept return values"));
    }
}
