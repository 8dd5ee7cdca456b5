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

//! Integration tests for event bubbling and exception recovery.

use loom_core::{ComponentResourceSelector, HandlerError, Location};
use loom_json::JsonValue;
use loom_page::{
    instantiator, Component, ComponentEvent, ComponentModel, ComponentResources, ElementId, EventContext,
    EventError, EventResult, Instantiator, Page, EXCEPTION_EVENT,
};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

type EventFn = Arc<dyn Fn(&mut ComponentEvent<'_>, &ComponentResources<'_>) -> Result<bool, HandlerError> + Send + Sync>;

struct Handler(EventFn);

impl Component for Handler {
    fn dispatch_event(
        &self,
        event: &mut ComponentEvent<'_>,
        resources: &ComponentResources<'_>,
    ) -> Result<bool, HandlerError> {
        (self.0)(event, resources)
    }
}

fn handler(
    name: &str,
    f: impl Fn(&mut ComponentEvent<'_>, &ComponentResources<'_>) -> Result<bool, HandlerError> + Send + Sync + 'static,
) -> Arc<dyn Instantiator> {
    let f: EventFn = Arc::new(f);
    instantiator(ComponentModel::new(name), move || Handler(Arc::clone(&f)))
}

fn record(log: &Log, event: &ComponentEvent<'_>, resources: &ComponentResources<'_>) {
    log.lock().unwrap().push(format!(
        "{}|{}|{}",
        resources.complete_id(),
        event.event_type(),
        event.component_id()
    ));
}

/// A handler that records every event it is offered and handles none.
fn recorder(name: &str, log: &Log) -> Arc<dyn Instantiator> {
    let log = Arc::clone(log);
    handler(name, move |event, resources| {
        record(&log, event, resources);
        Ok(false)
    })
}

/// Builds `Index > outer > inner` and returns the page and the innermost element.
fn three_levels(
    root: Arc<dyn Instantiator>,
    outer: Arc<dyn Instantiator>,
    inner: Arc<dyn Instantiator>,
) -> (Page, ElementId) {
    let mut page = Page::new("Index", ComponentResourceSelector::default());
    let root = page.create_root(&*root, Location::unknown()).unwrap();
    let outer = page.new_child(root, "outer", None, &*outer, Location::new("Index.tml", 3)).unwrap();
    let inner = page
        .new_child(outer, "inner", None, &*inner, Location::new("Outer.tml", 8))
        .unwrap();
    page.loaded().unwrap();
    (page, inner)
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_unhandled_event_bubbles_to_the_root() {
    // ARRANGE
    let log: Log = Arc::default();
    let (page, inner) = three_levels(
        recorder("Index", &log),
        recorder("Outer", &log),
        recorder("Inner", &log),
    );

    // ACT
    let handled = page.trigger_event(inner, "select", EventContext::default()).unwrap();

    // ASSERT
    assert!(!handled);
    assert_eq!(
        entries(&log),
        vec![
            "Index:outer.inner|select|",
            "Index:outer|select|inner",
            "Index|select|outer",
        ]
    );
}

#[test]
fn test_abort_stops_bubbling() {
    // ARRANGE
    let log: Log = Arc::default();
    let outer_log = Arc::clone(&log);
    let outer = handler("Outer", move |event, resources| {
        record(&outer_log, event, resources);
        if event.matches("select", "inner", 1) {
            let row = event.context().get_i64(0)?;
            outer_log.lock().unwrap().push(format!("selected {row}"));
            event.store_result(EventResult::Bool(true))?;
            return Ok(true);
        }
        Ok(false)
    });
    let (page, inner) = three_levels(recorder("Index", &log), outer, recorder("Inner", &log));

    // ACT
    let handled = page
        .trigger_event(inner, "Select", EventContext::new([7]))
        .unwrap();

    // ASSERT
    assert!(handled);
    assert_eq!(
        entries(&log),
        vec!["Index:outer.inner|Select|", "Index:outer|Select|inner", "selected 7"]
    );
}

#[test]
fn test_false_result_keeps_bubbling() {
    let log: Log = Arc::default();
    let inner = handler("Inner", |event, _resources| {
        event.store_result(EventResult::Bool(false))?;
        Ok(true)
    });
    let (page, inner) = three_levels(recorder("Index", &log), recorder("Outer", &log), inner);

    let handled = page.trigger_event(inner, "select", EventContext::default()).unwrap();

    assert!(handled);
    assert_eq!(entries(&log).len(), 2);
}

#[test]
fn test_results_reach_the_callback() {
    // ARRANGE
    let inner = handler("Inner", |event, _resources| {
        if event.matches("save", "", 0) {
            event.store_result(EventResult::Json(JsonValue::from("saved")))?;
            return Ok(true);
        }
        Ok(false)
    });
    let log: Log = Arc::default();
    let (page, inner) = three_levels(recorder("Index", &log), recorder("Outer", &log), inner);
    let mut received = Vec::new();

    // ACT
    let handled = page
        .trigger_context_event(inner, "save", EventContext::default(), &mut |result| {
            received.push(format!("{result:?}"));
            Ok(true)
        })
        .unwrap();

    // ASSERT
    assert!(handled);
    assert_eq!(received, vec!["Json(\"saved\")"]);
    assert!(entries(&log).is_empty());
}

#[test]
fn test_notification_rejects_returned_values() {
    let inner = handler("Inner", |event, _resources| {
        event.store_result(EventResult::Json(JsonValue::from(1)))?;
        Ok(true)
    });
    let log: Log = Arc::default();
    let (page, inner) = three_levels(recorder("Index", &log), recorder("Outer", &log), inner);

    let error = page.trigger_event(inner, "refresh", EventContext::default()).unwrap_err();

    assert!(error.to_string().contains("does not accept return values"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Exception recovery
// ─────────────────────────────────────────────────────────────────────────────

fn failing_inner(log: &Log) -> Arc<dyn Instantiator> {
    let log = Arc::clone(log);
    handler("Inner", move |event, resources| {
        if event.event_type() == "action" {
            return Err("boom".into());
        }
        record(&log, event, resources);
        Ok(false)
    })
}

#[test]
fn test_exception_recovered_three_levels_up() {
    // ARRANGE
    let log: Log = Arc::default();
    let root_log = Arc::clone(&log);
    let root = handler("Index", move |event, resources| {
        record(&root_log, event, resources);
        if event.matches(EXCEPTION_EVENT, "outer", 1) {
            let error = event.context().get_error(0)?;
            root_log
                .lock()
                .unwrap()
                .push(format!("recovered {} from {}", error, error.component));
            event.store_result(EventResult::Bool(true))?;
            return Ok(true);
        }
        Ok(false)
    });
    let (page, inner) = three_levels(root, recorder("Outer", &log), failing_inner(&log));

    // ACT
    let result = page.trigger_event(inner, "action", EventContext::default());

    // ASSERT
    assert!(result.unwrap());
    assert_eq!(
        entries(&log),
        vec![
            "Index:outer.inner|exception|",
            "Index:outer|exception|inner",
            "Index|exception|outer",
            "recovered boom from Index:outer.inner",
        ]
    );
}

#[test]
fn test_unrecovered_exception_reaches_the_caller() {
    let log: Log = Arc::default();
    let (page, inner) = three_levels(recorder("Index", &log), recorder("Outer", &log), failing_inner(&log));

    let error = page.trigger_event(inner, "action", EventContext::default()).unwrap_err();

    match error {
        EventError::Handler(error) => {
            assert_eq!(error.to_string(), "boom");
            assert_eq!(error.component, "Index:outer.inner");
            assert_eq!(error.event_type, "action");
            assert_eq!(error.location, Location::new("Outer.tml", 8));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(entries(&log).len(), 3);
}

#[test]
fn test_first_failure_wins_over_failing_recovery() {
    // ARRANGE
    let log: Log = Arc::default();
    let outer = handler("Outer", |event, _resources| {
        if event.event_type() == EXCEPTION_EVENT {
            return Err("recovery failed".into());
        }
        Ok(false)
    });
    let (page, inner) = three_levels(recorder("Index", &log), outer, failing_inner(&log));

    // ACT
    let error = page.trigger_event(inner, "action", EventContext::default()).unwrap_err();

    // ASSERT
    match error {
        EventError::Handler(error) => {
            assert_eq!(error.to_string(), "boom");
            assert_eq!(error.component, "Index:outer.inner");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(entries(&log).iter().all(|entry| !entry.starts_with("Index|")));
}

#[test]
fn test_resources_trigger_events_from_their_element() {
    let log: Log = Arc::default();
    let (page, inner) = three_levels(recorder("Index", &log), recorder("Outer", &log), recorder("Inner", &log));

    let handled = page
        .resources(inner)
        .trigger_event("changed", EventContext::new(["a"]))
        .unwrap();

    assert!(!handled);
    assert_eq!(entries(&log)[0], "Index:outer.inner|changed|");
}
