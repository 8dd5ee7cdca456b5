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

//! Integration tests for page assembly and the render-phase state machine.

use loom_core::{ComponentResourceSelector, HandlerError, Location, MarkupWriter, RequestScope, StringMarkupWriter};
use loom_page::render::commands;
use loom_page::{
    instantiator, Block, Component, ComponentModel, FnInstantiator, InstantiationContext, Instantiator, LiteralBinding,
    Page, PageLifecycle, PhaseContext, PhaseResult, RenderError, RenderPhase, RenderQueue, Renderable, StructureError,
    ValueBinding,
};
use loom_json::JsonValue;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn new_page() -> Page {
    Page::new("Index", ComponentResourceSelector::default())
}

/// Records every phase it is invoked for and optionally aborts one.
struct Tracer {
    log: Log,
    abort_in: Option<RenderPhase>,
}

impl Component for Tracer {
    fn render_phase(&self, phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{phase}", ctx.resources().complete_id()));
        if self.abort_in == Some(phase) {
            return Ok(PhaseResult::Abort);
        }
        Ok(PhaseResult::None)
    }
}

fn traced(model: ComponentModel, log: &Log, abort_in: Option<RenderPhase>) -> Arc<dyn Instantiator> {
    let log = Arc::clone(log);
    instantiator(model, move || Tracer {
        log: Arc::clone(&log),
        abort_in,
    })
}

struct Silent;

impl Component for Silent {}

fn silent(name: &str) -> Arc<dyn Instantiator> {
    instantiator(ComponentModel::new(name), || Silent)
}

/// Renders `<a href=...>` with its informal parameters around its body.
struct Link;

impl Component for Link {
    fn render_phase(&self, phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        match phase {
            RenderPhase::BeginRender => {
                let href = ctx.resources().read_parameter("href")?.coerce_string();
                ctx.writer().element("a", &[("href", href.as_str())]);
                ctx.render_informal_parameters()?;
                ctx.resources().store_render_variable("opened", true)?;
            }
            RenderPhase::AfterRender => {
                if ctx.resources().render_variable("opened")?.coerce_bool() == Some(true) {
                    ctx.writer().end();
                }
            }
            _ => {}
        }
        Ok(PhaseResult::None)
    }
}

fn link_model() -> ComponentModel {
    ComponentModel::new("Link")
        .handles(RenderPhase::BeginRender)
        .handles(RenderPhase::AfterRender)
        .parameter("href", true)
        .informal_parameters(true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Phase collapsing and ordering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_after_render_only_component_skips_unhandled_phases() {
    // ARRANGE
    let log = new_log();
    let mut page = new_page();
    let model = ComponentModel::new("Index").handles(RenderPhase::AfterRender);
    let root = page.create_root(&traced(model, &log, None), Location::unknown()).unwrap();
    page.loaded().unwrap();

    // ACT
    let mut writer = StringMarkupWriter::new();
    let mut queue = RenderQueue::new().with_tracing(true);
    page.render_with(root, &mut writer, &mut queue).unwrap();

    // ASSERT
    assert_eq!(
        queue.trace(),
        [
            "Element[Index]",
            "OptimizedBegin[Index]",
            "RenderTemplate[Index]",
            "AfterRender[Index]",
            "PostRenderCleanup[Index]",
        ]
    );
    assert_eq!(entries(&log), vec!["Index:AfterRender"]);
}

#[test]
fn test_mixins_run_before_and_after_core_in_constraint_order() {
    // ARRANGE
    let log = new_log();
    let mut page = new_page();
    let phases = |name: &str| {
        ComponentModel::new(name)
            .handles(RenderPhase::BeginRender)
            .handles(RenderPhase::AfterRender)
    };
    let root = page.create_root(&traced(phases("Core"), &log, None), Location::unknown()).unwrap();
    page.add_mixin(root, "a", &traced(phases("A"), &log, None), &[]).unwrap();
    page.add_mixin(root, "b", &traced(phases("B").mixin_after(true), &log, None), &[])
        .unwrap();
    page.add_mixin(root, "c", &traced(phases("C"), &log, None), &["before:a"])
        .unwrap();

    // ACT
    page.loaded().unwrap();
    let mut writer = StringMarkupWriter::new();
    page.render(&mut writer).unwrap();

    // ASSERT
    assert_eq!(
        page.element(root).component_order(),
        ["Index$c", "Index$a", "Index", "Index$b"]
    );
    assert_eq!(
        entries(&log),
        vec![
            "Index$c:BeginRender",
            "Index$a:BeginRender",
            "Index:BeginRender",
            "Index$b:BeginRender",
            "Index$b:AfterRender",
            "Index:AfterRender",
            "Index$a:AfterRender",
            "Index$c:AfterRender",
        ]
    );
}

#[test]
fn test_middle_mixin_returning_false_stops_the_render() {
    // ARRANGE
    let log = new_log();
    let mut page = new_page();
    let setup = |name: &str| {
        ComponentModel::new(name)
            .handles(RenderPhase::SetupRender)
            .handles(RenderPhase::BeginRender)
    };
    let core = setup("Core").handles(RenderPhase::CleanupRender);
    let root = page.create_root(&traced(core, &log, None), Location::unknown()).unwrap();
    page.add_mixin(root, "m1", &traced(setup("M1"), &log, None), &[]).unwrap();
    page.add_mixin(root, "m2", &traced(setup("M2"), &log, Some(RenderPhase::SetupRender)), &[])
        .unwrap();
    page.add_mixin(root, "m3", &traced(setup("M3"), &log, None), &[]).unwrap();
    page.add_to_template(root, commands::text("hidden")).unwrap();
    page.loaded().unwrap();

    // ACT
    let mut writer = StringMarkupWriter::new();
    page.render(&mut writer).unwrap();

    // ASSERT
    assert_eq!(writer.to_markup(), "");
    assert_eq!(
        entries(&log),
        vec!["Index$m1:SetupRender", "Index$m2:SetupRender", "Index:CleanupRender"]
    );
}

#[test]
fn test_cyclic_mixin_constraints_fail_on_load() {
    let mut page = new_page();
    let root = page.create_root(&silent("Core"), Location::unknown()).unwrap();
    page.add_mixin(root, "a", &silent("A"), &["after:b"]).unwrap();
    page.add_mixin(root, "b", &silent("B"), &["after:a"]).unwrap();

    let error = page.loaded().unwrap_err();

    assert!(matches!(error, StructureError::MixinOrder { .. }));
    assert!(!page.is_loaded());
}

// ─────────────────────────────────────────────────────────────────────────────
// Templates, bodies and blocks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_template_renders_embedded_component_around_its_body() {
    // ARRANGE
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();
    let layout = page.new_child(root, "layout", None, &silent("Layout"), Location::unknown()).unwrap();
    page.add_to_template(root, commands::start_element("div", &[("id", "main")])).unwrap();
    page.add_to_template(root, page.element_command(layout)).unwrap();
    page.add_to_template(root, commands::end_element()).unwrap();
    page.add_to_template(layout, commands::text("[")).unwrap();
    page.add_to_template(layout, commands::render_body(layout)).unwrap();
    page.add_to_template(layout, commands::text("]")).unwrap();
    page.add_to_body(layout, commands::text("content")).unwrap();
    page.loaded().unwrap();

    // ACT
    let mut writer = StringMarkupWriter::new();
    page.render(&mut writer).unwrap();

    // ASSERT
    assert_eq!(writer.to_markup(), "<div id=\"main\">[content]</div>");
}

#[derive(Debug)]
struct Footer;

impl Renderable for Footer {
    fn render(&self, writer: &mut dyn MarkupWriter) -> Result<(), HandlerError> {
        writer.write("footer");
        Ok(())
    }
}

struct Tabs;

impl Component for Tabs {
    fn render_phase(&self, phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        Ok(match phase {
            RenderPhase::BeginRender => PhaseResult::Command(ctx.resources().block("active")?),
            RenderPhase::AfterRender => PhaseResult::Renderable(Arc::new(Footer)),
            _ => PhaseResult::None,
        })
    }
}

#[test]
fn test_returned_commands_render_before_the_next_phase() {
    // ARRANGE
    let mut page = new_page();
    let model = ComponentModel::new("Tabs")
        .handles(RenderPhase::BeginRender)
        .handles(RenderPhase::AfterRender);
    let root = page.create_root(&instantiator(model, || Tabs), Location::unknown()).unwrap();
    page.add_to_template(root, commands::text("|")).unwrap();
    page.add_block(
        root,
        "active",
        Block::new("active tab", Location::new("Index.tml", 3)).with(commands::text("tab-1")),
    )
    .unwrap();
    page.loaded().unwrap();

    // ACT
    let mut writer = StringMarkupWriter::new();
    page.render(&mut writer).unwrap();

    // ASSERT
    assert_eq!(writer.to_markup(), "tab-1|footer");
    let missing = page.resources(root).block("missing").unwrap_err();
    assert!(missing.to_string().contains("Available block ids: active"));
}

#[test]
fn test_duplicate_block_id_rejected() {
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();
    page.add_block(root, "a", Block::new("a", Location::unknown())).unwrap();

    let error = page
        .add_block(root, "A", Block::new("a", Location::new("Index.tml", 7)))
        .unwrap_err();

    assert!(matches!(error, StructureError::DuplicateBlockId { .. }));
}

#[test]
fn test_failed_instantiation_leaves_no_child_behind() {
    // ARRANGE
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();
    let failing = FnInstantiator::new(ComponentModel::new("Gallery"), |ctx: &InstantiationContext<'_>| {
        Err(format!("no images for {}", ctx.complete_id()).into())
    });

    // ACT
    let error = page
        .new_child(root, "gallery", None, &failing, Location::new("Index.tml", 3))
        .unwrap_err();
    let retried = page
        .new_child(root, "gallery", None, &silent("Gallery"), Location::new("Index.tml", 3))
        .unwrap();
    page.loaded().unwrap();

    // ASSERT
    assert!(matches!(error, StructureError::Instantiation { ref component, .. } if component == "Index:gallery"));
    assert_eq!(page.element(root).children().collect::<Vec<_>>(), vec![retried]);
    assert_eq!(page.element(root).embedded("Gallery"), Some(retried));
    assert_eq!(page.element(retried).complete_id(), "Index:gallery");
    assert_eq!(page.elements().len(), 2);
    assert!(page.render(&mut StringMarkupWriter::new()).is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameters and render variables
// ─────────────────────────────────────────────────────────────────────────────

fn link_page(href: Option<&str>) -> (Page, loom_page::ElementId) {
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();
    let link = page
        .new_child(root, "home", Some("a"), &instantiator(link_model(), || Link), Location::new("Index.tml", 4))
        .unwrap();
    if let Some(href) = href {
        page.bind_parameter(link, "href", Arc::new(LiteralBinding::new(href))).unwrap();
    }
    page.bind_parameter(link, "class", Arc::new(LiteralBinding::new("nav"))).unwrap();
    page.bind_parameter(link, "title", Arc::new(ValueBinding::new(JsonValue::Null)))
        .unwrap();
    page.add_to_body(link, commands::text("Home")).unwrap();
    page.add_to_template(root, page.element_command(link)).unwrap();
    (page, link)
}

#[test]
fn test_parameters_and_informal_parameters_render() {
    // ARRANGE
    let (mut page, link) = link_page(Some("/home"));
    page.loaded().unwrap();

    // ACT
    let mut writer = StringMarkupWriter::new();
    page.render(&mut writer).unwrap();

    // ASSERT
    assert_eq!(writer.to_markup(), "<a href=\"/home\" class=\"nav\">Home</a>");
    let resources = page.resources(link);
    assert_eq!(resources.informal_parameter_names(), vec!["class", "title"]);
    assert!(!resources.is_rendering());
    assert!(matches!(
        resources.render_variable("opened"),
        Err(StructureError::UnknownRenderVariable { .. })
    ));
    assert!(matches!(
        resources.store_render_variable("opened", true),
        Err(StructureError::NotRendering { .. })
    ));
}

#[test]
fn test_missing_required_parameter_fails_on_load() {
    let (mut page, _link) = link_page(None);

    let error = page.loaded().unwrap_err();

    assert_eq!(
        error.to_string(),
        "Parameter(s) 'href' are required for Index:home, but have not been bound (Index.tml, line 4)"
    );
}

#[test]
fn test_binding_routing_errors() {
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();

    let unknown_mixin = page
        .bind_parameter(root, "tooltip.text", Arc::new(LiteralBinding::new("x")))
        .unwrap_err();
    let informal = page
        .bind_parameter(root, "class", Arc::new(LiteralBinding::new("x")))
        .unwrap_err();

    assert!(matches!(unknown_mixin, StructureError::UnknownMixin { .. }));
    assert!(matches!(informal, StructureError::InformalNotSupported { .. }));
}

#[test]
fn test_qualified_binding_targets_mixin() {
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();
    let tooltip = ComponentModel::new("Tooltip").parameter("text", true);
    page.add_mixin(root, "tooltip", &instantiator(tooltip, || Silent), &[]).unwrap();

    page.bind_parameter(root, "Tooltip.text", Arc::new(LiteralBinding::new("hi")))
        .unwrap();
    page.loaded().unwrap();

    let mixin = &page.element(root).resources()[1];
    assert_eq!(mixin.mixin_id(), Some("tooltip"));
    assert!(mixin.is_bound("TEXT"));
}

#[test]
fn test_informal_binding_falls_back_to_mixin() {
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();
    let attrs = ComponentModel::new("Attributes").informal_parameters(true);
    page.add_mixin(root, "attrs", &instantiator(attrs, || Silent), &[]).unwrap();

    page.bind_parameter(root, "class", Arc::new(LiteralBinding::new("wide")))
        .unwrap();

    let element = page.element(root);
    assert!(!element.resources()[0].is_bound("class"));
    assert!(element.resources()[1].is_bound("class"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Render failures
// ─────────────────────────────────────────────────────────────────────────────

struct Unclosed;

impl Component for Unclosed {
    fn render_phase(&self, _phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        ctx.writer().element("div", &[]);
        Ok(PhaseResult::None)
    }
}

#[test]
fn test_unbalanced_elements_detected() {
    let _scope = RequestScope::begin();
    let mut page = new_page();
    let model = ComponentModel::new("Unclosed").handles(RenderPhase::BeginRender);
    page.create_root(&instantiator(model, || Unclosed), Location::new("Index.tml", 1))
        .unwrap();
    page.loaded().unwrap();

    let error = page.render(&mut StringMarkupWriter::new()).unwrap_err();

    assert!(matches!(error.root(), RenderError::UnbalancedElements { component, .. } if component == "Index"));
}

#[test]
fn test_recursive_template_detected() {
    let _scope = RequestScope::begin();
    let mut page = new_page();
    let root = page.create_root(&silent("Index"), Location::unknown()).unwrap();
    page.add_to_template(root, page.element_command(root)).unwrap();
    page.loaded().unwrap();

    let error = page.render(&mut StringMarkupWriter::new()).unwrap_err();

    match error {
        RenderError::Queue {
            active_components,
            source,
            ..
        } => {
            assert_eq!(active_components, vec!["Index"]);
            assert!(matches!(*source, RenderError::RecursiveRender { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

struct Failing;

impl Component for Failing {
    fn render_phase(&self, _phase: RenderPhase, _ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        Err("no data".into())
    }
}

#[test]
fn test_handler_failure_carries_phase_and_location() {
    let _scope = RequestScope::begin();
    let mut page = new_page();
    let model = ComponentModel::new("Failing").handles(RenderPhase::SetupRender);
    page.create_root(&instantiator(model, || Failing), Location::new("Index.tml", 2))
        .unwrap();
    page.loaded().unwrap();

    let error = page.render(&mut StringMarkupWriter::new()).unwrap_err();

    assert_eq!(
        error.root().to_string(),
        "SetupRender handler of Index failed: no data (Index.tml, line 2)"
    );
}

#[test]
fn test_page_renders_again_after_handler_failure() {
    // ARRANGE
    let mut page = new_page();
    let model = ComponentModel::new("Failing").handles(RenderPhase::BeginRender);
    page.create_root(&instantiator(model, || Failing), Location::new("Index.tml", 2))
        .unwrap();
    page.loaded().unwrap();
    let root = page.root().unwrap();

    // ACT
    let first = page.render(&mut StringMarkupWriter::new()).unwrap_err();
    let rendering_after_failure = page.element(root).is_rendering();
    let second = page.render(&mut StringMarkupWriter::new()).unwrap_err();

    // ASSERT
    assert!(!rendering_after_failure);
    for error in [first, second] {
        assert!(matches!(error.root(), RenderError::Handler { .. }), "unexpected {error:?}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle and concurrency
// ─────────────────────────────────────────────────────────────────────────────

struct Lifecycle {
    log: Log,
}

impl Component for Lifecycle {
    fn on_page_lifecycle(
        &self,
        event: PageLifecycle,
        resources: &loom_page::ComponentResources<'_>,
    ) -> Result<(), HandlerError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{event:?}", resources.complete_id()));
        Ok(())
    }
}

#[test]
fn test_lifecycle_listeners_and_callbacks() {
    // ARRANGE
    let log = new_log();
    let mut page = new_page();
    let model = ComponentModel::new("Index")
        .listens(PageLifecycle::Loaded)
        .listens(PageLifecycle::Attached);
    let component_log = Arc::clone(&log);
    page.create_root(
        &instantiator(model, move || Lifecycle {
            log: Arc::clone(&component_log),
        }),
        Location::unknown(),
    )
    .unwrap();
    let callback_log = Arc::clone(&log);
    page.add_attached_callback(move |page| {
        callback_log.lock().unwrap().push(format!("callback:{}", page.name()));
        Ok(())
    })
    .unwrap();
    page.add_detached_callback(|_| Err("cannot detach".into())).unwrap();

    // ACT
    page.loaded().unwrap();
    page.attached().unwrap();
    let detach_failed = page.detached();

    // ASSERT
    assert_eq!(entries(&log), vec!["Index:Loaded", "Index:Attached", "callback:Index"]);
    assert_eq!(page.attach_count(), 1);
    assert!(detach_failed);
    assert!(matches!(
        page.add_reset_callback(|_| Ok(())),
        Err(StructureError::Locked(_))
    ));
    assert!(!page.has_reset_listeners());
}

#[test]
fn test_threads_render_the_same_page_concurrently() {
    let (mut page, _link) = link_page(Some("/home"));
    page.loaded().unwrap();

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let _scope = RequestScope::begin();
                    let mut markup = String::new();
                    for _ in 0..25 {
                        let mut writer = StringMarkupWriter::new();
                        page.render(&mut writer).unwrap();
                        markup = writer.to_markup();
                    }
                    markup
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(outputs
        .iter()
        .all(|markup| markup == "<a href=\"/home\" class=\"nav\">Home</a>"));
}
