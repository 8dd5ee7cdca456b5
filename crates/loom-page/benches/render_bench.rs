use criterion::{criterion_group, criterion_main, Criterion};
use loom_core::{ComponentResourceSelector, HandlerError, Location, RequestScope, StringMarkupWriter};
use loom_page::render::commands;
use loom_page::{
    instantiator, Component, ComponentModel, LiteralBinding, Page, PhaseContext, PhaseResult, RenderPhase,
};
use std::hint::black_box;
use std::sync::Arc;

struct Silent;
impl Component for Silent {}

struct Cell;
impl Component for Cell {
    fn render_phase(&self, phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        match phase {
            RenderPhase::BeginRender => {
                let value = ctx.resources().read_parameter("value")?.coerce_string();
                ctx.writer().element("td", &[]);
                ctx.writer().write(&value);
            }
            RenderPhase::AfterRender => {
                ctx.writer().end();
            }
            _ => {}
        }
        Ok(PhaseResult::None)
    }
}

fn build_page(cells: usize) -> Page {
    let mut page = Page::new("Grid", ComponentResourceSelector::default());
    let root = page
        .create_root(&instantiator(ComponentModel::new("Grid"), || Silent), Location::unknown())
        .unwrap();
    let cell_model = || {
        ComponentModel::new("Cell")
            .handles(RenderPhase::BeginRender)
            .handles(RenderPhase::AfterRender)
            .parameter("value", true)
    };

    page.add_to_template(root, commands::start_element("tr", &[])).unwrap();
    for i in 0..cells {
        let cell = page
            .new_child(root, &format!("cell{i}"), None, &instantiator(cell_model(), || Cell), Location::unknown())
            .unwrap();
        page.bind_parameter(cell, "value", Arc::new(LiteralBinding::new(i as i64)))
            .unwrap();
        page.add_to_template(root, page.element_command(cell)).unwrap();
    }
    page.add_to_template(root, commands::end_element()).unwrap();
    page.loaded().unwrap();
    page
}

fn bench_render(c: &mut Criterion) {
    // Static markup only: every phase collapses away.
    let mut flat = Page::new("Flat", ComponentResourceSelector::default());
    let root = flat
        .create_root(&instantiator(ComponentModel::new("Flat"), || Silent), Location::unknown())
        .unwrap();
    for i in 0..1_000 {
        flat.add_to_template(root, commands::text(&format!("line {i}\n"))).unwrap();
    }
    flat.loaded().unwrap();

    let grid = build_page(1_000);

    let mut group = c.benchmark_group("Page Render");

    group.bench_function("Static template (1000 commands)", |b| {
        b.iter(|| {
            let _scope = RequestScope::begin();
            let mut writer = StringMarkupWriter::new();
            flat.render(&mut writer).unwrap();
            black_box(writer.to_markup());
        });
    });

    group.bench_function("Component grid (1000 cells)", |b| {
        b.iter(|| {
            let _scope = RequestScope::begin();
            let mut writer = StringMarkupWriter::new();
            grid.render(&mut writer).unwrap();
            black_box(writer.to_markup());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
