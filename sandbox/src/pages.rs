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

//! The components and structure of the sandbox's only page.

use anyhow::Result;
use loom_sdk::loom_page::ComponentId;
use loom_sdk::prelude::*;
use std::sync::Arc;

/// Greetings per language, registered as a service.
pub struct Salutations {
    greetings: Vec<(&'static str, &'static str)>,
}

impl Default for Salutations {
    fn default() -> Self {
        Self {
            greetings: vec![("en", "Hello"), ("fr", "Bonjour"), ("de", "Hallo")],
        }
    }
}

impl Salutations {
    fn for_locale(&self, locale: &str) -> &'static str {
        self.greetings
            .iter()
            .find(|(language, _)| *language == locale)
            .map_or("Hello", |&(_, greeting)| greeting)
    }
}

struct Layout;
impl Component for Layout {}

/// Built by the registry: receives its own id and the salutations service.
struct Greeting {
    id: Arc<ComponentId>,
    salutations: Arc<Salutations>,
}

impl Injectable for Greeting {
    fn plan(plan: &mut PlanBuilder<Self>) {
        plan.constructor(
            vec![Dependency::of::<ComponentId>(), Dependency::of::<Salutations>()],
            |args: &Args| {
                Ok(Greeting {
                    id: args.get(0)?,
                    salutations: args.get(1)?,
                })
            },
        );
    }
}

impl Component for Greeting {
    fn render_phase(&self, phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        match phase {
            RenderPhase::BeginRender => {
                let locale = ctx.resources().page().selector().locale().to_string();
                let name = ctx.resources().read_parameter("name")?.coerce_string();
                ctx.writer().element("h1", &[("data-component", self.id.0.as_str())]);
                ctx.render_informal_parameters()?;
                ctx.writer()
                    .write(&format!("{}, {name}!", self.salutations.for_locale(&locale)));
            }
            RenderPhase::AfterRender => {
                ctx.writer().end();
            }
            _ => {}
        }
        Ok(PhaseResult::None)
    }
}

struct Counter;

impl Component for Counter {
    fn render_phase(&self, phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        match phase {
            RenderPhase::BeginRender => {
                let count = ctx.resources().read_parameter("count")?.coerce_string();
                ctx.writer().element("span", &[]);
                ctx.writer().write(&count);
            }
            RenderPhase::AfterRender => {
                ctx.writer().end();
            }
            _ => {}
        }
        Ok(PhaseResult::None)
    }

    fn dispatch_event(
        &self,
        event: &mut ComponentEvent<'_>,
        resources: &ComponentResources<'_>,
    ) -> Result<bool, HandlerError> {
        if !event.matches("increment", "", 0) {
            return Ok(false);
        }
        let next = resources.read_parameter("count")?.coerce_i64().unwrap_or(0) + 1;
        resources.write_parameter("count", next)?;
        event.store_result(EventResult::Json(JsonValue::from(next)))?;
        Ok(true)
    }
}

/// Marks its element once the core component has opened it.
struct Highlight;

impl Component for Highlight {
    fn render_phase(&self, phase: RenderPhase, ctx: &mut PhaseContext<'_>) -> Result<PhaseResult, HandlerError> {
        if phase == RenderPhase::BeginRender {
            let style = ctx.resources().read_parameter("style")?.coerce_string();
            ctx.writer().attributes(&[("class", style.as_str())]);
        }
        Ok(PhaseResult::None)
    }
}

/// `Index.tml`: a greeting above a highlighted counter.
pub fn assemble_index(page: &mut Page) -> Result<()> {
    let root = page.create_root(&*instantiator(ComponentModel::new("Layout"), || Layout), Location::new("Index.tml", 1))?;

    let greeting_model = ComponentModel::new("Greeting")
        .handles(RenderPhase::BeginRender)
        .handles(RenderPhase::AfterRender)
        .parameter("name", true)
        .informal_parameters(true);
    let greeting = page.new_child(
        root,
        "greeting",
        None,
        &InjectableInstantiator::<Greeting>::new(greeting_model),
        Location::new("Index.tml", 3),
    )?;
    page.bind_parameter(greeting, "name", Arc::new(LiteralBinding::new("Loom")))?;
    page.bind_parameter(greeting, "title", Arc::new(LiteralBinding::new("Welcome")))?;

    let counter_model = ComponentModel::new("Counter")
        .handles(RenderPhase::BeginRender)
        .handles(RenderPhase::AfterRender)
        .parameter("count", true);
    let counter = page.new_child(root, "counter", None, &*instantiator(counter_model, || Counter), Location::new("Index.tml", 4))?;
    page.add_mixin(
        counter,
        "Highlight",
        &*instantiator(
            ComponentModel::new("Highlight")
                .handles(RenderPhase::BeginRender)
                .parameter("style", false)
                .mixin_after(true),
            || Highlight,
        ),
        &[],
    )?;
    page.bind_parameter(counter, "count", Arc::new(ValueBinding::new(0)))?;
    page.bind_parameter(counter, "highlight.style", Arc::new(LiteralBinding::new("highlight")))?;

    page.add_to_template(root, commands::start_element("main", &[]))?;
    page.add_to_template(root, page.element_command(greeting))?;
    page.add_to_template(root, commands::text(" Count: "))?;
    page.add_to_template(root, page.element_command(counter))?;
    page.add_to_template(root, commands::end_element())?;
    Ok(())
}
