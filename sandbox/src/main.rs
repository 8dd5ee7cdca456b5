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

use anyhow::Result;
use loom_sdk::logging;
use loom_sdk::prelude::*;
use std::sync::Arc;

mod pages;

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => LoomConfig::from_file(&path)?,
        None => LoomConfig {
            supported_locales: vec!["en".into(), "fr".into()],
            ..LoomConfig::default()
        },
    };
    logging::init(&config)?;

    let registry = RegistryBuilder::new()
        .instance("Salutations", pages::Salutations::default())
        .build()?;
    let source = PageSource::new()
        .with_locator(Arc::new(registry))
        .with_page("Index", pages::assemble_index);
    let renderer = PageRenderer::new(config, Arc::new(source));

    log::info!("Rendering Index");
    println!("{}", renderer.render_page("Index", "en")?);
    println!("{}", renderer.render_page("Index", "fr_BE")?);

    for _ in 0..3 {
        let response =
            renderer.handle_component_event("Index", "en", "counter", "increment", EventContext::default())?;
        log::info!("increment -> {response:?}");
    }
    println!("{}", renderer.render_partial("Index", "en", "counter")?);

    if let Ok(page) = renderer.source().get_page("Index", &renderer.config().selector_for("en")) {
        if let Some(stats) = page.stats() {
            log::info!(
                "Index: {} components, weight {}, assembled in {:?}, attached {} times",
                stats.component_count,
                stats.weight,
                stats.assembly_time,
                page.attach_count()
            );
        }
    }
    Ok(())
}
