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

//! The page cache.
//!
//! Pages are expensive to build and immutable once loaded, so a single
//! instance per (page name, selector) is assembled on first use and then
//! shared by every request on every thread.

use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use loom_core::ioc::ObjectLocator;
use loom_core::ComponentResourceSelector;
use loom_page::{Page, PageStats, PersistentFieldManager};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Builds the structure of one logical page.
///
/// The page handed over is empty and carries the requested selector. The
/// source calls [`Page::loaded`] afterwards if the assembler did not.
pub trait PageAssembler: Send + Sync {
    /// Creates the root component and everything below it.
    fn assemble(&self, page: &mut Page) -> Result<()>;
}

impl<F> PageAssembler for F
where
    F: Fn(&mut Page) -> Result<()> + Send + Sync,
{
    fn assemble(&self, page: &mut Page) -> Result<()> {
        self(page)
    }
}

struct Registered {
    name: String,
    assembler: Arc<dyn PageAssembler>,
}

type PageKey = (String, ComponentResourceSelector);

/// Caches one loaded [`Page`] per page name and selector.
///
/// Page names are case-insensitive. The cache is filled lazily and can be
/// invalidated wholesale with [`PageSource::clear_cache`].
#[derive(Default)]
pub struct PageSource {
    assemblers: AHashMap<String, Registered>,
    pages: RwLock<AHashMap<PageKey, Arc<Page>>>,
    locator: Option<Arc<dyn ObjectLocator>>,
    field_manager: Option<Arc<dyn PersistentFieldManager>>,
}

impl PageSource {
    /// An empty source with no pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the assembler of a page, replacing any previous one.
    #[must_use]
    pub fn with_page(mut self, name: &str, assembler: impl PageAssembler + 'static) -> Self {
        self.assemblers.insert(
            name.to_lowercase(),
            Registered {
                name: name.to_string(),
                assembler: Arc::new(assembler),
            },
        );
        self
    }

    /// Service registry handed to every assembled page.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn ObjectLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Persistent field store shared by every assembled page.
    #[must_use]
    pub fn with_persistent_field_manager(mut self, manager: Arc<dyn PersistentFieldManager>) -> Self {
        self.field_manager = Some(manager);
        self
    }

    /// Names of the registered pages, sorted.
    pub fn page_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.assemblers.values().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// The loaded page, assembling it on first request.
    pub fn get_page(&self, name: &str, selector: &ComponentResourceSelector) -> Result<Arc<Page>> {
        let key = (name.to_lowercase(), selector.clone());
        {
            let pages = self.pages.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(page) = pages.get(&key) {
                return Ok(Arc::clone(page));
            }
        }

        let page = Arc::new(self.assemble(&key.0, selector)?);
        let mut pages = self.pages.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another thread may have assembled the same page meanwhile; keep the first.
        Ok(Arc::clone(pages.entry(key).or_insert(page)))
    }

    /// Drops every cached page. Pages in use by running requests stay alive
    /// until those requests finish.
    pub fn clear_cache(&self) {
        let mut pages = self.pages.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        log::info!("Clearing page cache ({} pages)", pages.len());
        pages.clear();
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.pages.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    fn assemble(&self, key: &str, selector: &ComponentResourceSelector) -> Result<Page> {
        let Some(registered) = self.assemblers.get(key) else {
            bail!("Unknown page '{key}' (available pages: {})", self.page_names().join(", "));
        };

        let start = Instant::now();
        let mut page = Page::new(registered.name.clone(), selector.clone());
        if let Some(locator) = &self.locator {
            page = page.with_locator(Arc::clone(locator));
        }
        if let Some(manager) = &self.field_manager {
            page = page.with_persistent_field_manager(Arc::clone(manager));
        }

        registered
            .assembler
            .assemble(&mut page)
            .with_context(|| format!("Failed to assemble page {} for {selector}", registered.name))?;
        if !page.is_loaded() {
            page.loaded()
                .with_context(|| format!("Failed to load page {} for {selector}", registered.name))?;
        }

        let stats = PageStats {
            assembly_time: start.elapsed(),
            component_count: page.elements().len(),
            weight: page.elements().iter().map(|element| 1 + element.template_len()).sum(),
        };
        log::debug!(
            "Assembled page {} for {selector} in {:?} ({} components, weight {})",
            registered.name,
            stats.assembly_time,
            stats.component_count,
            stats.weight
        );
        page.set_stats(stats);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::Location;
    use loom_page::render::commands;
    use loom_page::{instantiator, Component, ComponentModel};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Nothing;
    impl Component for Nothing {}

    fn counting_source(count: &Arc<AtomicUsize>) -> PageSource {
        let count = Arc::clone(count);
        PageSource::new().with_page("Index", move |page: &mut Page| -> Result<()> {
            count.fetch_add(1, Ordering::SeqCst);
            let root = page.create_root(&*instantiator(ComponentModel::new("Index"), || Nothing), Location::unknown())?;
            page.add_to_template(root, commands::text("hello"))?;
            Ok(())
        })
    }

    #[test]
    fn test_page_assembled_once_per_selector() {
        let count = Arc::new(AtomicUsize::new(0));
        let source = counting_source(&count);
        let en = ComponentResourceSelector::new("en");

        let first = source.get_page("Index", &en).unwrap();
        let second = source.get_page("index", &en).unwrap();
        let french = source.get_page("Index", &ComponentResourceSelector::new("fr")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &french));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(source.cached_pages(), 2);
        assert!(first.is_loaded());
        assert_eq!(first.name(), "Index");
        assert_eq!(french.selector().locale(), "fr");
    }

    #[test]
    fn test_stats_recorded() {
        let source = counting_source(&Arc::new(AtomicUsize::new(0)));
        let page = source.get_page("Index", &ComponentResourceSelector::default()).unwrap();
        let stats = page.stats().unwrap();
        assert_eq!(stats.component_count, 1);
        assert_eq!(stats.weight, 2);
    }

    #[test]
    fn test_clear_cache_reassembles() {
        let count = Arc::new(AtomicUsize::new(0));
        let source = counting_source(&count);
        let selector = ComponentResourceSelector::default();

        let before = source.get_page("Index", &selector).unwrap();
        source.clear_cache();
        let after = source.get_page("Index", &selector).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_page_lists_available() {
        let source = counting_source(&Arc::new(AtomicUsize::new(0)));
        let error = source
            .get_page("Missing", &ComponentResourceSelector::default())
            .unwrap_err();
        assert_eq!(error.to_string(), "Unknown page 'missing' (available pages: Index)");
    }

    #[test]
    fn test_assembly_failure_is_not_cached() {
        let source = PageSource::new().with_page("Broken", |_page: &mut Page| -> Result<()> {
            bail!("no template")
        });
        let selector = ComponentResourceSelector::default();

        let error = source.get_page("Broken", &selector).unwrap_err();

        assert_eq!(error.to_string(), "Failed to assemble page Broken for Selector[en]");
        assert_eq!(error.root_cause().to_string(), "no template");
        assert_eq!(source.cached_pages(), 0);
    }
}
