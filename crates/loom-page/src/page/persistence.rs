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

//! Persistent field changes: component field values that outlive a request.

use ahash::AHashMap;
use loom_json::JsonValue;
use std::sync::Mutex;

/// Stores field changes keyed by page name, nested component id and field name.
pub trait PersistentFieldManager: Send + Sync {
    /// Every change currently recorded for the page.
    fn gather_field_changes(&self, page_name: &str) -> PersistentFieldBundle;

    /// Records a change.
    fn post_change(&self, page_name: &str, nested_id: &str, field: &str, value: JsonValue);

    /// Forgets every change recorded for the page.
    fn discard_changes(&self, page_name: &str);
}

/// A snapshot of the field changes of one page.
///
/// Nested ids and field names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistentFieldBundle {
    values: AHashMap<(String, String), JsonValue>,
}

impl PersistentFieldBundle {
    /// An empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(nested_id: &str, field: &str) -> (String, String) {
        (nested_id.to_lowercase(), field.to_lowercase())
    }

    /// Records a value.
    pub fn insert(&mut self, nested_id: &str, field: &str, value: JsonValue) {
        self.values.insert(Self::key(nested_id, field), value);
    }

    /// Whether a change exists for the field.
    pub fn contains(&self, nested_id: &str, field: &str) -> bool {
        self.values.contains_key(&Self::key(nested_id, field))
    }

    /// The recorded value for the field.
    pub fn value(&self, nested_id: &str, field: &str) -> Option<&JsonValue> {
        self.values.get(&Self::key(nested_id, field))
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no change is recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A process-wide [`PersistentFieldManager`] kept in memory.
///
/// Every request sees the same changes; a session-backed manager plugs in
/// through the same trait.
#[derive(Debug, Default)]
pub struct InMemoryPersistentFieldManager {
    pages: Mutex<AHashMap<String, PersistentFieldBundle>>,
}

impl InMemoryPersistentFieldManager {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn pages(&self) -> std::sync::MutexGuard<'_, AHashMap<String, PersistentFieldBundle>> {
        self.pages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PersistentFieldManager for InMemoryPersistentFieldManager {
    fn gather_field_changes(&self, page_name: &str) -> PersistentFieldBundle {
        self.pages()
            .get(&page_name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn post_change(&self, page_name: &str, nested_id: &str, field: &str, value: JsonValue) {
        log::debug!("Persisting {page_name}:{nested_id}.{field} = {value}");
        self.pages()
            .entry(page_name.to_lowercase())
            .or_default()
            .insert(nested_id, field, value);
    }

    fn discard_changes(&self, page_name: &str) {
        self.pages().remove(&page_name.to_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_are_grouped_by_page() {
        let manager = InMemoryPersistentFieldManager::new();
        manager.post_change("Index", "form.name", "value", JsonValue::from("x"));
        manager.post_change("Other", "", "count", JsonValue::from(2));

        let bundle = manager.gather_field_changes("index");

        assert_eq!(bundle.len(), 1);
        assert!(bundle.contains("Form.Name", "VALUE"));
        assert_eq!(bundle.value("form.name", "value"), Some(&JsonValue::from("x")));
        assert!(!bundle.contains("", "count"));
    }

    #[test]
    fn test_discard_forgets_page() {
        let manager = InMemoryPersistentFieldManager::new();
        manager.post_change("Index", "", "count", JsonValue::from(1));
        manager.discard_changes("Index");
        assert!(manager.gather_field_changes("Index").is_empty());
    }
}
