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

//! A small insertion-ordered map with case-insensitive string keys.
//!
//! Component ids, block ids, parameter names and mixin ids are all matched
//! without regard to case, while the original spelling is kept for messages.

use ahash::AHashMap;

/// An insertion-ordered, case-insensitive map from names to values.
#[derive(Debug, Clone)]
pub struct NamedSet<T> {
    entries: Vec<(String, T)>,
    index: AHashMap<String, usize>,
}

impl<T> Default for NamedSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: AHashMap::new(),
        }
    }
}

impl<T> NamedSet<T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value stored under the same
    /// (case-insensitive) name. The original name and position are kept on replace.
    pub fn put(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        let name = name.into();
        let key = name.to_lowercase();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Inserts a value only if the name is not present. Returns `false` when
    /// the name was already taken.
    pub fn put_if_new(&mut self, name: impl Into<String>, value: T) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.put(name, value);
        true
    }

    /// Looks up a value by name.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index
            .get(&name.to_lowercase())
            .map(|&slot| &self.entries[slot].1)
    }

    /// Looks up a value mutably by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        match self.index.get(&name.to_lowercase()) {
            Some(&slot) => Some(&mut self.entries[slot].1),
            None => None,
        }
    }

    /// Whether a value is stored under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Names in insertion order, with their original spelling.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Names sorted case-insensitively; used when listing alternatives in errors.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names().map(str::to_string).collect();
        names.sort_by_key(|name| name.to_lowercase());
        names
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
