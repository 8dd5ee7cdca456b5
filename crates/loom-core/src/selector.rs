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

//! Identifies the variant of a page: its locale plus any number of extra axes
//! (theme, device class, ...). Two requests with equal selectors share the
//! same cached page instance.

use std::collections::BTreeMap;
use std::fmt;

/// Locale plus arbitrary named axes, used as part of the page cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentResourceSelector {
    locale: String,
    axes: BTreeMap<String, String>,
}

impl ComponentResourceSelector {
    /// A selector for the given locale with no extra axes.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            axes: BTreeMap::new(),
        }
    }

    /// Returns a new selector with an additional axis. Axis names are
    /// case-insensitive; setting an existing axis replaces its value.
    #[must_use]
    pub fn with_axis(mut self, name: &str, value: impl Into<String>) -> Self {
        self.axes.insert(name.to_lowercase(), value.into());
        self
    }

    /// The locale, e.g. `"en"` or `"fr_CA"`.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Value of a named axis, if present.
    pub fn axis(&self, name: &str) -> Option<&str> {
        self.axes.get(&name.to_lowercase()).map(String::as_str)
    }
}

impl Default for ComponentResourceSelector {
    fn default() -> Self {
        Self::new("en")
    }
}

impl fmt::Display for ComponentResourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector[{}", self.locale)?;
        for (name, value) in &self.axes {
            write!(f, " {name}={value}")?;
        }
        write!(f, "]")
    }
}
