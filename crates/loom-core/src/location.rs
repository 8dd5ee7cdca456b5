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

//! Source locations attached to structural objects and the errors they raise.

use std::fmt;
use std::sync::Arc;

/// A position within a resource (usually a template) that a component or
/// template element was declared at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    resource: Arc<str>,
    line: u32,
    column: Option<u32>,
}

impl Location {
    /// Creates a location for the given resource and line.
    pub fn new(resource: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            resource: resource.into(),
            line,
            column: None,
        }
    }

    /// Returns a copy of this location with a column attached.
    #[must_use]
    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// A location for objects that were built programmatically.
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0)
    }

    /// The resource (template path, class name) this location points into.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// One-based line number, or zero when unknown.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Optional one-based column.
    pub fn column(&self) -> Option<u32> {
        self.column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "{}, line {}, column {}", self.resource, self.line, column),
            None => write!(f, "{}, line {}", self.resource, self.line),
        }
    }
}

/// Implemented by anything that can report where it was declared.
pub trait Locatable {
    /// The declaration location.
    fn location(&self) -> &Location;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_column() {
        let location = Location::new("Index.tml", 12);
        assert_eq!(location.to_string(), "Index.tml, line 12");
    }

    #[test]
    fn test_display_with_column() {
        let location = Location::new("Layout.tml", 3).with_column(7);
        assert_eq!(location.to_string(), "Layout.tml, line 3, column 7");
        assert_eq!(location.column(), Some(7));
    }
}
