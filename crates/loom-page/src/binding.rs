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

//! Parameter bindings: the values a container supplies to its children.

use loom_core::{HandlerError, Location};
use loom_json::JsonValue;
use std::fmt;
use std::sync::RwLock;

/// A source (and possibly a sink) for a component parameter.
pub trait Binding: fmt::Debug + Send + Sync {
    /// Reads the current value.
    fn get(&self) -> Result<JsonValue, HandlerError>;

    /// Writes a new value. Read-only bindings fail.
    fn set(&self, value: JsonValue) -> Result<(), HandlerError> {
        let _ = value;
        Err(format!("Binding {self:?} is read-only").into())
    }

    /// Whether the value can never change, so it may be cached indefinitely.
    fn is_invariant(&self) -> bool {
        false
    }

    /// Where the binding was declared, if known.
    fn location(&self) -> Option<&Location> {
        None
    }
}

/// A constant value, as written in a template attribute.
#[derive(Debug, Clone)]
pub struct LiteralBinding {
    value: JsonValue,
    location: Option<Location>,
}

impl LiteralBinding {
    /// A binding that always yields `value`.
    pub fn new(value: impl Into<JsonValue>) -> Self {
        Self {
            value: value.into(),
            location: None,
        }
    }

    /// Attaches a declaration location.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl Binding for LiteralBinding {
    fn get(&self) -> Result<JsonValue, HandlerError> {
        Ok(self.value.clone())
    }

    fn is_invariant(&self) -> bool {
        true
    }

    fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

/// A shared, writable cell, standing in for a property of the container.
#[derive(Debug)]
pub struct ValueBinding {
    value: RwLock<JsonValue>,
}

impl ValueBinding {
    /// A cell holding `value`.
    pub fn new(value: impl Into<JsonValue>) -> Self {
        Self {
            value: RwLock::new(value.into()),
        }
    }
}

impl Binding for ValueBinding {
    fn get(&self) -> Result<JsonValue, HandlerError> {
        let value = self.value.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(value.clone())
    }

    fn set(&self, value: JsonValue) -> Result<(), HandlerError> {
        let mut slot = self.value.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = value;
        Ok(())
    }
}
