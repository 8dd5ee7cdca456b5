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

use crate::{JsonArray, JsonError, JsonValue, Tokener};
use std::fmt;
use std::str::FromStr;

/// An insertion-ordered set of key/value pairs.
///
/// Equality ignores key order.
#[derive(Debug, Clone, Default)]
pub struct JsonObject {
    entries: Vec<(String, JsonValue)>,
}

impl JsonObject {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an object from (permissive) JSON text.
    pub fn parse(text: &str) -> Result<Self, JsonError> {
        let mut tokener = Tokener::new(text);
        let object = tokener.parse_object()?;
        tokener.expect_end()?;
        Ok(object)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(name, _)| name == key)
    }

    /// Stores a value, replacing any previous value under the key.
    ///
    /// Non-finite numbers are rejected here rather than at serialization.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Result<&mut Self, JsonError> {
        let key = key.into();
        let value = value.into();
        value.check_finite(|| format!("key \"{key}\""))?;
        match self.position(&key) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(self)
    }

    /// Stores a value under a new key, failing if the key is already present.
    pub fn put_once(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Result<&mut Self, JsonError> {
        let key = key.into();
        if self.has(&key) {
            return Err(JsonError::Syntax {
                message: format!("Duplicate key \"{key}\""),
                position: 0,
            });
        }
        self.put(key, value)
    }

    /// Adds a value under a key, turning the entry into an array when the key
    /// is already present.
    pub fn accumulate(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Result<&mut Self, JsonError> {
        let key = key.into();
        let value = value.into();
        value.check_finite(|| format!("key \"{key}\""))?;
        match self.position(&key) {
            None => {
                self.entries.push((key, value));
            }
            Some(index) => {
                let slot = &mut self.entries[index].1;
                match slot {
                    JsonValue::Array(array) => {
                        array.put(value)?;
                    }
                    existing => {
                        let mut array = JsonArray::new();
                        array.put(std::mem::replace(existing, JsonValue::Null))?;
                        array.put(value)?;
                        *existing = JsonValue::Array(array);
                    }
                }
            }
        }
        Ok(self)
    }

    /// Appends a value to the array stored under a key, creating the array
    /// when the key is absent.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Result<&mut Self, JsonError> {
        let key = key.into();
        match self.position(&key) {
            None => {
                let mut array = JsonArray::new();
                array.put(value)?;
                self.entries.push((key, JsonValue::Array(array)));
            }
            Some(index) => match &mut self.entries[index].1 {
                JsonValue::Array(array) => {
                    array.put(value)?;
                }
                _ => {
                    return Err(JsonError::TypeMismatch {
                        location: format!("JsonObject[\"{key}\"]"),
                        expected: "an array",
                    })
                }
            },
        }
        Ok(self)
    }

    /// Whether the key is present, even with a null value.
    pub fn has(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Whether the key is absent or holds [`JsonValue::Null`].
    ///
    /// An explicit null and an absent key are indistinguishable here, but
    /// [`has`](JsonObject::has) tells them apart.
    pub fn is_null(&self, key: &str) -> bool {
        self.opt(key).map_or(true, JsonValue::is_null)
    }

    /// The value under the key, if any.
    pub fn opt(&self, key: &str) -> Option<&JsonValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// The value under the key.
    pub fn get(&self, key: &str) -> Result<&JsonValue, JsonError> {
        self.opt(key).ok_or_else(|| JsonError::MissingKey(key.to_string()))
    }

    fn mismatch(key: &str, expected: &'static str) -> JsonError {
        JsonError::TypeMismatch {
            location: format!("JsonObject[\"{key}\"]"),
            expected,
        }
    }

    /// The value as text; non-string values yield their JSON form.
    pub fn get_string(&self, key: &str) -> Result<String, JsonError> {
        self.get(key).map(JsonValue::coerce_string)
    }

    /// The value as a boolean.
    pub fn get_bool(&self, key: &str) -> Result<bool, JsonError> {
        self.get(key)?
            .coerce_bool()
            .ok_or_else(|| Self::mismatch(key, "a boolean"))
    }

    /// The value as an integer.
    pub fn get_i64(&self, key: &str) -> Result<i64, JsonError> {
        self.get(key)?
            .coerce_i64()
            .ok_or_else(|| Self::mismatch(key, "a number"))
    }

    /// The value as a float.
    pub fn get_f64(&self, key: &str) -> Result<f64, JsonError> {
        self.get(key)?
            .coerce_f64()
            .ok_or_else(|| Self::mismatch(key, "a number"))
    }

    /// The value as a nested object.
    pub fn get_object(&self, key: &str) -> Result<&JsonObject, JsonError> {
        self.get(key)?
            .as_object()
            .ok_or_else(|| Self::mismatch(key, "a JsonObject"))
    }

    /// The value as a nested array.
    pub fn get_array(&self, key: &str) -> Result<&JsonArray, JsonError> {
        self.get(key)?
            .as_array()
            .ok_or_else(|| Self::mismatch(key, "a JsonArray"))
    }

    /// The nested object under the key, created when absent.
    pub fn in_object(&mut self, key: &str) -> Result<&mut JsonObject, JsonError> {
        let index = match self.position(key) {
            Some(index) => index,
            None => {
                self.entries
                    .push((key.to_string(), JsonValue::Object(JsonObject::new())));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[index].1 {
            JsonValue::Object(object) => Ok(object),
            _ => Err(Self::mismatch(key, "a JsonObject")),
        }
    }

    /// Removes and returns the value under the key.
    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for JsonObject {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.opt(key) == Some(value))
    }
}

impl fmt::Display for JsonObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::printer::write_object(self, f)
    }
}

impl FromStr for JsonObject {
    type Err = JsonError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}
