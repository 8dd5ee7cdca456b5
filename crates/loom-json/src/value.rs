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

use crate::{JsonArray, JsonError, JsonObject};
use std::fmt;

/// A JSON number, kept integral when it was integral.
#[derive(Debug, Clone, Copy)]
pub enum JsonNumber {
    /// An integer.
    Int(i64),
    /// A finite floating point number.
    Float(f64),
}

impl JsonNumber {
    /// The value as `f64`.
    pub fn as_f64(self) -> f64 {
        match self {
            JsonNumber::Int(value) => value as f64,
            JsonNumber::Float(value) => value,
        }
    }

    /// The value as `i64`, truncating any fraction.
    pub fn as_i64(self) -> i64 {
        match self {
            JsonNumber::Int(value) => value,
            JsonNumber::Float(value) => value as i64,
        }
    }

    fn is_finite(self) -> bool {
        match self {
            JsonNumber::Int(_) => true,
            JsonNumber::Float(value) => value.is_finite(),
        }
    }
}

impl PartialEq for JsonNumber {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonNumber::Int(a), JsonNumber::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl fmt::Display for JsonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonNumber::Int(value) => write!(f, "{value}"),
            // Shortest round-trip form; integral floats print without ".0".
            JsonNumber::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Text emitted verbatim, for values such as function references that are
/// not JSON but must travel inside a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLiteral(String);

impl JsonLiteral {
    /// Wraps the text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The raw text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Any value storable in a [`JsonObject`] or [`JsonArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// The JSON `null` marker. Equal to `None` when compared against an `Option`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// A finite number.
    Number(JsonNumber),
    /// A string.
    String(String),
    /// An array.
    Array(JsonArray),
    /// An object.
    Object(JsonObject),
    /// Verbatim text.
    Literal(JsonLiteral),
}

impl JsonValue {
    /// Whether this is the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// The string content, for string values only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// The object, for object values only.
    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonValue::Object(value) => Some(value),
            _ => None,
        }
    }

    /// The array, for array values only.
    pub fn as_array(&self) -> Option<&JsonArray> {
        match self {
            JsonValue::Array(value) => Some(value),
            _ => None,
        }
    }

    /// Reads the value as a boolean: booleans, and the strings `true`/`false`
    /// in any case.
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(value) => Some(*value),
            JsonValue::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
            JsonValue::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Reads the value as an integer: numbers (truncated) and numeric strings.
    pub fn coerce_i64(&self) -> Option<i64> {
        match self {
            JsonValue::Number(number) => Some(number.as_i64()),
            JsonValue::String(text) => {
                let text = text.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|value| value as i64))
            }
            _ => None,
        }
    }

    /// Reads the value as a float: numbers and numeric strings.
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(number) => Some(number.as_f64()),
            JsonValue::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Reads the value as text: strings as-is, everything else in its JSON form.
    pub fn coerce_string(&self) -> String {
        match self {
            JsonValue::String(value) => value.clone(),
            other => other.to_string(),
        }
    }

    pub(crate) fn check_finite(&self, location: impl FnOnce() -> String) -> Result<(), JsonError> {
        match self {
            JsonValue::Number(number) if !number.is_finite() => Err(JsonError::NonFinite(location())),
            _ => Ok(()),
        }
    }
}

/// `JsonValue::Null == None` holds, so callers that do not distinguish a JSON
/// null from an absent value can compare directly.
impl PartialEq<Option<JsonValue>> for JsonValue {
    fn eq(&self, other: &Option<JsonValue>) -> bool {
        match other {
            None => self.is_null(),
            Some(value) => self == value,
        }
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::printer::write_value(self, f)
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        JsonValue::Bool(value)
    }
}

impl From<i32> for JsonValue {
    fn from(value: i32) -> Self {
        JsonValue::Number(JsonNumber::Int(value.into()))
    }
}

impl From<u32> for JsonValue {
    fn from(value: u32) -> Self {
        JsonValue::Number(JsonNumber::Int(value.into()))
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        JsonValue::Number(JsonNumber::Int(value))
    }
}

impl From<usize> for JsonValue {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(value) => JsonValue::Number(JsonNumber::Int(value)),
            Err(_) => JsonValue::Number(JsonNumber::Float(value as f64)),
        }
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        JsonValue::Number(JsonNumber::Float(value))
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        JsonValue::String(value.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(value)
    }
}

impl From<JsonObject> for JsonValue {
    fn from(value: JsonObject) -> Self {
        JsonValue::Object(value)
    }
}

impl From<JsonArray> for JsonValue {
    fn from(value: JsonArray) -> Self {
        JsonValue::Array(value)
    }
}

impl From<JsonLiteral> for JsonValue {
    fn from(value: JsonLiteral) -> Self {
        JsonValue::Literal(value)
    }
}

impl<T: Into<JsonValue>> From<Option<T>> for JsonValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(JsonValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_equals_none_but_not_other_values() {
        assert!(JsonValue::Null == None);
        assert!(JsonValue::Null == Some(JsonValue::Null));
        assert!(JsonValue::Bool(false) != None);
        assert!(JsonValue::from(1) == Some(JsonValue::from(1)));
    }

    #[test]
    fn test_numbers_compare_across_representations() {
        assert_eq!(JsonNumber::Int(2), JsonNumber::Float(2.0));
        assert_ne!(JsonNumber::Int(2), JsonNumber::Float(2.5));
    }

    #[test]
    fn test_float_display_drops_trailing_zero() {
        assert_eq!(JsonValue::from(2.0).to_string(), "2");
        assert_eq!(JsonValue::from(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_coercions() {
        assert_eq!(JsonValue::from("TRUE").coerce_bool(), Some(true));
        assert_eq!(JsonValue::from(" 42 ").coerce_i64(), Some(42));
        assert_eq!(JsonValue::from(3.9).coerce_i64(), Some(3));
        assert_eq!(JsonValue::from(7).coerce_string(), "7");
        assert_eq!(JsonValue::from("x").coerce_f64(), None);
    }
}
