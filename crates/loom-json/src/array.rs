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

use crate::{JsonError, JsonObject, JsonValue, Tokener};
use std::fmt;
use std::str::FromStr;

/// Most nulls [`JsonArray::put_at`] will insert to reach an index.
pub const MAX_PADDING: usize = 1 << 16;

/// An ordered sequence of values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonArray {
    values: Vec<JsonValue>,
}

impl JsonArray {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an array from (permissive) JSON text.
    pub fn parse(text: &str) -> Result<Self, JsonError> {
        let mut tokener = Tokener::new(text);
        let array = tokener.parse_array()?;
        tokener.expect_end()?;
        Ok(array)
    }

    /// Appends a value.
    pub fn put(&mut self, value: impl Into<JsonValue>) -> Result<&mut Self, JsonError> {
        let value = value.into();
        value.check_finite(|| format!("index {}", self.values.len()))?;
        self.values.push(value);
        Ok(self)
    }

    /// Stores a value at an index, padding with nulls when the index is past the end.
    ///
    /// Fails with [`JsonError::IndexOutOfBounds`] when reaching the index
    /// would take more than [`MAX_PADDING`] nulls.
    pub fn put_at(&mut self, index: usize, value: impl Into<JsonValue>) -> Result<&mut Self, JsonError> {
        let value = value.into();
        value.check_finite(|| format!("index {index}"))?;
        if index.saturating_sub(self.values.len()) > MAX_PADDING {
            return Err(JsonError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        if index < self.values.len() {
            self.values[index] = value;
        } else {
            self.values.resize(index, JsonValue::Null);
            self.values.push(value);
        }
        Ok(self)
    }

    /// The value at an index, if any.
    pub fn opt(&self, index: usize) -> Option<&JsonValue> {
        self.values.get(index)
    }

    /// The value at an index.
    pub fn get(&self, index: usize) -> Result<&JsonValue, JsonError> {
        self.values.get(index).ok_or(JsonError::IndexOutOfBounds {
            index,
            len: self.values.len(),
        })
    }

    /// Whether the index is past the end or holds [`JsonValue::Null`].
    pub fn is_null(&self, index: usize) -> bool {
        self.opt(index).map_or(true, JsonValue::is_null)
    }

    fn mismatch(index: usize, expected: &'static str) -> JsonError {
        JsonError::TypeMismatch {
            location: format!("JsonArray[{index}]"),
            expected,
        }
    }

    /// The value as text; non-string values yield their JSON form.
    pub fn get_string(&self, index: usize) -> Result<String, JsonError> {
        self.get(index).map(JsonValue::coerce_string)
    }

    /// The value as a boolean.
    pub fn get_bool(&self, index: usize) -> Result<bool, JsonError> {
        self.get(index)?
            .coerce_bool()
            .ok_or_else(|| Self::mismatch(index, "a boolean"))
    }

    /// The value as an integer.
    pub fn get_i64(&self, index: usize) -> Result<i64, JsonError> {
        self.get(index)?
            .coerce_i64()
            .ok_or_else(|| Self::mismatch(index, "a number"))
    }

    /// The value as a float.
    pub fn get_f64(&self, index: usize) -> Result<f64, JsonError> {
        self.get(index)?
            .coerce_f64()
            .ok_or_else(|| Self::mismatch(index, "a number"))
    }

    /// The value as a nested object.
    pub fn get_object(&self, index: usize) -> Result<&JsonObject, JsonError> {
        self.get(index)?
            .as_object()
            .ok_or_else(|| Self::mismatch(index, "a JsonObject"))
    }

    /// The value as a nested array.
    pub fn get_array(&self, index: usize) -> Result<&JsonArray, JsonError> {
        self.get(index)?
            .as_array()
            .ok_or_else(|| Self::mismatch(index, "a JsonArray"))
    }

    /// Removes and returns the value at an index.
    pub fn remove(&mut self, index: usize) -> Option<JsonValue> {
        (index < self.values.len()).then(|| self.values.remove(index))
    }

    /// Values in order.
    pub fn iter(&self) -> std::slice::Iter<'_, JsonValue> {
        self.values.iter()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'a> IntoIterator for &'a JsonArray {
    type Item = &'a JsonValue;
    type IntoIter = std::slice::Iter<'a, JsonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Display for JsonArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::printer::write_array(self, f)
    }
}

impl FromStr for JsonArray {
    type Err = JsonError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_at_refuses_huge_padding() {
        let mut array = JsonArray::new();
        array.put("a").unwrap();

        let error = array.put_at(usize::MAX, "z").unwrap_err();

        assert_eq!(error, JsonError::IndexOutOfBounds { index: usize::MAX, len: 1 });
        assert_eq!(array.len(), 1);
        assert!(array.put_at(1 + MAX_PADDING, "b").is_ok());
        assert_eq!(array.len(), 2 + MAX_PADDING);
    }

    #[test]
    fn test_put_at_pads_with_null() {
        let mut array = JsonArray::new();
        array.put_at(2, "c").unwrap();
        assert_eq!(array.to_string(), r#"[null,null,"c"]"#);
        assert!(array.is_null(0));
        assert!(array.is_null(10));

        array.put_at(0, "a").unwrap();
        assert_eq!(array.to_string(), r#"["a",null,"c"]"#);
    }

    #[test]
    fn test_get_past_end() {
        let array = JsonArray::new();
        assert_eq!(
            array.get(0),
            Err(JsonError::IndexOutOfBounds { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_typed_getters() {
        let array: JsonArray = r#"[1, "2", true, {"k": []}]"#.parse().unwrap();
        assert_eq!(array.get_i64(0).unwrap(), 1);
        assert_eq!(array.get_f64(1).unwrap(), 2.0);
        assert!(array.get_bool(2).unwrap());
        assert!(array.get_object(3).unwrap().get_array("k").unwrap().is_empty());
        assert!(array.get_object(0).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut array = JsonArray::new();
        assert_eq!(
            array.put(f64::NEG_INFINITY).err(),
            Some(JsonError::NonFinite("index 0".into()))
        );
        assert!(array.is_empty());
    }
}
