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

//! # Loom JSON
//!
//! The JSON value model used as the wire format for partial responses.
//!
//! Reading is permissive: the tokener accepts trailing commas, unquoted keys
//! and values, single-quoted strings, `;` as a separator, `=`/`=>` as a key
//! separator, and `//`, `/* */` and `#` comments. Writing is strict and
//! compact: `{"key":value}` and `[v,v]` with no inserted whitespace, and a
//! backslash before any `/` that follows `<` so output can be embedded in an
//! HTML `<script>` block.
//!
//! [`JsonValue::Null`] is a first-class value distinct from an absent key,
//! yet it compares equal to `None`:
//!
//! ```rust
//! use loom_json::{JsonObject, JsonValue};
//!
//! let mut object = JsonObject::new();
//! object.put("k", JsonValue::Null).unwrap();
//!
//! assert!(JsonValue::Null == None);
//! assert!(object.has("k") && object.is_null("k"));
//! assert!(!object.has("missing") && object.is_null("missing"));
//! ```

#![warn(missing_docs)]

mod array;
mod error;
mod object;
mod printer;
mod tokener;
mod value;

pub use array::{JsonArray, MAX_PADDING};
pub use error::JsonError;
pub use object::JsonObject;
pub use printer::quote;
pub use tokener::{Tokener, MAX_DEPTH};
pub use value::{JsonLiteral, JsonNumber, JsonValue};

/// Parses any JSON value.
pub fn parse(text: &str) -> Result<JsonValue, JsonError> {
    Tokener::new(text).parse_document()
}
