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

/// Errors raised by the JSON model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JsonError {
    /// Malformed input text.
    #[error("{message} at character {position}")]
    Syntax {
        /// What was wrong.
        message: String,
        /// Character offset of the failure.
        position: usize,
    },

    /// The object has no such key.
    #[error("JsonObject[\"{0}\"] not found")]
    MissingKey(String),

    /// The stored value cannot be read as the requested type.
    #[error("{location} is not {expected}")]
    TypeMismatch {
        /// The key or index being read.
        location: String,
        /// The requested type.
        expected: &'static str,
    },

    /// NaN and infinite numbers cannot be represented.
    #[error("JSON does not allow non-finite numbers (at {0})")]
    NonFinite(String),

    /// An array index past the end.
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The array length.
        len: usize,
    },
}
