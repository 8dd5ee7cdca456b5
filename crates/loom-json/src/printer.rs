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

//! Compact serialization.

use crate::{JsonArray, JsonObject, JsonValue};
use std::fmt::{self, Write};

/// Quotes a string as a JSON string literal.
///
/// Besides the mandatory escapes, `/` is escaped when it follows `<`, and
/// the C1 control range and `U+2000..U+20FF` are written as `\uXXXX`.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    // Writing into a String cannot fail.
    let _ = write_quoted(text, &mut out);
    out
}

pub(crate) fn write_quoted(text: &str, out: &mut impl Write) -> fmt::Result {
    out.write_char('"')?;
    let mut previous = '\0';
    for c in text.chars() {
        match c {
            '\\' | '"' => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            '/' => {
                if previous == '<' {
                    out.write_char('\\')?;
                }
                out.write_char(c)?;
            }
            '\u{8}' => out.write_str("\\b")?,
            '\t' => out.write_str("\\t")?,
            '\n' => out.write_str("\\n")?,
            '\u{c}' => out.write_str("\\f")?,
            '\r' => out.write_str("\\r")?,
            c if c < ' ' || ('\u{80}'..'\u{a0}').contains(&c) || ('\u{2000}'..'\u{2100}').contains(&c) => {
                write!(out, "\\u{:04x}", c as u32)?;
            }
            c => out.write_char(c)?,
        }
        previous = c;
    }
    out.write_char('"')
}

pub(crate) fn write_value(value: &JsonValue, f: &mut impl Write) -> fmt::Result {
    match value {
        JsonValue::Null => f.write_str("null"),
        JsonValue::Bool(value) => f.write_str(if *value { "true" } else { "false" }),
        JsonValue::Number(number) => write!(f, "{number}"),
        JsonValue::String(text) => write_quoted(text, f),
        JsonValue::Literal(literal) => f.write_str(literal.as_str()),
        JsonValue::Array(array) => write_array(array, f),
        JsonValue::Object(object) => write_object(object, f),
    }
}

pub(crate) fn write_array(array: &JsonArray, f: &mut impl Write) -> fmt::Result {
    f.write_char('[')?;
    for (index, item) in array.iter().enumerate() {
        if index > 0 {
            f.write_char(',')?;
        }
        write_value(item, f)?;
    }
    f.write_char(']')
}

pub(crate) fn write_object(object: &JsonObject, f: &mut impl Write) -> fmt::Result {
    f.write_char('{')?;
    for (index, (key, item)) in object.iter().enumerate() {
        if index > 0 {
            f.write_char(',')?;
        }
        write_quoted(key, f)?;
        f.write_char(':')?;
        write_value(item, f)?;
    }
    f.write_char('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_script_close() {
        assert_eq!(quote("</script>"), r#""<\/script>""#);
        assert_eq!(quote("a/b"), r#""a/b""#);
    }

    #[test]
    fn test_quote_control_and_special_ranges() {
        assert_eq!(quote("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(quote("\n\t\u{1}"), r#""\n\t\u0001""#);
        assert_eq!(quote("\u{85}\u{2028}"), r#""\u0085\u2028""#);
        assert_eq!(quote(""), r#""""#);
        assert_eq!(quote("é"), "\"é\"");
    }
}
