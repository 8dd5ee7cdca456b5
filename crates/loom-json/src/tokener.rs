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

//! The permissive JSON reader.

use crate::{JsonArray, JsonError, JsonNumber, JsonObject, JsonValue};

/// Characters that end an unquoted token.
const UNQUOTED_STOP: &str = ",:]}/\\\"[{;=#";

/// Deepest nesting of objects and arrays the reader accepts.
pub const MAX_DEPTH: usize = 512;

/// Reads JSON text one character at a time.
pub struct Tokener {
    chars: Vec<char>,
    position: usize,
    depth: usize,
}

impl Tokener {
    /// A reader over the given text.
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            position: 0,
            depth: 0,
        }
    }

    /// Current character offset.
    pub fn position(&self) -> usize {
        self.position
    }

    fn syntax(&self, message: impl Into<String>) -> JsonError {
        JsonError::Syntax {
            message: message.into(),
            position: self.position,
        }
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.get(self.position).copied();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn back(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    /// The next character that is neither whitespace nor part of a comment.
    fn next_clean(&mut self) -> Result<Option<char>, JsonError> {
        loop {
            let Some(c) = self.next() else {
                return Ok(None);
            };
            match c {
                '/' => match self.peek() {
                    Some('/') => self.skip_line(),
                    Some('*') => {
                        self.position += 1;
                        self.skip_block_comment()?;
                    }
                    _ => return Ok(Some(c)),
                },
                '#' => self.skip_line(),
                c if c.is_whitespace() => {}
                c => return Ok(Some(c)),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.next() {
            if c == '\n' || c == '\r' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), JsonError> {
        loop {
            match self.next() {
                None => return Err(self.syntax("Unclosed comment")),
                Some('*') if self.peek() == Some('/') => {
                    self.position += 1;
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    /// Parses a complete document holding any value.
    pub fn parse_document(&mut self) -> Result<JsonValue, JsonError> {
        let value = self.next_value()?;
        self.expect_end()?;
        Ok(value)
    }

    /// Fails if anything other than whitespace and comments remains.
    pub fn expect_end(&mut self) -> Result<(), JsonError> {
        match self.next_clean()? {
            None => Ok(()),
            Some(c) => {
                self.back();
                Err(self.syntax(format!("Unexpected character '{c}' after the end of the document")))
            }
        }
    }

    /// Reads the next value of any kind.
    pub fn next_value(&mut self) -> Result<JsonValue, JsonError> {
        match self.next_clean()? {
            Some(quote @ ('"' | '\'')) => self.next_string(quote).map(JsonValue::String),
            Some('{') => {
                self.back();
                self.parse_object().map(JsonValue::Object)
            }
            Some('[') => {
                self.back();
                self.parse_array().map(JsonValue::Array)
            }
            Some(_) => {
                self.back();
                self.next_unquoted()
            }
            None => Err(self.syntax("Missing value")),
        }
    }

    fn next_string(&mut self, quote: char) -> Result<String, JsonError> {
        let mut out = String::new();
        loop {
            match self.next() {
                None | Some('\n') | Some('\r') => return Err(self.syntax("Unterminated string")),
                Some('\\') => match self.next() {
                    Some('b') => out.push('\u{8}'),
                    Some('t') => out.push('\t'),
                    Some('n') => out.push('\n'),
                    Some('f') => out.push('\u{c}'),
                    Some('r') => out.push('\r'),
                    Some('u') => out.push(self.next_hex_char(4)?),
                    Some('x') => out.push(self.next_hex_char(2)?),
                    Some(c) => out.push(c),
                    None => return Err(self.syntax("Unterminated string")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn next_hex_char(&mut self, digits: usize) -> Result<char, JsonError> {
        if self.position + digits > self.chars.len() {
            return Err(self.syntax("Substring bounds error"));
        }
        let hex: String = self.chars[self.position..self.position + digits].iter().collect();
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.syntax(format!("Illegal escape \\{hex}")))?;
        self.position += digits;
        char::from_u32(code).ok_or_else(|| self.syntax(format!("Illegal code point {code:#x}")))
    }

    fn next_unquoted(&mut self) -> Result<JsonValue, JsonError> {
        let start = self.position;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || UNQUOTED_STOP.contains(c) {
                break;
            }
            self.position += 1;
        }
        let token: String = self.chars[start..self.position].iter().collect();
        if token.is_empty() {
            return Err(self.syntax("Missing value"));
        }
        Ok(string_to_value(token))
    }

    fn descend(&mut self) -> Result<(), JsonError> {
        if self.depth == MAX_DEPTH {
            return Err(self.syntax(format!("Nesting exceeds {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        Ok(())
    }

    /// Reads an object, starting at its opening brace.
    pub fn parse_object(&mut self) -> Result<JsonObject, JsonError> {
        self.descend()?;
        let object = self.read_object();
        self.depth -= 1;
        object
    }

    fn read_object(&mut self) -> Result<JsonObject, JsonError> {
        match self.next_clean()? {
            Some('{') => {}
            Some(_) => {
                self.back();
                return Err(self.syntax("A JsonObject text must begin with '{'"));
            }
            None => return Err(self.syntax("A JsonObject text must begin with '{'")),
        }
        let mut object = JsonObject::new();
        loop {
            match self.next_clean()? {
                None => return Err(self.syntax("A JsonObject text must end with '}'")),
                Some('}') => return Ok(object),
                Some(_) => self.back(),
            }
            let key_position = self.position;
            let key = self.next_value()?.coerce_string();

            match self.next_clean()? {
                Some('=') => {
                    if self.peek() == Some('>') {
                        self.position += 1;
                    }
                }
                Some(':') => {}
                _ => return Err(self.syntax("Expected a ':' after a key")),
            }

            let value = self.next_value()?;
            object.put_once(key, value).map_err(|error| match error {
                JsonError::Syntax { message, .. } => JsonError::Syntax {
                    message,
                    position: key_position,
                },
                other => other,
            })?;

            match self.next_clean()? {
                Some(',' | ';') => match self.next_clean()? {
                    Some('}') => return Ok(object),
                    Some(_) => self.back(),
                    None => return Err(self.syntax("A JsonObject text must end with '}'")),
                },
                Some('}') => return Ok(object),
                _ => return Err(self.syntax("Expected a ',' or '}'")),
            }
        }
    }

    /// Reads an array, starting at its opening bracket.
    ///
    /// An elided element (`[1,,2]`) reads as null.
    pub fn parse_array(&mut self) -> Result<JsonArray, JsonError> {
        self.descend()?;
        let array = self.read_array();
        self.depth -= 1;
        array
    }

    fn read_array(&mut self) -> Result<JsonArray, JsonError> {
        match self.next_clean()? {
            Some('[') => {}
            Some(_) => {
                self.back();
                return Err(self.syntax("A JsonArray text must start with '['"));
            }
            None => return Err(self.syntax("A JsonArray text must start with '['")),
        }
        let mut array = JsonArray::new();
        match self.next_clean()? {
            Some(']') => return Ok(array),
            Some(_) => self.back(),
            None => return Err(self.syntax("A JsonArray text must end with ']'")),
        }
        loop {
            match self.next_clean()? {
                Some(',') => {
                    self.back();
                    array.put(JsonValue::Null)?;
                }
                Some(_) => {
                    self.back();
                    array.put(self.next_value()?)?;
                }
                None => return Err(self.syntax("A JsonArray text must end with ']'")),
            }
            match self.next_clean()? {
                Some(',' | ';') => match self.next_clean()? {
                    Some(']') => return Ok(array),
                    Some(_) => self.back(),
                    None => return Err(self.syntax("A JsonArray text must end with ']'")),
                },
                Some(']') => return Ok(array),
                _ => return Err(self.syntax("Expected a ',' or ']'")),
            }
        }
    }
}

/// Interprets an unquoted token: `true`, `false` and `null` in any case,
/// decimal and `0x` hexadecimal numbers, otherwise the text itself.
fn string_to_value(token: String) -> JsonValue {
    if token.eq_ignore_ascii_case("true") {
        return JsonValue::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return JsonValue::Bool(false);
    }
    if token.eq_ignore_ascii_case("null") {
        return JsonValue::Null;
    }

    let numeric_start = token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    if numeric_start {
        if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            if let Ok(value) = i64::from_str_radix(hex, 16) {
                return JsonValue::Number(JsonNumber::Int(value));
            }
        }
        if let Ok(value) = token.parse::<i64>() {
            return JsonValue::Number(JsonNumber::Int(value));
        }
        if let Ok(value) = token.parse::<f64>() {
            if value.is_finite() {
                return JsonValue::Number(JsonNumber::Float(value));
            }
        }
    }
    JsonValue::String(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_relaxed_syntax() {
        let text = r#"
            // leading comment
            {
                unquoted: 'single',   # hash comment
                "semi" = 1;
                arrow => /* inline */ [1, 2,],
            }
        "#;
        let object = JsonObject::parse(text).unwrap();
        assert_eq!(object.get_string("unquoted").unwrap(), "single");
        assert_eq!(object.get_i64("semi").unwrap(), 1);
        assert_eq!(object.get_array("arrow").unwrap().len(), 2);
    }

    #[test]
    fn test_elided_array_elements_are_null() {
        let array = JsonArray::parse("[1,,2]").unwrap();
        assert_eq!(array.to_string(), "[1,null,2]");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse("0x1F").unwrap(), JsonValue::from(31));
        assert_eq!(parse("-12").unwrap(), JsonValue::from(-12i64));
        assert_eq!(parse("1.5e2").unwrap(), JsonValue::from(150.0));
        assert_eq!(parse("1.2.3").unwrap(), JsonValue::from("1.2.3"));
    }

    #[test]
    fn test_literal_keywords_in_any_case() {
        assert_eq!(parse("TRUE").unwrap(), JsonValue::Bool(true));
        assert!(parse("Null").unwrap().is_null());
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            parse(r#""aA\x42\/\"""#).unwrap(),
            JsonValue::from("aAB/\"")
        );
    }

    #[test]
    fn test_syntax_errors_report_position() {
        match JsonObject::parse(r#"{"a" 1}"#) {
            Err(JsonError::Syntax { message, position }) => {
                assert_eq!(message, "Expected a ':' after a key");
                assert_eq!(position, 6);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse("\"open"), Err(JsonError::Syntax { .. })));
        assert!(matches!(parse("{} x"), Err(JsonError::Syntax { .. })));
        assert!(matches!(parse(""), Err(JsonError::Syntax { .. })));
        assert!(matches!(parse("["), Err(JsonError::Syntax { .. })));
        assert!(matches!(parse("{\"a\":1,"), Err(JsonError::Syntax { .. })));
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        assert!(matches!(
            JsonObject::parse(r#"{"a":1,"a":2}"#),
            Err(JsonError::Syntax { message, .. }) if message.contains("Duplicate key")
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&deep).is_ok());

        let deeper = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse(&deeper),
            Err(JsonError::Syntax { message, .. }) if message.contains("Nesting exceeds")
        ));
    }
}
