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

//! Integration tests for the JSON model as used on the wire: building a
//! response, serializing it compactly and reading it back.

use loom_json::{parse, JsonArray, JsonError, JsonLiteral, JsonObject, JsonValue};

#[test]
fn test_object_round_trip_is_compact_and_lossless() {
    // ARRANGE
    let mut array = JsonArray::new();
    array.put("x").unwrap().put(true).unwrap();
    let mut object = JsonObject::new();
    object.put("a", 1).unwrap().put("b", array).unwrap();

    // ACT
    let text = object.to_string();
    let reparsed = JsonObject::parse(&text).unwrap();

    // ASSERT
    assert_eq!(text, r#"{"a":1,"b":["x",true]}"#);
    assert_eq!(
        reparsed.keys().collect::<Vec<_>>(),
        object.keys().collect::<Vec<_>>()
    );
    assert_eq!(reparsed, object);
}

#[test]
fn test_markup_payload_is_script_safe() {
    // ARRANGE
    let mut response = JsonObject::new();
    response
        .put("content", "<div>hi</div><script>x()</script>")
        .unwrap();

    // ACT
    let text = response.to_string();

    // ASSERT
    assert_eq!(
        text,
        r#"{"content":"<div>hi<\/div><script>x()<\/script>"}"#
    );
    assert_eq!(
        JsonObject::parse(&text).unwrap().get_string("content").unwrap(),
        "<div>hi</div><script>x()</script>"
    );
}

#[test]
fn test_literals_are_emitted_verbatim() {
    // ARRANGE
    let mut object = JsonObject::new();
    object
        .put("handler", JsonLiteral::new("function(){ return 1; }"))
        .unwrap();

    // ACT
    let text = object.to_string();

    // ASSERT
    assert_eq!(text, r#"{"handler":function(){ return 1; }}"#);
}

#[test]
fn test_null_marker_survives_round_trip() {
    // ARRANGE
    let mut object = JsonObject::new();
    object.put("gone", JsonValue::Null).unwrap();

    // ACT
    let reparsed = parse(&object.to_string()).unwrap();
    let reparsed = reparsed.as_object().unwrap();

    // ASSERT
    assert!(reparsed.has("gone"));
    assert!(reparsed.is_null("gone"));
    assert!(*reparsed.get("gone").unwrap() == None);
}

#[test]
fn test_unbalanced_nesting_is_rejected_without_overflow() {
    // ARRANGE
    let text = format!("{}{}", r#"{"a":"#.repeat(50_000), "[".repeat(50_000));

    // ACT
    let result = parse(&text);

    // ASSERT
    assert!(
        matches!(&result, Err(JsonError::Syntax { message, .. }) if message.contains("Nesting exceeds")),
        "unexpected {result:?}"
    );
}
