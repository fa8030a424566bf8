mod common;

use common::{eval, run};
use estreval::JsValue;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn primitives() {
    assert_eq!(eval("null").unwrap(), JsValue::Null);
    assert_eq!(eval("undefined").unwrap(), JsValue::Undefined);
    assert_eq!(eval("0").unwrap(), JsValue::Number(0.0));
    assert_eq!(eval("1").unwrap(), JsValue::Number(1.0));
    assert_eq!(eval(r#""""#).unwrap(), JsValue::from(""));
    assert_eq!(eval("''").unwrap(), JsValue::from(""));
    assert_eq!(eval(r#""a""#).unwrap(), JsValue::from("a"));
    assert_eq!(eval("'a'").unwrap(), JsValue::from("a"));
    assert_eq!(eval("true").unwrap(), JsValue::Boolean(true));
}

#[test]
fn numeric_forms() {
    assert_eq!(run("[0x10, 0o17, 0b101, 1e3, .5, 1_000]"), json!([16, 15, 5, 1000, 0.5, 1000]));
    assert_eq!(run("String(0.1 + 0.2)"), json!("0.30000000000000004"));
    assert_eq!(run("String(1 / 0)"), json!("Infinity"));
}

#[test]
fn arrays() {
    assert_eq!(run("[]"), json!([]));
    assert_eq!(run("[0]"), json!([0]));
    assert_eq!(run("[1,2,3]"), json!([1, 2, 3]));
    assert_eq!(run("[1,,3].length"), json!(3));
}

#[test]
fn objects_need_parentheses() {
    assert_eq!(run("({})"), json!({}));
    assert_eq!(run("({ a: 0, b: 2, c: 3 })"), json!({"a": 0, "b": 2, "c": 3}));
    assert_eq!(run("var k = 'dyn'; ({ [k + 1]: true, short() { return 1 } }).dyn1"), json!(true));
    assert_eq!(eval("{}").unwrap(), JsValue::Undefined);
}

#[test]
fn empty_programs() {
    assert_eq!(eval("").unwrap(), JsValue::Undefined);
    assert_eq!(eval(";").unwrap(), JsValue::Undefined);
}

#[test]
fn regex_literals() {
    assert_eq!(run("/a+/.test('caaat')"), json!(true));
    assert_eq!(run("'a-b-c'.replace(/-/g, '+')"), json!("a+b+c"));
    assert_eq!(run("'x1y22'.match(/\\d+/g)"), json!(["1", "22"]));
}

#[test]
fn string_escapes() {
    assert_eq!(run(r#""A\x42\n".length"#), json!(3));
    assert_eq!(run(r#""\u{1F600}".length"#), json!(2));
}
