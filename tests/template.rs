mod common;

use common::{run, run_with};
use estreval::JsObject;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn substitutions_read_bindings() {
    let bindings = JsObject::new();
    bindings.set("foo", "hello");
    bindings.set("bar", "world");
    assert_eq!(run_with("`${foo} ${bar}!`", &bindings), json!("hello world!"));
}

#[test]
fn expressions_and_nesting() {
    assert_eq!(run("var n = 2; `${n} * 3 = ${n * 3}`"), json!("2 * 3 = 6"));
    assert_eq!(run("`outer ${`inner ${1 + 1}`}`"), json!("outer inner 2"));
    assert_eq!(run("`line1\nline2`.split('\\n').length"), json!(2));
}

#[test]
fn tagged_templates_receive_cooked_and_raw_strings() {
    assert_eq!(
        run("function tag(s, ...v) { return s.join('|') + ':' + s.raw.join('|') + ':' + v.join(',') } tag`a${1}\\t${2}c`"),
        json!("a|\t|c:a|\\t|c:1,2")
    );
}
