mod common;

use common::{failure, run};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn constructors_called_without_arguments() {
    assert_eq!(run("Boolean()"), json!(false));
    assert_eq!(run("Number()"), json!(0));
    assert_eq!(run("String()"), json!(""));
    assert_eq!(run("Object()"), json!({}));
    assert_eq!(run("Array()"), json!([]));
}

#[test]
fn constructor_prototypes_cannot_be_replaced() {
    for name in ["Boolean", "Number", "String", "Object", "Array"] {
        let message = failure(&format!("{name}.__proto__ = 'test'"));
        assert!(
            message.contains(&format!("Cannot modify prototype of '{name}'")),
            "{message}"
        );
    }
}

#[test]
fn typeof_results() {
    assert_eq!(
        run("[typeof 1, typeof 'a', typeof true, typeof undefined, typeof null, typeof {}, typeof [], typeof function(){}, typeof Symbol()]"),
        json!(["number", "string", "boolean", "undefined", "object", "object", "object", "function", "symbol"])
    );
}

#[test]
fn conversions() {
    assert_eq!(run("[1 + '2', '3' * '4', +true, !!'', null + 1, [1,2] + '']"), json!(["12", 12, 1, false, 1, "1,2"]));
    assert_eq!(run("[1 == '1', 1 === '1', null == undefined, NaN === NaN]"), json!([true, false, true, false]));
    assert_eq!(run("[parseInt('42px'), parseFloat('3.5e1'), Number('0x1f'), isNaN('abc')]"), json!([42, 35, 31, true]));
}

#[test]
fn collections() {
    assert_eq!(
        run("var m = new Map([['a', 1]]); m.set('b', 2); var s = new Set([1, 1, 2]); [m.get('b'), m.size, s.size, s.has(2)]"),
        json!([2, 2, 2, true])
    );
    assert_eq!(run("new Map([['k', 'v']]).keys()"), json!(["k"]));
}

#[test]
fn dates_and_math() {
    assert_eq!(run("new Date(0).toISOString()"), json!("1970-01-01T00:00:00.000Z"));
    assert_eq!(run("var r = Math.random(); r >= 0 && r < 1"), json!(true));
    assert_eq!(run("[Math.floor(2.7), Math.abs(-3), Math.pow(2, 10)]"), json!([2, 3, 1024]));
}

#[test]
fn json_round_trip() {
    assert_eq!(
        run(r#"JSON.parse('{"a":[1,{"b":null}]}').a[1]"#),
        json!({"b": null})
    );
    assert_eq!(run("JSON.stringify({a: [1, 'x'], b: undefined}, null, 1)"), json!("{\n \"a\": [\n  1,\n  \"x\"\n ]\n}"));
}

#[test]
fn error_options_carry_a_cause() {
    assert_eq!(
        run("var e = new Error('outer', { cause: 'inner' }); [e.message, e.cause]"),
        json!(["outer", "inner"])
    );
    assert_eq!(run("'cause' in new TypeError('x', {})"), json!(false));
    assert_eq!(run("'cause' in new RangeError('x', 5)"), json!(false));
}
