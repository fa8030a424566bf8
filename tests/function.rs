mod common;

use common::{eval, interpreter, run};
use estreval::{JsObject, JsValue};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn function_expression_is_callable_from_the_host() {
    let bindings = JsObject::new();
    let mut interp = interpreter(&bindings);
    let f = interp.evaluate("(function (arg) { return arg * 100 })").unwrap();
    let result = interp.call(&f, &JsValue::Undefined, &[JsValue::Number(5.0)]).unwrap();
    assert_eq!(result, JsValue::Number(500.0));
}

#[test]
fn arrow_callbacks() {
    assert_eq!(run("[1, 2, 3, 10, 5].find(x => x == 10)"), json!(10));
    assert_eq!(eval("[1, 2, 3, 10, 5].find(x => x == 8)").unwrap(), JsValue::Undefined);
}

#[test]
fn parameters() {
    assert_eq!(run("function f(a, b = a + 1, ...rest) { return [a, b, rest] } f(1)"), json!([1, 2, []]));
    assert_eq!(run("function f(a, b = a + 1, ...rest) { return [a, b, rest] } f(1, 5, 6, 7)"), json!([1, 5, [6, 7]]));
    assert_eq!(run("function f({x, y: [z]}) { return x + z } f({x: 1, y: [2]})"), json!(3));
}

#[test]
fn arguments_object() {
    assert_eq!(run("function f() { return [arguments.length, arguments[1]] } f('a', 'b')"), json!([2, "b"]));
}

#[test]
fn closures_capture_mutable_scope() {
    assert_eq!(
        run("function counter() { var n = 0; return function() { return ++n } } var c = counter(); c(); c(); c()"),
        json!(3)
    );
}

#[test]
fn named_expression_binds_itself() {
    assert_eq!(run("var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1) }; fact(5)"), json!(120));
    assert_eq!(run("var g = function() {}; g.name"), json!("g"));
}

#[test]
fn arrows_capture_this() {
    assert_eq!(
        run("var o = { v: 7, get: function() { return (() => this.v)() } }; o.get()"),
        json!(7)
    );
    assert!(eval("var A = () => 1; new A()").is_err());
}

#[test]
fn call_apply_bind() {
    assert_eq!(
        run("function f(a, b) { return this.base + a + b } var o = {base: 1}; [f.call(o, 2, 3), f.apply(o, [2, 3]), f.bind(o, 2)(3)]"),
        json!([6, 6, 6])
    );
}

#[test]
fn to_string_returns_source_text() {
    assert_eq!(run("(function f(a) { return a }).toString()"), json!("function f(a) { return a }"));
}

#[test]
fn construct_from_the_host() {
    let bindings = JsObject::new();
    let mut interp = interpreter(&bindings);
    let ctor = interp.evaluate("(function Point(x) { this.x = x })").unwrap();
    let point = interp.construct(&ctor, &[JsValue::Number(3.0)]).unwrap();
    let JsValue::Object(point) = point else {
        panic!("expected an object");
    };
    assert_eq!(point.get("x"), JsValue::Number(3.0));
}

#[test]
fn call_depth_is_bounded() {
    let options = estreval::EvalOptions::default()
        .with_max_steps(1_000_000)
        .with_timeout(0)
        .with_max_call_depth(16);
    let err = estreval::evaluate("function down(n) { return down(n + 1) } down(0)", &JsObject::new(), options)
        .unwrap_err();
    assert!(err.to_string().contains("RangeError"), "{err}");
}

#[test]
fn unbounded_recursion_at_the_default_depth_is_a_range_error() {
    let options = estreval::EvalOptions::default()
        .with_max_steps(u64::MAX)
        .with_timeout(0);
    let max_depth = options.max_call_depth;
    let err = estreval::evaluate("function test() { test() }; test()", &JsObject::new(), options.clone())
        .unwrap_err();
    assert!(err.to_string().contains("Maximum call stack size exceeded"), "{err}");

    let code = format!("function down(n) {{ return n === 0 ? 0 : 1 + down(n - 1) }} down({})", max_depth - 1);
    let value = estreval::evaluate(&*code, &JsObject::new(), options).unwrap();
    assert_eq!(value, JsValue::from((max_depth - 1) as f64));
}

#[test]
fn nested_eval_chains_do_not_exhaust_the_host_stack() {
    let options = estreval::EvalOptions::default()
        .with_max_steps(u64::MAX)
        .with_timeout(0);
    let code = "function nest(n) { return n === 0 ? 1 : eval('nest(' + (n - 1) + ')') } nest(150)";
    let value = estreval::evaluate(code, &JsObject::new(), options).unwrap();
    assert_eq!(value, JsValue::from(1.0));
}
