mod common;

use common::{eval, failure, run};
use estreval::JsValue;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn direct_eval_sees_the_local_scope() {
    assert_eq!(run("(function(){ var a = 5; return eval('a + 1') })()"), json!(6));
    assert_eq!(run("(function(){ eval('var q = 1'); return q })()"), json!(1));
    assert_eq!(run("function f(){ var a = 1; return eval('a') } f()"), json!(1));
    assert_eq!(run("var o = {k: 2, m: function(){ return eval('this.k') }}; o.m()"), json!(2));
}

#[test]
fn rebound_eval_capability_runs_globally() {
    assert_eq!(
        run("var a = 'global'; (function(eval){ var a = 'local'; return eval('a') })(eval)"),
        json!("global")
    );
}

#[test]
fn indirect_eval_runs_globally() {
    assert_eq!(run("var a = 'global'; (function(){ var a = 'local'; return (0, eval)('a') })()"), json!("global"));
    assert_eq!(run("var e = eval; (function(){ var hidden = 1; return e('typeof hidden') })()"), json!("undefined"));
}

#[test]
fn eval_result_is_the_completion_value() {
    assert_eq!(run("eval('1; 2; if (true) { 3 }')"), json!(3));
    assert_eq!(eval("eval('')").unwrap(), JsValue::Undefined);
    assert_eq!(run("eval(42)"), json!(42));
    assert_eq!(run("var o = {k: 1}; eval(o) === o"), json!(true));
}

#[test]
fn eval_syntax_errors_are_catchable() {
    assert_eq!(run("try { eval('1 +') } catch (e) { e instanceof SyntaxError }"), json!(true));
}

#[test]
fn eval_is_not_a_constructor() {
    let message = failure("new eval('1')");
    assert!(message.starts_with("TypeError"), "{message}");
}

#[test]
fn function_constructor() {
    assert_eq!(run("new Function('a', 'b', 'return a * b')(3, 4)"), json!(12));
    assert_eq!(run("Function('return 7')()"), json!(7));
    assert_eq!(eval("Function('return this')()").unwrap(), JsValue::Undefined);
    assert_eq!(run("var x = 'global'; (function(){ var x = 'local'; return Function('return x')() })()"), json!("global"));
}

#[test]
fn nested_evaluations_keep_the_sandbox() {
    let message = failure("eval('Array.prototype.push = null')");
    assert!(message.contains("because it is a built-in object."), "{message}");
    assert!(eval("Function('return global')()").is_err());
}
