mod common;

use common::{eval, failure, interpreter, run};
use estreval::{JsObject, JsValue};
use pretty_assertions::assert_eq;
use serde_json::json;

const BUILT_IN: &str = "because it is a built-in object.";

#[test]
fn host_global_is_not_reachable() {
    let message = failure("global");
    assert!(message.starts_with("ReferenceError: global is not defined"), "{message}");
    assert!(eval("globalThis").is_err());
    assert_eq!(eval("(function(){ return this })()").unwrap(), JsValue::Undefined);
}

#[test]
fn proto_writes_on_plain_objects_are_ignored() {
    assert_eq!(
        run("var o = {}; var r = (o.__proto__ = { newProto: true }); [o.newProto === undefined, r.newProto]"),
        json!([true, true])
    );
    assert_eq!(run("var o = { __proto__: { hidden: 1 } }; o.hidden === undefined"), json!(true));
}

#[test]
fn host_objects_keep_their_prototype() {
    let proto = JsObject::new();
    let bindings = JsObject::new();
    bindings.set("x", proto.clone());
    interpreter(&bindings)
        .evaluate("x.__proto__ = { newProto: true }")
        .unwrap();
    assert_eq!(proto.get("newProto"), JsValue::Undefined);
    assert!(proto.prototype().is_none());
}

#[test]
fn string_prototype_is_protected() {
    let bindings = JsObject::new();
    let mut interp = interpreter(&bindings);
    let err = interp
        .evaluate(r#"String.prototype.makeLouder = function() { return this + "!" }; "test".makeLouder()"#)
        .unwrap_err();
    assert!(err.to_string().contains("Cannot modify prototype of 'String'"), "{err}");
    assert_eq!(interp.evaluate(r#"typeof "test".makeLouder"#).unwrap(), JsValue::from("undefined"));
}

#[test]
fn array_prototype_is_protected() {
    let bindings = JsObject::new();
    let mut interp = interpreter(&bindings);
    let err = interp
        .evaluate(r#"Array.prototype.map = function() { return "hi" }"#)
        .unwrap_err();
    assert!(err.to_string().contains(BUILT_IN), "{err}");
    let value = interp.evaluate("[1, 2].map(function(n) { return n + 1 }).join()").unwrap();
    assert_eq!(value, JsValue::from("2,3"));
}

#[test]
fn object_prototype_is_protected() {
    let message = failure(
        r#"Object.prototype.wibblify = function() { return "~" + this.value + "~" }; ({value: "test"}).wibblify()"#,
    );
    assert!(message.contains(BUILT_IN), "{message}");

    let message = failure(
        r#"({}).__proto__.wibblify = function() { return "~" + this.value + "~" }; ({value: "test"}).wibblify()"#,
    );
    assert!(message.contains("Cannot modify prototype of 'Object'"), "{message}");
}

#[test]
fn tampering_errors_are_catchable() {
    assert_eq!(
        run("var caught; try { Array.prototype.x = 1 } catch (e) { caught = e instanceof TypeError } caught"),
        json!(true)
    );
}

#[test]
fn other_writes_to_built_ins_fail() {
    for code in [
        "Math.PI = 3",
        "delete JSON.parse",
        "Object.defineProperty(Math, 'tau', { value: 6.28 })",
        "Object.assign(JSON, { extra: 1 })",
        "Object.setPrototypeOf(Math, null)",
        "Boolean.__proto__ = 'test'",
    ] {
        let message = failure(code);
        assert!(message.contains(BUILT_IN), "{code}: {message}");
    }
}

#[test]
fn function_constructor_does_not_leak_this() {
    assert_eq!(eval("[].slice.constructor('return this')()").unwrap(), JsValue::Undefined);
    assert_eq!(eval("[].slice.constructor.bind()('return this')()").unwrap(), JsValue::Undefined);
    assert_eq!(run("(function(){}).constructor === Function"), json!(true));
}

#[test]
fn error_constructor_chain_cannot_pollute() {
    let bindings = JsObject::new();
    let mut interp = interpreter(&bindings);
    let _ = interp.evaluate(
        "try{a[b];}catch(e){e.constructor.constructor('return __proto__.arguments.callee.__proto__.polluted=true')()};",
    );
    assert_eq!(interp.evaluate("typeof Function.polluted").unwrap(), JsValue::from("undefined"));
}

#[test]
fn runaway_code_is_stopped() {
    for code in [
        "function test() { test() }; test()",
        "for (;true;){}",
        "while (true){}",
    ] {
        assert!(eval(code).is_err(), "{code}");
    }
}

#[test]
fn each_interpreter_has_its_own_realm() {
    let mut first = interpreter(&JsObject::new());
    let mut second = interpreter(&JsObject::new());
    let a = first.evaluate("Object").unwrap();
    let b = second.evaluate("Object").unwrap();
    assert!(matches!((&a, &b), (JsValue::Object(x), JsValue::Object(y)) if !x.ptr_eq(y)));
}
