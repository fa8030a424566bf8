mod common;

use common::{eval, failure, interpreter, run, run_with};
use estreval::{JsObject, JsValue};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn arithmetic_and_completion_value() {
    assert_eq!(run("1+2+3+4/2*100"), json!(206));
    assert_eq!(run("1+2+3+4/2*100;123"), json!(123));
    assert_eq!(run("var k = 3;k+10"), json!(13));
}

#[test]
fn declarations_alone_produce_undefined() {
    assert_eq!(eval("var a = 1").unwrap(), JsValue::Undefined);
    assert_eq!(eval("function f() {}").unwrap(), JsValue::Undefined);
    assert_eq!(eval("1; var b = 2").unwrap(), JsValue::Number(1.0));
}

#[test]
fn conditionals_read_bindings() {
    let bindings = JsObject::new();
    bindings.set("x", 3.0);
    assert_eq!(
        run_with(r#"if (x == 3) { "cats" } else { "dogs" }"#, &bindings),
        json!("cats")
    );
    assert_eq!(run_with(r#"x == 3 ? "cats" : "dogs""#, &bindings), json!("cats"));
}

#[test]
fn writes_land_on_the_bindings_object() {
    let bindings = JsObject::new();
    let inner = JsObject::new();
    inner.set("val", 10.0);
    bindings.set("x", 3.0);
    bindings.set("o", inner.clone());
    let mut interp = interpreter(&bindings);
    interp
        .evaluate(r#"var key = "val"; x = 4 * 4; o[key] = 20"#)
        .unwrap();
    assert_eq!(bindings.get("x"), JsValue::Number(16.0));
    assert_eq!(inner.get("val"), JsValue::Number(20.0));
    assert_eq!(bindings.get("key"), JsValue::from("val"));
}

#[test]
fn json_and_object_results() {
    assert_eq!(run("JSON.stringify({test: 123})"), json!(r#"{"test":123}"#));
    assert_eq!(run(r#"x = {"test": 1}"#), json!({"test": 1}));
    assert_eq!(run(r#"x = {"test": -1}"#), json!({"test": -1}));
}

#[test]
fn undefined_names_throw() {
    let message = failure("y.u.no.error");
    assert!(message.starts_with("ReferenceError: y is not defined"), "{message}");
}

#[test]
fn functions_and_this() {
    assert_eq!(
        run("[1,2,3,4].map(function(item){ return item*100 })"),
        json!([100, 200, 300, 400])
    );
    assert_eq!(run("function test(arg){ return arg }; test(123)"), json!(123));
    assert_eq!(run("var test = (arg) => { return arg }; test(123)"), json!(123));
    assert_eq!(run(r#"o = {f: function(){return this}, v: "test"}; o.f()===o"#), json!(true));
    assert_eq!(run(r#"f = function(){return this.toString()}; f.apply("test")"#), json!("test"));
}

#[test]
fn top_level_this_is_the_bindings_object() {
    let bindings = JsObject::new();
    let value = interpreter(&bindings).evaluate("this").unwrap();
    match value {
        JsValue::Object(obj) => assert!(obj.ptr_eq(&bindings)),
        other => panic!("expected an object, got {other:?}"),
    }
}

#[test]
fn compound_and_update_operators() {
    assert_eq!(run("var a = 1; a += 1; a"), json!(2));
    assert_eq!(run("var a = 1; a -= 1"), json!(0));
    assert_eq!(run("var a = 1; a++"), json!(1));
    assert_eq!(run("var a = 1; a++; a"), json!(2));
    assert_eq!(run("var a = 1; a--; a"), json!(0));
    assert_eq!(run("var a = null; a ??= 5; a ||= 7; a &&= a * 2"), json!(10));
    assert_eq!(run("var o = {n: 2}; o.n **= 3; o.n"), json!(8));
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(run("123 && 456"), json!(456));
    assert_eq!(run("0 || 456"), json!(456));
    assert_eq!(run("null ?? 'fallback'"), json!("fallback"));
    assert_eq!(
        run("var result = false; function fail(){ result = true } result && fail(); result"),
        json!(false)
    );
    assert_eq!(
        run("var result = true; function fail(){ result = false } result || fail(); result"),
        json!(true)
    );
}

#[test]
fn typeof_and_instanceof() {
    assert_eq!(run(r#"typeof "text""#), json!("string"));
    assert_eq!(run("var obj = {}; obj instanceof Object"), json!(true));
    assert_eq!(run("typeof notDeclared"), json!("undefined"));
}

#[test]
fn loops() {
    let expected = json!([100, 200, 300, 400]);
    assert_eq!(
        run("var items = [1,2,3,4]; var result = []; for (var i=0;i<items.length;i++){ result.push(items[i]*100) } result"),
        expected
    );
    assert_eq!(
        run("var items = [1,2,3,4]; var result = []; var i; for (i in items){ result.push(items[i]*100) } result"),
        expected
    );
    assert_eq!(
        run("var items = [1,2,3,4]; var result = []; var i=0; while (i<items.length){ result.push(items[i]*100) ;i++ } result"),
        expected
    );
    assert_eq!(run("var n = 0; do { n++ } while (n < 3); n"), json!(3));
}

#[test]
fn callbacks_share_and_shadow_outer_scope() {
    assert_eq!(
        run("var result = 0; [1,2,3,4].forEach(function(item){ result += item }); result"),
        json!(10)
    );
    assert_eq!(
        run("var result = 0; [1,2,3,4].forEach(function(item){ var result = 100 }); result"),
        json!(0)
    );
}

#[test]
fn hoisting() {
    assert!(eval(r#"func("test"); function func(arg){ return arg }"#).is_ok());
    assert_eq!(
        eval("var i = 123; (function(){ var result = i; var i; return result })()").unwrap(),
        JsValue::Undefined
    );
    assert_eq!(run("var i = 123; (function(){ i = 456; var i; })(); i"), json!(123));
}

#[test]
fn early_return_break_and_continue() {
    assert_eq!(run(r#"(function(x){ return "test"; return "dogs" })()"#), json!("test"));
    assert_eq!(
        run("var result = []; for (var i=0;i<5;i++){ if (i === 2){ continue } result.push(i) }; result"),
        json!([0, 1, 3, 4])
    );
    assert_eq!(
        run("var result = []; for (var i=0;i<5;i++){ if (i === 3){ break } result.push(i) }; result"),
        json!([0, 1, 2])
    );
}

#[test]
fn labeled_continue_targets_the_outer_loop() {
    assert_eq!(
        run("var r=[]; outer: for(var i=0;i<3;i++){ for(var j=0;j<3;j++){ if(j===1) continue outer; r.push([i,j]) } } r"),
        json!([[0, 0], [1, 0], [2, 0]])
    );
    assert_eq!(run("var n = 0; block: { n = 1; break block; n = 2 } n"), json!(1));
}

#[test]
fn wrapper_objects_keep_their_properties() {
    assert_eq!(
        run(r#"var s = new String("test1"); s.prop = "test2"; [s.toString(), s.prop, s instanceof String]"#),
        json!(["test1", "test2", true])
    );
}

#[test]
fn let_and_const_scoping() {
    assert_eq!(run("var x = 1; if (true) { let x = 3 }; x"), json!(1));
    assert_eq!(run("var x = 0; for (let x=1;x<2;x++){ let x=100 }; x"), json!(0));
    assert_eq!(run("var x = 0; for (var x=1;x<2;x++){ let x=100 }; x"), json!(2));
    assert_eq!(run("var x = 0, k; for (let x=1;x<2;x++){ k=100+x }; k"), json!(101));
    assert_eq!(run("var x = 1; if (true) { const x = 3 }; x"), json!(1));
    assert_eq!(run("const x = 2; x"), json!(2));
}

#[test]
fn const_reassignment_fails() {
    let message = failure("const x = 1; x = 3");
    assert!(message.contains("Cannot assign to 'x' because it is a constant."), "{message}");
    assert!(eval("const x = 1; x += 1").is_err());
}

#[test]
fn temporal_dead_zone() {
    let message = failure("let x = 1; { x; let x = 2; }");
    assert!(message.contains("Cannot access 'x' before initialization"), "{message}");
}

#[test]
fn redeclaring_a_lexical_name_with_var_fails() {
    let message = failure("{ let a = 1; var a = 2 }");
    assert!(message.contains("Cannot redeclare block-scoped variable 'a'"), "{message}");
}

#[test]
fn try_catch_finally() {
    assert_eq!(
        run("var error; try{ __fail__.fail__() } catch(e) { error = e }; error instanceof ReferenceError"),
        json!(true)
    );
    assert!(eval("var error; try{ __fail__.fail__() } catch(e) { error = e }; e").is_err());
    assert_eq!(
        run("var log = []; function f(){ try { return 1 } finally { log.push('f') } } [f(), log]"),
        json!([1, ["f"]])
    );
    assert_eq!(run("(function(){ try { throw 1 } catch (e) { return 2 } finally { return 3 } })()"), json!(3));
    assert_eq!(run("try { throw {code: 7} } catch ({code}) { code }"), json!(7));
}

#[test]
fn uncaught_values_surface_to_the_host() {
    let err = eval("throw 'boom'").unwrap_err();
    assert_eq!(err.value(), Some(&JsValue::from("boom")));
    assert_eq!(err.to_string(), "boom");

    let message = failure("throw new TypeError('bad')");
    assert_eq!(message, "TypeError: bad");
}

#[test]
fn switch_falls_through() {
    let code = r#"var r = []; switch (x) { case 1: r.push(1); break; case 2: r.push(2); case 3: r.push(3); break; default: r.push("default") } r"#;
    let cases = [
        (1.0, json!([1])),
        (2.0, json!([2, 3])),
        (3.0, json!([3])),
        (4.0, json!(["default"])),
    ];
    for (x, expected) in cases {
        let bindings = JsObject::new();
        bindings.set("x", x);
        assert_eq!(run_with(code, &bindings), expected);
    }
    assert_eq!(
        run("function x(y) { switch(y) { case 1: return 1; case 2: return 2} } x(1)"),
        json!(1)
    );
    assert_eq!(
        run("var r = []; switch (9) { default: r.push('d'); case 1: r.push(1) } r"),
        json!(["d", 1])
    );
}

#[test]
fn spread() {
    assert_eq!(run("x = [1, 2]; y = [3, 4]; z = [...x, ...y]"), json!([1, 2, 3, 4]));
    assert_eq!(
        run("x = { a: 1, b: 2 }; y = { c: 3, d: 4 }; z = { ...x, ...y }"),
        json!({"a": 1, "b": 2, "c": 3, "d": 4})
    );
    assert_eq!(run("((x, ...args) => [x, ...args])(1,2,3,4)"), json!([1, 2, 3, 4]));
    assert_eq!(run("Math.max(...[3, 9, 4])"), json!(9));
}

#[test]
fn destructuring() {
    assert_eq!(run("var {a, b: [c, d = 4], ...rest} = {a: 1, b: [3], e: 5, f: 6}; [a, c, d, rest]"),
        json!([1, 3, 4, {"e": 5, "f": 6}]));
    assert_eq!(run("var a = 1, b = 2; [a, b] = [b, a]; [a, b]"), json!([2, 1]));
    assert_eq!(run("let [first, ...others] = 'abc'.split(''); others"), json!(["b", "c"]));
}

#[test]
fn optional_chaining() {
    assert_eq!(run("var o = {a: {b: 1}}; [o?.a?.b, o.x?.y, o.f?.()]"), json!([1, null, null]));
    assert_eq!(eval("var o = null; o?.a.b.c").unwrap(), JsValue::Undefined);
}

#[test]
fn object_accessors() {
    assert_eq!(
        run("var o = { v: 1, get double() { return this.v * 2 }, set double(n) { this.v = n / 2 } }; o.double = 10; [o.v, o.double]"),
        json!([5, 10])
    );
}

#[test]
fn with_statement_uses_the_object_as_scope() {
    assert_eq!(run("var o = {a: 1}; with (o) { a = 2 } o.a"), json!(2));
}

#[test]
fn interpreter_reset_reuses_the_registry() {
    let first = JsObject::new();
    let mut interp = interpreter(&first);
    interp.evaluate("var seen = 1").unwrap();
    let second = JsObject::new();
    let options = interp.options().clone();
    interp.reset(&second, options);
    assert_eq!(interp.evaluate("typeof seen").unwrap(), JsValue::from("undefined"));
    assert_eq!(interp.evaluate("[1, 2].join('-')").unwrap(), JsValue::from("1-2"));
}

#[test]
fn same_ast_evaluated_twice_leaks_nothing() {
    let ast = estreval::parse("var count = (typeof count === 'number' ? count : 0) + 1; count", &Default::default())
        .unwrap();
    for _ in 0..2 {
        let bindings = JsObject::new();
        let value = interpreter(&bindings).evaluate(ast.clone()).unwrap();
        assert_eq!(value, JsValue::Number(1.0));
    }
}

#[test]
fn root_context_is_visible_but_not_written() {
    let root = JsObject::new();
    root.set("shared", 5.0);
    let options = estreval::EvalOptions::default().with_root_context(root.clone());
    let bindings = JsObject::new();
    let value = estreval::evaluate("shared + 1", &bindings, options).unwrap();
    assert_eq!(value, JsValue::Number(6.0));
    assert_eq!(root.get("shared"), JsValue::Number(5.0));
}

#[test]
fn this_of_a_bare_call_is_configurable() {
    let receiver = JsObject::new();
    receiver.set("tag", "host");
    let options = estreval::EvalOptions::default()
        .with_global_context_in_function(JsValue::Object(receiver));
    let value = estreval::evaluate("(function(){ return this.tag })()", &JsObject::new(), options)
        .unwrap();
    assert_eq!(value, JsValue::from("host"));
    assert_eq!(eval("(function(){ return this })()").unwrap(), JsValue::Undefined);
}
