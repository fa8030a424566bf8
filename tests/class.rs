mod common;

use common::{eval, failure, interpreter, run};
use estreval::{JsObject, JsValue};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn class_declaration_yields_a_constructor() {
    let bindings = JsObject::new();
    let mut interp = interpreter(&bindings);
    let class = interp
        .evaluate("class C { x = 3; constructor() { this.y = 5 } add() { this.z = 7 } }")
        .unwrap();
    let JsValue::Object(ctor) = &class else {
        panic!("expected a class, got {class:?}");
    };
    assert!(ctor.is_callable());

    let instance = interp.construct(&class, &[]).unwrap();
    let JsValue::Object(obj) = &instance else {
        panic!("expected an instance, got {instance:?}");
    };
    assert_eq!(obj.get("x"), JsValue::Number(3.0));
    assert_eq!(obj.get("y"), JsValue::Number(5.0));

    let add = obj.get("add");
    interp.call(&add, &instance, &[]).unwrap();
    assert_eq!(obj.get("z"), JsValue::Number(7.0));
}

#[test]
fn fields_then_constructor_body() {
    assert_eq!(
        run("class C { x = 3; constructor(){ this.y = this.x + 2 } } var c = new C(); [c.x, c.y]"),
        json!([3, 5])
    );
}

#[test]
fn arrow_fields_bind_the_instance() {
    assert_eq!(
        run("class P { v = 2; f = () => this.v } var p = new P(); var f = p.f; f()"),
        json!(2)
    );
}

#[test]
fn inheritance_with_and_without_constructor() {
    assert_eq!(
        run("class A { constructor(){ this.a = 1 } twice(){ return this.a * 2 } } class B extends A { b = 2 } var b = new B(); [b.a, b.b, b.twice(), b instanceof A]"),
        json!([1, 2, 2, true])
    );
    assert_eq!(
        run("class A { constructor(n){ this.n = n } } class B extends A { constructor(n){ super(n + 1) } } var b = new B(1); b.n"),
        json!(2)
    );
}

#[test]
fn static_members_live_on_the_class() {
    assert_eq!(
        run("class K { static count = 4; static make(){ return new K() } } [K.count, K.make() instanceof K]"),
        json!([4, true])
    );
}

#[test]
fn methods_are_not_enumerable() {
    assert_eq!(
        run("class M { run(){} } var m = new M(); var keys = []; for (var k in m) keys.push(k); keys"),
        json!([])
    );
}

#[test]
fn computed_member_names() {
    assert_eq!(run("var name = 'greet'; class G { [name](){ return 'hi' } } new G().greet()"), json!("hi"));
}

#[test]
fn calling_a_class_without_new_fails() {
    let message = failure("class C {} C()");
    assert!(message.starts_with("TypeError"), "{message}");
}

#[test]
fn class_accessors_are_rejected() {
    assert!(eval("class G { get x(){ return 1 } } new G().x").is_err());
}

#[test]
fn class_expressions() {
    assert_eq!(run("var Point = class { constructor(x){ this.x = x } }; new Point(4).x"), json!(4));
}
