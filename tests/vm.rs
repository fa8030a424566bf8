use estreval::vm::{Script, Vm};
use estreval::{EvalOptions, JsObject, JsValue};
use pretty_assertions::assert_eq;

#[test]
fn run_in_context_updates_the_context() {
    let mut vm = Vm::new();
    let context = Vm::create_context();
    context.set("animal", "cat");
    context.set("count", 2.0);
    vm.run_in_context("count += 1; var name = 'kitty'", &context).unwrap();
    assert_eq!(context.get("count"), JsValue::Number(3.0));
    assert_eq!(context.get("name"), JsValue::from("kitty"));
    assert_eq!(context.get("animal"), JsValue::from("cat"));
}

#[test]
fn compile_function_resolves_free_names_in_context() {
    let mut vm = Vm::new();
    let context = JsObject::new();
    context.set("offset", 10.0);
    let f = vm.compile_function("return a + offset", &["a"], Some(&context)).unwrap();
    let value = vm.call(&f, &[JsValue::Number(5.0)]).unwrap();
    assert_eq!(value, JsValue::Number(15.0));
}

#[test]
fn create_function_without_parameters() {
    let mut vm = Vm::new();
    let f = vm.create_function(&["return 'ok'"]).unwrap();
    assert_eq!(vm.call(&f, &[]).unwrap(), JsValue::from("ok"));
}

#[test]
fn script_runs_against_many_contexts() {
    let mut vm = Vm::new();
    let script = Script::new("greeting + ', ' + who");
    let first = Vm::create_context();
    first.set("greeting", "hello");
    first.set("who", "world");
    let second = Vm::create_context();
    second.set("greeting", "bye");
    second.set("who", "moon");
    assert_eq!(script.run_in_context(&mut vm, &first).unwrap(), JsValue::from("hello, world"));
    assert_eq!(script.run_in_context(&mut vm, &second).unwrap(), JsValue::from("bye, moon"));
}

#[test]
fn vm_options_apply_to_every_call() {
    let mut vm = Vm::with_options(EvalOptions::default().with_max_steps(20));
    let err = vm.run_in_context("while (true) {}", &Vm::create_context()).unwrap_err();
    assert!(err.is_interrupt());
    let ok = vm.run_in_context("1 + 1", &Vm::create_context()).unwrap();
    assert_eq!(ok, JsValue::Number(2.0));
}
