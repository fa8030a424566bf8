use estreval::{Error, EvalOptions, JsObject, JsValue};
use pretty_assertions::assert_eq;

fn eval_with(code: &str, options: EvalOptions) -> Result<JsValue, Error> {
    estreval::evaluate(code, &JsObject::new(), options)
}

#[test]
fn step_limit_is_fatal() {
    let err = eval_with("var i = 0; while (true) { i++ }", EvalOptions::default().with_max_steps(50))
        .unwrap_err();
    match err {
        Error::Interrupt(e) => {
            assert_eq!(e.code, 3003);
            assert_eq!(e.message, "Script execution exceeded maximum of 50 steps");
        }
        other => panic!("expected an interrupt, got {other}"),
    }
}

#[test]
fn timeout_is_fatal() {
    let options = EvalOptions::default()
        .with_max_steps(u64::MAX)
        .with_timeout(20);
    let err = eval_with("for (;;) {}", options).unwrap_err();
    assert!(err.is_interrupt());
    assert_eq!(err.to_string(), "Error: Script execution timed out after 20ms");
}

#[test]
fn interrupts_skip_catch_and_finally() {
    let bindings = JsObject::new();
    let options = EvalOptions::default().with_max_steps(200);
    let result = estreval::evaluate(
        "var log = []; try { while (true) {} } catch (e) { log.push('catch') } finally { log.push('finally') }",
        &bindings,
        options,
    );
    assert!(result.unwrap_err().is_interrupt());
    let JsValue::Object(log) = bindings.get("log") else {
        panic!("log was not declared");
    };
    assert_eq!(log.get("length"), JsValue::Number(0.0));
}

#[test]
fn nested_eval_shares_the_budget() {
    let err = eval_with("eval('while (true) {}')", EvalOptions::default().with_max_steps(100))
        .unwrap_err();
    assert!(err.is_interrupt());
}

#[test]
fn budget_resets_between_evaluations() {
    let bindings = JsObject::new();
    let mut interp = estreval::Interpreter::with_options(
        &bindings,
        EvalOptions::default().with_max_steps(150).with_default_parser(),
    );
    for _ in 0..5 {
        let value = interp.evaluate("var s = 0; for (var i = 0; i < 3; i++) { s += i } s").unwrap();
        assert_eq!(value, JsValue::Number(3.0));
    }
}

#[test]
fn unknown_node_types_are_fatal() {
    let ast = estreval::Node::from_json(
        r#"{"type":"Program","body":[{"type":"ForOfStatement","left":{"type":"Identifier","name":"x"},"right":{"type":"ArrayExpression","elements":[]},"body":{"type":"EmptyStatement"}}]}"#,
    )
    .unwrap();
    let err = estreval::evaluate(ast, &JsObject::new(), EvalOptions::default()).unwrap_err();
    assert!(err.is_interrupt());
    assert!(err.to_string().contains("Unknown node type: ForOfStatement"), "{err}");
}

#[test]
fn messages_carry_positions() {
    let err = eval_with("var a = 1;\n  missing + a", EvalOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "ReferenceError: missing is not defined [2:2]");
}

#[test]
fn interpreters_need_a_parser_for_text() {
    let mut interp = estreval::Interpreter::new();
    let err = interp.evaluate("1 + 1").unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
    assert_eq!(err.to_string(), "Option \"parse\" is required");
}

#[test]
fn ecma_version_reaches_the_parser() {
    let err = eval_with("let a = 1", EvalOptions::default().with_ecma_version("5")).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err}");
    assert!(eval_with("var a = 1; a", EvalOptions::default().with_ecma_version("5")).is_ok());
}

#[test]
fn custom_parser_and_prebuilt_ast() {
    use estreval::{ParseError, ParseOptions};
    use std::rc::Rc;

    let parse = Rc::new(|text: &str, options: &ParseOptions| -> Result<estreval::Node, ParseError> {
        estreval::parse(&format!("({text}) * 2"), options)
    });
    let value = eval_with("21", EvalOptions::default().with_parser(parse)).unwrap();
    assert_eq!(value, JsValue::Number(42.0));

    let node = estreval::parse("6 * 7", &ParseOptions::default()).unwrap();
    let mut interp = estreval::Interpreter::new();
    assert_eq!(interp.evaluate_node(&node).unwrap(), JsValue::Number(42.0));
}

#[test]
fn nesting_is_bounded() {
    let deep = format!("{}1{}", "[".repeat(500), "]".repeat(500));
    let err = eval_with(&deep, EvalOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err}");

    let options = EvalOptions::default().with_max_steps(1_000_000);
    let sum = vec!["1"; 500].join(" + ");
    assert_eq!(eval_with(&sum, options.clone()).unwrap(), JsValue::Number(500.0));

    let long = vec!["1"; 1500].join(" + ");
    let err = eval_with(&long, options).unwrap_err();
    assert!(err.is_interrupt());
    assert!(err.to_string().contains("Program nesting exceeds 1024 levels"), "{err}");
}
