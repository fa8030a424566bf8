#![allow(dead_code)]

use estreval::{Error, EvalOptions, Interpreter, JsObject, JsValue};
use serde_json::Value;

pub fn interpreter(bindings: &JsObject) -> Interpreter {
    Interpreter::with_options(bindings, EvalOptions::default().with_default_parser())
}

/// Evaluates `code` against fresh bindings and converts the result to JSON.
pub fn run(code: &str) -> Value {
    run_with(code, &JsObject::new())
}

pub fn run_with(code: &str, bindings: &JsObject) -> Value {
    let mut interp = interpreter(bindings);
    let value = interp
        .evaluate(code)
        .unwrap_or_else(|e| panic!("`{code}` failed: {e}"));
    interp.to_json(&value).unwrap()
}

pub fn eval(code: &str) -> Result<JsValue, Error> {
    estreval::evaluate(code, &JsObject::new(), EvalOptions::default())
}

/// Message of the error `code` fails with.
pub fn failure(code: &str) -> String {
    match eval(code) {
        Ok(value) => panic!("`{code}` returned {value:?}"),
        Err(e) => e.to_string(),
    }
}
