use super::Interpreter;
use super::error::EvalError;
use crate::types::{JsString, JsValue};
use std::rc::Rc;

/// Executable form of one AST node, built once by the compiler.
pub type Closure = Rc<dyn Fn(&mut Interpreter) -> Result<Completion, EvalError>>;

/// Outcome of running a closure. Only `Value` and `Return` carry a value; the rest steer the
/// enclosing statements and never reach the caller of `evaluate`.
#[derive(Clone, Debug)]
pub enum Completion {
    Value(JsValue),
    /// The statement produced nothing (declarations, empty statements, loops that never ran).
    Empty,
    Return(JsValue),
    Break,
    Continue,
    BreakLabel(JsString),
    ContinueLabel(JsString),
    /// A `default:` case test, which matches only after every other case has failed.
    DefaultCase,
}

impl Completion {
    pub fn value(self) -> JsValue {
        match self {
            Completion::Value(v) | Completion::Return(v) => v,
            _ => JsValue::Undefined,
        }
    }

    /// Whether this completion stops a statement list.
    pub fn is_abrupt(&self) -> bool {
        matches!(
            self,
            Completion::Return(_)
                | Completion::Break
                | Completion::Continue
                | Completion::BreakLabel(_)
                | Completion::ContinueLabel(_)
        )
    }
}

impl From<JsValue> for Completion {
    fn from(v: JsValue) -> Self {
        Completion::Value(v)
    }
}
