//! Sandboxed tree-walking evaluator for ESTree programs.
//!
//! ```
//! use estreval::{EvalOptions, JsObject, JsValue};
//!
//! let bindings = JsObject::new();
//! bindings.set("x", 20.0);
//! let value = estreval::evaluate("x + 22", &bindings, EvalOptions::default()).unwrap();
//! assert_eq!(value, JsValue::Number(42.0));
//! ```

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
mod stack;
pub mod types;
pub mod vm;

pub use ast::Node;
pub use interpreter::{Error, EvalOptions, Interpreter, InterruptError, JsObject, Program, Source};
pub use parser::{ParseError, ParseOptions, parse};
pub use types::{JsString, JsValue};

/// Evaluates one program against `bindings` on a fresh interpreter. Source text goes through the
/// built-in parser unless `options` names another one.
pub fn evaluate(source: impl Into<Source>, bindings: &JsObject, options: EvalOptions) -> Result<JsValue, Error> {
    Interpreter::with_options(bindings, options.with_default_parser()).evaluate(source)
}
