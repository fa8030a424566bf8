//! A `vm`-style front end: one [`Interpreter`] is created lazily and rebound to the context
//! object of every call, so the built-in registry is built once.

use crate::interpreter::{Error, EvalOptions, Interpreter, JsObject, ObjectData, Source};
use crate::types::JsValue;

pub struct Vm {
    interpreter: Option<Interpreter>,
    options: EvalOptions,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_options(EvalOptions::default())
    }

    /// Options applied to every call; the built-in parser fills in when none is set.
    pub fn with_options(options: EvalOptions) -> Self {
        Self {
            interpreter: None,
            options: options.with_default_parser(),
        }
    }

    /// An empty context object with no prototype.
    pub fn create_context() -> JsObject {
        JsObject::from_data(ObjectData::with_proto(None))
    }

    fn rebind(&mut self, context: &JsObject) -> &mut Interpreter {
        let interp = self.interpreter.get_or_insert_with(Interpreter::new);
        interp.reset(context, self.options.clone());
        interp
    }

    /// Runs `code` with `context` as the global bindings.
    pub fn run_in_context(&mut self, code: impl Into<Source>, context: &JsObject) -> Result<JsValue, Error> {
        self.rebind(context).evaluate(code)
    }

    /// Compiles `code` as the body of a function taking `params`. Free names resolve against
    /// `context`, or an empty object.
    pub fn compile_function(
        &mut self,
        code: &str,
        params: &[&str],
        context: Option<&JsObject>,
    ) -> Result<JsValue, Error> {
        let wrapped = format!("(function anonymous({}){{ {code} }});", params.join(","));
        let context = context.cloned().unwrap_or_default();
        self.rebind(&context).evaluate(wrapped)
    }

    /// `create_function(&["a", "b", "return a + b"])`: the last argument is the body.
    pub fn create_function(&mut self, args: &[&str]) -> Result<JsValue, Error> {
        match args.split_last() {
            Some((code, params)) => self.compile_function(code, params, None),
            None => self.compile_function("", &[], None),
        }
    }

    /// Calls a function produced by this vm, with a fresh budget.
    pub fn call(&mut self, func: &JsValue, args: &[JsValue]) -> Result<JsValue, Error> {
        self.interpreter
            .get_or_insert_with(Interpreter::new)
            .call(func, &JsValue::Undefined, args)
    }
}

/// Code kept for running against different contexts.
#[derive(Debug, Clone)]
pub struct Script {
    source: Source,
}

impl Script {
    pub fn new(code: impl Into<Source>) -> Self {
        Self { source: code.into() }
    }

    pub fn run_in_context(&self, vm: &mut Vm, context: &JsObject) -> Result<JsValue, Error> {
        vm.run_in_context(self.source.clone(), context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn contexts_do_not_leak() {
        let mut vm = Vm::new();
        let a = JsObject::new();
        vm.run_in_context("var leaked = 1", &a).unwrap();
        let b = JsObject::new();
        let value = vm.run_in_context("typeof leaked", &b).unwrap();
        assert_eq!(value, JsValue::from("undefined"));
        assert_eq!(a.get("leaked"), JsValue::Number(1.0));
    }

    #[test]
    fn compiled_functions_are_callable() {
        let mut vm = Vm::new();
        let add = vm.create_function(&["a", "b", "return a + b"]).unwrap();
        let sum = vm.call(&add, &[JsValue::Number(2.0), JsValue::Number(3.0)]).unwrap();
        assert_eq!(sum, JsValue::Number(5.0));
    }

    #[test]
    fn scripts_rerun_against_new_contexts() {
        let mut vm = Vm::new();
        let script = Script::new("n * 2");
        for n in [1.0, 4.0] {
            let context = Vm::create_context();
            context.set("n", n);
            assert_eq!(script.run_in_context(&mut vm, &context).unwrap(), JsValue::Number(n * 2.0));
        }
    }
}
