//! Intrinsic objects. Each submodule fills one part of the [`Realm`](super::sandbox::Realm) and
//! registers its globals; [`Interpreter::setup_globals`] runs them once per interpreter.

mod array;
mod collections;
mod date;
mod error;
mod function;
mod global;
pub(crate) mod json;
mod math;
mod number;
mod object;
pub(crate) mod regexp;
mod string;
mod symbol;

use super::Interpreter;
use super::error::EvalError;
use super::types::{JsFunction, JsObject, NativeFn, PropertyDescriptor};
use crate::types::JsValue;
use std::rc::Rc;

/// One entry of a method table: name, arity, body.
pub(crate) type Method = (&'static str, usize, NativeFn);

pub(crate) fn method<F>(name: &'static str, arity: usize, f: F) -> Method
where
    F: Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, EvalError> + 'static,
{
    (name, arity, Rc::new(f))
}

/// `args[i]`, or `undefined` past the end.
pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

/// Resolves a relative index argument (`slice`, `at`, ...) against `len`.
pub(crate) fn relative_index(n: f64, len: usize) -> usize {
    let len = len as f64;
    let idx = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    idx as usize
}

impl Interpreter {
    pub(crate) fn setup_globals(&mut self) {
        self.realm.define_global("undefined", JsValue::Undefined);
        self.realm.define_global("NaN", JsValue::Number(f64::NAN));
        self.realm.define_global("Infinity", JsValue::Number(f64::INFINITY));

        self.setup_object();
        self.setup_function();
        self.setup_array();
        self.setup_string();
        self.setup_number();
        self.setup_boolean();
        self.setup_symbol();
        self.setup_errors();
        self.setup_math();
        self.setup_json();
        self.setup_date();
        self.setup_regexp();
        self.setup_collections();
        self.setup_global_functions();

        let eval = JsValue::Object(self.realm.eval_function.clone());
        self.realm
            .eval_function
            .borrow_mut()
            .insert_property("name".into(), PropertyDescriptor::data(JsValue::from("eval"), false, false, true));
        self.realm.define_global("eval", eval);
        let function = self.realm.function_constructor.clone();
        function.borrow_mut().insert_property(
            "name".into(),
            PropertyDescriptor::data(JsValue::from("Function"), false, false, true),
        );
        function.borrow_mut().insert_property(
            "prototype".into(),
            PropertyDescriptor::data(
                JsValue::Object(self.realm.function_prototype.clone()),
                false,
                false,
                false,
            ),
        );
        self.realm.define_global("Function", JsValue::Object(function));
    }

    /// Installs each method of `table` on `target` as a non-enumerable property.
    pub(crate) fn install_methods(&self, target: &JsObject, table: Vec<Method>) {
        for (name, arity, f) in table {
            let func = self.create_function(JsFunction::Native(name.to_string(), arity, f, false));
            target
                .borrow_mut()
                .insert_builtin(name, JsValue::Object(func));
        }
    }

    /// Installs a non-enumerable accessor with only a getter.
    pub(crate) fn install_getter<F>(&self, target: &JsObject, name: &'static str, f: F)
    where
        F: Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, EvalError> + 'static,
    {
        let getter = self.create_function(JsFunction::native(&format!("get {name}"), 0, f));
        target.borrow_mut().insert_property(
            name.into(),
            PropertyDescriptor::accessor(Some(JsValue::Object(getter)), None, false),
        );
    }

    /// Read-only, non-enumerable, non-configurable value: `Math.PI`, `Number.EPSILON`, ...
    pub(crate) fn install_constant(&self, target: &JsObject, name: &str, value: JsValue) {
        target
            .borrow_mut()
            .insert_property(name.into(), PropertyDescriptor::data(value, false, false, false));
    }

    /// Creates a native constructor linked both ways with `prototype` and registers it as a
    /// global.
    pub(crate) fn install_constructor<F>(
        &mut self,
        name: &str,
        arity: usize,
        prototype: &JsObject,
        f: F,
    ) -> JsObject
    where
        F: Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, EvalError> + 'static,
    {
        let ctor = self.create_function(JsFunction::constructor(name, arity, f));
        ctor.borrow_mut().insert_property(
            "prototype".into(),
            PropertyDescriptor::data(JsValue::Object(prototype.clone()), false, false, false),
        );
        prototype
            .borrow_mut()
            .insert_builtin("constructor", JsValue::Object(ctor.clone()));
        self.realm.define_global(name, JsValue::Object(ctor.clone()));
        ctor
    }

    /// Namespace object such as `Math` or `JSON`, registered as a global.
    pub(crate) fn install_namespace(&mut self, name: &str, table: Vec<Method>) -> JsObject {
        let namespace = self.create_object();
        self.install_methods(&namespace, table);
        self.realm.define_global(name, JsValue::Object(namespace.clone()));
        namespace
    }

    /// Calls `callback(element, index, array)` the way array iteration methods do.
    pub(crate) fn call_callback(
        &mut self,
        callback: &JsValue,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, EvalError> {
        self.budget.charge()?;
        self.call_function(callback, this, args)
    }

    /// Checks `value` is callable, naming the method that wanted it otherwise.
    pub(crate) fn require_callable(&self, value: &JsValue, what: &str) -> Result<(), EvalError> {
        match value {
            JsValue::Object(o) if o.is_callable() => Ok(()),
            _ => Err(self.throw_type_error(&format!("{value} is not a function ({what})"))),
        }
    }
}
