use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::EvalError;
use crate::interpreter::sandbox::ERROR_TYPES;
use crate::interpreter::types::{JsObject, ObjectData, PropertyKey};
use crate::types::JsValue;

impl Interpreter {
    pub(crate) fn setup_errors(&mut self) {
        let mut base: Option<JsObject> = None;
        for kind in ERROR_TYPES {
            let proto = self.realm.error_prototype_for(kind);
            {
                let mut data = proto.borrow_mut();
                data.insert_builtin("name", JsValue::from(kind));
                data.insert_builtin("message", JsValue::from(""));
            }
            let ctor = self.install_constructor(kind, 1, &proto, move |interp, this, args| {
                interp.construct_error(kind, this, args)
            });
            match &base {
                None => {
                    self.install_methods(
                        &proto,
                        vec![method("toString", 0, |interp, this, _| interp.error_to_string(this))],
                    );
                    base = Some(ctor);
                }
                Some(error_ctor) => ctor.borrow_mut().prototype = Some(error_ctor.clone()),
            }
        }
    }

    /// Body shared by the error constructors; works with and without `new`.
    fn construct_error(
        &mut self,
        kind: &str,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, EvalError> {
        let instance = self.constructing_this(this).unwrap_or_else(|| {
            JsObject::from_data(ObjectData::with_proto(Some(self.realm.error_prototype_for(kind))))
        });
        instance.borrow_mut().class_name = "Error".to_string();
        let message = arg(args, 0);
        if !message.is_undefined() {
            let text = self.to_js_string(&message)?;
            instance.borrow_mut().insert_builtin("message", JsValue::String(text));
        }
        let options = arg(args, 1);
        if let JsValue::Object(opts) = &options
            && opts.has_property(&PropertyKey::from("cause"))
        {
            let cause = self.get_named(&options, "cause")?;
            instance.borrow_mut().insert_builtin("cause", cause);
        }
        let value = JsValue::Object(instance.clone());
        let mut stack = self.error_to_string(&value)?.to_string();
        for frame in self.call_stack.iter().rev() {
            let name = if frame.is_empty() { "<anonymous>" } else { frame.as_str() };
            stack.push_str(&format!("\n    at {name}"));
        }
        instance.borrow_mut().insert_builtin("stack", JsValue::from(stack));
        Ok(value)
    }

    fn error_to_string(&mut self, this: &JsValue) -> Result<JsValue, EvalError> {
        if !this.is_object() {
            return Err(self.throw_type_error(
                "Error.prototype.toString requires that 'this' be an Object",
            ));
        }
        let name = match self.get_named(this, "name")? {
            JsValue::Undefined => "Error".into(),
            n => self.to_js_string(&n)?,
        };
        let message = match self.get_named(this, "message")? {
            JsValue::Undefined => "".into(),
            m => self.to_js_string(&m)?,
        };
        Ok(JsValue::from(match (name.is_empty(), message.is_empty()) {
            (_, true) => name.to_string(),
            (true, false) => message.to_string(),
            (false, false) => format!("{name}: {message}"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{EvalOptions, Interpreter};
    use crate::types::JsObject;
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> String {
        let mut interp = Interpreter::with_options(
            &JsObject::new(),
            EvalOptions::default().with_default_parser().with_max_steps(100_000),
        );
        interp.evaluate(src).unwrap().to_string()
    }

    #[test]
    fn constructors_with_and_without_new() {
        assert_eq!(eval("String(new TypeError('bad'))"), "TypeError: bad");
        assert_eq!(eval("String(RangeError('r'))"), "RangeError: r");
        assert_eq!(eval("String(new Error())"), "Error");
    }

    #[test]
    fn subtypes_inherit_from_error() {
        assert_eq!(
            eval("var e = new SyntaxError('s'); (e instanceof SyntaxError) + ',' + (e instanceof Error)"),
            "true,true"
        );
    }

    #[test]
    fn cause_and_stack() {
        assert_eq!(eval("new Error('x', { cause: 42 }).cause"), "42");
        assert_eq!(
            eval("function thrower() { return new Error('boom') } thrower().stack"),
            "Error: boom\n    at thrower"
        );
    }

    #[test]
    fn subclassing_error() {
        assert_eq!(
            eval(
                "class AppError extends Error { constructor(m) { super(m); this.name = 'AppError' } } \
                 var e = new AppError('oops'); e.toString() + ' ' + (e instanceof Error)"
            ),
            "AppError: oops true"
        );
    }

    #[test]
    fn runtime_errors_are_error_instances() {
        assert_eq!(
            eval("try { undefinedThing } catch (e) { (e instanceof ReferenceError) + ' ' + e.name }"),
            "true ReferenceError"
        );
    }
}
