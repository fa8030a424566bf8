use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::types::JsFunction;
use crate::types::JsValue;

impl Interpreter {
    pub(crate) fn setup_function(&mut self) {
        let proto = self.realm.function_prototype.clone();
        self.install_methods(
            &proto,
            vec![
                method("call", 1, |interp, this, args| {
                    let receiver = arg(args, 0);
                    interp.call_function(this, &receiver, args.get(1..).unwrap_or_default())
                }),
                method("apply", 2, |interp, this, args| {
                    let receiver = arg(args, 0);
                    let list = match arg(args, 1) {
                        JsValue::Undefined | JsValue::Null => Vec::new(),
                        list @ JsValue::Object(_) => interp.array_like_to_vec(&list)?,
                        _ => {
                            return Err(interp.throw_type_error(
                                "CreateListFromArrayLike called on non-object",
                            ));
                        }
                    };
                    interp.call_function(this, &receiver, &list)
                }),
                method("bind", 1, |interp, this, args| {
                    let target = match this {
                        JsValue::Object(obj) if obj.is_callable() => obj.clone(),
                        _ => return Err(interp.throw_type_error("Bind must be called on a function")),
                    };
                    let bound = JsFunction::Bound {
                        target,
                        this: arg(args, 0),
                        args: args.get(1..).unwrap_or_default().to_vec(),
                    };
                    Ok(JsValue::Object(interp.create_function(bound)))
                }),
                method("toString", 0, |interp, this, _| {
                    let source = match this {
                        JsValue::Object(obj) => obj.borrow().callable.as_ref().map(JsFunction::source_text),
                        _ => None,
                    };
                    source.map(JsValue::from).ok_or_else(|| {
                        interp.throw_type_error(
                            "Function.prototype.toString requires that 'this' be a Function",
                        )
                    })
                }),
            ],
        );
        proto.borrow_mut().insert_builtin(
            "constructor",
            JsValue::Object(self.realm.function_constructor.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{EvalOptions, Interpreter};
    use crate::types::{JsObject, JsValue};

    fn eval(src: &str) -> JsValue {
        let mut interp = Interpreter::with_options(
            &JsObject::new(),
            EvalOptions::default().with_default_parser().with_max_steps(100_000),
        );
        interp.evaluate(src).unwrap()
    }

    #[test]
    fn call_apply_bind() {
        let v = eval(
            "function f(a, b) { return this.x + a + b; } var o = {x: 1}; \
             [f.call(o, 2, 3), f.apply(o, [2, 3]), f.bind(o, 2)(3)].join()",
        );
        assert_eq!(v.to_string(), "6,6,6");
    }

    #[test]
    fn bound_functions_are_named_and_sized() {
        let v = eval("function add(a, b, c) {} var b = add.bind(null, 1); b.name + ':' + b.length");
        assert_eq!(v.to_string(), "bound add:2");
    }

    #[test]
    fn to_string_returns_source_text() {
        let v = eval("var sq = x => x * x; sq.toString()");
        assert_eq!(v.to_string(), "x => x * x");
        let v = eval("Math.max.toString()");
        assert_eq!(v.to_string(), "function max() { [native code] }");
    }
}
