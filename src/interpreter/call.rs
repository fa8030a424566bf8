use super::error::{ErrorType, EvalError, Message};
use super::scope::{Scope, ScopeKind, ScopeRef};
use super::signal::Completion;
use super::types::{
    Capability, ClassFunction, JsFunction, JsObject, ObjectData, PropertyKey, UserFunction,
};
use super::{Frame, Interpreter};
use crate::stack::ensure_sufficient_stack;
use crate::types::{JsString, JsValue};
use std::rc::Rc;

impl Interpreter {
    fn enter_call(&mut self, name: &JsString) -> Result<(), EvalError> {
        if self.depth >= self.options.max_call_depth {
            return Err(self.throw_error(ErrorType::RangeError, "Maximum call stack size exceeded"));
        }
        self.depth += 1;
        self.call_stack.push(name.clone());
        Ok(())
    }

    fn leave_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.call_stack.pop();
    }

    /// `this` of a native constructor invocation, when one is in progress.
    pub(crate) fn constructing_this(&self, this: &JsValue) -> Option<JsObject> {
        match (&self.new_target, this) {
            (Some(_), JsValue::Object(obj)) => Some(obj.clone()),
            _ => None,
        }
    }

    pub(crate) fn call_function(
        &mut self,
        func: &JsValue,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, EvalError> {
        let JsValue::Object(obj) = func else {
            return Err(self.throw_type_error(&format!("{func} is not a function")));
        };
        let callable = obj.borrow().callable.clone();
        let Some(callable) = callable else {
            return Err(self.throw_type_error(&format!("{func} is not a function")));
        };
        let saved_target = self.new_target.take();
        let result = match callable {
            JsFunction::Native(_, _, f, _) => f(self, this, args),
            JsFunction::User(user) => self.call_user(obj, &user, this, args),
            JsFunction::Class(class) => Err(self.throw_type_error(&format!(
                "Class constructor {} cannot be invoked without 'new'",
                class.name
            ))),
            JsFunction::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let all: Vec<JsValue> = bound_args.iter().chain(args).cloned().collect();
                self.call_function(&JsValue::Object(target), &bound_this, &all)
            }
            JsFunction::Capability(Capability::Eval) => {
                let scope = self.global_scope.clone();
                let context = JsValue::Object(self.bindings.clone());
                self.eval_code(args.first(), scope, context)
            }
            JsFunction::Capability(Capability::Function) => self.create_dynamic_function(args),
        };
        self.new_target = saved_target;
        result
    }

    pub(crate) fn call_user(
        &mut self,
        func_obj: &JsObject,
        func: &UserFunction,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, EvalError> {
        let template = &func.template;
        self.enter_call(&template.name)?;
        let scope = Scope::new(
            ScopeKind::Function,
            Some(func.scope.clone()),
            JsObject::from_data(ObjectData::new()),
        );
        scope.borrow_mut().declare_frame(&template.hoisted.lexical);
        let this_value = match &func.this_value {
            Some(captured) => captured.clone(),
            None if this.is_undefined() => self.options.global_context_in_function.clone(),
            None => this.clone(),
        };
        let saved = self.enter_frame(scope.clone(), this_value);
        let saved_target = self.new_target.take();
        let result =
            ensure_sufficient_stack(|| self.run_function_body(func_obj, func, &scope, args));
        self.new_target = saved_target;
        self.leave_frame(saved);
        self.leave_call();
        match result? {
            Completion::Return(v) => Ok(v),
            _ => Ok(JsValue::Undefined),
        }
    }

    fn run_function_body(
        &mut self,
        func_obj: &JsObject,
        func: &UserFunction,
        scope: &ScopeRef,
        args: &[JsValue],
    ) -> Result<Completion, EvalError> {
        let template = &func.template;
        let data = scope.borrow().data.clone();
        if template.self_binding && !template.name.is_empty() {
            data.borrow_mut()
                .insert_value(template.name.clone(), JsValue::Object(func_obj.clone()));
        }
        if !template.is_arrow && template.hoisted.uses_arguments {
            let arguments = self.create_arguments(args);
            data.borrow_mut()
                .insert_value("arguments", JsValue::Object(arguments));
        }
        for (i, (binder, rest)) in template.params.iter().enumerate() {
            let value = if *rest {
                self.create_array(args.get(i..).unwrap_or_default().to_vec())
            } else {
                args.get(i).cloned().unwrap_or(JsValue::Undefined)
            };
            binder(self, value)?;
        }
        self.instantiate_functions(&template.hoisted.funcs, scope);
        for name in &template.hoisted.vars {
            let key = PropertyKey::from(name.clone());
            if !data.has_own_property(&key) {
                data.borrow_mut().insert_value(name.clone(), JsValue::Undefined);
            }
        }
        (template.body)(self)
    }

    /// Binds each hoisted function declaration in `scope` to a function closing over it.
    pub(crate) fn instantiate_functions(
        &mut self,
        funcs: &[(JsString, Rc<super::types::FunctionTemplate>)],
        scope: &ScopeRef,
    ) {
        let data = scope.borrow().data.clone();
        for (name, template) in funcs {
            let func = self.create_function(JsFunction::User(Rc::new(UserFunction {
                template: template.clone(),
                scope: scope.clone(),
                this_value: None,
            })));
            data.borrow_mut()
                .insert_value(name.clone(), JsValue::Object(func));
        }
    }

    /// `[[Construct]]`: `new f(...args)`.
    pub(crate) fn construct_value(
        &mut self,
        func: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, EvalError> {
        let obj = match func {
            JsValue::Object(obj) if obj.is_constructor() => obj.clone(),
            _ => return Err(self.throw_type_error(&format!("{func} is not a constructor"))),
        };
        let callable = obj.borrow().callable.clone();
        match callable {
            Some(JsFunction::Bound {
                target,
                args: bound_args,
                ..
            }) => {
                let all: Vec<JsValue> = bound_args.iter().chain(args).cloned().collect();
                self.construct_value(&JsValue::Object(target), &all)
            }
            Some(JsFunction::Capability(_)) => self.create_dynamic_function(args),
            Some(JsFunction::Class(class)) => {
                let instance = self.instance_for(&obj);
                self.enter_call(&class.name)?;
                let result =
                    ensure_sufficient_stack(|| self.init_class_instance(&class, &instance, args));
                self.leave_call();
                result
            }
            Some(JsFunction::User(user)) => {
                let instance = self.instance_for(&obj);
                let result = self.call_user(&obj, &user, &JsValue::Object(instance.clone()), args)?;
                Ok(if result.is_object() { result } else { JsValue::Object(instance) })
            }
            Some(JsFunction::Native(_, _, f, _)) => {
                let instance = JsValue::Object(self.instance_for(&obj));
                let saved_target = self.new_target.replace(obj.clone());
                let result = f(self, &instance, args);
                self.new_target = saved_target;
                let result = result?;
                Ok(if result.is_object() { result } else { instance })
            }
            None => Err(self.throw_type_error(&format!("{func} is not a constructor"))),
        }
    }

    /// Fresh object whose prototype is `ctor.prototype`, or `Object.prototype` when that is not
    /// an object.
    fn instance_for(&self, ctor: &JsObject) -> JsObject {
        let proto = match ctor.borrow().get_property_value("prototype") {
            Some(JsValue::Object(p)) => p,
            _ => self.realm.object_prototype.clone(),
        };
        JsObject::from_data(ObjectData::with_proto(Some(proto)))
    }

    /// Runs class construction against an existing instance: inherited initialization, fields,
    /// then the constructor body.
    pub(crate) fn init_class_instance(
        &mut self,
        class: &ClassFunction,
        instance: &JsObject,
        args: &[JsValue],
    ) -> Result<JsValue, EvalError> {
        let this = JsValue::Object(instance.clone());
        if let Some(parent) = &class.parent
            && class.constructor.is_none()
        {
            self.run_parent_init(parent, &this, args)?;
        }
        let ordered = class
            .fields
            .iter()
            .filter(|f| f.is_arrow)
            .chain(class.fields.iter().filter(|f| !f.is_arrow));
        for field in ordered {
            let value = match &field.init {
                Some(init) => {
                    let saved = self.enter_frame(class.scope.clone(), this.clone());
                    let result = init(self);
                    self.leave_frame(saved);
                    result?.value()
                }
                None => JsValue::Undefined,
            };
            instance.borrow_mut().define_own_property(
                field.key.clone(),
                super::types::PropertyDescriptor::data_default(value),
            );
        }
        if let Some(ctor) = &class.constructor {
            let callable = ctor.borrow().callable.clone();
            if let Some(JsFunction::User(user)) = callable {
                let result = self.call_user(ctor, &user, &this, args)?;
                if result.is_object() {
                    return Ok(result);
                }
            }
        }
        Ok(this)
    }

    /// Superclass construction against the subclass instance `this`, for `super(...)` and
    /// implicit constructors.
    pub(crate) fn run_parent_init(
        &mut self,
        parent: &JsObject,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, EvalError> {
        let callable = parent.borrow().callable.clone();
        match callable {
            Some(JsFunction::Class(class)) => {
                let JsValue::Object(instance) = this else {
                    return Ok(JsValue::Undefined);
                };
                self.enter_call(&class.name)?;
                let result =
                    ensure_sufficient_stack(|| self.init_class_instance(&class, instance, args));
                self.leave_call();
                result
            }
            Some(JsFunction::User(user)) => self.call_user(parent, &user, this, args),
            Some(JsFunction::Native(_, _, f, true)) => {
                let saved_target = self.new_target.replace(parent.clone());
                let result = f(self, this, args);
                self.new_target = saved_target;
                result
            }
            Some(JsFunction::Bound {
                target,
                args: bound_args,
                ..
            }) => {
                let all: Vec<JsValue> = bound_args.iter().chain(args).cloned().collect();
                self.run_parent_init(&target, this, &all)
            }
            _ => Err(self.raise(
                Message::IsNotConstructor,
                &parent.borrow().callable.as_ref().map(|f| f.name()).unwrap_or_default(),
                self.last_position,
            )),
        }
    }

    /// Nested evaluation of `code` on this interpreter, sharing the current budget.
    pub(crate) fn eval_code(
        &mut self,
        code: Option<&JsValue>,
        scope: ScopeRef,
        context: JsValue,
    ) -> Result<JsValue, EvalError> {
        let source = match code {
            Some(JsValue::String(s)) => s.clone(),
            Some(other) => return Ok(other.clone()),
            None => return Ok(JsValue::Undefined),
        };
        if source.is_empty() {
            return Ok(JsValue::Undefined);
        }
        tracing::trace!(len = source.len(), "compiling nested eval");
        let program = self.compile_source(source.as_str())?;
        let saved = self.swap_frame(Frame {
            scope,
            context,
            value: JsValue::Undefined,
            call_stack: Vec::new(),
        });
        let result = ensure_sufficient_stack(|| self.execute(&program));
        self.swap_frame(saved);
        result
    }

    /// `Function(p1, ..., body)`: compiles a function expression against the global scope.
    pub(crate) fn create_dynamic_function(&mut self, args: &[JsValue]) -> Result<JsValue, EvalError> {
        let mut texts = Vec::with_capacity(args.len());
        for arg in args {
            texts.push(self.to_js_string(arg)?.to_string());
        }
        let body = texts.pop().unwrap_or_default();
        let code = format!("(function anonymous({}\n) {{\n{body}\n}});", texts.join(","));
        tracing::trace!(params = texts.len(), "compiling dynamic function");
        let scope = self.global_scope.clone();
        let context = JsValue::Object(self.bindings.clone());
        self.eval_code(Some(&JsValue::from(code)), scope, context)
    }
}
