use super::{BindTarget, CResult, Compiler, KeyFn, closure};
use crate::ast::{
    AssignmentOperator, BinaryOperator, LogicalOperator, Node, NodeKind, Position, PropertyKind,
    UnaryOperator, UpdateOperator,
};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{CompileError, EvalError, Message};
use crate::interpreter::helpers::{to_boolean, typeof_value};
use crate::interpreter::scope::ScopeKind;
use crate::interpreter::signal::{Closure, Completion};
use crate::interpreter::types::{Capability, JsFunction, PropertyDescriptor, PropertyKey};
use crate::types::{JsString, JsValue, number_ops};
use std::rc::Rc;

/// One link of a member/call chain: `(this, value)`, or `None` once an optional link has
/// short-circuited the rest of the chain.
type ChainFn = Rc<dyn Fn(&mut Interpreter) -> Result<Option<(JsValue, JsValue)>, EvalError>>;

fn chain_fn<F>(f: F) -> ChainFn
where
    F: Fn(&mut Interpreter) -> Result<Option<(JsValue, JsValue)>, EvalError> + 'static,
{
    Rc::new(f)
}

/// Compiled call arguments; the flag marks spread elements.
type Arguments = Rc<[(Closure, bool)]>;

enum ObjectPart {
    Value(KeyFn, Closure),
    Getter(KeyFn, Closure),
    Setter(KeyFn, Closure),
    Spread(Closure),
    Ignored(Closure),
}

pub(crate) fn eval_arguments(
    interp: &mut Interpreter,
    args: &[(Closure, bool)],
) -> Result<Vec<JsValue>, EvalError> {
    let mut values = Vec::with_capacity(args.len());
    for (arg, spread) in args {
        let value = arg(interp)?.value();
        if *spread {
            values.extend(interp.iterate_to_vec(&value, &value.to_string())?);
        } else {
            values.push(value);
        }
    }
    Ok(values)
}

impl Interpreter {
    /// Member read with the sandbox rules for `prototype` and `__proto__`.
    pub(crate) fn get_member(
        &mut self,
        object: &JsValue,
        key: &PropertyKey,
        pos: Option<Position>,
    ) -> Result<JsValue, EvalError> {
        let proto_key = key.is("prototype") || key.is("__proto__");
        if proto_key
            && let JsValue::Object(obj) = object
            && let Some(name) = self.realm.protected_name(obj)
        {
            return Err(self.raise(Message::BuiltInPrototypeChange, name, pos));
        }
        if key.is("__proto__") {
            return Ok(match object {
                JsValue::Object(obj) => obj.prototype().map_or(JsValue::Null, JsValue::Object),
                JsValue::Undefined | JsValue::Null => {
                    return self.get(object, key);
                }
                primitive => self.to_object(primitive)?
                    .prototype()
                    .map_or(JsValue::Null, JsValue::Object),
            });
        }
        let value = self.get(object, key)?;
        Ok(self.hide_global(value))
    }

    fn call_value(
        &mut self,
        func: &JsValue,
        this: &JsValue,
        args: &[JsValue],
        label: &str,
        pos: Option<Position>,
    ) -> Result<JsValue, EvalError> {
        if !matches!(func, JsValue::Object(f) if f.is_callable()) {
            return Err(self.raise(Message::FunctionUndefined, label, pos));
        }
        let result = self.call_function(func, this, args)?;
        Ok(self.hide_global(result))
    }

    /// `eval` reached through the built-in binding runs in the caller's scope;
    /// a locally rebound capability runs globally.
    fn eval_uses_caller_scope(&self, resolved: &crate::interpreter::scope::ScopeRef) -> bool {
        matches!(
            resolved.borrow().kind,
            ScopeKind::Super | ScopeKind::Root | ScopeKind::Global
        )
    }
}

impl Compiler {
    pub(crate) fn compile_chain_root(&mut self, node: &Node) -> CResult<Closure> {
        let chain = self.compile_chain_part(node)?;
        Ok(closure(move |interp| {
            Ok(Completion::Value(match chain(interp)? {
                Some((_, value)) => value,
                None => JsValue::Undefined,
            }))
        }))
    }

    fn compile_chain_part(&mut self, node: &Node) -> CResult<ChainFn> {
        self.nested_node(node, |this| this.compile_chain_link(node))
    }

    fn compile_chain_link(&mut self, node: &Node) -> CResult<ChainFn> {
        let pos = node.position();
        match &node.kind {
            NodeKind::ChainExpression { expression } => {
                let inner = self.compile_chain_part(expression)?;
                Ok(chain_fn(move |interp| {
                    interp.tick(pos)?;
                    inner(interp)
                }))
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional,
            } => {
                let key = self.compile_key(property, *computed)?;
                let optional = *optional;
                if matches!(object.kind, NodeKind::Super) {
                    let super_name = JsString::from("super");
                    return Ok(chain_fn(move |interp| {
                        interp.tick(pos)?;
                        let parent = interp.read_identifier(&super_name, pos)?;
                        let proto = interp.get_named(&parent, "prototype")?;
                        let key = key.eval(interp)?;
                        let value = interp.get(&proto, &key)?;
                        Ok(Some((interp.context.clone(), value)))
                    }));
                }
                let object = self.compile_chain_part(object)?;
                Ok(chain_fn(move |interp| {
                    interp.tick(pos)?;
                    let Some((_, target)) = object(interp)? else {
                        return Ok(None);
                    };
                    if optional && target.is_nullish() {
                        return Ok(None);
                    }
                    let key = key.eval(interp)?;
                    let value = interp.get_member(&target, &key, pos)?;
                    Ok(Some((target, value)))
                }))
            }
            NodeKind::CallExpression {
                callee,
                arguments,
                optional,
            } => {
                let args = self.compile_arguments(arguments)?;
                let label = self.text(callee);
                let optional = *optional;
                match &callee.kind {
                    NodeKind::Super => {
                        let super_name = JsString::from("super");
                        Ok(chain_fn(move |interp| {
                            interp.tick(pos)?;
                            let parent = interp.read_identifier(&super_name, pos)?;
                            let JsValue::Object(parent) = parent else {
                                return Err(interp.raise(Message::IsNotConstructor, "super", pos));
                            };
                            let values = eval_arguments(interp, &args)?;
                            let this = interp.context.clone();
                            interp.run_parent_init(&parent, &this, &values)?;
                            Ok(Some((JsValue::Undefined, JsValue::Undefined)))
                        }))
                    }
                    NodeKind::Identifier { name } => {
                        if name == "eval" || name == "arguments" {
                            self.note_arguments();
                        }
                        let is_eval_name = name == "eval";
                        let name = JsString::from(name.as_str());
                        Ok(chain_fn(move |interp| {
                            interp.tick(pos)?;
                            let (scope, func) = interp.resolve_callee(&name, pos)?;
                            if optional && func.is_nullish() {
                                return Ok(None);
                            }
                            let values = eval_arguments(interp, &args)?;
                            let is_eval = is_eval_name
                                && matches!(&func, JsValue::Object(f) if matches!(
                                    f.borrow().callable,
                                    Some(JsFunction::Capability(Capability::Eval))
                                ));
                            if is_eval {
                                let result = if interp.eval_uses_caller_scope(&scope) {
                                    let (scope, context) = (interp.scope.clone(), interp.context.clone());
                                    interp.eval_code(values.first(), scope, context)?
                                } else {
                                    let scope = interp.global_scope.clone();
                                    let context = JsValue::Object(interp.bindings.clone());
                                    interp.eval_code(values.first(), scope, context)?
                                };
                                return Ok(Some((JsValue::Undefined, result)));
                            }
                            let this = if Interpreter::is_with_scope(&scope) {
                                JsValue::Object(scope.borrow().data.clone())
                            } else {
                                JsValue::Undefined
                            };
                            let result = interp.call_value(&func, &this, &values, &label, pos)?;
                            Ok(Some((JsValue::Undefined, result)))
                        }))
                    }
                    _ => {
                        let callee = self.compile_chain_part(callee)?;
                        Ok(chain_fn(move |interp| {
                            interp.tick(pos)?;
                            let Some((this, func)) = callee(interp)? else {
                                return Ok(None);
                            };
                            if optional && func.is_nullish() {
                                return Ok(None);
                            }
                            let values = eval_arguments(interp, &args)?;
                            let result = interp.call_value(&func, &this, &values, &label, pos)?;
                            Ok(Some((JsValue::Undefined, result)))
                        }))
                    }
                }
            }
            _ => {
                let expr = self.compile(node)?;
                Ok(chain_fn(move |interp| {
                    Ok(Some((JsValue::Undefined, expr(interp)?.value())))
                }))
            }
        }
    }

    pub(crate) fn compile_arguments(&mut self, arguments: &[Node]) -> CResult<Arguments> {
        arguments
            .iter()
            .map(|arg| match &arg.kind {
                NodeKind::SpreadElement { argument } => Ok((self.compile(argument)?, true)),
                _ => Ok((self.compile(arg)?, false)),
            })
            .collect()
    }

    pub(crate) fn compile_new(
        &mut self,
        callee: &Node,
        arguments: &[Node],
        pos: Option<Position>,
    ) -> CResult<Closure> {
        let label = self.text(callee);
        let callee = self.compile(callee)?;
        let args = self.compile_arguments(arguments)?;
        Ok(closure(move |interp| {
            let func = callee(interp)?.value();
            let values = eval_arguments(interp, &args)?;
            if !matches!(&func, JsValue::Object(f) if f.is_constructor()) {
                return Err(interp.raise(Message::IsNotConstructor, &label, pos));
            }
            interp.construct_value(&func, &values).map(Completion::Value)
        }))
    }

    pub(crate) fn compile_array(&mut self, elements: &[Option<Node>]) -> CResult<Closure> {
        let mut items: Vec<Option<(Closure, bool, String)>> = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(match element {
                None => None,
                Some(Node {
                    kind: NodeKind::SpreadElement { argument },
                    ..
                }) => Some((self.compile(argument)?, true, self.text(argument))),
                Some(node) => Some((self.compile(node)?, false, String::new())),
            });
        }
        Ok(closure(move |interp| {
            let mut values = Vec::with_capacity(items.len());
            for item in &items {
                match item {
                    None => values.push(JsValue::Undefined),
                    Some((expr, false, _)) => values.push(expr(interp)?.value()),
                    Some((expr, true, label)) => {
                        let value = expr(interp)?.value();
                        values.extend(interp.iterate_to_vec(&value, label)?);
                    }
                }
            }
            Ok(Completion::Value(interp.create_array(values)))
        }))
    }

    pub(crate) fn compile_object(&mut self, properties: &[Node]) -> CResult<Closure> {
        let mut parts = Vec::with_capacity(properties.len());
        for prop in properties {
            let part = match &prop.kind {
                NodeKind::SpreadElement { argument } => ObjectPart::Spread(self.compile(argument)?),
                NodeKind::Property {
                    key,
                    value,
                    kind,
                    computed,
                    ..
                } => {
                    let key_fn = self.compile_key(key, *computed)?;
                    match kind {
                        PropertyKind::Init if key_fn.static_name().is_some_and(|n| n.as_str() == "__proto__") => {
                            ObjectPart::Ignored(self.compile(value)?)
                        }
                        PropertyKind::Init => {
                            let value = match key_fn.static_name() {
                                Some(name) => self.compile_named(value, name.as_str(), false)?,
                                None => self.compile(value)?,
                            };
                            ObjectPart::Value(key_fn, value)
                        }
                        PropertyKind::Get => ObjectPart::Getter(key_fn, self.compile(value)?),
                        PropertyKind::Set => ObjectPart::Setter(key_fn, self.compile(value)?),
                    }
                }
                _ => {
                    return Err(CompileError::new(
                        Message::ObjectStructure,
                        prop.type_name(),
                        prop.position(),
                    ));
                }
            };
            parts.push(part);
        }
        Ok(closure(move |interp| {
            let obj = interp.create_object();
            for part in &parts {
                match part {
                    ObjectPart::Value(key, value) => {
                        let key = key.eval(interp)?;
                        let value = value(interp)?.value();
                        let desc = match key {
                            PropertyKey::Symbol(_) => PropertyDescriptor::data(value, true, false, true),
                            PropertyKey::String(_) => PropertyDescriptor::data_default(value),
                        };
                        obj.borrow_mut().define_own_property(key, desc);
                    }
                    ObjectPart::Getter(key, func) => {
                        let key = key.eval(interp)?;
                        let getter = func(interp)?.value();
                        obj.borrow_mut().define_own_property(
                            key,
                            PropertyDescriptor {
                                get: Some(getter),
                                enumerable: Some(true),
                                configurable: Some(true),
                                ..Default::default()
                            },
                        );
                    }
                    ObjectPart::Setter(key, func) => {
                        let key = key.eval(interp)?;
                        let setter = func(interp)?.value();
                        obj.borrow_mut().define_own_property(
                            key,
                            PropertyDescriptor {
                                set: Some(setter),
                                enumerable: Some(true),
                                configurable: Some(true),
                                ..Default::default()
                            },
                        );
                    }
                    ObjectPart::Spread(source) => {
                        let source = source(interp)?.value();
                        interp.copy_data_properties(&obj, &source)?;
                    }
                    ObjectPart::Ignored(value) => {
                        value(interp)?;
                    }
                }
            }
            Ok(Completion::Value(JsValue::Object(obj)))
        }))
    }

    pub(crate) fn compile_unary(
        &mut self,
        operator: &UnaryOperator,
        argument: &Node,
        pos: Option<Position>,
    ) -> CResult<Closure> {
        match (operator, &argument.kind) {
            (UnaryOperator::Typeof, NodeKind::Identifier { name }) => {
                let name = JsString::from(name.as_str());
                return Ok(closure(move |interp| {
                    let value = interp.typeof_identifier(&name, pos)?;
                    Ok(Completion::Value(JsValue::from(typeof_value(&value))))
                }));
            }
            (
                UnaryOperator::Delete,
                NodeKind::MemberExpression {
                    object,
                    property,
                    computed,
                    ..
                },
            ) => {
                let object = self.compile(object)?;
                let key = self.compile_key(property, *computed)?;
                return Ok(closure(move |interp| {
                    let target = object(interp)?.value();
                    let key = key.eval(interp)?;
                    let deleted = interp.delete_property(&target, &key)?;
                    Ok(Completion::Value(JsValue::Boolean(deleted)))
                }));
            }
            (UnaryOperator::Delete, NodeKind::Identifier { .. }) => {
                return Ok(closure(|_| Ok(Completion::Value(JsValue::Boolean(false)))));
            }
            (UnaryOperator::Other(op), _) => {
                return Err(CompileError::new(Message::UnaryOperator, op, pos));
            }
            _ => {}
        }
        let operator = operator.clone();
        let argument = self.compile(argument)?;
        Ok(closure(move |interp| {
            let value = argument(interp)?.value();
            let result = match &operator {
                UnaryOperator::Minus => JsValue::Number(number_ops::unary_minus(interp.to_number(&value)?)),
                UnaryOperator::Plus => JsValue::Number(interp.to_number(&value)?),
                UnaryOperator::Not => JsValue::Boolean(!to_boolean(&value)),
                UnaryOperator::BitNot => {
                    JsValue::Number(number_ops::bitwise_not(interp.to_number(&value)?))
                }
                UnaryOperator::Typeof => JsValue::from(typeof_value(&value)),
                UnaryOperator::Void => JsValue::Undefined,
                UnaryOperator::Delete => JsValue::Boolean(true),
                UnaryOperator::Other(op) => {
                    return Err(interp.raise(Message::UnaryOperator, op, pos));
                }
            };
            Ok(Completion::Value(result))
        }))
    }

    pub(crate) fn compile_update(
        &mut self,
        operator: &UpdateOperator,
        prefix: bool,
        argument: &Node,
        pos: Option<Position>,
    ) -> CResult<Closure> {
        let delta = match operator {
            UpdateOperator::Increment => 1.0,
            UpdateOperator::Decrement => -1.0,
            UpdateOperator::Other(op) => {
                return Err(CompileError::new(Message::UpdateOperator, op, pos));
            }
        };
        match &argument.kind {
            NodeKind::Identifier { name } => {
                let name = JsString::from(name.as_str());
                Ok(closure(move |interp| {
                    let old = interp.read_identifier(&name, pos)?;
                    let old = interp.to_number(&old)?;
                    let new = old + delta;
                    interp.assign_identifier(&name, JsValue::Number(new), pos)?;
                    Ok(Completion::Value(JsValue::Number(if prefix { new } else { old })))
                }))
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                let object = self.compile(object)?;
                let key = self.compile_key(property, *computed)?;
                Ok(closure(move |interp| {
                    let target = object(interp)?.value();
                    let key = key.eval(interp)?;
                    let old = interp.get_member(&target, &key, pos)?;
                    let old = interp.to_number(&old)?;
                    let new = old + delta;
                    interp.put(&target, key, JsValue::Number(new))?;
                    Ok(Completion::Value(JsValue::Number(if prefix { new } else { old })))
                }))
            }
            _ => Err(CompileError::new(
                Message::AssignmentType,
                argument.type_name(),
                pos,
            )),
        }
    }

    pub(crate) fn compile_binary(
        &mut self,
        operator: &BinaryOperator,
        left: &Node,
        right: &Node,
        pos: Option<Position>,
    ) -> CResult<Closure> {
        if let BinaryOperator::Other(op) = operator {
            return Err(CompileError::new(Message::BinaryOperator, op, pos));
        }
        let operator = operator.clone();
        let left = self.compile(left)?;
        let right = self.compile(right)?;
        Ok(closure(move |interp| {
            let l = left(interp)?.value();
            let r = right(interp)?.value();
            interp.binary_op(&operator, &l, &r).map(Completion::Value)
        }))
    }

    pub(crate) fn compile_logical(
        &mut self,
        operator: &LogicalOperator,
        left: &Node,
        right: &Node,
        pos: Option<Position>,
    ) -> CResult<Closure> {
        if let LogicalOperator::Other(op) = operator {
            return Err(CompileError::new(Message::LogicalOperator, op, pos));
        }
        let operator = operator.clone();
        let left = self.compile(left)?;
        let right = self.compile(right)?;
        Ok(closure(move |interp| {
            let l = left(interp)?.value();
            let short_circuit = match operator {
                LogicalOperator::Or => to_boolean(&l),
                LogicalOperator::And => !to_boolean(&l),
                _ => !l.is_nullish(),
            };
            if short_circuit {
                Ok(Completion::Value(l))
            } else {
                right(interp)
            }
        }))
    }

    pub(crate) fn compile_assignment(
        &mut self,
        operator: &AssignmentOperator,
        left: &Node,
        right: &Node,
        pos: Option<Position>,
    ) -> CResult<Closure> {
        if let AssignmentOperator::Other(op) = operator {
            return Err(CompileError::new(Message::AssignmentExpression, op, pos));
        }
        let operator = operator.clone();
        match &left.kind {
            NodeKind::Identifier { name } => {
                let value = self.compile_named(right, name, true)?;
                let name = JsString::from(name.as_str());
                Ok(closure(move |interp| {
                    let result = match logical_or_compound(&operator) {
                        Update::Assign => value(interp)?.value(),
                        update => {
                            let current = interp.read_identifier(&name, pos)?;
                            match apply_update(interp, &update, current.clone(), &value)? {
                                Some(v) => v,
                                None => return Ok(Completion::Value(current)),
                            }
                        }
                    };
                    interp.assign_identifier(&name, result.clone(), pos)?;
                    Ok(Completion::Value(result))
                }))
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                let object = self.compile(object)?;
                let key = self.compile_key(property, *computed)?;
                let value = self.compile(right)?;
                Ok(closure(move |interp| {
                    let target = object(interp)?.value();
                    let key = key.eval(interp)?;
                    let result = match logical_or_compound(&operator) {
                        Update::Assign => value(interp)?.value(),
                        update => {
                            let current = interp.get_member(&target, &key, pos)?;
                            match apply_update(interp, &update, current.clone(), &value)? {
                                Some(v) => v,
                                None => return Ok(Completion::Value(current)),
                            }
                        }
                    };
                    interp.put(&target, key, result.clone())?;
                    Ok(Completion::Value(result))
                }))
            }
            NodeKind::ObjectPattern { .. } | NodeKind::ArrayPattern { .. }
                if operator == AssignmentOperator::Assign =>
            {
                let bind = self.compile_binder(left, BindTarget::Assign)?;
                let value = self.compile(right)?;
                Ok(closure(move |interp| {
                    let result = value(interp)?.value();
                    bind(interp, result.clone())?;
                    Ok(Completion::Value(result))
                }))
            }
            _ => Err(CompileError::new(
                Message::AssignmentType,
                left.type_name(),
                pos,
            )),
        }
    }

    pub(crate) fn compile_template(&mut self, quasis: &[Node], expressions: &[Node]) -> CResult<Closure> {
        let strings: Vec<String> = quasis.iter().map(cooked_text).collect();
        let expressions = expressions
            .iter()
            .map(|e| self.compile(e))
            .collect::<CResult<Vec<_>>>()?;
        Ok(closure(move |interp| {
            let mut out = String::new();
            for (i, text) in strings.iter().enumerate() {
                out.push_str(text);
                if let Some(expr) = expressions.get(i) {
                    let value = expr(interp)?.value();
                    out.push_str(interp.to_js_string(&value)?.as_str());
                }
            }
            Ok(Completion::Value(JsValue::from(out)))
        }))
    }

    pub(crate) fn compile_tagged_template(
        &mut self,
        tag: &Node,
        quasi: &Node,
        pos: Option<Position>,
    ) -> CResult<Closure> {
        let NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } = &quasi.kind
        else {
            return Err(CompileError::new(Message::NodeType, quasi.type_name(), pos));
        };
        let cooked: Vec<JsValue> = quasis
            .iter()
            .map(|q| match &q.kind {
                NodeKind::TemplateElement { value, .. } => value
                    .cooked
                    .as_deref()
                    .map_or(JsValue::Undefined, JsValue::from),
                _ => JsValue::Undefined,
            })
            .collect();
        let raw: Vec<JsValue> = quasis
            .iter()
            .map(|q| match &q.kind {
                NodeKind::TemplateElement { value, .. } => JsValue::from(value.raw.as_str()),
                _ => JsValue::Undefined,
            })
            .collect();
        let label = self.text(tag);
        let tag = self.compile_chain_part(tag)?;
        let expressions = expressions
            .iter()
            .map(|e| self.compile(e))
            .collect::<CResult<Vec<_>>>()?;
        Ok(closure(move |interp| {
            let (this, func) = tag(interp)?.unwrap_or((JsValue::Undefined, JsValue::Undefined));
            let strings = interp.create_array(cooked.clone());
            let raw = interp.create_array(raw.clone());
            if let JsValue::Object(strings) = &strings {
                strings.borrow_mut().insert_builtin("raw", raw);
            }
            let mut args = vec![strings];
            for expr in &expressions {
                args.push(expr(interp)?.value());
            }
            interp
                .call_value(&func, &this, &args, &label, pos)
                .map(Completion::Value)
        }))
    }
}

fn cooked_text(quasi: &Node) -> String {
    match &quasi.kind {
        NodeKind::TemplateElement { value, .. } => {
            value.cooked.clone().unwrap_or_else(|| value.raw.clone())
        }
        _ => String::new(),
    }
}

enum Update {
    Assign,
    Binary(BinaryOperator),
    Or,
    And,
    Nullish,
}

fn logical_or_compound(operator: &AssignmentOperator) -> Update {
    match operator {
        AssignmentOperator::LogicalOrAssign => Update::Or,
        AssignmentOperator::LogicalAndAssign => Update::And,
        AssignmentOperator::NullishAssign => Update::Nullish,
        other => match other.binary() {
            Some(op) => Update::Binary(op),
            None => Update::Assign,
        },
    }
}

/// New value of a compound or logical assignment, or `None` when a logical form short-circuits
/// and nothing is written.
fn apply_update(
    interp: &mut Interpreter,
    update: &Update,
    current: JsValue,
    value: &Closure,
) -> Result<Option<JsValue>, EvalError> {
    Ok(match update {
        Update::Assign => Some(value(interp)?.value()),
        Update::Binary(op) => {
            let rhs = value(interp)?.value();
            Some(interp.binary_op(op, &current, &rhs)?)
        }
        Update::Or if to_boolean(&current) => None,
        Update::And if !to_boolean(&current) => None,
        Update::Nullish if !current.is_nullish() => None,
        Update::Or | Update::And | Update::Nullish => Some(value(interp)?.value()),
    })
}
