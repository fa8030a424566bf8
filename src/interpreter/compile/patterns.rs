use super::{CResult, Compiler, KeyFn};
use crate::ast::{Node, NodeKind, Position};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{CompileError, EvalError, Message};
use crate::interpreter::scope::{Access, ScopeKind, ScopeRef, resolve};
use crate::interpreter::types::{Binder, LexKind, PropertyKey};
use crate::types::{JsString, JsValue};
use std::rc::Rc;

/// Where a pattern's identifiers are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BindTarget {
    /// `var` initializers: assignment through normal resolution.
    Var,
    /// `let`/`const`/class: the initializing write that ends the dead zone.
    Lexical,
    /// Parameters and catch bindings: own properties of the current scope.
    Param,
    /// Assignment expressions, including destructuring assignment.
    Assign,
}

fn binder<F>(f: F) -> Binder
where
    F: Fn(&mut Interpreter, JsValue) -> Result<(), EvalError> + 'static,
{
    Rc::new(f)
}

enum ObjectPatternPart {
    Property(KeyFn, Binder),
    Rest(Binder),
}

impl Compiler {
    pub(crate) fn compile_binder(&mut self, pattern: &Node, target: BindTarget) -> CResult<Binder> {
        let pos = pattern.position();
        match &pattern.kind {
            NodeKind::Identifier { name } => {
                let name = JsString::from(name.as_str());
                Ok(match target {
                    BindTarget::Var | BindTarget::Assign => {
                        binder(move |interp, value| interp.assign_identifier(&name, value, pos))
                    }
                    BindTarget::Lexical => {
                        binder(move |interp, value| interp.initialize_binding(&name, value, pos))
                    }
                    BindTarget::Param => binder(move |interp, value| {
                        let data = interp.scope.borrow().data.clone();
                        data.borrow_mut().insert_value(name.clone(), value);
                        Ok(())
                    }),
                })
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } if target == BindTarget::Assign => {
                let object = self.compile(object)?;
                let key = self.compile_key(property, *computed)?;
                Ok(binder(move |interp, value| {
                    let target = object(interp)?.value();
                    let key = key.eval(interp)?;
                    interp.put(&target, key, value)
                }))
            }
            NodeKind::AssignmentPattern { left, right } => {
                let inner = self.compile_binder(left, target)?;
                let default = match left.identifier_name() {
                    Some(name) => self.compile_named(right, name, target != BindTarget::Assign)?,
                    None => self.compile(right)?,
                };
                Ok(binder(move |interp, value| {
                    let value = if value.is_undefined() {
                        default(interp)?.value()
                    } else {
                        value
                    };
                    inner(interp, value)
                }))
            }
            NodeKind::ObjectPattern { properties } => {
                let mut parts = Vec::with_capacity(properties.len());
                for prop in properties {
                    match &prop.kind {
                        NodeKind::Property {
                            key,
                            value,
                            computed,
                            ..
                        } => {
                            let key = self.compile_key(key, *computed)?;
                            parts.push(ObjectPatternPart::Property(
                                key,
                                self.compile_binder(value, target)?,
                            ));
                        }
                        NodeKind::RestElement { argument } => {
                            parts.push(ObjectPatternPart::Rest(self.compile_binder(argument, target)?));
                        }
                        _ => {
                            return Err(CompileError::new(
                                Message::ObjectStructure,
                                prop.type_name(),
                                prop.position(),
                            ));
                        }
                    }
                }
                let label = self.text(pattern);
                Ok(binder(move |interp, value| {
                    if value.is_nullish() {
                        return Err(interp.throw_type_error(&format!(
                            "Cannot destructure '{label}' as it is {value}."
                        )));
                    }
                    let mut used = Vec::new();
                    for part in &parts {
                        match part {
                            ObjectPatternPart::Property(key, bind) => {
                                let key = key.eval(interp)?;
                                let item = interp.get(&value, &key)?;
                                used.push(key);
                                bind(interp, item)?;
                            }
                            ObjectPatternPart::Rest(bind) => {
                                let rest = interp.create_object();
                                if let JsValue::Object(source) = &value {
                                    let keys = source.borrow().own_enumerable_string_keys();
                                    for name in keys {
                                        let key = PropertyKey::from(name.clone());
                                        if used.contains(&key) {
                                            continue;
                                        }
                                        let item = interp.get(&value, &key)?;
                                        rest.borrow_mut().insert_value(name, item);
                                    }
                                }
                                bind(interp, JsValue::Object(rest))?;
                            }
                        }
                    }
                    Ok(())
                }))
            }
            NodeKind::ArrayPattern { elements } => {
                let mut items: Vec<Option<(Binder, bool)>> = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(match element {
                        None => None,
                        Some(Node {
                            kind: NodeKind::RestElement { argument },
                            ..
                        }) => Some((self.compile_binder(argument, target)?, true)),
                        Some(node) => Some((self.compile_binder(node, target)?, false)),
                    });
                }
                let label = self.text(pattern);
                Ok(binder(move |interp, value| {
                    let values = interp.iterate_to_vec(&value, &label)?;
                    for (i, item) in items.iter().enumerate() {
                        let Some((bind, rest)) = item else {
                            continue;
                        };
                        let value = if *rest {
                            interp.create_array(values.get(i..).unwrap_or_default().to_vec())
                        } else {
                            values.get(i).cloned().unwrap_or(JsValue::Undefined)
                        };
                        bind(interp, value)?;
                    }
                    Ok(())
                }))
            }
            _ => {
                let message = if target == BindTarget::Assign {
                    Message::AssignmentType
                } else {
                    Message::ParamType
                };
                Err(CompileError::new(message, pattern.type_name(), pos))
            }
        }
    }
}

impl Interpreter {
    fn resolve_binding(
        &self,
        name: &JsString,
        access: Access,
        pos: Option<Position>,
    ) -> Result<ScopeRef, EvalError> {
        resolve(&self.scope, name.as_str(), access)
            .map_err(|u| self.raise(Message::UseBeforeInitialization, u.0.as_str(), pos))
    }

    /// Reads `name` from the scope that binds it; unbound names are a ReferenceError.
    pub(crate) fn read_identifier(
        &mut self,
        name: &JsString,
        pos: Option<Position>,
    ) -> Result<JsValue, EvalError> {
        let scope = self.resolve_binding(name, Access::Read, pos)?;
        self.read_from(&scope, name, pos)
    }

    /// Reads `name` from a scope already found by resolution.
    pub(crate) fn read_from(
        &mut self,
        scope: &ScopeRef,
        name: &JsString,
        pos: Option<Position>,
    ) -> Result<JsValue, EvalError> {
        let data = scope.borrow().data.clone();
        let key = PropertyKey::from(name.clone());
        if !data.has_property(&key) {
            return Err(self.raise(Message::VariableUndefined, name.as_str(), pos));
        }
        let value = self.get(&JsValue::Object(data), &key)?;
        Ok(self.hide_global(value))
    }

    /// Finds the scope binding `name` for a call, reporting whether it is a `with` object.
    pub(crate) fn resolve_callee(
        &mut self,
        name: &JsString,
        pos: Option<Position>,
    ) -> Result<(ScopeRef, JsValue), EvalError> {
        let scope = self.resolve_binding(name, Access::Read, pos)?;
        let value = self.read_from(&scope, name, pos)?;
        Ok((scope, value))
    }

    /// `typeof name`: unbound names are `undefined` instead of an error.
    pub(crate) fn typeof_identifier(
        &mut self,
        name: &JsString,
        pos: Option<Position>,
    ) -> Result<JsValue, EvalError> {
        let scope = self.resolve_binding(name, Access::Read, pos)?;
        let data = scope.borrow().data.clone();
        if !data.has_property(&PropertyKey::from(name.clone())) {
            return Ok(JsValue::Undefined);
        }
        self.read_from(&scope, name, pos)
    }

    pub(crate) fn assign_identifier(
        &mut self,
        name: &JsString,
        value: JsValue,
        pos: Option<Position>,
    ) -> Result<(), EvalError> {
        let scope = self.resolve_binding(name, Access::Write, pos)?;
        let (data, record) = {
            let s = scope.borrow();
            (s.data.clone(), s.lex_record(name.as_str()))
        };
        if record.is_some_and(|r| r.kind == LexKind::Const) {
            return Err(self.raise(Message::ConstChange, name.as_str(), pos));
        }
        self.put(&JsValue::Object(data), PropertyKey::from(name.clone()), value)
    }

    /// Initializing write of a `let`/`const`/class binding; ends its dead zone.
    pub(crate) fn initialize_binding(
        &mut self,
        name: &JsString,
        value: JsValue,
        pos: Option<Position>,
    ) -> Result<(), EvalError> {
        let scope = self.resolve_binding(name, Access::Initialize, pos)?;
        let mut s = scope.borrow_mut();
        s.data.borrow_mut().insert_value(name.clone(), value);
        s.mark_initialized(name.as_str());
        Ok(())
    }

    pub(crate) fn is_with_scope(scope: &ScopeRef) -> bool {
        scope.borrow().kind == ScopeKind::With
    }
}
