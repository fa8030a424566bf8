use super::{CResult, Compiler, KeyFn, closure};
use crate::ast::{Class, MethodKind, Node, NodeKind, Position};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{CompileError, EvalError, Message};
use crate::interpreter::scope::{Scope, ScopeKind, ScopeRef};
use crate::interpreter::signal::{Closure, Completion};
use crate::interpreter::types::{
    ClassField, ClassFunction, FunctionTemplate, JsFunction, JsObject, LexFrame, LexKind,
    ObjectData, PropertyDescriptor, UserFunction,
};
use crate::types::{JsString, JsValue};
use std::rc::Rc;

enum Member {
    Method {
        key: KeyFn,
        template: Rc<FunctionTemplate>,
        is_static: bool,
    },
    Accessor(MethodKind),
    Field {
        key: KeyFn,
        init: Option<Closure>,
        is_arrow: bool,
        is_static: bool,
    },
}

struct ClassParts {
    name: JsString,
    binding: Option<JsString>,
    parent: Option<Closure>,
    constructor: Option<Rc<FunctionTemplate>>,
    members: Vec<Member>,
    source: Option<Rc<str>>,
    pos: Option<Position>,
}

impl Compiler {
    pub(crate) fn compile_class_value(
        &mut self,
        node: &Node,
        class: &Class,
        inferred: Option<JsString>,
    ) -> CResult<Closure> {
        let parts = Rc::new(self.compile_class_parts(node, class, inferred)?);
        Ok(closure(move |interp| {
            define_class(interp, &parts).map(|c| Completion::Value(JsValue::Object(c)))
        }))
    }

    pub(crate) fn compile_class_declaration(&mut self, node: &Node, class: &Class) -> CResult<Closure> {
        let parts = Rc::new(self.compile_class_parts(node, class, None)?);
        let pos = node.position();
        Ok(closure(move |interp| {
            let class = JsValue::Object(define_class(interp, &parts)?);
            if let Some(name) = &parts.binding {
                interp.initialize_binding(name, class.clone(), pos)?;
            }
            if interp.call_stack.is_empty() {
                interp.value = class.clone();
            }
            Ok(Completion::Value(class))
        }))
    }

    fn compile_class_parts(
        &mut self,
        node: &Node,
        class: &Class,
        inferred: Option<JsString>,
    ) -> CResult<ClassParts> {
        let binding = class
            .id
            .as_deref()
            .and_then(Node::identifier_name)
            .map(JsString::from);
        let name = binding.clone().or(inferred).unwrap_or_default();
        let parent = class
            .super_class
            .as_deref()
            .map(|p| self.compile(p))
            .transpose()?;
        let NodeKind::ClassBody { body } = &class.body.kind else {
            return Err(CompileError::new(
                Message::NodeType,
                class.body.type_name(),
                class.body.position(),
            ));
        };
        let mut constructor = None;
        let mut members = Vec::with_capacity(body.len());
        for element in body {
            match &element.kind {
                NodeKind::MethodDefinition {
                    key,
                    value,
                    kind,
                    computed,
                    is_static,
                } => {
                    let func = match &value.kind {
                        NodeKind::FunctionExpression(func) => func,
                        _ => {
                            return Err(CompileError::new(
                                Message::NodeType,
                                value.type_name(),
                                value.position(),
                            ));
                        }
                    };
                    match kind {
                        MethodKind::Constructor => {
                            constructor =
                                Some(self.compile_function(value, func, name.clone(), false, false)?);
                        }
                        MethodKind::Method => {
                            let key = self.compile_key(key, *computed)?;
                            let method_name = key.static_name().unwrap_or_default();
                            let template = self.compile_function(value, func, method_name, false, false)?;
                            members.push(Member::Method {
                                key,
                                template,
                                is_static: *is_static,
                            });
                        }
                        MethodKind::Get | MethodKind::Set => members.push(Member::Accessor(*kind)),
                    }
                }
                NodeKind::PropertyDefinition {
                    key,
                    value,
                    computed,
                    is_static,
                } => {
                    let key = self.compile_key(key, *computed)?;
                    let is_arrow = value
                        .as_deref()
                        .is_some_and(|v| matches!(v.kind, NodeKind::ArrowFunctionExpression(_)));
                    let init = match (value.as_deref(), key.static_name()) {
                        (Some(v), Some(field)) => Some(self.compile_named(v, field.as_str(), false)?),
                        (Some(v), None) => Some(self.compile(v)?),
                        (None, _) => None,
                    };
                    members.push(Member::Field {
                        key,
                        init,
                        is_arrow,
                        is_static: *is_static,
                    });
                }
                _ => {
                    return Err(CompileError::new(
                        Message::NodeType,
                        element.type_name(),
                        element.position(),
                    ));
                }
            }
        }
        Ok(ClassParts {
            name,
            binding,
            parent,
            constructor,
            members,
            source: self.source_of(node),
            pos: node.position(),
        })
    }
}

fn user_function(interp: &Interpreter, template: &Rc<FunctionTemplate>, scope: &ScopeRef) -> JsObject {
    interp.create_function(JsFunction::User(Rc::new(UserFunction {
        template: template.clone(),
        scope: scope.clone(),
        this_value: None,
    })))
}

fn define_class(interp: &mut Interpreter, parts: &ClassParts) -> Result<JsObject, EvalError> {
    let parent = match &parts.parent {
        None => None,
        Some(expr) => match expr(interp)?.value() {
            JsValue::Null => Some(None),
            JsValue::Object(obj) if obj.is_constructor() => Some(Some(obj)),
            other => {
                return Err(interp.throw_type_error(&format!(
                    "Class extends value {other} is not a constructor or null"
                )));
            }
        },
    };
    let proto_parent = match &parent {
        Some(Some(p)) => match p.borrow().get_property_value("prototype") {
            Some(JsValue::Object(proto)) => Some(proto),
            Some(JsValue::Null) => None,
            _ => Some(interp.realm.object_prototype.clone()),
        },
        Some(None) => None,
        None => Some(interp.realm.object_prototype.clone()),
    };
    let prototype = JsObject::from_data(ObjectData::with_proto(proto_parent));
    let parent = parent.flatten();

    let class_scope = match &parts.binding {
        Some(name) => {
            let frame = LexFrame {
                names: vec![(name.clone(), LexKind::Const)],
            };
            Scope::with_frame(ScopeKind::Block, interp.scope.clone(), &frame)
        }
        None => interp.scope.clone(),
    };

    let constructor = match (&parts.constructor, &parent) {
        (Some(template), Some(parent)) => {
            let frame = LexFrame {
                names: vec![(JsString::from("super"), LexKind::Const)],
            };
            let prelude = Scope::with_frame(ScopeKind::Block, class_scope.clone(), &frame);
            {
                let mut scope = prelude.borrow_mut();
                scope
                    .data
                    .borrow_mut()
                    .insert_value("super", JsValue::Object(parent.clone()));
                scope.mark_initialized("super");
            }
            Some(user_function(interp, template, &prelude))
        }
        (Some(template), None) => Some(user_function(interp, template, &class_scope)),
        (None, _) => None,
    };
    let mut fields = Vec::new();
    let mut statics = Vec::new();
    let mut methods = Vec::new();
    for member in &parts.members {
        match member {
            Member::Accessor(kind) => {
                let which = if *kind == MethodKind::Get { "getter" } else { "setter" };
                return Err(interp.raise(
                    Message::NormalError,
                    &format!("Class {which} members are not supported"),
                    parts.pos,
                ));
            }
            Member::Method {
                key,
                template,
                is_static,
            } => {
                let key = key.eval(interp)?;
                let method = user_function(interp, template, &class_scope);
                methods.push((key, method, *is_static));
            }
            Member::Field {
                key,
                init,
                is_arrow,
                is_static: false,
            } => fields.push(ClassField {
                key: key.eval(interp)?,
                init: init.clone(),
                is_arrow: *is_arrow,
            }),
            Member::Field {
                key,
                init,
                is_static: true,
                ..
            } => statics.push((key.eval(interp)?, init.clone())),
        }
    }

    let class_fn = ClassFunction {
        name: parts.name.clone(),
        constructor,
        parent: parent.clone(),
        fields,
        scope: class_scope.clone(),
        source: parts.source.clone(),
    };
    let class_obj = interp.create_function(JsFunction::Class(Rc::new(class_fn)));
    {
        let mut data = class_obj.borrow_mut();
        data.prototype = Some(
            parent
                .clone()
                .unwrap_or_else(|| interp.realm.function_prototype.clone()),
        );
        data.insert_property(
            JsString::from("prototype"),
            PropertyDescriptor::data(JsValue::Object(prototype.clone()), false, false, false),
        );
    }
    prototype
        .borrow_mut()
        .insert_builtin("constructor", JsValue::Object(class_obj.clone()));

    for (key, method, is_static) in methods {
        let target = if is_static { &class_obj } else { &prototype };
        target.borrow_mut().define_own_property(
            key,
            PropertyDescriptor::data(JsValue::Object(method), true, false, true),
        );
    }

    if let Some(name) = &parts.binding {
        let mut scope = class_scope.borrow_mut();
        scope
            .data
            .borrow_mut()
            .insert_value(name.clone(), JsValue::Object(class_obj.clone()));
        scope.mark_initialized(name.as_str());
    }

    let class_this = JsValue::Object(class_obj.clone());
    for (key, init) in statics {
        let value = match init {
            Some(init) => {
                let saved = interp.enter_frame(class_scope.clone(), class_this.clone());
                let result = init(interp);
                interp.leave_frame(saved);
                result?.value()
            }
            None => JsValue::Undefined,
        };
        class_obj
            .borrow_mut()
            .define_own_property(key, PropertyDescriptor::data_default(value));
    }
    tracing::trace!(name = %parts.name, "defined class");
    Ok(class_obj)
}
