use super::{BindTarget, CResult, Compiler, FunctionState, closure, guarded};
use crate::ast::{Function, Node, NodeKind};
use crate::interpreter::error::{CompileError, Message};
use crate::interpreter::signal::{Closure, Completion};
use crate::interpreter::types::{
    Binder, FunctionTemplate, Hoisted, JsFunction, LexFrame, UserFunction,
};
use crate::types::{JsString, JsValue};
use std::rc::Rc;

type FunctionParts = (
    Vec<(Binder, bool)>,
    Closure,
    LexFrame,
    Vec<(JsString, Rc<FunctionTemplate>)>,
);

impl Compiler {
    /// Compiles `node`, giving anonymous function, arrow and class expressions the name of the
    /// binding they are assigned to.
    pub(crate) fn compile_named(
        &mut self,
        node: &Node,
        name: &str,
        self_binding: bool,
    ) -> CResult<Closure> {
        let inferred = JsString::from(name);
        let inner = match &node.kind {
            NodeKind::FunctionExpression(func) if func.id.is_none() => {
                self.compile_function_value(node, func, Some((inferred, self_binding)), false)?
            }
            NodeKind::ArrowFunctionExpression(func) => {
                self.compile_function_value(node, func, Some((inferred, false)), true)?
            }
            NodeKind::ClassExpression(class) if class.id.is_none() => {
                self.compile_class_value(node, class, Some(inferred))?
            }
            _ => return self.compile(node),
        };
        Ok(guarded(node.position(), inner))
    }

    /// Compiles a function body once into a template shared by every function object created
    /// from it.
    pub(crate) fn compile_function(
        &mut self,
        node: &Node,
        func: &Function,
        name: JsString,
        self_binding: bool,
        is_arrow: bool,
    ) -> CResult<Rc<FunctionTemplate>> {
        let pos = node.position();
        if func.generator || func.is_async {
            let prefix = if func.is_async { "async " } else { "generator " };
            return Err(CompileError::new(
                Message::NodeType,
                &format!("{prefix}{}", node.type_name()),
                pos,
            ));
        }
        self.nested.push(FunctionState {
            is_arrow,
            ..FunctionState::default()
        });
        let parts = self.compile_function_parts(func);
        let state = self.nested.pop().unwrap_or_default();
        let (params, body, lexical, funcs) = parts?;
        let length = func
            .params
            .iter()
            .take_while(|p| {
                !matches!(
                    p.kind,
                    NodeKind::AssignmentPattern { .. } | NodeKind::RestElement { .. }
                )
            })
            .count();
        tracing::trace!(name = %name, params = params.len(), "compiled function");
        Ok(Rc::new(FunctionTemplate {
            name,
            self_binding,
            params,
            body,
            hoisted: Rc::new(Hoisted {
                vars: state.vars,
                funcs,
                lexical,
                uses_arguments: state.uses_arguments,
            }),
            is_arrow,
            length,
            source: self.source_of(node),
            position: pos,
        }))
    }

    fn compile_function_parts(&mut self, func: &Function) -> CResult<FunctionParts> {
        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            params.push(match &param.kind {
                NodeKind::RestElement { argument } => {
                    (self.compile_binder(argument, BindTarget::Param)?, true)
                }
                _ => (self.compile_binder(param, BindTarget::Param)?, false),
            });
        }
        let (body, lexical, funcs) = match &func.body.kind {
            NodeKind::BlockStatement { body } => self.compile_body(body)?,
            _ => {
                let ret = Node::new(
                    NodeKind::ReturnStatement {
                        argument: Some(func.body.clone()),
                    },
                    func.body.start,
                    func.body.end,
                    func.body.loc,
                );
                let group = Node::new(
                    NodeKind::Group(vec![ret]),
                    func.body.start,
                    func.body.end,
                    func.body.loc,
                );
                self.compile_body(std::slice::from_ref(&group))?
            }
        };
        Ok((params, body, lexical, funcs))
    }

    /// Function and arrow expressions: a fresh function object per evaluation, closing over the
    /// current scope (and, for arrows, the current `this`).
    pub(crate) fn compile_function_value(
        &mut self,
        node: &Node,
        func: &Function,
        inferred: Option<(JsString, bool)>,
        is_arrow: bool,
    ) -> CResult<Closure> {
        let (name, self_binding) = match func.id.as_deref().and_then(Node::identifier_name) {
            Some(id) => (JsString::from(id), true),
            None => inferred.unwrap_or_default(),
        };
        let template = self.compile_function(node, func, name, self_binding && !is_arrow, is_arrow)?;
        Ok(closure(move |interp| {
            let this_value = is_arrow.then(|| interp.context.clone());
            let func = interp.create_function(JsFunction::User(Rc::new(UserFunction {
                template: template.clone(),
                scope: interp.scope.clone(),
                this_value,
            })));
            Ok(Completion::Value(JsValue::Object(func)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};

    fn first_function(src: &str) -> Rc<FunctionTemplate> {
        let node = parse(src, &ParseOptions::default()).unwrap();
        let mut compiler = Compiler::new(Some(Rc::from(src)));
        let program = compiler.compile_program(&node).unwrap();
        program.hoisted.funcs[0].1.clone()
    }

    #[test]
    fn length_stops_at_first_default() {
        let template = first_function("function f(a, b, c = 1, d) {}");
        assert_eq!(template.length, 2);
        assert_eq!(template.params.len(), 4);
        let template = first_function("function g(a, ...rest) {}");
        assert_eq!(template.length, 1);
        assert!(template.params[1].1);
    }

    #[test]
    fn arguments_use_is_recorded_through_arrows() {
        let template = first_function("function f() { return () => arguments[0]; }");
        assert!(template.hoisted.uses_arguments);
        let template = first_function("function f(x) { return x; }");
        assert!(!template.hoisted.uses_arguments);
    }

    #[test]
    fn keeps_source_text() {
        let template = first_function("function add(a, b) { return a + b; }");
        assert_eq!(template.source.as_deref(), Some("function add(a, b) { return a + b; }"));
        assert_eq!(template.name.as_str(), "add");
        assert!(template.self_binding);
    }
}
