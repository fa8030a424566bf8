//! AST to closure compilation.
//!
//! Each node is visited once per compiled unit. The walk collects hoisted declarations and
//! lexical frames and leaves behind nested closures that only touch the interpreter state.

use super::Interpreter;
use super::error::{CompileError, EvalError, Message};
use super::signal::{Closure, Completion};
use super::types::{FunctionTemplate, Hoisted, LexFrame, LexKind, PropertyKey};
use crate::ast::{Node, NodeKind, Position, VariableKind};
use crate::stack::ensure_sufficient_stack;
use crate::types::{JsString, JsValue, number_ops};
use std::rc::Rc;

mod classes;
mod expressions;
mod functions;
mod patterns;
mod statements;

pub(crate) use patterns::BindTarget;

pub(crate) type CResult<T> = Result<T, CompileError>;

/// A compiled program: hoisted declarations plus the body closure. Cheap to clone and reusable
/// across runs.
#[derive(Clone)]
pub struct Program {
    pub(crate) hoisted: Rc<Hoisted>,
    pub(crate) body: Closure,
}

pub(crate) fn closure<F>(f: F) -> Closure
where
    F: Fn(&mut Interpreter) -> Result<Completion, EvalError> + 'static,
{
    Rc::new(f)
}

/// Charges the guard and records the node position before running `inner`.
pub(crate) fn guarded(pos: Option<Position>, inner: Closure) -> Closure {
    closure(move |interp| {
        interp.tick(pos)?;
        ensure_sufficient_stack(|| inner(interp))
    })
}

/// Property key of a member, property or class element.
#[derive(Clone)]
pub(crate) enum KeyFn {
    Static(PropertyKey),
    Computed(Closure),
}

impl KeyFn {
    pub(crate) fn eval(&self, interp: &mut Interpreter) -> Result<PropertyKey, EvalError> {
        match self {
            KeyFn::Static(key) => Ok(key.clone()),
            KeyFn::Computed(expr) => {
                let value = expr(interp)?.value();
                interp.to_property_key(&value)
            }
        }
    }

    pub(crate) fn static_name(&self) -> Option<JsString> {
        match self {
            KeyFn::Static(PropertyKey::String(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Default)]
struct FunctionState {
    vars: Vec<JsString>,
    lex_frames: Vec<LexFrame>,
    uses_arguments: bool,
    is_arrow: bool,
}

/// Deepest node nesting the compiler accepts.
pub(crate) const MAX_COMPILE_DEPTH: usize = 1024;

pub(crate) struct Compiler {
    source: Option<Rc<str>>,
    root: FunctionState,
    nested: Vec<FunctionState>,
    depth: usize,
}

impl Compiler {
    pub(crate) fn new(source: Option<Rc<str>>) -> Self {
        Self {
            source,
            root: FunctionState::default(),
            nested: Vec::new(),
            depth: 0,
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) fn compile_program(&mut self, node: &Node) -> CResult<Program> {
        self.root = FunctionState::default();
        let statements = match &node.kind {
            NodeKind::Program { body } => body.as_slice(),
            _ => std::slice::from_ref(node),
        };
        let (body, lexical, funcs) = self.compile_body(statements)?;
        let state = std::mem::take(&mut self.root);
        Ok(Program {
            hoisted: Rc::new(Hoisted {
                vars: state.vars,
                funcs,
                lexical,
                uses_arguments: state.uses_arguments,
            }),
            body,
        })
    }

    fn current(&mut self) -> &mut FunctionState {
        self.nested.last_mut().unwrap_or(&mut self.root)
    }

    /// Marks the nearest non-arrow function as needing an `arguments` object.
    fn note_arguments(&mut self) {
        let target = self
            .nested
            .iter_mut()
            .rev()
            .find(|s| !s.is_arrow);
        match target {
            Some(state) => state.uses_arguments = true,
            None => self.root.uses_arguments = true,
        }
    }

    fn push_frame(&mut self, frame: LexFrame) {
        self.current().lex_frames.push(frame);
    }

    fn pop_frame(&mut self) {
        self.current().lex_frames.pop();
    }

    /// Records a `var` name on the current function, refusing names already declared lexically
    /// in one of its open frames.
    fn declare_var(&mut self, name: &JsString, pos: Option<Position>) -> CResult<()> {
        let state = self.current();
        if state.lex_frames.iter().any(|f| f.contains(name.as_str())) {
            return Err(CompileError::new(
                Message::RedeclareBlockScopeVariable,
                name.as_str(),
                pos,
            ));
        }
        if !state.vars.contains(name) {
            state.vars.push(name.clone());
        }
        Ok(())
    }

    /// Source text of `node`, or a rendering of simple shapes when no text is available.
    pub(crate) fn text(&self, node: &Node) -> String {
        if let Some(text) = self
            .source
            .as_deref()
            .and_then(|s| s.get(node.start..node.end))
            .filter(|t| !t.is_empty())
        {
            return text.to_string();
        }
        match &node.kind {
            NodeKind::Identifier { name } => name.clone(),
            NodeKind::ThisExpression => "this".to_string(),
            NodeKind::Super => "super".to_string(),
            NodeKind::MemberExpression {
                object,
                property,
                computed: false,
                ..
            } => format!("{}.{}", self.text(object), self.text(property)),
            NodeKind::MemberExpression {
                object, property, ..
            } => format!("{}[{}]", self.text(object), self.text(property)),
            NodeKind::CallExpression { callee, .. } => format!("{}(...)", self.text(callee)),
            NodeKind::Literal { value, .. } => value.to_string(),
            other => other.type_name().to_string(),
        }
    }

    fn source_of(&self, node: &Node) -> Option<Rc<str>> {
        self.source
            .as_deref()
            .and_then(|s| s.get(node.start..node.end))
            .filter(|t| !t.is_empty())
            .map(Rc::from)
    }

    pub(crate) fn compile(&mut self, node: &Node) -> CResult<Closure> {
        self.nested_node(node, |this| {
            if matches!(
                node.kind,
                NodeKind::MemberExpression { .. }
                    | NodeKind::CallExpression { .. }
                    | NodeKind::ChainExpression { .. }
            ) {
                return this.compile_chain_root(node);
            }
            let inner = this.compile_node(node)?;
            Ok(guarded(node.position(), inner))
        })
    }

    /// Runs `f` one nesting level below `node`, failing once the tree is deeper than
    /// [`MAX_COMPILE_DEPTH`].
    pub(crate) fn nested_node<T>(
        &mut self,
        node: &Node,
        f: impl FnOnce(&mut Self) -> CResult<T>,
    ) -> CResult<T> {
        if self.depth >= MAX_COMPILE_DEPTH {
            return Err(CompileError::new(
                Message::NestingDepth,
                &MAX_COMPILE_DEPTH.to_string(),
                node.position(),
            ));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| f(self));
        self.depth -= 1;
        result
    }

    fn compile_node(&mut self, node: &Node) -> CResult<Closure> {
        let pos = node.position();
        match &node.kind {
            NodeKind::Program { body } | NodeKind::Group(body) => self.compile_statements(body),
            NodeKind::ExpressionStatement { expression, .. } => {
                self.compile_expression_statement(expression)
            }
            NodeKind::BlockStatement { body } => self.compile_block(body),
            NodeKind::EmptyStatement | NodeKind::DebuggerStatement => {
                Ok(closure(|_| Ok(Completion::Empty)))
            }
            NodeKind::WithStatement { object, body } => self.compile_with(object, body),
            NodeKind::ReturnStatement { argument } => self.compile_return(argument.as_deref()),
            NodeKind::LabeledStatement { .. } => self.compile_labeled(node, Vec::new()),
            NodeKind::BreakStatement { label } => Ok(match label.as_deref().and_then(Node::identifier_name) {
                Some(name) => {
                    let name = JsString::from(name);
                    closure(move |_| Ok(Completion::BreakLabel(name.clone())))
                }
                None => closure(|_| Ok(Completion::Break)),
            }),
            NodeKind::ContinueStatement { label } => Ok(match label.as_deref().and_then(Node::identifier_name) {
                Some(name) => {
                    let name = JsString::from(name);
                    closure(move |_| Ok(Completion::ContinueLabel(name.clone())))
                }
                None => closure(|_| Ok(Completion::Continue)),
            }),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => self.compile_if(test, consequent, alternate.as_deref()),
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => self.compile_switch(discriminant, cases),
            NodeKind::SwitchCase { test, .. } => match test {
                Some(test) => self.compile(test),
                None => Ok(closure(|_| Ok(Completion::DefaultCase))),
            },
            NodeKind::ThrowStatement { argument } => {
                let argument = self.compile(argument)?;
                Ok(closure(move |interp| {
                    let value = argument(interp)?.value();
                    Err(EvalError::Throw(value))
                }))
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => self.compile_try(block, handler.as_deref(), finalizer.as_deref()),
            NodeKind::WhileStatement { .. }
            | NodeKind::DoWhileStatement { .. }
            | NodeKind::ForStatement { .. }
            | NodeKind::ForInStatement { .. } => self.compile_loop(node, Vec::new()),
            NodeKind::FunctionDeclaration(_) => Ok(closure(|_| Ok(Completion::Empty))),
            NodeKind::VariableDeclaration { declarations, kind } => {
                self.compile_variable_declaration(declarations, *kind)
            }
            NodeKind::ClassDeclaration(class) => self.compile_class_declaration(node, class),
            NodeKind::Identifier { name } => {
                if name == "arguments" {
                    self.note_arguments();
                }
                let name = JsString::from(name.as_str());
                Ok(closure(move |interp| {
                    interp.read_identifier(&name, pos).map(Completion::Value)
                }))
            }
            NodeKind::Literal { value, regex, .. } => self.compile_literal(value, regex.as_ref()),
            NodeKind::ThisExpression => Ok(closure(|interp| {
                Ok(Completion::Value(interp.hide_global(interp.context.clone())))
            })),
            NodeKind::Super => {
                let name = JsString::from("super");
                Ok(closure(move |interp| {
                    interp.read_identifier(&name, pos).map(Completion::Value)
                }))
            }
            NodeKind::ArrayExpression { elements } => self.compile_array(elements),
            NodeKind::ObjectExpression { properties } => self.compile_object(properties),
            NodeKind::FunctionExpression(func) => self.compile_function_value(node, func, None, false),
            NodeKind::ArrowFunctionExpression(func) => {
                self.compile_function_value(node, func, None, true)
            }
            NodeKind::ClassExpression(class) => self.compile_class_value(node, class, None),
            NodeKind::UnaryExpression {
                operator, argument, ..
            } => self.compile_unary(operator, argument, pos),
            NodeKind::UpdateExpression {
                operator,
                prefix,
                argument,
            } => self.compile_update(operator, *prefix, argument, pos),
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => self.compile_binary(operator, left, right, pos),
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => self.compile_assignment(operator, left, right, pos),
            NodeKind::LogicalExpression {
                operator,
                left,
                right,
            } => self.compile_logical(operator, left, right, pos),
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                let test = self.compile(test)?;
                let consequent = self.compile(consequent)?;
                let alternate = self.compile(alternate)?;
                Ok(closure(move |interp| {
                    if super::helpers::to_boolean(&test(interp)?.value()) {
                        consequent(interp)
                    } else {
                        alternate(interp)
                    }
                }))
            }
            NodeKind::NewExpression { callee, arguments } => {
                self.compile_new(callee, arguments, pos)
            }
            NodeKind::SequenceExpression { expressions } => {
                let expressions = expressions
                    .iter()
                    .map(|e| self.compile(e))
                    .collect::<CResult<Vec<_>>>()?;
                Ok(closure(move |interp| {
                    let mut last = JsValue::Undefined;
                    for expr in &expressions {
                        last = expr(interp)?.value();
                    }
                    Ok(Completion::Value(last))
                }))
            }
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            } => self.compile_template(quasis, expressions),
            NodeKind::TaggedTemplateExpression { tag, quasi } => {
                self.compile_tagged_template(tag, quasi, pos)
            }
            NodeKind::MemberExpression { .. }
            | NodeKind::CallExpression { .. }
            | NodeKind::ChainExpression { .. } => self.compile_chain_root(node),
            NodeKind::SpreadElement { .. }
            | NodeKind::TemplateElement { .. }
            | NodeKind::Property { .. }
            | NodeKind::ClassBody { .. }
            | NodeKind::MethodDefinition { .. }
            | NodeKind::PropertyDefinition { .. }
            | NodeKind::CatchClause { .. }
            | NodeKind::VariableDeclarator { .. }
            | NodeKind::ObjectPattern { .. }
            | NodeKind::ArrayPattern { .. }
            | NodeKind::RestElement { .. }
            | NodeKind::AssignmentPattern { .. }
            | NodeKind::Unknown
            | NodeKind::Unsupported(_) => Err(CompileError::new(
                Message::NodeType,
                node.type_name(),
                pos,
            )),
        }
    }

    /// Compiles a function or program body: lexical frame, hoisted function declarations and
    /// the statement list.
    fn compile_body(
        &mut self,
        statements: &[Node],
    ) -> CResult<(Closure, LexFrame, Vec<(JsString, Rc<FunctionTemplate>)>)> {
        let frame = scan_lexical(statements);
        self.push_frame(frame.clone());
        let funcs = self.compile_function_declarations(statements)?;
        let body = self.compile_statements(statements)?;
        self.pop_frame();
        Ok((body, frame, funcs))
    }

    fn compile_function_declarations(
        &mut self,
        statements: &[Node],
    ) -> CResult<Vec<(JsString, Rc<FunctionTemplate>)>> {
        let mut funcs = Vec::new();
        for statement in statements {
            match &statement.kind {
                NodeKind::FunctionDeclaration(func) => {
                    let name = func
                        .id
                        .as_deref()
                        .and_then(Node::identifier_name)
                        .map(JsString::from)
                        .unwrap_or_default();
                    let template = self.compile_function(statement, func, name.clone(), true, false)?;
                    funcs.retain(|(n, _)| *n != name);
                    funcs.push((name, template));
                }
                NodeKind::Group(inner) => funcs.extend(self.compile_function_declarations(inner)?),
                _ => {}
            }
        }
        Ok(funcs)
    }

    pub(crate) fn compile_statements(&mut self, statements: &[Node]) -> CResult<Closure> {
        let list = statements
            .iter()
            .filter(|s| !matches!(s.kind, NodeKind::FunctionDeclaration(_)))
            .map(|s| self.compile(s))
            .collect::<CResult<Vec<_>>>()?;
        Ok(closure(move |interp| {
            let mut last = Completion::Empty;
            for statement in &list {
                match statement(interp)? {
                    Completion::Empty | Completion::DefaultCase => {}
                    value @ Completion::Value(_) => last = value,
                    abrupt => return Ok(abrupt),
                }
            }
            Ok(last)
        }))
    }

    fn compile_literal(
        &mut self,
        value: &serde_json::Value,
        regex: Option<&crate::ast::RegexLiteral>,
    ) -> CResult<Closure> {
        if let Some(regex) = regex {
            let pattern = regex.pattern.clone();
            let flags = regex.flags.clone();
            return Ok(closure(move |interp| {
                interp.create_regexp(&pattern, &flags).map(Completion::Value)
            }));
        }
        let value = literal_value(value);
        Ok(closure(move |_| Ok(Completion::Value(value.clone()))))
    }

    pub(crate) fn compile_key(&mut self, key: &Node, computed: bool) -> CResult<KeyFn> {
        if computed {
            return Ok(KeyFn::Computed(self.compile(key)?));
        }
        Ok(match &key.kind {
            NodeKind::Identifier { name } => KeyFn::Static(PropertyKey::from(name.as_str())),
            NodeKind::Literal { value, .. } => {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => {
                        number_ops::to_string(n.as_f64().unwrap_or(f64::NAN))
                    }
                    other => other.to_string(),
                };
                KeyFn::Static(PropertyKey::from(JsString::from(text)))
            }
            _ => KeyFn::Computed(self.compile(key)?),
        })
    }
}

pub(crate) fn literal_value(value: &serde_json::Value) -> JsValue {
    match value {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Boolean(*b),
        serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsValue::from(s.as_str()),
        _ => JsValue::Undefined,
    }
}

/// Names bound by a declaration pattern, in source order.
pub(crate) fn pattern_names(node: &Node, out: &mut Vec<JsString>) {
    match &node.kind {
        NodeKind::Identifier { name } => out.push(JsString::from(name.as_str())),
        NodeKind::ObjectPattern { properties } => {
            for prop in properties {
                match &prop.kind {
                    NodeKind::Property { value, .. } => pattern_names(value, out),
                    NodeKind::RestElement { argument } => pattern_names(argument, out),
                    _ => {}
                }
            }
        }
        NodeKind::ArrayPattern { elements } => {
            for element in elements.iter().flatten() {
                pattern_names(element, out);
            }
        }
        NodeKind::RestElement { argument } => pattern_names(argument, out),
        NodeKind::AssignmentPattern { left, .. } => pattern_names(left, out),
        _ => {}
    }
}

/// `let`, `const` and class names declared directly in `statements`.
pub(crate) fn scan_lexical(statements: &[Node]) -> LexFrame {
    let mut frame = LexFrame::default();
    for statement in statements {
        collect_lexical(statement, &mut frame);
    }
    frame
}

fn collect_lexical(statement: &Node, frame: &mut LexFrame) {
    match &statement.kind {
        NodeKind::VariableDeclaration { declarations, kind } => {
            let kind = match kind {
                VariableKind::Var => return,
                VariableKind::Let => LexKind::Let,
                VariableKind::Const => LexKind::Const,
            };
            let mut names = Vec::new();
            for declarator in declarations {
                if let NodeKind::VariableDeclarator { id, .. } = &declarator.kind {
                    pattern_names(id, &mut names);
                }
            }
            frame.names.extend(names.into_iter().map(|n| (n, kind)));
        }
        NodeKind::ClassDeclaration(class) => {
            if let Some(name) = class.id.as_deref().and_then(Node::identifier_name) {
                frame.names.push((JsString::from(name), LexKind::Let));
            }
        }
        NodeKind::Group(inner) => {
            for statement in inner {
                collect_lexical(statement, frame);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::UnaryOperator;
    use crate::parser::{ParseOptions, parse};

    fn negations(depth: usize) -> Node {
        let mut node = Node::synthetic(NodeKind::Literal {
            value: serde_json::json!(1),
            raw: None,
            regex: None,
        });
        for _ in 0..depth {
            node = Node::synthetic(NodeKind::UnaryExpression {
                operator: UnaryOperator::Minus,
                prefix: true,
                argument: Box::new(node),
            });
        }
        node
    }

    fn program(src: &str) -> CResult<Program> {
        let node = parse(src, &ParseOptions::default()).unwrap();
        Compiler::new(Some(Rc::from(src))).compile_program(&node)
    }

    #[test]
    fn hoists_vars_and_functions() {
        let program = program("var a = 1; function f() { var inner; } { var b; let c; }").unwrap();
        let vars: Vec<String> = program.hoisted.vars.iter().map(|v| v.to_string()).collect();
        assert_eq!(vars, vec!["a", "b"]);
        assert_eq!(program.hoisted.funcs.len(), 1);
        assert!(program.hoisted.lexical.is_empty());
    }

    #[test]
    fn collects_top_level_lexical_names() {
        let program = program("let x = 1; const { y, z: [w] } = o; class K {}").unwrap();
        let names: Vec<String> = program
            .hoisted
            .lexical
            .names
            .iter()
            .map(|(n, _)| n.to_string())
            .collect();
        assert_eq!(names, vec!["x", "y", "w", "K"]);
    }

    #[test]
    fn var_after_let_in_same_frame_is_rejected() {
        let err = program("{ let a = 1; { var a = 2; } }").err().unwrap();
        assert!(matches!(err, CompileError::Guest { .. }));
    }

    #[test]
    fn unknown_nodes_are_fatal() {
        let node = Node::synthetic(NodeKind::Unsupported("ForOfStatement".to_string()));
        let err = Compiler::new(None).compile_program(&node).err().unwrap();
        match err {
            CompileError::Interrupt(e) => {
                assert_eq!(e.message, "Unknown node type: ForOfStatement")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn const_without_initializer_is_fatal() {
        let node = Node::from_json(
            r#"{"type":"Program","start":0,"end":8,"body":[{"type":"VariableDeclaration",
            "start":0,"end":8,"kind":"const","declarations":[{"type":"VariableDeclarator",
            "start":6,"end":7,"id":{"type":"Identifier","start":6,"end":7,"name":"a"},
            "init":null}]}]}"#,
        )
        .unwrap();
        let err = Compiler::new(None).compile_program(&node).err().unwrap();
        assert!(matches!(err, CompileError::Interrupt(_)));
    }

    #[test]
    fn deeply_nested_trees_are_rejected() {
        assert!(Compiler::new(None).compile_program(&negations(200)).is_ok());
        let err = Compiler::new(None)
            .compile_program(&negations(MAX_COMPILE_DEPTH + 10))
            .err()
            .unwrap();
        match err {
            CompileError::Interrupt(e) => {
                assert_eq!(e.message, format!("Program nesting exceeds {MAX_COMPILE_DEPTH} levels"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
