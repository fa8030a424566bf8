use super::{BindTarget, CResult, Compiler, closure, guarded, pattern_names, scan_lexical};
use crate::ast::{Node, NodeKind, VariableKind};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{CompileError, EvalError, Message};
use crate::interpreter::helpers::to_boolean;
use crate::interpreter::scope::{Scope, ScopeKind};
use crate::interpreter::signal::{Closure, Completion};
use crate::interpreter::types::{Binder, LexFrame, ObjectData, JsObject, PropertyKey};
use crate::types::{JsString, JsValue};

/// What a loop does with one body completion: `None` to run the next iteration, or the
/// completion that ends the loop.
fn loop_flow(result: Completion, labels: &[JsString], last: &mut Completion) -> Option<Completion> {
    match result {
        Completion::Break => Some(std::mem::replace(last, Completion::Empty)),
        Completion::Continue | Completion::Empty | Completion::DefaultCase => None,
        Completion::ContinueLabel(ref label) if labels.contains(label) => None,
        Completion::Value(v) => {
            *last = Completion::Value(v);
            None
        }
        abrupt => Some(abrupt),
    }
}

fn test_passes(interp: &mut Interpreter, test: &Option<Closure>) -> Result<bool, EvalError> {
    match test {
        Some(test) => Ok(to_boolean(&test(interp)?.value())),
        None => Ok(true),
    }
}

impl Compiler {
    pub(crate) fn compile_expression_statement(&mut self, expression: &Node) -> CResult<Closure> {
        let expression = self.compile(expression)?;
        Ok(closure(move |interp| {
            let value = expression(interp)?.value();
            if interp.call_stack.is_empty() {
                interp.value = value.clone();
            }
            Ok(Completion::Value(value))
        }))
    }

    pub(crate) fn compile_block(&mut self, body: &[Node]) -> CResult<Closure> {
        let frame = scan_lexical(body);
        self.push_frame(frame.clone());
        let funcs = self.compile_function_declarations(body);
        let statements = self.compile_statements(body);
        self.pop_frame();
        let (funcs, statements) = (funcs?, statements?);
        if frame.is_empty() && funcs.is_empty() {
            return Ok(statements);
        }
        Ok(closure(move |interp| {
            let saved = interp.scope.clone();
            let block = Scope::with_frame(ScopeKind::Block, saved.clone(), &frame);
            interp.scope = block.clone();
            interp.instantiate_functions(&funcs, &block);
            let result = statements(interp);
            interp.scope = saved;
            result
        }))
    }

    pub(crate) fn compile_with(&mut self, object: &Node, body: &Node) -> CResult<Closure> {
        let object = self.compile(object)?;
        let body = self.compile(body)?;
        Ok(closure(move |interp| {
            let value = object(interp)?.value();
            let target = interp.to_object(&value)?;
            let saved = interp.scope.clone();
            interp.scope = Scope::new(ScopeKind::With, Some(saved.clone()), target);
            let result = body(interp);
            interp.scope = saved;
            result
        }))
    }

    pub(crate) fn compile_return(&mut self, argument: Option<&Node>) -> CResult<Closure> {
        let argument = argument.map(|a| self.compile(a)).transpose()?;
        Ok(closure(move |interp| {
            let value = match &argument {
                Some(arg) => arg(interp)?.value(),
                None => JsValue::Undefined,
            };
            Ok(Completion::Return(value))
        }))
    }

    pub(crate) fn compile_if(
        &mut self,
        test: &Node,
        consequent: &Node,
        alternate: Option<&Node>,
    ) -> CResult<Closure> {
        let test = self.compile(test)?;
        let consequent = self.compile(consequent)?;
        let alternate = alternate.map(|a| self.compile(a)).transpose()?;
        Ok(closure(move |interp| {
            if to_boolean(&test(interp)?.value()) {
                consequent(interp)
            } else if let Some(alternate) = &alternate {
                alternate(interp)
            } else {
                Ok(Completion::Empty)
            }
        }))
    }

    /// `label: body`. Nested labels accumulate so a labeled loop knows every name it answers
    /// `continue` for.
    pub(crate) fn compile_labeled(&mut self, node: &Node, mut labels: Vec<JsString>) -> CResult<Closure> {
        let NodeKind::LabeledStatement { label, body } = &node.kind else {
            return self.compile(node);
        };
        let name = JsString::from(label.identifier_name().unwrap_or_default());
        labels.push(name.clone());
        let body = match &body.kind {
            NodeKind::LabeledStatement { .. } => self.compile_labeled(body, labels)?,
            NodeKind::WhileStatement { .. }
            | NodeKind::DoWhileStatement { .. }
            | NodeKind::ForStatement { .. }
            | NodeKind::ForInStatement { .. } => {
                let pos = body.position();
                guarded(pos, self.compile_loop(body, labels)?)
            }
            _ => self.compile(body)?,
        };
        Ok(closure(move |interp| {
            let scope = interp.scope.clone();
            scope.borrow_mut().label_stack.push(name.clone());
            let result = body(interp);
            scope.borrow_mut().label_stack.pop();
            match result? {
                Completion::BreakLabel(l) if l == name => Ok(Completion::Empty),
                other => Ok(other),
            }
        }))
    }

    pub(crate) fn compile_switch(&mut self, discriminant: &Node, cases: &[Node]) -> CResult<Closure> {
        let discriminant = self.compile(discriminant)?;
        let consequents: Vec<Node> = cases
            .iter()
            .flat_map(|c| match &c.kind {
                NodeKind::SwitchCase { consequent, .. } => consequent.clone(),
                _ => Vec::new(),
            })
            .collect();
        let frame = scan_lexical(&consequents);
        self.push_frame(frame.clone());
        let compiled = self.compile_switch_cases(cases, &consequents);
        self.pop_frame();
        let (funcs, tests, bodies) = compiled?;
        Ok(closure(move |interp| {
            let value = discriminant(interp)?.value();
            let saved = interp.scope.clone();
            if !frame.is_empty() || !funcs.is_empty() {
                let block = Scope::with_frame(ScopeKind::Block, saved.clone(), &frame);
                interp.scope = block.clone();
                interp.instantiate_functions(&funcs, &block);
            }
            let result = run_switch(interp, &value, &tests, &bodies);
            interp.scope = saved;
            result
        }))
    }

    #[allow(clippy::type_complexity)]
    fn compile_switch_cases(
        &mut self,
        cases: &[Node],
        consequents: &[Node],
    ) -> CResult<(
        Vec<(JsString, std::rc::Rc<crate::interpreter::types::FunctionTemplate>)>,
        Vec<Closure>,
        Vec<Closure>,
    )> {
        let funcs = self.compile_function_declarations(consequents)?;
        let mut tests = Vec::with_capacity(cases.len());
        let mut bodies = Vec::with_capacity(cases.len());
        for case in cases {
            let NodeKind::SwitchCase { consequent, .. } = &case.kind else {
                return Err(CompileError::new(Message::NodeType, case.type_name(), case.position()));
            };
            tests.push(self.compile(case)?);
            bodies.push(self.compile_statements(consequent)?);
        }
        Ok((funcs, tests, bodies))
    }

    pub(crate) fn compile_try(
        &mut self,
        block: &Node,
        handler: Option<&Node>,
        finalizer: Option<&Node>,
    ) -> CResult<Closure> {
        let block = self.compile(block)?;
        let handler = match handler {
            Some(Node {
                kind: NodeKind::CatchClause { param, body },
                ..
            }) => {
                let bind = param
                    .as_deref()
                    .map(|p| self.compile_binder(p, BindTarget::Param))
                    .transpose()?;
                Some((bind, self.compile(body)?))
            }
            Some(other) => {
                return Err(CompileError::new(Message::NodeType, other.type_name(), other.position()));
            }
            None => None,
        };
        let finalizer = finalizer.map(|f| self.compile(f)).transpose()?;
        Ok(closure(move |interp| {
            let scope = interp.scope.clone();
            let context = interp.context.clone();
            let stack = interp.call_stack.len();
            let mut result = block(interp);
            if let (Err(EvalError::Throw(thrown)), Some((bind, body))) = (&result, &handler) {
                let thrown = thrown.clone();
                interp.call_stack.truncate(stack);
                interp.context = context.clone();
                interp.scope = Scope::new(
                    ScopeKind::Block,
                    Some(scope.clone()),
                    JsObject::from_data(ObjectData::new()),
                );
                result = match bind {
                    Some(bind) => bind(interp, thrown).and_then(|_| body(interp)),
                    None => body(interp),
                };
                interp.scope = scope.clone();
            }
            if matches!(result, Err(EvalError::Interrupt(_))) {
                return result;
            }
            if let Some(finalizer) = &finalizer {
                interp.call_stack.truncate(stack);
                interp.scope = scope;
                interp.context = context;
                match finalizer(interp)? {
                    abrupt if abrupt.is_abrupt() => return Ok(abrupt),
                    _ => {}
                }
            }
            result
        }))
    }

    pub(crate) fn compile_loop(&mut self, node: &Node, labels: Vec<JsString>) -> CResult<Closure> {
        match &node.kind {
            NodeKind::WhileStatement { test, body } => {
                let test = self.compile(test)?;
                let body = self.compile(body)?;
                Ok(closure(move |interp| {
                    let mut last = Completion::Empty;
                    while to_boolean(&test(interp)?.value()) {
                        if let Some(exit) = loop_flow(body(interp)?, &labels, &mut last) {
                            return Ok(exit);
                        }
                    }
                    Ok(last)
                }))
            }
            NodeKind::DoWhileStatement { body, test } => {
                let body = self.compile(body)?;
                let test = self.compile(test)?;
                Ok(closure(move |interp| {
                    let mut last = Completion::Empty;
                    loop {
                        if let Some(exit) = loop_flow(body(interp)?, &labels, &mut last) {
                            return Ok(exit);
                        }
                        if !to_boolean(&test(interp)?.value()) {
                            return Ok(last);
                        }
                    }
                }))
            }
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                let frame = match init.as_deref() {
                    Some(decl)
                        if matches!(
                            &decl.kind,
                            NodeKind::VariableDeclaration { kind, .. } if *kind != VariableKind::Var
                        ) =>
                    {
                        scan_lexical(std::slice::from_ref(decl))
                    }
                    _ => LexFrame::default(),
                };
                self.push_frame(frame.clone());
                let parts = self.compile_for_parts(init.as_deref(), test.as_deref(), update.as_deref(), body);
                self.pop_frame();
                let (init, test, update, body) = parts?;
                Ok(closure(move |interp| {
                    let saved = interp.scope.clone();
                    let per_iteration = !frame.is_empty();
                    if per_iteration {
                        interp.scope = Scope::with_frame(ScopeKind::Block, saved.clone(), &frame);
                    }
                    let run = |interp: &mut Interpreter| -> Result<Completion, EvalError> {
                        if let Some(init) = &init {
                            init(interp)?;
                        }
                        let mut last = Completion::Empty;
                        while test_passes(interp, &test)? {
                            if let Some(exit) = loop_flow(body(interp)?, &labels, &mut last) {
                                return Ok(exit);
                            }
                            if per_iteration {
                                interp.scope = Scope::fork(&interp.scope);
                            }
                            if let Some(update) = &update {
                                update(interp)?;
                            }
                        }
                        Ok(last)
                    };
                    let result = run(interp);
                    interp.scope = saved;
                    result
                }))
            }
            NodeKind::ForInStatement { left, right, body } => {
                let right = self.compile(right)?;
                let (bind, frame) = self.compile_for_in_target(left)?;
                self.push_frame(frame.clone());
                let body = self.compile(body);
                self.pop_frame();
                let body = body?;
                Ok(closure(move |interp| {
                    let value = right(interp)?.value();
                    if value.is_nullish() {
                        return Ok(Completion::Empty);
                    }
                    let object = interp.to_object(&value)?;
                    let keys = object.enumerable_keys_with_proto();
                    let mut last = Completion::Empty;
                    for key in keys {
                        if !object.has_property(&PropertyKey::from(key.clone())) {
                            continue;
                        }
                        let saved = interp.scope.clone();
                        if !frame.is_empty() {
                            interp.scope = Scope::with_frame(ScopeKind::Block, saved.clone(), &frame);
                        }
                        let result = bind(interp, JsValue::String(key)).and_then(|_| body(interp));
                        interp.scope = saved;
                        if let Some(exit) = loop_flow(result?, &labels, &mut last) {
                            return Ok(exit);
                        }
                    }
                    Ok(last)
                }))
            }
            _ => self.compile(node),
        }
    }

    #[allow(clippy::type_complexity)]
    fn compile_for_parts(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> CResult<(Option<Closure>, Option<Closure>, Option<Closure>, Closure)> {
        Ok((
            init.map(|n| self.compile(n)).transpose()?,
            test.map(|n| self.compile(n)).transpose()?,
            update.map(|n| self.compile(n)).transpose()?,
            self.compile(body)?,
        ))
    }

    /// Binder for the left side of `for (left in ...)`, plus the lexical frame each iteration
    /// opens for `let`/`const` heads.
    fn compile_for_in_target(&mut self, left: &Node) -> CResult<(Binder, LexFrame)> {
        let NodeKind::VariableDeclaration { declarations, kind } = &left.kind else {
            return Ok((self.compile_binder(left, BindTarget::Assign)?, LexFrame::default()));
        };
        let Some(NodeKind::VariableDeclarator { id, .. }) = declarations.first().map(|d| &d.kind)
        else {
            return Err(CompileError::new(
                Message::UnknownVariableDeclType,
                left.type_name(),
                left.position(),
            ));
        };
        match kind {
            VariableKind::Var => {
                let mut names = Vec::new();
                pattern_names(id, &mut names);
                for name in &names {
                    self.declare_var(name, left.position())?;
                }
                Ok((self.compile_binder(id, BindTarget::Var)?, LexFrame::default()))
            }
            VariableKind::Let | VariableKind::Const => {
                let frame = scan_lexical(std::slice::from_ref(left));
                Ok((self.compile_binder(id, BindTarget::Lexical)?, frame))
            }
        }
    }

    pub(crate) fn compile_variable_declaration(
        &mut self,
        declarations: &[Node],
        kind: VariableKind,
    ) -> CResult<Closure> {
        let mut steps: Vec<(Binder, Option<Closure>)> = Vec::with_capacity(declarations.len());
        for declarator in declarations {
            let pos = declarator.position();
            let NodeKind::VariableDeclarator { id, init } = &declarator.kind else {
                return Err(CompileError::new(
                    Message::UnknownVariableDeclType,
                    declarator.type_name(),
                    pos,
                ));
            };
            if kind == VariableKind::Var {
                let mut names = Vec::new();
                pattern_names(id, &mut names);
                for name in &names {
                    self.declare_var(name, pos)?;
                }
            }
            let is_identifier = id.identifier_name().is_some();
            if init.is_none() {
                if kind == VariableKind::Const {
                    return Err(CompileError::new(
                        Message::ConstNotInitialized,
                        &self.text(id),
                        pos,
                    ));
                }
                if !is_identifier {
                    return Err(CompileError::new(Message::SpreadPatternVariableNoInit, "", pos));
                }
            }
            let value = match (init.as_deref(), id.identifier_name()) {
                (Some(init), Some(name)) => Some(self.compile_named(init, name, true)?),
                (Some(init), None) => Some(self.compile(init)?),
                (None, _) => None,
            };
            let target = match kind {
                VariableKind::Var => BindTarget::Var,
                VariableKind::Let | VariableKind::Const => BindTarget::Lexical,
            };
            // `var x;` leaves an existing value alone.
            if kind == VariableKind::Var && value.is_none() {
                continue;
            }
            steps.push((self.compile_binder(id, target)?, value));
        }
        Ok(closure(move |interp| {
            for (bind, value) in &steps {
                let value = match value {
                    Some(value) => value(interp)?.value(),
                    None => JsValue::Undefined,
                };
                bind(interp, value)?;
            }
            Ok(Completion::Empty)
        }))
    }
}

fn run_switch(
    interp: &mut Interpreter,
    value: &JsValue,
    tests: &[Closure],
    bodies: &[Closure],
) -> Result<Completion, EvalError> {
    let mut start = None;
    let mut default = None;
    for (i, test) in tests.iter().enumerate() {
        let outcome = test(interp)?;
        if matches!(outcome, Completion::DefaultCase) {
            default = Some(i);
        } else if outcome.value().strict_equals(value) {
            start = Some(i);
            break;
        }
    }
    let Some(start) = start.or(default) else {
        return Ok(Completion::Empty);
    };
    let mut last = Completion::Empty;
    for body in &bodies[start..] {
        match body(interp)? {
            Completion::Break => break,
            Completion::Empty | Completion::DefaultCase => {}
            value @ Completion::Value(_) => last = value,
            abrupt => return Ok(abrupt),
        }
    }
    Ok(last)
}
