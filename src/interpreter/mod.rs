use crate::ast::{Node, Position};
use crate::parser::{ParseError, ParseOptions};
use crate::types::{JsString, JsValue};
use std::rc::Rc;

mod builtins;
mod call;
pub mod compile;
pub mod error;
pub mod guard;
mod helpers;
pub mod sandbox;
pub mod scope;
pub mod signal;
pub mod types;

pub use compile::Program;
pub use error::{Error, EvalError, InterruptError};
pub use scope::{ScopeKind, ScopeRef};
pub use types::{JsFunction, JsObject, ObjectData, PropertyDescriptor, PropertyKey};

use compile::Compiler;
use error::{CompileError, Message};
use guard::Budget;
use sandbox::Realm;
use scope::{Scope, variable_scope};
use signal::Completion;
use types::Hoisted;

pub type ParseFn = Rc<dyn Fn(&str, &ParseOptions) -> Result<Node, ParseError>>;

/// Per-evaluation policy.
#[derive(Clone)]
pub struct EvalOptions {
    pub ecma_version: String,
    /// Wall-clock limit in milliseconds; `0` disables it.
    pub timeout: u64,
    pub max_steps: u64,
    pub max_call_depth: usize,
    /// Object whose properties are visible between the built-ins and the bindings.
    pub root_context: Option<JsObject>,
    /// `this` of a bare function call.
    pub global_context_in_function: JsValue,
    pub parse: Option<ParseFn>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            ecma_version: "latest".to_string(),
            timeout: 100,
            max_steps: 1024,
            max_call_depth: 256,
            root_context: None,
            global_context_in_function: JsValue::Undefined,
            parse: None,
        }
    }
}

impl EvalOptions {
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_ecma_version(mut self, version: impl Into<String>) -> Self {
        self.ecma_version = version.into();
        self
    }

    pub fn with_root_context(mut self, root: JsObject) -> Self {
        self.root_context = Some(root);
        self
    }

    pub fn with_global_context_in_function(mut self, this: JsValue) -> Self {
        self.global_context_in_function = this;
        self
    }

    pub fn with_parser(mut self, parse: ParseFn) -> Self {
        self.parse = Some(parse);
        self
    }

    /// Uses the built-in parser unless one is already configured.
    pub fn with_default_parser(mut self) -> Self {
        if self.parse.is_none() {
            self.parse = Some(Rc::new(crate::parser::parse));
        }
        self
    }
}

impl std::fmt::Debug for EvalOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalOptions")
            .field("ecma_version", &self.ecma_version)
            .field("timeout", &self.timeout)
            .field("max_steps", &self.max_steps)
            .field("max_call_depth", &self.max_call_depth)
            .field("root_context", &self.root_context)
            .field("global_context_in_function", &self.global_context_in_function)
            .field("parse", &self.parse.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Program input: source text for the configured parser, or an already parsed AST.
#[derive(Debug, Clone)]
pub enum Source {
    Text(String),
    Ast(Node),
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::Text(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::Text(s)
    }
}

impl From<Node> for Source {
    fn from(node: Node) -> Self {
        Source::Ast(node)
    }
}

/// Execution state swapped out by nested `eval`.
pub(crate) struct Frame {
    pub scope: ScopeRef,
    pub context: JsValue,
    pub value: JsValue,
    pub call_stack: Vec<JsString>,
}

pub struct Interpreter {
    pub(crate) realm: Realm,
    pub(crate) options: EvalOptions,
    pub(crate) budget: Rc<Budget>,
    pub(crate) bindings: JsObject,
    pub(crate) super_scope: ScopeRef,
    pub(crate) global_scope: ScopeRef,
    pub(crate) scope: ScopeRef,
    /// Current `this`.
    pub(crate) context: JsValue,
    /// Last value produced by a top-level expression statement.
    pub(crate) value: JsValue,
    pub(crate) call_stack: Vec<JsString>,
    pub(crate) depth: usize,
    pub(crate) last_position: Option<Position>,
    pub(crate) new_target: Option<JsObject>,
    /// Arrays being joined, so cyclic arrays stringify their back-references as "".
    pub(crate) join_stack: Vec<usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Builds the built-in registry and binds an empty bindings object with default options.
    pub fn new() -> Self {
        let bindings = JsObject::new();
        let placeholder = Scope::new(ScopeKind::Super, None, JsObject::new());
        let options = EvalOptions::default();
        let mut interp = Self {
            realm: Realm::new(),
            budget: Budget::new(options.max_steps, options.timeout),
            options: options.clone(),
            bindings: bindings.clone(),
            super_scope: placeholder.clone(),
            global_scope: placeholder.clone(),
            scope: placeholder,
            context: JsValue::Undefined,
            value: JsValue::Undefined,
            call_stack: Vec::new(),
            depth: 0,
            last_position: None,
            new_target: None,
            join_stack: Vec::new(),
        };
        interp.setup_globals();
        interp.realm.seal();
        interp.reset(&bindings, options);
        interp
    }

    pub fn with_options(bindings: &JsObject, options: EvalOptions) -> Self {
        let mut interp = Self::new();
        interp.reset(bindings, options);
        interp
    }

    /// Rebinds the instance to new bindings and options, reusing the built-in registry.
    pub fn reset(&mut self, bindings: &JsObject, options: EvalOptions) {
        let super_data = JsObject::new();
        {
            let mut data = super_data.borrow_mut();
            for (name, value) in self.realm.globals() {
                if bindings.has_own_property(&PropertyKey::from(name.clone())) {
                    continue;
                }
                let fixed = matches!(name.as_str(), "undefined" | "NaN" | "Infinity");
                data.insert_property(
                    name.clone(),
                    PropertyDescriptor::data(value.clone(), !fixed, false, !fixed),
                );
            }
        }
        self.super_scope = Scope::new(ScopeKind::Super, None, super_data);
        let parent = match &options.root_context {
            Some(root) => Scope::new(
                ScopeKind::Root,
                Some(self.super_scope.clone()),
                JsObject::from_data(ObjectData::with_proto(Some(root.clone()))),
            ),
            None => self.super_scope.clone(),
        };
        self.global_scope = Scope::new(ScopeKind::Global, Some(parent), bindings.clone());
        self.bindings = bindings.clone();
        self.budget = Budget::new(options.max_steps, options.timeout);
        self.options = options;
        self.clear_state();
    }

    fn clear_state(&mut self) {
        self.scope = self.global_scope.clone();
        self.context = JsValue::Object(self.bindings.clone());
        self.value = JsValue::Undefined;
        self.call_stack.clear();
        self.depth = 0;
        self.last_position = None;
        self.new_target = None;
        self.join_stack.clear();
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn bindings(&self) -> &JsObject {
        &self.bindings
    }

    pub fn global_scope(&self) -> ScopeRef {
        self.global_scope.clone()
    }

    /// Names of the functions currently executing, outermost first.
    pub fn call_stack(&self) -> &[JsString] {
        &self.call_stack
    }

    /// Parses (when given text) and runs one program against the bindings.
    pub fn evaluate(&mut self, source: impl Into<Source>) -> Result<JsValue, Error> {
        let program = self.compile(source)?;
        self.run(&program)
    }

    pub fn evaluate_node(&mut self, node: &Node) -> Result<JsValue, Error> {
        let program = self.compile_node(node, None)?;
        self.run(&program)
    }

    /// Compiles a program once so it can be run repeatedly.
    pub fn compile(&mut self, source: impl Into<Source>) -> Result<Program, Error> {
        match source.into() {
            Source::Ast(node) => self.compile_node(&node, None),
            Source::Text(text) => {
                let parse = self
                    .options
                    .parse
                    .clone()
                    .ok_or_else(|| Error::Config(Message::MissingParser.render("", None)))?;
                let options = ParseOptions {
                    ecma_version: self.options.ecma_version.clone(),
                    allow_return_outside_function: true,
                };
                let node = parse(&text, &options)?;
                self.compile_node(&node, Some(Rc::from(text.as_str())))
            }
        }
    }

    fn compile_node(&mut self, node: &Node, text: Option<Rc<str>>) -> Result<Program, Error> {
        Compiler::new(text).compile_program(node).map_err(|err| match err {
            CompileError::Interrupt(e) => Error::Interrupt(e),
            CompileError::Guest { kind, message } => {
                let value = JsValue::Object(self.create_error(kind.name(), &message));
                Error::Uncaught {
                    message: self.describe_thrown(&value),
                    value,
                }
            }
        })
    }

    /// Runs a compiled program from a fresh top-level state.
    pub fn run(&mut self, program: &Program) -> Result<JsValue, Error> {
        self.clear_state();
        self.budget.restart();
        tracing::debug!(max_steps = self.options.max_steps, "evaluation started");
        let result = self.execute(program);
        tracing::debug!(
            steps = self.budget.steps(),
            elapsed_us = self.budget.elapsed().as_micros() as u64,
            "evaluation finished"
        );
        self.scope = self.global_scope.clone();
        match result {
            Ok(value) => Ok(self.hide_global(value)),
            Err(err) => Err(self.surface(err)),
        }
    }

    /// Calls a guest function from the host with a fresh budget.
    pub fn call(&mut self, func: &JsValue, this: &JsValue, args: &[JsValue]) -> Result<JsValue, Error> {
        self.clear_state();
        self.budget.restart();
        let result = self.call_function(func, this, args);
        result.map(|v| self.hide_global(v)).map_err(|e| self.surface(e))
    }

    pub fn construct(&mut self, func: &JsValue, args: &[JsValue]) -> Result<JsValue, Error> {
        self.clear_state();
        self.budget.restart();
        let result = self.construct_value(func, args);
        result.map_err(|e| self.surface(e))
    }

    fn surface(&self, err: EvalError) -> Error {
        match err {
            EvalError::Throw(value) => Error::Uncaught {
                message: self.describe_thrown(&value),
                value,
            },
            EvalError::Interrupt(e) => Error::Interrupt(e),
        }
    }

    /// Parses and compiles nested `eval` code; failures surface inside the guest.
    pub(crate) fn compile_source(&mut self, text: &str) -> Result<Program, EvalError> {
        let Some(parse) = self.options.parse.clone() else {
            return Err(InterruptError::new(Message::MissingParser, "", None).into());
        };
        let options = ParseOptions {
            ecma_version: self.options.ecma_version.clone(),
            allow_return_outside_function: false,
        };
        let node = parse(text, &options)
            .map_err(|e| self.throw_error(error::ErrorType::SyntaxError, &e.message))?;
        Compiler::new(Some(Rc::from(text)))
            .compile_program(&node)
            .map_err(|err| match err {
                CompileError::Interrupt(e) => EvalError::Interrupt(e),
                CompileError::Guest { kind, message } => self.throw_error(kind, &message),
            })
    }

    /// Hoists a program's declarations into the current variable scope and runs its body.
    pub(crate) fn execute(&mut self, program: &Program) -> Result<JsValue, EvalError> {
        let hoisted: &Hoisted = &program.hoisted;
        let target = variable_scope(&self.scope);
        let data = target.borrow().data.clone();
        for name in &hoisted.vars {
            let key = PropertyKey::from(name.clone());
            if !data.has_own_property(&key) {
                data.borrow_mut().insert_value(name.clone(), JsValue::Undefined);
            }
        }
        self.instantiate_functions(&hoisted.funcs, &target);
        let saved = self.scope.clone();
        if !hoisted.lexical.is_empty() {
            self.scope = Scope::with_frame(ScopeKind::Block, saved.clone(), &hoisted.lexical);
        }
        let result = (program.body)(self);
        self.scope = saved;
        match result? {
            Completion::Return(v) => Ok(v),
            _ => Ok(self.value.clone()),
        }
    }

    /// Switches scope and `this`, returning what to restore.
    pub(crate) fn enter_frame(&mut self, scope: ScopeRef, context: JsValue) -> (ScopeRef, JsValue) {
        let scope = std::mem::replace(&mut self.scope, scope);
        let context = std::mem::replace(&mut self.context, context);
        (scope, context)
    }

    pub(crate) fn leave_frame(&mut self, saved: (ScopeRef, JsValue)) {
        self.scope = saved.0;
        self.context = saved.1;
    }

    pub(crate) fn swap_frame(&mut self, frame: Frame) -> Frame {
        Frame {
            scope: std::mem::replace(&mut self.scope, frame.scope),
            context: std::mem::replace(&mut self.context, frame.context),
            value: std::mem::replace(&mut self.value, frame.value),
            call_stack: std::mem::replace(&mut self.call_stack, frame.call_stack),
        }
    }
}
