use crate::ast::Position;
use crate::parser::ParseError;
use crate::types::JsValue;

/// Error constructor a message is raised with inside the guest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorType {
    Error,
    TypeError,
    ReferenceError,
    SyntaxError,
    RangeError,
}

impl ErrorType {
    pub fn name(self) -> &'static str {
        match self {
            ErrorType::Error => "Error",
            ErrorType::TypeError => "TypeError",
            ErrorType::ReferenceError => "ReferenceError",
            ErrorType::SyntaxError => "SyntaxError",
            ErrorType::RangeError => "RangeError",
        }
    }
}

/// Every diagnostic the evaluator raises. Interrupting messages abort the whole evaluation and
/// cannot be caught by guest `try`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    UnknownError,
    ExecutionTimeOut,
    MaxSteps,
    MissingParser,
    NestingDepth,
    NodeType,
    BinaryOperator,
    LogicalOperator,
    UnaryOperator,
    UpdateOperator,
    ObjectStructure,
    AssignmentExpression,
    VariableType,
    ParamType,
    AssignmentType,
    FunctionUndefined,
    VariableUndefined,
    IsNotConstructor,
    UseBeforeInitialization,
    RedeclareBlockScopeVariable,
    ConstNotInitialized,
    ConstChange,
    BuiltInPrototypeChange,
    UnknownVariableDeclType,
    SpreadPatternVariableNoInit,
    NormalError,
    NotIterable,
    TypeMismatch,
    Range,
}

impl Message {
    /// `(code, template, error type, interrupts)`.
    fn entry(self) -> (u32, &'static str, ErrorType, bool) {
        use ErrorType::*;
        match self {
            Message::UnknownError => (3001, "%0", Error, true),
            Message::ExecutionTimeOut => (3002, "Script execution timed out after %0ms", Error, true),
            Message::MaxSteps => (3003, "Script execution exceeded maximum of %0 steps", Error, true),
            Message::MissingParser => (3004, "Option \"parse\" is required", Error, true),
            Message::NestingDepth => (3005, "Program nesting exceeds %0 levels", RangeError, true),
            Message::NodeType => (1001, "Unknown node type: %0", ReferenceError, true),
            Message::BinaryOperator => (1002, "Unknown binary operator: %0", ReferenceError, true),
            Message::LogicalOperator => (1003, "Unknown logical operator: %0", ReferenceError, true),
            Message::UnaryOperator => (1004, "Unknown unary operator: %0", ReferenceError, true),
            Message::UpdateOperator => (1005, "Unknown update operator: %0", ReferenceError, true),
            Message::ObjectStructure => (1006, "Unknown object structure: %0", ReferenceError, true),
            Message::AssignmentExpression => {
                (1007, "Unknown assignment expression: %0", ReferenceError, true)
            }
            Message::VariableType => (1008, "Unknown variable type: %0", ReferenceError, true),
            Message::ParamType => (1009, "Unknown param type: %0", ReferenceError, true),
            Message::AssignmentType => (1010, "Unknown assignment type: %0", ReferenceError, true),
            Message::FunctionUndefined => (2001, "%0 is not a function", TypeError, false),
            Message::VariableUndefined => (2002, "%0 is not defined", ReferenceError, false),
            Message::IsNotConstructor => (2003, "%0 is not a constructor", TypeError, false),
            Message::UseBeforeInitialization => {
                (2004, "Cannot access '%0' before initialization", ReferenceError, false)
            }
            Message::RedeclareBlockScopeVariable => {
                (2005, "Cannot redeclare block-scoped variable '%0'", ReferenceError, false)
            }
            Message::ConstNotInitialized => {
                (2006, "const '%0' declarations must be initialized.", Error, true)
            }
            Message::ConstChange => {
                (2007, "Cannot assign to '%0' because it is a constant.", TypeError, false)
            }
            Message::BuiltInPrototypeChange => (
                2012,
                "Cannot modify prototype of '%0' because it is a built-in object.",
                TypeError,
                false,
            ),
            Message::UnknownVariableDeclType => {
                (2008, "Unknown variable declarator type '%0'.", ReferenceError, true)
            }
            Message::SpreadPatternVariableNoInit => {
                (2009, "no init in Rest Pattern Variable.", ReferenceError, true)
            }
            Message::NormalError => (2010, "%0", ReferenceError, false),
            Message::NotIterable => (2011, "%0 is not iterable", TypeError, false),
            Message::TypeMismatch => (2013, "%0", TypeError, false),
            Message::Range => (2014, "%0", RangeError, false),
        }
    }

    pub fn code(self) -> u32 {
        self.entry().0
    }

    pub fn error_type(self) -> ErrorType {
        self.entry().2
    }

    pub fn interrupts(self) -> bool {
        self.entry().3
    }

    /// Fills `%0` and appends ` [line:column]` when a position is known.
    pub fn render(self, arg: &str, position: Option<Position>) -> String {
        let mut text = self.entry().1.replace("%0", arg);
        if let Some(pos) = position {
            text.push(' ');
            text.push_str(&pos.to_string());
        }
        text
    }
}

/// Fatal condition that unwinds the whole evaluation, skipping guest `catch` and `finally`.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct InterruptError {
    pub code: u32,
    pub kind: &'static str,
    pub message: String,
}

impl InterruptError {
    pub fn new(message: Message, arg: &str, position: Option<Position>) -> Self {
        Self {
            code: message.code(),
            kind: message.error_type().name(),
            message: message.render(arg, position),
        }
    }
}

/// Failure flowing out of a closure: either a guest exception or an interrupt.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("uncaught {0:?}")]
    Throw(JsValue),
    #[error(transparent)]
    Interrupt(#[from] InterruptError),
}

impl EvalError {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, EvalError::Interrupt(_))
    }
}

/// Failure found while compiling an AST, before any of it runs.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Interrupt(#[from] InterruptError),
    /// Raised in the guest as `kind` when the unit is compiled by `eval`.
    #[error("{}: {message}", kind.name())]
    Guest { kind: ErrorType, message: String },
}

impl CompileError {
    pub fn new(message: Message, arg: &str, position: Option<Position>) -> Self {
        if message.interrupts() {
            CompileError::Interrupt(InterruptError::new(message, arg, position))
        } else {
            CompileError::Guest {
                kind: message.error_type(),
                message: message.render(arg, position),
            }
        }
    }
}

/// Errors returned to the host by `evaluate` and friends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A guest exception nobody caught. `message` is the rendered `name: message` text when the
    /// value is an error object, or its string form otherwise.
    #[error("{message}")]
    Uncaught { value: JsValue, message: String },
    #[error(transparent)]
    Interrupt(#[from] InterruptError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn value(&self) -> Option<&JsValue> {
        match self {
            Error::Uncaught { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, Error::Interrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_template_and_position() {
        let pos = Position { line: 2, column: 4 };
        assert_eq!(
            Message::VariableUndefined.render("x", Some(pos)),
            "x is not defined [2:4]"
        );
        assert_eq!(
            Message::ExecutionTimeOut.render("100", None),
            "Script execution timed out after 100ms"
        );
    }

    #[test]
    fn interrupt_classification() {
        assert!(Message::MaxSteps.interrupts());
        assert!(Message::NodeType.interrupts());
        assert!(!Message::ConstChange.interrupts());
        assert_eq!(Message::IsNotConstructor.error_type(), ErrorType::TypeError);
        let err = CompileError::new(Message::RedeclareBlockScopeVariable, "a", None);
        assert!(matches!(err, CompileError::Guest { kind: ErrorType::ReferenceError, .. }));
    }

    #[test]
    fn interrupt_display_includes_kind() {
        let err = InterruptError::new(Message::NodeType, "ForOfStatement", None);
        assert_eq!(err.to_string(), "ReferenceError: Unknown node type: ForOfStatement");
        assert_eq!(err.code, 1001);
    }
}
