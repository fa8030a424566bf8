//! ESTree-shaped syntax tree.
//!
//! Nodes deserialize from the JSON produced by ESTree parsers (acorn, espree, ...) and are also
//! what the built-in parser produces. Node kinds the evaluator does not know deserialize to
//! [`NodeKind::Unsupported`] so the compiler can report them by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.line, self.column)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLocation>,
}

impl Node {
    pub fn new(kind: NodeKind, start: usize, end: usize, loc: Option<SourceLocation>) -> Self {
        Self {
            kind,
            start,
            end,
            loc,
        }
    }

    /// A node with no source position, used for trees built by hand.
    pub fn synthetic(kind: NodeKind) -> Self {
        Self::new(kind, 0, 0, None)
    }

    pub fn position(&self) -> Option<Position> {
        self.loc.map(|l| l.start)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }
}

impl TryFrom<Value> for Node {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let start = value.get("start").and_then(Value::as_u64).unwrap_or(0) as usize;
        let end = value.get("end").and_then(Value::as_u64).unwrap_or(0) as usize;
        let loc = match value.get("loc") {
            Some(Value::Null) | None => None,
            Some(loc) => Some(SourceLocation::deserialize(loc)?),
        };
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = match NodeKind::deserialize(value)? {
            NodeKind::Unknown => NodeKind::Unsupported(type_name),
            kind => kind,
        };
        Ok(Node {
            kind,
            start,
            end,
            loc,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum NodeKind {
    // Program and statements
    Program {
        body: Vec<Node>,
    },
    ExpressionStatement {
        expression: Box<Node>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directive: Option<String>,
    },
    BlockStatement {
        body: Vec<Node>,
    },
    EmptyStatement,
    DebuggerStatement,
    WithStatement {
        object: Box<Node>,
        body: Box<Node>,
    },
    ReturnStatement {
        argument: Option<Box<Node>>,
    },
    LabeledStatement {
        label: Box<Node>,
        body: Box<Node>,
    },
    BreakStatement {
        label: Option<Box<Node>>,
    },
    ContinueStatement {
        label: Option<Box<Node>>,
    },
    IfStatement {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },
    SwitchStatement {
        discriminant: Box<Node>,
        cases: Vec<Node>,
    },
    SwitchCase {
        test: Option<Box<Node>>,
        consequent: Vec<Node>,
    },
    ThrowStatement {
        argument: Box<Node>,
    },
    TryStatement {
        block: Box<Node>,
        handler: Option<Box<Node>>,
        finalizer: Option<Box<Node>>,
    },
    CatchClause {
        param: Option<Box<Node>>,
        body: Box<Node>,
    },
    WhileStatement {
        test: Box<Node>,
        body: Box<Node>,
    },
    DoWhileStatement {
        body: Box<Node>,
        test: Box<Node>,
    },
    ForStatement {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForInStatement {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
    },
    FunctionDeclaration(Function),
    VariableDeclaration {
        declarations: Vec<Node>,
        kind: VariableKind,
    },
    VariableDeclarator {
        id: Box<Node>,
        init: Option<Box<Node>>,
    },
    ClassDeclaration(Class),

    // Expressions
    Identifier {
        name: String,
    },
    Literal {
        #[serde(default)]
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<RegexLiteral>,
    },
    ThisExpression,
    Super,
    ArrayExpression {
        elements: Vec<Option<Node>>,
    },
    ObjectExpression {
        properties: Vec<Node>,
    },
    Property {
        key: Box<Node>,
        value: Box<Node>,
        kind: PropertyKind,
        #[serde(default)]
        method: bool,
        #[serde(default)]
        shorthand: bool,
        #[serde(default)]
        computed: bool,
    },
    FunctionExpression(Function),
    ArrowFunctionExpression(Function),
    UnaryExpression {
        operator: UnaryOperator,
        #[serde(default = "default_true")]
        prefix: bool,
        argument: Box<Node>,
    },
    UpdateExpression {
        operator: UpdateOperator,
        prefix: bool,
        argument: Box<Node>,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    AssignmentExpression {
        operator: AssignmentOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
        #[serde(default)]
        optional: bool,
    },
    ChainExpression {
        expression: Box<Node>,
    },
    ConditionalExpression {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
        #[serde(default)]
        optional: bool,
    },
    NewExpression {
        callee: Box<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    SequenceExpression {
        expressions: Vec<Node>,
    },
    SpreadElement {
        argument: Box<Node>,
    },
    TemplateLiteral {
        quasis: Vec<Node>,
        expressions: Vec<Node>,
    },
    TemplateElement {
        value: TemplateValue,
        tail: bool,
    },
    TaggedTemplateExpression {
        tag: Box<Node>,
        quasi: Box<Node>,
    },
    ClassExpression(Class),
    ClassBody {
        body: Vec<Node>,
    },
    MethodDefinition {
        key: Box<Node>,
        value: Box<Node>,
        kind: MethodKind,
        #[serde(default)]
        computed: bool,
        #[serde(rename = "static", default)]
        is_static: bool,
    },
    PropertyDefinition {
        key: Box<Node>,
        value: Option<Box<Node>>,
        #[serde(default)]
        computed: bool,
        #[serde(rename = "static", default)]
        is_static: bool,
    },

    // Patterns
    ObjectPattern {
        properties: Vec<Node>,
    },
    ArrayPattern {
        elements: Vec<Option<Node>>,
    },
    RestElement {
        argument: Box<Node>,
    },
    AssignmentPattern {
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Statements run in the enclosing scope: concise arrow bodies and flattened declarations.
    #[serde(skip)]
    Group(Vec<Node>),

    #[serde(skip)]
    Unsupported(String),
    #[serde(other)]
    Unknown,
}

fn default_true() -> bool {
    true
}

impl NodeKind {
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::EmptyStatement => "EmptyStatement",
            NodeKind::DebuggerStatement => "DebuggerStatement",
            NodeKind::WithStatement { .. } => "WithStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::LabeledStatement { .. } => "LabeledStatement",
            NodeKind::BreakStatement { .. } => "BreakStatement",
            NodeKind::ContinueStatement { .. } => "ContinueStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::SwitchStatement { .. } => "SwitchStatement",
            NodeKind::SwitchCase { .. } => "SwitchCase",
            NodeKind::ThrowStatement { .. } => "ThrowStatement",
            NodeKind::TryStatement { .. } => "TryStatement",
            NodeKind::CatchClause { .. } => "CatchClause",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::DoWhileStatement { .. } => "DoWhileStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::ForInStatement { .. } => "ForInStatement",
            NodeKind::FunctionDeclaration(_) => "FunctionDeclaration",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::VariableDeclarator { .. } => "VariableDeclarator",
            NodeKind::ClassDeclaration(_) => "ClassDeclaration",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::ThisExpression => "ThisExpression",
            NodeKind::Super => "Super",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::ObjectExpression { .. } => "ObjectExpression",
            NodeKind::Property { .. } => "Property",
            NodeKind::FunctionExpression(_) => "FunctionExpression",
            NodeKind::ArrowFunctionExpression(_) => "ArrowFunctionExpression",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::UpdateExpression { .. } => "UpdateExpression",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::AssignmentExpression { .. } => "AssignmentExpression",
            NodeKind::LogicalExpression { .. } => "LogicalExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::ChainExpression { .. } => "ChainExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::NewExpression { .. } => "NewExpression",
            NodeKind::SequenceExpression { .. } => "SequenceExpression",
            NodeKind::SpreadElement { .. } => "SpreadElement",
            NodeKind::TemplateLiteral { .. } => "TemplateLiteral",
            NodeKind::TemplateElement { .. } => "TemplateElement",
            NodeKind::TaggedTemplateExpression { .. } => "TaggedTemplateExpression",
            NodeKind::ClassExpression(_) => "ClassExpression",
            NodeKind::ClassBody { .. } => "ClassBody",
            NodeKind::MethodDefinition { .. } => "MethodDefinition",
            NodeKind::PropertyDefinition { .. } => "PropertyDefinition",
            NodeKind::ObjectPattern { .. } => "ObjectPattern",
            NodeKind::ArrayPattern { .. } => "ArrayPattern",
            NodeKind::RestElement { .. } => "RestElement",
            NodeKind::AssignmentPattern { .. } => "AssignmentPattern",
            NodeKind::Group(_) => "Group",
            NodeKind::Unknown => "Unknown",
            NodeKind::Unsupported(name) => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: Option<Box<Node>>,
    pub params: Vec<Node>,
    pub body: Box<Node>,
    #[serde(default)]
    pub expression: bool,
    #[serde(default)]
    pub generator: bool,
    #[serde(rename = "async", default)]
    pub is_async: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: Option<Box<Node>>,
    pub super_class: Option<Box<Node>>,
    pub body: Box<Node>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegexLiteral {
    pub pattern: String,
    pub flags: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateValue {
    pub raw: String,
    pub cooked: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VariableKind::Var => "var",
            VariableKind::Let => "let",
            VariableKind::Const => "const",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Constructor,
    Method,
    Get,
    Set,
}

/// Declares an operator enum that (de)serializes through its source spelling. Spellings the
/// evaluator does not know are kept in `Other` and rejected at compile time.
macro_rules! operator_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Other(s) => s,
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Other(s),
                }
            }
        }

        impl From<$name> for String {
            fn from(op: $name) -> String {
                op.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

operator_enum!(BinaryOperator {
    Eq => "==",
    NotEq => "!=",
    StrictEq => "===",
    StrictNotEq => "!==",
    Lt => "<",
    LtEq => "<=",
    Gt => ">",
    GtEq => ">=",
    LShift => "<<",
    RShift => ">>",
    URShift => ">>>",
    Add => "+",
    Sub => "-",
    Mul => "*",
    Div => "/",
    Mod => "%",
    Exp => "**",
    BitOr => "|",
    BitXor => "^",
    BitAnd => "&",
    In => "in",
    Instanceof => "instanceof",
});

operator_enum!(LogicalOperator {
    Or => "||",
    And => "&&",
    NullishCoalescing => "??",
});

operator_enum!(UnaryOperator {
    Minus => "-",
    Plus => "+",
    Not => "!",
    BitNot => "~",
    Typeof => "typeof",
    Void => "void",
    Delete => "delete",
});

operator_enum!(UpdateOperator {
    Increment => "++",
    Decrement => "--",
});

operator_enum!(AssignmentOperator {
    Assign => "=",
    AddAssign => "+=",
    SubAssign => "-=",
    MulAssign => "*=",
    DivAssign => "/=",
    ModAssign => "%=",
    ExpAssign => "**=",
    LShiftAssign => "<<=",
    RShiftAssign => ">>=",
    URShiftAssign => ">>>=",
    BitOrAssign => "|=",
    BitXorAssign => "^=",
    BitAndAssign => "&=",
    LogicalOrAssign => "||=",
    LogicalAndAssign => "&&=",
    NullishAssign => "??=",
});

impl AssignmentOperator {
    /// The binary operator a compound assignment applies, `None` for `=` and logical forms.
    pub fn binary(&self) -> Option<BinaryOperator> {
        Some(match self {
            AssignmentOperator::AddAssign => BinaryOperator::Add,
            AssignmentOperator::SubAssign => BinaryOperator::Sub,
            AssignmentOperator::MulAssign => BinaryOperator::Mul,
            AssignmentOperator::DivAssign => BinaryOperator::Div,
            AssignmentOperator::ModAssign => BinaryOperator::Mod,
            AssignmentOperator::ExpAssign => BinaryOperator::Exp,
            AssignmentOperator::LShiftAssign => BinaryOperator::LShift,
            AssignmentOperator::RShiftAssign => BinaryOperator::RShift,
            AssignmentOperator::URShiftAssign => BinaryOperator::URShift,
            AssignmentOperator::BitOrAssign => BinaryOperator::BitOr,
            AssignmentOperator::BitXorAssign => BinaryOperator::BitXor,
            AssignmentOperator::BitAndAssign => BinaryOperator::BitAnd,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_acorn_shape() {
        let json = r#"{
            "type": "Program", "start": 0, "end": 5,
            "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 5}},
            "body": [{
                "type": "ExpressionStatement", "start": 0, "end": 5,
                "expression": {
                    "type": "BinaryExpression", "start": 0, "end": 5, "operator": "+",
                    "left": {"type": "Literal", "start": 0, "end": 1, "value": 1, "raw": "1"},
                    "right": {"type": "Identifier", "start": 4, "end": 5, "name": "x"}
                }
            }],
            "sourceType": "script"
        }"#;
        let node = Node::from_json(json).unwrap();
        assert_eq!(node.position(), Some(Position { line: 1, column: 0 }));
        let NodeKind::Program { body } = &node.kind else {
            panic!("expected program");
        };
        let NodeKind::ExpressionStatement { expression, .. } = &body[0].kind else {
            panic!("expected expression statement");
        };
        match &expression.kind {
            NodeKind::BinaryExpression { operator, right, .. } => {
                assert_eq!(*operator, BinaryOperator::Add);
                assert_eq!(right.identifier_name(), Some("x"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_types_keep_their_name() {
        let node = Node::from_json(r#"{"type": "ForOfStatement", "start": 0, "end": 1}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Unsupported("ForOfStatement".into()));
        assert_eq!(node.type_name(), "ForOfStatement");
    }

    #[test]
    fn serialized_trees_read_back() {
        let json = r#"{"type": "ExpressionStatement", "start": 0, "end": 2,
            "expression": {"type": "UnaryExpression", "start": 0, "end": 2, "operator": "-",
            "prefix": true, "argument": {"type": "Identifier", "start": 1, "end": 2, "name": "a"}}}"#;
        let node = Node::from_json(json).unwrap();
        let text = node.to_json().unwrap();
        assert!(text.contains("\"type\": \"UnaryExpression\""), "{text}");
        assert_eq!(Node::from_json(&text).unwrap(), node);
    }

    #[test]
    fn unknown_operators_are_preserved() {
        let op: BinaryOperator = serde_json::from_str("\"|>\"").unwrap();
        assert_eq!(op, BinaryOperator::Other("|>".into()));
        assert_eq!(serde_json::to_string(&BinaryOperator::URShift).unwrap(), "\">>>\"");
    }
}
