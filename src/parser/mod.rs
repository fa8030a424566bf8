//! Recursive-descent parser producing ESTree [`Node`]s.

use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexer, Token};
use crate::stack::ensure_sufficient_stack;
use serde_json::Value;

mod declarations;
mod expressions;
mod statements;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("SyntaxError: {message}")]
pub struct ParseError {
    /// Message with the ` [line:column]` suffix when the position is known.
    pub message: String,
    pub position: Option<Position>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Option<Position>) -> Self {
        let message = message.into();
        let message = match position {
            Some(pos) => format!("{message} {pos}"),
            None => message,
        };
        Self { message, position }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::new(e.message, Some(e.position))
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// `"latest"`, a year (`2015`..) or an edition number (`3`, `5`, `6`..).
    pub ecma_version: String,
    pub allow_return_outside_function: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            ecma_version: "latest".to_string(),
            allow_return_outside_function: true,
        }
    }
}

/// Whether `version` names an edition with ES2015 syntax, or `None` when it names none at all.
fn supports_es2015(version: &str) -> Option<bool> {
    if version == "latest" {
        return Some(true);
    }
    match version.parse::<u32>().ok()? {
        3 | 5 => Some(false),
        6..=20 | 2015..=2030 => Some(true),
        _ => None,
    }
}

/// Parses a script.
pub fn parse(source: &str, options: &ParseOptions) -> Result<Node, ParseError> {
    let es2015 = supports_es2015(&options.ecma_version).ok_or_else(|| {
        ParseError::new(format!("Invalid ecmaVersion: {}", options.ecma_version), None)
    })?;
    let mut parser = Parser::new(source)?;
    parser.es2015 = es2015;
    parser.allow_return = options.allow_return_outside_function;
    parser.parse_program()
}

/// Start of a node under construction.
#[derive(Clone, Copy)]
struct Marker {
    start: usize,
    position: Position,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    current_start: usize,
    current_end: usize,
    current_position: Position,
    current_end_position: Position,
    prev_token_end: usize,
    prev_end_position: Position,
    prev_line_terminator: bool,
    strict: bool,
    es2015: bool,
    allow_return: bool,
    in_function: u32,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(String, bool)>, // (name, is_iteration)
    /// Set while parsing a `for` head, where `in` ends the init expression.
    no_in: bool,
    depth: u32,
}

/// Deepest statement and expression nesting the parser accepts.
pub const MAX_NESTING_DEPTH: u32 = 256;

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut parser = Self {
            lexer: Lexer::new(source),
            current: Token::Eof,
            current_start: 0,
            current_end: 0,
            current_position: Position { line: 1, column: 0 },
            current_end_position: Position { line: 1, column: 0 },
            prev_token_end: 0,
            prev_end_position: Position { line: 1, column: 0 },
            prev_line_terminator: false,
            strict: false,
            es2015: true,
            allow_return: true,
            in_function: 0,
            in_iteration: 0,
            in_switch: 0,
            labels: Vec::new(),
            no_in: false,
            depth: 0,
        };
        parser.advance()?;
        parser.prev_token_end = 0;
        Ok(parser)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        self.prev_token_end = self.current_end;
        self.prev_end_position = self.current_end_position;
        self.prev_line_terminator = false;
        let next = loop {
            let tok = self.lexer.next_token()?;
            if tok == Token::LineTerminator {
                self.prev_line_terminator = true;
                continue;
            }
            break tok;
        };
        self.current_start = self.lexer.token_start();
        self.current_position = self.lexer.token_position();
        self.current_end = self.lexer.offset();
        self.current_end_position = self.lexer.position();
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Replaces the current token with one the lexer re-read from the same start (regex
    /// literals, template continuations).
    fn rescan(&mut self, token: Token) {
        self.current = token;
        self.current_end = self.lexer.offset();
        self.current_end_position = self.lexer.position();
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn eat_if(&mut self, expected: &Token) -> Result<bool, ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        if self.current == Token::Semicolon {
            self.advance()?;
            return Ok(());
        }
        // ASI
        if self.prev_line_terminator || self.current == Token::RightBrace || self.current == Token::Eof {
            return Ok(());
        }
        Err(self.unexpected())
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("Too many nested statements or expressions"));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| parse(self));
        self.depth -= 1;
        result
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, Some(self.current_position))
    }

    fn unexpected(&self) -> ParseError {
        match &self.current {
            Token::Eof => self.error("Unexpected end of input"),
            token => self.error(format!("Unexpected token '{token}'")),
        }
    }

    fn unsupported(&self, what: &str) -> ParseError {
        self.error(format!("{what} are not supported"))
    }

    fn require_es2015(&self, what: &str) -> Result<(), ParseError> {
        if self.es2015 {
            Ok(())
        } else {
            Err(self.error(format!("{what} require ecmaVersion 2015 or later")))
        }
    }

    fn start(&self) -> Marker {
        Marker {
            start: self.current_start,
            position: self.current_position,
        }
    }

    fn start_of(node: &Node) -> Marker {
        Marker {
            start: node.start,
            position: node.position().unwrap_or_default(),
        }
    }

    /// Closes a node at the end of the previous token.
    fn finish(&self, marker: Marker, kind: NodeKind) -> Node {
        Node::new(
            kind,
            marker.start,
            self.prev_token_end,
            Some(SourceLocation {
                start: marker.position,
                end: self.prev_end_position,
            }),
        )
    }

    fn is_reserved_identifier(name: &str, strict: bool) -> bool {
        Keyword::from_str(name).is_some_and(|kw| !matches!(kw, Keyword::Let | Keyword::Yield) || strict)
            || matches!(name, "true" | "false" | "null")
            || (strict
                && matches!(
                    name,
                    "implements" | "interface" | "package" | "private" | "protected" | "public" | "static"
                ))
    }

    fn current_identifier_name(&self) -> Option<String> {
        match &self.current {
            Token::Identifier(name) if !Self::is_reserved_identifier(name, self.strict) => Some(name.clone()),
            Token::Keyword(Keyword::Yield) if !self.strict => Some("yield".to_string()),
            _ => None,
        }
    }

    /// Any identifier name, reserved words included: property keys and member names.
    fn current_property_name(&self) -> Option<String> {
        match &self.current {
            Token::Identifier(name) => Some(name.clone()),
            Token::Keyword(kw) => Some(kw.as_str().to_string()),
            Token::BooleanLiteral(b) => Some(b.to_string()),
            Token::NullLiteral => Some("null".to_string()),
            _ => None,
        }
    }

    fn check_binding_name(&self, name: &str) -> Result<(), ParseError> {
        if self.strict && (name == "eval" || name == "arguments") {
            return Err(self.error(format!("Binding {name} in strict mode")));
        }
        Ok(())
    }

    fn parse_identifier(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let Some(name) = self.current_identifier_name() else {
            return Err(self.unexpected());
        };
        self.advance()?;
        Ok(self.finish(marker, NodeKind::Identifier { name }))
    }

    fn parse_binding_identifier(&mut self) -> Result<Node, ParseError> {
        let id = self.parse_identifier()?;
        if let Some(name) = id.identifier_name() {
            self.check_binding_name(name)?;
        }
        Ok(id)
    }

    fn parse_optional_label(&mut self) -> Result<Option<Box<Node>>, ParseError> {
        if !self.prev_line_terminator && self.current_identifier_name().is_some() {
            return Ok(Some(Box::new(self.parse_identifier()?)));
        }
        Ok(None)
    }

    pub fn parse_program(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let body = self.parse_directives_and_statements(&Token::Eof)?;
        let mut program = self.finish(marker, NodeKind::Program { body });
        program.end = self.current_end;
        if let Some(loc) = program.loc.as_mut() {
            loc.end = self.current_end_position;
        }
        Ok(program)
    }

    /// A statement list with a directive prologue, up to (not including) `end`.
    fn parse_directives_and_statements(&mut self, end: &Token) -> Result<Vec<Node>, ParseError> {
        let mut body = Vec::new();
        let mut in_prologue = true;
        let saved_strict = self.strict;
        while &self.current != end {
            let raw_start = self.current_start;
            let is_string = matches!(self.current, Token::StringLiteral(_));
            let mut stmt = self.parse_statement_or_declaration()?;
            if in_prologue {
                match &mut stmt.kind {
                    NodeKind::ExpressionStatement {
                        expression,
                        directive,
                    } if is_string && matches!(expression.kind, NodeKind::Literal { .. }) => {
                        let raw = self.lexer_source(raw_start + 1, expression.end.saturating_sub(1));
                        if raw == "use strict" {
                            self.strict = true;
                        }
                        *directive = Some(raw);
                    }
                    _ => in_prologue = false,
                }
            }
            body.push(stmt);
        }
        if end != &Token::Eof {
            self.strict = saved_strict;
        }
        Ok(body)
    }

    fn lexer_source(&self, start: usize, end: usize) -> String {
        self.lexer.source_slice(start, end).to_string()
    }
}

/// `f64` as a JSON number: integral values are written without a fraction the way ESTree
/// producers emit them.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 && !(n == 0.0 && n.is_sign_negative()) {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Reinterprets an expression parsed under the cover grammar as an assignment pattern.
fn to_pattern(node: Node) -> Result<Node, ParseError> {
    let invalid = |node: &Node| {
        ParseError::new("Assigning to rvalue", node.position())
    };
    let Node {
        kind,
        start,
        end,
        loc,
    } = node;
    let kind = match kind {
        kind @ (NodeKind::Identifier { .. }
        | NodeKind::MemberExpression { optional: false, .. }
        | NodeKind::ObjectPattern { .. }
        | NodeKind::ArrayPattern { .. }
        | NodeKind::AssignmentPattern { .. }
        | NodeKind::RestElement { .. }) => kind,
        NodeKind::AssignmentExpression {
            operator: AssignmentOperator::Assign,
            left,
            right,
        } => NodeKind::AssignmentPattern {
            left: Box::new(to_pattern(*left)?),
            right,
        },
        NodeKind::ArrayExpression { elements } => {
            let count = elements.len();
            let mut patterns = Vec::with_capacity(count);
            for (i, element) in elements.into_iter().enumerate() {
                patterns.push(match element {
                    Some(Node {
                        kind: NodeKind::SpreadElement { argument },
                        start,
                        end,
                        loc,
                    }) => {
                        if i + 1 != count {
                            return Err(ParseError::new(
                                "Rest element must be last element",
                                loc.map(|l| l.start),
                            ));
                        }
                        Some(Node::new(
                            NodeKind::RestElement {
                                argument: Box::new(to_pattern(*argument)?),
                            },
                            start,
                            end,
                            loc,
                        ))
                    }
                    Some(element) => Some(to_pattern(element)?),
                    None => None,
                });
            }
            NodeKind::ArrayPattern { elements: patterns }
        }
        NodeKind::ObjectExpression { properties } => {
            let count = properties.len();
            let mut patterns = Vec::with_capacity(count);
            for (i, property) in properties.into_iter().enumerate() {
                let Node {
                    kind,
                    start,
                    end,
                    loc,
                } = property;
                let kind = match kind {
                    NodeKind::SpreadElement { argument } if i + 1 == count => NodeKind::RestElement {
                        argument: Box::new(to_pattern(*argument)?),
                    },
                    NodeKind::Property {
                        key,
                        value,
                        kind: PropertyKind::Init,
                        method: false,
                        shorthand,
                        computed,
                    } => NodeKind::Property {
                        key,
                        value: Box::new(to_pattern(*value)?),
                        kind: PropertyKind::Init,
                        method: false,
                        shorthand,
                        computed,
                    },
                    other => {
                        return Err(invalid(&Node::new(other, start, end, loc)));
                    }
                };
                patterns.push(Node::new(kind, start, end, loc));
            }
            NodeKind::ObjectPattern {
                properties: patterns,
            }
        }
        other => return Err(invalid(&Node::new(other, start, end, loc))),
    };
    Ok(Node::new(kind, start, end, loc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(src: &str) -> Node {
        parse(src, &ParseOptions::default()).unwrap()
    }

    fn parse_err(src: &str) -> String {
        parse(src, &ParseOptions::default()).unwrap_err().message
    }

    fn body(src: &str) -> Vec<Node> {
        match parse_ok(src).kind {
            NodeKind::Program { body } => body,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn expression(src: &str) -> Node {
        match body(src).remove(0).kind {
            NodeKind::ExpressionStatement { expression, .. } => *expression,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_empty() {
        assert!(body("").is_empty());
        assert!(body("  // only a comment\n").is_empty());
    }

    #[test]
    fn positions_and_spans() {
        let src = "var x = 1;\n  y + 2";
        let stmts = body(src);
        assert_eq!((stmts[0].start, stmts[0].end), (0, 10));
        assert_eq!(stmts[1].position(), Some(Position { line: 2, column: 2 }));
        assert_eq!(&src[stmts[1].start..stmts[1].end], "y + 2");
    }

    #[test]
    fn binary_precedence() {
        let expr = expression("1 + 2 * 3 ** 2 ** 1");
        let NodeKind::BinaryExpression { operator, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(operator, BinaryOperator::Add);
        let NodeKind::BinaryExpression { operator, right, .. } = right.kind else {
            panic!("expected binary");
        };
        assert_eq!(operator, BinaryOperator::Mul);
        let NodeKind::BinaryExpression { operator, right, .. } = right.kind else {
            panic!("expected binary");
        };
        assert_eq!(operator, BinaryOperator::Exp);
        assert_eq!(right.type_name(), "BinaryExpression");
    }

    #[test]
    fn asi_and_restricted_productions() {
        assert_eq!(body("a\nb").len(), 2);
        let stmts = body("function f() { return\n1 }");
        let NodeKind::FunctionDeclaration(func) = &stmts[0].kind else {
            panic!("expected function");
        };
        let NodeKind::BlockStatement { body } = &func.body.kind else {
            panic!("expected block");
        };
        assert_eq!(body.len(), 2);
        assert_eq!(parse_err("a b"), "Unexpected token 'b' [1:2]");
    }

    #[test]
    fn arrows_and_patterns() {
        let expr = expression("({a, b: [c = 1, ...d]}, e = 2) => a");
        let NodeKind::ArrowFunctionExpression(func) = expr.kind else {
            panic!("expected arrow");
        };
        assert!(func.expression);
        let types: Vec<&str> = func.params.iter().map(Node::type_name).collect();
        assert_eq!(types, vec!["ObjectPattern", "AssignmentPattern"]);
        assert_eq!(expression("x => x").type_name(), "ArrowFunctionExpression");
        assert_eq!(expression("() => {}").type_name(), "ArrowFunctionExpression");
        assert_eq!(expression("[a, b] = [b, a]").type_name(), "AssignmentExpression");
    }

    #[test]
    fn optional_chains_are_wrapped() {
        let expr = expression("a?.b.c()");
        let NodeKind::ChainExpression { expression: inner } = expr.kind else {
            panic!("expected chain");
        };
        assert_eq!(inner.type_name(), "CallExpression");
        assert_eq!(expression("a.b").type_name(), "MemberExpression");
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let arrays = format!("{}1{}", "[".repeat(500), "]".repeat(500));
        assert!(parse_err(&arrays).starts_with("Too many nested statements or expressions"));
        let blocks = format!("{}{}", "{".repeat(500), "}".repeat(500));
        assert!(parse_err(&blocks).starts_with("Too many nested statements or expressions"));
        let negations = format!("{}1", "!".repeat(500));
        assert!(parse_err(&negations).starts_with("Too many nested statements or expressions"));

        let shallow = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(expression(&shallow).type_name(), "Literal");
    }

    #[test]
    fn literals() {
        match expression("/a+/gi").kind {
            NodeKind::Literal { regex: Some(regex), .. } => {
                assert_eq!((regex.pattern.as_str(), regex.flags.as_str()), ("a+", "gi"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match expression("x = 4 / 2 / 1").kind {
            NodeKind::AssignmentExpression { right, .. } => {
                assert_eq!(right.type_name(), "BinaryExpression")
            }
            other => panic!("unexpected {other:?}"),
        }
        match expression("`a${1}b`").kind {
            NodeKind::TemplateLiteral { quasis, expressions } => {
                assert_eq!((quasis.len(), expressions.len()), (2, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(number_value(2.0), serde_json::json!(2));
        assert_eq!(number_value(0.5), serde_json::json!(0.5));
    }

    #[test]
    fn directives() {
        let stmts = body("'use strict'; x");
        assert!(matches!(
            &stmts[0].kind,
            NodeKind::ExpressionStatement { directive: Some(d), .. } if d == "use strict"
        ));
        assert!(parse_err("'use strict'; var eval = 1").starts_with("Binding eval in strict mode"));
        assert!(parse_err("'use strict'; with (a) {}").starts_with("'with' in strict mode"));
    }

    #[test]
    fn unsupported_syntax_is_rejected() {
        assert!(parse_err("for (x of y) {}").starts_with("for-of loops are not supported"));
        assert!(parse_err("function* g() {}").starts_with("Generators are not supported"));
        assert!(parse_err("async function f() {}").starts_with("Async functions are not supported"));
        assert!(parse_err("import x from 'y'").starts_with("Modules are not supported"));
        assert!(parse_err("class A { #x = 1 }").starts_with("Private class members are not supported"));
    }

    #[test]
    fn control_flow_context() {
        assert!(parse_err("break").starts_with("Illegal break statement"));
        assert!(parse_err("while (1) { continue nope }").starts_with("Undefined label 'nope'"));
        assert!(parse("return 1", &ParseOptions::default()).is_ok());
        let options = ParseOptions {
            allow_return_outside_function: false,
            ..ParseOptions::default()
        };
        assert!(parse("return 1", &options).is_err());
    }

    #[test]
    fn ecma_version_gates_syntax() {
        let es5 = ParseOptions {
            ecma_version: "5".into(),
            ..ParseOptions::default()
        };
        assert!(parse("var a = 1", &es5).is_ok());
        assert!(parse("let a = 1", &es5).is_err());
        let bad = ParseOptions {
            ecma_version: "4".into(),
            ..ParseOptions::default()
        };
        assert_eq!(parse("1", &bad).unwrap_err().message, "Invalid ecmaVersion: 4");
    }

    #[test]
    fn output_round_trips_through_json() {
        let node = parse_ok("var o = { get a() { return 1 }, [k]: 2, m() {} }; o?.a");
        let json = node.to_json().unwrap();
        assert_eq!(Node::from_json(&json).unwrap(), node);
    }
}
