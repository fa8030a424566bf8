use super::*;

enum Operator {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}

impl<'a> Parser<'a> {
    /// Runs `f` with `in` allowed as an operator again (inside brackets of a `for` head).
    pub(super) fn with_in<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    pub fn parse_expression(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let expr = self.parse_assignment_expression()?;
        if self.current != Token::Comma {
            return Ok(expr);
        }
        let mut expressions = vec![expr];
        while self.eat_if(&Token::Comma)? {
            expressions.push(self.parse_assignment_expression()?);
        }
        Ok(self.finish(marker, NodeKind::SequenceExpression { expressions }))
    }

    fn assignment_operator(&self) -> Option<AssignmentOperator> {
        Some(match &self.current {
            Token::Assign => AssignmentOperator::Assign,
            Token::PlusAssign => AssignmentOperator::AddAssign,
            Token::MinusAssign => AssignmentOperator::SubAssign,
            Token::StarAssign => AssignmentOperator::MulAssign,
            Token::SlashAssign => AssignmentOperator::DivAssign,
            Token::PercentAssign => AssignmentOperator::ModAssign,
            Token::ExponentAssign => AssignmentOperator::ExpAssign,
            Token::LeftShiftAssign => AssignmentOperator::LShiftAssign,
            Token::RightShiftAssign => AssignmentOperator::RShiftAssign,
            Token::UnsignedRightShiftAssign => AssignmentOperator::URShiftAssign,
            Token::AmpersandAssign => AssignmentOperator::BitAndAssign,
            Token::PipeAssign => AssignmentOperator::BitOrAssign,
            Token::CaretAssign => AssignmentOperator::BitXorAssign,
            Token::LogicalAndAssign => AssignmentOperator::LogicalAndAssign,
            Token::LogicalOrAssign => AssignmentOperator::LogicalOrAssign,
            Token::NullishAssign => AssignmentOperator::NullishAssign,
            _ => return None,
        })
    }

    /// Identifiers and non-optional member expressions.
    pub(super) fn check_simple_target(&self, node: &Node) -> Result<(), ParseError> {
        match &node.kind {
            NodeKind::Identifier { name } => {
                if self.strict && (name == "eval" || name == "arguments") {
                    return Err(ParseError::new(
                        format!("Assigning to {name} in strict mode"),
                        node.position(),
                    ));
                }
                Ok(())
            }
            NodeKind::MemberExpression { optional: false, .. } => Ok(()),
            _ => Err(ParseError::new("Assigning to rvalue", node.position())),
        }
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Node, ParseError> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let left = self.parse_conditional_expression()?;

        if self.current == Token::Arrow {
            return Err(match &left.kind {
                NodeKind::CallExpression { callee, .. } if callee.identifier_name() == Some("async") => {
                    self.unsupported("Async functions")
                }
                _ => self.unexpected(),
            });
        }
        let Some(operator) = self.assignment_operator() else {
            return Ok(left);
        };
        let left = if operator == AssignmentOperator::Assign
            && matches!(left.kind, NodeKind::ArrayExpression { .. } | NodeKind::ObjectExpression { .. })
        {
            to_pattern(left)?
        } else {
            self.check_simple_target(&left)?;
            left
        };
        self.advance()?;
        let right = self.parse_assignment_expression()?;
        Ok(self.finish(
            marker,
            NodeKind::AssignmentExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
        ))
    }

    fn parse_conditional_expression(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let test = self.parse_binary_expression()?;
        if !self.eat_if(&Token::Question)? {
            return Ok(test);
        }
        let consequent = self.with_in(Self::parse_assignment_expression)?;
        self.eat(&Token::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(self.finish(
            marker,
            NodeKind::ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
        ))
    }

    fn binary_operator(&self) -> Option<(Operator, u8)> {
        use BinaryOperator as B;
        use Operator::{Binary, Logical};
        Some(match &self.current {
            Token::NullishCoalescing => (Logical(LogicalOperator::NullishCoalescing), 1),
            Token::LogicalOr => (Logical(LogicalOperator::Or), 1),
            Token::LogicalAnd => (Logical(LogicalOperator::And), 2),
            Token::Pipe => (Binary(B::BitOr), 3),
            Token::Caret => (Binary(B::BitXor), 4),
            Token::Ampersand => (Binary(B::BitAnd), 5),
            Token::Equal => (Binary(B::Eq), 6),
            Token::NotEqual => (Binary(B::NotEq), 6),
            Token::StrictEqual => (Binary(B::StrictEq), 6),
            Token::StrictNotEqual => (Binary(B::StrictNotEq), 6),
            Token::LessThan => (Binary(B::Lt), 7),
            Token::LessThanEqual => (Binary(B::LtEq), 7),
            Token::GreaterThan => (Binary(B::Gt), 7),
            Token::GreaterThanEqual => (Binary(B::GtEq), 7),
            Token::Keyword(Keyword::Instanceof) => (Binary(B::Instanceof), 7),
            Token::Keyword(Keyword::In) if !self.no_in => (Binary(B::In), 7),
            Token::LeftShift => (Binary(B::LShift), 8),
            Token::RightShift => (Binary(B::RShift), 8),
            Token::UnsignedRightShift => (Binary(B::URShift), 8),
            Token::Plus => (Binary(B::Add), 9),
            Token::Minus => (Binary(B::Sub), 9),
            Token::Star => (Binary(B::Mul), 10),
            Token::Slash => (Binary(B::Div), 10),
            Token::Percent => (Binary(B::Mod), 10),
            Token::Exponent => (Binary(B::Exp), 11),
            _ => return None,
        })
    }

    fn parse_binary_expression(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let left = self.parse_unary()?;
        self.parse_binary_rest(marker, left, 0)
    }

    /// Operator-precedence climbing; `**` is the only right-associative operator.
    fn parse_binary_rest(&mut self, marker: Marker, mut left: Node, min_prec: u8) -> Result<Node, ParseError> {
        loop {
            let Some((operator, prec)) = self.binary_operator() else {
                return Ok(left);
            };
            if prec <= min_prec {
                return Ok(left);
            }
            self.advance()?;
            let right_marker = self.start();
            let right = self.parse_unary()?;
            let next_min = match operator {
                Operator::Binary(BinaryOperator::Exp) => prec - 1,
                _ => prec,
            };
            let right = self.nested(|p| p.parse_binary_rest(right_marker, right, next_min))?;
            let (l, r) = (Box::new(left), Box::new(right));
            let kind = match operator {
                Operator::Binary(operator) => NodeKind::BinaryExpression { operator, left: l, right: r },
                Operator::Logical(operator) => NodeKind::LogicalExpression { operator, left: l, right: r },
            };
            left = self.finish(marker, kind);
        }
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let operator = match &self.current {
            Token::Minus => Some(UnaryOperator::Minus),
            Token::Plus => Some(UnaryOperator::Plus),
            Token::Bang => Some(UnaryOperator::Not),
            Token::Tilde => Some(UnaryOperator::BitNot),
            Token::Keyword(Keyword::Typeof) => Some(UnaryOperator::Typeof),
            Token::Keyword(Keyword::Void) => Some(UnaryOperator::Void),
            Token::Keyword(Keyword::Delete) => Some(UnaryOperator::Delete),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance()?;
            let argument = self.nested(Self::parse_unary)?;
            if self.strict
                && operator == UnaryOperator::Delete
                && matches!(argument.kind, NodeKind::Identifier { .. })
            {
                return Err(ParseError::new(
                    "Deleting local variable in strict mode",
                    Some(marker.position),
                ));
            }
            return Ok(self.finish(
                marker,
                NodeKind::UnaryExpression {
                    operator,
                    prefix: true,
                    argument: Box::new(argument),
                },
            ));
        }
        if let Some(operator) = self.update_operator() {
            self.advance()?;
            let argument = self.nested(Self::parse_unary)?;
            self.check_simple_target(&argument)?;
            return Ok(self.finish(
                marker,
                NodeKind::UpdateExpression {
                    operator,
                    prefix: true,
                    argument: Box::new(argument),
                },
            ));
        }
        let expr = self.parse_left_hand_side_expression()?;
        if !self.prev_line_terminator
            && let Some(operator) = self.update_operator()
        {
            self.check_simple_target(&expr)?;
            self.advance()?;
            return Ok(self.finish(
                marker,
                NodeKind::UpdateExpression {
                    operator,
                    prefix: false,
                    argument: Box::new(expr),
                },
            ));
        }
        Ok(expr)
    }

    fn update_operator(&self) -> Option<UpdateOperator> {
        match self.current {
            Token::Increment => Some(UpdateOperator::Increment),
            Token::Decrement => Some(UpdateOperator::Decrement),
            _ => None,
        }
    }

    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let base = match self.current {
            Token::Keyword(Keyword::New) => self.parse_new_expression()?,
            _ => self.parse_primary_expression()?,
        };
        self.parse_subscripts(marker, base, false)
    }

    /// Member accesses, calls and tagged templates after `expr`. A chain containing `?.` is
    /// wrapped in a `ChainExpression`.
    fn parse_subscripts(&mut self, marker: Marker, mut expr: Node, no_calls: bool) -> Result<Node, ParseError> {
        let mut chained = false;
        loop {
            let optional = self.current == Token::OptionalChain;
            if optional {
                if no_calls {
                    return Err(self.error("Invalid optional chain from new expression"));
                }
                self.advance()?;
                chained = true;
            }
            match &self.current {
                Token::Dot if !optional => {
                    self.advance()?;
                    let property = self.parse_member_name()?;
                    expr = self.member(marker, expr, property, false, false);
                }
                Token::LeftBracket => {
                    self.advance()?;
                    let property = self.with_in(Self::parse_expression)?;
                    self.eat(&Token::RightBracket)?;
                    expr = self.member(marker, expr, property, true, optional);
                }
                Token::LeftParen if !no_calls => {
                    let arguments = self.parse_arguments()?;
                    expr = self.finish(
                        marker,
                        NodeKind::CallExpression {
                            callee: Box::new(expr),
                            arguments,
                            optional,
                        },
                    );
                }
                Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) if !optional => {
                    if chained {
                        return Err(self.error("Optional chaining cannot appear in the tag of tagged template expressions"));
                    }
                    let quasi = self.parse_template(true)?;
                    expr = self.finish(
                        marker,
                        NodeKind::TaggedTemplateExpression {
                            tag: Box::new(expr),
                            quasi: Box::new(quasi),
                        },
                    );
                }
                _ if optional => {
                    let property = self.parse_member_name()?;
                    expr = self.member(marker, expr, property, false, true);
                }
                _ => break,
            }
        }
        if chained {
            expr = self.finish(
                marker,
                NodeKind::ChainExpression {
                    expression: Box::new(expr),
                },
            );
        }
        Ok(expr)
    }

    fn member(&self, marker: Marker, object: Node, property: Node, computed: bool, optional: bool) -> Node {
        self.finish(
            marker,
            NodeKind::MemberExpression {
                object: Box::new(object),
                property: Box::new(property),
                computed,
                optional,
            },
        )
    }

    /// The name after `.`: any identifier name, reserved words included.
    fn parse_member_name(&mut self) -> Result<Node, ParseError> {
        if self.current == Token::Hash {
            return Err(self.unsupported("Private class members"));
        }
        let marker = self.start();
        let Some(name) = self.current_property_name() else {
            return Err(self.unexpected());
        };
        self.advance()?;
        Ok(self.finish(marker, NodeKind::Identifier { name }))
    }

    fn parse_new_expression(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // new
        if self.current == Token::Dot {
            return Err(self.error("new.target is not supported"));
        }
        let callee_marker = self.start();
        let callee = match self.current {
            Token::Keyword(Keyword::New) => self.nested(Self::parse_new_expression)?,
            _ => self.parse_primary_expression()?,
        };
        let callee = self.parse_subscripts(callee_marker, callee, true)?;
        let arguments = if self.current == Token::LeftParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(self.finish(
            marker,
            NodeKind::NewExpression {
                callee: Box::new(callee),
                arguments,
            },
        ))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        self.eat(&Token::LeftParen)?;
        self.with_in(|p| {
            let mut args = Vec::new();
            while p.current != Token::RightParen {
                args.push(p.parse_spread_or_assignment()?);
                if !p.eat_if(&Token::Comma)? {
                    break;
                }
            }
            p.eat(&Token::RightParen)?;
            Ok(args)
        })
    }

    fn parse_spread_or_assignment(&mut self) -> Result<Node, ParseError> {
        if self.current != Token::Ellipsis {
            return self.parse_assignment_expression();
        }
        let marker = self.start();
        self.advance()?;
        let argument = self.parse_assignment_expression()?;
        Ok(self.finish(
            marker,
            NodeKind::SpreadElement {
                argument: Box::new(argument),
            },
        ))
    }

    fn literal(&mut self, value: Value) -> Result<Node, ParseError> {
        let marker = self.start();
        let raw = self.lexer_source(self.current_start, self.current_end);
        self.advance()?;
        Ok(self.finish(
            marker,
            NodeKind::Literal {
                value,
                raw: Some(raw),
                regex: None,
            },
        ))
    }

    fn parse_primary_expression(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        match &self.current {
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(self.finish(marker, NodeKind::ThisExpression))
            }
            Token::Keyword(Keyword::Super) => {
                self.advance()?;
                if self.in_function == 0
                    || !matches!(self.current, Token::LeftParen | Token::Dot | Token::LeftBracket)
                {
                    return Err(ParseError::new("'super' keyword unexpected here", Some(marker.position)));
                }
                Ok(self.finish(marker, NodeKind::Super))
            }
            Token::Identifier(_) | Token::Keyword(Keyword::Yield) => {
                let id = self.parse_identifier()?;
                if id.identifier_name() == Some("async")
                    && !self.prev_line_terminator
                    && matches!(self.current, Token::Keyword(Keyword::Function) | Token::Identifier(_))
                {
                    return Err(self.unsupported("Async functions"));
                }
                if self.current == Token::Arrow && !self.prev_line_terminator {
                    if let Some(name) = id.identifier_name() {
                        self.check_binding_name(name)?;
                    }
                    return self.parse_arrow_body(marker, vec![id]);
                }
                Ok(id)
            }
            Token::NumericLiteral(n) => {
                let n = *n;
                if n.is_infinite() {
                    self.advance()?;
                    return Ok(self.finish(
                        marker,
                        NodeKind::Identifier {
                            name: "Infinity".to_string(),
                        },
                    ));
                }
                self.literal(number_value(n))
            }
            Token::StringLiteral(s) => {
                let value = Value::String(s.clone());
                self.literal(value)
            }
            Token::BooleanLiteral(b) => {
                let value = Value::Bool(*b);
                self.literal(value)
            }
            Token::NullLiteral => self.literal(Value::Null),
            Token::Slash | Token::SlashAssign => {
                let prefix = if self.current == Token::SlashAssign { "=" } else { "" };
                let token = self.lexer.lex_regex(prefix)?;
                self.rescan(token);
                let Token::RegExpLiteral { pattern, flags } = self.advance()? else {
                    return Err(self.unexpected());
                };
                let raw = format!("/{pattern}/{flags}");
                Ok(self.finish(
                    marker,
                    NodeKind::Literal {
                        value: Value::Null,
                        raw: Some(raw),
                        regex: Some(RegexLiteral { pattern, flags }),
                    },
                ))
            }
            Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) => self.parse_template(false),
            Token::LeftParen => self.parse_paren_or_arrow(),
            Token::LeftBracket => self.parse_array_literal(),
            Token::LeftBrace => self.parse_object_literal(),
            Token::Keyword(Keyword::Function) => self.parse_function(marker, false),
            Token::Keyword(Keyword::Class) => self.parse_class(marker, false),
            Token::Keyword(Keyword::New) => self.parse_new_expression(),
            Token::Keyword(Keyword::Import) => Err(self.unsupported("Modules")),
            Token::Hash => Err(self.unsupported("Private class members")),
            _ => Err(self.unexpected()),
        }
    }

    /// `( ... )`: a parenthesized expression, or the parameter list of an arrow function when
    /// `=>` follows.
    fn parse_paren_or_arrow(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::LeftParen)?;
        let (mut items, rest, trailing_comma) = self.with_in(|p| {
            let mut items = Vec::new();
            let mut rest = None;
            let mut trailing_comma = false;
            while p.current != Token::RightParen {
                if p.current == Token::Ellipsis {
                    rest = Some(p.parse_rest_element()?);
                    break;
                }
                items.push(p.parse_assignment_expression()?);
                if !p.eat_if(&Token::Comma)? {
                    break;
                }
                trailing_comma = p.current == Token::RightParen;
            }
            p.eat(&Token::RightParen)?;
            Ok((items, rest, trailing_comma))
        })?;

        if self.current == Token::Arrow && !self.prev_line_terminator {
            let mut params = items.into_iter().map(to_pattern).collect::<Result<Vec<_>, _>>()?;
            params.extend(rest);
            let mut names = Vec::new();
            for param in &params {
                bound_names(param, &mut names);
            }
            for name in &names {
                self.check_binding_name(name)?;
            }
            return self.parse_arrow_body(marker, params);
        }
        if items.is_empty() || rest.is_some() || trailing_comma {
            return Err(self.unexpected());
        }
        if items.len() == 1 {
            return Ok(items.remove(0));
        }
        let first = Self::start_of(&items[0]);
        let last = &items[items.len() - 1];
        let (end, end_position) = (last.end, last.loc.map(|l| l.end).unwrap_or_default());
        Ok(Node::new(
            NodeKind::SequenceExpression { expressions: items },
            first.start,
            end,
            Some(SourceLocation {
                start: first.position,
                end: end_position,
            }),
        ))
    }

    fn parse_array_literal(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::LeftBracket)?;
        let elements = self.with_in(|p| {
            let mut elements = Vec::new();
            while p.current != Token::RightBracket {
                if p.current == Token::Comma {
                    p.advance()?;
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_spread_or_assignment()?));
                if p.current != Token::RightBracket {
                    p.eat(&Token::Comma)?;
                }
            }
            p.eat(&Token::RightBracket)?;
            Ok(elements)
        })?;
        Ok(self.finish(marker, NodeKind::ArrayExpression { elements }))
    }

    /// A property key: identifier name, string, number or `[computed]`. Returns the key and
    /// whether it is computed.
    pub(super) fn parse_property_key(&mut self) -> Result<(Node, bool), ParseError> {
        let marker = self.start();
        match &self.current {
            Token::LeftBracket => {
                self.advance()?;
                let key = self.with_in(Self::parse_assignment_expression)?;
                self.eat(&Token::RightBracket)?;
                Ok((key, true))
            }
            Token::StringLiteral(s) => {
                let value = Value::String(s.clone());
                Ok((self.literal(value)?, false))
            }
            Token::NumericLiteral(n) => {
                let value = number_value(*n);
                Ok((self.literal(value)?, false))
            }
            Token::Hash => Err(self.unsupported("Private class members")),
            _ => {
                let Some(name) = self.current_property_name() else {
                    return Err(self.unexpected());
                };
                self.advance()?;
                Ok((self.finish(marker, NodeKind::Identifier { name }), false))
            }
        }
    }

    /// `get`/`set` start an accessor unless the next token ends the key.
    pub(super) fn at_accessor_key(&self) -> bool {
        !matches!(
            self.current,
            Token::LeftParen | Token::Colon | Token::Comma | Token::RightBrace | Token::Assign | Token::Semicolon
        )
    }

    fn parse_object_literal(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::LeftBrace)?;
        let properties = self.with_in(|p| {
            let mut properties = Vec::new();
            while p.current != Token::RightBrace {
                properties.push(p.parse_object_property()?);
                if p.current != Token::RightBrace {
                    p.eat(&Token::Comma)?;
                }
            }
            p.eat(&Token::RightBrace)?;
            Ok(properties)
        })?;
        Ok(self.finish(marker, NodeKind::ObjectExpression { properties }))
    }

    fn parse_object_property(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        if self.current == Token::Ellipsis {
            return self.parse_spread_or_assignment();
        }
        if self.current == Token::Star {
            return Err(self.unsupported("Generators"));
        }
        let (mut key, mut computed) = self.parse_property_key()?;
        let mut kind = PropertyKind::Init;
        if !computed
            && let Some(name @ ("get" | "set" | "async")) = key.identifier_name()
            && self.at_accessor_key()
        {
            if name == "async" {
                return Err(self.unsupported("Async functions"));
            }
            kind = if name == "get" { PropertyKind::Get } else { PropertyKind::Set };
            (key, computed) = self.parse_property_key()?;
        }

        if kind != PropertyKind::Init || self.current == Token::LeftParen {
            let value = self.parse_method(marker)?;
            self.check_accessor_params(kind, &value)?;
            return Ok(self.finish(
                marker,
                NodeKind::Property {
                    key: Box::new(key),
                    value: Box::new(value),
                    kind,
                    method: kind == PropertyKind::Init,
                    shorthand: false,
                    computed,
                },
            ));
        }

        if self.eat_if(&Token::Colon)? {
            let value = self.parse_assignment_expression()?;
            return Ok(self.finish(
                marker,
                NodeKind::Property {
                    key: Box::new(key),
                    value: Box::new(value),
                    kind,
                    method: false,
                    shorthand: false,
                    computed,
                },
            ));
        }

        // Shorthand `a` or, as a pattern, `a = default`.
        let name = match (&key.kind, computed) {
            (NodeKind::Identifier { name }, false) if !Self::is_reserved_identifier(name, self.strict) => {
                name.clone()
            }
            _ => return Err(self.unexpected()),
        };
        let value = if self.eat_if(&Token::Assign)? {
            let right = self.parse_assignment_expression()?;
            self.finish(
                marker,
                NodeKind::AssignmentPattern {
                    left: Box::new(key.clone()),
                    right: Box::new(right),
                },
            )
        } else {
            Node::new(NodeKind::Identifier { name }, key.start, key.end, key.loc)
        };
        Ok(self.finish(
            marker,
            NodeKind::Property {
                key: Box::new(key),
                value: Box::new(value),
                kind,
                method: false,
                shorthand: true,
                computed,
            },
        ))
    }

    pub(super) fn parse_template(&mut self, tagged: bool) -> Result<Node, ParseError> {
        self.require_es2015("Template literals")?;
        let marker = self.start();
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        loop {
            let element_marker = self.start();
            let (cooked, raw, tail) = match self.advance()? {
                Token::NoSubstitutionTemplate(c, r) | Token::TemplateTail(c, r) => (c, r, true),
                Token::TemplateHead(c, r) | Token::TemplateMiddle(c, r) => (c, r, false),
                _ => return Err(self.unexpected()),
            };
            if cooked.is_none() && !tagged {
                return Err(ParseError::new(
                    "Bad escape sequence in untagged template literal",
                    Some(element_marker.position),
                ));
            }
            quasis.push(self.finish(
                element_marker,
                NodeKind::TemplateElement {
                    value: TemplateValue { raw, cooked },
                    tail,
                },
            ));
            if tail {
                break;
            }
            expressions.push(self.with_in(Self::parse_expression)?);
            if self.current != Token::RightBrace {
                return Err(self.unexpected());
            }
            let continuation = self.lexer.read_template_continuation()?;
            self.rescan(continuation);
        }
        Ok(self.finish(marker, NodeKind::TemplateLiteral { quasis, expressions }))
    }
}

/// Names bound by a pattern, in source order.
pub(super) fn bound_names(pattern: &Node, names: &mut Vec<String>) {
    match &pattern.kind {
        NodeKind::Identifier { name } => names.push(name.clone()),
        NodeKind::ArrayPattern { elements } => {
            for element in elements.iter().flatten() {
                bound_names(element, names);
            }
        }
        NodeKind::ObjectPattern { properties } => {
            for property in properties {
                match &property.kind {
                    NodeKind::Property { value, .. } => bound_names(value, names),
                    _ => bound_names(property, names),
                }
            }
        }
        NodeKind::AssignmentPattern { left, .. } => bound_names(left, names),
        NodeKind::RestElement { argument } => bound_names(argument, names),
        _ => {}
    }
}
