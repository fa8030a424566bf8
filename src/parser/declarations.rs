use super::expressions::bound_names;
use super::*;

/// Parser state that does not cross a function boundary.
struct FunctionContext {
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(String, bool)>,
    no_in: bool,
}

impl<'a> Parser<'a> {
    fn enter_function(&mut self) -> FunctionContext {
        self.in_function += 1;
        FunctionContext {
            in_iteration: std::mem::take(&mut self.in_iteration),
            in_switch: std::mem::take(&mut self.in_switch),
            labels: std::mem::take(&mut self.labels),
            no_in: std::mem::take(&mut self.no_in),
        }
    }

    fn leave_function(&mut self, saved: FunctionContext) {
        self.in_function -= 1;
        self.in_iteration = saved.in_iteration;
        self.in_switch = saved.in_switch;
        self.labels = saved.labels;
        self.no_in = saved.no_in;
    }

    /// `var`/`let`/`const` and its declarators, without the trailing semicolon. In a `for` head
    /// the initializers may be left out when `in` follows.
    pub(super) fn parse_variable_declaration(&mut self, in_for_head: bool) -> Result<Node, ParseError> {
        let marker = self.start();
        let kind = match self.current {
            Token::Keyword(Keyword::Var) => VariableKind::Var,
            Token::Keyword(Keyword::Let) => VariableKind::Let,
            Token::Keyword(Keyword::Const) => VariableKind::Const,
            _ => return Err(self.unexpected()),
        };
        if kind != VariableKind::Var {
            self.require_es2015("Lexical declarations")?;
        }
        self.advance()?;
        let mut declarations = Vec::new();
        loop {
            let declarator = self.start();
            let id = self.parse_binding_target()?;
            if kind != VariableKind::Var {
                let mut names = Vec::new();
                bound_names(&id, &mut names);
                if names.iter().any(|n| n == "let") {
                    return Err(ParseError::new(
                        "let is disallowed as a lexically bound name",
                        id.position(),
                    ));
                }
            }
            let init = if self.eat_if(&Token::Assign)? {
                Some(Box::new(self.parse_assignment_expression()?))
            } else {
                let loop_head = in_for_head
                    && (self.current == Token::Keyword(Keyword::In)
                        || matches!(&self.current, Token::Identifier(n) if n == "of"));
                if !loop_head {
                    if kind == VariableKind::Const {
                        return Err(self.error("Missing initializer in const declaration"));
                    }
                    if !matches!(id.kind, NodeKind::Identifier { .. }) {
                        return Err(self.error("Missing initializer in destructuring declaration"));
                    }
                }
                None
            };
            declarations.push(self.finish(
                declarator,
                NodeKind::VariableDeclarator {
                    id: Box::new(id),
                    init,
                },
            ));
            if !self.eat_if(&Token::Comma)? {
                break;
            }
        }
        Ok(self.finish(marker, NodeKind::VariableDeclaration { declarations, kind }))
    }

    /// An identifier, array pattern or object pattern.
    pub(super) fn parse_binding_target(&mut self) -> Result<Node, ParseError> {
        match self.current {
            Token::LeftBracket => {
                self.require_es2015("Destructuring patterns")?;
                self.parse_array_pattern()
            }
            Token::LeftBrace => {
                self.require_es2015("Destructuring patterns")?;
                self.parse_object_pattern()
            }
            _ => self.parse_binding_identifier(),
        }
    }

    /// A binding target with an optional `= default`.
    fn parse_binding_element(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let target = self.parse_binding_target()?;
        if !self.eat_if(&Token::Assign)? {
            return Ok(target);
        }
        let right = self.with_in(Self::parse_assignment_expression)?;
        Ok(self.finish(
            marker,
            NodeKind::AssignmentPattern {
                left: Box::new(target),
                right: Box::new(right),
            },
        ))
    }

    pub(super) fn parse_rest_element(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::Ellipsis)?;
        let argument = self.parse_binding_target()?;
        if self.current == Token::Assign {
            return Err(self.error("Rest elements cannot have a default value"));
        }
        Ok(self.finish(
            marker,
            NodeKind::RestElement {
                argument: Box::new(argument),
            },
        ))
    }

    fn parse_array_pattern(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::LeftBracket)?;
        let mut elements = Vec::new();
        while self.current != Token::RightBracket {
            match self.current {
                Token::Comma => {
                    self.advance()?;
                    elements.push(None);
                    continue;
                }
                Token::Ellipsis => {
                    elements.push(Some(self.parse_rest_element()?));
                    break;
                }
                _ => elements.push(Some(self.parse_binding_element()?)),
            }
            if self.current != Token::RightBracket {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBracket)?;
        Ok(self.finish(marker, NodeKind::ArrayPattern { elements }))
    }

    fn parse_object_pattern(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::LeftBrace)?;
        let mut properties = Vec::new();
        while self.current != Token::RightBrace {
            if self.current == Token::Ellipsis {
                let rest = self.start();
                self.advance()?;
                let argument = self.parse_binding_identifier()?;
                properties.push(self.finish(
                    rest,
                    NodeKind::RestElement {
                        argument: Box::new(argument),
                    },
                ));
                break;
            }
            properties.push(self.parse_pattern_property()?);
            if self.current != Token::RightBrace {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBrace)?;
        Ok(self.finish(marker, NodeKind::ObjectPattern { properties }))
    }

    fn parse_pattern_property(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let (key, computed) = self.parse_property_key()?;
        if self.eat_if(&Token::Colon)? {
            let value = self.parse_binding_element()?;
            return Ok(self.finish(
                marker,
                NodeKind::Property {
                    key: Box::new(key),
                    value: Box::new(value),
                    kind: PropertyKind::Init,
                    method: false,
                    shorthand: false,
                    computed,
                },
            ));
        }
        let name = match (&key.kind, computed) {
            (NodeKind::Identifier { name }, false) if !Self::is_reserved_identifier(name, self.strict) => {
                name.clone()
            }
            _ => return Err(self.unexpected()),
        };
        self.check_binding_name(&name)?;
        let id = Node::new(NodeKind::Identifier { name }, key.start, key.end, key.loc);
        let value = if self.eat_if(&Token::Assign)? {
            let right = self.with_in(Self::parse_assignment_expression)?;
            self.finish(
                marker,
                NodeKind::AssignmentPattern {
                    left: Box::new(id),
                    right: Box::new(right),
                },
            )
        } else {
            id
        };
        Ok(self.finish(
            marker,
            NodeKind::Property {
                key: Box::new(key),
                value: Box::new(value),
                kind: PropertyKind::Init,
                method: false,
                shorthand: true,
                computed: false,
            },
        ))
    }

    /// `function` declarations and expressions, from the `function` keyword on.
    pub(super) fn parse_function(&mut self, marker: Marker, is_statement: bool) -> Result<Node, ParseError> {
        self.eat(&Token::Keyword(Keyword::Function))?;
        if self.current == Token::Star {
            return Err(self.unsupported("Generators"));
        }
        let id = if is_statement || self.current != Token::LeftParen {
            Some(Box::new(self.parse_binding_identifier()?))
        } else {
            None
        };
        let func = self.parse_function_rest(id)?;
        Ok(self.finish(
            marker,
            if is_statement {
                NodeKind::FunctionDeclaration(func)
            } else {
                NodeKind::FunctionExpression(func)
            },
        ))
    }

    /// Object and class methods: the parameter list and body after the key.
    pub(super) fn parse_method(&mut self, marker: Marker) -> Result<Node, ParseError> {
        let func = self.parse_function_rest(None)?;
        Ok(self.finish(marker, NodeKind::FunctionExpression(func)))
    }

    pub(super) fn check_accessor_params(&self, kind: PropertyKind, value: &Node) -> Result<(), ParseError> {
        let params = match &value.kind {
            NodeKind::FunctionExpression(func) => func.params.as_slice(),
            _ => &[],
        };
        match kind {
            PropertyKind::Get if !params.is_empty() => {
                Err(ParseError::new("Getter must not have any formal parameters", value.position()))
            }
            PropertyKind::Set if params.len() != 1 || params[0].type_name() == "RestElement" => {
                Err(ParseError::new("Setter must have exactly one formal parameter", value.position()))
            }
            _ => Ok(()),
        }
    }

    fn parse_function_rest(&mut self, id: Option<Box<Node>>) -> Result<Function, ParseError> {
        let saved = self.enter_function();
        let params = self.parse_formal_parameters()?;
        let body = self.parse_function_body()?;
        self.leave_function(saved);
        Ok(Function {
            id,
            params,
            body: Box::new(body),
            expression: false,
            generator: false,
            is_async: false,
        })
    }

    fn parse_formal_parameters(&mut self) -> Result<Vec<Node>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let mut params = Vec::new();
        while self.current != Token::RightParen {
            if self.current == Token::Ellipsis {
                params.push(self.parse_rest_element()?);
                break;
            }
            params.push(self.parse_binding_element()?);
            if self.current != Token::RightParen {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightParen)?;
        Ok(params)
    }

    fn parse_function_body(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::LeftBrace)?;
        let body = self.parse_directives_and_statements(&Token::RightBrace)?;
        self.eat(&Token::RightBrace)?;
        Ok(self.finish(marker, NodeKind::BlockStatement { body }))
    }

    pub(super) fn parse_arrow_body(&mut self, marker: Marker, params: Vec<Node>) -> Result<Node, ParseError> {
        self.require_es2015("Arrow functions")?;
        self.eat(&Token::Arrow)?;
        let no_in = self.no_in;
        let saved = self.enter_function();
        let (body, expression) = if self.current == Token::LeftBrace {
            (self.parse_function_body()?, false)
        } else {
            self.no_in = no_in;
            (self.parse_assignment_expression()?, true)
        };
        self.leave_function(saved);
        Ok(self.finish(
            marker,
            NodeKind::ArrowFunctionExpression(Function {
                id: None,
                params,
                body: Box::new(body),
                expression,
                generator: false,
                is_async: false,
            }),
        ))
    }

    /// Class declarations and expressions, from the `class` keyword on. Class bodies are strict.
    pub(super) fn parse_class(&mut self, marker: Marker, is_statement: bool) -> Result<Node, ParseError> {
        self.require_es2015("Classes")?;
        self.eat(&Token::Keyword(Keyword::Class))?;
        let saved_strict = std::mem::replace(&mut self.strict, true);
        let id = if self.current_identifier_name().is_some() {
            Some(Box::new(self.parse_binding_identifier()?))
        } else if is_statement {
            return Err(self.unexpected());
        } else {
            None
        };
        let super_class = if self.eat_if(&Token::Keyword(Keyword::Extends))? {
            Some(Box::new(self.parse_left_hand_side_expression()?))
        } else {
            None
        };

        let body_marker = self.start();
        self.eat(&Token::LeftBrace)?;
        let mut members = Vec::new();
        let mut has_constructor = false;
        while self.current != Token::RightBrace {
            if self.eat_if(&Token::Semicolon)? {
                continue;
            }
            let member = self.parse_class_member()?;
            if let NodeKind::MethodDefinition {
                kind: MethodKind::Constructor,
                ..
            } = member.kind
            {
                if has_constructor {
                    return Err(ParseError::new("A class may only have one constructor", member.position()));
                }
                has_constructor = true;
            }
            members.push(member);
        }
        self.eat(&Token::RightBrace)?;
        let body = self.finish(body_marker, NodeKind::ClassBody { body: members });
        self.strict = saved_strict;

        let class = Class {
            id,
            super_class,
            body: Box::new(body),
        };
        Ok(self.finish(
            marker,
            if is_statement {
                NodeKind::ClassDeclaration(class)
            } else {
                NodeKind::ClassExpression(class)
            },
        ))
    }

    fn parse_class_member(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        if self.current == Token::Star {
            return Err(self.unsupported("Generators"));
        }
        let mut key_marker = self.start();
        let (mut key, mut computed) = self.parse_property_key()?;

        let mut is_static = false;
        if !computed && key.identifier_name() == Some("static") && self.at_accessor_key() {
            if self.current == Token::LeftBrace {
                return Err(self.error("Class static blocks are not supported"));
            }
            is_static = true;
            key_marker = self.start();
            (key, computed) = self.parse_property_key()?;
        }

        let mut accessor = None;
        if !computed
            && let Some(name @ ("get" | "set" | "async")) = key.identifier_name()
            && self.at_accessor_key()
        {
            if name == "async" {
                return Err(self.unsupported("Async functions"));
            }
            accessor = Some(if name == "get" { PropertyKind::Get } else { PropertyKind::Set });
            key_marker = self.start();
            (key, computed) = self.parse_property_key()?;
        }

        let named = |name: &str| !computed && property_key_name(&key) == Some(name);
        if self.current == Token::LeftParen {
            let value = self.parse_method(key_marker)?;
            let kind = match accessor {
                Some(kind) => {
                    if !is_static && named("constructor") {
                        return Err(ParseError::new("Class constructor may not be an accessor", key.position()));
                    }
                    self.check_accessor_params(kind, &value)?;
                    if kind == PropertyKind::Get { MethodKind::Get } else { MethodKind::Set }
                }
                None if !is_static && named("constructor") => MethodKind::Constructor,
                None => MethodKind::Method,
            };
            return Ok(self.finish(
                marker,
                NodeKind::MethodDefinition {
                    key: Box::new(key),
                    value: Box::new(value),
                    kind,
                    computed,
                    is_static,
                },
            ));
        }
        if accessor.is_some() {
            return Err(self.unexpected());
        }
        if named("constructor") || (is_static && named("prototype")) {
            return Err(ParseError::new(
                "Classes may not have a field named 'constructor' or a static field named 'prototype'",
                key.position(),
            ));
        }
        let value = if self.eat_if(&Token::Assign)? {
            let saved = self.enter_function();
            let value = self.parse_assignment_expression()?;
            self.leave_function(saved);
            Some(Box::new(value))
        } else {
            None
        };
        self.eat_semicolon()?;
        Ok(self.finish(
            marker,
            NodeKind::PropertyDefinition {
                key: Box::new(key),
                value,
                computed,
                is_static,
            },
        ))
    }
}

/// The name of a non-computed property key.
fn property_key_name(key: &Node) -> Option<&str> {
    match &key.kind {
        NodeKind::Identifier { name } => Some(name),
        NodeKind::Literal {
            value: Value::String(s),
            ..
        } => Some(s),
        _ => None,
    }
}
