use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_statement_or_declaration(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        match self.current {
            Token::Keyword(Keyword::Function) => self.parse_function(marker, true),
            Token::Keyword(Keyword::Class) => self.parse_class(marker, true),
            Token::Keyword(Keyword::Let | Keyword::Const) => self.parse_variable_statement(),
            _ => self.parse_statement(),
        }
    }

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        match self.current {
            Token::LeftBrace => self.parse_block_statement(),
            Token::Semicolon => {
                self.advance()?;
                Ok(self.finish(marker, NodeKind::EmptyStatement))
            }
            Token::Keyword(Keyword::Var) => self.parse_variable_statement(),
            Token::Keyword(Keyword::If) => self.parse_if_statement(),
            Token::Keyword(Keyword::For) => self.parse_for_statement(),
            Token::Keyword(Keyword::While) => self.parse_while_statement(),
            Token::Keyword(Keyword::Do) => self.parse_do_while_statement(),
            Token::Keyword(Keyword::Break | Keyword::Continue) => self.parse_jump_statement(),
            Token::Keyword(Keyword::Return) => self.parse_return_statement(),
            Token::Keyword(Keyword::With) => self.parse_with_statement(),
            Token::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            Token::Keyword(Keyword::Try) => self.parse_try_statement(),
            Token::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.eat_semicolon()?;
                Ok(self.finish(marker, NodeKind::DebuggerStatement))
            }
            // Sloppy-mode function declarations as the body of `if` and labels.
            Token::Keyword(Keyword::Function) if !self.strict => self.parse_function(marker, true),
            Token::Keyword(Keyword::Let | Keyword::Const | Keyword::Class | Keyword::Function) => Err(
                self.error("Lexical declaration cannot appear in a single-statement context"),
            ),
            Token::Keyword(Keyword::Import | Keyword::Export) => Err(self.unsupported("Modules")),
            Token::Keyword(Keyword::Enum) => Err(self.error("The keyword 'enum' is reserved")),
            _ => self.parse_expression_statement_or_labeled(),
        }
    }

    fn parse_expression_statement_or_labeled(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let expression = self.parse_expression()?;
        if self.current == Token::Colon
            && let NodeKind::Identifier { name } = &expression.kind
        {
            let name = name.clone();
            if self.labels.iter().any(|(label, _)| *label == name) {
                return Err(ParseError::new(
                    format!("Label '{name}' has already been declared"),
                    Some(marker.position),
                ));
            }
            self.advance()?;
            let is_iteration = matches!(
                self.current,
                Token::Keyword(Keyword::For | Keyword::While | Keyword::Do)
            );
            self.labels.push((name, is_iteration));
            let body = self.parse_statement()?;
            self.labels.pop();
            return Ok(self.finish(
                marker,
                NodeKind::LabeledStatement {
                    label: Box::new(expression),
                    body: Box::new(body),
                },
            ));
        }
        self.eat_semicolon()?;
        Ok(self.finish(
            marker,
            NodeKind::ExpressionStatement {
                expression: Box::new(expression),
                directive: None,
            },
        ))
    }

    fn parse_block_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.eat(&Token::LeftBrace)?;
        let mut body = Vec::new();
        while self.current != Token::RightBrace {
            body.push(self.parse_statement_or_declaration()?);
        }
        self.eat(&Token::RightBrace)?;
        Ok(self.finish(marker, NodeKind::BlockStatement { body }))
    }

    fn parse_variable_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let declaration = self.parse_variable_declaration(false)?;
        self.eat_semicolon()?;
        Ok(self.finish(marker, declaration.kind))
    }

    fn parse_parenthesized_expression(&mut self) -> Result<Node, ParseError> {
        self.eat(&Token::LeftParen)?;
        let expr = self.with_in(Self::parse_expression)?;
        self.eat(&Token::RightParen)?;
        Ok(expr)
    }

    fn parse_if_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // if
        let test = self.parse_parenthesized_expression()?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat_if(&Token::Keyword(Keyword::Else))? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(self.finish(
            marker,
            NodeKind::IfStatement {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate,
            },
        ))
    }

    fn parse_iteration_body(&mut self) -> Result<Box<Node>, ParseError> {
        self.in_iteration += 1;
        let body = self.parse_statement()?;
        self.in_iteration -= 1;
        Ok(Box::new(body))
    }

    fn parse_while_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // while
        let test = self.parse_parenthesized_expression()?;
        let body = self.parse_iteration_body()?;
        Ok(self.finish(
            marker,
            NodeKind::WhileStatement {
                test: Box::new(test),
                body,
            },
        ))
    }

    fn parse_do_while_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // do
        let body = self.parse_iteration_body()?;
        self.eat(&Token::Keyword(Keyword::While))?;
        let test = self.parse_parenthesized_expression()?;
        // The semicolon after do-while is always optional.
        self.eat_if(&Token::Semicolon)?;
        Ok(self.finish(
            marker,
            NodeKind::DoWhileStatement {
                body,
                test: Box::new(test),
            },
        ))
    }

    fn at_of(&self) -> bool {
        matches!(&self.current, Token::Identifier(n) if n == "of")
    }

    fn parse_for_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // for
        self.eat(&Token::LeftParen)?;

        let init = match self.current {
            Token::Semicolon => None,
            Token::Keyword(Keyword::Var | Keyword::Let | Keyword::Const) => {
                self.no_in = true;
                let declaration = self.parse_variable_declaration(true)?;
                self.no_in = false;
                if self.at_of() {
                    return Err(self.unsupported("for-of loops"));
                }
                if self.current == Token::Keyword(Keyword::In) {
                    let NodeKind::VariableDeclaration { declarations, .. } = &declaration.kind else {
                        return Err(self.unexpected());
                    };
                    if declarations.len() != 1 {
                        return Err(self.error("Only a single variable is allowed in a for-in loop head"));
                    }
                    if matches!(&declarations[0].kind, NodeKind::VariableDeclarator { init: Some(_), .. }) {
                        return Err(self.error("for-in loop variable declaration may not have an initializer"));
                    }
                    return self.parse_for_in_rest(marker, declaration);
                }
                Some(Box::new(declaration))
            }
            _ => {
                self.no_in = true;
                let expr = self.parse_expression()?;
                self.no_in = false;
                if self.at_of() {
                    return Err(self.unsupported("for-of loops"));
                }
                if self.current == Token::Keyword(Keyword::In) {
                    let left = if matches!(expr.kind, NodeKind::ArrayExpression { .. } | NodeKind::ObjectExpression { .. }) {
                        to_pattern(expr)?
                    } else {
                        self.check_simple_target(&expr)?;
                        expr
                    };
                    return self.parse_for_in_rest(marker, left);
                }
                Some(Box::new(expr))
            }
        };

        self.eat(&Token::Semicolon)?;
        let test = match self.current {
            Token::Semicolon => None,
            _ => Some(Box::new(self.parse_expression()?)),
        };
        self.eat(&Token::Semicolon)?;
        let update = match self.current {
            Token::RightParen => None,
            _ => Some(Box::new(self.parse_expression()?)),
        };
        self.eat(&Token::RightParen)?;
        let body = self.parse_iteration_body()?;
        Ok(self.finish(
            marker,
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            },
        ))
    }

    fn parse_for_in_rest(&mut self, marker: Marker, left: Node) -> Result<Node, ParseError> {
        self.advance()?; // in
        let right = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let body = self.parse_iteration_body()?;
        Ok(self.finish(
            marker,
            NodeKind::ForInStatement {
                left: Box::new(left),
                right: Box::new(right),
                body,
            },
        ))
    }

    /// `break` and `continue`, with their label checks.
    fn parse_jump_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        let is_break = self.advance()? == Token::Keyword(Keyword::Break);
        let keyword = if is_break { "break" } else { "continue" };
        let label = self.parse_optional_label()?;
        match label.as_deref().and_then(Node::identifier_name) {
            Some(name) => match self.labels.iter().find(|(label, _)| label == name) {
                None => {
                    return Err(ParseError::new(format!("Undefined label '{name}'"), Some(marker.position)));
                }
                Some((_, false)) if !is_break => {
                    return Err(ParseError::new(
                        format!("Illegal continue statement: '{name}' does not denote an iteration statement"),
                        Some(marker.position),
                    ));
                }
                Some(_) => {}
            },
            None => {
                if self.in_iteration == 0 && (!is_break || self.in_switch == 0) {
                    return Err(ParseError::new(format!("Illegal {keyword} statement"), Some(marker.position)));
                }
            }
        }
        self.eat_semicolon()?;
        Ok(self.finish(
            marker,
            if is_break {
                NodeKind::BreakStatement { label }
            } else {
                NodeKind::ContinueStatement { label }
            },
        ))
    }

    fn parse_return_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        if self.in_function == 0 && !self.allow_return {
            return Err(self.error("'return' outside of function"));
        }
        self.advance()?; // return
        let argument = if self.prev_line_terminator
            || matches!(self.current, Token::Semicolon | Token::RightBrace | Token::Eof)
        {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.eat_semicolon()?;
        Ok(self.finish(marker, NodeKind::ReturnStatement { argument }))
    }

    fn parse_with_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        if self.strict {
            return Err(self.error("'with' in strict mode"));
        }
        self.advance()?; // with
        let object = self.parse_parenthesized_expression()?;
        let body = self.parse_statement()?;
        Ok(self.finish(
            marker,
            NodeKind::WithStatement {
                object: Box::new(object),
                body: Box::new(body),
            },
        ))
    }

    fn parse_switch_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // switch
        let discriminant = self.parse_parenthesized_expression()?;
        self.eat(&Token::LeftBrace)?;
        self.in_switch += 1;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while self.current != Token::RightBrace {
            let case_marker = self.start();
            let test = match self.advance()? {
                Token::Keyword(Keyword::Case) => Some(Box::new(self.parse_expression()?)),
                Token::Keyword(Keyword::Default) => {
                    if seen_default {
                        return Err(ParseError::new("Multiple default clauses", Some(case_marker.position)));
                    }
                    seen_default = true;
                    None
                }
                _ => return Err(ParseError::new("Unexpected token in switch body", Some(case_marker.position))),
            };
            self.eat(&Token::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(
                self.current,
                Token::Keyword(Keyword::Case | Keyword::Default) | Token::RightBrace
            ) {
                consequent.push(self.parse_statement_or_declaration()?);
            }
            cases.push(self.finish(case_marker, NodeKind::SwitchCase { test, consequent }));
        }
        self.in_switch -= 1;
        self.eat(&Token::RightBrace)?;
        Ok(self.finish(
            marker,
            NodeKind::SwitchStatement {
                discriminant: Box::new(discriminant),
                cases,
            },
        ))
    }

    fn parse_throw_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // throw
        if self.prev_line_terminator {
            return Err(self.error("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(self.finish(
            marker,
            NodeKind::ThrowStatement {
                argument: Box::new(argument),
            },
        ))
    }

    fn parse_try_statement(&mut self) -> Result<Node, ParseError> {
        let marker = self.start();
        self.advance()?; // try
        let block = self.parse_block_statement()?;
        let handler = if self.current == Token::Keyword(Keyword::Catch) {
            let catch_marker = self.start();
            self.advance()?;
            let param = if self.eat_if(&Token::LeftParen)? {
                let param = self.parse_binding_target()?;
                self.eat(&Token::RightParen)?;
                Some(Box::new(param))
            } else {
                None
            };
            let body = self.parse_block_statement()?;
            Some(Box::new(self.finish(
                catch_marker,
                NodeKind::CatchClause {
                    param,
                    body: Box::new(body),
                },
            )))
        } else {
            None
        };
        let finalizer = if self.eat_if(&Token::Keyword(Keyword::Finally))? {
            Some(Box::new(self.parse_block_statement()?))
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(self.finish(
            marker,
            NodeKind::TryStatement {
                block: Box::new(block),
                handler,
                finalizer,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn types(src: &str) -> Vec<String> {
        match parse(src, &ParseOptions::default()).unwrap().kind {
            NodeKind::Program { body } => body.iter().map(|n| n.type_name().to_string()).collect(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn statement_kinds() {
        assert_eq!(
            types("if (a) b; else c\nfor (;;) break\nfor (k in o) {}\ndo x; while (y) z"),
            vec!["IfStatement", "ForStatement", "ForInStatement", "DoWhileStatement", "ExpressionStatement"]
        );
        assert_eq!(
            types("try { a } catch { b } finally { c }\nswitch (x) { case 1: default: }\nl: while (1) continue l"),
            vec!["TryStatement", "SwitchStatement", "LabeledStatement"]
        );
    }

    #[test]
    fn declarations() {
        assert_eq!(
            types("let {a, ...r} = o; const [x, , y = 2] = z; class C extends D { m() {} static s = 1 }"),
            vec!["VariableDeclaration", "VariableDeclaration", "ClassDeclaration"]
        );
        let err = parse("const a;", &ParseOptions::default()).unwrap_err();
        assert!(err.message.starts_with("Missing initializer in const declaration"));
        let err = parse("switch (x) { default: default: }", &ParseOptions::default()).unwrap_err();
        assert!(err.message.starts_with("Multiple default clauses"));
    }

    #[test]
    fn for_in_heads() {
        assert_eq!(types("for (var k in o);"), vec!["ForInStatement"]);
        assert_eq!(types("for (var i = 0, n = 2; i < n; i++);"), vec!["ForStatement"]);
        assert_eq!(types("for (var i = ('a' in o) ? 1 : 2; i;);"), vec!["ForStatement"]);
        assert!(parse("for (let a, b in o);", &ParseOptions::default()).is_err());
    }
}
