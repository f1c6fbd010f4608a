use std::sync::Arc;

use crate::{
    ast::{
        BinaryOp, Declarator, Expr, ExprKind, Literal, MethodDecl, Param, Step, Stmt, StmtKind,
        TypeName, UnaryOp,
    },
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    lexer::{Keyword, Lexer, NumberLiteral, Token, TokenKind},
};

type ParseResult<T> = Result<T, Diagnostic>;

/// Parses a standalone expression such as `x` or `point.x`.
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source);
    let expr = parser.parse_expression()?;
    if !parser.check(&TokenKind::Eof) {
        let token = parser.peek().clone();
        return Err(parser.error(&token, "unexpected trailing input after expression"));
    }
    Ok(expr)
}

/// Parses every unit of `source` up front.
pub fn parse_units(source: &str) -> ParseResult<Vec<Stmt>> {
    let mut parser = Parser::new(source);
    let mut units = Vec::new();
    while let Some(unit) = parser.next_unit()? {
        units.push(unit);
    }
    Ok(units)
}

/// Reads top-level units one at a time.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    tokens: Vec<Token>,
    current: usize,
    lex_error: Option<Diagnostic>,
    consumed: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            tokens: Vec::new(),
            current: 0,
            lex_error: None,
            consumed: 0,
        }
    }

    /// Parses the next top-level unit, or returns `None` once input is exhausted.
    pub fn next_unit(&mut self) -> ParseResult<Option<Stmt>> {
        if self.check(&TokenKind::Eof) {
            return match self.lex_error.take() {
                Some(diag) => Err(diag),
                None => Ok(None),
            };
        }
        let stmt = self.parse_statement().map_err(|diag| self.prefer_lex_error(diag))?;
        self.consumed = self.previous().span.end;
        self.tokens.drain(..self.current);
        self.current = 0;
        Ok(Some(stmt))
    }

    /// Byte offset just past the last unit returned by [`Parser::next_unit`].
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn prefer_lex_error(&mut self, diag: Diagnostic) -> Diagnostic {
        self.lex_error.take().unwrap_or(diag)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => {
                let token = self.advance();
                let end = self.consume(TokenKind::Semicolon, "expected `;` after `break`")?;
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: token.span.to(end.span),
                })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let token = self.advance();
                let end = self.consume(TokenKind::Semicolon, "expected `;` after `continue`")?;
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: token.span.to(end.span),
                })
            }
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::LBrace => {
                let (items, span) = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(items),
                    span,
                })
            }
            TokenKind::Semicolon => {
                let token = self.advance();
                Ok(Stmt {
                    kind: StmtKind::Empty,
                    span: token.span,
                })
            }
            TokenKind::Keyword(kw) if kw.is_primitive_type() => match self.try_declaration()? {
                Some(stmt) => Ok(stmt),
                None => self.parse_expression_statement(),
            },
            TokenKind::Identifier => match self.try_declaration()? {
                Some(stmt) => Ok(stmt),
                None => self.parse_expression_statement(),
            },
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expression()?;
        let end = self.consume(TokenKind::Semicolon, "expected `;` after expression")?;
        Ok(Stmt {
            span: expr.span.to(end.span),
            kind: StmtKind::Expr(expr),
        })
    }

    /// Recognises `name(params) {`, `Type name(params) {` and `Type name ...;`.
    /// Returns `None` with the cursor untouched when the tokens spell an expression.
    fn try_declaration(&mut self) -> ParseResult<Option<Stmt>> {
        let mark = self.current;
        let start = self.peek().span;

        if self.peek_kind() == TokenKind::Identifier && self.peek_kind_at(1) == TokenKind::LParen {
            let name = self.advance();
            if let Some(params) = self.try_param_list() {
                if self.check(&TokenKind::LBrace) {
                    return self.finish_method(start, name.lexeme, params, None).map(Some);
                }
            }
            self.current = mark;
            return Ok(None);
        }

        let Some(ty) = self.try_type_name() else {
            self.current = mark;
            return Ok(None);
        };
        if self.peek_kind() != TokenKind::Identifier {
            self.current = mark;
            return Ok(None);
        }
        if self.peek_kind_at(1) == TokenKind::LParen {
            let name = self.advance();
            let Some(params) = self.try_param_list() else {
                let token = self.peek().clone();
                return Err(self.error(&token, "malformed parameter list"));
            };
            return self
                .finish_method(start, name.lexeme, params, Some(ty))
                .map(Some);
        }
        let decl = self.parse_declarators(start, ty)?;
        let end = self.consume(TokenKind::Semicolon, "expected `;` after declaration")?;
        Ok(Some(Stmt {
            span: decl.span.to(end.span),
            kind: decl.kind,
        }))
    }

    fn finish_method(
        &mut self,
        start: SourceSpan,
        name: String,
        params: Vec<Param>,
        return_type: Option<TypeName>,
    ) -> ParseResult<Stmt> {
        let (body, span) = self.parse_block()?;
        Ok(Stmt {
            span: start.to(span),
            kind: StmtKind::Method(MethodDecl {
                name,
                params,
                return_type,
                body: Arc::new(body),
            }),
        })
    }

    /// `( [Type] name, ... )` in declaration position; `None` if the tokens do not fit.
    fn try_param_list(&mut self) -> Option<Vec<Param>> {
        if !self.matches(TokenKind::LParen) {
            return None;
        }
        let mut params = Vec::new();
        if self.matches(TokenKind::RParen) {
            return Some(params);
        }
        loop {
            let ty = self.try_type_name()?;
            let param = if self.peek_kind() == TokenKind::Identifier {
                let name = self.advance();
                Param {
                    name: name.lexeme,
                    ty: Some(ty),
                    span: name.span,
                }
            } else if ty.dims == 0 && !ty.name.contains('.') && !is_primitive_name(&ty.name) {
                Param {
                    span: self.previous().span,
                    name: ty.name,
                    ty: None,
                }
            } else {
                return None;
            };
            params.push(param);
            if self.matches(TokenKind::RParen) {
                return Some(params);
            }
            if !self.matches(TokenKind::Comma) {
                return None;
            }
        }
    }

    /// `int`, `String`, `app.ui.Button`, `int[][]`; `None` if the tokens do not fit.
    fn try_type_name(&mut self) -> Option<TypeName> {
        let mut name = match self.peek_kind() {
            TokenKind::Keyword(kw) if kw.is_primitive_type() => self.advance().lexeme,
            TokenKind::Identifier => {
                let mut name = self.advance().lexeme;
                while self.peek_kind() == TokenKind::Dot
                    && self.peek_kind_at(1) == TokenKind::Identifier
                {
                    self.advance();
                    name.push('.');
                    name.push_str(&self.advance().lexeme);
                }
                name
            }
            _ => return None,
        };
        let mut dims = 0;
        while self.peek_kind() == TokenKind::LBracket && self.peek_kind_at(1) == TokenKind::RBracket
        {
            self.advance();
            self.advance();
            dims += 1;
        }
        name.shrink_to_fit();
        Some(TypeName { name, dims })
    }

    fn parse_declarators(&mut self, start: SourceSpan, ty: TypeName) -> ParseResult<Stmt> {
        let mut declarators = Vec::new();
        let mut end = start;
        loop {
            let name = self.consume_identifier("expected variable name")?;
            end = name.span;
            let initializer = if self.matches(TokenKind::Assign) {
                let value = if ty.dims > 0 && self.check(&TokenKind::LBrace) {
                    let element = TypeName {
                        name: ty.name.clone(),
                        dims: ty.dims - 1,
                    };
                    self.parse_array_init(element)?
                } else {
                    self.parse_expression()?
                };
                end = value.span;
                Some(value)
            } else {
                None
            };
            declarators.push(Declarator {
                name: name.lexeme,
                initializer,
                span: name.span.to(end),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(Stmt {
            span: start.to(end),
            kind: StmtKind::VarDecl { ty, declarators },
        })
    }

    fn parse_array_init(&mut self, element: TypeName) -> ParseResult<Expr> {
        let lbrace = self.consume(TokenKind::LBrace, "expected `{` to start array initializer")?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            items.push(self.parse_expression()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let rbrace = self.consume(TokenKind::RBrace, "expected `}` after array initializer")?;
        Ok(Expr {
            span: lbrace.span.to(rbrace.span),
            kind: ExprKind::ArrayInit { element, items },
        })
    }

    fn parse_block(&mut self) -> ParseResult<(Vec<Stmt>, SourceSpan)> {
        let lbrace = self.consume(TokenKind::LBrace, "expected `{` to start block")?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            items.push(self.parse_statement()?);
        }
        let rbrace = self.consume(TokenKind::RBrace, "expected `}` to close block")?;
        Ok((items, lbrace.span.to(rbrace.span)))
    }

    fn parse_condition(&mut self, keyword: &str) -> ParseResult<Expr> {
        self.consume(TokenKind::LParen, &format!("expected `(` after `{keyword}`"))?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected `)` after condition")?;
        Ok(condition)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let condition = self.parse_condition("if")?;
        let then_branch = Box::new(self.parse_statement()?);
        let mut end = then_branch.span;
        let else_branch = if self.matches_keyword(Keyword::Else) {
            let branch = self.parse_statement()?;
            end = branch.span;
            Some(Box::new(branch))
        } else {
            None
        };
        Ok(Stmt {
            span: start.to(end),
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let condition = self.parse_condition("while")?;
        let body = self.parse_statement()?;
        Ok(Stmt {
            span: start.to(body.span),
            kind: StmtKind::While {
                condition,
                body: Box::new(body),
            },
        })
    }

    fn parse_do_while(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let body = self.parse_statement()?;
        if !self.matches_keyword(Keyword::While) {
            let token = self.peek().clone();
            return Err(self.error(&token, "expected `while` after `do` body"));
        }
        let condition = self.parse_condition("while")?;
        let end = self.consume(TokenKind::Semicolon, "expected `;` after do-while")?;
        Ok(Stmt {
            span: start.to(end.span),
            kind: StmtKind::DoWhile {
                body: Box::new(body),
                condition,
            },
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        self.consume(TokenKind::LParen, "expected `(` after `for`")?;

        if let Some((ty, binding)) = self.try_for_each_header() {
            let iterable = self.parse_expression()?;
            self.consume(TokenKind::RParen, "expected `)` after for-each iterable")?;
            let body = self.parse_statement()?;
            return Ok(Stmt {
                span: start.to(body.span),
                kind: StmtKind::ForEach {
                    ty,
                    binding,
                    iterable,
                    body: Box::new(body),
                },
            });
        }

        let mut init = Vec::new();
        if !self.check(&TokenKind::Semicolon) {
            let mark = self.current;
            let first = self.peek().span;
            let declared = match self.try_type_name() {
                Some(ty) if self.peek_kind() == TokenKind::Identifier => {
                    Some(self.parse_declarators(first, ty)?)
                }
                _ => {
                    self.current = mark;
                    None
                }
            };
            match declared {
                Some(stmt) => init.push(stmt),
                None => loop {
                    let expr = self.parse_expression()?;
                    init.push(Stmt {
                        span: expr.span,
                        kind: StmtKind::Expr(expr),
                    });
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                },
            }
        }
        self.consume(TokenKind::Semicolon, "expected `;` after for initializer")?;
        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon, "expected `;` after for condition")?;
        let mut update = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                update.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after for clauses")?;
        let body = self.parse_statement()?;
        Ok(Stmt {
            span: start.to(body.span),
            kind: StmtKind::For {
                init,
                condition,
                update,
                body: Box::new(body),
            },
        })
    }

    fn try_for_each_header(&mut self) -> Option<(Option<TypeName>, String)> {
        let mark = self.current;
        if self.peek_kind() == TokenKind::Identifier && self.peek_kind_at(1) == TokenKind::Colon {
            let binding = self.advance().lexeme;
            self.advance();
            return Some((None, binding));
        }
        if let Some(ty) = self.try_type_name() {
            if self.peek_kind() == TokenKind::Identifier
                && self.peek_kind_at(1) == TokenKind::Colon
            {
                let binding = self.advance().lexeme;
                self.advance();
                return Some((Some(ty), binding));
            }
        }
        self.current = mark;
        None
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let end = self.consume(TokenKind::Semicolon, "expected `;` after return")?;
        Ok(Stmt {
            span: start.to(end.span),
            kind: StmtKind::Return(value),
        })
    }

    fn parse_import(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let mut path = self.consume_identifier("expected name after `import`")?.lexeme;
        let mut wildcard = false;
        while self.matches(TokenKind::Dot) {
            if self.matches(TokenKind::Star) {
                wildcard = true;
                break;
            }
            let segment = self.consume_identifier("expected name segment after `.`")?;
            path.push('.');
            path.push_str(&segment.lexeme);
        }
        let end = self.consume(TokenKind::Semicolon, "expected `;` after import")?;
        Ok(Stmt {
            span: start.to(end.span),
            kind: StmtKind::Import { path, wildcard },
        })
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let target = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinaryOp::Add),
            TokenKind::MinusAssign => Some(BinaryOp::Sub),
            TokenKind::StarAssign => Some(BinaryOp::Mul),
            TokenKind::SlashAssign => Some(BinaryOp::Div),
            TokenKind::PercentAssign => Some(BinaryOp::Mod),
            _ => return Ok(target),
        };
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr {
            span: target.span.to(value.span),
            kind: ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let condition = self.parse_binary(0)?;
        if !self.matches(TokenKind::Question) {
            return Ok(condition);
        }
        let then_value = self.parse_expression()?;
        self.consume(TokenKind::Colon, "expected `:` in conditional expression")?;
        let else_value = self.parse_conditional()?;
        Ok(Expr {
            span: condition.span.to(else_value.span),
            kind: ExprKind::Conditional {
                condition: Box::new(condition),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
        })
    }

    /// Left-associative binary operators, lowest precedence first.
    fn parse_binary(&mut self, level: usize) -> ParseResult<Expr> {
        if level == BINARY_LEVELS {
            return self.parse_unary();
        }
        let mut expr = self.parse_binary(level + 1)?;
        loop {
            let kind = self.peek_kind();
            let Some(op) = binary_operator(level, &kind) else {
                break;
            };
            self.advance();
            let right = self.parse_binary(level + 1)?;
            expr = Expr {
                span: expr.span.to(right.span),
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let operator = self.advance().span;
            let expr = self.parse_unary()?;
            return Ok(Expr {
                span: operator.to(expr.span),
                kind: ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                },
            });
        }
        let step = match self.peek_kind() {
            TokenKind::PlusPlus => Some(Step::Increment),
            TokenKind::MinusMinus => Some(Step::Decrement),
            _ => None,
        };
        if let Some(step) = step {
            let operator = self.advance().span;
            let target = self.parse_unary()?;
            return Ok(Expr {
                span: operator.to(target.span),
                kind: ExprKind::PreStep {
                    step,
                    target: Box::new(target),
                },
            });
        }
        if self.check(&TokenKind::LParen) {
            if let Some(cast) = self.try_cast()? {
                return Ok(cast);
            }
        }
        self.parse_postfix()
    }

    /// `(int) x`, `(app.Listener) this`; leaves the cursor untouched for a parenthesised expression.
    fn try_cast(&mut self) -> ParseResult<Option<Expr>> {
        let mark = self.current;
        let lparen = self.advance().span;
        let primitive = matches!(self.peek_kind(), TokenKind::Keyword(kw) if kw.is_primitive_type());
        let ty = match self.try_type_name() {
            Some(ty) if self.matches(TokenKind::RParen) => ty,
            _ => {
                self.current = mark;
                return Ok(None);
            }
        };
        let operand_follows = match self.peek_kind() {
            TokenKind::Identifier
            | TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::Char(_)
            | TokenKind::LParen
            | TokenKind::Bang => true,
            TokenKind::Keyword(kw) => matches!(
                kw,
                Keyword::This
                    | Keyword::Super
                    | Keyword::New
                    | Keyword::True
                    | Keyword::False
                    | Keyword::Null
            ),
            TokenKind::Minus | TokenKind::Plus => primitive,
            _ => false,
        };
        if !operand_follows {
            self.current = mark;
            return Ok(None);
        }
        let expr = self.parse_unary()?;
        Ok(Some(Expr {
            span: lparen.to(expr.span),
            kind: ExprKind::Cast {
                ty,
                expr: Box::new(expr),
            },
        }))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(TokenKind::Dot) {
                let name = self.consume_identifier("expected member name after `.`")?;
                if self.check(&TokenKind::LParen) {
                    let (args, end) = self.parse_arguments()?;
                    expr = Expr {
                        span: expr.span.to(end),
                        kind: ExprKind::MethodCall {
                            target: Box::new(expr),
                            name: name.lexeme,
                            args,
                        },
                    };
                } else {
                    expr = Expr {
                        span: expr.span.to(name.span),
                        kind: ExprKind::Field {
                            target: Box::new(expr),
                            field: name.lexeme,
                        },
                    };
                }
            } else if self.matches(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                let bracket = self.consume(TokenKind::RBracket, "expected `]` after index")?;
                expr = Expr {
                    span: expr.span.to(bracket.span),
                    kind: ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                };
            } else {
                break;
            }
        }
        let step = match self.peek_kind() {
            TokenKind::PlusPlus => Some(Step::Increment),
            TokenKind::MinusMinus => Some(Step::Decrement),
            _ => None,
        };
        if let Some(step) = step {
            let operator = self.advance().span;
            expr = Expr {
                span: expr.span.to(operator),
                kind: ExprKind::PostStep {
                    step,
                    target: Box::new(expr),
                },
            };
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> ParseResult<(Vec<Expr>, SourceSpan)> {
        self.consume(TokenKind::LParen, "expected `(` before arguments")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RParen, "expected `)` after arguments")?;
        Ok((args, paren.span))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let literal = match &token.kind {
            TokenKind::Number(NumberLiteral::Int(n)) => Some(Literal::Int(*n)),
            TokenKind::Number(NumberLiteral::Long(n)) => Some(Literal::Long(*n)),
            TokenKind::Number(NumberLiteral::Float(n)) => Some(Literal::Float(*n)),
            TokenKind::Number(NumberLiteral::Double(n)) => Some(Literal::Double(*n)),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            TokenKind::Char(c) => Some(Literal::Char(*c)),
            TokenKind::Keyword(Keyword::True) => Some(Literal::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Some(Literal::Bool(false)),
            TokenKind::Keyword(Keyword::Null) => Some(Literal::Null),
            TokenKind::Keyword(Keyword::Void) => Some(Literal::Void),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr {
                span: token.span,
                kind: ExprKind::Literal(literal),
            });
        }
        match token.kind {
            TokenKind::Identifier => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    let (args, end) = self.parse_arguments()?;
                    Ok(Expr {
                        span: token.span.to(end),
                        kind: ExprKind::Call {
                            name: token.lexeme,
                            args,
                        },
                    })
                } else {
                    Ok(Expr {
                        span: token.span,
                        kind: ExprKind::Name(token.lexeme),
                    })
                }
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::This,
                })
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Super,
                })
            }
            TokenKind::Keyword(Keyword::New) => self.parse_new(),
            TokenKind::LParen => {
                let lparen = self.advance();
                let inner = self.parse_expression()?;
                let rparen = self.consume(TokenKind::RParen, "expected `)` after expression")?;
                Ok(Expr {
                    span: lparen.span.to(rparen.span),
                    kind: ExprKind::Group(Box::new(inner)),
                })
            }
            _ => Err(self.error(&token, "unexpected token in expression")),
        }
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span;
        let class = match self.peek_kind() {
            TokenKind::Keyword(kw) if kw.is_primitive_type() => TypeName::new(self.advance().lexeme),
            _ => {
                let mut name = self.consume_identifier("expected type after `new`")?.lexeme;
                while self.matches(TokenKind::Dot) {
                    let segment = self.consume_identifier("expected name segment after `.`")?;
                    name.push('.');
                    name.push_str(&segment.lexeme);
                }
                TypeName::new(name)
            }
        };
        if self.matches(TokenKind::LBracket) {
            if self.matches(TokenKind::RBracket) {
                return self.parse_array_init(class).map(|init| Expr {
                    span: start.to(init.span),
                    kind: init.kind,
                });
            }
            let length = self.parse_expression()?;
            let end = self.consume(TokenKind::RBracket, "expected `]` after array length")?;
            return Ok(Expr {
                span: start.to(end.span),
                kind: ExprKind::NewArray {
                    element: class,
                    length: Box::new(length),
                },
            });
        }
        let (args, end) = self.parse_arguments()?;
        Ok(Expr {
            span: start.to(end),
            kind: ExprKind::New { class, args },
        })
    }

    fn fill(&mut self, index: usize) {
        while self.tokens.len() <= index {
            if matches!(self.tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
                let eof = self.tokens[self.tokens.len() - 1].clone();
                self.tokens.push(eof);
                continue;
            }
            match self.lexer.next_token() {
                Ok(token) => self.tokens.push(token),
                Err(diag) => {
                    let span = diag.span.unwrap_or_default();
                    self.lex_error = Some(diag);
                    self.tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        span: SourceSpan::new(span.start, span.start),
                    });
                }
            }
        }
    }

    fn peek(&mut self) -> &Token {
        self.fill(self.current);
        &self.tokens[self.current]
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn peek_kind_at(&mut self, offset: usize) -> TokenKind {
        self.fill(self.current + offset);
        self.tokens[self.current + offset].kind.clone()
    }

    fn check(&mut self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(TokenKind::Keyword(keyword))
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.error(&token, message))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> ParseResult<Token> {
        self.consume(TokenKind::Identifier, message)
    }

    fn error(&mut self, token: &Token, message: &str) -> Diagnostic {
        if let Some(diag) = self.lex_error.take() {
            return diag;
        }
        let diag = Diagnostic::new(DiagnosticKind::Parser, message.to_string()).with_span(token.span);
        if token.kind == TokenKind::Eof {
            diag.at_end_of_input()
        } else {
            diag.with_note(format!("found `{}`", token.lexeme))
        }
    }
}

const BINARY_LEVELS: usize = 9;

fn binary_operator(level: usize, kind: &TokenKind) -> Option<BinaryOp> {
    let op = match (level, kind) {
        (0, TokenKind::DoublePipe) => BinaryOp::Or,
        (1, TokenKind::DoubleAmpersand) => BinaryOp::And,
        (2, TokenKind::Pipe) => BinaryOp::BitOr,
        (3, TokenKind::Caret) => BinaryOp::BitXor,
        (4, TokenKind::Ampersand) => BinaryOp::BitAnd,
        (5, TokenKind::EqualEqual) => BinaryOp::Equal,
        (5, TokenKind::BangEqual) => BinaryOp::NotEqual,
        (6, TokenKind::Less) => BinaryOp::Less,
        (6, TokenKind::LessEqual) => BinaryOp::LessEqual,
        (6, TokenKind::Greater) => BinaryOp::Greater,
        (6, TokenKind::GreaterEqual) => BinaryOp::GreaterEqual,
        (7, TokenKind::Plus) => BinaryOp::Add,
        (7, TokenKind::Minus) => BinaryOp::Sub,
        (8, TokenKind::Star) => BinaryOp::Mul,
        (8, TokenKind::Slash) => BinaryOp::Div,
        (8, TokenKind::Percent) => BinaryOp::Mod,
        _ => return None,
    };
    Some(op)
}

fn is_primitive_name(name: &str) -> bool {
    matches!(
        name,
        "boolean" | "char" | "byte" | "short" | "int" | "long" | "float" | "double" | "void"
    )
}
