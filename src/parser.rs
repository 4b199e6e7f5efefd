use crate::{
    ast::{
        Applicability, AutoOp, BinaryOp, Block, BlockItem, Builder, Class, Constant, Constructor,
        ExprArena, ExprId, ExprKind, Field, Fix, Method, NameError, Param, Program, Stmt, UnaryOp,
        VarDecl, Visibility,
    },
    lexer::{self, extract},
    token::{Span, Spanned, Token, TokenKind},
    types::{Name, Type},
};

type Result<T, E = ()> = std::result::Result<T, E>;

/// Parses a whole compilation unit. The first syntax error halts parsing;
/// name-reuse diagnostics are collected and fail the parse without halting
/// tree construction.
pub fn parse_program(src: &str, tokens: &mut Vec<Token>) -> Result<Program, Vec<Spanned<Error>>> {
    assert!(tokens.is_empty());
    lexer::lex(src, tokens);

    let mut builder = Builder::new();
    let mut p = Parser::new(src, tokens, &mut builder);
    let parsed = p.parse_program();
    let mut errors = p.errors;

    match parsed {
        Ok(classes) => {
            assert!(errors.is_empty());
            let (program, name_errors) = builder.finish_program(classes);
            errors.extend(
                name_errors
                    .into_iter()
                    .map(|e| e.span.wrap(Error::Name(e.inner))),
            );
            if errors.is_empty() {
                Ok(program)
            } else {
                Err(errors)
            }
        }
        Err(()) => Err(errors),
    }
}

/// Parses a single expression followed by end of input. Used by tests.
pub fn parse_expr(
    src: &str,
    tokens: &mut Vec<Token>,
) -> Result<(ExprArena, ExprId), Vec<Spanned<Error>>> {
    assert!(tokens.is_empty());
    lexer::lex(src, tokens);

    let mut builder = Builder::new();
    let mut p = Parser::new(src, tokens, &mut builder);
    let parsed = p.parse_expr().and_then(|expr| {
        p.consume(TokenKind::Eof)?;
        Ok(expr)
    });
    let errors = p.errors;

    match parsed {
        Ok(expr) => {
            assert!(errors.is_empty());
            let (program, _) = builder.finish_program(vec![]);
            Ok((program.arena, expr))
        }
        Err(()) => Err(errors),
    }
}

#[derive(Default)]
struct Members {
    fields: Vec<Field>,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
}

struct Parser<'src, 'tok, 'b> {
    src: &'src str,
    tokens: &'tok [Token],
    builder: &'b mut Builder,
    cursor: usize,
    errors: Vec<Spanned<Error>>,
}

impl Parser<'_, '_, '_> {
    fn parse_program(&mut self) -> Result<Vec<Class>> {
        let mut classes = Vec::with_capacity(4);
        while self.except([]) {
            classes.push(self.parse_class()?);
        }
        self.consume(TokenKind::Eof)?;
        Ok(classes)
    }

    fn parse_class(&mut self) -> Result<Class> {
        let start = self.consume(TokenKind::Class)?;
        let name_token = self.consume(TokenKind::Identifier)?;
        let name = self.name(name_token);

        let superclass = if self.take(TokenKind::Extends) {
            let token = self.consume(TokenKind::Identifier)?;
            Some(self.name(token))
        } else {
            None
        };

        self.consume(TokenKind::LBrace)?;
        let mut members = Members::default();
        while self.except([TokenKind::RBrace]) {
            self.parse_member(&name, &mut members)?;
        }
        let end = self.consume(TokenKind::RBrace)?;

        Ok(self.builder.finish_class(
            name,
            superclass,
            members.fields,
            members.constructors,
            members.methods,
            start.span().to(end.span()),
        ))
    }

    /// Parses one class-body member. Constructors are recognized by an
    /// identifier directly followed by `(`; everything else starts with a
    /// type and is a field list or a method.
    fn parse_member(&mut self, class: &Name, members: &mut Members) -> Result<()> {
        let start = self.peek();

        let mut visibility = Visibility::Private;
        if self.take(TokenKind::Public) {
            visibility = Visibility::Public;
        } else {
            self.take(TokenKind::Private);
        }
        let mut applicability = Applicability::Instance;
        if self.take(TokenKind::Static) {
            applicability = Applicability::Static;
        }

        if self.is(TokenKind::Identifier) && self.peek_second().kind == TokenKind::LParen {
            let name_token = self.advance();
            let name = self.name(name_token);
            let params = self.parse_formals()?;
            let (body, body_span) = self.parse_block()?;
            members.constructors.push(self.builder.finish_constructor(
                name,
                class.clone(),
                visibility,
                params,
                body,
                start.span().to(body_span),
            ));
            return Ok(());
        }

        let ty = if self.is(TokenKind::Void) {
            self.advance();
            Type::Void
        } else {
            self.parse_type()?
        };
        let name_token = self.consume(TokenKind::Identifier)?;

        if self.is(TokenKind::LParen) {
            let name = self.name(name_token);
            let params = self.parse_formals()?;
            let (body, body_span) = self.parse_block()?;
            members.methods.push(self.builder.finish_method(
                name,
                class.clone(),
                visibility,
                applicability,
                ty,
                params,
                body,
                start.span().to(body_span),
            ));
            return Ok(());
        }

        // Field list. `void` is only meaningful as a method return type.
        if ty == Type::Void {
            let c = self.peek();
            self.error(c.span().wrap(Error::Unexpected {
                actual: c.kind,
                expected: TokenKind::LParen,
            }));
            return Err(());
        }
        let mut names = vec![(self.name(name_token), name_token.span())];
        while self.take(TokenKind::Comma) {
            let token = self.consume(TokenKind::Identifier)?;
            names.push((self.name(token), token.span()));
        }
        self.consume(TokenKind::Semicolon)?;
        for (name, span) in names {
            members.fields.push(self.builder.new_field(
                name,
                class.clone(),
                visibility,
                applicability,
                ty.clone(),
                span,
            ));
        }
        Ok(())
    }

    fn parse_formals(&mut self) -> Result<Vec<Param>> {
        self.consume(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.is(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let token = self.consume(TokenKind::Identifier)?;
                params.push(Param {
                    ty,
                    name: self.name(token),
                    span: token.span(),
                });
                if !self.take(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(params)
    }

    const TYPE_STARTS: &'static [TokenKind] = &[
        TokenKind::Int,
        TokenKind::Float,
        TokenKind::Boolean,
        TokenKind::Identifier,
    ];

    fn parse_type(&mut self) -> Result<Type> {
        let token = self.consume_any(Self::TYPE_STARTS)?;
        Ok(match token.kind {
            TokenKind::Int => Type::Int,
            TokenKind::Float => Type::Float,
            TokenKind::Boolean => Type::Boolean,
            TokenKind::Identifier => Type::Object(self.name(token)),
            _ => unreachable!(),
        })
    }

    fn parse_block(&mut self) -> Result<(Block, Span)> {
        let start = self.consume(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while self.except([TokenKind::RBrace]) {
            items.push(self.parse_block_item()?);
        }
        let end = self.consume(TokenKind::RBrace)?;
        // Inner blocks finish before their enclosing one, which is what
        // gives local declarations their innermost-first id order.
        Ok((
            self.builder.finish_block(items),
            start.span().to(end.span()),
        ))
    }

    fn parse_block_item(&mut self) -> Result<BlockItem> {
        if self.starts_var_decl() {
            return Ok(BlockItem::Decl(self.parse_var_decl()?));
        }
        Ok(BlockItem::Stmt(self.parse_stmt()?))
    }

    /// A declaration starts with a primitive type keyword, or with two
    /// consecutive identifiers (a class-typed declaration).
    fn starts_var_decl(&self) -> bool {
        match self.peek().kind {
            TokenKind::Int | TokenKind::Float | TokenKind::Boolean => true,
            TokenKind::Identifier => self.peek_second().kind == TokenKind::Identifier,
            _ => false,
        }
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl> {
        let ty = self.parse_type()?;
        let mut names = Vec::with_capacity(1);
        loop {
            let token = self.consume(TokenKind::Identifier)?;
            names.push((self.name(token), token.span()));
            if !self.take(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::Semicolon)?;
        Ok(VarDecl { ty, names })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek().kind {
            TokenKind::LBrace => {
                let (block, _) = self.parse_block()?;
                Ok(Stmt::Block(block))
            }
            TokenKind::If => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let then_branch = Box::new(self.parse_stmt()?);
                let else_branch = if self.take(TokenKind::Else) {
                    Box::new(self.parse_stmt()?)
                } else {
                    Box::new(Stmt::Skip)
                };
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::While { cond, body })
            }
            TokenKind::For => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let init = if self.is(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_stmt_expr()?)
                };
                self.consume(TokenKind::Semicolon)?;
                let cond = if self.is(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume(TokenKind::Semicolon)?;
                let update = if self.is(TokenKind::RParen) {
                    None
                } else {
                    Some(self.parse_stmt_expr()?)
                };
                self.consume(TokenKind::RParen)?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::For {
                    init,
                    cond,
                    update,
                    body,
                })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.is(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume(TokenKind::Semicolon)?;
                Ok(Stmt::Return(value))
            }
            TokenKind::Break => {
                let token = self.advance();
                self.consume(TokenKind::Semicolon)?;
                Ok(Stmt::Break(token.span()))
            }
            TokenKind::Continue => {
                let token = self.advance();
                self.consume(TokenKind::Semicolon)?;
                Ok(Stmt::Continue(token.span()))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Skip)
            }
            _ => {
                let expr = self.parse_stmt_expr()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// A statement expression: an assignment, an auto increment/decrement,
    /// or a method invocation.
    fn parse_stmt_expr(&mut self) -> Result<ExprId> {
        let expr = self.parse_expr()?;
        match &self.builder.arena.get(expr).kind {
            ExprKind::Assign { .. } | ExprKind::Auto { .. } | ExprKind::Call { .. } => Ok(expr),
            _ => {
                let span = self.builder.arena.get(expr).span;
                self.error(span.wrap(Error::InvalidStatementExpr));
                Err(())
            }
        }
    }

    fn parse_expr(&mut self) -> Result<ExprId> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<ExprId> {
        let lhs_token = self.advance();
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();

            if let Some((lbp, rbp)) = Self::infix_binding_power(op_token.kind) {
                if lbp < min_bp {
                    // Operator binds less tightly than the minimum required
                    break;
                }

                self.advance(); // Operator
                lhs = self.parse_led(op_token, lhs, rbp)?;
            } else {
                // Not an infix operator
                break;
            }
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping)
    fn parse_nud(&mut self, token: Token) -> Result<ExprId> {
        let (kind, span) = match token.kind {
            TokenKind::Identifier => {
                let var = ExprKind::Var {
                    name: self.name(token),
                    binding: None,
                };
                (var, token.span())
            }
            TokenKind::Number => {
                let Ok(parsed) = extract::int(token, self.src) else {
                    self.error(token.span().wrap(Error::ParseInt));
                    return Err(());
                };
                (ExprKind::Constant(Constant::Int(parsed)), token.span())
            }
            TokenKind::FloatNumber => {
                let Ok(parsed) = extract::float(token, self.src) else {
                    self.error(token.span().wrap(Error::ParseFloat));
                    return Err(());
                };
                (ExprKind::Constant(Constant::Float(parsed)), token.span())
            }
            TokenKind::String => {
                let value = extract::string(token, self.src);
                (
                    ExprKind::Constant(Constant::Str(value.into())),
                    token.span(),
                )
            }
            TokenKind::True => (ExprKind::Constant(Constant::Boolean(true)), token.span()),
            TokenKind::False => (ExprKind::Constant(Constant::Boolean(false)), token.span()),
            TokenKind::Null => (ExprKind::Constant(Constant::Null), token.span()),
            TokenKind::This => (ExprKind::This, token.span()),
            TokenKind::Super => (ExprKind::Super, token.span()),

            // Grouping: ( expr ). Introduces no node of its own.
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                return Ok(expr);
            }

            // Instantiation: new ID ( args )
            TokenKind::New => {
                let class_token = self.consume(TokenKind::Identifier)?;
                let class = self.name(class_token);
                let (args, end_span) = self.parse_args()?;
                let new = ExprKind::New { class, args };
                (new, token.span().to(end_span))
            }

            // Prefix operators: !, -, ++, --
            kind @ (TokenKind::Not
            | TokenKind::Minus
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus) => {
                // SAFETY: Should have prefix due to above match
                let ((), rbp) = Self::prefix_binding_power(kind).unwrap();
                let operand = self.parse_expr_bp(rbp)?;
                let span = token.span().to(self.builder.arena.get(operand).span);

                let kind = match kind {
                    TokenKind::Not => ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand,
                    },
                    TokenKind::Minus => ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand,
                    },
                    auto @ (TokenKind::PlusPlus | TokenKind::MinusMinus) => {
                        self.expect_lvalue(operand)?;
                        ExprKind::Auto {
                            target: operand,
                            op: if auto == TokenKind::PlusPlus {
                                AutoOp::Inc
                            } else {
                                AutoOp::Dec
                            },
                            fix: Fix::Pre,
                        }
                    }
                    _ => unreachable!(),
                };
                (kind, span)
            }

            kind if kind.is_error() => {
                self.error(token.span().wrap(Error::Lexer(kind)));
                return Err(());
            }

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                self.error(token.span().wrap(error));
                return Err(());
            }
        };

        Ok(self.builder.arena.alloc(kind, span))
    }

    /// led: Parses tokens that follow a left-hand-side expression
    /// (infix/postfix operators)
    fn parse_led(&mut self, op_token: Token, lhs: ExprId, rbp: u8) -> Result<ExprId> {
        let lhs_span = self.builder.arena.get(lhs).span;

        let (kind, span) = match op_token.kind {
            // Binary operators
            kind @ (TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::AndAnd
            | TokenKind::OrOr
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq) => {
                let op = match kind {
                    TokenKind::Plus => BinaryOp::Add,
                    TokenKind::Minus => BinaryOp::Sub,
                    TokenKind::Star => BinaryOp::Mul,
                    TokenKind::Slash => BinaryOp::Div,
                    TokenKind::AndAnd => BinaryOp::And,
                    TokenKind::OrOr => BinaryOp::Or,
                    TokenKind::Eq => BinaryOp::Eq,
                    TokenKind::NotEq => BinaryOp::NotEq,
                    TokenKind::Less => BinaryOp::Less,
                    TokenKind::LessEq => BinaryOp::LessEq,
                    TokenKind::Greater => BinaryOp::Greater,
                    TokenKind::GreaterEq => BinaryOp::GreaterEq,
                    _ => unreachable!(),
                };
                // Parse right operand with correct precedence
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs_span.to(self.builder.arena.get(rhs).span);
                (ExprKind::Binary { op, lhs, rhs }, span)
            }

            // Assignment: lvalue = expr (right-associative)
            TokenKind::Assign => {
                if !self.is_lvalue(lhs) {
                    self.error(lhs_span.wrap(Error::InvalidAssignmentTarget));
                    return Err(());
                }
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs_span.to(self.builder.arena.get(rhs).span);
                (ExprKind::Assign { lhs, rhs }, span)
            }

            // Postfix auto: lvalue ++ / lvalue --
            kind @ (TokenKind::PlusPlus | TokenKind::MinusMinus) => {
                self.expect_lvalue(lhs)?;
                let auto = ExprKind::Auto {
                    target: lhs,
                    op: if kind == TokenKind::PlusPlus {
                        AutoOp::Inc
                    } else {
                        AutoOp::Dec
                    },
                    fix: Fix::Post,
                };
                (auto, lhs_span.to(op_token.span()))
            }

            // Field access or method invocation: expr . ID [( args )]
            TokenKind::Dot => {
                let member_token = self.consume(TokenKind::Identifier)?;
                let member = self.name(member_token);
                if self.is(TokenKind::LParen) {
                    let (args, end_span) = self.parse_args()?;
                    let call = ExprKind::Call {
                        base: lhs,
                        method: member,
                        args,
                        method_id: None,
                    };
                    (call, lhs_span.to(end_span))
                } else {
                    let access = ExprKind::FieldAccess {
                        base: lhs,
                        field: member,
                        field_id: None,
                    };
                    (access, lhs_span.to(member_token.span()))
                }
            }

            // A call must name its method through a receiver: `f(...)`
            // without a `.` has no callee shape.
            TokenKind::LParen => {
                self.error(lhs_span.wrap(Error::InvalidCallTarget));
                return Err(());
            }

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                self.error(op_token.span().wrap(error));
                return Err(());
            }
        };

        Ok(self.builder.arena.alloc(kind, span))
    }

    /// Parses `( [expr [, expr]*] )`, returning the arguments and the span
    /// of the closing parenthesis.
    fn parse_args(&mut self) -> Result<(Vec<ExprId>, Span)> {
        self.consume(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.is(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.take(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.consume(TokenKind::RParen)?;
        Ok((args, end.span()))
    }

    fn is_lvalue(&self, expr: ExprId) -> bool {
        matches!(
            self.builder.arena.get(expr).kind,
            ExprKind::Var { .. } | ExprKind::FieldAccess { .. }
        )
    }

    fn expect_lvalue(&mut self, expr: ExprId) -> Result<()> {
        if self.is_lvalue(expr) {
            return Ok(());
        }
        let span = self.builder.arena.get(expr).span;
        self.error(span.wrap(Error::InvalidAutoTarget));
        Err(())
    }

    fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
        let bp = match kind {
            // Assignment (right-associative)
            TokenKind::Assign => (2, 1),

            // Logical or / and
            TokenKind::OrOr => (3, 4),
            TokenKind::AndAnd => (5, 6),

            // Equality
            TokenKind::Eq | TokenKind::NotEq => (7, 8),

            // Relational
            TokenKind::Less | TokenKind::LessEq | TokenKind::Greater | TokenKind::GreaterEq => {
                (9, 10)
            }

            // Addition/Subtraction
            TokenKind::Plus | TokenKind::Minus => (11, 12),

            // Multiplication/Division
            TokenKind::Star | TokenKind::Slash => (13, 14),

            // Postfix auto increment/decrement
            TokenKind::PlusPlus | TokenKind::MinusMinus => (17, 18),

            // Member access / invocation
            TokenKind::Dot => (19, 20),
            // Treat call '(' with the same precedence as '.'
            TokenKind::LParen => (19, 20),

            _ => return None,
        };
        Some(bp)
    }

    fn prefix_binding_power(kind: TokenKind) -> Option<((), u8)> {
        let bp = match kind {
            TokenKind::Not | TokenKind::Minus | TokenKind::PlusPlus | TokenKind::MinusMinus => {
                ((), 15)
            }
            _ => return None,
        };
        Some(bp)
    }
}

impl Parser<'_, '_, '_> {
    pub fn new<'src, 'tok, 'b>(
        src: &'src str,
        tokens: &'tok [Token],
        builder: &'b mut Builder,
    ) -> Parser<'src, 'tok, 'b> {
        let mut p = Parser {
            src,
            tokens,
            builder,
            cursor: 0,
            errors: Vec::with_capacity(8),
        };
        p.setup();
        p
    }

    fn name(&self, token: Token) -> Name {
        extract::ident(token, self.src).into()
    }

    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }

    /// Setups the parser, skipping any trivia if necessary.
    fn setup(&mut self) {
        while self.peek().kind.is_trivia() {
            self.advance();
        }
    }

    /// Returns the current token.
    #[inline]
    fn peek(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the token after the current one, skipping trivia.
    fn peek_second(&self) -> Token {
        let mut i = self.cursor + 1;
        loop {
            match self.tokens.get(i) {
                Some(token) if token.kind.is_trivia() => i += 1,
                Some(token) => return *token,
                None => return Token::eof_for(self.src),
            }
        }
    }

    /// Returns the current token and advances. Skips any trivia.
    fn advance(&mut self) -> Token {
        let c = self.peek(); // Before any advancement
        while {
            self.cursor += 1;
            self.peek().kind.is_trivia()
        } {}
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning
    /// true. If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not,
    /// records an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            self.error(c.span().wrap(Error::Unexpected {
                actual: c.kind,
                expected: expect,
            }));
            Err(())
        }
    }

    /// Advances if the current token matches any of the provided tokens.
    /// If not, records an error.
    fn consume_any(&mut self, expect: &'static [TokenKind]) -> Result<Token> {
        for t in expect {
            if self.is(*t) {
                return Ok(self.advance());
            }
        }
        let c = self.peek();
        self.error(c.span().wrap(Error::UnexpectedAny {
            actual: c.kind,
            expected: Box::from(expect),
        }));
        Err(())
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&mut self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek();
        for e in except {
            if c.kind == e {
                return false;
            }
        }
        c.kind != TokenKind::Eof
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidAssignmentTarget,
    InvalidAutoTarget,
    InvalidCallTarget,
    InvalidStatementExpr,
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    ParseInt,
    ParseFloat,
    /// A token kind which holds the [`TokenKind::is_error`] property.
    Lexer(TokenKind),
    /// A non-halting name diagnostic from tree construction.
    Name(NameError),
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    pub fn parse_program(src: &str) -> Program {
        super::parse_program(src, &mut Vec::with_capacity(512)).expect("failed to parse")
    }

    pub fn parse_expr(src: &str) -> (ExprArena, ExprId) {
        super::parse_expr(src, &mut Vec::with_capacity(512)).expect("failed to parse")
    }
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_integer_literal_expr() {
            let expr = "12345";
            let tree_ok = "int 12345 (0..5)";
        }

        fn test_float_literal_expr() {
            let expr = "3.1";
            let tree_ok = "float 3.1 (0..3)";
        }

        fn test_boolean_and_null_exprs() {
            let expr = "true == null";
            let tree_ok = "
                binary == (0..12)
                  bool true (0..4)
                  null (8..12)
            ";
        }

        fn test_string_literal_expr() {
            let expr = r#""hello world""#;
            let tree_ok = r#"string "hello world" (0..13)"#;
        }

        fn test_identifier_expr() {
            let expr = "myVar";
            let tree_ok = "var myVar (0..5)";
        }

        fn test_this_expr() {
            let expr = "this";
            let tree_ok = "this (0..4)";
        }

        fn test_parenthesized_expr_introduces_no_node() {
            let expr = "(x)";
            let tree_ok = "var x (1..2)";
        }

        fn test_unary_exprs() {
            let expr = "!-x";
            let tree_ok = "
                unary ! (0..3)
                  unary - (1..3)
                    var x (2..3)
            ";
        }

        fn test_prefix_auto_expr() {
            let expr = "++x";
            let tree_ok = "
                auto pre ++ (0..3)
                  var x (2..3)
            ";
        }

        fn test_postfix_auto_expr() {
            let expr = "x--";
            let tree_ok = "
                auto post -- (0..3)
                  var x (0..1)
            ";
        }

        fn test_auto_binds_through_field_access() {
            let expr = "x++ + --y.f";
            let tree_ok = "
                binary + (0..11)
                  auto post ++ (0..3)
                    var x (0..1)
                  auto pre -- (6..11)
                    field-access f (8..11)
                      var y (8..9)
            ";
        }

        fn test_precedence_arith() {
            let expr = "1 + 2 * 3 < 4 == true";
            let tree_ok = "
                binary == (0..21)
                  binary < (0..13)
                    binary + (0..9)
                      int 1 (0..1)
                      binary * (4..9)
                        int 2 (4..5)
                        int 3 (8..9)
                    int 4 (12..13)
                  bool true (17..21)
            ";
        }

        fn test_precedence_logical_and_assignment() {
            let expr = "a = b || c && d";
            let tree_ok = "
                assign (0..15)
                  var a (0..1)
                  binary || (4..15)
                    var b (4..5)
                    binary && (9..15)
                      var c (9..10)
                      var d (14..15)
            ";
        }

        fn test_assignment_is_right_associative() {
            let expr = "a = b = c";
            let tree_ok = "
                assign (0..9)
                  var a (0..1)
                  assign (4..9)
                    var b (4..5)
                    var c (8..9)
            ";
        }

        fn test_field_access_chain() {
            let expr = "a.b.c";
            let tree_ok = "
                field-access c (0..5)
                  field-access b (0..3)
                    var a (0..1)
            ";
        }

        fn test_call_with_args() {
            let expr = "this.m(new A(), B.f)";
            let tree_ok = "
                call m (0..20)
                  this (0..4)
                  arguments
                    new A (7..14)
                    field-access f (16..19)
                      var B (16..17)
            ";
        }

        fn test_simple_class() {
            let program = "class A { }";
            let tree_ok = "class A";
        }

        fn test_class_with_superclass() {
            let program = "class B extends A { }";
            let tree_ok = "class B extends A";
        }

        fn test_fields_with_modifiers() {
            let program = "class A { int x, y; public static float f; }";
            let tree_ok = "
                class A
                  field 1 private instance int x
                  field 2 private instance int y
                  field 3 public static float f
            ";
        }

        fn test_constructor_and_method() {
            let program = "class A { public A(int n) { } void m() { } }";
            let tree_ok = "
                class A
                  constructor 1 public A
                    formal 2 int n
                    body
                  method 2 private instance void m
                    body
            ";
        }

        fn test_local_declarations_resolve() {
            let program = "class A { void m() { int x; x = x + 1; } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    local 2 int x
                    body
                      assign (28..37)
                        var x #2 (28..29)
                        binary + (32..37)
                          var x #2 (32..33)
                          int 1 (36..37)
            ";
        }

        fn test_if_else_statement() {
            let program = "class A { void m() { if (1 < 2) return 1; else return 0; } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    body
                      if
                        binary < (25..30)
                          int 1 (25..26)
                          int 2 (29..30)
                        then
                          return
                            int 1 (39..40)
                        else
                          return
                            int 0 (54..55)
            ";
        }

        fn test_if_without_else_gets_skip() {
            let program = "class A { void m() { if (true) return; } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    body
                      if
                        bool true (25..29)
                        then
                          return
                        else
                          skip
            ";
        }

        fn test_while_and_jump_statements() {
            let program = "class A { void m() { while (true) { break; continue; } } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    body
                      while
                        bool true (28..32)
                        body
                          block
                            break
                            continue
            ";
        }

        fn test_for_statement() {
            let program = "class A { void m(int i) { for (i = 0; i < 9; i++) ; } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    formal 2 int i
                    body
                      for
                        init
                          assign (31..36)
                            var i #2 (31..32)
                            int 0 (35..36)
                        cond
                          binary < (38..43)
                            var i #2 (38..39)
                            int 9 (42..43)
                        update
                          auto post ++ (45..48)
                            var i #2 (45..46)
                        body
                          skip
            ";
        }

        fn test_this_is_stamped_with_class_type() {
            let program = "class A { void m() { this.f = 1; } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    body
                      assign (21..31)
                        field-access f (21..27)
                          this (21..25 : user(A))
                        int 1 (30..31)
            ";
        }

        fn test_error_field_name_expected() {
            let program = "class A { int 5; }";
            let expected_errors = &["14..15: expected token Identifier, but got Number"];
        }

        fn test_error_halts_at_first_syntax_error() {
            let program = "class A { int 5; int 6; }";
            let expected_errors = &["14..15: expected token Identifier, but got Number"];
        }

        fn test_error_statement_expr() {
            let program = "class A { void m() { 1 + 2; } }";
            let expected_errors = &["21..26: expected an assignment, auto operation, or call"];
        }

        fn test_error_bare_call_has_no_receiver() {
            let expr = "f(1)";
            let expected_errors = &["0..1: call target must name a method through a receiver"];
        }

        fn test_error_invalid_assignment_target() {
            let expr = "1 = 2";
            let expected_errors = &["0..1: invalid assignment target"];
        }

        fn test_error_invalid_auto_target() {
            let expr = "(1 + 2)++";
            let expected_errors = &["1..6: invalid auto increment/decrement target"];
        }

        fn test_error_lexer_unexpected_char() {
            let expr = "$";
            let expected_errors = &["0..1: unexpected character"];
        }

        fn test_error_lexer_lone_ampersand() {
            let expr = "a & b";
            let expected_errors = &["2..3: expected token Eof, but got ErrorUnexpectedChar"];
        }

        fn test_error_lexer_unclosed_string() {
            let expr = "\"abc";
            let expected_errors = &["0..4: unclosed string"];
        }

        fn test_error_unmatched_paren() {
            let expr = "(1 + 2";
            let expected_errors = &["6..6: expected token RParen, but got Eof"];
        }

        fn test_error_duplicate_local() {
            let program = "class A { void m() { int x; float x; } }";
            let expected_errors = &["34..35: reuse of name x"];
        }

        fn test_error_repeated_field() {
            let program = "class A { int x; float x; }";
            let expected_errors = &["23..24: repeating field name x"];
        }
    );
}
