//! Recursive-descent, precedence-climbing parser (component C5)
//!
//! Statements are dispatched by inspecting the leading token (spec
//! §4.2). Expressions use the 11-level precedence table of spec §4.2;
//! the ambiguity between unary and binary `&`/`*` is resolved for free
//! by recursive descent itself — a unary-level parse is only ever
//! entered where an operand is expected (after an operator, an open
//! bracket/paren/brace, a comma, a semicolon, or at the start of
//! input), which is exactly the context spec §4.2 describes.

use crate::ast::*;
use crate::diagnostics::{LotusError, SourcePos};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, LotusError>;

impl Parser {
    pub fn new(source: &str) -> PResult<Self> {
        let tokens = Lexer::tokenize(source)?;
        Ok(Parser { tokens, pos: 0 })
    }

    pub fn parse_program(source: &str) -> PResult<Program> {
        let mut parser = Parser::new(source)?;
        parser.parse()
    }

    // ---- token stream helpers -------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn pos_here(&self) -> SourcePos {
        self.peek().pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        self.skip_newlines();
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(LotusError::parse(
                self.pos_here(),
                format!("expected {}, found '{}'", what, self.peek().lexeme_or_kind()),
            ))
        }
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        self.skip_newlines();
        if self.peek().kind == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn check_skip_nl(&mut self, kind: TokenKind) -> bool {
        self.skip_newlines();
        self.check(kind)
    }

    // ---- program ----------------------------------------------------------

    pub fn parse(&mut self) -> PResult<Program> {
        let mut program = Program::new();
        loop {
            self.skip_newlines();
            if self.check(TokenKind::Eof) {
                break;
            }
            program.top_level.push(self.parse_top_level_decl()?);
        }
        Ok(program)
    }

    fn parse_top_level_decl(&mut self) -> PResult<Stmt> {
        self.parse_statement()
    }

    // ---- statements ---------------------------------------------------------

    fn parse_statement(&mut self) -> PResult<Stmt> {
        self.skip_newlines();
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Use => self.parse_import(),
            TokenKind::Fn => self.parse_function_decl().map(Stmt::FunctionDeclaration),
            TokenKind::Struct => self.parse_struct_decl().map(Stmt::StructDeclaration),
            TokenKind::Enum => self.parse_enum_decl().map(Stmt::EnumDeclaration),
            TokenKind::Class => self.parse_class_decl().map(Stmt::ClassDeclaration),
            TokenKind::Const => self.parse_const_decl(),
            TokenKind::Ret => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Stmt::BreakStatement { pos: tok.pos })
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Stmt::ContinueStatement { pos: tok.pos })
            }
            TokenKind::LBrace => {
                let body = self.parse_block()?;
                Ok(Stmt::Block(body))
            }
            k if k.is_type_keyword() => self.parse_var_decl(),
            TokenKind::Identifier => self.parse_identifier_led_statement(),
            _ => Err(LotusError::parse(
                tok.pos,
                format!("unexpected token '{}' at start of statement", tok.lexeme_or_kind()),
            )),
        }
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(TokenKind::RBrace) {
                break;
            }
            if self.check(TokenKind::Eof) {
                return Err(LotusError::parse(self.pos_here(), "missing closing '}'"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_import(&mut self) -> PResult<Stmt> {
        self.advance(); // use
        let tok = self.expect(TokenKind::StringLit, "a module name string")?;
        let alias = if self.accept(TokenKind::As) {
            Some(self.expect(TokenKind::Identifier, "an alias name")?.lexeme)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::ImportDeclaration { module: tok.lexeme, alias })
    }

    fn parse_type(&mut self) -> PResult<TypeAnnotation> {
        self.skip_newlines();
        let tok = self.advance();
        let mut ty = match tok.kind {
            TokenKind::IntKw => TypeAnnotation::Int,
            TokenKind::Int8 => TypeAnnotation::Int8,
            TokenKind::Int16 => TypeAnnotation::Int16,
            TokenKind::Int32 => TypeAnnotation::Int32,
            TokenKind::Int64 => TypeAnnotation::Int64,
            TokenKind::Uint8 => TypeAnnotation::Uint8,
            TokenKind::Uint16 => TypeAnnotation::Uint16,
            TokenKind::Uint32 => TypeAnnotation::Uint32,
            TokenKind::Uint64 => TypeAnnotation::Uint64,
            TokenKind::BoolKw => TypeAnnotation::Bool,
            TokenKind::FloatKw => TypeAnnotation::Float,
            TokenKind::StringKw => TypeAnnotation::String,
            TokenKind::Identifier => TypeAnnotation::Named(tok.lexeme),
            _ => {
                return Err(LotusError::parse(
                    tok.pos,
                    format!("expected a type, found '{}'", tok.lexeme_or_kind()),
                ));
            }
        };
        loop {
            if self.check(TokenKind::Star) {
                self.advance();
                ty = TypeAnnotation::Pointer(Box::new(ty));
            } else if self.check(TokenKind::LBracket) {
                self.advance();
                let size_tok = self.expect(TokenKind::IntLit, "an array size")?;
                let size: usize = size_tok.lexeme.parse().map_err(|_| {
                    LotusError::parse(size_tok.pos, "invalid array size literal")
                })?;
                self.expect(TokenKind::RBracket, "']'")?;
                ty = TypeAnnotation::Array(Box::new(ty), size);
            } else {
                break;
            }
        }
        Ok(ty)
    }

    fn parse_var_decl(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        let ty = self.parse_type()?;
        let name = self.expect(TokenKind::Identifier, "a variable name")?.lexeme;
        let init = if self.accept(TokenKind::Eq) { Some(self.parse_expr()?) } else { None };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::VariableDeclaration { ty, name, init, pos })
    }

    fn parse_const_decl(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        self.advance(); // const
        let ty = self.parse_type()?;
        let name = self.expect(TokenKind::Identifier, "a constant name")?.lexeme;
        self.expect(TokenKind::Eq, "'='")?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::ConstantDeclaration { ty, name, value, pos })
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        self.advance();
        let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::ReturnStatement { value, pos })
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        self.advance();
        self.expect(TokenKind::LParen, "'(' after 'if'")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_branch = self.parse_block()?;
        self.skip_newlines();
        let else_branch = if self.accept(TokenKind::Else) {
            self.skip_newlines();
            if self.check(TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::IfStatement { cond, then_branch, else_branch, pos })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        self.advance();
        self.expect(TokenKind::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::WhileStatement { cond, body, pos })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        self.advance();
        self.expect(TokenKind::LParen, "'(' after 'for'")?;
        let init = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_for_clause_stmt()?))
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let cond = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semicolon, "';'")?;
        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_for_clause_stmt()?))
        };
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::ForStatement { init, cond, update, body, pos })
    }

    /// Parses the init/update clause of a `for(...)` header: a variable
    /// declaration or an assignment, without a trailing `;` (the
    /// caller consumes the separators explicitly).
    fn parse_for_clause_stmt(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        if self.peek().kind.is_type_keyword() {
            let ty = self.parse_type()?;
            let name = self.expect(TokenKind::Identifier, "a variable name")?.lexeme;
            let init = if self.accept(TokenKind::Eq) { Some(self.parse_expr()?) } else { None };
            return Ok(Stmt::VariableDeclaration { ty, name, init, pos });
        }
        let target = self.parse_postfix_expr()?;
        self.expect(TokenKind::Eq, "'='")?;
        let value = self.parse_expr()?;
        Ok(Stmt::Assignment { target, value, pos })
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        self.advance();
        let body = self.parse_block()?;
        self.skip_newlines();
        let catch = if self.accept(TokenKind::Catch) {
            let binding = if self.accept(TokenKind::LParen) {
                let name = self.expect(TokenKind::Identifier, "an exception name")?.lexeme;
                self.expect(TokenKind::RParen, "')'")?;
                Some(name)
            } else {
                None
            };
            Some((binding, self.parse_block()?))
        } else {
            None
        };
        self.skip_newlines();
        let finally = if self.accept(TokenKind::Finally) { Some(self.parse_block()?) } else { None };
        if catch.is_none() && finally.is_none() {
            return Err(LotusError::parse(pos, "'try' requires a 'catch' or 'finally' block"));
        }
        Ok(Stmt::TryStatement { body, catch, finally, pos })
    }

    fn parse_throw(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        self.advance();
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::ThrowStatement { value, pos })
    }

    fn parse_function_decl(&mut self) -> PResult<FunctionDecl> {
        let pos = self.pos_here();
        self.advance(); // fn
        let ret_ty = self.parse_type()?;
        let name = self.expect(TokenKind::Identifier, "a function name")?.lexeme;
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check_skip_nl(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let pname = self.expect(TokenKind::Identifier, "a parameter name")?.lexeme;
                params.push(Param { ty, name: pname });
                if !self.accept(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(FunctionDecl { ret_ty, name, params, body, pos })
    }

    fn parse_struct_decl(&mut self) -> PResult<StructDecl> {
        let pos = self.pos_here();
        self.advance();
        let name = self.expect(TokenKind::Identifier, "a struct name")?.lexeme;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(TokenKind::RBrace) {
                break;
            }
            let ty = self.parse_type()?;
            let fname = self.expect(TokenKind::Identifier, "a field name")?.lexeme;
            self.expect(TokenKind::Semicolon, "';'")?;
            fields.push(FieldDecl { ty, name: fname });
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(StructDecl { name, fields, pos })
    }

    fn parse_enum_decl(&mut self) -> PResult<EnumDecl> {
        let pos = self.pos_here();
        self.advance();
        let name = self.expect(TokenKind::Identifier, "an enum name")?.lexeme;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut variants = Vec::new();
        let mut next_value = 0i64;
        loop {
            self.skip_newlines();
            if self.check(TokenKind::RBrace) {
                break;
            }
            let vname = self.expect(TokenKind::Identifier, "a variant name")?.lexeme;
            let value = if self.accept(TokenKind::Eq) {
                let lit = self.expect(TokenKind::IntLit, "an integer literal")?;
                lit.lexeme.parse().map_err(|_| {
                    LotusError::parse(lit.pos, "invalid enum value literal")
                })?
            } else {
                next_value
            };
            next_value = value + 1;
            variants.push((vname, value));
            if !self.accept(TokenKind::Comma) {
                self.skip_newlines();
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(EnumDecl { name, variants, pos })
    }

    fn parse_class_decl(&mut self) -> PResult<ClassDecl> {
        let pos = self.pos_here();
        self.advance();
        let name = self.expect(TokenKind::Identifier, "a class name")?.lexeme;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(TokenKind::RBrace) {
                break;
            }
            if self.check(TokenKind::Fn) {
                methods.push(self.parse_function_decl()?);
            } else {
                let ty = self.parse_type()?;
                let fname = self.expect(TokenKind::Identifier, "a field name")?.lexeme;
                self.expect(TokenKind::Semicolon, "';'")?;
                fields.push(FieldDecl { ty, name: fname });
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(ClassDecl { name, fields, methods, pos })
    }

    /// Identifier-led statement: assignment, a call used as a
    /// statement, or a method call (spec §4.2).
    fn parse_identifier_led_statement(&mut self) -> PResult<Stmt> {
        let pos = self.pos_here();
        let expr = self.parse_postfix_expr()?;
        if self.check_skip_nl(TokenKind::Eq) {
            self.advance();
            let value = self.parse_expr()?;
            self.expect(TokenKind::Semicolon, "';'")?;
            return Ok(Stmt::Assignment { target: expr, value, pos });
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::ExprStatement { expr, pos })
    }

    // ---- expressions: precedence climbing (spec §4.2) ------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check_skip_nl(TokenKind::PipePipe) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::LogicalOp { op: LogicalOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitor()?;
        while self.check_skip_nl(TokenKind::AmpAmp) {
            self.advance();
            let rhs = self.parse_bitor()?;
            lhs = Expr::LogicalOp { op: LogicalOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitxor()?;
        while self.check_skip_nl(TokenKind::Pipe) {
            self.advance();
            let rhs = self.parse_bitxor()?;
            lhs = Expr::BinaryOp { op: BinOp::BitOr, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitand()?;
        while self.check_skip_nl(TokenKind::Caret) {
            self.advance();
            let rhs = self.parse_bitand()?;
            lhs = Expr::BinaryOp { op: BinOp::BitXor, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check_skip_nl(TokenKind::Amp) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::BinaryOp { op: BinOp::BitAnd, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_shift()?;
        loop {
            self.skip_newlines();
            let op = match self.peek().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_shift()?;
            lhs = Expr::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            self.skip_newlines();
            let op = match self.peek().kind {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_mul()?;
        loop {
            self.skip_newlines();
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_newlines();
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    /// Level 10: unary operators, right-associative. Entered only where
    /// an operand is expected, so `&`/`*` here are always address-of /
    /// dereference (spec §4.2).
    fn parse_unary(&mut self) -> PResult<Expr> {
        self.skip_newlines();
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Amp => Some(UnaryOp::AddrOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp { op, operand: Box::new(operand) });
        }
        self.parse_postfix_expr()
    }

    /// Level 11: postfix `()`, `[]`, `.`, `->`, `::`.
    fn parse_postfix_expr(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    self.expect(TokenKind::RParen, "')'")?;
                    expr = match expr {
                        Expr::Identifier(name) => Expr::FunctionCall { name, args },
                        Expr::FieldAccess { object, field, .. } => {
                            Expr::MethodCall { receiver: object, method: field, args }
                        }
                        other => {
                            return Err(LotusError::parse(
                                self.pos_here(),
                                format!("'{:?}' is not callable", other),
                            ));
                        }
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::ArrayIndex { array: Box::new(expr), index: Box::new(index) };
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect(TokenKind::Identifier, "a field or method name")?.lexeme;
                    expr = Expr::FieldAccess { object: Box::new(expr), field, arrow: false };
                }
                TokenKind::Arrow => {
                    self.advance();
                    let field = self.expect(TokenKind::Identifier, "a field name")?.lexeme;
                    expr = Expr::FieldAccess { object: Box::new(expr), field, arrow: true };
                }
                TokenKind::ColonColon => {
                    self.advance();
                    let variant = self.expect(TokenKind::Identifier, "an enum variant")?.lexeme;
                    let enum_name = match expr {
                        Expr::Identifier(name) => name,
                        _ => {
                            return Err(LotusError::parse(
                                self.pos_here(),
                                "'::' must follow an enum type name",
                            ));
                        }
                    };
                    expr = Expr::EnumVariant { enum_name, variant };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check_skip_nl(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.accept(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        self.skip_newlines();
        let tok = self.advance();
        match tok.kind {
            TokenKind::IntLit => {
                let value: i64 = tok.lexeme.parse().map_err(|_| {
                    LotusError::parse(tok.pos, format!("invalid integer literal '{}'", tok.lexeme))
                })?;
                Ok(Expr::IntLiteral(value))
            }
            TokenKind::FloatLit => {
                let value: f64 = tok.lexeme.parse().map_err(|_| {
                    LotusError::parse(tok.pos, format!("invalid float literal '{}'", tok.lexeme))
                })?;
                Ok(Expr::FloatLiteral(value))
            }
            TokenKind::StringLit => Ok(Expr::StringLiteral(tok.lexeme)),
            TokenKind::BoolLit => Ok(Expr::BoolLiteral(tok.lexeme == "true")),
            TokenKind::Null => Ok(Expr::NullLiteral),
            TokenKind::Identifier => Ok(Expr::Identifier(tok.lexeme)),
            TokenKind::New => {
                let type_name = self.expect(TokenKind::Identifier, "a type name after 'new'")?.lexeme;
                self.expect(TokenKind::LParen, "'('")?;
                let args = self.parse_args()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::New { type_name, args })
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(LotusError::parse(
                tok.pos,
                format!("unexpected token '{}' in expression", tok.lexeme_or_kind()),
            )),
        }
    }
}

impl Token {
    fn lexeme_or_kind(&self) -> String {
        if self.lexeme.is_empty() {
            format!("{:?}", self.kind)
        } else {
            self.lexeme.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_fn_body(src: &str) -> Vec<Stmt> {
        let wrapped = format!("fn int main(){{ {} }}", src);
        let program = Parser::parse_program(&wrapped).unwrap();
        match &program.top_level[0] {
            Stmt::FunctionDeclaration(f) => f.body.clone(),
            _ => panic!("expected function"),
        }
    }

    fn single_expr(src: &str) -> Expr {
        match &parse_fn_body(&format!("ret {};", src))[0] {
            Stmt::ReturnStatement { value: Some(e), .. } => e.clone(),
            other => panic!("expected return expr, got {:?}", other),
        }
    }

    #[test]
    fn precedence_shift_before_bitor() {
        let expr = single_expr("(1<<3) | 1");
        assert_eq!(expr.to_parenthesized_string(), "((1 << 3) | 1)");
    }

    #[test]
    fn precedence_mul_before_add() {
        let expr = single_expr("1 + 2 * 3");
        assert_eq!(expr.to_parenthesized_string(), "(1 + (2 * 3))");
    }

    #[test]
    fn precedence_bitand_binds_tighter_than_equality() {
        let expr = single_expr("a == b & c");
        assert_eq!(expr.to_parenthesized_string(), "(a == (b & c))");
    }

    #[test]
    fn logical_ops_are_distinct_from_bitwise() {
        let expr = single_expr("a && b || c");
        match expr {
            Expr::LogicalOp { op: LogicalOp::Or, .. } => {}
            other => panic!("expected top-level Or, got {:?}", other),
        }
    }

    #[test]
    fn unary_address_of_vs_binary_and() {
        let expr = single_expr("&a & b");
        match expr {
            Expr::BinaryOp { op: BinOp::BitAnd, lhs, .. } => match *lhs {
                Expr::UnaryOp { op: UnaryOp::AddrOf, .. } => {}
                other => panic!("expected unary AddrOf lhs, got {:?}", other),
            },
            other => panic!("expected BitAnd at top, got {:?}", other),
        }
    }

    #[test]
    fn unary_deref_vs_binary_mul() {
        let expr = single_expr("*p * 2");
        match expr {
            Expr::BinaryOp { op: BinOp::Mul, lhs, .. } => match *lhs {
                Expr::UnaryOp { op: UnaryOp::Deref, .. } => {}
                other => panic!("expected unary Deref lhs, got {:?}", other),
            },
            other => panic!("expected Mul at top, got {:?}", other),
        }
    }

    #[test]
    fn postfix_chain_call_index_field() {
        let expr = single_expr("a.b[0](1)");
        assert_eq!(expr.to_parenthesized_string(), "a.b[0](1)");
    }

    #[test]
    fn parses_hello_world_function() {
        let program = Parser::parse_program("fn int main(){ ret 0; }").unwrap();
        assert_eq!(program.find_function("main").unwrap().params.len(), 0);
    }

    #[test]
    fn missing_semicolon_is_a_parse_error() {
        let err = Parser::parse_program("fn int main(){ ret 0 }").unwrap_err();
        assert!(matches!(err, LotusError::Parse { .. }));
    }

    #[test]
    fn missing_brace_is_a_parse_error() {
        let err = Parser::parse_program("fn int main(){ ret 0;").unwrap_err();
        assert!(matches!(err, LotusError::Parse { .. }));
    }

    #[test]
    fn parses_for_loop_header() {
        let body = parse_fn_body("for(int i=0;i<10;i=i+1){ }");
        assert!(matches!(body[0], Stmt::ForStatement { .. }));
    }

    #[test]
    fn parses_struct_and_field_access() {
        let program = Parser::parse_program(
            "struct Point { int x; int y; } fn int main(){ ret 0; }",
        )
        .unwrap();
        assert!(matches!(program.top_level[0], Stmt::StructDeclaration(_)));
    }

    #[test]
    fn parses_enum_with_explicit_and_implicit_values() {
        let program =
            Parser::parse_program("enum Color { Red, Green = 5, Blue } fn int main(){ ret 0; }")
                .unwrap();
        match &program.top_level[0] {
            Stmt::EnumDeclaration(e) => {
                assert_eq!(e.variants, vec![
                    ("Red".to_string(), 0),
                    ("Green".to_string(), 5),
                    ("Blue".to_string(), 6),
                ]);
            }
            other => panic!("expected enum decl, got {:?}", other),
        }
    }
}
