// ABOUTME: Recursive-descent parser turning a token stream into a statement tree

use crate::ast::{BinaryOp, Expr, IncDecOp, Program, Stmt};
use crate::error::ParseError;
use crate::scanner::Scanner;
use crate::token::{Position, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parses a full program from source text.
pub fn parse(src: &str) -> Result<Program, ParseError> {
    let tokens = Scanner::new(src).scan_all()?;
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, delta: usize) -> TokenKind {
        self.tokens
            .get(self.pos + delta)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at_pos(&self) -> Position {
        self.peek().pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let pos = self.at_pos();
            Err(ParseError::new(
                pos.line,
                pos.column,
                format!("expected {}, found '{}'", what, self.peek().lit),
            ))
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        let pos = self.at_pos();
        ParseError::new(pos.line, pos.column, message)
    }

    fn skip_semis(&mut self) {
        while self.matches(TokenKind::Semi) {}
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        self.skip_semis();
        while !self.check(TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            self.skip_semis();
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        self.skip_semis();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            self.skip_semis();
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::Func => self.parse_func_decl(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                let pos = self.at_pos();
                self.advance();
                Ok(Stmt::Break(pos))
            }
            TokenKind::Continue => {
                let pos = self.at_pos();
                self.advance();
                Ok(Stmt::Continue(pos))
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => self.parse_assign_or_expr_stmt(),
        }
    }

    /// `lvalue ('=' | '+=' | '-=') expr | lvalue ('++' | '--') | expr`
    fn parse_assign_or_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.at_pos();
        let expr = self.parse_expr()?;

        if self.matches(TokenKind::Assign) {
            let value = self.parse_expr()?;
            self.require_lvalue(&expr, pos)?;
            return Ok(Stmt::Assign {
                target: expr,
                value,
                pos,
            });
        }
        if self.matches(TokenKind::PlusAssign) {
            let value = self.parse_expr()?;
            self.require_lvalue(&expr, pos)?;
            return Ok(Stmt::CompoundAssign {
                op: BinaryOp::Add,
                target: expr,
                value,
                pos,
            });
        }
        if self.matches(TokenKind::MinusAssign) {
            let value = self.parse_expr()?;
            self.require_lvalue(&expr, pos)?;
            return Ok(Stmt::CompoundAssign {
                op: BinaryOp::Sub,
                target: expr,
                value,
                pos,
            });
        }
        if self.matches(TokenKind::Inc) {
            self.require_lvalue(&expr, pos)?;
            return Ok(Stmt::IncDec {
                op: IncDecOp::Inc,
                target: expr,
                pos,
            });
        }
        if self.matches(TokenKind::Dec) {
            self.require_lvalue(&expr, pos)?;
            return Ok(Stmt::IncDec {
                op: IncDecOp::Dec,
                target: expr,
                pos,
            });
        }

        Ok(Stmt::Expr(expr))
    }

    fn require_lvalue(&self, expr: &Expr, pos: Position) -> Result<(), ParseError> {
        match expr {
            Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. } | Expr::Slice { .. } => Ok(()),
            _ => Err(ParseError::new(pos.line, pos.column, "invalid assignment target")),
        }
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // var
        let mut names = vec![self.expect(TokenKind::Ident, "identifier")?.lit];
        while self.matches(TokenKind::Comma) {
            names.push(self.expect(TokenKind::Ident, "identifier")?.lit);
        }
        let mut inits = Vec::new();
        if self.matches(TokenKind::Assign) {
            inits.push(self.parse_expr()?);
            while self.matches(TokenKind::Comma) {
                inits.push(self.parse_expr()?);
            }
        }
        Ok(Stmt::VarDecl { names, inits })
    }

    fn parse_func_decl(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // func
        let name = self.expect(TokenKind::Ident, "function name")?.lit;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::FuncDecl { name, params, body })
    }

    fn parse_params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.expect(TokenKind::Ident, "parameter name")?.lit);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.at_pos();
        self.advance(); // return
        if self.check(TokenKind::Semi) || self.check(TokenKind::RBrace) || self.check(TokenKind::Eof) {
            return Ok(Stmt::Return(None, pos));
        }
        Ok(Stmt::Return(Some(self.parse_expr()?), pos))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // if
        let cond = self.parse_expr()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.matches(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    /// Folds every `for` spelling but `for x in y { }` into `ForC`:
    /// `for { }` (no clauses), `for cond { }` (cond only), and
    /// `for init; cond; post { }` (any clause optionally empty).
    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // for

        if self.check(TokenKind::Ident) && self.peek_kind_at(1) == TokenKind::In {
            let var_name = self.advance().lit;
            self.advance(); // in
            let iterable = self.parse_expr()?;
            let body = self.parse_block()?;
            return Ok(Stmt::ForIn {
                var_name,
                iterable,
                body,
            });
        }

        if self.check(TokenKind::LBrace) {
            let body = self.parse_block()?;
            return Ok(Stmt::ForC {
                init: None,
                cond: None,
                post: None,
                body,
            });
        }

        if self.check(TokenKind::Semi) {
            self.advance();
            return self.parse_for_c_tail(None);
        }

        if self.check(TokenKind::Var) {
            let init = self.parse_var_decl()?;
            self.expect(TokenKind::Semi, "';'")?;
            return self.parse_for_c_tail(Some(Box::new(init)));
        }

        let init_stmt = self.parse_assign_or_expr_stmt()?;
        if self.matches(TokenKind::Semi) {
            return self.parse_for_c_tail(Some(Box::new(init_stmt)));
        }
        if self.check(TokenKind::LBrace) {
            if let Stmt::Expr(cond_expr) = init_stmt {
                let body = self.parse_block()?;
                return Ok(Stmt::ForC {
                    init: None,
                    cond: Some(cond_expr),
                    post: None,
                    body,
                });
            }
            return Err(self.syntax_error("expected ';' after for-loop clause"));
        }
        Err(self.syntax_error(format!("unexpected token '{}' in for statement", self.peek().lit)))
    }

    /// Parses `cond; post { body }` once `for init;` has already been consumed.
    fn parse_for_c_tail(&mut self, init: Option<Box<Stmt>>) -> Result<Stmt, ParseError> {
        let cond = if self.check(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi, "';'")?;

        let post = if self.check(TokenKind::LBrace) {
            None
        } else {
            Some(Box::new(self.parse_assign_or_expr_stmt()?))
        };

        let body = self.parse_block()?;
        Ok(Stmt::ForC {
            init,
            cond,
            post,
            body,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_logical_and()?;
        loop {
            let pos = self.at_pos();
            if !self.matches(TokenKind::OrOr) {
                break;
            }
            let rhs = self.parse_logical_and()?;
            lhs = Expr::BinOp {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        loop {
            let pos = self.at_pos();
            if !self.matches(TokenKind::AndAnd) {
                break;
            }
            let rhs = self.parse_equality()?;
            lhs = Expr::BinOp {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let pos = self.at_pos();
            let op = match self.peek_kind() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let pos = self.at_pos();
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let pos = self.at_pos();
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let pos = self.at_pos();
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let pos = self.at_pos();
        if self.matches(TokenKind::Minus) {
            let rhs = self.parse_unary()?;
            return Ok(Expr::UnaryMinus { rhs: Box::new(rhs), pos });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let pos = self.at_pos();
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.matches(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "')'")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        pos,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect(TokenKind::Ident, "member name")?.lit;
                    expr = Expr::Member {
                        base: Box::new(expr),
                        name,
                        pos,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_index_or_slice(expr, pos)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Both bounds are mandatory for a slice: `a[:b]` and `a[a:]` are syntax
    /// errors, not partial slices.
    fn parse_index_or_slice(&mut self, base: Expr, pos: Position) -> Result<Expr, ParseError> {
        let first = self.parse_expr()?;
        if self.matches(TokenKind::Colon) {
            let to = self.parse_expr()?;
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(Expr::Slice {
                base: Box::new(base),
                from: Box::new(first),
                to: Box::new(to),
                pos,
            });
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Expr::Index {
            base: Box::new(base),
            index: Box::new(first),
            pos,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let pos = self.at_pos();
        match self.peek_kind() {
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Nil)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Number => {
                let lit = self.advance().lit;
                Ok(Expr::Number(lit))
            }
            TokenKind::String => {
                let lit = self.advance().lit;
                Ok(Expr::Str(lit))
            }
            TokenKind::Ident => {
                let lit = self.advance().lit;
                Ok(Expr::Ident(lit))
            }
            TokenKind::Make => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let type_name = self.expect(TokenKind::Ident, "type name")?.lit;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::Make { type_name, pos })
            }
            TokenKind::Func => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(Expr::FuncLit { params, body })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket, "']'")?;
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut pairs = Vec::new();
                if !self.check(TokenKind::RBrace) {
                    loop {
                        let key = self.parse_expr()?;
                        self.expect(TokenKind::Colon, "':'")?;
                        let value = self.parse_expr()?;
                        pairs.push((key, value));
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBrace, "'}'")?;
                Ok(Expr::MapLit(pairs))
            }
            _ => Err(ParseError::new(
                pos.line,
                pos.column,
                format!("unexpected token '{}'", self.peek().lit),
            )),
        }
    }
}
