//! Recursive-descent parser.
//!
//! Grounded on `original_source/c5c/parser.py`: the same top-level dispatch
//! (include/struct/enum/type-alias/let/macro/extern-or-func), the same
//! type grammar (any order of `signed|unsigned|const`, once each, then a
//! base name, optional `<N>`/`<T>`, then trailing `*` chain), the same
//! declaration-vs-expression lookahead (`is_decl_start`, used both at
//! statement dispatch and inside macro bodies), and the same expression
//! precedence ladder: assignment (right-assoc) -> comparison -> additive ->
//! multiplicative -> unary -> primary with postfix chains.

use crate::ast::*;
use crate::lexer::{lex, Token, TokenKind};
use crate::types::Type;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, String>;

impl Parser {
    pub fn new(source: &str) -> PResult<Self> {
        let tokens = lex(source).map_err(|e| e.to_string())?;
        Ok(Parser { tokens, pos: 0 })
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut program = Program::new();
        while !self.at_end() {
            program.decls.push(self.parse_top_level()?);
        }
        Ok(program)
    }

    // ---- token stream helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, ctx: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(format!(
                "{}:{}: expected {:?} {}, found {:?} {:?}",
                tok.line, tok.column, kind, ctx, tok.kind, tok.text
            ))
        }
    }

    fn span_here(&self) -> Span {
        let t = self.peek();
        Span::new(t.line, t.column)
    }

    // ---- top level ----

    fn parse_top_level(&mut self) -> PResult<Decl> {
        match self.peek().kind {
            TokenKind::Include => self.parse_include(),
            TokenKind::Struct => self.parse_struct_decl(),
            TokenKind::Enum => self.parse_enum_decl(),
            TokenKind::TypeKw => self.parse_type_decl(),
            TokenKind::Let => self.parse_let_decl(),
            TokenKind::Macro => self.parse_macro(),
            _ => self.parse_func_or_extern(),
        }
    }

    fn parse_include(&mut self) -> PResult<Decl> {
        let span = self.span_here();
        self.advance(); // include
        self.matches(TokenKind::Lt);
        let mut path = String::new();
        while !self.check(TokenKind::Gt) && !self.at_end() {
            path.push_str(&self.advance().text);
        }
        self.expect(TokenKind::Gt, "closing '>' in include")?;
        Ok(Decl::Include { path, span })
    }

    fn parse_struct_decl(&mut self) -> PResult<Decl> {
        let span = self.span_here();
        self.advance(); // struct
        let name = self.expect(TokenKind::Id, "struct name")?.text;
        self.expect(TokenKind::LBrace, "'{' after struct name")?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let ty = self.parse_type()?;
            let fname = self.expect(TokenKind::Id, "field name")?.text;
            self.expect(TokenKind::Semi, "';' after struct field")?;
            fields.push(Field { ty, name: fname });
        }
        self.expect(TokenKind::RBrace, "'}' closing struct")?;
        self.expect(TokenKind::Semi, "';' after struct declaration")?;
        Ok(Decl::Struct { name, fields, span })
    }

    fn parse_enum_decl(&mut self) -> PResult<Decl> {
        let span = self.span_here();
        self.advance(); // enum
        let name = self.expect(TokenKind::Id, "enum name")?.text;
        self.expect(TokenKind::LBrace, "'{' after enum name")?;
        let mut variants = Vec::new();
        while !self.check(TokenKind::RBrace) {
            variants.push(self.expect(TokenKind::Id, "enum variant")?.text);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' closing enum")?;
        self.expect(TokenKind::Semi, "';' after enum declaration")?;
        Ok(Decl::Enum { name, variants, span })
    }

    fn parse_type_decl(&mut self) -> PResult<Decl> {
        let span = self.span_here();
        self.advance(); // type
        let name = self.expect(TokenKind::Id, "type alias name")?.text;
        self.expect(TokenKind::LBrace, "'{' after type alias name")?;
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) {
            members.push(self.parse_type()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' closing type alias")?;
        self.expect(TokenKind::Semi, "';' after type alias declaration")?;
        Ok(Decl::TypeAlias { name, members, span })
    }

    fn parse_let_decl(&mut self) -> PResult<Decl> {
        let span = self.span_here();
        self.advance(); // let
        let ty = self.parse_type()?;
        let name = self.expect(TokenKind::Id, "variable name")?.text;
        let init = if self.matches(TokenKind::Assign) { Some(self.parse_expr()?) } else { None };
        self.expect(TokenKind::Semi, "';' after let declaration")?;
        Ok(Decl::PubVar { ty, name, init, span })
    }

    fn parse_macro(&mut self) -> PResult<Decl> {
        let span = self.span_here();
        self.advance(); // macro
        let name = self.expect(TokenKind::Id, "macro name")?.text;
        self.expect(TokenKind::LParen, "'(' after macro name")?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            params.push(self.expect(TokenKind::Id, "macro parameter")?.text);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' closing macro parameter list")?;
        self.expect(TokenKind::LBrace, "'{' opening macro body")?;
        let body = self.parse_stmt_list_until(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "'}' closing macro body")?;
        Ok(Decl::Macro { name, params, body, span })
    }

    fn parse_func_or_extern(&mut self) -> PResult<Decl> {
        let span = self.span_here();
        let ret = self.parse_type()?;
        let name = self.expect(TokenKind::Id, "function name")?.text;
        self.expect(TokenKind::LParen, "'(' after function name")?;
        let mut params = Vec::new();
        let mut varargs = false;
        while !self.check(TokenKind::RParen) {
            if self.matches(TokenKind::Ellipsis) {
                varargs = true;
                break;
            }
            let ty = self.parse_type()?;
            let pname = self.expect(TokenKind::Id, "parameter name")?.text;
            params.push(Param { ty, name: pname });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' closing parameter list")?;
        if self.matches(TokenKind::Semi) {
            return Ok(Decl::Extern { ret, name, params, varargs, span });
        }
        self.expect(TokenKind::LBrace, "'{' opening function body")?;
        let body = self.parse_stmt_list_until(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "'}' closing function body")?;
        Ok(Decl::Func { ret, name, params, body, span })
    }

    // ---- types ----

    /// Type grammar: any order of `signed|unsigned|const` (each at most
    /// once), a base name (optionally `::`-qualified), an optional
    /// `<N>`/`<T>` generic parameter, then zero or more trailing `*`.
    fn parse_type(&mut self) -> PResult<Type> {
        let mut signed: Option<bool> = None;
        let mut is_const = false;
        loop {
            match self.peek().kind {
                TokenKind::Signed => {
                    self.advance();
                    signed = Some(true);
                }
                TokenKind::Unsigned => {
                    self.advance();
                    signed = Some(false);
                }
                TokenKind::Const => {
                    self.advance();
                    is_const = true;
                }
                _ => break,
            }
        }

        let base = if self.check(TokenKind::Void) {
            self.advance();
            "void".to_string()
        } else {
            self.expect(TokenKind::Id, "base type name")?.text
        };
        let mut name = base.clone();
        while self.matches(TokenKind::ColonColon) {
            let next = self.expect(TokenKind::Id, "namespace-qualified type name")?.text;
            name = format!("{}::{}", name, next);
        }

        let mut ty = if self.matches(TokenKind::Lt) {
            if base == "array" {
                let elem = self.parse_type()?;
                self.expect(TokenKind::Gt, "'>' closing array element type")?;
                Type::array(elem)
            } else {
                let bits_tok = self.expect(TokenKind::Number, "bit width")?;
                let bits: u32 =
                    bits_tok.text.parse().map_err(|_| format!("invalid bit width '{}'", bits_tok.text))?;
                self.expect(TokenKind::Gt, "'>' closing sized type")?;
                match base.as_str() {
                    "int" => Type::Int { bits, signed: signed.unwrap_or(true) },
                    "float" => Type::Float { bits },
                    _ => Type::Named(format!("{}<{}>", name, bits)),
                }
            }
        } else {
            named_base_type(&name, signed)
        };

        while self.matches(TokenKind::Star) {
            ty = Type::pointer(ty);
        }
        if is_const {
            ty = Type::Const(Box::new(ty));
        }
        Ok(ty)
    }

    // ---- declaration-vs-expression lookahead ----

    /// spec.md §4.2: skip one identifier (possibly `::`-qualified),
    /// optionally a balanced `< ... >`, any number of `*`, and check whether
    /// the next token is another identifier. Applied identically at
    /// statement dispatch and inside macro bodies (both routes call this
    /// same method).
    fn is_decl_start(&self) -> bool {
        let mut i = self.pos;
        let peek_kind = |i: usize| self.tokens.get(i).map(|t| t.kind).unwrap_or(TokenKind::Eof);

        match peek_kind(i) {
            TokenKind::Signed | TokenKind::Unsigned | TokenKind::Const => return true,
            TokenKind::Void => return true,
            TokenKind::Id => {}
            _ => return false,
        }
        i += 1;
        while peek_kind(i) == TokenKind::ColonColon {
            i += 1;
            if peek_kind(i) != TokenKind::Id {
                return false;
            }
            i += 1;
        }
        if peek_kind(i) == TokenKind::Lt {
            i += 1;
            let mut depth = 1;
            while depth > 0 {
                match peek_kind(i) {
                    TokenKind::Lt => depth += 1,
                    TokenKind::Gt => depth -= 1,
                    TokenKind::Eof | TokenKind::Semi | TokenKind::LBrace => return false,
                    _ => {}
                }
                i += 1;
            }
        }
        while peek_kind(i) == TokenKind::Star {
            i += 1;
        }
        peek_kind(i) == TokenKind::Id
    }

    // ---- statements ----

    fn parse_stmt_list_until(&mut self, end: TokenKind) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(end) && !self.at_end() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace, "'{' opening block")?;
        let stmts = self.parse_stmt_list_until(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "'}' closing block")?;
        Ok(stmts)
    }

    /// A single statement or a `{ ... }` block, flattened to a `Vec<Stmt>`
    /// (used where the grammar allows either a block or a bare statement,
    /// e.g. `if (c) stmt;`).
    fn parse_block_or_stmt(&mut self) -> PResult<Vec<Stmt>> {
        if self.check(TokenKind::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        match self.peek().kind {
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Foreach => self.parse_foreach_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Break => self.parse_break_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            _ => {
                if self.is_decl_start() {
                    self.parse_var_decl_stmt()
                } else {
                    self.parse_expr_stmt()
                }
            }
        }
    }

    fn parse_var_decl_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        let ty = self.parse_type()?;
        let name = self.expect(TokenKind::Id, "variable name")?.text;
        let init = if self.matches(TokenKind::Assign) { Some(self.parse_expr()?) } else { None };
        self.expect(TokenKind::Semi, "';' after variable declaration")?;
        Ok(Stmt::VarDecl { ty, name, init, span })
    }

    fn parse_expr_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semi, "';' after expression statement")?;
        Ok(Stmt::Expr { expr, span })
    }

    fn parse_if_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // if
        self.expect(TokenKind::LParen, "'(' after if")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')' after if condition")?;
        let then_branch = self.parse_block_or_stmt()?;
        let else_branch = if self.matches(TokenKind::Else) { Some(self.parse_block_or_stmt()?) } else { None };
        Ok(Stmt::If { cond, then_branch, else_branch, span })
    }

    fn parse_while_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // while
        self.expect(TokenKind::LParen, "'(' after while")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')' after while condition")?;
        let body = self.parse_block_or_stmt()?;
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_do_while_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // do
        let body = self.parse_block_or_stmt()?;
        self.expect(TokenKind::While, "'while' after do-block")?;
        self.expect(TokenKind::LParen, "'(' after while")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')' after do-while condition")?;
        self.expect(TokenKind::Semi, "';' after do-while")?;
        Ok(Stmt::DoWhile { body, cond, span })
    }

    fn parse_for_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // for
        self.expect(TokenKind::LParen, "'(' after for")?;
        let init = if self.check(TokenKind::Semi) {
            None
        } else if self.is_decl_start() {
            Some(Box::new(self.parse_var_decl_stmt()?))
        } else {
            Some(Box::new(self.parse_expr_stmt()?))
        };
        if init.is_none() {
            self.expect(TokenKind::Semi, "';' after empty for-init")?;
        }
        let cond = if self.check(TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semi, "';' after for condition")?;
        let step = if self.check(TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::RParen, "')' closing for clauses")?;
        let body = self.parse_block_or_stmt()?;
        Ok(Stmt::For { init, cond, step, body, span })
    }

    fn parse_foreach_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // foreach
        self.expect(TokenKind::LParen, "'(' after foreach")?;
        let idx = self.expect(TokenKind::Id, "foreach index variable")?.text;
        self.expect(TokenKind::Comma, "',' in foreach clause")?;
        let val = self.expect(TokenKind::Id, "foreach value variable")?.text;
        self.expect(TokenKind::In, "'in' in foreach clause")?;
        let iterable = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')' closing foreach clause")?;
        let body = self.parse_block()?;
        Ok(Stmt::Foreach { idx, val, iterable, body, span })
    }

    fn parse_switch_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // switch
        self.expect(TokenKind::LParen, "'(' after switch")?;
        let scrutinee = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')' after switch scrutinee")?;
        self.expect(TokenKind::LBrace, "'{' opening switch body")?;
        let mut cases = Vec::new();
        let mut default = None;
        while !self.check(TokenKind::RBrace) {
            if self.matches(TokenKind::Case) {
                let value = self.parse_expr()?;
                self.expect(TokenKind::Colon, "':' after case value")?;
                let body = self.parse_case_body()?;
                cases.push((value, body));
            } else if self.matches(TokenKind::Default) {
                self.expect(TokenKind::Colon, "':' after default")?;
                default = Some(self.parse_case_body()?);
            } else {
                let tok = self.peek();
                return Err(format!(
                    "{}:{}: expected 'case' or 'default' in switch body, found {:?}",
                    tok.line, tok.column, tok.kind
                ));
            }
        }
        self.expect(TokenKind::RBrace, "'}' closing switch body")?;
        Ok(Stmt::Switch { scrutinee, cases, default, span })
    }

    /// Statements belonging to one `case`/`default` arm, up to the next
    /// `case`/`default`/closing brace. Fall-through (no implicit break) per
    /// spec.md §4.6.
    fn parse_case_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::Case) && !self.check(TokenKind::Default) && !self.check(TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_break_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // break
        self.expect(TokenKind::Semi, "';' after break")?;
        Ok(Stmt::Break { span })
    }

    fn parse_return_stmt(&mut self) -> PResult<Stmt> {
        let span = self.span_here();
        self.advance(); // return
        let value = if self.check(TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semi, "';' after return")?;
        Ok(Stmt::Return { value, span })
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let span = self.span_here();
        let target = self.parse_comparison()?;
        if self.matches(TokenKind::Assign) {
            let value = self.parse_assignment()?; // right-associative
            return Ok(Expr::Assign { target: Box::new(target), value: Box::new(value), span });
        }
        Ok(target)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_arithmetic()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Neq => BinOp::Neq,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Leq => BinOp::Leq,
                TokenKind::Geq => BinOp::Geq,
                _ => break,
            };
            let span = self.span_here();
            self.advance();
            let right = self.parse_arithmetic()?;
            left = Expr::Binary { op, lhs: Box::new(left), rhs: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_arithmetic(&mut self) -> PResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = self.span_here();
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary { op, lhs: Box::new(left), rhs: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let span = self.span_here();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { op, lhs: Box::new(left), rhs: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let span = self.span_here();
        let op = match self.peek().kind {
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Amp => Some(UnaryOp::AddrOf),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let span = self.span_here();
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect(TokenKind::Id, "field name after '.'")?.text;
                    expr = Expr::MemberAccess { base: Box::new(expr), field, span };
                }
                TokenKind::Arrow => {
                    self.advance();
                    let field = self.expect(TokenKind::Id, "field name after '->'")?.text;
                    expr = Expr::ArrowAccess { base: Box::new(expr), field, span };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']' closing index")?;
                    expr = Expr::ArrayAccess { base: Box::new(expr), index: Box::new(index), span };
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(TokenKind::RParen) {
                        args.push(self.parse_expr()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen, "')' closing call arguments")?;
                    expr = Expr::Call { target: Box::new(expr), args, span };
                }
                TokenKind::ColonColon => {
                    self.advance();
                    let next = self.expect(TokenKind::Id, "identifier after '::'")?.text;
                    let mut path = match expr {
                        Expr::Id { name, .. } => vec![name],
                        Expr::NamespaceAccess { path, .. } => path,
                        other => return Ok(other), // grammar never nests '::' on other expr kinds
                    };
                    path.push(next);
                    expr = Expr::NamespaceAccess { path, span };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.span_here();
        match self.peek().kind {
            TokenKind::Number => {
                let text = self.advance().text;
                let value: i64 = text.parse().map_err(|_| format!("invalid integer literal '{}'", text))?;
                Ok(Expr::IntLit { value, span })
            }
            TokenKind::Float => {
                let text = self.advance().text;
                let value: f64 = text.parse().map_err(|_| format!("invalid float literal '{}'", text))?;
                Ok(Expr::FloatLit { value, span })
            }
            TokenKind::Char => {
                let text = self.advance().text;
                let value = text.chars().next().map(|c| c as i64).unwrap_or(0);
                Ok(Expr::CharLit { value, span })
            }
            TokenKind::Str => {
                let value = self.advance().text;
                Ok(Expr::StringLit { value, span })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')' closing parenthesized expression")?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_init_list(),
            TokenKind::Fnct => self.parse_lambda(),
            TokenKind::Id => {
                let name = self.advance().text;
                Ok(Expr::Id { name, span })
            }
            _ => {
                let tok = self.peek();
                Err(format!("{}:{}: unexpected token in expression: {:?} {:?}", tok.line, tok.column, tok.kind, tok.text))
            }
        }
    }

    fn parse_init_list(&mut self) -> PResult<Expr> {
        let span = self.span_here();
        self.expect(TokenKind::LBrace, "'{' opening initializer list")?;
        let mut elements = Vec::new();
        while !self.check(TokenKind::RBrace) {
            elements.push(self.parse_expr()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' closing initializer list")?;
        Ok(Expr::InitList { elements, span })
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let span = self.span_here();
        self.advance(); // fnct
        self.expect(TokenKind::LParen, "'(' after fnct")?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            let ty = self.parse_type()?;
            let pname = self.expect(TokenKind::Id, "lambda parameter name")?.text;
            params.push(Param { ty, name: pname });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' closing lambda parameter list")?;
        let body = self.parse_block()?;
        // The return type isn't written at a lambda's declaration site; the
        // analyzer infers it from the body's `return` statements and
        // rewrites this placeholder (see analyzer.rs).
        Ok(Expr::Lambda { ret: Type::INT, params, body, span })
    }
}

/// Map a base type name (with no generic parameter) to a concrete `Type`.
fn named_base_type(name: &str, signed: Option<bool>) -> Type {
    match name {
        "void" => Type::Void,
        "string" => Type::String,
        "char" => Type::Int { bits: 8, signed: signed.unwrap_or(true) },
        "int" => Type::Int { bits: 64, signed: signed.unwrap_or(true) },
        "float" => Type::Float { bits: 64 },
        "fnptr" => Type::FnPtr,
        _ => Type::Named(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::new(src).unwrap().parse_program().unwrap()
    }

    #[test]
    fn parses_hello_world() {
        let p = parse("include <std.c5h>\nint main() { return 0; }");
        assert_eq!(p.decls.len(), 2);
        assert!(matches!(p.decls[0], Decl::Include { .. }));
        assert!(matches!(p.decls[1], Decl::Func { .. }));
    }

    #[test]
    fn parses_sized_types_and_distinguishes_from_comparison() {
        let p = parse("int main() { int<8> x = 1; return x < 2; }");
        let Decl::Func { body, .. } = &p.decls[0] else { panic!() };
        assert!(matches!(body[0], Stmt::VarDecl { .. }));
        let Stmt::VarDecl { ty, .. } = &body[0] else { panic!() };
        assert_eq!(*ty, Type::Int { bits: 8, signed: true });
    }

    #[test]
    fn parses_struct_and_member_access() {
        let p = parse("struct P { int x; int y; };\nint f(P p) { return p.x + p.y; }");
        assert!(matches!(p.decls[0], Decl::Struct { .. }));
    }

    #[test]
    fn parses_array_type_and_push_call() {
        let p = parse("int main() { array<int> a; a.push(1); return a.pop(); }");
        let Decl::Func { body, .. } = &p.decls[0] else { panic!() };
        let Stmt::VarDecl { ty, .. } = &body[0] else { panic!() };
        assert_eq!(*ty, Type::array(Type::INT));
    }

    #[test]
    fn parses_foreach_and_switch() {
        parse(
            "int main() { array<int> a; foreach (i, v in a) { switch (v) { case 1: break; default: break; } } return 0; }",
        );
    }

    #[test]
    fn parses_lambda() {
        let p = parse("int main() { int f = fnct(int x) { return x + x; }; return f; }");
        let Decl::Func { body, .. } = &p.decls[0] else { panic!() };
        assert!(matches!(body[0], Stmt::VarDecl { init: Some(Expr::Lambda { .. }), .. }));
    }

    #[test]
    fn is_decl_start_distinguishes_decl_from_expr_statement() {
        let p = parse("int main() { int x = 1; x = x + 1; return x; }");
        let Decl::Func { body, .. } = &p.decls[0] else { panic!() };
        assert!(matches!(body[0], Stmt::VarDecl { .. }));
        assert!(matches!(body[1], Stmt::Expr { .. }));
    }

    #[test]
    fn parses_namespaced_call() {
        let p = parse("int main() { std::print(\"hi\"); return 0; }");
        let Decl::Func { body, .. } = &p.decls[0] else { panic!() };
        let Stmt::Expr { expr: Expr::Call { target, .. }, .. } = &body[0] else { panic!() };
        assert!(matches!(**target, Expr::NamespaceAccess { .. }));
    }
}
