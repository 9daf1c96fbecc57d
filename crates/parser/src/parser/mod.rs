//! The parser.
//!
//! Recursive descent with precedence climbing for expressions.
//! Statements, types and the shell sub-grammar each get their own
//! productions; the shell grammar lives in [`shell`].
//!
//! The parser is fatal on the first unexpected token and reports its
//! position. There is no recovery.

mod shell;

use num_bigint::BigInt;

use crate::ast::expr::FuncLiteral;
use crate::ast::stmt::{
    ConstDecl, ImportDecl, SelectCase, SwitchCase, TypeSwitchCase, VarDecl,
};
use crate::ast::types::{ChanDir, FuncSig};
use crate::ast::{Expr, ExprKind, NodeId, Stmt, StmtKind, Type};
use crate::error::{EbbError, Result};
use crate::lexer::token::{Literal, Pos, Token, TokenKind};
use crate::lexer::Scanner;

/// Parse a single statement from a byte buffer. `Ok(None)` means the
/// input held no statement at all.
pub fn parse_stmt(src: &[u8]) -> Result<Option<Stmt>> {
    let mut p = Parser::new(Scanner::from_bytes(src))?;
    p.parse_one()
}

pub struct Parser {
    s: Scanner,
    tok: Token,
    next_id: u32,
    // Set while parsing if/for/switch/select headers, where a `{`
    // opens the body rather than a composite literal.
    no_composite: bool,
}

impl Parser {
    pub fn new(s: Scanner) -> Result<Parser> {
        let mut p = Parser {
            s,
            tok: Token::new(TokenKind::Eof, Pos::default(), None),
            next_id: 0,
            no_composite: false,
        };
        p.advance()?;
        Ok(p)
    }

    /// Parse statements until end of input.
    pub fn parse_all(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            match self.parse_one()? {
                Some(s) => stmts.push(s),
                None => return Ok(stmts),
            }
        }
    }

    pub fn parse_one(&mut self) -> Result<Option<Stmt>> {
        while self.tok.kind == TokenKind::Semicolon {
            self.advance()?;
        }
        if self.tok.kind == TokenKind::Eof {
            return Ok(None);
        }
        let s = self.stmt();
        if s.is_err() {
            self.s.drain();
        }
        Ok(Some(s?))
    }

    // ----- plumbing -----

    fn advance(&mut self) -> Result<()> {
        loop {
            self.tok = self.s.next_token()?;
            if self.tok.kind != TokenKind::Comment {
                return Ok(());
            }
        }
    }

    fn errorf(&self, msg: impl Into<String>) -> EbbError {
        EbbError::parse(msg, self.tok.pos)
    }

    fn unexpected(&self, what: &str) -> EbbError {
        self.errorf(format!("unexpected {}, expected {}", self.tok.kind, what))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.tok.kind != kind {
            return Err(self.unexpected(&kind.to_string()));
        }
        self.advance()
    }

    fn got(&mut self, kind: TokenKind) -> Result<bool> {
        if self.tok.kind == kind {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn ident_name(&mut self) -> Result<String> {
        if self.tok.kind != TokenKind::Ident {
            return Err(self.unexpected("identifier"));
        }
        let name = self.tok.text().to_string();
        self.advance()?;
        Ok(name)
    }

    fn mkexpr(&mut self, pos: Pos, kind: ExprKind) -> Expr {
        self.next_id += 1;
        Expr {
            id: NodeId(self.next_id),
            pos,
            kind,
        }
    }

    fn mkstmt(&mut self, pos: Pos, kind: StmtKind) -> Stmt {
        self.next_id += 1;
        Stmt {
            id: NodeId(self.next_id),
            pos,
            kind,
        }
    }

    // ----- statements -----

    fn stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        match self.tok.kind {
            TokenKind::Const => self.const_stmt(),
            TokenKind::Var => self.var_stmt(),
            TokenKind::Type => self.type_decl(),
            TokenKind::Methodik => self.methodik_decl(),
            TokenKind::Import => self.import_stmt(),
            TokenKind::If => self.if_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Switch => self.switch_stmt(),
            TokenKind::Select => self.select_stmt(),
            TokenKind::Go => {
                self.advance()?;
                let call = self.expr()?;
                if !matches!(call.kind, ExprKind::Call { .. }) {
                    return Err(EbbError::parse("go statement requires a call", call.pos));
                }
                Ok(self.mkstmt(pos, StmtKind::Go(call)))
            }
            TokenKind::Return => {
                self.advance()?;
                let exprs = if matches!(
                    self.tok.kind,
                    TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
                ) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                Ok(self.mkstmt(pos, StmtKind::Return(exprs)))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Fallthrough | TokenKind::Goto => {
                let op = self.tok.kind;
                self.advance()?;
                let label = if self.tok.kind == TokenKind::Ident {
                    Some(self.ident_name()?)
                } else {
                    None
                };
                Ok(self.mkstmt(pos, StmtKind::Branch { op, label }))
            }
            TokenKind::LeftBrace => self.block(),
            TokenKind::Shell => {
                let fragment = self.parse_shell(false)?;
                Ok(self.mkstmt(pos, StmtKind::Simple(fragment)))
            }
            _ => self.simple_stmt(),
        }
    }

    /// Expression statements, assignments, sends, labels, `++`/`--`.
    fn simple_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        let left = self.expr_list()?;

        match self.tok.kind {
            TokenKind::Define | TokenKind::Assign => {
                let decl = self.tok.kind == TokenKind::Define;
                self.advance()?;
                let right = self.expr_list()?;
                Ok(self.mkstmt(pos, StmtKind::Assign { decl, left, right }))
            }
            TokenKind::AddAssign
            | TokenKind::SubAssign
            | TokenKind::MulAssign
            | TokenKind::DivAssign
            | TokenKind::RemAssign
            | TokenKind::PowAssign => {
                let op = match self.tok.kind {
                    TokenKind::AddAssign => TokenKind::Add,
                    TokenKind::SubAssign => TokenKind::Sub,
                    TokenKind::MulAssign => TokenKind::Mul,
                    TokenKind::DivAssign => TokenKind::Div,
                    TokenKind::RemAssign => TokenKind::Rem,
                    _ => TokenKind::Pow,
                };
                self.advance()?;
                if left.len() != 1 {
                    return Err(EbbError::parse("compound assignment needs one target", pos));
                }
                let rhs = self.expr()?;
                let target = left.into_iter().next().ok_or_else(|| {
                    EbbError::parse("compound assignment needs one target", pos)
                })?;
                let sum = self.mkexpr(
                    pos,
                    ExprKind::Binary {
                        op,
                        left: Box::new(target.clone()),
                        right: Box::new(rhs),
                    },
                );
                Ok(self.mkstmt(
                    pos,
                    StmtKind::Assign {
                        decl: false,
                        left: vec![target],
                        right: vec![sum],
                    },
                ))
            }
            TokenKind::Inc | TokenKind::Dec => {
                let op = if self.tok.kind == TokenKind::Inc {
                    TokenKind::Add
                } else {
                    TokenKind::Sub
                };
                self.advance()?;
                if left.len() != 1 {
                    return Err(EbbError::parse("increment needs one target", pos));
                }
                let target = left
                    .into_iter()
                    .next()
                    .ok_or_else(|| EbbError::parse("increment needs one target", pos))?;
                let one = self.mkexpr(pos, ExprKind::Basic(Literal::Int(BigInt::from(1))));
                let sum = self.mkexpr(
                    pos,
                    ExprKind::Binary {
                        op,
                        left: Box::new(target.clone()),
                        right: Box::new(one),
                    },
                );
                Ok(self.mkstmt(
                    pos,
                    StmtKind::Assign {
                        decl: false,
                        left: vec![target],
                        right: vec![sum],
                    },
                ))
            }
            TokenKind::ChanOp => {
                self.advance()?;
                if left.len() != 1 {
                    return Err(EbbError::parse("send needs one channel", pos));
                }
                let chan = left
                    .into_iter()
                    .next()
                    .ok_or_else(|| EbbError::parse("send needs one channel", pos))?;
                let value = self.expr()?;
                Ok(self.mkstmt(pos, StmtKind::Send { chan, value }))
            }
            TokenKind::Colon
                if left.len() == 1 && matches!(left[0].kind, ExprKind::Ident(_)) =>
            {
                let label = match &left[0].kind {
                    ExprKind::Ident(name) => name.clone(),
                    _ => return Err(self.errorf("label must be an identifier")),
                };
                self.advance()?;
                let stmt = self.stmt()?;
                Ok(self.mkstmt(
                    pos,
                    StmtKind::Labeled {
                        label,
                        stmt: Box::new(stmt),
                    },
                ))
            }
            _ => {
                if left.len() != 1 {
                    return Err(self.unexpected("assignment"));
                }
                let expr = left
                    .into_iter()
                    .next()
                    .ok_or_else(|| EbbError::parse("missing expression", pos))?;
                Ok(self.mkstmt(pos, StmtKind::Simple(expr)))
            }
        }
    }

    fn block(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        let stmts = self.block_stmts()?;
        Ok(self.mkstmt(pos, StmtKind::Block(stmts)))
    }

    fn block_stmts(&mut self) -> Result<Vec<Stmt>> {
        let saved = self.no_composite;
        self.no_composite = false;
        self.expect(TokenKind::LeftBrace)?;
        let mut stmts = Vec::new();
        loop {
            while self.tok.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if self.tok.kind == TokenKind::RightBrace {
                break;
            }
            if self.tok.kind == TokenKind::Eof {
                return Err(self.unexpected("}"));
            }
            stmts.push(self.stmt()?);
        }
        self.advance()?;
        self.no_composite = saved;
        Ok(stmts)
    }

    fn const_spec(&mut self) -> Result<ConstDecl> {
        let mut decl = ConstDecl {
            names: self.ident_list()?,
            ..ConstDecl::default()
        };
        if !matches!(
            self.tok.kind,
            TokenKind::Assign | TokenKind::Semicolon | TokenKind::RightParen | TokenKind::Eof
        ) {
            decl.ty = Some(self.parse_type()?);
        }
        if self.got(TokenKind::Assign)? {
            decl.values = self.expr_list()?;
        }
        Ok(decl)
    }

    fn const_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        if self.got(TokenKind::LeftParen)? {
            let mut decls = Vec::new();
            loop {
                while self.tok.kind == TokenKind::Semicolon {
                    self.advance()?;
                }
                if self.got(TokenKind::RightParen)? {
                    break;
                }
                decls.push(self.const_spec()?);
            }
            return Ok(self.mkstmt(pos, StmtKind::ConstSet(decls)));
        }
        let decl = self.const_spec()?;
        Ok(self.mkstmt(pos, StmtKind::Const(decl)))
    }

    fn var_spec(&mut self) -> Result<VarDecl> {
        let mut decl = VarDecl {
            names: self.ident_list()?,
            ..VarDecl::default()
        };
        if !matches!(
            self.tok.kind,
            TokenKind::Assign | TokenKind::Semicolon | TokenKind::RightParen | TokenKind::Eof
        ) {
            decl.ty = Some(self.parse_type()?);
        }
        if self.got(TokenKind::Assign)? {
            decl.values = self.expr_list()?;
        }
        Ok(decl)
    }

    fn var_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        if self.got(TokenKind::LeftParen)? {
            let mut decls = Vec::new();
            loop {
                while self.tok.kind == TokenKind::Semicolon {
                    self.advance()?;
                }
                if self.got(TokenKind::RightParen)? {
                    break;
                }
                decls.push(self.var_spec()?);
            }
            return Ok(self.mkstmt(pos, StmtKind::VarSet(decls)));
        }
        let decl = self.var_spec()?;
        Ok(self.mkstmt(pos, StmtKind::Var(decl)))
    }

    fn type_decl(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        let name = self.ident_name()?;
        let ty = self.parse_type()?;
        Ok(self.mkstmt(pos, StmtKind::TypeDecl { name, ty }))
    }

    fn methodik_decl(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        let name = self.ident_name()?;
        let mut underlying = self.parse_type()?;

        // A pointer on the underlying type marks pointer receivers.
        let pointer_receiver = if let Type::Pointer(elem) = underlying {
            underlying = *elem;
            true
        } else {
            false
        };

        self.expect(TokenKind::LeftBrace)?;
        let mut methods = Vec::new();
        let mut method_sigs = Vec::new();
        loop {
            while self.tok.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if self.got(TokenKind::RightBrace)? {
                break;
            }
            let m = self.method_literal(pointer_receiver)?;
            if let ExprKind::FuncLiteral(lit) = &m.kind {
                method_sigs.push((lit.name.clone(), lit.sig.clone()));
            }
            methods.push(m);
        }

        let ty = Type::Methodik {
            name: name.clone(),
            underlying: Box::new(underlying),
            methods: method_sigs,
            pointer_receiver,
        };
        Ok(self.mkstmt(pos, StmtKind::MethodikDecl { name, ty, methods }))
    }

    /// `func (recv) name(params) results { body }` inside a methodik.
    fn method_literal(&mut self, pointer_receiver: bool) -> Result<Expr> {
        let pos = self.tok.pos;
        self.expect(TokenKind::Func)?;
        self.expect(TokenKind::LeftParen)?;
        let receiver_name = self.ident_name()?;
        self.expect(TokenKind::RightParen)?;
        let name = self.ident_name()?;
        let (sig, param_names, result_names) = self.parse_signature()?;
        let body = self.block_stmts()?;
        Ok(self.mkexpr(
            pos,
            ExprKind::FuncLiteral(FuncLiteral {
                name,
                receiver_name,
                pointer_receiver,
                sig,
                param_names,
                result_names,
                body: Some(body),
            }),
        ))
    }

    fn import_spec(&mut self) -> Result<ImportDecl> {
        let name = if self.tok.kind == TokenKind::Ident {
            Some(self.ident_name()?)
        } else {
            None
        };
        if self.tok.kind != TokenKind::String {
            return Err(self.unexpected("import path"));
        }
        let path = self.tok.text().to_string();
        self.advance()?;
        Ok(ImportDecl { name, path })
    }

    fn import_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        if self.got(TokenKind::LeftParen)? {
            let mut decls = Vec::new();
            loop {
                while self.tok.kind == TokenKind::Semicolon {
                    self.advance()?;
                }
                if self.got(TokenKind::RightParen)? {
                    break;
                }
                decls.push(self.import_spec()?);
            }
            return Ok(self.mkstmt(pos, StmtKind::ImportSet(decls)));
        }
        let decl = self.import_spec()?;
        Ok(self.mkstmt(pos, StmtKind::Import(decl)))
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        let saved = self.no_composite;
        self.no_composite = true;

        let mut init = None;
        let first = self.simple_stmt()?;
        let cond = if self.got(TokenKind::Semicolon)? {
            init = Some(Box::new(first));
            self.expr()?
        } else {
            match first.kind {
                StmtKind::Simple(e) => e,
                _ => return Err(self.errorf("missing condition in if statement")),
            }
        };

        self.no_composite = saved;
        let body = Box::new(self.block()?);
        let els = if self.got(TokenKind::Else)? {
            if self.tok.kind == TokenKind::If {
                Some(Box::new(self.if_stmt()?))
            } else {
                Some(Box::new(self.block()?))
            }
        } else {
            None
        };
        Ok(self.mkstmt(
            pos,
            StmtKind::If {
                init,
                cond,
                body,
                els,
            },
        ))
    }

    fn for_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        let saved = self.no_composite;
        self.no_composite = true;

        // for {}
        if self.tok.kind == TokenKind::LeftBrace {
            self.no_composite = saved;
            let body = Box::new(self.block()?);
            return Ok(self.mkstmt(
                pos,
                StmtKind::For {
                    init: None,
                    cond: None,
                    post: None,
                    body,
                },
            ));
        }

        // for range x {}
        if self.got(TokenKind::Range)? {
            let expr = self.expr()?;
            self.no_composite = saved;
            let body = Box::new(self.block()?);
            return Ok(self.mkstmt(
                pos,
                StmtKind::Range {
                    key: None,
                    value: None,
                    decl: false,
                    expr,
                    body,
                },
            ));
        }

        // for ; cond; post {}
        if self.got(TokenKind::Semicolon)? {
            return self.for_clauses(pos, None, saved);
        }

        let left = self.expr_list()?;
        match self.tok.kind {
            TokenKind::Define | TokenKind::Assign => {
                let decl = self.tok.kind == TokenKind::Define;
                self.advance()?;
                if self.got(TokenKind::Range)? {
                    let expr = self.expr()?;
                    self.no_composite = saved;
                    let body = Box::new(self.block()?);
                    let mut iter = left.into_iter();
                    return Ok(self.mkstmt(
                        pos,
                        StmtKind::Range {
                            key: iter.next(),
                            value: iter.next(),
                            decl,
                            expr,
                            body,
                        },
                    ));
                }
                let right = self.expr_list()?;
                let init = self.mkstmt(pos, StmtKind::Assign { decl, left, right });
                self.expect(TokenKind::Semicolon)?;
                self.for_clauses(pos, Some(Box::new(init)), saved)
            }
            TokenKind::LeftBrace => {
                if left.len() != 1 {
                    return Err(self.errorf("too many loop conditions"));
                }
                let cond = left.into_iter().next();
                self.no_composite = saved;
                let body = Box::new(self.block()?);
                Ok(self.mkstmt(
                    pos,
                    StmtKind::For {
                        init: None,
                        cond,
                        post: None,
                        body,
                    },
                ))
            }
            _ => Err(self.unexpected("for loop body")),
        }
    }

    /// The `cond; post { body }` tail of a three-clause for loop.
    fn for_clauses(
        &mut self,
        pos: Pos,
        init: Option<Box<Stmt>>,
        saved: bool,
    ) -> Result<Stmt> {
        let cond = if self.tok.kind != TokenKind::Semicolon {
            Some(self.expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        let post = if self.tok.kind != TokenKind::LeftBrace {
            Some(Box::new(self.simple_stmt()?))
        } else {
            None
        };
        self.no_composite = saved;
        let body = Box::new(self.block()?);
        Ok(self.mkstmt(
            pos,
            StmtKind::For {
                init,
                cond,
                post,
                body,
            },
        ))
    }

    fn is_type_switch_guard(s: &Stmt) -> bool {
        match &s.kind {
            StmtKind::Simple(e) => matches!(e.kind, ExprKind::TypeAssert { ty: None, .. }),
            StmtKind::Assign { right, .. } => right
                .first()
                .map(|e| matches!(e.kind, ExprKind::TypeAssert { ty: None, .. }))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn switch_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        let saved = self.no_composite;
        self.no_composite = true;

        let mut init = None;
        let mut guard = None;
        if self.tok.kind != TokenKind::LeftBrace {
            let first = self.simple_stmt()?;
            if self.got(TokenKind::Semicolon)? {
                init = Some(Box::new(first));
                if self.tok.kind != TokenKind::LeftBrace {
                    guard = Some(self.simple_stmt()?);
                }
            } else {
                guard = Some(first);
            }
        }
        self.no_composite = saved;

        if guard.as_ref().map(Self::is_type_switch_guard).unwrap_or(false) {
            let assign = guard.ok_or_else(|| EbbError::parse("missing guard", pos))?;
            let cases = self.type_switch_cases()?;
            return Ok(self.mkstmt(
                pos,
                StmtKind::TypeSwitch {
                    init,
                    assign: Box::new(assign),
                    cases,
                },
            ));
        }

        let cond = match guard {
            Some(s) => match s.kind {
                StmtKind::Simple(e) => Some(e),
                _ => return Err(self.errorf("switch condition must be an expression")),
            },
            None => None,
        };

        self.expect(TokenKind::LeftBrace)?;
        let mut cases = Vec::new();
        loop {
            while self.tok.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if self.got(TokenKind::RightBrace)? {
                break;
            }
            let mut case = SwitchCase::default();
            if self.got(TokenKind::Default)? {
                case.default = true;
            } else {
                self.expect(TokenKind::Case)?;
                case.conds = self.expr_list()?;
            }
            self.expect(TokenKind::Colon)?;
            case.body = self.case_body()?;
            cases.push(case);
        }
        Ok(self.mkstmt(pos, StmtKind::Switch { init, cond, cases }))
    }

    fn type_switch_cases(&mut self) -> Result<Vec<TypeSwitchCase>> {
        self.expect(TokenKind::LeftBrace)?;
        let mut cases = Vec::new();
        loop {
            while self.tok.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if self.got(TokenKind::RightBrace)? {
                break;
            }
            let mut case = TypeSwitchCase::default();
            if self.got(TokenKind::Default)? {
                case.default = true;
            } else {
                self.expect(TokenKind::Case)?;
                loop {
                    case.types.push(self.parse_type()?);
                    if !self.got(TokenKind::Comma)? {
                        break;
                    }
                }
            }
            self.expect(TokenKind::Colon)?;
            case.body = self.case_body()?;
            cases.push(case);
        }
        Ok(cases)
    }

    fn select_stmt(&mut self) -> Result<Stmt> {
        let pos = self.tok.pos;
        self.advance()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut cases = Vec::new();
        loop {
            while self.tok.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if self.got(TokenKind::RightBrace)? {
                break;
            }
            let mut case = SelectCase::default();
            if self.got(TokenKind::Default)? {
                case.default = true;
            } else {
                self.expect(TokenKind::Case)?;
                case.stmt = Some(self.simple_stmt()?);
            }
            self.expect(TokenKind::Colon)?;
            case.body = self.case_body()?;
            cases.push(case);
        }
        Ok(self.mkstmt(pos, StmtKind::Select { cases }))
    }

    fn case_body(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            while self.tok.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if matches!(
                self.tok.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace
            ) {
                return Ok(stmts);
            }
            if self.tok.kind == TokenKind::Eof {
                return Err(self.unexpected("}"));
            }
            stmts.push(self.stmt()?);
        }
    }

    fn ident_list(&mut self) -> Result<Vec<String>> {
        let mut names = vec![self.ident_name()?];
        while self.got(TokenKind::Comma)? {
            names.push(self.ident_name()?);
        }
        Ok(names)
    }

    fn expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.got(TokenKind::Comma)? {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    // ----- expressions -----

    fn expr(&mut self) -> Result<Expr> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> Result<Expr> {
        let mut x = self.unary_expr()?;
        loop {
            let prec = precedence(self.tok.kind);
            if prec < min_prec {
                return Ok(x);
            }
            let op = self.tok.kind;
            let pos = x.pos;
            self.advance()?;
            let y = self.binary_expr(prec + 1)?;
            x = self.mkexpr(
                pos,
                ExprKind::Binary {
                    op,
                    left: Box::new(x),
                    right: Box::new(y),
                },
            );
        }
    }

    fn unary_expr(&mut self) -> Result<Expr> {
        let pos = self.tok.pos;
        match self.tok.kind {
            TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Not
            | TokenKind::Ref
            | TokenKind::Mul
            | TokenKind::ChanOp => {
                let op = self.tok.kind;
                self.advance()?;
                let expr = self.unary_expr()?;
                Ok(self.mkexpr(
                    pos,
                    ExprKind::Unary {
                        op,
                        expr: Box::new(expr),
                    },
                ))
            }
            _ => {
                let x = self.operand()?;
                self.postfix(x)
            }
        }
    }

    fn operand(&mut self) -> Result<Expr> {
        let pos = self.tok.pos;
        match self.tok.kind {
            TokenKind::Ident => {
                let name = self.tok.text().to_string();
                self.advance()?;
                Ok(self.mkexpr(pos, ExprKind::Ident(name)))
            }
            TokenKind::Int | TokenKind::Float | TokenKind::Imaginary | TokenKind::String
            | TokenKind::Rune => {
                let lit = self
                    .tok
                    .literal
                    .clone()
                    .ok_or_else(|| self.errorf("literal token without value"))?;
                self.advance()?;
                Ok(self.mkexpr(pos, ExprKind::Basic(lit)))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let saved = self.no_composite;
                self.no_composite = false;
                let inner = self.expr()?;
                self.no_composite = saved;
                self.expect(TokenKind::RightParen)?;
                Ok(self.mkexpr(
                    pos,
                    ExprKind::Unary {
                        op: TokenKind::LeftParen,
                        expr: Box::new(inner),
                    },
                ))
            }
            TokenKind::Func => self.func_literal_or_type(),
            TokenKind::Shell => self.parse_shell(true),
            TokenKind::Map => {
                let ty = self.parse_type()?;
                if self.tok.kind != TokenKind::LeftBrace {
                    return Ok(self.mkexpr(pos, ExprKind::Type(ty)));
                }
                self.map_literal(pos, ty)
            }
            TokenKind::LeftBracket => {
                let ty = self.parse_type()?;
                if self.tok.kind != TokenKind::LeftBrace {
                    // a conversion such as []byte(s)
                    return Ok(self.mkexpr(pos, ExprKind::Type(ty)));
                }
                match ty {
                    Type::Slice(_) => {
                        let (keys, elems) = self.literal_body()?;
                        if !keys.is_empty() {
                            return Err(self.errorf("keyed elements in slice literal"));
                        }
                        Ok(self.mkexpr(pos, ExprKind::SliceLiteral { ty, elems }))
                    }
                    _ => {
                        let (keys, elements) = self.literal_body()?;
                        Ok(self.mkexpr(pos, ExprKind::CompLiteral { ty, keys, elements }))
                    }
                }
            }
            TokenKind::Struct | TokenKind::Interface | TokenKind::Chan => {
                let ty = self.parse_type()?;
                Ok(self.mkexpr(pos, ExprKind::Type(ty)))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn postfix(&mut self, mut x: Expr) -> Result<Expr> {
        loop {
            let pos = x.pos;
            match self.tok.kind {
                TokenKind::Period => {
                    self.advance()?;
                    if self.got(TokenKind::LeftParen)? {
                        // x.(T) or x.(type)
                        let ty = if self.tok.kind == TokenKind::Type {
                            self.advance()?;
                            None
                        } else {
                            Some(self.parse_type()?)
                        };
                        self.expect(TokenKind::RightParen)?;
                        x = self.mkexpr(
                            pos,
                            ExprKind::TypeAssert {
                                left: Box::new(x),
                                ty,
                            },
                        );
                    } else {
                        let name = self.ident_name()?;
                        x = self.mkexpr(
                            pos,
                            ExprKind::Selector {
                                left: Box::new(x),
                                name,
                            },
                        );
                    }
                }
                TokenKind::LeftParen => {
                    self.advance()?;
                    let saved = self.no_composite;
                    self.no_composite = false;
                    let mut args = Vec::new();
                    let mut ellipsis = false;
                    while self.tok.kind != TokenKind::RightParen {
                        args.push(self.expr()?);
                        if self.got(TokenKind::Ellipsis)? {
                            ellipsis = true;
                            break;
                        }
                        if !self.got(TokenKind::Comma)? {
                            break;
                        }
                        // tolerate a newline-inserted semicolon after a comma
                        while self.tok.kind == TokenKind::Semicolon {
                            self.advance()?;
                        }
                    }
                    self.no_composite = saved;
                    self.expect(TokenKind::RightParen)?;
                    x = self.mkexpr(
                        pos,
                        ExprKind::Call {
                            func: Box::new(x),
                            args,
                            ellipsis,
                            elide_error: false,
                        },
                    );
                }
                TokenKind::LeftBracket => {
                    self.advance()?;
                    let saved = self.no_composite;
                    self.no_composite = false;
                    let mut indicies = Vec::new();
                    loop {
                        indicies.push(self.index_element()?);
                        if !self.got(TokenKind::Comma)? {
                            break;
                        }
                    }
                    self.no_composite = saved;
                    self.expect(TokenKind::RightBracket)?;
                    x = self.mkexpr(
                        pos,
                        ExprKind::Index {
                            left: Box::new(x),
                            indicies,
                        },
                    );
                }
                TokenKind::LeftBrace => {
                    if self.no_composite {
                        return Ok(x);
                    }
                    let ty = match expr_to_type(&x) {
                        Some(ty) => ty,
                        None => return Ok(x),
                    };
                    let (keys, elements) = self.literal_body()?;
                    x = self.mkexpr(pos, ExprKind::CompLiteral { ty, keys, elements });
                }
                _ => return Ok(x),
            }
        }
    }

    /// One element of an index expression: a plain expression or a
    /// `low:high` slice with either side omitted.
    fn index_element(&mut self) -> Result<Expr> {
        let pos = self.tok.pos;
        let mut low = None;
        if self.tok.kind != TokenKind::Colon {
            let e = self.expr()?;
            if self.tok.kind != TokenKind::Colon {
                return Ok(e);
            }
            low = Some(Box::new(e));
        }
        self.expect(TokenKind::Colon)?;
        let high = if matches!(
            self.tok.kind,
            TokenKind::Comma | TokenKind::RightBracket
        ) {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        Ok(self.mkexpr(pos, ExprKind::Slice { low, high }))
    }

    fn map_literal(&mut self, pos: Pos, ty: Type) -> Result<Expr> {
        let (keys, values) = self.literal_body()?;
        if keys.len() != values.len() {
            return Err(self.errorf("map literal requires keyed elements"));
        }
        Ok(self.mkexpr(pos, ExprKind::MapLiteral { ty, keys, values }))
    }

    /// The `{ … }` of a composite, map or slice literal. Returns
    /// parallel key/element lists; keys are empty for positional
    /// literals.
    fn literal_body(&mut self) -> Result<(Vec<Expr>, Vec<Expr>)> {
        let saved = self.no_composite;
        self.no_composite = false;
        self.expect(TokenKind::LeftBrace)?;
        let mut keys = Vec::new();
        let mut elements = Vec::new();
        loop {
            while self.tok.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if self.tok.kind == TokenKind::RightBrace {
                break;
            }
            let e = self.expr()?;
            if self.got(TokenKind::Colon)? {
                keys.push(e);
                elements.push(self.expr()?);
            } else {
                elements.push(e);
            }
            if !self.got(TokenKind::Comma)? {
                while self.tok.kind == TokenKind::Semicolon {
                    self.advance()?;
                }
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;
        self.no_composite = saved;
        if !keys.is_empty() && keys.len() != elements.len() {
            return Err(self.errorf("mixed keyed and positional elements"));
        }
        Ok((keys, elements))
    }

    fn func_literal_or_type(&mut self) -> Result<Expr> {
        let pos = self.tok.pos;
        self.expect(TokenKind::Func)?;
        let (sig, param_names, result_names) = self.parse_signature()?;
        if self.tok.kind != TokenKind::LeftBrace {
            return Ok(self.mkexpr(pos, ExprKind::Type(Type::Func(sig))));
        }
        let body = self.block_stmts()?;
        Ok(self.mkexpr(
            pos,
            ExprKind::FuncLiteral(FuncLiteral {
                sig,
                param_names,
                result_names,
                body: Some(body),
                ..FuncLiteral::default()
            }),
        ))
    }

    // ----- signatures and types -----

    /// `(params) results`; returns the signature plus parameter and
    /// result names (empty when unnamed).
    fn parse_signature(&mut self) -> Result<(FuncSig, Vec<String>, Vec<String>)> {
        self.expect(TokenKind::LeftParen)?;
        let (params, param_names) = self.param_list(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen)?;

        let mut results = Vec::new();
        let mut result_names = Vec::new();
        if self.got(TokenKind::LeftParen)? {
            let (tys, names) = self.param_list(TokenKind::RightParen)?;
            self.expect(TokenKind::RightParen)?;
            results = tys;
            result_names = names;
        } else if starts_type(self.tok.kind) {
            results.push(self.parse_type()?);
        }

        Ok((
            FuncSig { params, results },
            param_names,
            result_names,
        ))
    }

    /// A parenthesised parameter or result list: either all named
    /// (`x, y T, z U`) or all types (`T, U`). Grouped names share the
    /// type that follows them.
    fn param_list(&mut self, end: TokenKind) -> Result<(Vec<Type>, Vec<String>)> {
        enum Entry {
            Pending(String),
            Named(String, Type),
            Anon(Type),
        }

        let mut entries = Vec::new();
        while self.tok.kind != end {
            if self.tok.kind == TokenKind::Ident {
                let name = self.tok.text().to_string();
                self.advance()?;
                if self.tok.kind == TokenKind::Comma || self.tok.kind == end {
                    entries.push(Entry::Pending(name));
                } else if self.tok.kind == TokenKind::Period {
                    // qualified type name: pkg.T
                    self.advance()?;
                    let tname = self.ident_name()?;
                    entries.push(Entry::Anon(Type::Unresolved {
                        package: Some(name),
                        name: tname,
                    }));
                } else {
                    let ty = self.parse_type()?;
                    entries.push(Entry::Named(name, ty));
                }
            } else {
                entries.push(Entry::Anon(self.parse_type()?));
            }
            if !self.got(TokenKind::Comma)? {
                break;
            }
        }

        let any_named = entries.iter().any(|e| matches!(e, Entry::Named(..)));
        let mut types = Vec::new();
        let mut names = Vec::new();
        if !any_named {
            for e in entries {
                match e {
                    Entry::Pending(name) => types.push(Type::Unresolved {
                        package: None,
                        name,
                    }),
                    Entry::Anon(ty) => types.push(ty),
                    Entry::Named(..) => {}
                }
            }
            return Ok((types, names));
        }

        // Named list: pending names take the type of the next named
        // entry, so `x, y T` gives both x and y the type T.
        let mut pending = Vec::new();
        for e in entries {
            match e {
                Entry::Pending(name) => pending.push(name),
                Entry::Named(name, ty) => {
                    for p in pending.drain(..) {
                        names.push(p);
                        types.push(ty.clone());
                    }
                    names.push(name);
                    types.push(ty);
                }
                Entry::Anon(_) => {
                    return Err(self.errorf("mixed named and unnamed parameters"));
                }
            }
        }
        if !pending.is_empty() {
            return Err(self.errorf("parameter names missing a type"));
        }
        Ok((types, names))
    }

    pub(crate) fn parse_type(&mut self) -> Result<Type> {
        match self.tok.kind {
            TokenKind::Ident => {
                let name = self.tok.text().to_string();
                self.advance()?;
                if self.got(TokenKind::Period)? {
                    let tname = self.ident_name()?;
                    Ok(Type::Unresolved {
                        package: Some(name),
                        name: tname,
                    })
                } else {
                    Ok(Type::Unresolved {
                        package: None,
                        name,
                    })
                }
            }
            TokenKind::Mul => {
                self.advance()?;
                Ok(Type::Pointer(Box::new(self.parse_type()?)))
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                match self.tok.kind {
                    TokenKind::RightBracket => {
                        self.advance()?;
                        Ok(Type::Slice(Box::new(self.parse_type()?)))
                    }
                    TokenKind::Pipe => {
                        self.advance()?;
                        self.expect(TokenKind::RightBracket)?;
                        Ok(Type::Table(Box::new(self.parse_type()?)))
                    }
                    TokenKind::Ellipsis => {
                        self.advance()?;
                        self.expect(TokenKind::RightBracket)?;
                        Ok(Type::Array {
                            len: None,
                            ellipsis: true,
                            elem: Box::new(self.parse_type()?),
                        })
                    }
                    TokenKind::Int => {
                        let len = match &self.tok.literal {
                            Some(Literal::Int(v)) => u64::try_from(v.clone())
                                .map_err(|_| self.errorf("array length out of range"))?,
                            _ => return Err(self.errorf("bad array length")),
                        };
                        self.advance()?;
                        self.expect(TokenKind::RightBracket)?;
                        Ok(Type::Array {
                            len: Some(len),
                            ellipsis: false,
                            elem: Box::new(self.parse_type()?),
                        })
                    }
                    _ => Err(self.unexpected("array length")),
                }
            }
            TokenKind::Map => {
                self.advance()?;
                self.expect(TokenKind::LeftBracket)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RightBracket)?;
                let value = self.parse_type()?;
                Ok(Type::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            TokenKind::Chan => {
                self.advance()?;
                let dir = if self.got(TokenKind::ChanOp)? {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Ok(Type::Chan {
                    dir,
                    elem: Box::new(self.parse_type()?),
                })
            }
            TokenKind::ChanOp => {
                self.advance()?;
                self.expect(TokenKind::Chan)?;
                Ok(Type::Chan {
                    dir: ChanDir::Recv,
                    elem: Box::new(self.parse_type()?),
                })
            }
            TokenKind::Func => {
                self.advance()?;
                let (sig, _, _) = self.parse_signature()?;
                Ok(Type::Func(sig))
            }
            TokenKind::Interface => {
                self.advance()?;
                self.expect(TokenKind::LeftBrace)?;
                let mut methods: Vec<(String, FuncSig)> = Vec::new();
                loop {
                    while self.tok.kind == TokenKind::Semicolon {
                        self.advance()?;
                    }
                    if self.got(TokenKind::RightBrace)? {
                        break;
                    }
                    let name = self.ident_name()?;
                    let (sig, _, _) = self.parse_signature()?;
                    methods.push((name, sig));
                }
                methods.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(Type::Interface(methods))
            }
            TokenKind::Struct => {
                self.advance()?;
                self.expect(TokenKind::LeftBrace)?;
                let mut fields = Vec::new();
                loop {
                    while self.tok.kind == TokenKind::Semicolon {
                        self.advance()?;
                    }
                    if self.got(TokenKind::RightBrace)? {
                        break;
                    }
                    let names = self.ident_list()?;
                    let ty = self.parse_type()?;
                    for name in names {
                        fields.push((name, ty.clone()));
                    }
                }
                Ok(Type::Struct(fields))
            }
            TokenKind::Ellipsis => {
                self.advance()?;
                Ok(Type::Ellipsis(Box::new(self.parse_type()?)))
            }
            _ => Err(self.unexpected("type")),
        }
    }
}

fn precedence(op: TokenKind) -> u8 {
    match op {
        TokenKind::LogicalOr => 1,
        TokenKind::LogicalAnd => 2,
        TokenKind::Equal
        | TokenKind::NotEqual
        | TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual => 3,
        TokenKind::Add | TokenKind::Sub | TokenKind::Pipe | TokenKind::Pow => 4,
        TokenKind::Mul
        | TokenKind::Div
        | TokenKind::Rem
        | TokenKind::TwoLess
        | TokenKind::TwoGreater
        | TokenKind::Ref
        | TokenKind::RefPow => 5,
        _ => 0,
    }
}

fn starts_type(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Mul
            | TokenKind::LeftBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::ChanOp
            | TokenKind::Func
            | TokenKind::Interface
            | TokenKind::Struct
    )
}

/// A type expression on the left of a composite literal: an identifier
/// or a package-qualified name.
fn expr_to_type(e: &Expr) -> Option<Type> {
    match &e.kind {
        ExprKind::Ident(name) => Some(Type::Unresolved {
            package: None,
            name: name.clone(),
        }),
        ExprKind::Selector { left, name } => match &left.kind {
            ExprKind::Ident(pkg) => Some(Type::Unresolved {
                package: Some(pkg.clone()),
                name: name.clone(),
            }),
            _ => None,
        },
        ExprKind::Type(ty) => Some(ty.clone()),
        _ => None,
    }
}
