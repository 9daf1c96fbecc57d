//! Statement nodes.

use super::expr::Expr;
use super::types::Type;
use super::NodeId;
use crate::lexer::token::{Pos, TokenKind};

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub pos: Pos,
    pub kind: StmtKind,
}

// Structural equality: ids and positions are not part of identity.
impl PartialEq for Stmt {
    fn eq(&self, other: &Stmt) -> bool {
        self.kind == other.kind
    }
}

impl From<StmtKind> for Stmt {
    fn from(kind: StmtKind) -> Stmt {
        Stmt {
            id: NodeId::default(),
            pos: Pos::default(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Simple(Expr),
    Assign {
        /// `:=` declares its left-hand names.
        decl: bool,
        left: Vec<Expr>,
        right: Vec<Expr>,
    },
    Const(ConstDecl),
    ConstSet(Vec<ConstDecl>),
    Var(VarDecl),
    VarSet(Vec<VarDecl>),
    Block(Vec<Stmt>),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        body: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Box<Stmt>,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        decl: bool,
        expr: Expr,
        body: Box<Stmt>,
    },
    Return(Vec<Expr>),
    Go(Expr),
    Send {
        chan: Expr,
        value: Expr,
    },
    Labeled {
        label: String,
        stmt: Box<Stmt>,
    },
    /// break / continue / fallthrough / goto, with an optional label.
    Branch {
        op: TokenKind,
        label: Option<String>,
    },
    Switch {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        cases: Vec<SwitchCase>,
    },
    TypeSwitch {
        init: Option<Box<Stmt>>,
        /// Either `Simple(TypeAssert)` or `Assign{right: [TypeAssert]}`.
        assign: Box<Stmt>,
        cases: Vec<TypeSwitchCase>,
    },
    Select {
        cases: Vec<SelectCase>,
    },
    TypeDecl {
        name: String,
        ty: Type,
    },
    MethodikDecl {
        name: String,
        ty: Type,
        /// `FuncLiteral` expressions, one per method.
        methods: Vec<Expr>,
    },
    Import(ImportDecl),
    ImportSet(Vec<ImportDecl>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstDecl {
    pub names: Vec<String>,
    pub ty: Option<Type>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarDecl {
    pub names: Vec<String>,
    pub ty: Option<Type>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    /// Local binding name; defaults to the path's base name.
    pub name: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SwitchCase {
    pub conds: Vec<Expr>,
    pub default: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeSwitchCase {
    pub types: Vec<Type>,
    pub default: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectCase {
    /// The communication clause; `None` only for `default`.
    pub stmt: Option<Stmt>,
    pub default: bool,
    pub body: Vec<Stmt>,
}
