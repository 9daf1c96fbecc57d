//! The abstract syntax tree.
//!
//! Three node families (expressions, statements, types) plus the shell
//! fragment nodes. Expression and statement nodes carry a `NodeId`
//! assigned by the parser; the checker's type-table is keyed by it.
//!
//! Equality on `Expr` and `Stmt` is structural and ignores node ids
//! and positions, so tests can compare parsed trees against literals
//! built with `NodeId::default()`.

pub mod expr;
pub mod shell;
pub mod stmt;
pub mod types;

pub use expr::{Expr, ExprKind};
pub use shell::{
    Shell, ShellAndOr, ShellAssign, ShellCmd, ShellList, ShellPipeline, ShellRedirect,
    ShellSimpleCmd,
};
pub use stmt::{ConstDecl, ImportDecl, SelectCase, Stmt, StmtKind, SwitchCase, TypeSwitchCase, VarDecl};
pub use types::{Basic, ChanDir, FuncSig, Type};

/// Identity of an expression or statement node within one translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);
