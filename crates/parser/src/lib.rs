//! ebb front end: scanner, parser and type checker.
//!
//! ebb is a scripting language whose surface syntax mirrors Go,
//! extended with an embedded POSIX-style shell sub-language delimited
//! by `$$ … $$`, `methodik` declarations (a named type carrying its
//! methods), table types, arbitrary-precision numeric literals and
//! implicit error elision on calls.
//!
//! The pipeline is scanner → parser → checker. The scanner is
//! hand-written with two interleaved lexical modes (language and
//! shell) and automatic semicolon insertion; the parser is a
//! precedence-climbing recursive descent producing a typed AST
//! including a full shell grammar subset; the checker resolves names
//! against lexical scopes and a pluggable package loader and assigns a
//! type to every node.
//!
//! ```no_run
//! use ebb_parser::semantic::{loader::MapLoader, Checker};
//!
//! let loader = MapLoader::with_std();
//! let mut checker = Checker::new(&loader);
//! match checker.check(std::path::Path::new("script.ebb")) {
//!     Ok(pkg) => println!("{} top-level statements", pkg.syntax.len()),
//!     Err(err) => eprintln!("{}", err),
//! }
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod semantic;

pub use ast::{Expr, ExprKind, NodeId, Stmt, StmtKind, Type};
pub use error::EbbError;
pub use lexer::token::{Literal, Pos, Token, TokenKind};
pub use lexer::Scanner;
pub use parser::{parse_stmt, Parser};
pub use semantic::{Checker, Package};
