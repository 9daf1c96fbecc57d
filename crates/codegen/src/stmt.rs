//! Statement emission.

use ebb_parser::ast::expr::FuncLiteral;
use ebb_parser::ast::stmt::{ConstDecl, VarDecl};
use ebb_parser::{ExprKind, Stmt, StmtKind};

use crate::{is_exported, Printer};

impl Printer<'_> {
    pub(crate) fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::ConstSet(decls) => {
                self.print("const (");
                self.indent += 1;
                for decl in decls {
                    self.newline();
                    self.const_spec(decl);
                }
                self.indent -= 1;
                self.newline();
                self.print(")");
            }
            StmtKind::Const(decl) => {
                self.print("const ");
                self.const_spec(decl);
            }
            StmtKind::VarSet(decls) => {
                self.print("var (");
                self.indent += 1;
                for decl in decls {
                    self.newline();
                    self.var_spec(decl);
                }
                self.indent -= 1;
                self.newline();
                self.print(")");
            }
            StmtKind::Var(decl) => {
                self.print("var ");
                self.var_spec(decl);
            }
            StmtKind::Assign { decl, left, right } => {
                for (i, e) in left.iter().enumerate() {
                    if i != 0 {
                        self.print(", ");
                    }
                    self.expr(e);
                }
                // Exported names are produced by lifted top-level
                // declarations, so a := here would shadow them.
                let declares = match left.first().map(|e| &e.kind) {
                    Some(ExprKind::Ident(name)) => *decl && !is_exported(name),
                    _ => false,
                };
                if declares {
                    self.print(" := ");
                } else {
                    self.print(" = ");
                }
                for (i, e) in right.iter().enumerate() {
                    if i != 0 {
                        self.print(", ");
                    }
                    self.expr(e);
                }
            }
            StmtKind::Block(stmts) => self.block(stmts),
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.print("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.stmt(init);
                    }
                    self.print("; ");
                    if let Some(cond) = cond {
                        self.expr(cond);
                    }
                    self.print("; ");
                    if let Some(post) = post {
                        self.stmt(post);
                    }
                    self.print(" ");
                } else if let Some(cond) = cond {
                    self.expr(cond);
                    self.print(" ");
                }
                self.stmt(body);
            }
            StmtKind::Go(call) => {
                self.print("go ");
                self.expr(call);
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                self.print("if ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.print("; ");
                }
                self.expr(cond);
                self.print(" ");
                self.stmt(body);
                if let Some(els) = els {
                    self.print(" else ");
                    self.stmt(els);
                }
            }
            StmtKind::ImportSet(_) | StmtKind::Import(_) => {
                // lifted to the top level earlier
            }
            StmtKind::Range {
                key,
                value,
                decl,
                expr,
                body,
            } => {
                self.print("for ");
                if let Some(key) = key {
                    self.expr(key);
                }
                if let Some(value) = value {
                    self.print(", ");
                    self.expr(value);
                }
                if key.is_some() || value.is_some() {
                    if *decl {
                        self.print(" := ");
                    } else {
                        self.print(" = ");
                    }
                }
                self.print("range ");
                self.expr(expr);
                self.print(" ");
                self.stmt(body);
            }
            StmtKind::Return(exprs) => {
                self.print("return");
                for (i, e) in exprs.iter().enumerate() {
                    if i == 0 {
                        self.print(" ");
                    } else {
                        self.print(", ");
                    }
                    self.expr(e);
                }
            }
            StmtKind::Simple(e) => self.expr(e),
            StmtKind::Send { chan, value } => {
                self.expr(chan);
                self.print(" <- ");
                self.expr(value);
            }
            StmtKind::TypeDecl { name, ty } => {
                self.print(&format!("type {} ", name));
                self.tipe(ty);
            }
            StmtKind::MethodikDecl { .. } => {
                // lifted to the top level earlier
            }
            StmtKind::Labeled { label, stmt } => {
                self.indent -= 1;
                self.newline();
                self.print(&format!("{}:", label));
                self.indent += 1;
                self.newline();
                self.stmt(stmt);
            }
            StmtKind::Branch { op, label } => {
                self.print(&op.to_string());
                if let Some(label) = label {
                    self.print(&format!(" {}", label));
                }
            }
            StmtKind::Switch { init, cond, cases } => {
                self.print("switch ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.print("; ");
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                self.print(" {");
                for case in cases {
                    self.newline();
                    if case.default {
                        self.print("default:");
                    } else {
                        self.print("case ");
                        for (i, c) in case.conds.iter().enumerate() {
                            if i > 0 {
                                self.print(", ");
                            }
                            self.expr(c);
                        }
                        self.print(":");
                    }
                    self.indent += 1;
                    for s in &case.body {
                        self.newline();
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.newline();
                self.print("}");
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                cases,
            } => {
                self.print("switch ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.print("; ");
                }
                self.stmt(assign);
                self.print(" {");
                for case in cases {
                    self.newline();
                    if case.default {
                        self.print("default:");
                    } else {
                        self.print("case ");
                        for (i, t) in case.types.iter().enumerate() {
                            if i > 0 {
                                self.print(", ");
                            }
                            self.tipe(t);
                        }
                        self.print(":");
                    }
                    self.indent += 1;
                    for s in &case.body {
                        self.newline();
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.newline();
                self.print("}");
            }
            StmtKind::Select { cases } => {
                self.print("select {");
                for case in cases {
                    self.newline();
                    if case.default {
                        self.print("default:");
                    } else {
                        self.print("case ");
                        if let Some(stmt) = &case.stmt {
                            self.stmt(stmt);
                        }
                        self.print(":");
                    }
                    self.indent += 1;
                    for s in &case.body {
                        self.newline();
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.newline();
                self.print("}");
            }
        }
    }

    pub(crate) fn block(&mut self, stmts: &[Stmt]) {
        self.print("{");
        self.indent += 1;
        for s in stmts {
            self.newline();
            self.stmt(s);
        }
        self.indent -= 1;
        self.newline();
        self.print("}");
    }

    fn const_spec(&mut self, decl: &ConstDecl) {
        for (i, name) in decl.names.iter().enumerate() {
            if i != 0 {
                self.print(", ");
            }
            self.print(name);
        }
        if let Some(ty) = &decl.ty {
            self.print(" ");
            self.tipe(ty);
        }
        if decl.values.is_empty() {
            return;
        }
        self.print(" = ");
        for (i, e) in decl.values.iter().enumerate() {
            if i != 0 {
                self.print(", ");
            }
            self.expr(e);
        }
    }

    fn var_spec(&mut self, decl: &VarDecl) {
        for (i, name) in decl.names.iter().enumerate() {
            if i != 0 {
                self.print(", ");
            }
            self.print(name);
        }
        if let Some(ty) = &decl.ty {
            self.print(" ");
            self.tipe(ty);
        }
        if decl.values.is_empty() {
            return;
        }
        self.print(" = ");
        for (i, e) in decl.values.iter().enumerate() {
            if i != 0 {
                self.print(", ");
            }
            self.expr(e);
        }
    }

    /// A lifted methodik method: `func (recv T) name(params) results`.
    pub(crate) fn method(&mut self, type_name: &str, lit: &FuncLiteral) {
        self.print("func (");
        self.print(&lit.receiver_name);
        self.print(" ");
        if lit.pointer_receiver {
            self.print("*");
        }
        self.print(type_name);
        self.print(") ");
        self.print(&lit.name);
        self.print("(");
        let named_params = lit.param_names.len() == lit.sig.params.len();
        for (i, ty) in lit.sig.params.iter().enumerate() {
            if i != 0 {
                self.print(", ");
            }
            if named_params && !lit.param_names[i].is_empty() {
                self.print(&lit.param_names[i]);
                self.print(" ");
            }
            self.tipe(ty);
        }
        self.print(") ");
        if !lit.sig.results.is_empty() {
            if lit.sig.results.len() > 1 {
                self.print("(");
            }
            for (i, ty) in lit.sig.results.iter().enumerate() {
                if i != 0 {
                    self.print(", ");
                }
                self.tipe(ty);
            }
            if lit.sig.results.len() > 1 {
                self.print(")");
            }
            self.print(" ");
        }
        if let Some(body) = &lit.body {
            self.block(body);
        }
    }
}
