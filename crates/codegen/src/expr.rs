//! Expression emission.

use ebb_parser::ast::expr::FuncLiteral;
use ebb_parser::{Expr, ExprKind, Literal, TokenKind, Type};

use crate::Printer;

impl Printer<'_> {
    pub(crate) fn expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Basic(lit) => self.literal(lit),
            ExprKind::Binary { op, left, right } => {
                self.expr(left);
                self.print(&format!(" {} ", op));
                self.expr(right);
            }
            ExprKind::Call {
                func,
                args,
                ellipsis,
                elide_error,
            } => {
                if *elide_error {
                    let shape = self
                        .node_type(e.id)
                        .cloned()
                        .unwrap_or_else(Type::unit);
                    let name = self.elider(&shape);
                    self.print(&name);
                    self.print("(");
                }
                self.expr(func);
                self.print("(");
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        self.print(", ");
                    }
                    self.expr(arg);
                }
                if *ellipsis {
                    self.print("...");
                }
                self.print(")");
                if *elide_error {
                    self.print(")");
                }
            }
            ExprKind::CompLiteral { ty, keys, elements } => {
                self.tipe(ty);
                self.print("{");
                if !keys.is_empty() {
                    self.indent += 1;
                    for (key, elem) in keys.iter().zip(elements.iter()) {
                        self.newline();
                        self.expr(key);
                        self.print(": ");
                        self.expr(elem);
                        self.print(",");
                    }
                    self.indent -= 1;
                    self.newline();
                } else if !elements.is_empty() {
                    for (i, elem) in elements.iter().enumerate() {
                        if i > 0 {
                            self.print(", ");
                        }
                        self.expr(elem);
                    }
                }
                self.print("}");
            }
            ExprKind::FuncLiteral(lit) => self.func_literal(lit),
            ExprKind::Ident(name) => {
                // imported package values go out under their alias
                let pkg_path = match self.node_type(e.id) {
                    Some(Type::Package(path)) => Some(path.clone()),
                    _ => None,
                };
                if let Some(alias) =
                    pkg_path.and_then(|path| self.imports.get(&path).cloned())
                {
                    self.print(&alias);
                    return;
                }
                self.print(name);
            }
            ExprKind::Index { left, indicies } => {
                self.expr(left);
                self.print("[");
                for (i, index) in indicies.iter().enumerate() {
                    if i > 0 {
                        self.print(", ");
                    }
                    self.expr(index);
                }
                self.print("]");
            }
            ExprKind::Slice { low, high } => {
                if let Some(low) = low {
                    self.expr(low);
                }
                self.print(":");
                if let Some(high) = high {
                    self.expr(high);
                }
            }
            ExprKind::MapLiteral { ty, keys, values } => {
                self.tipe(ty);
                self.print("{");
                self.indent += 1;
                for (key, value) in keys.iter().zip(values.iter()) {
                    self.newline();
                    self.expr(key);
                    self.print(": ");
                    self.expr(value);
                    self.print(",");
                }
                self.indent -= 1;
                self.newline();
                self.print("}");
            }
            ExprKind::Selector { left, name } => {
                self.expr(left);
                self.print(".");
                self.print(name);
            }
            ExprKind::Shell(sh) => self.shell_call(sh),
            ExprKind::SliceLiteral { ty, elems } => {
                self.tipe(ty);
                self.print("{");
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.print(", ");
                    }
                    self.expr(elem);
                }
                self.print("}");
            }
            ExprKind::Type(ty) => self.tipe(ty),
            ExprKind::TypeAssert { left, ty } => {
                self.expr(left);
                self.print(".(");
                match ty {
                    Some(ty) => self.tipe(ty),
                    None => self.print("type"),
                }
                self.print(")");
            }
            ExprKind::Unary { op, expr } => {
                self.print(&op.to_string());
                self.expr(expr);
                if *op == TokenKind::LeftParen {
                    self.print(")");
                }
            }
        }
    }

    pub(crate) fn func_literal(&mut self, lit: &FuncLiteral) {
        self.print("func(");
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
        let named_results =
            !lit.result_names.is_empty() && lit.result_names.iter().any(|n| !n.is_empty());
        if named_results {
            self.print("(");
            for (i, ty) in lit.sig.results.iter().enumerate() {
                if i != 0 {
                    self.print(", ");
                }
                if let Some(name) = lit.result_names.get(i) {
                    if !name.is_empty() {
                        self.print(name);
                        self.print(" ");
                    }
                }
                self.tipe(ty);
            }
            self.print(") ");
        } else if !lit.sig.results.is_empty() {
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

    pub(crate) fn literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Int(v) => self.print(&v.to_string()),
            Literal::Float(v) => self.print(&v.to_string()),
            Literal::Imaginary(v) => self.print(&format!("{}i", v)),
            Literal::Str(s) => {
                let quoted = go_quote(s);
                self.print(&quoted);
            }
            Literal::Rune(c) => {
                let quoted = go_quote_rune(*c);
                self.print(&quoted);
            }
        }
    }
}

/// Quote a string the way the host language spells string literals.
pub(crate) fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub(crate) fn go_quote_rune(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\r' => "'\\r'".to_string(),
        c if (c as u32) < 0x20 => format!("'\\x{:02x}'", c as u32),
        c => format!("'{}'", c),
    }
}
