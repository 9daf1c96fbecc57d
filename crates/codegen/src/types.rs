//! Type emission.

use ebb_parser::ast::types::{Basic, ChanDir, FuncSig};
use ebb_parser::Type;

use crate::Printer;

impl Printer<'_> {
    pub(crate) fn tipe(&mut self, t: &Type) {
        match t {
            Type::Basic(b) => self.print(basic_name(*b)),
            Type::Error => self.print("error"),
            Type::Struct(fields) => {
                if fields.is_empty() {
                    self.print("struct{}");
                    return;
                }
                self.print("struct {");
                self.indent += 1;
                let maxlen = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
                for (name, fty) in fields {
                    self.newline();
                    self.print(name);
                    for _ in name.len()..=maxlen {
                        self.print(" ");
                    }
                    self.tipe(fty);
                }
                self.indent -= 1;
                self.newline();
                self.print("}");
            }
            Type::Named { package, name } => {
                if !package.is_empty() {
                    let alias = self.imports.get(package).cloned();
                    match alias {
                        Some(alias) => {
                            self.print(&alias);
                            self.print(".");
                        }
                        None => {
                            self.errorf(format!(
                                "type {}.{} names a package that was never imported",
                                package, name
                            ));
                        }
                    }
                }
                self.print(name);
            }
            Type::Pointer(elem) => {
                self.print("*");
                self.tipe(elem);
            }
            Type::Array {
                len,
                ellipsis,
                elem,
            } => {
                if *ellipsis {
                    self.print("[...]");
                } else {
                    self.print(&format!("[{}]", len.unwrap_or(0)));
                }
                self.tipe(elem);
            }
            Type::Slice(elem) => {
                self.print("[]");
                self.tipe(elem);
            }
            Type::Interface(methods) => {
                if methods.is_empty() {
                    self.print("interface{}");
                    return;
                }
                self.print("interface {");
                self.indent += 1;
                for (name, sig) in methods {
                    self.newline();
                    self.print(name);
                    self.func_sig(sig);
                }
                self.indent -= 1;
                self.newline();
                self.print("}");
            }
            Type::Map { key, value } => {
                self.print("map[");
                self.tipe(key);
                self.print("]");
                self.tipe(value);
            }
            Type::Chan { dir, elem } => {
                if *dir == ChanDir::Recv {
                    self.print("<-");
                }
                self.print("chan");
                if *dir == ChanDir::Send {
                    self.print("<-");
                }
                self.print(" ");
                self.tipe(elem);
            }
            Type::Func(sig) => {
                self.print("func");
                self.func_sig(sig);
            }
            Type::Alias { name, .. } => self.print(name),
            Type::Tuple(elems) => {
                self.print("(");
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.print(", ");
                    }
                    self.tipe(elem);
                }
                self.print(")");
            }
            Type::Ellipsis(elem) => {
                self.print("...");
                self.tipe(elem);
            }
            Type::Methodik { name, .. } => self.print(name),
            Type::Table(_) => {
                // table emission is not wired up yet; TODO lower
                // [|]T to the runtime table type once it exists
                self.errorf("table types cannot be emitted".to_string());
            }
            Type::Unresolved { package, name } => {
                self.errorf(format!(
                    "unresolved type {}{} survived checking",
                    package
                        .as_ref()
                        .map(|p| format!("{}.", p))
                        .unwrap_or_default(),
                    name
                ));
            }
            Type::Package(path) => {
                self.errorf(format!("package type {:?} in emitted position", path));
            }
        }
    }

    pub(crate) fn func_sig(&mut self, sig: &FuncSig) {
        self.print("(");
        for (i, p) in sig.params.iter().enumerate() {
            if i > 0 {
                self.print(", ");
            }
            self.tipe(p);
        }
        self.print(")");
        if !sig.results.is_empty() {
            self.print(" ");
            if sig.results.len() > 1 {
                self.print("(");
            }
            for (i, r) in sig.results.iter().enumerate() {
                if i > 0 {
                    self.print(", ");
                }
                self.tipe(r);
            }
            if sig.results.len() > 1 {
                self.print(")");
            }
        }
    }
}

fn basic_name(b: Basic) -> &'static str {
    match b {
        Basic::UntypedInteger => "int",
        Basic::UntypedFloat => "float64",
        Basic::UntypedComplex => "complex128",
        Basic::UntypedBool => "bool",
        Basic::UntypedString => "string",
        Basic::UntypedRune => "rune",
        Basic::UntypedNil => "nil",
        other => other.name(),
    }
}
