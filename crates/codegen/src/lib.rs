//! Go source backend for ebb.
//!
//! `generate` checks an ebb source file and lowers the typed AST into
//! a Go package: imports and exported declarations are lifted to the
//! top level, free statements land in an initialiser function in
//! source order, builtins and error-eliding helpers are synthesised on
//! demand, and any shell fragment pulls in a runtime shim that
//! re-executes the fragment through reflected variable bindings. The
//! result is then canonicalised by the external formatter.

pub mod error;
pub mod format;

mod expr;
mod shell;
mod stmt;
mod types;

use std::path::Path;

use indexmap::IndexMap;

use ebb_parser::semantic::loader::PackageLoader;
use ebb_parser::semantic::{Checker, ExportDecl, Package};
use ebb_parser::{ExprKind, NodeId, Stmt, StmtKind, Type};

use error::{CodegenError, CodegenResult};
use format::Formatter;

/// Translate the file at `path` into Go source. An empty
/// `out_pkg_name` derives `gengo_<basename-without-extension>`.
pub fn generate(
    path: &Path,
    out_pkg_name: &str,
    loader: &dyn PackageLoader,
    formatter: &dyn Formatter,
) -> CodegenResult<Vec<u8>> {
    let mut checker = Checker::new(loader);
    let pkg = checker.check(path)?;
    let name = if out_pkg_name.is_empty() {
        default_package_name(path)
    } else {
        out_pkg_name.to_string()
    };
    generate_package(&pkg, &name, formatter)
}

/// Derived output package name: `gengo_` plus the file's base name
/// without its extension.
pub fn default_package_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("pkg");
    format!("gengo_{}", sanitize_ident(stem))
}

/// Lower a checked package. Exposed separately so tests can check
/// sources without touching the filesystem.
pub fn generate_package(
    pkg: &Package,
    out_pkg_name: &str,
    formatter: &dyn Formatter,
) -> CodegenResult<Vec<u8>> {
    let mut p = Printer::new(pkg);

    p.print("// generated by ebb, do not edit\n\npackage ");
    p.print(out_pkg_name);
    p.print("\n\n");

    let scan = Prepass::run(&pkg.syntax);

    // Lift imports to the top level, each under a synthetic unique
    // alias so references can be name-qualified unambiguously.
    let mut seen = Vec::new();
    for path in &scan.import_paths {
        if seen.contains(path) {
            continue;
        }
        seen.push(path.clone());
        let base = sanitize_ident(base_name(path));
        let mut alias = format!("gengoimp_{}", base);
        let mut i = 0;
        while p.imports.values().any(|a| *a == alias) {
            i += 1;
            alias = format!("gengoimp_{}_{}", base, i);
        }
        p.imports.insert(path.clone(), alias);
    }

    p.print("import (");
    p.indent += 1;
    if scan.uses_builtins() || scan.uses_shell {
        p.newline();
        p.print("\"fmt\"");
    }
    if scan.uses_shell {
        for dep in [
            "os",
            "reflect",
            shell::RUNTIME_ENVIRON,
            shell::RUNTIME_SHELL,
            shell::RUNTIME_EXPR,
            shell::RUNTIME_SRC,
            shell::RUNTIME_TOKEN,
        ] {
            p.newline();
            p.print(&format!("{:?}", dep));
        }
    }
    // Stable output is ensured by the formatter's import sorting.
    for (path, alias) in p.imports.clone() {
        p.newline();
        p.print(&format!("{} {:?}", alias, path));
    }
    p.indent -= 1;
    p.newline();
    p.print(")");
    p.newline();
    p.newline();

    if out_pkg_name == "main" {
        p.print("func main() {}");
        p.newline();
        p.newline();
    }

    // Lift exported declarations to the top level.
    for obj in &pkg.exported {
        use ebb_parser::semantic::loader::ObjKind;
        match obj.kind {
            ObjKind::Type => {
                p.print(&format!("type {} ", obj.name));
                match &obj.decl {
                    Some(ExportDecl::Underlying(t)) => p.tipe(t),
                    _ => p.print("struct{}"),
                }
                p.newline();
                p.newline();
            }
            ObjKind::Var => {
                p.print(&format!("var {} ", obj.name));
                let ty = obj.ty.clone();
                p.tipe(&ty);
                p.newline();
                p.newline();
            }
            ObjKind::Const => {
                // a const spec with a type needs a value to parse;
                // consts whose value is not a plain literal stay in
                // the initialiser body only
                if let Some(ExportDecl::Value(v)) = &obj.decl {
                    p.print(&format!("const {} ", obj.name));
                    let ty = obj.ty.clone();
                    p.tipe(&ty);
                    p.print(" = ");
                    p.literal(v);
                    p.newline();
                    p.newline();
                }
            }
        }
    }

    // Methodik declarations are lifted whole: Go methods only exist at
    // the top level. Exported methodik types already got their type
    // declaration above.
    for s in &pkg.syntax {
        if let StmtKind::MethodikDecl { name, ty, methods } = &s.kind {
            if !is_exported(name) {
                if let Type::Methodik { underlying, .. } = ty {
                    p.print(&format!("type {} ", name));
                    p.tipe(underlying);
                    p.newline();
                    p.newline();
                }
            }
            for m in methods {
                if let ExprKind::FuncLiteral(lit) = &m.kind {
                    p.method(name, lit);
                    p.newline();
                    p.newline();
                }
            }
        }
    }

    p.print("func init() {");
    p.indent += 1;
    for s in &pkg.syntax {
        p.newline();
        p.stmt(s);

        if let StmtKind::Assign { decl: true, left, .. } = &s.kind {
            // Suppress "declared but not used" in the target language
            // without altering semantics.
            for e in left {
                if let ExprKind::Ident(name) = &e.kind {
                    if name == "_" {
                        continue;
                    }
                }
                p.newline();
                p.print("_ = ");
                p.expr(e);
            }
        }
    }
    p.indent -= 1;
    p.newline();
    p.print("}");

    p.print_builtins(&scan);
    p.print_eliders();
    if scan.uses_shell {
        p.print_shell_shim();
    }

    if let Some(err) = p.err.take() {
        return Err(CodegenError::Emit(err));
    }

    let src = p.buf.into_bytes();
    match formatter.format(&src) {
        Ok(out) => Ok(out),
        Err(err) => {
            let mut listing = String::new();
            for (i, line) in String::from_utf8_lossy(&src).lines().enumerate() {
                listing.push_str(&format!("{:3}: {}\n", i + 1, line));
            }
            Err(CodegenError::BadSource { err, listing })
        }
    }
}

/// The emitter's output writer: a buffer, an indent level, the alias
/// table and the elider table. The first emission error latches.
pub(crate) struct Printer<'p> {
    pub(crate) buf: String,
    pub(crate) indent: usize,
    pub(crate) pkg: &'p Package,
    /// import path -> synthetic alias
    pub(crate) imports: IndexMap<String, String>,
    /// elided result-tuple type -> helper name, in allocation order
    pub(crate) eliders: IndexMap<Type, String>,
    pub(crate) err: Option<String>,
}

impl<'p> Printer<'p> {
    fn new(pkg: &'p Package) -> Printer<'p> {
        Printer {
            buf: String::new(),
            indent: 0,
            pkg,
            imports: IndexMap::new(),
            eliders: IndexMap::new(),
            err: None,
        }
    }

    pub(crate) fn print(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub(crate) fn newline(&mut self) {
        self.buf.push('\n');
        for _ in 0..self.indent {
            self.buf.push('\t');
        }
    }

    pub(crate) fn errorf(&mut self, msg: String) {
        if self.err.is_none() {
            self.err = Some(msg);
        }
    }

    pub(crate) fn node_type(&self, id: NodeId) -> Option<&Type> {
        self.pkg.types.get(&id)
    }

    /// The helper name for an elided result shape, allocated on first
    /// use.
    pub(crate) fn elider(&mut self, t: &Type) -> String {
        if let Some(name) = self.eliders.get(t) {
            return name.clone();
        }
        let name = format!("gengo_elider{}", self.eliders.len());
        self.eliders.insert(t.clone(), name.clone());
        name
    }

    fn print_builtins(&mut self, scan: &Prepass) {
        if scan.uses_print {
            self.newline();
            self.newline();
            self.print(
                "func print(args ...interface{}) {\n\tfor _, arg := range args {\n\t\tfmt.Printf(\"%v\", arg)\n\t}\n\tfmt.Print(\"\\n\")\n}",
            );
        }
        if scan.uses_printf {
            self.newline();
            self.newline();
            self.print(
                "func printf(f string, args ...interface{}) { fmt.Printf(f, args...) }",
            );
        }
        if scan.uses_errorf {
            self.newline();
            self.newline();
            self.print(
                "func errorf(f string, args ...interface{}) error { return fmt.Errorf(f, args...) }",
            );
        }
    }

    fn print_eliders(&mut self) {
        for (t, name) in self.eliders.clone() {
            self.newline();
            self.newline();
            if t.is_error() {
                self.print(&format!("func {}(err error) {{", name));
                self.indent += 1;
                self.newline();
                self.print("if err != nil { panic(err) }");
                self.indent -= 1;
                self.newline();
                self.print("}");
                continue;
            }

            let elems = match &t {
                Type::Tuple(elems) => elems.clone(),
                other => {
                    self.errorf(format!("elider of non-tuple type {}", other));
                    continue;
                }
            };
            self.print(&format!("func {}(", name));
            for (i, elem) in elems.iter().enumerate() {
                if i == elems.len() - 1 {
                    self.print("err error");
                    continue;
                }
                self.print(&format!("arg{} ", i));
                self.tipe(elem);
                self.print(", ");
            }
            self.print(") (");
            for (i, elem) in elems[..elems.len() - 1].iter().enumerate() {
                if i > 0 {
                    self.print(", ");
                }
                self.tipe(elem);
            }
            self.print(") {");
            self.indent += 1;
            self.newline();
            self.print("if err != nil { panic(err) }");
            self.newline();
            self.print("return ");
            for i in 0..elems.len() - 1 {
                if i > 0 {
                    self.print(", ");
                }
                self.print(&format!("arg{}", i));
            }
            self.indent -= 1;
            self.newline();
            self.print("}");
        }
    }
}

/// Pre-pass over the AST: import paths in source order, builtin usage,
/// shell usage.
#[derive(Default)]
struct Prepass {
    import_paths: Vec<String>,
    uses_print: bool,
    uses_printf: bool,
    uses_errorf: bool,
    uses_shell: bool,
}

impl Prepass {
    fn run(stmts: &[Stmt]) -> Prepass {
        let mut scan = Prepass::default();
        for s in stmts {
            scan.stmt(s);
        }
        scan
    }

    fn uses_builtins(&self) -> bool {
        self.uses_print || self.uses_printf || self.uses_errorf
    }

    fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::Simple(e) | StmtKind::Go(e) => self.expr(e),
            StmtKind::Assign { left, right, .. } => {
                for e in left.iter().chain(right) {
                    self.expr(e);
                }
            }
            StmtKind::Const(decl) => {
                for v in &decl.values {
                    self.expr(v);
                }
            }
            StmtKind::ConstSet(decls) => {
                for d in decls {
                    for v in &d.values {
                        self.expr(v);
                    }
                }
            }
            StmtKind::Var(decl) => {
                for v in &decl.values {
                    self.expr(v);
                }
            }
            StmtKind::VarSet(decls) => {
                for d in decls {
                    for v in &d.values {
                        self.expr(v);
                    }
                }
            }
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.stmt(s);
                }
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.expr(cond);
                self.stmt(body);
                if let Some(els) = els {
                    self.stmt(els);
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                if let Some(post) = post {
                    self.stmt(post);
                }
                self.stmt(body);
            }
            StmtKind::Range {
                key,
                value,
                expr,
                body,
                ..
            } => {
                if let Some(k) = key {
                    self.expr(k);
                }
                if let Some(v) = value {
                    self.expr(v);
                }
                self.expr(expr);
                self.stmt(body);
            }
            StmtKind::Return(exprs) => {
                for e in exprs {
                    self.expr(e);
                }
            }
            StmtKind::Send { chan, value } => {
                self.expr(chan);
                self.expr(value);
            }
            StmtKind::Labeled { stmt, .. } => self.stmt(stmt),
            StmtKind::Branch { .. } => {}
            StmtKind::Switch { init, cond, cases } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                for case in cases {
                    for c in &case.conds {
                        self.expr(c);
                    }
                    for s in &case.body {
                        self.stmt(s);
                    }
                }
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                cases,
            } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.stmt(assign);
                for case in cases {
                    for s in &case.body {
                        self.stmt(s);
                    }
                }
            }
            StmtKind::Select { cases } => {
                for case in cases {
                    if let Some(stmt) = &case.stmt {
                        self.stmt(stmt);
                    }
                    for s in &case.body {
                        self.stmt(s);
                    }
                }
            }
            StmtKind::TypeDecl { .. } => {}
            StmtKind::MethodikDecl { methods, .. } => {
                for m in methods {
                    self.expr(m);
                }
            }
            StmtKind::Import(decl) => self.import_paths.push(decl.path.clone()),
            StmtKind::ImportSet(decls) => {
                for d in decls {
                    self.import_paths.push(d.path.clone());
                }
            }
        }
    }

    fn expr(&mut self, e: &ebb_parser::Expr) {
        match &e.kind {
            ExprKind::Ident(name) => match name.as_str() {
                "print" => self.uses_print = true,
                "printf" => self.uses_printf = true,
                "errorf" => self.uses_errorf = true,
                _ => {}
            },
            ExprKind::Basic(_) | ExprKind::Type(_) => {}
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Unary { expr, .. } => self.expr(expr),
            ExprKind::Call { func, args, .. } => {
                self.expr(func);
                for a in args {
                    self.expr(a);
                }
            }
            ExprKind::Selector { left, .. } => self.expr(left),
            ExprKind::Index { left, indicies } => {
                self.expr(left);
                for i in indicies {
                    self.expr(i);
                }
            }
            ExprKind::Slice { low, high } => {
                if let Some(low) = low {
                    self.expr(low);
                }
                if let Some(high) = high {
                    self.expr(high);
                }
            }
            ExprKind::TypeAssert { left, .. } => self.expr(left),
            ExprKind::FuncLiteral(lit) => {
                if let Some(body) = &lit.body {
                    for s in body {
                        self.stmt(s);
                    }
                }
            }
            ExprKind::CompLiteral { keys, elements, .. } => {
                for e in keys.iter().chain(elements) {
                    self.expr(e);
                }
            }
            ExprKind::MapLiteral { keys, values, .. } => {
                for e in keys.iter().chain(values) {
                    self.expr(e);
                }
            }
            ExprKind::SliceLiteral { elems, .. } => {
                for e in elems {
                    self.expr(e);
                }
            }
            ExprKind::Shell(_) => self.uses_shell = true,
        }
    }
}

pub(crate) fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Make a path segment usable inside a synthesised Go identifier.
pub(crate) fn sanitize_ident(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
