//! The type checker and resolver.
//!
//! `Checker::check` loads a file, runs the scanner and parser to
//! exhaustion, then makes two passes over the top-level statements:
//! declarations first (imports, types, methodiks, typed vars and
//! consts), then every statement body in source order. Each expression
//! node gets an entry in the type-table; statements record the empty
//! tuple. After checking, no `Unresolved` type remains in the tree.

mod exprs;
pub mod loader;
pub mod scope;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::expr::FuncLiteral;
use crate::ast::stmt::{ConstDecl, ImportDecl, VarDecl};
use crate::ast::types::{Basic, FuncSig};
use crate::ast::{Expr, ExprKind, NodeId, Stmt, StmtKind, Type};
use crate::error::{EbbError, Result};
use crate::lexer::token::{Literal, Pos};
use crate::lexer::Scanner;
use crate::parser::Parser;
use loader::{GoPackage, ObjKind, PackageLoader};
use scope::{BindKind, Binding, ScopeStack};

/// A checked package: the syntax tree, its type-table, and the ordered
/// exported-symbol table.
#[derive(Debug)]
pub struct Package {
    pub path: PathBuf,
    pub syntax: Vec<Stmt>,
    pub exported: Vec<ExportedObj>,
    pub types: IndexMap<NodeId, Type>,
}

#[derive(Debug, Clone)]
pub struct ExportedObj {
    pub name: String,
    pub kind: ObjKind,
    pub ty: Type,
    pub decl: Option<ExportDecl>,
}

#[derive(Debug, Clone)]
pub enum ExportDecl {
    /// Underlying type of an exported type declaration.
    Underlying(Type),
    /// Constant value of an exported const.
    Value(Literal),
}

/// Definition of a declared named type.
#[derive(Debug, Clone)]
pub struct NamedDef {
    pub underlying: Type,
    pub methods: Vec<(String, FuncSig)>,
    pub is_methodik: bool,
    pub pointer_receiver: bool,
}

/// Context a checked expression appears in. Drives untyped-constant
/// commitment and error elision.
#[derive(Debug, Clone)]
pub(crate) enum Want {
    /// No constraint; untyped constants stay untyped.
    Any,
    /// Exactly one value of no particular type.
    Single,
    /// One value assignable to the given type.
    Ty(Type),
    /// A tuple of this many values (n >= 2).
    Arity(usize),
    /// Expression-statement position; results are discarded.
    Stmt,
}

pub struct Checker<'l> {
    loader: &'l dyn PackageLoader,
    pub(crate) types: IndexMap<NodeId, Type>,
    pub(crate) scopes: ScopeStack,
    universe: HashMap<String, Binding>,
    pub(crate) package_decls: IndexMap<String, Binding>,
    pub(crate) named: IndexMap<String, NamedDef>,
    pub(crate) imports: HashMap<String, Rc<GoPackage>>,
    pub(crate) pkg_by_path: HashMap<String, Rc<GoPackage>>,
    pub(crate) results: Vec<Vec<Type>>,
}

impl<'l> Checker<'l> {
    pub fn new(loader: &'l dyn PackageLoader) -> Checker<'l> {
        Checker {
            loader,
            types: IndexMap::new(),
            scopes: ScopeStack::new(),
            universe: universe(),
            package_decls: IndexMap::new(),
            named: IndexMap::new(),
            imports: HashMap::new(),
            pkg_by_path: HashMap::new(),
            results: Vec::new(),
        }
    }

    /// Check the file at `path`.
    pub fn check(&mut self, path: &Path) -> Result<Package> {
        let src = std::fs::read(path)
            .map_err(|e| EbbError::Load(format!("{}: {}", path.display(), e)))?;
        self.check_source(path.to_path_buf(), src)
    }

    pub fn check_source(&mut self, path: PathBuf, src: impl Into<Vec<u8>>) -> Result<Package> {
        let mut parser = Parser::new(Scanner::from_bytes(src))?;
        let mut stmts = parser.parse_all()?;

        self.declare_pass(&mut stmts)?;
        for s in &mut stmts {
            self.stmt(s)?;
        }

        let exported = self.exported_objects();
        Ok(Package {
            path,
            syntax: stmts,
            exported,
            types: std::mem::take(&mut self.types),
        })
    }

    // ----- pass 1: declarations -----

    fn declare_pass(&mut self, stmts: &mut [Stmt]) -> Result<()> {
        // Register type names first so declarations can refer to each
        // other (including themselves, through the named indirection).
        for s in stmts.iter() {
            match &s.kind {
                StmtKind::TypeDecl { name, .. } | StmtKind::MethodikDecl { name, .. } => {
                    self.named.insert(
                        name.clone(),
                        NamedDef {
                            underlying: Type::unit(),
                            methods: Vec::new(),
                            is_methodik: false,
                            pointer_receiver: false,
                        },
                    );
                }
                _ => {}
            }
        }

        for s in stmts.iter_mut() {
            let pos = s.pos;
            match &mut s.kind {
                StmtKind::Import(decl) => self.bind_import(decl, pos)?,
                StmtKind::ImportSet(decls) => {
                    for decl in decls {
                        self.bind_import(decl, pos)?;
                    }
                }
                StmtKind::TypeDecl { name, ty } => {
                    let resolved = self.resolve(ty, pos)?;
                    *ty = resolved.clone();
                    if let Some(def) = self.named.get_mut(name.as_str()) {
                        def.underlying = resolved;
                    }
                    let named_ty = Type::Named {
                        package: String::new(),
                        name: name.clone(),
                    };
                    self.package_decls
                        .insert(name.clone(), Binding::type_name(named_ty));
                }
                StmtKind::MethodikDecl { name, ty, .. } => {
                    if let Type::Methodik {
                        underlying,
                        methods,
                        pointer_receiver,
                        ..
                    } = ty
                    {
                        let resolved = self.resolve(underlying, pos)?;
                        **underlying = resolved.clone();
                        let mut sigs = Vec::new();
                        for (mname, sig) in methods.iter_mut() {
                            let rsig = self.resolve_sig(sig, pos)?;
                            *sig = rsig.clone();
                            sigs.push((mname.clone(), rsig));
                        }
                        if let Some(def) = self.named.get_mut(name.as_str()) {
                            def.underlying = resolved;
                            def.methods = sigs;
                            def.is_methodik = true;
                            def.pointer_receiver = *pointer_receiver;
                        }
                    }
                    let named_ty = Type::Named {
                        package: String::new(),
                        name: name.clone(),
                    };
                    self.package_decls
                        .insert(name.clone(), Binding::type_name(named_ty));
                }
                StmtKind::Var(decl) => self.declare_var_names(decl, pos)?,
                StmtKind::VarSet(decls) => {
                    for decl in decls.iter_mut() {
                        self.declare_var_names(decl, pos)?;
                    }
                }
                StmtKind::Const(decl) => self.declare_const_names(decl, pos)?,
                StmtKind::ConstSet(decls) => {
                    for decl in decls.iter_mut() {
                        self.declare_const_names(decl, pos)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn bind_import(&mut self, decl: &ImportDecl, pos: Pos) -> Result<()> {
        let pkg = self
            .loader
            .load(&decl.path)
            .map_err(|e| EbbError::typecheck(e, pos))?;
        let name = decl
            .name
            .clone()
            .unwrap_or_else(|| base_name(&decl.path).to_string());
        self.pkg_by_path.insert(decl.path.clone(), pkg.clone());
        self.imports.insert(name.clone(), pkg);
        self.package_decls.insert(
            name,
            Binding {
                kind: BindKind::Package,
                ty: Type::Package(decl.path.clone()),
                value: None,
            },
        );
        Ok(())
    }

    fn declare_var_names(&mut self, decl: &mut VarDecl, pos: Pos) -> Result<()> {
        if let Some(ty) = &mut decl.ty {
            let resolved = self.resolve(ty, pos)?;
            *ty = resolved.clone();
            for name in &decl.names {
                self.package_decls
                    .insert(name.clone(), Binding::var(resolved.clone()));
            }
        }
        Ok(())
    }

    fn declare_const_names(&mut self, decl: &mut ConstDecl, pos: Pos) -> Result<()> {
        if let Some(ty) = &mut decl.ty {
            let resolved = self.resolve(ty, pos)?;
            *ty = resolved.clone();
            for name in &decl.names {
                self.package_decls
                    .insert(name.clone(), Binding::constant(resolved.clone(), None));
            }
        }
        Ok(())
    }

    fn exported_objects(&self) -> Vec<ExportedObj> {
        let mut out = Vec::new();
        for (name, binding) in &self.package_decls {
            if !is_exported(name) {
                continue;
            }
            match binding.kind {
                BindKind::TypeName => {
                    let underlying = self
                        .named
                        .get(name.as_str())
                        .map(|def| def.underlying.clone())
                        .unwrap_or_else(Type::unit);
                    out.push(ExportedObj {
                        name: name.clone(),
                        kind: ObjKind::Type,
                        ty: binding.ty.clone(),
                        decl: Some(ExportDecl::Underlying(underlying)),
                    });
                }
                BindKind::Var => out.push(ExportedObj {
                    name: name.clone(),
                    kind: ObjKind::Var,
                    ty: binding.ty.clone(),
                    decl: None,
                }),
                BindKind::Const => out.push(ExportedObj {
                    name: name.clone(),
                    kind: ObjKind::Const,
                    ty: binding.ty.clone(),
                    decl: binding.value.clone().map(ExportDecl::Value),
                }),
                BindKind::Package | BindKind::Builtin => {}
            }
        }
        out
    }

    // ----- pass 2: statements -----

    pub(crate) fn stmt(&mut self, s: &mut Stmt) -> Result<()> {
        let pos = s.pos;
        let id = s.id;
        match &mut s.kind {
            StmtKind::Simple(e) => {
                self.expr(e, &Want::Stmt)?;
            }
            StmtKind::Assign { decl, left, right } => {
                self.assign(*decl, left, right, pos)?;
            }
            StmtKind::Const(decl) => self.const_decl(decl, pos)?,
            StmtKind::ConstSet(decls) => {
                for decl in decls {
                    self.const_decl(decl, pos)?;
                }
            }
            StmtKind::Var(decl) => self.var_decl(decl, pos)?,
            StmtKind::VarSet(decls) => {
                for decl in decls {
                    self.var_decl(decl, pos)?;
                }
            }
            StmtKind::Block(stmts) => {
                self.scopes.push();
                for s in stmts {
                    self.stmt(s)?;
                }
                self.scopes.pop();
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                self.scopes.push();
                if let Some(init) = init {
                    self.stmt(init)?;
                }
                let ct = self.expr(cond, &Want::Single)?;
                if !is_bool(&self.base_type(&ct)) {
                    return Err(EbbError::typecheck(
                        format!("non-bool condition {}", ct),
                        cond.pos,
                    ));
                }
                self.stmt(body)?;
                if let Some(els) = els {
                    self.stmt(els)?;
                }
                self.scopes.pop();
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.scopes.push();
                if let Some(init) = init {
                    self.stmt(init)?;
                }
                if let Some(cond) = cond {
                    let ct = self.expr(cond, &Want::Single)?;
                    if !is_bool(&self.base_type(&ct)) {
                        return Err(EbbError::typecheck(
                            format!("non-bool loop condition {}", ct),
                            cond.pos,
                        ));
                    }
                }
                if let Some(post) = post {
                    self.stmt(post)?;
                }
                self.stmt(body)?;
                self.scopes.pop();
            }
            StmtKind::Range {
                key,
                value,
                decl,
                expr,
                body,
            } => {
                self.scopes.push();
                let t = self.expr(expr, &Want::Single)?;
                let (kt, vt) = self.range_types(&t, expr.pos)?;
                if *decl {
                    if let Some(k) = key {
                        self.bind_ident(k, kt.clone())?;
                    }
                    if let Some(v) = value {
                        let vt = vt.clone().ok_or_else(|| {
                            EbbError::typecheck("range source has no second value", expr.pos)
                        })?;
                        self.bind_ident(v, vt)?;
                    }
                } else {
                    if let Some(k) = key {
                        let lt = self.expr(k, &Want::Any)?;
                        self.must_assignable(&lt, &kt, k.pos)?;
                    }
                    if let (Some(v), Some(vt)) = (value.as_mut(), vt.clone()) {
                        let lt = self.expr(v, &Want::Any)?;
                        self.must_assignable(&lt, &vt, v.pos)?;
                    }
                }
                self.stmt(body)?;
                self.scopes.pop();
            }
            StmtKind::Return(exprs) => self.return_stmt(exprs, pos)?,
            StmtKind::Go(call) => {
                self.expr(call, &Want::Stmt)?;
            }
            StmtKind::Send { chan, value } => {
                let ct = self.expr(chan, &Want::Single)?;
                let elem = match self.base_type(&ct) {
                    Type::Chan { elem, .. } => *elem,
                    other => {
                        return Err(EbbError::typecheck(
                            format!("cannot send to {}", other),
                            chan.pos,
                        ))
                    }
                };
                self.expr(value, &Want::Ty(elem))?;
            }
            StmtKind::Labeled { stmt, .. } => self.stmt(stmt)?,
            StmtKind::Branch { .. } => {}
            StmtKind::Switch { init, cond, cases } => {
                self.scopes.push();
                if let Some(init) = init {
                    self.stmt(init)?;
                }
                let ct = match cond {
                    Some(cond) => Some(self.expr(cond, &Want::Single)?),
                    None => None,
                };
                for case in cases {
                    self.scopes.push();
                    for c in &mut case.conds {
                        match &ct {
                            Some(t) if !t.is_untyped() => {
                                self.expr(c, &Want::Ty(t.clone()))?;
                            }
                            Some(_) => {
                                self.expr(c, &Want::Single)?;
                            }
                            None => {
                                let bt = self.expr(c, &Want::Single)?;
                                if !is_bool(&self.base_type(&bt)) {
                                    return Err(EbbError::typecheck(
                                        format!("non-bool case condition {}", bt),
                                        c.pos,
                                    ));
                                }
                            }
                        }
                    }
                    for s in &mut case.body {
                        self.stmt(s)?;
                    }
                    self.scopes.pop();
                }
                self.scopes.pop();
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                cases,
            } => {
                self.scopes.push();
                if let Some(init) = init {
                    self.stmt(init)?;
                }
                let (binder, operand_ty) = self.type_switch_guard(assign)?;
                for case in cases {
                    self.scopes.push();
                    for t in &mut case.types {
                        *t = self.resolve(t, pos)?;
                    }
                    if let Some(name) = &binder {
                        let bt = if case.types.len() == 1 && !case.default {
                            case.types[0].clone()
                        } else {
                            operand_ty.clone()
                        };
                        self.scopes.declare(name, Binding::var(bt));
                    }
                    for s in &mut case.body {
                        self.stmt(s)?;
                    }
                    self.scopes.pop();
                }
                self.scopes.pop();
            }
            StmtKind::Select { cases } => {
                for case in cases {
                    self.scopes.push();
                    if let Some(stmt) = &mut case.stmt {
                        self.stmt(stmt)?;
                    }
                    for s in &mut case.body {
                        self.stmt(s)?;
                    }
                    self.scopes.pop();
                }
            }
            StmtKind::TypeDecl { name, ty } => {
                if self.scopes.depth() > 0 {
                    // local type declaration
                    let resolved = self.resolve(ty, pos)?;
                    *ty = resolved.clone();
                    self.named.insert(
                        name.clone(),
                        NamedDef {
                            underlying: resolved,
                            methods: Vec::new(),
                            is_methodik: false,
                            pointer_receiver: false,
                        },
                    );
                    let named_ty = Type::Named {
                        package: String::new(),
                        name: name.clone(),
                    };
                    self.scopes.declare(name, Binding::type_name(named_ty));
                }
            }
            StmtKind::MethodikDecl { name, methods, .. } => {
                self.methodik_bodies(name, methods)?;
            }
            StmtKind::Import(_) | StmtKind::ImportSet(_) => {
                if self.scopes.depth() > 0 {
                    return Err(EbbError::typecheck(
                        "import is only allowed at the top level",
                        pos,
                    ));
                }
            }
        }
        self.types.entry(id).or_insert_with(Type::unit);
        Ok(())
    }

    fn methodik_bodies(&mut self, name: &str, methods: &mut [Expr]) -> Result<()> {
        let def = self.named.get(name).cloned().ok_or_else(|| {
            EbbError::typecheck(format!("undefined methodik {}", name), Pos::default())
        })?;
        let recv_ty = {
            let named = Type::Named {
                package: String::new(),
                name: name.to_string(),
            };
            if def.pointer_receiver {
                Type::Pointer(Box::new(named))
            } else {
                named
            }
        };
        for m in methods {
            let pos = m.pos;
            let id = m.id;
            if let ExprKind::FuncLiteral(lit) = &mut m.kind {
                let receiver = lit.receiver_name.clone();
                self.scopes.push();
                self.scopes.declare(&receiver, Binding::var(recv_ty.clone()));
                let ty = self.func_literal_body(lit, pos)?;
                self.scopes.pop();
                self.types.insert(id, ty);
            }
        }
        Ok(())
    }

    /// Resolve a function literal's signature, bind its parameters and
    /// named results, and check its body.
    pub(crate) fn func_literal_body(
        &mut self,
        lit: &mut FuncLiteral,
        pos: Pos,
    ) -> Result<Type> {
        lit.sig = self.resolve_sig(&lit.sig, pos)?;
        self.scopes.push();
        for (i, name) in lit.param_names.iter().enumerate() {
            if name.is_empty() || name == "_" {
                continue;
            }
            if let Some(ty) = lit.sig.params.get(i) {
                let bound = match ty {
                    Type::Ellipsis(elem) => Type::Slice(elem.clone()),
                    other => other.clone(),
                };
                self.scopes.declare(name, Binding::var(bound));
            }
        }
        for (i, name) in lit.result_names.iter().enumerate() {
            if name.is_empty() || name == "_" {
                continue;
            }
            if let Some(ty) = lit.sig.results.get(i) {
                self.scopes.declare(name, Binding::var(ty.clone()));
            }
        }
        self.results.push(lit.sig.results.clone());
        if let Some(body) = &mut lit.body {
            for s in body {
                self.stmt(s)?;
            }
        }
        self.results.pop();
        self.scopes.pop();
        Ok(Type::Func(lit.sig.clone()))
    }

    fn type_switch_guard(&mut self, assign: &mut Stmt) -> Result<(Option<String>, Type)> {
        let id = assign.id;
        let result = match &mut assign.kind {
            StmtKind::Simple(e) => {
                let t = self.type_assert_operand(e)?;
                (None, t)
            }
            StmtKind::Assign { left, right, .. } => {
                let name = match left.first().map(|e| &e.kind) {
                    Some(ExprKind::Ident(name)) => name.clone(),
                    _ => {
                        return Err(EbbError::typecheck(
                            "type switch binding must be an identifier",
                            assign.pos,
                        ))
                    }
                };
                let e = right.first_mut().ok_or_else(|| {
                    EbbError::typecheck("missing type switch guard", assign.pos)
                })?;
                let t = self.type_assert_operand(e)?;
                if let Some(l) = left.first() {
                    self.types.insert(l.id, t.clone());
                }
                (Some(name), t)
            }
            _ => {
                return Err(EbbError::typecheck(
                    "bad type switch guard",
                    assign.pos,
                ))
            }
        };
        self.types.entry(id).or_insert_with(Type::unit);
        Ok(result)
    }

    /// Check the `x` of `x.(type)` in a type-switch guard, recording
    /// the assertion node with the operand's type.
    fn type_assert_operand(&mut self, e: &mut Expr) -> Result<Type> {
        let id = e.id;
        match &mut e.kind {
            ExprKind::TypeAssert { left, ty: None } => {
                let t = self.expr(left, &Want::Single)?;
                self.types.insert(id, t.clone());
                Ok(t)
            }
            _ => Err(EbbError::typecheck(
                "expected type switch guard",
                e.pos,
            )),
        }
    }

    fn return_stmt(&mut self, exprs: &mut [Expr], pos: Pos) -> Result<()> {
        let results = self.results.last().cloned().unwrap_or_default();
        if exprs.is_empty() {
            if results.is_empty() {
                return Ok(());
            }
            return Err(EbbError::typecheck("not enough return values", pos));
        }
        if exprs.len() == results.len() {
            for (e, r) in exprs.iter_mut().zip(results.iter()) {
                self.expr(e, &Want::Ty(r.clone()))?;
            }
            return Ok(());
        }
        if exprs.len() == 1 && results.len() > 1 {
            let t = self.expr(&mut exprs[0], &Want::Arity(results.len()))?;
            match t {
                Type::Tuple(elems) if elems.len() == results.len() => {
                    for (e, r) in elems.iter().zip(results.iter()) {
                        self.must_assignable(r, e, pos)?;
                    }
                    return Ok(());
                }
                _ => {
                    return Err(EbbError::typecheck("wrong number of return values", pos))
                }
            }
        }
        Err(EbbError::typecheck("wrong number of return values", pos))
    }

    fn const_decl(&mut self, decl: &mut ConstDecl, pos: Pos) -> Result<()> {
        let declared = match &mut decl.ty {
            Some(ty) => {
                let r = self.resolve(ty, pos)?;
                *ty = r.clone();
                Some(r)
            }
            None => None,
        };
        let mut bound = Vec::new();
        for (i, name) in decl.names.iter().enumerate() {
            let (ty, value) = match decl.values.get_mut(i) {
                Some(v) => {
                    let want = match &declared {
                        Some(t) => Want::Ty(t.clone()),
                        None => Want::Single,
                    };
                    let t = self.expr(v, &want)?;
                    let value = match &v.kind {
                        ExprKind::Basic(lit) => Some(lit.clone()),
                        _ => None,
                    };
                    (declared.clone().unwrap_or_else(|| default_type(t)), value)
                }
                None => match &declared {
                    Some(t) => (t.clone(), None),
                    None => {
                        return Err(EbbError::typecheck(
                            format!("missing value for const {}", name),
                            pos,
                        ))
                    }
                },
            };
            bound.push((name.clone(), Binding::constant(ty, value)));
        }
        for (name, binding) in bound {
            if !self.scopes.declare(&name, binding.clone()) {
                self.package_decls.insert(name, binding);
            }
        }
        Ok(())
    }

    fn var_decl(&mut self, decl: &mut VarDecl, pos: Pos) -> Result<()> {
        let declared = match &mut decl.ty {
            Some(ty) => {
                let r = self.resolve(ty, pos)?;
                *ty = r.clone();
                Some(r)
            }
            None => None,
        };
        let mut bound = Vec::new();
        for (i, name) in decl.names.iter().enumerate() {
            let ty = match decl.values.get_mut(i) {
                Some(v) => {
                    let want = match &declared {
                        Some(t) => Want::Ty(t.clone()),
                        None => Want::Single,
                    };
                    let t = self.expr(v, &want)?;
                    declared.clone().unwrap_or_else(|| default_type(t))
                }
                None => declared.clone().ok_or_else(|| {
                    EbbError::typecheck(format!("missing type for var {}", name), pos)
                })?,
            };
            bound.push((name.clone(), Binding::var(ty)));
        }
        for (name, binding) in bound {
            if !self.scopes.declare(&name, binding.clone()) {
                self.package_decls.insert(name, binding);
            }
        }
        Ok(())
    }

    fn assign(
        &mut self,
        decl: bool,
        left: &mut [Expr],
        right: &mut [Expr],
        pos: Pos,
    ) -> Result<()> {
        if decl {
            if right.len() == left.len() {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let t = self.expr(r, &Want::Single)?;
                    self.bind_ident(l, default_type(t))?;
                }
                return Ok(());
            }
            if right.len() == 1 {
                let n = left.len();
                let t = self.expr(&mut right[0], &Want::Arity(n))?;
                let parts = self.spread(t, n, &right[0], pos)?;
                for (l, t) in left.iter_mut().zip(parts.into_iter()) {
                    self.bind_ident(l, default_type(t))?;
                }
                return Ok(());
            }
            return Err(EbbError::typecheck("assignment count mismatch", pos));
        }

        // plain assignment to existing targets
        if right.len() == left.len() {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                let lt = self.lvalue(l)?;
                match lt {
                    Some(t) => {
                        self.expr(r, &Want::Ty(t))?;
                    }
                    None => {
                        self.expr(r, &Want::Single)?;
                    }
                }
            }
            return Ok(());
        }
        if right.len() == 1 {
            let n = left.len();
            let t = self.expr(&mut right[0], &Want::Arity(n))?;
            let parts = self.spread(t, n, &right[0], pos)?;
            for (l, t) in left.iter_mut().zip(parts.into_iter()) {
                let lt = self.lvalue(l)?;
                if let Some(lt) = lt {
                    self.must_assignable(&lt, &t, l.pos)?;
                }
            }
            return Ok(());
        }
        Err(EbbError::typecheck("assignment count mismatch", pos))
    }

    /// Split a multi-value result across `n` targets, applying the
    /// comma-ok rule for channel receives, map indexes and assertions.
    fn spread(&self, t: Type, n: usize, src: &Expr, pos: Pos) -> Result<Vec<Type>> {
        match t {
            Type::Tuple(elems) if elems.len() == n => Ok(elems),
            other if n == 2 && comma_ok(src) => {
                Ok(vec![other, Type::Basic(Basic::Bool)])
            }
            other => Err(EbbError::typecheck(
                format!("cannot spread {} across {} variables", other, n),
                pos,
            )),
        }
    }

    /// Check an assignment target and return its type; blank targets
    /// return `None`.
    fn lvalue(&mut self, l: &mut Expr) -> Result<Option<Type>> {
        if let ExprKind::Ident(name) = &l.kind {
            if name == "_" {
                self.types.insert(l.id, Type::unit());
                return Ok(None);
            }
        }
        Ok(Some(self.expr(l, &Want::Any)?))
    }

    fn bind_ident(&mut self, l: &mut Expr, ty: Type) -> Result<()> {
        let name = match &l.kind {
            ExprKind::Ident(name) => name.clone(),
            _ => {
                return Err(EbbError::typecheck(
                    "left side of := must be an identifier",
                    l.pos,
                ))
            }
        };
        self.types.insert(l.id, ty.clone());
        if name == "_" {
            return Ok(());
        }
        if !self.scopes.declare(&name, Binding::var(ty.clone())) {
            self.package_decls.insert(name, Binding::var(ty));
        }
        Ok(())
    }

    fn range_types(&self, t: &Type, pos: Pos) -> Result<(Type, Option<Type>)> {
        match self.base_type(t) {
            Type::Slice(elem) => Ok((Type::Basic(Basic::Int), Some(*elem))),
            Type::Array { elem, .. } => Ok((Type::Basic(Basic::Int), Some(*elem))),
            Type::Map { key, value } => Ok((*key, Some(*value))),
            Type::Chan { elem, .. } => Ok((*elem, None)),
            Type::Basic(Basic::String) => {
                Ok((Type::Basic(Basic::Int), Some(Type::Basic(Basic::Rune))))
            }
            other => Err(EbbError::typecheck(
                format!("cannot range over {}", other),
                pos,
            )),
        }
    }

    // ----- shared helpers -----

    pub(crate) fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .lookup(name)
            .or_else(|| self.package_decls.get(name))
            .or_else(|| self.universe.get(name))
    }

    pub(crate) fn is_builtin(&self, name: &str) -> bool {
        self.scopes.lookup(name).is_none()
            && self.package_decls.get(name).is_none()
            && matches!(
                self.universe.get(name),
                Some(Binding {
                    kind: BindKind::Builtin,
                    ..
                })
            )
    }

    /// The underlying type of a locally declared named type; other
    /// types come back unchanged.
    pub(crate) fn base_type(&self, t: &Type) -> Type {
        match t {
            Type::Named { package, name } if package.is_empty() => self
                .named
                .get(name.as_str())
                .map(|def| def.underlying.clone())
                .unwrap_or_else(|| t.clone()),
            Type::Alias { ty, .. } => self.base_type(ty),
            _ => t.clone(),
        }
    }

    pub(crate) fn must_assignable(&self, target: &Type, value: &Type, pos: Pos) -> Result<()> {
        if self.assignable(target, value) {
            return Ok(());
        }
        Err(EbbError::typecheck(
            format!("cannot use {} as {}", value, target),
            pos,
        ))
    }

    pub(crate) fn assignable(&self, target: &Type, value: &Type) -> bool {
        if target == value {
            return true;
        }
        if let Type::Ellipsis(elem) = target {
            return self.assignable(elem, value);
        }
        if matches!(target, Type::Interface(methods) if methods.is_empty()) {
            return true;
        }
        let base = self.base_type(target);
        if value.is_untyped() {
            let b = match value {
                Type::Basic(b) => *b,
                _ => return false,
            };
            return match b {
                Basic::UntypedInteger => is_numeric(&base),
                Basic::UntypedFloat => is_float(&base) || is_complex(&base),
                Basic::UntypedComplex => is_complex(&base),
                Basic::UntypedBool => matches!(base, Type::Basic(Basic::Bool)),
                Basic::UntypedString => matches!(base, Type::Basic(Basic::String)),
                Basic::UntypedRune => is_integer(&base),
                Basic::UntypedNil => matches!(
                    base,
                    Type::Pointer(_)
                        | Type::Slice(_)
                        | Type::Map { .. }
                        | Type::Chan { .. }
                        | Type::Func(_)
                        | Type::Interface(_)
                        | Type::Error
                ),
                _ => false,
            };
        }
        // a named value is assignable where its underlying type is
        if base == self.base_type(value) && !matches!(base, Type::Unresolved { .. }) {
            return true;
        }
        false
    }

    pub(crate) fn resolve_sig(&self, sig: &FuncSig, pos: Pos) -> Result<FuncSig> {
        let mut out = FuncSig::default();
        for p in &sig.params {
            out.params.push(self.resolve(p, pos)?);
        }
        for r in &sig.results {
            out.results.push(self.resolve(r, pos)?);
        }
        Ok(out)
    }

    /// Replace every `Unresolved` variant reachable from `t`.
    pub(crate) fn resolve(&self, t: &Type, pos: Pos) -> Result<Type> {
        let ty = match t {
            Type::Unresolved {
                package: None,
                name,
            } => {
                if let Some(b) = Basic::from_name(name) {
                    Type::Basic(b)
                } else if name == "error" {
                    Type::Error
                } else if self.named.contains_key(name.as_str()) {
                    Type::Named {
                        package: String::new(),
                        name: name.clone(),
                    }
                } else if let Some(binding) = self.scopes.lookup(name) {
                    if binding.kind == BindKind::TypeName {
                        binding.ty.clone()
                    } else {
                        return Err(EbbError::typecheck(
                            format!("{} is not a type", name),
                            pos,
                        ));
                    }
                } else {
                    return Err(EbbError::typecheck(
                        format!("undefined type {}", name),
                        pos,
                    ));
                }
            }
            Type::Unresolved {
                package: Some(pkg),
                name,
            } => {
                let loaded = self.imports.get(pkg).ok_or_else(|| {
                    EbbError::typecheck(format!("undefined package {}", pkg), pos)
                })?;
                let obj = loaded.exported.get(name).ok_or_else(|| {
                    EbbError::typecheck(format!("undefined: {}.{}", pkg, name), pos)
                })?;
                if obj.kind != ObjKind::Type {
                    return Err(EbbError::typecheck(
                        format!("{}.{} is not a type", pkg, name),
                        pos,
                    ));
                }
                Type::Named {
                    package: loaded.path.clone(),
                    name: name.clone(),
                }
            }
            Type::Pointer(elem) => Type::Pointer(Box::new(self.resolve(elem, pos)?)),
            Type::Array {
                len,
                ellipsis,
                elem,
            } => Type::Array {
                len: *len,
                ellipsis: *ellipsis,
                elem: Box::new(self.resolve(elem, pos)?),
            },
            Type::Slice(elem) => Type::Slice(Box::new(self.resolve(elem, pos)?)),
            Type::Interface(methods) => {
                let mut out = Vec::new();
                for (name, sig) in methods {
                    out.push((name.clone(), self.resolve_sig(sig, pos)?));
                }
                Type::Interface(out)
            }
            Type::Map { key, value } => Type::Map {
                key: Box::new(self.resolve(key, pos)?),
                value: Box::new(self.resolve(value, pos)?),
            },
            Type::Chan { dir, elem } => Type::Chan {
                dir: *dir,
                elem: Box::new(self.resolve(elem, pos)?),
            },
            Type::Func(sig) => Type::Func(self.resolve_sig(sig, pos)?),
            Type::Alias { name, ty } => Type::Alias {
                name: name.clone(),
                ty: Box::new(self.resolve(ty, pos)?),
            },
            Type::Tuple(elems) => {
                let mut out = Vec::new();
                for e in elems {
                    out.push(self.resolve(e, pos)?);
                }
                Type::Tuple(out)
            }
            Type::Ellipsis(elem) => Type::Ellipsis(Box::new(self.resolve(elem, pos)?)),
            Type::Methodik {
                name,
                underlying,
                methods,
                pointer_receiver,
            } => {
                let mut sigs = Vec::new();
                for (mname, sig) in methods {
                    sigs.push((mname.clone(), self.resolve_sig(sig, pos)?));
                }
                Type::Methodik {
                    name: name.clone(),
                    underlying: Box::new(self.resolve(underlying, pos)?),
                    methods: sigs,
                    pointer_receiver: *pointer_receiver,
                }
            }
            Type::Struct(fields) => {
                let mut out = Vec::new();
                for (name, ty) in fields {
                    out.push((name.clone(), self.resolve(ty, pos)?));
                }
                Type::Struct(out)
            }
            Type::Table(elem) => Type::Table(Box::new(self.resolve(elem, pos)?)),
            other => other.clone(),
        };
        Ok(ty)
    }
}

pub(crate) fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub(crate) fn is_bool(t: &Type) -> bool {
    matches!(t, Type::Basic(Basic::Bool) | Type::Basic(Basic::UntypedBool))
}

pub(crate) fn is_integer(t: &Type) -> bool {
    matches!(
        t,
        Type::Basic(
            Basic::Integer
                | Basic::Int
                | Basic::Int8
                | Basic::Int16
                | Basic::Int32
                | Basic::Int64
                | Basic::Uint
                | Basic::Uint8
                | Basic::Uint16
                | Basic::Uint32
                | Basic::Uint64
                | Basic::Rune
                | Basic::Byte
                | Basic::UntypedInteger
                | Basic::UntypedRune
        )
    )
}

pub(crate) fn is_float(t: &Type) -> bool {
    matches!(
        t,
        Type::Basic(Basic::Float | Basic::Float32 | Basic::Float64 | Basic::UntypedFloat)
    )
}

pub(crate) fn is_complex(t: &Type) -> bool {
    matches!(
        t,
        Type::Basic(
            Basic::Complex | Basic::Complex64 | Basic::Complex128 | Basic::UntypedComplex
        )
    )
}

pub(crate) fn is_numeric(t: &Type) -> bool {
    is_integer(t) || is_float(t) || is_complex(t)
}

/// The committed type of an untyped constant used without a forcing
/// context.
pub(crate) fn default_type(t: Type) -> Type {
    match t {
        Type::Basic(Basic::UntypedInteger) => Type::Basic(Basic::Int),
        Type::Basic(Basic::UntypedFloat) => Type::Basic(Basic::Float64),
        Type::Basic(Basic::UntypedComplex) => Type::Basic(Basic::Complex128),
        Type::Basic(Basic::UntypedBool) => Type::Basic(Basic::Bool),
        Type::Basic(Basic::UntypedString) => Type::Basic(Basic::String),
        Type::Basic(Basic::UntypedRune) => Type::Basic(Basic::Rune),
        other => other,
    }
}

/// Expressions whose two-value assignment form appends a bool.
fn comma_ok(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Unary { op, .. } => *op == crate::lexer::token::TokenKind::ChanOp,
        ExprKind::Index { .. } => true,
        ExprKind::TypeAssert { .. } => true,
        _ => false,
    }
}

fn universe() -> HashMap<String, Binding> {
    let mut u = HashMap::new();
    for b in [
        Basic::Bool,
        Basic::Integer,
        Basic::Int,
        Basic::Int8,
        Basic::Int16,
        Basic::Int32,
        Basic::Int64,
        Basic::Uint,
        Basic::Uint8,
        Basic::Uint16,
        Basic::Uint32,
        Basic::Uint64,
        Basic::Float,
        Basic::Float32,
        Basic::Float64,
        Basic::Complex,
        Basic::Complex64,
        Basic::Complex128,
        Basic::String,
        Basic::Rune,
        Basic::Byte,
    ] {
        u.insert(b.name().to_string(), Binding::type_name(Type::Basic(b)));
    }
    u.insert("error".to_string(), Binding::type_name(Type::Error));
    u.insert(
        "true".to_string(),
        Binding::constant(Type::Basic(Basic::UntypedBool), None),
    );
    u.insert(
        "false".to_string(),
        Binding::constant(Type::Basic(Basic::UntypedBool), None),
    );
    u.insert(
        "nil".to_string(),
        Binding::constant(Type::Basic(Basic::UntypedNil), None),
    );
    for name in [
        "print", "printf", "errorf", "len", "cap", "make", "new", "append", "copy", "delete",
        "panic",
    ] {
        u.insert(
            name.to_string(),
            Binding {
                kind: BindKind::Builtin,
                ty: Type::Func(FuncSig::default()),
                value: None,
            },
        );
    }
    u
}
