//! Expression checking.

use crate::ast::shell::{Shell, ShellCmd, ShellList};
use crate::ast::types::{Basic, FuncSig};
use crate::ast::{Expr, ExprKind, Type};
use crate::error::{EbbError, Result};
use crate::lexer::token::{Literal, Pos, TokenKind};

use super::loader::ObjKind;
use super::scope::BindKind;
use super::{default_type, is_bool, is_integer, is_numeric, Checker, Want};

impl Checker<'_> {
    /// Assign a type to `e`, record it in the type-table, and return
    /// the type the surrounding context sees.
    pub(crate) fn expr(&mut self, e: &mut Expr, want: &Want) -> Result<Type> {
        let pos = e.pos;
        let id = e.id;

        if matches!(e.kind, ExprKind::Call { .. }) {
            return self.call(e, want);
        }

        let ty = match &mut e.kind {
            ExprKind::Ident(name) => {
                let name = name.clone();
                self.ident(&name, pos, want)?
            }
            ExprKind::Basic(lit) => {
                let t = untyped_of(lit);
                self.reconcile(t, want, pos)?
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.binary(op, left, right, pos, want)?
            }
            ExprKind::Unary { op, expr } => {
                let op = *op;
                self.unary(op, expr, pos, want)?
            }
            ExprKind::Selector { left, name } => {
                let name = name.clone();
                let t = self.selector(left, &name, pos)?;
                self.reconcile(t, want, pos)?
            }
            ExprKind::Index { left, indicies } => {
                let t = self.index(left, indicies, pos)?;
                self.reconcile(t, want, pos)?
            }
            ExprKind::Slice { low, high } => {
                if let Some(low) = low {
                    self.expr(low, &Want::Single)?;
                }
                if let Some(high) = high {
                    self.expr(high, &Want::Single)?;
                }
                Type::unit()
            }
            ExprKind::TypeAssert { left, ty } => match ty {
                Some(t) => {
                    self.expr(left, &Want::Single)?;
                    let resolved = self.resolve(t, pos)?;
                    *ty = Some(resolved.clone());
                    resolved
                }
                None => {
                    return Err(EbbError::typecheck(
                        "type assertion .(type) outside type switch",
                        pos,
                    ))
                }
            },
            ExprKind::FuncLiteral(lit) => self.func_literal_body(lit, pos)?,
            ExprKind::CompLiteral { ty, keys, elements } => {
                let resolved = self.resolve(ty, pos)?;
                *ty = resolved.clone();
                self.comp_literal(&resolved, keys, elements, pos)?;
                resolved
            }
            ExprKind::MapLiteral { ty, keys, values } => {
                let resolved = self.resolve(ty, pos)?;
                *ty = resolved.clone();
                if let Type::Map { key, value } = &resolved {
                    for k in keys.iter_mut() {
                        self.expr(k, &Want::Ty((**key).clone()))?;
                    }
                    for v in values.iter_mut() {
                        self.expr(v, &Want::Ty((**value).clone()))?;
                    }
                } else {
                    return Err(EbbError::typecheck(
                        format!("map literal of non-map type {}", resolved),
                        pos,
                    ));
                }
                resolved
            }
            ExprKind::SliceLiteral { ty, elems } => {
                let resolved = self.resolve(ty, pos)?;
                *ty = resolved.clone();
                if let Type::Slice(elem) = &resolved {
                    for e in elems.iter_mut() {
                        self.expr(e, &Want::Ty((**elem).clone()))?;
                    }
                } else {
                    return Err(EbbError::typecheck(
                        format!("slice literal of non-slice type {}", resolved),
                        pos,
                    ));
                }
                resolved
            }
            ExprKind::Shell(sh) => self.shell(sh, want),
            ExprKind::Type(ty) => {
                let resolved = self.resolve(ty, pos)?;
                *ty = resolved.clone();
                resolved
            }
            ExprKind::Call { .. } => unreachable!("handled above"),
        };

        self.types.entry(id).or_insert_with(|| ty.clone());
        Ok(ty)
    }

    fn ident(&mut self, name: &str, pos: Pos, want: &Want) -> Result<Type> {
        let binding = self
            .lookup(name)
            .cloned()
            .ok_or_else(|| EbbError::typecheck(format!("undeclared name {}", name), pos))?;
        match binding.kind {
            BindKind::Var | BindKind::Const => self.reconcile(binding.ty, want, pos),
            BindKind::TypeName | BindKind::Package | BindKind::Builtin => Ok(binding.ty),
        }
    }

    fn binary(
        &mut self,
        op: TokenKind,
        left: &mut Expr,
        right: &mut Expr,
        pos: Pos,
        want: &Want,
    ) -> Result<Type> {
        use TokenKind::*;
        match op {
            LogicalAnd | LogicalOr => {
                let lt = self.expr(left, &Want::Single)?;
                let rt = self.expr(right, &Want::Single)?;
                if !is_bool(&self.base_type(&lt)) || !is_bool(&self.base_type(&rt)) {
                    return Err(EbbError::typecheck(
                        format!("logical operator needs bool operands, got {} and {}", lt, rt),
                        pos,
                    ));
                }
                self.reconcile(crate::ast::Type::Basic(Basic::UntypedBool), want, pos)
            }
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual => {
                let lt = self.expr(left, &Want::Single)?;
                let rt = self.expr(right, &Want::Single)?;
                if !self.comparable(&lt, &rt) {
                    return Err(EbbError::typecheck(
                        format!("cannot compare {} and {}", lt, rt),
                        pos,
                    ));
                }
                self.reconcile(crate::ast::Type::Basic(Basic::UntypedBool), want, pos)
            }
            _ => {
                let lt = self.expr(left, &Want::Any)?;
                let rt = self.expr(right, &Want::Any)?;
                let t = self.arith(op, &lt, &rt, pos)?;
                self.reconcile(t, want, pos)
            }
        }
    }

    fn arith(&self, op: TokenKind, lt: &Type, rt: &Type, pos: Pos) -> Result<Type> {
        // shifts keep the left operand's type
        if matches!(op, TokenKind::TwoLess | TokenKind::TwoGreater) {
            if !is_integer(&self.base_type(lt)) || !is_integer(&self.base_type(rt)) {
                return Err(EbbError::typecheck(
                    format!("shift of {} by {}", lt, rt),
                    pos,
                ));
            }
            return Ok(lt.clone());
        }

        let string_op = op == TokenKind::Add;
        let unified = self.unify(lt, rt).ok_or_else(|| {
            EbbError::typecheck(format!("mismatched types {} and {}", lt, rt), pos)
        })?;
        let base = self.base_type(&unified);
        let ok = match op {
            TokenKind::Add => {
                is_numeric(&base) || matches!(base, Type::Basic(Basic::String | Basic::UntypedString))
            }
            TokenKind::Sub | TokenKind::Mul | TokenKind::Div => is_numeric(&base),
            TokenKind::Rem | TokenKind::Pow | TokenKind::Ref | TokenKind::RefPow
            | TokenKind::Pipe => is_integer(&base),
            _ => false,
        };
        if !ok {
            let verb = if string_op { "add" } else { "combine" };
            return Err(EbbError::typecheck(
                format!("cannot {} {} and {}", verb, lt, rt),
                pos,
            ));
        }
        Ok(unified)
    }

    /// Merge the operand types of an arithmetic expression, letting
    /// untyped constants take the other side's type.
    fn unify(&self, lt: &Type, rt: &Type) -> Option<Type> {
        if lt == rt {
            return Some(lt.clone());
        }
        match (lt.is_untyped(), rt.is_untyped()) {
            (true, false) => self.assignable(rt, lt).then(|| rt.clone()),
            (false, true) => self.assignable(lt, rt).then(|| lt.clone()),
            (true, true) => {
                // widen: complex > float > integer
                let rank = |t: &Type| match t {
                    Type::Basic(Basic::UntypedComplex) => 3,
                    Type::Basic(Basic::UntypedFloat) => 2,
                    Type::Basic(Basic::UntypedInteger) => 1,
                    Type::Basic(Basic::UntypedRune) => 1,
                    _ => 0,
                };
                let (a, b) = (rank(lt), rank(rt));
                if a == 0 || b == 0 {
                    return None;
                }
                Some(if a >= b { lt.clone() } else { rt.clone() })
            }
            (false, false) => None,
        }
    }

    fn comparable(&self, lt: &Type, rt: &Type) -> bool {
        self.unify(lt, rt).is_some()
            || self.assignable(lt, rt)
            || self.assignable(rt, lt)
    }

    fn unary(
        &mut self,
        op: TokenKind,
        inner: &mut Expr,
        pos: Pos,
        want: &Want,
    ) -> Result<Type> {
        match op {
            // parenthesis marker: transparent to the context
            TokenKind::LeftParen => self.expr(inner, want),
            TokenKind::Not => {
                let t = self.expr(inner, &Want::Single)?;
                if !is_bool(&self.base_type(&t)) {
                    return Err(EbbError::typecheck(format!("cannot negate {}", t), pos));
                }
                self.reconcile(Type::Basic(Basic::UntypedBool), want, pos)
            }
            TokenKind::Sub | TokenKind::Add => {
                let t = self.expr(inner, want)?;
                if !is_numeric(&self.base_type(&t)) {
                    return Err(EbbError::typecheck(format!("cannot negate {}", t), pos));
                }
                Ok(t)
            }
            TokenKind::Ref => {
                let t = self.expr(inner, &Want::Single)?;
                Ok(Type::Pointer(Box::new(t)))
            }
            TokenKind::Mul => {
                let t = self.expr(inner, &Want::Single)?;
                match self.base_type(&t) {
                    Type::Pointer(elem) => Ok(*elem),
                    other => Err(EbbError::typecheck(
                        format!("cannot dereference {}", other),
                        pos,
                    )),
                }
            }
            TokenKind::ChanOp => {
                let t = self.expr(inner, &Want::Single)?;
                match self.base_type(&t) {
                    Type::Chan { elem, .. } => Ok(*elem),
                    other => Err(EbbError::typecheck(
                        format!("cannot receive from {}", other),
                        pos,
                    )),
                }
            }
            other => Err(EbbError::typecheck(
                format!("bad unary operator {}", other),
                pos,
            )),
        }
    }

    fn selector(&mut self, left: &mut Expr, name: &str, pos: Pos) -> Result<Type> {
        let lt = self.expr(left, &Want::Any)?;
        if let Type::Package(path) = &lt {
            let pkg = self.pkg_by_path.get(path).cloned().ok_or_else(|| {
                EbbError::typecheck(format!("package {:?} not loaded", path), pos)
            })?;
            let obj = pkg.exported.get(name).ok_or_else(|| {
                EbbError::typecheck(
                    format!("undefined: {}.{}", super::base_name(path), name),
                    pos,
                )
            })?;
            return Ok(obj.ty.clone());
        }
        self.member(&lt, name, pos)
    }

    fn member(&self, t: &Type, name: &str, pos: Pos) -> Result<Type> {
        let t = match t.clone() {
            Type::Pointer(elem) => *elem,
            other => other,
        };
        if let Type::Named { package, name: tyname } = &t {
            if package.is_empty() {
                if let Some(def) = self.named.get(tyname.as_str()) {
                    for (mname, sig) in &def.methods {
                        if mname == name {
                            return Ok(Type::Func(sig.clone()));
                        }
                    }
                    return self.member_of_underlying(&def.underlying, name, pos);
                }
            }
            return Err(EbbError::typecheck(
                format!("unknown field or method {} on {}", name, t),
                pos,
            ));
        }
        self.member_of_underlying(&t, name, pos)
    }

    fn member_of_underlying(&self, t: &Type, name: &str, pos: Pos) -> Result<Type> {
        let t = match t.clone() {
            Type::Pointer(elem) => *elem,
            other => other,
        };
        match &t {
            Type::Struct(fields) => {
                for (fname, fty) in fields {
                    if fname == name {
                        return Ok(fty.clone());
                    }
                }
                Err(EbbError::typecheck(
                    format!("unknown field {} on {}", name, t),
                    pos,
                ))
            }
            Type::Interface(methods) => {
                for (mname, sig) in methods {
                    if mname == name {
                        return Ok(Type::Func(sig.clone()));
                    }
                }
                Err(EbbError::typecheck(
                    format!("unknown method {} on {}", name, t),
                    pos,
                ))
            }
            other => Err(EbbError::typecheck(
                format!("unknown field or method {} on {}", name, other),
                pos,
            )),
        }
    }

    fn index(&mut self, left: &mut Expr, indicies: &mut [Expr], pos: Pos) -> Result<Type> {
        let lt = self.expr(left, &Want::Single)?;
        let base = self.base_type(&lt);
        let slicing = indicies
            .iter()
            .any(|i| matches!(i.kind, ExprKind::Slice { .. }));

        for i in indicies.iter_mut() {
            match &i.kind {
                ExprKind::Slice { .. } => {
                    self.expr(i, &Want::Any)?;
                }
                _ => match &base {
                    Type::Map { key, .. } => {
                        self.expr(i, &Want::Ty((**key).clone()))?;
                    }
                    _ => {
                        self.expr(i, &Want::Single)?;
                    }
                },
            }
        }

        match base {
            Type::Slice(elem) => Ok(if slicing { lt } else { *elem }),
            Type::Array { elem, .. } => Ok(if slicing {
                Type::Slice(elem)
            } else {
                *elem
            }),
            Type::Map { value, .. } => Ok(*value),
            Type::Basic(Basic::String | Basic::UntypedString) => Ok(if slicing {
                Type::Basic(Basic::String)
            } else {
                Type::Basic(Basic::Byte)
            }),
            other => Err(EbbError::typecheck(format!("cannot index {}", other), pos)),
        }
    }

    // ----- calls -----

    fn call(&mut self, e: &mut Expr, want: &Want) -> Result<Type> {
        let pos = e.pos;
        let id = e.id;
        let ExprKind::Call {
            func,
            args,
            ellipsis,
            elide_error,
        } = &mut e.kind
        else {
            return Err(EbbError::typecheck("expected call", pos));
        };

        // type conversion
        if let Some(target) = self.callee_type(func, pos)? {
            if args.len() != 1 {
                return Err(EbbError::typecheck(
                    format!("conversion to {} takes one argument", target),
                    pos,
                ));
            }
            let at = self.expr(&mut args[0], &Want::Single)?;
            if !self.convertible(&target, &at) {
                return Err(EbbError::typecheck(
                    format!("cannot convert {} to {}", at, target),
                    pos,
                ));
            }
            self.types.insert(id, target.clone());
            return Ok(target);
        }

        // builtin function
        if let ExprKind::Ident(name) = &func.kind {
            if self.is_builtin(name) {
                let name = name.clone();
                self.types.insert(func.id, Type::Func(FuncSig::default()));
                let t = self.builtin_call(&name, args, pos)?;
                self.types.insert(id, t.clone());
                return Ok(t);
            }
        }

        let ft = self.expr(func, &Want::Single)?;
        let sig = match self.base_type(&ft) {
            Type::Func(sig) => sig,
            other => {
                return Err(EbbError::typecheck(
                    format!("cannot call non-function {}", other),
                    pos,
                ))
            }
        };
        self.check_args(&sig, args, *ellipsis, pos)?;

        let results = sig.results;
        let errs_last = results.last().map(Type::is_error).unwrap_or(false);

        // error elision: the context has no room for the error result
        match want {
            Want::Single | Want::Ty(_) if errs_last && results.len() == 2 => {
                *elide_error = true;
                self.types.insert(id, Type::Tuple(results.clone()));
                let visible = results[0].clone();
                if let Want::Ty(t) = want {
                    self.must_assignable(t, &visible, pos)?;
                }
                return Ok(visible);
            }
            Want::Arity(n) if errs_last && results.len() == *n + 1 && *n >= 2 => {
                *elide_error = true;
                self.types.insert(id, Type::Tuple(results.clone()));
                return Ok(Type::Tuple(results[..*n].to_vec()));
            }
            Want::Stmt if errs_last && results.len() == 1 => {
                *elide_error = true;
                self.types.insert(id, Type::Error);
                return Ok(Type::unit());
            }
            _ => {}
        }

        let t = match results.len() {
            0 => Type::unit(),
            1 => results.into_iter().next().unwrap_or_else(Type::unit),
            _ => Type::Tuple(results),
        };
        match want {
            Want::Single | Want::Ty(_) => {
                if matches!(t, Type::Tuple(_)) {
                    return Err(EbbError::typecheck(
                        "multiple-value call in single-value context",
                        pos,
                    ));
                }
                if let Want::Ty(wt) = want {
                    self.must_assignable(wt, &t, pos)?;
                }
            }
            Want::Arity(n) => {
                let ok = matches!(&t, Type::Tuple(elems) if elems.len() == *n);
                if !ok {
                    return Err(EbbError::typecheck(
                        format!("call yields wrong number of values for {} targets", n),
                        pos,
                    ));
                }
            }
            _ => {}
        }
        self.types.insert(id, t.clone());
        Ok(t)
    }

    /// Resolve a callee that names a type (a conversion). Records the
    /// callee node's type when it does.
    fn callee_type(&mut self, func: &mut Expr, pos: Pos) -> Result<Option<Type>> {
        let ty = match &func.kind {
            ExprKind::Ident(name) => match self.lookup(name) {
                Some(b) if b.kind == BindKind::TypeName => Some(b.ty.clone()),
                _ => None,
            },
            ExprKind::Selector { left, name } => match &left.kind {
                ExprKind::Ident(pkg) => {
                    let binding = self.lookup(pkg).cloned();
                    match binding {
                        Some(b) if b.kind == BindKind::Package => {
                            let path = match &b.ty {
                                Type::Package(path) => path.clone(),
                                _ => return Ok(None),
                            };
                            let left_id = left.id;
                            let loaded = match self.pkg_by_path.get(&path) {
                                Some(p) => p.clone(),
                                None => return Ok(None),
                            };
                            match loaded.exported.get(name) {
                                Some(obj) if obj.kind == ObjKind::Type => {
                                    self.types.insert(left_id, b.ty.clone());
                                    Some(obj.ty.clone())
                                }
                                _ => None,
                            }
                        }
                        _ => None,
                    }
                }
                _ => None,
            },
            ExprKind::Type(t) => Some(self.resolve(t, pos)?),
            _ => None,
        };
        if let Some(t) = &ty {
            self.types.insert(func.id, t.clone());
        }
        Ok(ty)
    }

    fn convertible(&self, target: &Type, value: &Type) -> bool {
        if self.assignable(target, value) {
            return true;
        }
        let t = self.base_type(target);
        let v = self.base_type(value);
        if is_numeric(&t) && is_numeric(&v) {
            return true;
        }
        let bytes = Type::Slice(Box::new(Type::Basic(Basic::Byte)));
        let runes = Type::Slice(Box::new(Type::Basic(Basic::Rune)));
        let stringish = |x: &Type| {
            matches!(x, Type::Basic(Basic::String | Basic::UntypedString))
        };
        if stringish(&t) && (v == bytes || v == runes || is_integer(&v) || stringish(&v)) {
            return true;
        }
        if stringish(&v) && (t == bytes || t == runes) {
            return true;
        }
        false
    }

    fn check_args(
        &mut self,
        sig: &FuncSig,
        args: &mut [Expr],
        ellipsis: bool,
        pos: Pos,
    ) -> Result<()> {
        let variadic = matches!(sig.params.last(), Some(Type::Ellipsis(_)));
        let fixed = if variadic {
            sig.params.len() - 1
        } else {
            sig.params.len()
        };
        if args.len() < fixed || (!variadic && args.len() > fixed) {
            return Err(EbbError::typecheck(
                format!("wrong number of arguments: got {}, want {}", args.len(), fixed),
                pos,
            ));
        }
        for (i, arg) in args.iter_mut().enumerate() {
            let param = if i < fixed {
                sig.params[i].clone()
            } else {
                match sig.params.last() {
                    Some(Type::Ellipsis(elem)) => {
                        if ellipsis {
                            // f(xs...) passes the slice through
                            Type::Slice(elem.clone())
                        } else {
                            (**elem).clone()
                        }
                    }
                    _ => Type::unit(),
                }
            };
            // interface{} parameters put no constraint on the argument
            if matches!(param, Type::Interface(ref m) if m.is_empty()) {
                self.expr(arg, &Want::Single)?;
            } else {
                self.expr(arg, &Want::Ty(param))?;
            }
        }
        Ok(())
    }

    fn builtin_call(&mut self, name: &str, args: &mut [Expr], pos: Pos) -> Result<Type> {
        match name {
            "print" => {
                for a in args.iter_mut() {
                    self.expr(a, &Want::Single)?;
                }
                Ok(Type::unit())
            }
            "printf" | "errorf" => {
                if args.is_empty() {
                    return Err(EbbError::typecheck(
                        format!("{} needs a format string", name),
                        pos,
                    ));
                }
                self.expr(&mut args[0], &Want::Ty(Type::Basic(Basic::String)))?;
                for a in args.iter_mut().skip(1) {
                    self.expr(a, &Want::Single)?;
                }
                if name == "errorf" {
                    Ok(Type::Error)
                } else {
                    Ok(Type::unit())
                }
            }
            "len" | "cap" => {
                if args.len() != 1 {
                    return Err(EbbError::typecheck(format!("{} takes one argument", name), pos));
                }
                self.expr(&mut args[0], &Want::Single)?;
                Ok(Type::Basic(Basic::Int))
            }
            "make" => {
                if args.is_empty() {
                    return Err(EbbError::typecheck("make needs a type", pos));
                }
                let ty = self.type_argument(&mut args[0], pos)?;
                for a in args.iter_mut().skip(1) {
                    self.expr(a, &Want::Ty(Type::Basic(Basic::Int)))?;
                }
                Ok(ty)
            }
            "new" => {
                if args.len() != 1 {
                    return Err(EbbError::typecheck("new takes one type", pos));
                }
                let ty = self.type_argument(&mut args[0], pos)?;
                Ok(Type::Pointer(Box::new(ty)))
            }
            "append" => {
                if args.is_empty() {
                    return Err(EbbError::typecheck("append needs a slice", pos));
                }
                let st = self.expr(&mut args[0], &Want::Single)?;
                let elem = match self.base_type(&st) {
                    Type::Slice(elem) => *elem,
                    other => {
                        return Err(EbbError::typecheck(
                            format!("append of non-slice {}", other),
                            pos,
                        ))
                    }
                };
                for a in args.iter_mut().skip(1) {
                    self.expr(a, &Want::Ty(elem.clone()))?;
                }
                Ok(st)
            }
            "copy" => {
                if args.len() != 2 {
                    return Err(EbbError::typecheck("copy takes two arguments", pos));
                }
                self.expr(&mut args[0], &Want::Single)?;
                self.expr(&mut args[1], &Want::Single)?;
                Ok(Type::Basic(Basic::Int))
            }
            "delete" => {
                if args.len() != 2 {
                    return Err(EbbError::typecheck("delete takes two arguments", pos));
                }
                let mt = self.expr(&mut args[0], &Want::Single)?;
                let key = match self.base_type(&mt) {
                    Type::Map { key, .. } => *key,
                    other => {
                        return Err(EbbError::typecheck(
                            format!("delete of non-map {}", other),
                            pos,
                        ))
                    }
                };
                self.expr(&mut args[1], &Want::Ty(key))?;
                Ok(Type::unit())
            }
            "panic" => {
                if args.len() != 1 {
                    return Err(EbbError::typecheck("panic takes one argument", pos));
                }
                self.expr(&mut args[0], &Want::Single)?;
                Ok(Type::unit())
            }
            other => Err(EbbError::typecheck(format!("unknown builtin {}", other), pos)),
        }
    }

    /// A type used as an argument, as in `make([]int, 4)`.
    fn type_argument(&mut self, e: &mut Expr, pos: Pos) -> Result<Type> {
        let ty = match &e.kind {
            ExprKind::Type(t) => self.resolve(t, pos)?,
            ExprKind::Ident(name) => match self.lookup(name) {
                Some(b) if b.kind == BindKind::TypeName => b.ty.clone(),
                _ => {
                    return Err(EbbError::typecheck(
                        format!("{} is not a type", name),
                        pos,
                    ))
                }
            },
            _ => return Err(EbbError::typecheck("expected a type", pos)),
        };
        self.types.insert(e.id, ty.clone());
        Ok(ty)
    }

    fn comp_literal(
        &mut self,
        ty: &Type,
        keys: &mut [Expr],
        elements: &mut [Expr],
        pos: Pos,
    ) -> Result<()> {
        let base = self.base_type(ty);
        match base {
            Type::Struct(fields) => {
                if !keys.is_empty() {
                    for (k, v) in keys.iter_mut().zip(elements.iter_mut()) {
                        let fname = match &k.kind {
                            ExprKind::Ident(name) => name.clone(),
                            _ => {
                                return Err(EbbError::typecheck(
                                    "struct literal key must be a field name",
                                    k.pos,
                                ))
                            }
                        };
                        let fty = fields
                            .iter()
                            .find(|(n, _)| *n == fname)
                            .map(|(_, t)| t.clone())
                            .ok_or_else(|| {
                                EbbError::typecheck(
                                    format!("unknown field {} in {}", fname, ty),
                                    k.pos,
                                )
                            })?;
                        self.types.insert(k.id, fty.clone());
                        self.expr(v, &Want::Ty(fty))?;
                    }
                    return Ok(());
                }
                if !elements.is_empty() && elements.len() != fields.len() {
                    return Err(EbbError::typecheck(
                        format!("wrong number of values in {} literal", ty),
                        pos,
                    ));
                }
                for (e, (_, fty)) in elements.iter_mut().zip(fields.iter()) {
                    self.expr(e, &Want::Ty(fty.clone()))?;
                }
                Ok(())
            }
            Type::Array { elem, .. } => {
                for e in elements.iter_mut() {
                    self.expr(e, &Want::Ty((*elem).clone()))?;
                }
                Ok(())
            }
            other => {
                // struct-typed imported names can't be checked deeper
                if matches!(other, Type::Named { .. }) {
                    for e in elements.iter_mut() {
                        self.expr(e, &Want::Single)?;
                    }
                    for k in keys.iter_mut() {
                        self.types.insert(k.id, Type::unit());
                    }
                    return Ok(());
                }
                Err(EbbError::typecheck(
                    format!("invalid composite literal type {}", other),
                    pos,
                ))
            }
        }
    }

    // ----- shell fragments -----

    fn shell(&mut self, sh: &mut Shell, want: &Want) -> Type {
        let mut refs = Vec::new();
        for list in &sh.cmds {
            collect_list_refs(list, &mut refs);
        }
        let mut free = Vec::new();
        for name in refs {
            if free.contains(&name) {
                continue;
            }
            let local = matches!(
                self.scopes.lookup(&name),
                Some(b) if matches!(b.kind, BindKind::Var | BindKind::Const)
            ) || matches!(
                self.package_decls.get(&name),
                Some(b) if matches!(b.kind, BindKind::Var | BindKind::Const)
            );
            if local {
                free.push(name);
            }
        }
        sh.free_vars = free;

        match want {
            Want::Single | Want::Ty(_) => {
                sh.elide_error = true;
                Type::Basic(Basic::String)
            }
            _ => Type::Tuple(vec![Type::Basic(Basic::String), Type::Error]),
        }
    }

    /// Commit an untyped constant against the context and enforce
    /// assignability for typed contexts.
    fn reconcile(&self, ty: Type, want: &Want, pos: Pos) -> Result<Type> {
        match want {
            Want::Ty(t) => {
                self.must_assignable(t, &ty, pos)?;
                if ty.is_untyped() {
                    Ok(t.clone())
                } else {
                    Ok(ty)
                }
            }
            Want::Stmt => Ok(default_type(ty)),
            _ => Ok(ty),
        }
    }
}

fn untyped_of(lit: &Literal) -> Type {
    match lit {
        Literal::Int(_) => Type::Basic(Basic::UntypedInteger),
        Literal::Float(_) => Type::Basic(Basic::UntypedFloat),
        Literal::Imaginary(_) => Type::Basic(Basic::UntypedComplex),
        Literal::Str(_) => Type::Basic(Basic::UntypedString),
        Literal::Rune(_) => Type::Basic(Basic::UntypedRune),
    }
}

fn collect_list_refs(list: &ShellList, out: &mut Vec<String>) {
    for andor in &list.andor {
        for pipeline in &andor.pipeline {
            for cmd in &pipeline.cmd {
                match cmd {
                    ShellCmd::Simple(simple) => {
                        for assign in &simple.assign {
                            scan_word_refs(&assign.value, out);
                        }
                        for arg in &simple.args {
                            scan_word_refs(arg, out);
                        }
                        for redirect in &simple.redirect {
                            scan_word_refs(&redirect.filename, out);
                        }
                    }
                    ShellCmd::Subshell(inner) => collect_list_refs(inner, out),
                }
            }
        }
    }
}

/// Collect `$name` and `${name}` references from one shell word.
/// Single-quoted text and backslash-escaped `$` do not count; a word
/// that is entirely single-quoted has no references at all.
fn scan_word_refs(word: &str, out: &mut Vec<String>) {
    if word.starts_with('\'') {
        return;
    }
    let chars: Vec<char> = word.chars().collect();
    let mut prev_slash = false;
    let mut in_quote = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
            i += 1;
            continue;
        }
        if !prev_slash {
            match c {
                '$' => {
                    let mut j = i + 1;
                    let mut name = String::new();
                    if j < chars.len() && chars[j] == '{' {
                        j += 1;
                        while j < chars.len() && chars[j] != '}' {
                            name.push(chars[j]);
                            j += 1;
                        }
                        j += 1;
                    } else {
                        while j < chars.len()
                            && (chars[j].is_alphanumeric() || chars[j] == '_')
                        {
                            name.push(chars[j]);
                            j += 1;
                        }
                    }
                    if !name.is_empty() {
                        out.push(name);
                    }
                    prev_slash = false;
                    i = j;
                    continue;
                }
                '\'' => in_quote = true,
                _ => {}
            }
        }
        prev_slash = c == '\\';
        i += 1;
    }
}
