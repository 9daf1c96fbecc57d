use std::path::PathBuf;

use indexmap::IndexMap;

use ebb_parser::ast::types::Basic;
use ebb_parser::semantic::loader::{GoPackage, MapLoader, ObjKind, PkgObj};
use ebb_parser::semantic::{Checker, ExportDecl, Package};
use ebb_parser::{EbbError, Expr, ExprKind, Stmt, StmtKind, Type};

fn check(src: &str) -> Package {
    check_with(src, MapLoader::with_std())
}

fn check_with(src: &str, loader: MapLoader) -> Package {
    let mut checker = Checker::new(&loader);
    checker
        .check_source(PathBuf::from("test.ebb"), src.as_bytes().to_vec())
        .unwrap_or_else(|err| panic!("check {:?}: {}", src, err))
}

fn check_err(src: &str) -> EbbError {
    let loader = MapLoader::with_std();
    let mut checker = Checker::new(&loader);
    checker
        .check_source(PathBuf::from("test.ebb"), src.as_bytes().to_vec())
        .err()
        .unwrap_or_else(|| panic!("expected an error for {:?}", src))
}

/// Every call expression reachable from the statements, paired with
/// its elide flag.
fn calls(stmts: &[Stmt]) -> Vec<(String, bool)> {
    fn walk_stmt(s: &Stmt, out: &mut Vec<(String, bool)>) {
        match &s.kind {
            StmtKind::Simple(e) | StmtKind::Go(e) => walk_expr(e, out),
            StmtKind::Assign { left, right, .. } => {
                for e in left.iter().chain(right) {
                    walk_expr(e, out);
                }
            }
            StmtKind::Var(d) => {
                for e in &d.values {
                    walk_expr(e, out);
                }
            }
            StmtKind::Return(exprs) => {
                for e in exprs {
                    walk_expr(e, out);
                }
            }
            StmtKind::Block(stmts) => {
                for s in stmts {
                    walk_stmt(s, out);
                }
            }
            StmtKind::If { cond, body, els, .. } => {
                walk_expr(cond, out);
                walk_stmt(body, out);
                if let Some(els) = els {
                    walk_stmt(els, out);
                }
            }
            _ => {}
        }
    }
    fn walk_expr(e: &Expr, out: &mut Vec<(String, bool)>) {
        match &e.kind {
            ExprKind::Call {
                func,
                args,
                elide_error,
                ..
            } => {
                let name = match &func.kind {
                    ExprKind::Ident(n) => n.clone(),
                    ExprKind::Selector { name, .. } => name.clone(),
                    _ => "<anon>".to_string(),
                };
                out.push((name, *elide_error));
                walk_expr(func, out);
                for a in args {
                    walk_expr(a, out);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                walk_expr(left, out);
                walk_expr(right, out);
            }
            ExprKind::Unary { expr, .. } => walk_expr(expr, out),
            ExprKind::Selector { left, .. } => walk_expr(left, out),
            ExprKind::FuncLiteral(lit) => {
                if let Some(body) = &lit.body {
                    for s in body {
                        walk_stmt(s, out);
                    }
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    for s in stmts {
        walk_stmt(s, &mut out);
    }
    out
}

#[test]
fn reports_undeclared_name() {
    let err = check_err("_ = missing");
    assert!(matches!(err, EbbError::Type { .. }));
    assert!(err.to_string().contains("undeclared name missing"));
}

#[test]
fn reports_non_callable() {
    let err = check_err("x := 4\nx()");
    assert!(err.to_string().contains("cannot call"));
}

#[test]
fn reports_arity_mismatch() {
    let err = check_err("f := func(x integer) integer { return x }\nf(1, 2)");
    assert!(err.to_string().contains("wrong number of arguments"));
}

#[test]
fn reports_type_mismatch_on_assignment() {
    let err = check_err("x := 4\nx = \"nope\"");
    assert!(err.to_string().contains("cannot use"));
}

#[test]
fn type_assert_outside_type_switch_is_semantic_error() {
    // the parser accepts x.(type); the checker rejects it
    let err = check_err("x := 4\ny := x.(type)");
    assert!(matches!(err, EbbError::Type { .. }));
    assert!(err.to_string().contains("outside type switch"));
}

#[test]
fn scope_lookup_climbs_to_package_level() {
    let pkg = check("x := 4\nf := func() int { return x }\n_ = f");
    assert!(!pkg.syntax.is_empty());
}

#[test]
fn every_statement_has_a_type_table_entry() {
    let pkg = check("x := 4\nif x > 2 {\n\tx = 3\n}\nfor i := 0; i < 3; i = i + 1 {\n}\n");
    for s in &pkg.syntax {
        assert!(
            pkg.types.contains_key(&s.id),
            "statement {:?} missing from type table",
            s.kind
        );
    }
}

#[test]
fn call_with_trailing_error_elides_in_value_context() {
    let src = "import \"io/ioutil\"\ndata := ioutil.ReadFile(\"/tmp/x\")\n_ = data";
    let pkg = check(src);
    let calls = calls(&pkg.syntax);
    assert_eq!(calls, vec![("ReadFile".to_string(), true)]);

    // the table records the full result tuple for the elided call
    let mut found = false;
    for ty in pkg.types.values() {
        if let Type::Tuple(elems) = ty {
            if elems.len() == 2 && elems[1].is_error() {
                found = true;
            }
        }
    }
    assert!(found, "elided call should record its full result tuple");
}

#[test]
fn call_with_both_values_bound_does_not_elide() {
    let src = "import \"io/ioutil\"\ndata, err := ioutil.ReadFile(\"/tmp/x\")\n_ = data\n_ = err";
    let pkg = check(src);
    let calls = calls(&pkg.syntax);
    assert_eq!(calls, vec![("ReadFile".to_string(), false)]);
}

#[test]
fn statement_call_returning_bare_error_elides() {
    let mut loader = MapLoader::with_std();
    let mut pkg = GoPackage {
        path: "osx".to_string(),
        exported: IndexMap::new(),
    };
    pkg.exported.insert(
        "Remove".to_string(),
        PkgObj {
            kind: ObjKind::Var,
            ty: Type::Func(ebb_parser::ast::types::FuncSig {
                params: vec![Type::Basic(Basic::String)],
                results: vec![Type::Error],
            }),
        },
    );
    loader.insert(pkg);

    let pkg = check_with("import \"osx\"\nosx.Remove(\"/tmp/x\")", loader);
    let calls = calls(&pkg.syntax);
    assert_eq!(calls, vec![("Remove".to_string(), true)]);
}

#[test]
fn shell_free_vars_resolve_against_outer_scope() {
    let src = "x := \"world\"\n$$ echo hello $x $PATH $$";
    let pkg = check(src);
    let shell = pkg
        .syntax
        .iter()
        .find_map(|s| match &s.kind {
            StmtKind::Simple(e) => match &e.kind {
                ExprKind::Shell(sh) => Some(sh.clone()),
                _ => None,
            },
            _ => None,
        })
        .expect("shell fragment");
    // $x names an outer variable; $PATH is an environment lookup
    assert_eq!(shell.free_vars, vec!["x".to_string()]);
    assert!(!shell.elide_error);
}

#[test]
fn shell_in_value_context_elides_and_yields_string() {
    let src = "out := ($$ ls $$)\n_ = out";
    let pkg = check(src);
    let shell = pkg
        .syntax
        .iter()
        .find_map(|s| match &s.kind {
            StmtKind::Assign { right, .. } => match &right[0].kind {
                ExprKind::Unary { expr, .. } => match &expr.kind {
                    ExprKind::Shell(sh) => Some(sh.clone()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .expect("shell fragment");
    assert!(shell.trap_out);
    assert!(shell.elide_error);
}

#[test]
fn single_quoted_words_hide_references() {
    let src = "x := \"v\"\n$$ echo '$x' \\$x $$";
    let pkg = check(src);
    let shell = pkg
        .syntax
        .iter()
        .find_map(|s| match &s.kind {
            StmtKind::Simple(e) => match &e.kind {
                ExprKind::Shell(sh) => Some(sh.clone()),
                _ => None,
            },
            _ => None,
        })
        .expect("shell fragment");
    assert!(shell.free_vars.is_empty());
}

#[test]
fn exported_symbols_are_collected_in_order() {
    let src = "type A integer\nX := 4\nY := \"s\"\n_ = X\n_ = Y";
    let pkg = check(src);
    let names: Vec<&str> = pkg.exported.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["A", "X", "Y"]);

    assert_eq!(pkg.exported[0].kind, ObjKind::Type);
    match &pkg.exported[0].decl {
        Some(ExportDecl::Underlying(t)) => {
            assert_eq!(*t, Type::Basic(Basic::Integer));
        }
        other => panic!("expected underlying type, got {:?}", other),
    }
    assert_eq!(pkg.exported[1].kind, ObjKind::Var);
    assert_eq!(pkg.exported[1].ty, Type::Basic(Basic::Int));
}

#[test]
fn methodik_registers_type_and_methods() {
    let src = "methodik AnInt integer {\n\tfunc (a) f() integer { return a }\n}\nv := AnInt(4)\n_ = v.f()";
    let pkg = check(src);
    let names: Vec<&str> = pkg.exported.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["AnInt"]);
}

#[test]
fn no_unresolved_types_survive_checking() {
    let src = "f := func(x integer) (integer, string) { return x, \"ok\" }\na, b := f(4)\n_ = a\n_ = b";
    let pkg = check(src);
    fn assert_resolved(t: &Type) {
        match t {
            Type::Unresolved { name, .. } => panic!("unresolved type {} survived", name),
            Type::Pointer(e) | Type::Slice(e) | Type::Ellipsis(e) | Type::Table(e) => {
                assert_resolved(e)
            }
            Type::Func(sig) => {
                for t in sig.params.iter().chain(&sig.results) {
                    assert_resolved(t);
                }
            }
            Type::Tuple(elems) => {
                for t in elems {
                    assert_resolved(t);
                }
            }
            _ => {}
        }
    }
    for ty in pkg.types.values() {
        assert_resolved(ty);
    }
}

#[test]
fn unknown_import_fails() {
    let err = check_err("import \"no/such/pkg\"");
    assert!(err.to_string().contains("no/such/pkg"));
}

#[test]
fn package_selector_resolves_exports() {
    let src = "import \"strings\"\ns := strings.ToUpper(\"abc\")\n_ = s";
    let pkg = check(src);
    assert!(!pkg.syntax.is_empty());
    let err = check_err("import \"strings\"\nstrings.NoSuchFunc()");
    assert!(err.to_string().contains("undefined"));
}
