use num_bigint::BigInt;

use ebb_parser::ast::expr::FuncLiteral;
use ebb_parser::ast::stmt::{ConstDecl, SwitchCase, TypeSwitchCase, VarDecl};
use ebb_parser::ast::types::FuncSig;
use ebb_parser::{parse_stmt, Expr, ExprKind, Literal, Stmt, StmtKind, TokenKind, Type};

fn e(kind: ExprKind) -> Expr {
    Expr::from(kind)
}

fn s(kind: StmtKind) -> Stmt {
    Stmt::from(kind)
}

fn ident(name: &str) -> Expr {
    e(ExprKind::Ident(name.to_string()))
}

fn int(v: i64) -> Expr {
    e(ExprKind::Basic(Literal::Int(BigInt::from(v))))
}

fn string(v: &str) -> Expr {
    e(ExprKind::Basic(Literal::Str(v.to_string())))
}

fn binary(op: TokenKind, left: Expr, right: Expr) -> Expr {
    e(ExprKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn paren(inner: Expr) -> Expr {
    e(ExprKind::Unary {
        op: TokenKind::LeftParen,
        expr: Box::new(inner),
    })
}

fn unresolved(name: &str) -> Type {
    Type::Unresolved {
        package: None,
        name: name.to_string(),
    }
}

fn parse(src: &str) -> Stmt {
    parse_stmt(src.as_bytes())
        .unwrap_or_else(|err| panic!("parse {:?}: {}", src, err))
        .unwrap_or_else(|| panic!("parse {:?}: no statement", src))
}

fn parse_expr(src: &str) -> Expr {
    match parse(src).kind {
        StmtKind::Simple(expr) => expr,
        other => panic!("expected expression statement for {:?}, got {:?}", src, other),
    }
}

#[test]
fn parses_expressions() {
    let tests: Vec<(&str, Expr)> = vec![
        ("foo", ident("foo")),
        (
            "x + y",
            binary(TokenKind::Add, ident("x"), ident("y")),
        ),
        (
            "x + y + 9",
            binary(
                TokenKind::Add,
                binary(TokenKind::Add, ident("x"), ident("y")),
                int(9),
            ),
        ),
        (
            // parenthesised expressions keep their grouping
            "x + (y + 7)",
            binary(
                TokenKind::Add,
                ident("x"),
                paren(binary(TokenKind::Add, ident("y"), int(7))),
            ),
        ),
        (
            "x + y * z",
            binary(
                TokenKind::Add,
                ident("x"),
                binary(TokenKind::Mul, ident("y"), ident("z")),
            ),
        ),
        (
            "quit()",
            e(ExprKind::Call {
                func: Box::new(ident("quit")),
                args: vec![],
                ellipsis: false,
                elide_error: false,
            }),
        ),
        (
            "min(1, 2)",
            e(ExprKind::Call {
                func: Box::new(ident("min")),
                args: vec![int(1), int(2)],
                ellipsis: false,
                elide_error: false,
            }),
        ),
        (
            "x.y.z",
            e(ExprKind::Selector {
                left: Box::new(e(ExprKind::Selector {
                    left: Box::new(ident("x")),
                    name: "y".to_string(),
                })),
                name: "z".to_string(),
            }),
        ),
        ("y * /* comment */ z", binary(TokenKind::Mul, ident("y"), ident("z"))),
        ("y * z//comment", binary(TokenKind::Mul, ident("y"), ident("z"))),
        (r#""hello""#, string("hello")),
        (r#""hello \"ebb\"""#, string("hello \"ebb\"")),
    ];
    for (src, want) in tests {
        let got = parse_expr(src);
        assert_eq!(got, want, "parsing {:?}", src);
    }
}

#[test]
fn parses_index_and_slice_forms() {
    let slice = |low: Option<Expr>, high: Option<Expr>| {
        e(ExprKind::Slice {
            low: low.map(Box::new),
            high: high.map(Box::new),
        })
    };
    let index = |left: Expr, indicies: Vec<Expr>| {
        e(ExprKind::Index {
            left: Box::new(left),
            indicies,
        })
    };
    let tests: Vec<(&str, Expr)> = vec![
        ("x[4]", index(ident("x"), vec![int(4)])),
        (
            "x[1+2]",
            index(ident("x"), vec![binary(TokenKind::Add, int(1), int(2))]),
        ),
        (
            "x[1:3]",
            index(ident("x"), vec![slice(Some(int(1)), Some(int(3)))]),
        ),
        ("x[1:]", index(ident("x"), vec![slice(Some(int(1)), None)])),
        ("x[:3]", index(ident("x"), vec![slice(None, Some(int(3)))])),
        ("x[:]", index(ident("x"), vec![slice(None, None)])),
        (
            "x[:,:]",
            index(ident("x"), vec![slice(None, None), slice(None, None)]),
        ),
        (
            "x[1:,:3]",
            index(
                ident("x"),
                vec![slice(Some(int(1)), None), slice(None, Some(int(3)))],
            ),
        ),
        (
            "x[1:3,5:7]",
            index(
                ident("x"),
                vec![
                    slice(Some(int(1)), Some(int(3))),
                    slice(Some(int(5)), Some(int(7))),
                ],
            ),
        ),
    ];
    for (src, want) in tests {
        assert_eq!(parse_expr(src), want, "parsing {:?}", src);
    }
}

#[test]
fn parses_func_literals() {
    let got = parse_expr("func() integer { return 7 }");
    let want = e(ExprKind::FuncLiteral(FuncLiteral {
        sig: FuncSig {
            params: vec![],
            results: vec![unresolved("integer")],
        },
        body: Some(vec![s(StmtKind::Return(vec![int(7)]))]),
        ..FuncLiteral::default()
    }));
    assert_eq!(got, want);
}

#[test]
fn parses_func_literal_with_named_params_and_results() {
    let got = parse_expr("func(x, y val) (r0 val, r1 val) { return x, y }");
    let want = e(ExprKind::FuncLiteral(FuncLiteral {
        sig: FuncSig {
            params: vec![unresolved("val"), unresolved("val")],
            results: vec![unresolved("val"), unresolved("val")],
        },
        param_names: vec!["x".to_string(), "y".to_string()],
        result_names: vec!["r0".to_string(), "r1".to_string()],
        body: Some(vec![s(StmtKind::Return(vec![ident("x"), ident("y")]))]),
        ..FuncLiteral::default()
    }));
    assert_eq!(got, want);
}

#[test]
fn parses_immediately_invoked_func_literal() {
    let got = parse_expr("func(x val) val { return 3+x }(1)");
    let want = e(ExprKind::Call {
        func: Box::new(e(ExprKind::FuncLiteral(FuncLiteral {
            sig: FuncSig {
                params: vec![unresolved("val")],
                results: vec![unresolved("val")],
            },
            param_names: vec!["x".to_string()],
            body: Some(vec![s(StmtKind::Return(vec![binary(
                TokenKind::Add,
                int(3),
                ident("x"),
            )]))]),
            ..FuncLiteral::default()
        }))),
        args: vec![int(1)],
        ellipsis: false,
        elide_error: false,
    });
    assert_eq!(got, want);
}

#[test]
fn parses_if_with_init_inside_func() {
    let got = parse_expr(
        "func() int64 {\n\tif x := 9; x > 3 {\n\t\treturn x\n\t} else {\n\t\treturn 1-x\n\t}\n}",
    );
    let want = e(ExprKind::FuncLiteral(FuncLiteral {
        sig: FuncSig {
            params: vec![],
            results: vec![unresolved("int64")],
        },
        body: Some(vec![s(StmtKind::If {
            init: Some(Box::new(s(StmtKind::Assign {
                decl: true,
                left: vec![ident("x")],
                right: vec![int(9)],
            }))),
            cond: binary(TokenKind::Greater, ident("x"), int(3)),
            body: Box::new(s(StmtKind::Block(vec![s(StmtKind::Return(vec![ident(
                "x",
            )]))]))),
            els: Some(Box::new(s(StmtKind::Block(vec![s(StmtKind::Return(
                vec![binary(TokenKind::Sub, int(1), ident("x"))],
            ))])))),
        })]),
        ..FuncLiteral::default()
    }));
    assert_eq!(got, want);
}

#[test]
fn parses_for_loops() {
    let tests: Vec<(&str, Stmt)> = vec![
        (
            "for {}",
            s(StmtKind::For {
                init: None,
                cond: None,
                post: None,
                body: Box::new(s(StmtKind::Block(vec![]))),
            }),
        ),
        (
            "for ;; {}",
            s(StmtKind::For {
                init: None,
                cond: None,
                post: None,
                body: Box::new(s(StmtKind::Block(vec![]))),
            }),
        ),
        (
            "for true {}",
            s(StmtKind::For {
                init: None,
                cond: Some(ident("true")),
                post: None,
                body: Box::new(s(StmtKind::Block(vec![]))),
            }),
        ),
        (
            "for ; true; {}",
            s(StmtKind::For {
                init: None,
                cond: Some(ident("true")),
                post: None,
                body: Box::new(s(StmtKind::Block(vec![]))),
            }),
        ),
        (
            "for range x {}",
            s(StmtKind::Range {
                key: None,
                value: None,
                decl: false,
                expr: ident("x"),
                body: Box::new(s(StmtKind::Block(vec![]))),
            }),
        ),
        (
            "for k, v := range x {}",
            s(StmtKind::Range {
                key: Some(ident("k")),
                value: Some(ident("v")),
                decl: true,
                expr: ident("x"),
                body: Box::new(s(StmtKind::Block(vec![]))),
            }),
        ),
        (
            "for k := range x {}",
            s(StmtKind::Range {
                key: Some(ident("k")),
                value: None,
                decl: true,
                expr: ident("x"),
                body: Box::new(s(StmtKind::Block(vec![]))),
            }),
        ),
    ];
    for (src, want) in tests {
        assert_eq!(parse(src), want, "parsing {:?}", src);
    }
}

#[test]
fn desugars_increment_in_for_post() {
    let got = parse("for i := 0; i < 10; i++ { x = i }");
    let want = s(StmtKind::For {
        init: Some(Box::new(s(StmtKind::Assign {
            decl: true,
            left: vec![ident("i")],
            right: vec![int(0)],
        }))),
        cond: Some(binary(TokenKind::Less, ident("i"), int(10))),
        post: Some(Box::new(s(StmtKind::Assign {
            decl: false,
            left: vec![ident("i")],
            right: vec![binary(TokenKind::Add, ident("i"), int(1))],
        }))),
        body: Box::new(s(StmtKind::Block(vec![s(StmtKind::Assign {
            decl: false,
            left: vec![ident("x")],
            right: vec![ident("i")],
        })]))),
    });
    assert_eq!(got, want);
}

#[test]
fn parses_const_declarations() {
    assert_eq!(
        parse("const x = 4"),
        s(StmtKind::Const(ConstDecl {
            names: vec!["x".to_string()],
            ty: None,
            values: vec![int(4)],
        }))
    );
    assert_eq!(
        parse("const x int64 = 4"),
        s(StmtKind::Const(ConstDecl {
            names: vec!["x".to_string()],
            ty: Some(unresolved("int64")),
            values: vec![int(4)],
        }))
    );
}

#[test]
fn parses_var_declarations() {
    assert_eq!(
        parse("var x int64"),
        s(StmtKind::Var(VarDecl {
            names: vec!["x".to_string()],
            ty: Some(unresolved("int64")),
            values: vec![],
        }))
    );
}

#[test]
fn parses_type_declarations() {
    assert_eq!(
        parse("type A integer"),
        s(StmtKind::TypeDecl {
            name: "A".to_string(),
            ty: unresolved("integer"),
        })
    );
    assert_eq!(
        parse("type S struct { x integer }"),
        s(StmtKind::TypeDecl {
            name: "S".to_string(),
            ty: Type::Struct(vec![("x".to_string(), unresolved("integer"))]),
        })
    );
}

#[test]
fn parses_methodik_declaration() {
    let got = parse("methodik AnInt integer {\n\tfunc (a) f() integer { return a }\n}\n");
    let want = s(StmtKind::MethodikDecl {
        name: "AnInt".to_string(),
        ty: Type::Methodik {
            name: "AnInt".to_string(),
            underlying: Box::new(unresolved("integer")),
            methods: vec![(
                "f".to_string(),
                FuncSig {
                    params: vec![],
                    results: vec![unresolved("integer")],
                },
            )],
            pointer_receiver: false,
        },
        methods: vec![e(ExprKind::FuncLiteral(FuncLiteral {
            name: "f".to_string(),
            receiver_name: "a".to_string(),
            sig: FuncSig {
                params: vec![],
                results: vec![unresolved("integer")],
            },
            body: Some(vec![s(StmtKind::Return(vec![ident("a")]))]),
            ..FuncLiteral::default()
        }))],
    });
    assert_eq!(got, want);
}

#[test]
fn methodik_pointer_underlying_marks_pointer_receivers() {
    let got = parse(
        "methodik T *struct{\n\tx integer\n\ty [|]int64\n} {\n\tfunc (a) f(x integer) integer {\n\t\treturn a.x\n\t}\n}\n",
    );
    match got.kind {
        StmtKind::MethodikDecl { ty, methods, .. } => {
            match ty {
                Type::Methodik {
                    underlying,
                    pointer_receiver,
                    ..
                } => {
                    assert!(pointer_receiver);
                    assert_eq!(
                        *underlying,
                        Type::Struct(vec![
                            ("x".to_string(), unresolved("integer")),
                            ("y".to_string(), Type::Table(Box::new(unresolved("int64")))),
                        ])
                    );
                }
                other => panic!("expected methodik type, got {:?}", other),
            }
            match &methods[0].kind {
                ExprKind::FuncLiteral(lit) => {
                    assert!(lit.pointer_receiver);
                    assert_eq!(lit.receiver_name, "a");
                    assert_eq!(lit.param_names, vec!["x".to_string()]);
                }
                other => panic!("expected func literal, got {:?}", other),
            }
        }
        other => panic!("expected methodik, got {:?}", other),
    }
}

#[test]
fn parses_composite_and_map_literals() {
    assert_eq!(
        parse("S{ X: 7 }"),
        s(StmtKind::Simple(e(ExprKind::CompLiteral {
            ty: unresolved("S"),
            keys: vec![ident("X")],
            elements: vec![int(7)],
        })))
    );
    assert_eq!(
        parse(r#"map[string]string{ "foo": "bar" }"#),
        s(StmtKind::Simple(e(ExprKind::MapLiteral {
            ty: Type::Map {
                key: Box::new(unresolved("string")),
                value: Box::new(unresolved("string")),
            },
            keys: vec![string("foo")],
            values: vec![string("bar")],
        })))
    );
    assert_eq!(
        parse("sync.Mutex{}"),
        s(StmtKind::Simple(e(ExprKind::CompLiteral {
            ty: Type::Unresolved {
                package: Some("sync".to_string()),
                name: "Mutex".to_string(),
            },
            keys: vec![],
            elements: vec![],
        })))
    );
}

#[test]
fn no_composite_literal_in_control_clause() {
    let got = parse("if (x == T{}) {}");
    let want = s(StmtKind::If {
        init: None,
        cond: paren(binary(
            TokenKind::Equal,
            ident("x"),
            e(ExprKind::CompLiteral {
                ty: unresolved("T"),
                keys: vec![],
                elements: vec![],
            }),
        )),
        body: Box::new(s(StmtKind::Block(vec![]))),
        els: None,
    });
    assert_eq!(got, want);
}

#[test]
fn parses_blank_and_multi_assign() {
    assert_eq!(
        parse("_ = 5"),
        s(StmtKind::Assign {
            decl: false,
            left: vec![ident("_")],
            right: vec![int(5)],
        })
    );
    assert_eq!(
        parse("x, _ := 4, 5"),
        s(StmtKind::Assign {
            decl: true,
            left: vec![ident("x"), ident("_")],
            right: vec![int(4), int(5)],
        })
    );
}

#[test]
fn parses_go_statement() {
    let got = parse("go func() {}()");
    let want = s(StmtKind::Go(e(ExprKind::Call {
        func: Box::new(e(ExprKind::FuncLiteral(FuncLiteral {
            sig: FuncSig::default(),
            body: Some(vec![]),
            ..FuncLiteral::default()
        }))),
        args: vec![],
        ellipsis: false,
        elide_error: false,
    })));
    assert_eq!(got, want);
}

#[test]
fn parses_switch_statements() {
    assert_eq!(
        parse("switch {}"),
        s(StmtKind::Switch {
            init: None,
            cond: None,
            cases: vec![],
        })
    );

    let got = parse(
        "switch i := fct(); i {\ncase 42, 66:\n\tprint(i)\ndefault:\n\tprint(ok)\n}",
    );
    let want = s(StmtKind::Switch {
        init: Some(Box::new(s(StmtKind::Assign {
            decl: true,
            left: vec![ident("i")],
            right: vec![e(ExprKind::Call {
                func: Box::new(ident("fct")),
                args: vec![],
                ellipsis: false,
                elide_error: false,
            })],
        }))),
        cond: Some(ident("i")),
        cases: vec![
            SwitchCase {
                conds: vec![int(42), int(66)],
                default: false,
                body: vec![s(StmtKind::Simple(e(ExprKind::Call {
                    func: Box::new(ident("print")),
                    args: vec![ident("i")],
                    ellipsis: false,
                    elide_error: false,
                })))],
            },
            SwitchCase {
                conds: vec![],
                default: true,
                body: vec![s(StmtKind::Simple(e(ExprKind::Call {
                    func: Box::new(ident("print")),
                    args: vec![ident("ok")],
                    ellipsis: false,
                    elide_error: false,
                })))],
            },
        ],
    });
    assert_eq!(got, want);
}

#[test]
fn parses_type_switch_forms() {
    let assert_guard = |src: &str, want_binding: Option<&str>| {
        let got = parse(src);
        match got.kind {
            StmtKind::TypeSwitch { assign, .. } => match (&assign.kind, want_binding) {
                (StmtKind::Simple(e), None) => {
                    assert!(
                        matches!(e.kind, ExprKind::TypeAssert { ty: None, .. }),
                        "guard for {:?}",
                        src
                    );
                }
                (StmtKind::Assign { left, right, decl }, Some(name)) => {
                    assert!(*decl);
                    assert_eq!(left[0], ident(name));
                    assert!(matches!(
                        right[0].kind,
                        ExprKind::TypeAssert { ty: None, .. }
                    ));
                }
                other => panic!("bad guard for {:?}: {:?}", src, other),
            },
            other => panic!("expected type switch for {:?}, got {:?}", src, other),
        }
    };
    assert_guard("switch v.(type) {}", None);
    assert_guard("switch x := v.(type) {}", Some("x"));
    assert_guard("switch x := fct(); x.(type) {}", None);
    assert_guard("switch x := fct(); v := x.(type) {}", Some("v"));
}

#[test]
fn parses_type_switch_cases() {
    let got = parse(
        "switch x := fct(); x.(type) {\ncase int, float64:\ncase *int:\ndefault:\n}\n",
    );
    match got.kind {
        StmtKind::TypeSwitch { cases, .. } => {
            assert_eq!(
                cases,
                vec![
                    TypeSwitchCase {
                        types: vec![unresolved("int"), unresolved("float64")],
                        default: false,
                        body: vec![],
                    },
                    TypeSwitchCase {
                        types: vec![Type::Pointer(Box::new(unresolved("int")))],
                        default: false,
                        body: vec![],
                    },
                    TypeSwitchCase {
                        types: vec![],
                        default: true,
                        body: vec![],
                    },
                ]
            );
        }
        other => panic!("expected type switch, got {:?}", other),
    }
}

#[test]
fn parses_select_statement() {
    let got = parse(
        "select {\ncase v := <-ch1:\n\tprint(v)\ncase ch3 <- vv:\n\tprint(ch3)\ncase <-ch4:\n\tprint(ch4)\ndefault:\n\tprint(42)\n}",
    );
    match got.kind {
        StmtKind::Select { cases } => {
            assert_eq!(cases.len(), 4);
            assert!(matches!(
                cases[0].stmt.as_ref().map(|s| &s.kind),
                Some(StmtKind::Assign { decl: true, .. })
            ));
            assert!(matches!(
                cases[1].stmt.as_ref().map(|s| &s.kind),
                Some(StmtKind::Send { .. })
            ));
            assert!(matches!(
                cases[2].stmt.as_ref().map(|s| &s.kind),
                Some(StmtKind::Simple(_))
            ));
            assert!(cases[3].default);
        }
        other => panic!("expected select, got {:?}", other),
    }
}

#[test]
fn comments_do_not_break_call_arguments() {
    let got = parse("f(x, // a comment\ny)");
    let want = s(StmtKind::Simple(e(ExprKind::Call {
        func: Box::new(ident("f")),
        args: vec![ident("x"), ident("y")],
        ellipsis: false,
        elide_error: false,
    })));
    assert_eq!(got, want);
}

#[test]
fn reports_error_with_position() {
    let err = parse_stmt(b"x +").expect_err("should fail");
    let msg = err.to_string();
    assert!(msg.starts_with("parse:"), "got {:?}", msg);
    assert!(msg.contains("1:"), "got {:?}", msg);
}

#[test]
fn empty_input_yields_no_statement() {
    assert_eq!(parse_stmt(b"").expect("ok"), None);
}
