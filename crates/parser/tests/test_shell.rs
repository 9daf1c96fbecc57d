use ebb_parser::ast::shell::{
    Shell, ShellAndOr, ShellAssign, ShellCmd, ShellList, ShellPipeline, ShellRedirect,
    ShellSimpleCmd,
};
use ebb_parser::{parse_stmt, ExprKind, StmtKind, TokenKind};

/// Parse `($$ input $$)` and unwrap down to the shell fragment.
fn parse_shell(input: &str) -> Shell {
    let src = format!("($$ {} $$)", input);
    let stmt = parse_stmt(src.as_bytes())
        .unwrap_or_else(|err| panic!("parse {:?}: {}", input, err))
        .unwrap_or_else(|| panic!("parse {:?}: no statement", input));
    match stmt.kind {
        StmtKind::Simple(expr) => match expr.kind {
            ExprKind::Unary { op, expr } => {
                assert_eq!(op, TokenKind::LeftParen);
                match expr.kind {
                    ExprKind::Shell(sh) => sh,
                    other => panic!("expected shell fragment, got {:?}", other),
                }
            }
            other => panic!("expected parenthesised shell, got {:?}", other),
        },
        other => panic!("expected expression statement, got {:?}", other),
    }
}

fn wrap(cmds: Vec<ShellList>) -> Shell {
    Shell {
        cmds,
        trap_out: true,
        ..Shell::default()
    }
}

fn simple(args: &[&str]) -> ShellCmd {
    ShellCmd::Simple(ShellSimpleCmd {
        args: args.iter().map(|a| a.to_string()).collect(),
        ..ShellSimpleCmd::default()
    })
}

fn pipeline(cmds: Vec<ShellCmd>) -> ShellPipeline {
    ShellPipeline {
        bang: false,
        cmd: cmds,
    }
}

fn andor(pipelines: Vec<ShellPipeline>, sep: Vec<TokenKind>) -> ShellAndOr {
    ShellAndOr {
        pipeline: pipelines,
        sep,
        background: false,
    }
}

fn simplesh(args: &[&str]) -> Shell {
    wrap(vec![ShellList {
        andor: vec![andor(vec![pipeline(vec![simple(args)])], vec![])],
    }])
}

#[test]
fn parses_empty_fragment() {
    assert_eq!(parse_shell(""), wrap(vec![]));
}

#[test]
fn parses_simple_commands() {
    assert_eq!(parse_shell("ls -l"), simplesh(&["ls", "-l"]));
    assert_eq!(
        parse_shell("grep -R \"fun*foo\" ."),
        simplesh(&["grep", "-R", "\"fun*foo\"", "."])
    );
    assert_eq!(
        parse_shell("echo -n not_a_file_*"),
        simplesh(&["echo", "-n", "not_a_file_*"])
    );
    assert_eq!(parse_shell("echo -n \"\\\"\""), simplesh(&["echo", "-n", "\"\\\"\""]));
    assert_eq!(
        parse_shell("echo \"a b \\\"\" 'c \\' \\d \"e f'g\""),
        simplesh(&["echo", "\"a b \\\"\"", "'c \\'", "\\d", "\"e f'g\""])
    );
    assert_eq!(
        parse_shell("go build \"-ldflags=-v -extldflags=-v\" pkg"),
        simplesh(&["go", "build", "\"-ldflags=-v -extldflags=-v\"", "pkg"])
    );
    assert_eq!(
        parse_shell("echo -n a${VAL}c "),
        simplesh(&["echo", "-n", "a${VAL}c"])
    );
}

#[test]
fn parses_pipelines() {
    assert_eq!(
        parse_shell("ls | head"),
        wrap(vec![ShellList {
            andor: vec![andor(
                vec![pipeline(vec![simple(&["ls"]), simple(&["head"])])],
                vec![],
            )],
        }])
    );
}

#[test]
fn parses_redirections() {
    assert_eq!(
        parse_shell("ls > flist"),
        wrap(vec![ShellList {
            andor: vec![andor(
                vec![pipeline(vec![ShellCmd::Simple(ShellSimpleCmd {
                    redirect: vec![ShellRedirect {
                        number: None,
                        token: TokenKind::Greater,
                        filename: "flist".to_string(),
                    }],
                    args: vec!["ls".to_string()],
                    ..ShellSimpleCmd::default()
                })])],
                vec![],
            )],
        }])
    );
}

#[test]
fn parses_and_or_chains_with_separators() {
    assert_eq!(
        parse_shell("echo hi | cat && true || false"),
        wrap(vec![ShellList {
            andor: vec![ShellAndOr {
                pipeline: vec![
                    pipeline(vec![simple(&["echo", "hi"]), simple(&["cat"])]),
                    pipeline(vec![simple(&["true"])]),
                    pipeline(vec![simple(&["false"])]),
                ],
                sep: vec![TokenKind::LogicalAnd, TokenKind::LogicalOr],
                background: false,
            }],
        }])
    );
}

#[test]
fn parses_lists_backgrounds_and_newlines() {
    let got = parse_shell(
        "echo one && echo two > f || echo 3\n\techo -n 4;\n\techo 5 | wc; echo 6 & echo 7; echo 8 &",
    );
    let want = wrap(vec![
        ShellList {
            andor: vec![ShellAndOr {
                pipeline: vec![
                    pipeline(vec![simple(&["echo", "one"])]),
                    pipeline(vec![ShellCmd::Simple(ShellSimpleCmd {
                        redirect: vec![ShellRedirect {
                            number: None,
                            token: TokenKind::Greater,
                            filename: "f".to_string(),
                        }],
                        args: vec!["echo".to_string(), "two".to_string()],
                        ..ShellSimpleCmd::default()
                    })]),
                    pipeline(vec![simple(&["echo", "3"])]),
                ],
                sep: vec![TokenKind::LogicalAnd, TokenKind::LogicalOr],
                background: false,
            }],
        },
        ShellList {
            andor: vec![
                andor(vec![pipeline(vec![simple(&["echo", "-n", "4"])])], vec![]),
                andor(
                    vec![pipeline(vec![simple(&["echo", "5"]), simple(&["wc"])])],
                    vec![],
                ),
                ShellAndOr {
                    pipeline: vec![pipeline(vec![simple(&["echo", "6"])])],
                    sep: vec![],
                    background: true,
                },
                andor(vec![pipeline(vec![simple(&["echo", "7"])])], vec![]),
                ShellAndOr {
                    pipeline: vec![pipeline(vec![simple(&["echo", "8"])])],
                    sep: vec![],
                    background: true,
                },
            ],
        },
    ]);
    assert_eq!(got, want);
}

#[test]
fn parses_subshell_with_fd_redirect() {
    let got = parse_shell("echo start; (echo a; echo b 2>&1); echo end");
    let want = wrap(vec![ShellList {
        andor: vec![
            andor(vec![pipeline(vec![simple(&["echo", "start"])])], vec![]),
            andor(
                vec![pipeline(vec![ShellCmd::Subshell(Box::new(ShellList {
                    andor: vec![
                        andor(vec![pipeline(vec![simple(&["echo", "a"])])], vec![]),
                        andor(
                            vec![pipeline(vec![ShellCmd::Simple(ShellSimpleCmd {
                                redirect: vec![ShellRedirect {
                                    number: Some(2),
                                    token: TokenKind::GreaterAnd,
                                    filename: "1".to_string(),
                                }],
                                args: vec!["echo".to_string(), "b".to_string()],
                                ..ShellSimpleCmd::default()
                            })])],
                            vec![],
                        ),
                    ],
                }))])],
                vec![],
            ),
            andor(vec![pipeline(vec![simple(&["echo", "end"])])], vec![]),
        ],
    }]);
    assert_eq!(got, want);
}

#[test]
fn parses_leading_assignments() {
    let got = parse_shell("GOOS=linux GOARCH=arm64 go build");
    let want = wrap(vec![ShellList {
        andor: vec![andor(
            vec![pipeline(vec![ShellCmd::Simple(ShellSimpleCmd {
                assign: vec![
                    ShellAssign {
                        key: "GOOS".to_string(),
                        value: "linux".to_string(),
                    },
                    ShellAssign {
                        key: "GOARCH".to_string(),
                        value: "arm64".to_string(),
                    },
                ],
                args: vec!["go".to_string(), "build".to_string()],
                ..ShellSimpleCmd::default()
            })])],
            vec![],
        )],
    }]);
    assert_eq!(got, want);
}

#[test]
fn parses_escaped_metacharacters_in_words() {
    let got = parse_shell("find . -name \\*.c -exec grep -H {} \\;\n\tls");
    let want = wrap(vec![
        ShellList {
            andor: vec![andor(
                vec![pipeline(vec![simple(&[
                    "find", ".", "-name", "\\*.c", "-exec", "grep", "-H", "{}", "\\;",
                ])])],
                vec![],
            )],
        },
        ShellList {
            andor: vec![andor(vec![pipeline(vec![simple(&["ls"])])], vec![])],
        },
    ]);
    assert_eq!(got, want);
}

#[test]
fn statement_level_fragment_does_not_trap_stdout() {
    let stmt = parse_stmt(b"$$ ls $$")
        .expect("parse")
        .expect("statement");
    match stmt.kind {
        StmtKind::Simple(expr) => match expr.kind {
            ExprKind::Shell(sh) => assert!(!sh.trap_out),
            other => panic!("expected shell fragment, got {:?}", other),
        },
        other => panic!("expected expression statement, got {:?}", other),
    }
}
