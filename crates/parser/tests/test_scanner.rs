use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::str::FromStr;

use ebb_parser::{EbbError, Literal, Scanner, TokenKind};

fn kinds(src: &str) -> Vec<TokenKind> {
    let mut s = Scanner::from_bytes(src);
    let mut out = Vec::new();
    loop {
        let tok = s.next_token().expect("scan should succeed");
        let done = tok.kind == TokenKind::Eof;
        out.push(tok.kind);
        if done {
            return out;
        }
    }
}

fn literals(src: &str) -> Vec<Literal> {
    let mut s = Scanner::from_bytes(src);
    let mut out = Vec::new();
    loop {
        let tok = s.next_token().expect("scan should succeed");
        if tok.kind == TokenKind::Eof {
            return out;
        }
        if let Some(lit) = tok.literal {
            out.push(lit);
        }
    }
}

fn scan_err(src: &str) -> EbbError {
    let mut s = Scanner::from_bytes(src);
    for _ in 0..1000 {
        match s.next_token() {
            Ok(tok) if tok.kind == TokenKind::Eof => break,
            Ok(_) => continue,
            Err(err) => return err,
        }
    }
    panic!("expected a scan error for {:?}", src);
}

#[test]
fn scans_operators_and_keywords() {
    assert_eq!(
        kinds("func f() { return a <- b }"),
        vec![
            TokenKind::Func,
            TokenKind::Ident,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::Return,
            TokenKind::Ident,
            TokenKind::ChanOp,
            TokenKind::Ident,
            TokenKind::RightBrace,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn scans_multi_character_operators() {
    assert_eq!(
        kinds("a := b &^ c << d"),
        vec![
            TokenKind::Ident,
            TokenKind::Define,
            TokenKind::Ident,
            TokenKind::RefPow,
            TokenKind::Ident,
            TokenKind::TwoLess,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn scans_table_literal_braces() {
    assert_eq!(
        kinds("{|1|}"),
        vec![
            TokenKind::LeftBraceTable,
            TokenKind::Int,
            TokenKind::RightBraceTable,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn inserts_semicolon_after_statement_enders() {
    // a line break after `return` ends the statement
    assert_eq!(
        kinds("return\n7"),
        vec![
            TokenKind::Return,
            TokenKind::Semicolon,
            TokenKind::Int,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn no_semicolon_after_binary_operator() {
    // a line break after `+` continues the expression
    assert_eq!(
        kinds("x +\ny"),
        vec![
            TokenKind::Ident,
            TokenKind::Add,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn comment_preserves_semicolon_insertion() {
    assert_eq!(
        kinds("x // trailing\ny"),
        vec![
            TokenKind::Ident,
            TokenKind::Comment,
            TokenKind::Semicolon,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn numbers_are_arbitrary_precision() {
    let lits = literals("123456789012345678901234567890 0x1F 3.5e2 2i");
    assert_eq!(
        lits[0],
        Literal::Int(
            BigInt::from_str("123456789012345678901234567890").expect("big int")
        )
    );
    assert_eq!(lits[1], Literal::Int(BigInt::from(31)));
    assert_eq!(
        lits[2],
        Literal::Float(BigDecimal::from_str("3.5e2").expect("big decimal"))
    );
    assert_eq!(
        lits[3],
        Literal::Imaginary(BigDecimal::from_str("2").expect("big decimal"))
    );
}

#[test]
fn strings_unescape_and_validate() {
    let lits = literals(r#""hello \"ebb\"" 'x' `raw`"#);
    assert_eq!(lits[0], Literal::Str("hello \"ebb\"".to_string()));
    assert_eq!(lits[1], Literal::Rune('x'));
    assert_eq!(lits[2], Literal::Str("raw".to_string()));
}

#[test]
fn shell_mode_tokenizes_words_and_metachars() {
    assert_eq!(
        kinds("$$ ls -l | wc && echo done $$"),
        vec![
            TokenKind::Shell,
            TokenKind::ShellWord,
            TokenKind::ShellWord,
            TokenKind::ShellPipe,
            TokenKind::ShellWord,
            TokenKind::LogicalAnd,
            TokenKind::ShellWord,
            TokenKind::ShellWord,
            TokenKind::Shell,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn shell_word_adjacent_to_closing_delimiter() {
    // "ls$$" must tokenise as word(ls) then shell-end, never "ls$"
    let mut s = Scanner::from_bytes("$$ls$$");
    let open = s.next_token().expect("open");
    assert_eq!(open.kind, TokenKind::Shell);
    let word = s.next_token().expect("word");
    assert_eq!(word.kind, TokenKind::ShellWord);
    assert_eq!(word.text(), "ls");
    let close = s.next_token().expect("close");
    assert_eq!(close.kind, TokenKind::Shell);
}

#[test]
fn shell_quoted_words_keep_their_quotes() {
    let mut s = Scanner::from_bytes(r#"$$ grep "fun*foo" 'a b' $$"#);
    s.next_token().expect("open");
    s.next_token().expect("grep");
    let dq = s.next_token().expect("double quoted");
    assert_eq!(dq.text(), r#""fun*foo""#);
    let sq = s.next_token().expect("single quoted");
    assert_eq!(sq.text(), "'a b'");
}

#[test]
fn shell_brace_param_is_one_word() {
    let mut s = Scanner::from_bytes("$$ echo a${VAL}c $$");
    s.next_token().expect("open");
    s.next_token().expect("echo");
    let word = s.next_token().expect("word");
    assert_eq!(word.text(), "a${VAL}c");
}

#[test]
fn shell_redirect_operators() {
    assert_eq!(
        kinds("$$ a > f 2>&1 &> g $$"),
        vec![
            TokenKind::Shell,
            TokenKind::ShellWord,
            TokenKind::Greater,
            TokenKind::ShellWord,
            TokenKind::ShellWord,
            TokenKind::GreaterAnd,
            TokenKind::ShellWord,
            TokenKind::AndGreater,
            TokenKind::ShellWord,
            TokenKind::Shell,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn reports_unterminated_string() {
    let err = scan_err("\"abc");
    assert!(matches!(err, EbbError::Scan { .. }));
    assert!(err.to_string().contains("string literal"));
}

#[test]
fn reports_unterminated_comment() {
    let err = scan_err("/* nope");
    assert!(err.to_string().contains("comment not terminated"));
}

#[test]
fn reports_byte_order_mark() {
    let err = scan_err("x \u{FEFF} y");
    assert!(err.to_string().contains("byte order marker"));
}

#[test]
fn error_latches_and_keeps_surfacing() {
    let mut s = Scanner::from_bytes("\"abc\nx");
    assert!(s.next_token().is_err());
    assert!(s.next_token().is_err());
}

#[test]
fn empty_input_is_just_eof() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
}

#[test]
fn pull_source_refills_across_chunks() {
    let chunks = vec![b"x := ".to_vec(), b"4".to_vec()];
    let mut iter = chunks.into_iter();
    let mut s = Scanner::with_source(move || iter.next());
    let mut got = Vec::new();
    loop {
        let tok = s.next_token().expect("scan");
        let done = tok.kind == TokenKind::Eof;
        got.push(tok.kind);
        if done {
            break;
        }
    }
    assert_eq!(
        got,
        vec![
            TokenKind::Ident,
            TokenKind::Define,
            TokenKind::Int,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}
