//! The scanner.
//!
//! A hand-written scanner with two interleaved lexical modes: language
//! mode and shell mode. The `$$` bigraph toggles between them. Source
//! bytes arrive through a pull interface: when the internal buffer is
//! exhausted the scanner requests another chunk, and an empty response
//! sets the end-of-input sentinel so subsequent calls terminate.
//!
//! Automatic semicolon insertion follows the host language: a newline
//! produces a semicolon token when the previously emitted token could
//! end a statement. The scanner tracks this with the one-bit `semi`
//! latch.

pub mod token;
mod unquote;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::error::{EbbError, Result};
use token::{keyword, Literal, Pos, Token, TokenKind};
use unquote::{unquote_char, unquote_string};

/// Pull interface for source bytes. `None` signals end of input.
pub type Source = Box<dyn FnMut() -> Option<Vec<u8>>>;

pub struct Scanner {
    // Position of the current lookahead rune.
    line: u32,
    column: u32,
    offset: usize,
    last_width: u32,

    src: Vec<u8>,
    r: Option<char>, // one-rune lookahead; None once input is exhausted
    off: usize,      // read position, one rune past `offset`
    semi: bool,
    err: Option<EbbError>,
    in_shell: bool,
    // Set mid `$$` token when a shell word ran directly into the
    // closing delimiter and we have already read past the first '$'.
    exiting_shell: bool,
    eof: bool,
    pull: Option<Source>,
}

impl Scanner {
    pub fn from_bytes(src: impl Into<Vec<u8>>) -> Scanner {
        let mut s = Scanner::empty();
        s.src = src.into();
        s.next();
        s
    }

    pub fn with_source<F>(pull: F) -> Scanner
    where
        F: FnMut() -> Option<Vec<u8>> + 'static,
    {
        let mut s = Scanner::empty();
        s.pull = Some(Box::new(pull));
        s.next();
        s
    }

    fn empty() -> Scanner {
        Scanner {
            line: 1,
            column: 0,
            offset: 0,
            last_width: 0,
            src: Vec::new(),
            r: None,
            off: 0,
            semi: false,
            err: None,
            in_shell: false,
            exiting_shell: false,
            eof: false,
            pull: None,
        }
    }

    /// Position of the current lookahead rune, which at the start of
    /// `next_token` is the position of the token about to be scanned.
    pub fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    /// Consume the rest of the buffered source. Used after a fatal
    /// parse error so a pull source is left at a clean boundary.
    pub fn drain(&mut self) {
        while self.off < self.src.len() {
            self.next();
        }
    }

    fn errorf(&mut self, msg: impl Into<String>) {
        if self.err.is_none() {
            self.err = Some(EbbError::scan(msg, self.pos()));
        }
    }

    /// Advance the lookahead by one rune, refilling the buffer from the
    /// pull source when it runs dry.
    fn next(&mut self) {
        if self.off >= self.src.len() {
            if self.eof {
                return;
            }
            let more = self.pull.as_mut().and_then(|pull| pull());
            match more {
                Some(bytes) if !bytes.is_empty() => self.src.extend_from_slice(&bytes),
                _ => {
                    self.offset = self.src.len();
                    self.r = None;
                    self.eof = true;
                    return;
                }
            }
        }

        self.offset = self.off;
        if self.r == Some('\n') {
            self.line += 1;
            self.last_width = 0;
            self.column = 0;
        }

        let first = self.src[self.off];
        let (ch, w) = match decode_rune(&self.src[self.off..]) {
            Some((c, w)) => (c, w),
            None => ('\u{FFFD}', 1),
        };
        if first == 0 {
            self.errorf("bad UTF-8: zero byte");
        } else if ch == '\u{FFFD}' && w == 1 && first >= 0x80 {
            self.errorf("bad UTF-8");
        } else if ch == '\u{FEFF}' {
            self.errorf("bad byte order marker");
        }

        self.r = Some(ch);
        self.column += self.last_width;
        self.last_width = w as u32;
        self.off += w;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.r, Some(' ') | Some('\t') | Some('\r'))
            || (self.r == Some('\n') && !self.semi)
        {
            self.next();
        }
    }

    fn text_from(&self, off: usize) -> String {
        String::from_utf8_lossy(&self.src[off..self.offset]).into_owned()
    }

    fn scan_identifier(&mut self) -> String {
        let off = self.offset;
        while matches!(self.r, Some(c) if c.is_alphanumeric() || c == '_') {
            self.next();
        }
        self.text_from(off)
    }

    fn scan_mantissa(&mut self) {
        while matches!(self.r, Some(c) if c.is_ascii_digit()) {
            self.next();
        }
    }

    fn scan_hex(&mut self) {
        while matches!(self.r, Some(c) if c.is_ascii_hexdigit()) {
            self.next();
        }
    }

    fn scan_number(&mut self) -> (TokenKind, Option<Literal>) {
        let off = self.offset;
        let mut kind = TokenKind::Int;

        self.scan_mantissa();

        // hexadecimal: the mantissa so far must be exactly "0"
        if matches!(self.r, Some('x') | Some('X'))
            && self.offset == off + 1
            && self.src[off] == b'0'
        {
            self.next();
            self.scan_hex();
        }

        // fraction
        if self.r == Some('.') {
            kind = TokenKind::Float;
            self.next();
            self.scan_mantissa();
        }

        // exponent
        if matches!(self.r, Some('e') | Some('E')) {
            kind = TokenKind::Float;
            self.next();
            if matches!(self.r, Some('-') | Some('+')) {
                self.next();
            }
            self.scan_mantissa();
        }

        if self.r == Some('i') {
            kind = TokenKind::Imaginary;
            self.next();
        }

        let text = self.text_from(off);
        match kind {
            TokenKind::Int => match parse_big_int(&text) {
                Some(v) => (kind, Some(Literal::Int(v))),
                None => {
                    self.errorf(format!("bad int literal: {:?}", text));
                    (TokenKind::Unknown, None)
                }
            },
            TokenKind::Float => match text.parse::<BigDecimal>() {
                Ok(v) => (kind, Some(Literal::Float(v))),
                Err(_) => {
                    self.errorf(format!("bad float literal: {:?}", text));
                    (TokenKind::Unknown, None)
                }
            },
            _ => {
                // drop the trailing 'i'
                match text[..text.len() - 1].parse::<BigDecimal>() {
                    Ok(v) => (kind, Some(Literal::Imaginary(v))),
                    Err(_) => {
                        self.errorf(format!("bad complex literal: {:?}", text));
                        (TokenKind::Unknown, None)
                    }
                }
            }
        }
    }

    /// Scan a double-quoted string. The opening quote has been
    /// consumed. Returns the raw text including both quotes and the
    /// unescaped value; escapes are validated either way.
    fn scan_string(&mut self, span_newlines: bool) -> (String, String) {
        let off = self.offset;
        loop {
            let r = self.r;
            if r.is_none() || (!span_newlines && r == Some('\n')) {
                self.errorf("string literal missing terminating '\"'");
                break;
            }
            self.next();
            if r == Some('\\') {
                if self.r == Some('"') {
                    self.next();
                }
            }
            if r == Some('"') {
                break;
            }
        }
        let end = self.offset.saturating_sub(1).max(off);
        let content = String::from_utf8_lossy(&self.src[off..end]).into_owned();
        match unquote_string(&content) {
            Ok(v) => (format!("\"{}\"", content), v),
            Err(e) => {
                self.errorf(format!("string literal {}", e));
                (format!("\"{}\"", content), String::new())
            }
        }
    }

    /// Scan a backtick-quoted raw string; the opening backtick has been
    /// consumed. Returns the content, which contains no escapes.
    fn scan_raw_string(&mut self) -> String {
        let off = self.offset;
        loop {
            let r = self.r;
            if r.is_none() {
                self.errorf("raw string literal not terminated");
                break;
            }
            self.next();
            if r == Some('`') {
                break;
            }
        }
        let end = self.offset.saturating_sub(1).max(off);
        String::from_utf8_lossy(&self.src[off..end]).into_owned()
    }

    fn scan_rune(&mut self) -> char {
        let off = self.offset;
        loop {
            let r = self.r;
            if r.is_none() || r == Some('\n') {
                self.errorf("character literal missing terminating \"'\"");
                break;
            }
            self.next();
            if r == Some('\\') {
                if self.r == Some('\'') {
                    self.next();
                }
            }
            if r == Some('\'') {
                break;
            }
        }
        let end = self.offset.saturating_sub(1).max(off);
        let content = String::from_utf8_lossy(&self.src[off..end]).into_owned();
        match unquote_char(&content) {
            Ok(v) => v,
            Err(e) => {
                self.errorf(format!("rune literal {}", e));
                '\u{FFFD}'
            }
        }
    }

    fn scan_comment(&mut self) -> String {
        let off = self.offset - 1; // already ate the first '/'

        if self.r == Some('/') {
            // single line "// comment"
            self.next();
            while self.r.is_some() && self.r != Some('\n') {
                self.next();
            }
        } else {
            // multi-line "/* comment */"
            self.next();
            let mut terminated = false;
            while let Some(r) = self.r {
                self.next();
                if r == '*' && self.r == Some('/') {
                    self.next();
                    terminated = true;
                    break;
                }
            }
            if !terminated {
                self.errorf("multi-line comment not terminated");
            }
        }

        self.text_from(off)
    }

    fn scan_shell_word(&mut self) -> String {
        let off = self.offset;
        loop {
            match self.r {
                Some('\\') => {
                    self.next();
                    self.next();
                }
                Some('$') => {
                    self.next();
                    match self.r {
                        Some('$') => {
                            // The shell word literal ran directly into
                            // the shell-exiting "$$", as in "ls$$".
                            // Return the word now; the scanner sits
                            // after the first '$', so latch the state
                            // and let the subsequent call emit the
                            // closing Shell token from the remaining
                            // '$'.
                            self.exiting_shell = true;
                            let end = self.offset.saturating_sub(1).max(off);
                            return String::from_utf8_lossy(&self.src[off..end]).into_owned();
                        }
                        Some('{') => {
                            // ${NAME} is one word segment. The scan
                            // runs to the first '}' without tracking
                            // escapes, like the source of truth.
                            while self.r.is_some() && self.r != Some('}') {
                                self.next();
                            }
                            self.next();
                        }
                        _ => {}
                    }
                }
                None
                | Some(' ')
                | Some('\t')
                | Some('\n')
                | Some('\r')
                | Some('|')
                | Some('&')
                | Some(';')
                | Some('<')
                | Some('>')
                | Some('(')
                | Some(')') => return self.text_from(off),
                _ => self.next(),
            }
        }
    }

    fn scan_single_quoted_shell_word(&mut self) -> String {
        let off = self.offset;
        loop {
            let r = self.r;
            if r.is_none() {
                self.errorf("single-quoted string missing terminating `'`");
                break;
            }
            self.next();
            if r == Some('\'') {
                break;
            }
        }
        format!("'{}", self.text_from(off))
    }

    fn next_in_shell(&mut self) -> (TokenKind, Option<Literal>) {
        if self.exiting_shell {
            debug_assert_eq!(self.r, Some('$'), "exiting_shell set while not mid-$$");
            self.next();
            self.exiting_shell = false;
            self.in_shell = false;
            self.semi = true;
            return (TokenKind::Shell, None);
        }
        match self.r {
            Some('$') => {
                self.next();
                if self.r == Some('$') {
                    self.next();
                    self.in_shell = false;
                    self.semi = true;
                    (TokenKind::Shell, None)
                } else {
                    self.semi = true;
                    let word = format!("${}", self.scan_shell_word());
                    (TokenKind::ShellWord, Some(Literal::Str(word)))
                }
            }
            Some('"') => {
                self.next();
                self.semi = true;
                let (raw, _) = self.scan_string(true);
                (TokenKind::ShellWord, Some(Literal::Str(raw)))
            }
            Some('\'') => {
                self.next();
                self.semi = true;
                let word = self.scan_single_quoted_shell_word();
                (TokenKind::ShellWord, Some(Literal::Str(word)))
            }
            Some('\n') => (TokenKind::ShellNewline, None),
            Some(';') => {
                self.next();
                (TokenKind::Semicolon, None)
            }
            Some('|') => {
                self.next();
                if self.r == Some('|') {
                    self.next();
                    (TokenKind::LogicalOr, None)
                } else {
                    (TokenKind::ShellPipe, None)
                }
            }
            Some('&') => {
                self.next();
                match self.r {
                    Some('&') => {
                        self.next();
                        (TokenKind::LogicalAnd, None)
                    }
                    Some('>') => {
                        self.next();
                        (TokenKind::AndGreater, None)
                    }
                    _ => (TokenKind::Ref, None),
                }
            }
            Some('<') => {
                self.next();
                (TokenKind::Less, None)
            }
            Some('>') => {
                self.next();
                match self.r {
                    Some('&') => {
                        self.next();
                        (TokenKind::GreaterAnd, None)
                    }
                    Some('>') => {
                        self.next();
                        (TokenKind::TwoGreater, None)
                    }
                    _ => (TokenKind::Greater, None),
                }
            }
            Some('(') => {
                self.next();
                (TokenKind::LeftParen, None)
            }
            Some(')') => {
                self.next();
                (TokenKind::RightParen, None)
            }
            None => {
                self.errorf("shell fragment missing terminating $$");
                (TokenKind::Eof, None)
            }
            _ => {
                self.semi = true;
                let word = self.scan_shell_word();
                (TokenKind::ShellWord, Some(Literal::Str(word)))
            }
        }
    }

    /// Advance to the next token. The first scan error latches on the
    /// scanner; once set, every subsequent call keeps surfacing it.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let was_semi = self.semi;
        self.semi = false;
        let pos = self.pos();
        let r = self.r;

        let (kind, literal) = if self.in_shell {
            self.next_in_shell()
        } else {
            match r {
                Some(c) if c.is_alphabetic() || c == '_' => {
                    let name = self.scan_identifier();
                    match keyword(&name) {
                        Some(kind) => {
                            if matches!(
                                kind,
                                TokenKind::Break
                                    | TokenKind::Continue
                                    | TokenKind::Fallthrough
                                    | TokenKind::Return
                            ) {
                                self.semi = true;
                            }
                            (kind, None)
                        }
                        None => {
                            self.semi = true;
                            (TokenKind::Ident, Some(Literal::Str(name)))
                        }
                    }
                }
                Some(c) if c.is_ascii_digit() => {
                    self.semi = true;
                    self.scan_number()
                }
                Some('\n') => {
                    self.semi = false;
                    (TokenKind::Semicolon, None)
                }
                _ => self.scan_operator(r, was_semi),
            }
        };

        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        Ok(Token::new(kind, pos, literal))
    }

    fn scan_operator(&mut self, r: Option<char>, was_semi: bool) -> (TokenKind, Option<Literal>) {
        self.next();
        let r = match r {
            Some(r) => r,
            None => {
                // A final newline-implied semicolon is still owed when
                // the input ends after a statement terminator.
                if was_semi {
                    return (TokenKind::Semicolon, None);
                }
                return (TokenKind::Eof, None);
            }
        };
        match r {
            '(' => (TokenKind::LeftParen, None),
            ')' => {
                self.semi = true;
                (TokenKind::RightParen, None)
            }
            '[' => (TokenKind::LeftBracket, None),
            ']' => {
                self.semi = true;
                (TokenKind::RightBracket, None)
            }
            '{' => {
                if self.r == Some('|') {
                    self.next();
                    (TokenKind::LeftBraceTable, None)
                } else {
                    (TokenKind::LeftBrace, None)
                }
            }
            '}' => {
                self.semi = true;
                (TokenKind::RightBrace, None)
            }
            ',' => (TokenKind::Comma, None),
            ';' => (TokenKind::Semicolon, None),
            '"' => {
                self.semi = true;
                let (_, value) = self.scan_string(false);
                (TokenKind::String, Some(Literal::Str(value)))
            }
            '\'' => {
                self.semi = true;
                let value = self.scan_rune();
                (TokenKind::Rune, Some(Literal::Rune(value)))
            }
            '`' => {
                self.semi = true;
                let value = self.scan_raw_string();
                (TokenKind::String, Some(Literal::Str(value)))
            }
            '.' => {
                if self.r == Some('.') {
                    self.next();
                    if self.r == Some('.') {
                        self.next();
                        (TokenKind::Ellipsis, None)
                    } else {
                        self.errorf("expected '...'");
                        (TokenKind::Unknown, None)
                    }
                } else {
                    (TokenKind::Period, None)
                }
            }
            ':' => {
                if self.r == Some('=') {
                    self.next();
                    (TokenKind::Define, None)
                } else {
                    (TokenKind::Colon, None)
                }
            }
            '+' => match self.r {
                Some('=') => {
                    self.next();
                    (TokenKind::AddAssign, None)
                }
                Some('+') => {
                    self.next();
                    self.semi = true;
                    (TokenKind::Inc, None)
                }
                _ => (TokenKind::Add, None),
            },
            '-' => match self.r {
                Some('=') => {
                    self.next();
                    (TokenKind::SubAssign, None)
                }
                Some('-') => {
                    self.next();
                    self.semi = true;
                    (TokenKind::Dec, None)
                }
                _ => (TokenKind::Sub, None),
            },
            '=' => {
                if self.r == Some('=') {
                    self.next();
                    (TokenKind::Equal, None)
                } else {
                    (TokenKind::Assign, None)
                }
            }
            '*' => {
                if self.r == Some('=') {
                    self.next();
                    (TokenKind::MulAssign, None)
                } else {
                    (TokenKind::Mul, None)
                }
            }
            '/' => match self.r {
                Some('/') | Some('*') => {
                    // A newline after the comment inserts a semicolon
                    // iff the token before the comment would have.
                    self.semi = was_semi;
                    let text = self.scan_comment();
                    (TokenKind::Comment, Some(Literal::Str(text)))
                }
                Some('=') => {
                    self.next();
                    (TokenKind::DivAssign, None)
                }
                _ => (TokenKind::Div, None),
            },
            '%' => {
                if self.r == Some('=') {
                    self.next();
                    (TokenKind::RemAssign, None)
                } else {
                    (TokenKind::Rem, None)
                }
            }
            '^' => {
                if self.r == Some('=') {
                    self.next();
                    (TokenKind::PowAssign, None)
                } else {
                    (TokenKind::Pow, None)
                }
            }
            '>' => match self.r {
                Some('=') => {
                    self.next();
                    (TokenKind::GreaterEqual, None)
                }
                Some('>') => {
                    self.next();
                    (TokenKind::TwoGreater, None)
                }
                _ => (TokenKind::Greater, None),
            },
            '<' => match self.r {
                Some('-') => {
                    self.next();
                    (TokenKind::ChanOp, None)
                }
                Some('=') => {
                    self.next();
                    (TokenKind::LessEqual, None)
                }
                Some('<') => {
                    self.next();
                    (TokenKind::TwoLess, None)
                }
                _ => (TokenKind::Less, None),
            },
            '&' => match self.r {
                Some('&') => {
                    self.next();
                    (TokenKind::LogicalAnd, None)
                }
                Some('^') => {
                    self.next();
                    (TokenKind::RefPow, None)
                }
                _ => (TokenKind::Ref, None),
            },
            '$' => {
                if self.r == Some('$') {
                    self.next();
                    self.in_shell = true;
                    (TokenKind::Shell, None)
                } else {
                    self.errorf("unexpected '$'");
                    (TokenKind::Unknown, None)
                }
            }
            '|' => match self.r {
                Some('|') => {
                    self.next();
                    (TokenKind::LogicalOr, None)
                }
                Some('}') => {
                    self.next();
                    self.semi = true;
                    (TokenKind::RightBraceTable, None)
                }
                _ => (TokenKind::Pipe, None),
            },
            '!' => {
                if self.r == Some('=') {
                    self.next();
                    (TokenKind::NotEqual, None)
                } else {
                    (TokenKind::Not, None)
                }
            }
            _ => {
                self.errorf(format!("unexpected character {:?}", r));
                (TokenKind::Unknown, Some(Literal::Str(r.to_string())))
            }
        }
    }
}

/// Decode the first rune of `bytes`. `None` for an invalid sequence.
fn decode_rune(bytes: &[u8]) -> Option<(char, usize)> {
    let b = bytes[0];
    if b < 0x80 {
        return Some((b as char, 1));
    }
    let width = match b {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return None,
    };
    if bytes.len() < width {
        return None;
    }
    let s = std::str::from_utf8(&bytes[..width]).ok()?;
    s.chars().next().map(|c| (c, width))
}

fn parse_big_int(text: &str) -> Option<BigInt> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        BigInt::parse_bytes(hex.as_bytes(), 16)
    } else {
        BigInt::parse_bytes(text.as_bytes(), 10)
    }
}
