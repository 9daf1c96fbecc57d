//! Escape-sequence validation for string and rune literals.
//!
//! The escape grammar follows the host language: `\a \b \f \n \r \t
//! \v \\ \' \"`, two-digit hex `\xhh`, three-digit octal, and the
//! Unicode forms `\uhhhh` and `\Uhhhhhhhh`.

pub fn unquote_string(content: &str) -> Result<String, String> {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(unquote_escape(&mut chars, '"')?);
    }
    Ok(out)
}

pub fn unquote_char(content: &str) -> Result<char, String> {
    let mut chars = content.chars().peekable();
    let c = match chars.next() {
        Some('\\') => unquote_escape(&mut chars, '\'')?,
        Some(c) => c,
        None => return Err("empty character literal".to_string()),
    };
    if chars.next().is_some() {
        return Err("too many characters".to_string());
    }
    Ok(c)
}

fn unquote_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
) -> Result<char, String> {
    let c = chars.next().ok_or("trailing backslash")?;
    let v = match c {
        'a' => '\u{7}',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{b}',
        '\\' => '\\',
        'x' => return hex_escape(chars, 2),
        'u' => return hex_escape(chars, 4),
        'U' => return hex_escape(chars, 8),
        '0'..='7' => {
            let mut v = c as u32 - '0' as u32;
            for _ in 0..2 {
                match chars.next() {
                    Some(d @ '0'..='7') => v = v * 8 + (d as u32 - '0' as u32),
                    _ => return Err("invalid octal escape".to_string()),
                }
            }
            char::from_u32(v).ok_or("invalid octal escape")?
        }
        c if c == quote => quote,
        _ => return Err(format!("unknown escape \\{}", c)),
    };
    Ok(v)
}

fn hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: u32,
) -> Result<char, String> {
    let mut v: u32 = 0;
    for _ in 0..digits {
        let d = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or("invalid hex escape")?;
        v = v * 16 + d;
    }
    char::from_u32(v).ok_or_else(|| "escape is not a valid code point".to_string())
}
