//! The shell sub-grammar.
//!
//! Entered when the scanner reports the opening `$$`. Lists split on
//! newlines; and-or groups split on `;` and `&` (the latter marking the
//! group as background); pipelines chain with `&&`/`||`, recording each
//! separator; commands join with `|`. A parenthesised subshell holds a
//! nested list. `NAME=value` words before the first argument become
//! assignments on the simple command, and a numeric word directly
//! before a redirection operator becomes its file descriptor.

use super::Parser;
use crate::ast::shell::{
    Shell, ShellAndOr, ShellAssign, ShellCmd, ShellList, ShellPipeline, ShellRedirect,
    ShellSimpleCmd,
};
use crate::ast::{Expr, ExprKind};
use crate::error::Result;
use crate::lexer::token::TokenKind;

impl Parser {
    /// Parse a whole `$$ … $$` fragment. The current token is the
    /// opening `Shell` delimiter. `trap_out` is set when the fragment
    /// appears in value position, where its stdout is captured.
    pub(super) fn parse_shell(&mut self, trap_out: bool) -> Result<Expr> {
        let pos = self.tok.pos;
        self.advance()?;

        let mut cmds = Vec::new();
        loop {
            while self.tok.kind == TokenKind::ShellNewline {
                self.advance()?;
            }
            if self.tok.kind == TokenKind::Shell {
                break;
            }
            let list = self.shell_list(false)?;
            if !list.andor.is_empty() {
                cmds.push(list);
            }
        }
        self.advance()?; // closing $$

        Ok(self.mkexpr(
            pos,
            ExprKind::Shell(Shell {
                cmds,
                trap_out,
                elide_error: false,
                free_vars: Vec::new(),
            }),
        ))
    }

    fn shell_list_end(&self, in_subshell: bool) -> bool {
        match self.tok.kind {
            TokenKind::Shell | TokenKind::Eof => true,
            TokenKind::RightParen => in_subshell,
            TokenKind::ShellNewline => !in_subshell,
            _ => false,
        }
    }

    fn shell_list(&mut self, in_subshell: bool) -> Result<ShellList> {
        let mut list = ShellList::default();
        loop {
            if self.shell_list_end(in_subshell) {
                break;
            }
            list.andor.push(self.shell_andor()?);
            match self.tok.kind {
                // a newline directly after a separator continues the
                // same list
                TokenKind::Semicolon => {
                    self.advance()?;
                    while self.tok.kind == TokenKind::ShellNewline {
                        self.advance()?;
                    }
                }
                TokenKind::Ref => {
                    if let Some(last) = list.andor.last_mut() {
                        last.background = true;
                    }
                    self.advance()?;
                    while self.tok.kind == TokenKind::ShellNewline {
                        self.advance()?;
                    }
                }
                TokenKind::ShellNewline if in_subshell => {
                    // inside a subshell a newline separates and-or
                    // groups like `;`
                    while self.tok.kind == TokenKind::ShellNewline {
                        self.advance()?;
                    }
                }
                _ => break,
            }
        }
        Ok(list)
    }

    fn shell_andor(&mut self) -> Result<ShellAndOr> {
        let mut andor = ShellAndOr {
            pipeline: vec![self.shell_pipeline()?],
            ..ShellAndOr::default()
        };
        while matches!(self.tok.kind, TokenKind::LogicalAnd | TokenKind::LogicalOr) {
            andor.sep.push(self.tok.kind);
            self.advance()?;
            while self.tok.kind == TokenKind::ShellNewline {
                self.advance()?;
            }
            andor.pipeline.push(self.shell_pipeline()?);
        }
        Ok(andor)
    }

    fn shell_pipeline(&mut self) -> Result<ShellPipeline> {
        let mut pipeline = ShellPipeline::default();
        if self.tok.kind == TokenKind::ShellWord && self.tok.text() == "!" {
            pipeline.bang = true;
            self.advance()?;
        }
        pipeline.cmd.push(self.shell_cmd()?);
        while self.tok.kind == TokenKind::ShellPipe {
            self.advance()?;
            while self.tok.kind == TokenKind::ShellNewline {
                self.advance()?;
            }
            pipeline.cmd.push(self.shell_cmd()?);
        }
        Ok(pipeline)
    }

    fn shell_cmd(&mut self) -> Result<ShellCmd> {
        if self.tok.kind == TokenKind::LeftParen {
            self.advance()?;
            while self.tok.kind == TokenKind::ShellNewline {
                self.advance()?;
            }
            let list = self.shell_list(true)?;
            if self.tok.kind != TokenKind::RightParen {
                return Err(self.unexpected(")"));
            }
            self.advance()?;
            return Ok(ShellCmd::Subshell(Box::new(list)));
        }
        Ok(ShellCmd::Simple(self.shell_simple_cmd()?))
    }

    fn shell_simple_cmd(&mut self) -> Result<ShellSimpleCmd> {
        let mut cmd = ShellSimpleCmd::default();
        loop {
            match self.tok.kind {
                TokenKind::ShellWord => {
                    let word = self.tok.text().to_string();
                    if cmd.args.is_empty() && cmd.redirect.is_empty() {
                        if let Some((key, value)) = split_assign(&word) {
                            cmd.assign.push(ShellAssign { key, value });
                            self.advance()?;
                            continue;
                        }
                    }
                    cmd.args.push(word);
                    self.advance()?;
                }
                TokenKind::Less
                | TokenKind::Greater
                | TokenKind::TwoGreater
                | TokenKind::GreaterAnd
                | TokenKind::AndGreater => {
                    let token = self.tok.kind;
                    // a numeric word directly before the operator is
                    // the file descriptor, as in 2>&1
                    let number = match cmd.args.last() {
                        Some(arg) => arg.parse::<i64>().ok(),
                        None => None,
                    };
                    if number.is_some() {
                        cmd.args.pop();
                    }
                    self.advance()?;
                    if self.tok.kind != TokenKind::ShellWord {
                        return Err(self.unexpected("redirection target"));
                    }
                    let filename = self.tok.text().to_string();
                    self.advance()?;
                    cmd.redirect.push(ShellRedirect {
                        number,
                        token,
                        filename,
                    });
                }
                _ => break,
            }
        }
        if cmd.args.is_empty() && cmd.assign.is_empty() && cmd.redirect.is_empty() {
            return Err(self.unexpected("shell command"));
        }
        Ok(cmd)
    }
}

/// Split a `NAME=value` word; the name must look like an identifier.
fn split_assign(word: &str) -> Option<(String, String)> {
    let eq = word.find('=')?;
    if eq == 0 {
        return None;
    }
    let name = &word[..eq];
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_string(), word[eq + 1..].to_string()))
}
