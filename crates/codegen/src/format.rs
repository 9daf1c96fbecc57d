//! The canonical-formatter contract.
//!
//! The emitter's output is always passed through a formatter. `Gofmt`
//! shells out to the real tool; `Passthrough` is for tests and for
//! debugging unformatted output.

use std::io::Write;
use std::process::{Command, Stdio};

pub trait Formatter {
    /// Canonicalise host-language source, or report a syntax error.
    fn format(&self, src: &[u8]) -> Result<Vec<u8>, String>;
}

/// Runs the `gofmt` binary.
pub struct Gofmt;

impl Formatter for Gofmt {
    fn format(&self, src: &[u8]) -> Result<Vec<u8>, String> {
        let mut child = Command::new("gofmt")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("spawning gofmt: {}", e))?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(src)
                .map_err(|e| format!("writing to gofmt: {}", e))?;
        }
        let out = child
            .wait_with_output()
            .map_err(|e| format!("waiting for gofmt: {}", e))?;
        if !out.status.success() {
            return Err(String::from_utf8_lossy(&out.stderr).into_owned());
        }
        Ok(out.stdout)
    }
}

/// Returns the source unchanged.
pub struct Passthrough;

impl Formatter for Passthrough {
    fn format(&self, src: &[u8]) -> Result<Vec<u8>, String> {
        Ok(src.to_vec())
    }
}
