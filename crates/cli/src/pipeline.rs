//! Pipeline for translating ebb files.

use std::fs;
use std::path::Path;

use ebb_codegen::error::CodegenError;
use ebb_codegen::format::{Formatter, Gofmt, Passthrough};
use ebb_codegen::generate;
use ebb_parser::semantic::loader::MapLoader;

/// Translate `file` and write the result to `output` or stdout.
pub fn gen_file(
    file: &Path,
    package: &str,
    output: Option<&Path>,
    no_format: bool,
) -> Result<(), CodegenError> {
    let loader = MapLoader::with_std();
    let formatter: Box<dyn Formatter> = if no_format {
        Box::new(Passthrough)
    } else {
        Box::new(Gofmt)
    };

    let out = generate(file, package, &loader, formatter.as_ref())?;
    match output {
        Some(path) => fs::write(path, out)?,
        None => print!("{}", String::from_utf8_lossy(&out)),
    }
    Ok(())
}
