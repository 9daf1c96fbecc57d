//! Command-line interface for ebb.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ebb - translate shell-integrated scripts into Go
#[derive(Parser)]
#[command(name = "ebb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate one ebb file into a Go package
    Gen {
        /// Path to the ebb file
        file: PathBuf,

        /// Output package name (default: gengo_<basename>)
        #[arg(short, long, default_value = "")]
        package: String,

        /// Write the Go source here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the gofmt canonicalisation pass
        #[arg(long)]
        no_format: bool,
    },
}
