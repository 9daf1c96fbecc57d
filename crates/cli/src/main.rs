mod cli;
mod pipeline;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();
    let result = match &args.command {
        Commands::Gen {
            file,
            package,
            output,
            no_format,
        } => pipeline::gen_file(file, package, output.as_deref(), *no_format),
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
