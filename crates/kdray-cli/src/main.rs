//! kdray CLI - interactive ray tracer front end
//!
//! Reads scene commands from a script file or from stdin and renders
//! images to PPM or PNG.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::interpreter::Interpreter;

mod interpreter;
mod output;

#[derive(Parser)]
#[command(name = "kdray")]
#[command(about = "KD-tree accelerated ray tracer", long_about = None)]
struct Cli {
    /// Scene script to run; reads commands from stdin when omitted
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut interpreter = Interpreter::new();

    match cli.script {
        Some(path) => interpreter.run_file(&path)?,
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            interpreter.run(stdin.lock(), interactive)?;
        }
    }

    Ok(())
}
