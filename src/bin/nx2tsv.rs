//! Standalone converter: nx-TAS capture log → .tsv script.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert an nx-TAS capture log into a .tsv script")]
struct Cli {
    /// Input capture log
    input: PathBuf,
    /// Output .tsv script
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let input = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;
    let tsv = tsv_tas::convert::convert(&input)?;
    std::fs::write(&args.output, tsv)
        .with_context(|| format!("Writing {}", args.output.display()))?;
    Ok(())
}
