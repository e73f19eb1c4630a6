pub mod cli;
pub mod compiler;
pub mod convert;
pub mod error;
pub mod model;
pub mod upload;
pub mod writer;

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // 1. ── Read & compile ─────────────────────────────────────────────
    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;

    let opts = compiler::Options {
        mode: if args.text {
            compiler::OutputMode::Text
        } else {
            compiler::OutputMode::Binary
        },
        remove_empty: args.remove_empty,
    };
    let script = compiler::compile(&source, &opts).context("Compiling script")?;
    info!("compiled {} frames", script.frames.len());

    // 2. ── Write outputs ──────────────────────────────────────────────
    if args.debug {
        let mut name = OsString::from(args.output.as_os_str());
        name.push("-debug.csv");
        writer::csv::emit(&script, &PathBuf::from(name)).context("Writing debug CSV")?;
    }

    match opts.mode {
        compiler::OutputMode::Binary => writer::bin::emit(&script, &args.output)?,
        compiler::OutputMode::Text => writer::text::emit(&script, &args.output)?,
    }
    println!("Script successfully generated");

    // 3. ── Optional upload ────────────────────────────────────────────
    if args.ftp {
        upload::send(&args.output).context("Uploading script")?;
        println!("Script successfully uploaded");
    }

    Ok(())
}
