use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .tsv script
    pub input: PathBuf,
    /// Output file (binary frame stream, or text lines with --text)
    pub output: PathBuf,
    /// Also dump a <output>-debug.csv of the frame table
    #[arg(short, long)]
    pub debug: bool,
    /// Upload the finished file via FTP (reads ftp_config.json)
    #[arg(short, long)]
    pub ftp: bool,
    /// Emit nx-TAS text lines instead of the binary stream
    #[arg(long)]
    pub text: bool,
    /// Drop frames identical to the neutral frame
    #[arg(long)]
    pub remove_empty: bool,
}
