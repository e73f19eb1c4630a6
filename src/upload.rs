//! FTP upload of the finished script to the console.

use std::path::Path;

use anyhow::Context;
use log::info;
use serde::Deserialize;
use suppaftp::FtpStream;

const CONFIG_FILE: &str = "ftp_config.json";

#[derive(Debug, Deserialize)]
struct FtpConfig {
    ip: String,
    port: String,
    user: String,
    passwd: String,
}

/// Store the output file under `scripts/` on the target. Runs strictly
/// after the local file is complete.
pub fn send(outfile: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(CONFIG_FILE)
        .with_context(|| format!("Reading {CONFIG_FILE}"))?;
    let config: FtpConfig =
        serde_json::from_str(&raw).with_context(|| format!("Parsing {CONFIG_FILE}"))?;
    let port: u16 = config
        .port
        .parse()
        .with_context(|| format!("Invalid FTP port `{}`", config.port))?;

    let name = outfile
        .file_name()
        .and_then(|n| n.to_str())
        .context("Output path has no file name")?;

    let mut ftp = FtpStream::connect((config.ip.as_str(), port))
        .with_context(|| format!("Connecting to {}:{port}", config.ip))?;
    ftp.login(&config.user, &config.passwd).context("FTP login")?;
    let mut file = std::fs::File::open(outfile)
        .with_context(|| format!("Opening {}", outfile.display()))?;
    ftp.put_file(format!("scripts/{name}"), &mut file)
        .context("FTP upload")?;
    ftp.quit().ok();

    info!("uploaded scripts/{name}");
    Ok(())
}
