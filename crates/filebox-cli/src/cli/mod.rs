//! CLI for FileBox handles.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use filebox_core::{config, FileBoxConfig, Headers};

use commands::{print_qr, run_fetch, run_info, run_json, run_qr, run_restore};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "filebox")]
#[command(about = "FileBox: fetch, inspect and hand off files as portable handles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL to disk (chunked range requests when the server allows).
    Fetch {
        /// Direct HTTP/HTTPS URL.
        url: String,
        /// Output path (default: the resolved file name in the current directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Replace the output file if it exists.
        #[arg(long)]
        overwrite: bool,
        /// Extra request header, `Name: value`. May be repeated.
        #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Always use one GET, never range requests.
        #[arg(long)]
        no_slice: bool,
    },

    /// Resolve a URL and print what the server says about it.
    Info {
        url: String,
        #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Print the portable JSON record of a local file.
    Json {
        path: PathBuf,
        /// Name stored in the record (default: the file's base name).
        #[arg(long)]
        name: Option<String>,
    },

    /// Write the payload of a JSON record (from `filebox json`) to disk.
    Restore {
        /// File holding the JSON record.
        record: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
    },

    /// Render text as a QR code SVG.
    Qr {
        text: String,
        /// Output path (default: qrcode.svg).
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
        /// Draw the code in the terminal instead of writing a file.
        #[arg(long, conflicts_with_all = ["output", "overwrite"])]
        print: bool,
    },
}

/// `Name: value` → (`Name`, `value`).
pub(crate) fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header must look like `Name: value`, got {raw:?}");
    };
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        bail!("invalid header name in {raw:?}");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn into_headers(pairs: Vec<(String, String)>) -> Headers {
    pairs.into_iter().collect()
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init().unwrap_or_else(|e| {
            tracing::warn!("config file unavailable, using defaults and environment: {:#}", e);
            FileBoxConfig::from_env()
        });
        tracing::debug!("loaded config: {:?}", cfg);
        cli.command.run(cfg).await
    }

    pub async fn run(self, cfg: FileBoxConfig) -> Result<()> {
        match self {
            CliCommand::Fetch {
                url,
                output,
                overwrite,
                headers,
                no_slice,
            } => {
                let cfg = FileBoxConfig {
                    no_slice_down: cfg.no_slice_down || no_slice,
                    ..cfg
                };
                let path = run_fetch(
                    &url,
                    into_headers(headers),
                    Arc::new(cfg),
                    output.as_deref(),
                    overwrite,
                )
                .await?;
                println!("{}", path.display());
            }
            CliCommand::Info { url, headers } => {
                run_info(&url, into_headers(headers), Arc::new(cfg)).await?
            }
            CliCommand::Json { path, name } => {
                println!("{}", run_json(&path, name.as_deref()).await?)
            }
            CliCommand::Restore {
                record,
                output,
                overwrite,
            } => {
                let path = run_restore(&record, Arc::new(cfg), output.as_deref(), overwrite).await?;
                println!("{}", path.display());
            }
            CliCommand::Qr { text, print: true, .. } => print_qr(&text)?,
            CliCommand::Qr {
                text,
                output,
                overwrite,
                ..
            } => {
                let path = run_qr(&text, output.as_deref(), overwrite).await?;
                println!("{}", path.display());
            }
        }
        Ok(())
    }
}
