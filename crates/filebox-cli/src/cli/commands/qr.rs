//! `filebox qr <text>` – write a QR code SVG, or draw it in the terminal.

use std::path::{Path, PathBuf};

use anyhow::Result;
use filebox_core::{qr, FileBox};

pub async fn run_qr(text: &str, output: Option<&Path>, overwrite: bool) -> Result<PathBuf> {
    let fb = FileBox::from_qr_code(text)?;
    Ok(fb.to_file(output, overwrite).await?)
}

pub fn print_qr(text: &str) -> Result<()> {
    print!("{}", qr::render_terminal(text)?);
    Ok(())
}
