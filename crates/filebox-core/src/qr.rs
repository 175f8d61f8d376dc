//! QR code rendering for QR payload handles, and decoding from images.

use qrcode::render::{svg, unicode};
use qrcode::QrCode;

use crate::error::{FileBoxError, Result};

/// Display name of a rendered QR payload.
pub const QR_FILENAME: &str = "qrcode.svg";

/// Render `payload` as an SVG document.
pub fn render_svg(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build())
}

/// Render `payload` with half-block characters for a terminal.
pub fn render_terminal(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

/// Text of the first QR code found in an encoded image (PNG or JPEG).
pub fn decode_image(bytes: &[u8]) -> Result<String> {
    let gray = image::load_from_memory(bytes)?.into_luma8();
    let (width, height) = gray.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| gray.get_pixel(x as u32, y as u32).0[0],
    );
    let grid = prepared
        .detect_grids()
        .into_iter()
        .next()
        .ok_or_else(|| FileBoxError::QrDecode("no QR code in image".into()))?;
    let (_, content) = grid
        .decode()
        .map_err(|e| FileBoxError::QrDecode(format!("{e:?}")))?;
    Ok(content)
}

#[cfg(test)]
pub(crate) fn render_png(payload: &str) -> Vec<u8> {
    use qrcode::Color;

    const MODULE: u32 = 8;
    const QUIET: u32 = 4;
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let width = code.width() as u32;
    let colors = code.to_colors();
    let side = (width + 2 * QUIET) * MODULE;
    let img = image::GrayImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / MODULE, y / MODULE);
        let dark = mx >= QUIET
            && my >= QUIET
            && mx < width + QUIET
            && my < width + QUIET
            && colors[((my - QUIET) * width + (mx - QUIET)) as usize] == Color::Dark;
        image::Luma([if dark { 0 } else { 255 }])
    });
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
