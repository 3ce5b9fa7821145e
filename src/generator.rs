// SPDX-License-Identifier: GPL-3.0-only

//! QR code generation
//!
//! Matrix encoding is delegated to the `qrcode` crate; this module only
//! rasterizes the modules into an image with a quiet zone.

use crate::constants::generator::QUIET_ZONE_MODULES;
use crate::errors::GenerateError;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use std::io::Cursor;
use tracing::debug;

/// Render `text` as a square greyscale QR image
///
/// The symbol is scaled by a whole number of pixels per module so edges
/// stay crisp; the result is the largest such image not exceeding `size`,
/// but never smaller than one pixel per module.
pub fn generate_qr_image(text: &str, size: u32) -> Result<GrayImage, GenerateError> {
    if text.is_empty() {
        return Err(GenerateError::EmptyInput);
    }

    let code = QrCode::new(text.as_bytes()).map_err(|e| match e {
        QrError::DataTooLong => GenerateError::DataTooLong,
        other => GenerateError::Encode(other.to_string()),
    })?;

    let modules = code.width() as u32;
    let total = modules + 2 * QUIET_ZONE_MODULES;
    let scale = (size / total).max(1);
    let edge = total * scale;

    let mut img = GrayImage::from_pixel(edge, edge, Luma([255u8]));
    for (index, color) in code.to_colors().iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let x0 = (index as u32 % modules + QUIET_ZONE_MODULES) * scale;
        let y0 = (index as u32 / modules + QUIET_ZONE_MODULES) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(x0 + dx, y0 + dy, Luma([0u8]));
            }
        }
    }

    debug!(chars = text.len(), modules, edge, "Generated QR image");
    Ok(img)
}

/// Render `text` as PNG bytes
pub fn generate_qr_png(text: &str, size: u32) -> Result<Vec<u8>, GenerateError> {
    let img = generate_qr_image(text, size)?;
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| GenerateError::Image(e.to_string()))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_is_square_with_quiet_zone() {
        let img = generate_qr_image("hello", 512).unwrap();
        assert_eq!(img.width(), img.height());
        assert!(img.width() <= 512);
        // Quiet zone corner is light, finder pattern corner is dark
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        let scale = img.width() / (21 + 2 * QUIET_ZONE_MODULES);
        let finder = QUIET_ZONE_MODULES * scale;
        assert_eq!(img.get_pixel(finder, finder).0[0], 0);
    }

    #[test]
    fn test_tiny_size_still_renders_every_module() {
        let img = generate_qr_image("hello", 1).unwrap();
        assert_eq!(img.width(), 21 + 2 * QUIET_ZONE_MODULES);
    }

    #[test]
    fn test_empty_text_rejected() {
        assert_eq!(generate_qr_image("", 512), Err(GenerateError::EmptyInput));
    }

    #[test]
    fn test_oversized_text_rejected() {
        let text = "x".repeat(8000);
        assert_eq!(generate_qr_image(&text, 512), Err(GenerateError::DataTooLong));
    }

    #[test]
    fn test_png_has_signature() {
        let png = generate_qr_png("https://example.com", 128).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
