//! QR code rendering for approved passes
//!
//! Approved out-passes carry their QR image inline as a PNG data URL, so
//! clients need no extra round trip to show a scannable gate pass. The
//! image is grayscale, 8 pixels per module, with the standard 4-module
//! quiet zone.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use png::{BitDepth, ColorType, Encoder};
use qrcode::{Color, QrCode};
use thiserror::Error;

const MODULE_PIXELS: usize = 8;
const QUIET_MODULES: usize = 4;

#[derive(Error, Debug)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

/// Render `payload` as a PNG data URL
pub fn qr_data_url(payload: &str) -> Result<String, QrError> {
    let png = qr_png(payload)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

fn qr_png(payload: &str) -> Result<Vec<u8>, QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    let modules = code.width();
    let colors = code.to_colors();

    let side = (modules + 2 * QUIET_MODULES) * MODULE_PIXELS;
    let mut pixels = vec![0xffu8; side * side];
    for y in 0..modules {
        for x in 0..modules {
            if colors[y * modules + x] != Color::Dark {
                continue;
            }
            let left = (QUIET_MODULES + x) * MODULE_PIXELS;
            for dy in 0..MODULE_PIXELS {
                let row = ((QUIET_MODULES + y) * MODULE_PIXELS + dy) * side;
                pixels[row + left..row + left + MODULE_PIXELS].fill(0x00);
            }
        }
    }

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out, side as u32, side as u32);
    encoder.set_color(ColorType::Grayscale);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    writer.finish()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_is_png() {
        let url = qr_data_url("outpass:pass:abc123").unwrap();
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[test]
    fn test_image_is_square_with_quiet_zone() {
        let bytes = qr_png("outpass:pass:abc123").unwrap();
        // IHDR width and height start at offset 16
        let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        assert_eq!(width, height);
        assert!(width >= (2 * QUIET_MODULES * MODULE_PIXELS) as u32);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = qr_data_url("outpass:pass:same").unwrap();
        let b = qr_data_url("outpass:pass:same").unwrap();
        assert_eq!(a, b);
    }
}
