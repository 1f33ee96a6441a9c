use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::QrCode;
use thiserror::Error;

/// Pixel size of one QR module.
const MODULE_PX: u32 = 10;

#[derive(Debug, Error)]
pub enum QrEncodeError {
    #[error("could not encode QR code: {0}")]
    Encode(#[from] QrError),
    #[error("could not write QR image: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders `text` as a black-on-white PNG QR code with the standard quiet zone.
pub fn encode_png(text: &str) -> Result<Vec<u8>, QrEncodeError> {
    let code = QrCode::new(text.as_bytes())?;
    let image = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PX, MODULE_PX)
        .build();

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}
