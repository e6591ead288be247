use std::io::Cursor;

use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use ndarray::{ArrayD, IxDyn};

use crate::models::error::AppError;

pub fn load_image(data: &[u8]) -> Result<DynamicImage, AppError> {
    image::load_from_memory(data).map_err(|e| AppError::InvalidImage(e.to_string()))
}

/// Reads `(width, height)` from the header without decoding pixels.
pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32), AppError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::InvalidImage(e.to_string()))?
        .into_dimensions()
        .map_err(|e| AppError::InvalidImage(e.to_string()))
}

/// Gray → `(rows, cols)`; gray+alpha, RGB and RGBA → `(rows, cols, channels)`.
/// Deeper sample types are reduced to 8 bits.
pub fn to_array(img: &DynamicImage) -> Result<ArrayD<u8>, AppError> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let color = img.color();
    let (shape, raw) = match (color.has_color(), color.has_alpha()) {
        (false, false) => (vec![height, width], img.to_luma8().into_raw()),
        (false, true) => (vec![height, width, 2], img.to_luma_alpha8().into_raw()),
        (true, false) => (vec![height, width, 3], img.to_rgb8().into_raw()),
        (true, true) => (vec![height, width, 4], img.to_rgba8().into_raw()),
    };
    ArrayD::from_shape_vec(IxDyn(&shape), raw).map_err(|e| AppError::Internal(e.to_string()))
}

pub fn from_array(arr: &ArrayD<u8>) -> Result<DynamicImage, AppError> {
    let shape = arr.shape().to_vec();
    let raw: Vec<u8> = arr.iter().copied().collect();
    let mismatch = || AppError::Internal(format!("pixel buffer does not fit shape {:?}", shape));
    let img = match *shape.as_slice() {
        [rows, cols] | [rows, cols, 1] => DynamicImage::ImageLuma8(
            GrayImage::from_raw(cols as u32, rows as u32, raw).ok_or_else(mismatch)?,
        ),
        [rows, cols, 2] => DynamicImage::ImageLumaA8(
            GrayAlphaImage::from_raw(cols as u32, rows as u32, raw).ok_or_else(mismatch)?,
        ),
        [rows, cols, 3] => DynamicImage::ImageRgb8(
            RgbImage::from_raw(cols as u32, rows as u32, raw).ok_or_else(mismatch)?,
        ),
        [rows, cols, 4] => DynamicImage::ImageRgba8(
            RgbaImage::from_raw(cols as u32, rows as u32, raw).ok_or_else(mismatch)?,
        ),
        _ => return Err(mismatch()),
    };
    Ok(img)
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, AppError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("PNG encode error: {}", e)))?;
    Ok(buf.into_inner())
}
