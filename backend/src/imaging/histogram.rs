use image::GrayImage;
use imageproc::contrast::equalize_histogram;
use ndarray::{ArrayD, ArrayViewD, Axis, Ix2};
use serde::Serialize;

use super::is_color_sample;
use crate::models::error::AppError;
use crate::spectral::pipeline::validate;

#[derive(Debug, Clone, Serialize)]
pub struct HistogramData {
    pub r: Vec<u32>,
    pub g: Vec<u32>,
    pub b: Vec<u32>,
    pub lum: Vec<u32>,
}

/// Equalizes every colour channel independently. Alpha is copied through.
pub fn equalize(image: ArrayViewD<'_, u8>) -> Result<ArrayD<u8>, AppError> {
    let layout = validate(&image, 1)?;
    let mut out = image.to_owned();

    if layout.channels.is_none() {
        equalize_plane(&mut out.view_mut())?;
        return Ok(out);
    }
    for (ch, mut plane) in out.axis_iter_mut(Axis(2)).enumerate() {
        if is_color_sample(&layout, ch) {
            equalize_plane(&mut plane)?;
        }
    }
    Ok(out)
}

fn equalize_plane(plane: &mut ndarray::ArrayViewMutD<'_, u8>) -> Result<(), AppError> {
    let (rows, cols) = (plane.shape()[0], plane.shape()[1]);
    let raw: Vec<u8> = plane.iter().copied().collect();
    let gray = GrayImage::from_raw(cols as u32, rows as u32, raw)
        .ok_or_else(|| AppError::Internal("channel buffer does not fit image".to_string()))?;
    let equalized = equalize_histogram(&gray);
    for (px, v) in plane.iter_mut().zip(equalized.as_raw()) {
        *px = *v;
    }
    Ok(())
}

/// Per-channel counts plus Rec.601 luma. Single-channel images report the
/// same counts for every entry.
pub fn compute_histogram(image: ArrayViewD<'_, u8>) -> Result<HistogramData, AppError> {
    let layout = validate(&image, 1)?;
    let mut r = vec![0u32; 256];
    let mut g = vec![0u32; 256];
    let mut b = vec![0u32; 256];
    let mut lum = vec![0u32; 256];

    if layout.color_channels() == 1 {
        let plane = match layout.channels {
            None => image.view().into_dimensionality::<Ix2>(),
            Some(_) => image.index_axis(Axis(2), 0).into_dimensionality::<Ix2>(),
        }
        .map_err(|e| AppError::Internal(e.to_string()))?;
        for &v in plane.iter() {
            r[v as usize] += 1;
        }
        g.clone_from(&r);
        b.clone_from(&r);
        lum.clone_from(&r);
        return Ok(HistogramData { r, g, b, lum });
    }

    let pixels = image
        .view()
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    for px in pixels.lanes(Axis(2)) {
        r[px[0] as usize] += 1;
        g[px[1] as usize] += 1;
        b[px[2] as usize] += 1;
        let l = (0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2]))
            .round() as usize;
        lum[l.min(255)] += 1;
    }

    Ok(HistogramData { r, g, b, lum })
}
