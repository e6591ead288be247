//! Brightness, contrast and saturation.

use ndarray::{ArrayD, ArrayViewD, Axis, Ix3};
use serde::{Deserialize, Serialize};

use super::is_color_sample;
use crate::models::error::AppError;
use crate::spectral::pipeline::validate;

/// Each value is a percentage in `[-100, 100]`; zero leaves the image alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
}

impl Adjustments {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, v) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ] {
            if !(-100.0..=100.0).contains(&v) {
                return Err(AppError::ValidationError(format!(
                    "{} must be within [-100, 100], got {}",
                    name, v
                )));
            }
        }
        Ok(())
    }
}

pub fn adjust(image: ArrayViewD<'_, u8>, adj: &Adjustments) -> Result<ArrayD<u8>, AppError> {
    adj.validate()?;
    let layout = validate(&image, 1)?;
    let alpha = 1.0 + adj.contrast / 100.0;
    let beta = 2.55 * adj.brightness;

    let mut out = image.to_owned();
    for (idx, px) in out.indexed_iter_mut() {
        if layout.channels.is_none() || is_color_sample(&layout, idx[2]) {
            *px = (alpha * f64::from(*px) + beta).abs().round().min(255.0) as u8;
        }
    }

    if adj.saturation != 0.0 && layout.color_channels() == 3 {
        let factor = 1.0 + adj.saturation / 100.0;
        let mut rgb = out
            .view_mut()
            .into_dimensionality::<Ix3>()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        for mut px in rgb.lanes_mut(Axis(2)) {
            let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
            let (r, g, b) = hsv_to_rgb(h, (s * factor).clamp(0.0, 1.0), v);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    }
    Ok(out)
}

/// Hue in degrees, saturation and value in `[0, 1]`.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let (r, g, b) = (f64::from(r) / 255.0, f64::from(g) / 255.0, f64::from(b) / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let c = v * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    let to_u8 = |ch: f64| ((ch + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}
