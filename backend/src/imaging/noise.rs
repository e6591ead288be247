//! Synthetic noise generators used to produce test material for the
//! removal filters.

use std::f64::consts::PI;

use ndarray::{ArrayD, ArrayViewD, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::is_color_sample;
use crate::models::error::AppError;
use crate::spectral::pipeline::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicPattern {
    #[default]
    Sine,
    Cosine,
    Square,
}

/// Sets `ceil(density * pixels / 2)` random pixels to white and as many to
/// black, across every colour channel.
pub fn salt_pepper<R: Rng>(
    image: ArrayViewD<'_, u8>,
    density: f64,
    rng: &mut R,
) -> Result<ArrayD<u8>, AppError> {
    if !(0.0..=1.0).contains(&density) {
        return Err(AppError::ValidationError(format!(
            "density must be within [0, 1], got {}",
            density
        )));
    }
    let layout = validate(&image, 1)?;
    let pixels = layout.rows * layout.cols;
    let count = (density * pixels as f64 * 0.5).ceil() as usize;

    let mut out = image.to_owned();
    for value in [255u8, 0u8] {
        for _ in 0..count {
            let (row, col) = (rng.gen_range(0..layout.rows), rng.gen_range(0..layout.cols));
            match layout.channels {
                None => out[&[row, col][..]] = value,
                Some(channels) => {
                    for ch in (0..channels).filter(|&c| is_color_sample(&layout, c)) {
                        out[&[row, col, ch][..]] = value;
                    }
                }
            }
        }
    }
    Ok(out)
}

/// Adds an independent `N(mean, sigma)` sample to every colour sample.
pub fn gaussian<R: Rng>(
    image: ArrayViewD<'_, u8>,
    mean: f64,
    sigma: f64,
    rng: &mut R,
) -> Result<ArrayD<u8>, AppError> {
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(AppError::ValidationError(format!(
            "sigma must be a finite value >= 0, got {}",
            sigma
        )));
    }
    if !mean.is_finite() {
        return Err(AppError::ValidationError("mean must be finite".to_string()));
    }
    let normal = Normal::new(mean, sigma)
        .map_err(|e| AppError::ValidationError(format!("mean/sigma: {}", e)))?;
    let layout = validate(&image, 1)?;

    let mut out = image.to_owned();
    for (idx, px) in out.indexed_iter_mut() {
        let color = layout.channels.is_none() || is_color_sample(&layout, idx[2]);
        if color {
            *px = saturate(f64::from(*px) + normal.sample(rng));
        }
    }
    Ok(out)
}

/// Adds a horizontal plus vertical wave of `frequency` cycles per image
/// edge, scaled so its peak magnitude equals `amplitude`.
pub fn periodic(
    image: ArrayViewD<'_, u8>,
    frequency: f64,
    amplitude: f64,
    pattern: PeriodicPattern,
) -> Result<ArrayD<u8>, AppError> {
    if !frequency.is_finite() || !amplitude.is_finite() {
        return Err(AppError::ValidationError(
            "frequency and amplitude must be finite".to_string(),
        ));
    }
    let layout = validate(&image, 1)?;
    let (rows, cols) = (layout.rows as f64, layout.cols as f64);
    let wave = |t: f64| match pattern {
        PeriodicPattern::Sine => t.sin(),
        PeriodicPattern::Cosine => t.cos(),
        PeriodicPattern::Square => sign(t.sin()),
    };
    let noise = ndarray::Array2::from_shape_fn((layout.rows, layout.cols), |(r, c)| {
        (wave(2.0 * PI * frequency * c as f64 / cols) + wave(2.0 * PI * frequency * r as f64 / rows))
            / 2.0
    });
    let peak = noise.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale = if peak > 0.0 { amplitude / peak } else { 0.0 };

    let mut out = image.to_owned();
    match layout.channels {
        None => {
            for ((r, c), n) in noise.indexed_iter() {
                let px = &mut out[&[r, c][..]];
                *px = saturate(f64::from(*px) + n * scale);
            }
        }
        Some(_) => {
            for (ch, mut plane) in out.axis_iter_mut(Axis(2)).enumerate() {
                if !is_color_sample(&layout, ch) {
                    continue;
                }
                for (px, n) in plane.iter_mut().zip(noise.iter()) {
                    *px = saturate(f64::from(*px) + n * scale);
                }
            }
        }
    }
    Ok(out)
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn saturate(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
