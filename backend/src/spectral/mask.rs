use ndarray::Array2;
use serde::Deserialize;

use super::SpectralError;

/// Collapses notch centres closer than this (in pixels).
const CENTER_EPSILON: f64 = 1e-9;

/// Most notch points one request may name.
pub const MAX_NOTCH_POINTS: usize = 64;

/// Describes which part of the frequency plane to suppress.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoiseSpec {
    /// Suspected noise peaks in normalized coordinates, `x, y ∈ [-1, 1]`,
    /// positive `y` pointing up.
    #[serde(rename_all = "camelCase")]
    Points { points: Vec<[f64; 2]> },
    /// Annulus of radius `cutoff_freq` and total thickness `width`, in pixels.
    #[serde(rename_all = "camelCase")]
    Band { cutoff_freq: f64, width: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointFalloff {
    /// `1 - exp(-d² / 2r²)` around every notch.
    Gaussian,
    /// Zero inside radius `r`, one outside.
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskPolicy {
    pub point_falloff: PointFalloff,
    /// Notch radius as a fraction of the smaller image edge.
    pub notch_radius_ratio: f64,
    pub min_notch_radius: f64,
    /// Radius of the disk removed when no noise is described.
    pub dc_radius: f64,
}

impl Default for MaskPolicy {
    fn default() -> Self {
        Self {
            point_falloff: PointFalloff::Gaussian,
            notch_radius_ratio: 0.02,
            min_notch_radius: 5.0,
            dc_radius: 5.0,
        }
    }
}

impl MaskPolicy {
    pub fn notch_radius(&self, rows: usize, cols: usize) -> f64 {
        (self.notch_radius_ratio * rows.min(cols) as f64).max(self.min_notch_radius)
    }
}

/// Attenuation field over a centered spectrum; `0` suppresses, `1` passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<f64>,
}

impl Mask {
    #[cfg(test)]
    pub fn ones(dim: (usize, usize)) -> Self {
        Self {
            data: Array2::ones(dim),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Number of entries attenuated below one half.
    pub fn suppressed_area(&self) -> usize {
        self.data.iter().filter(|v| **v < 0.5).count()
    }
}

/// Builds the mask for a `(rows, cols)` spectrum.
///
/// `None` and an empty point list both fall back to removing a small disk
/// around the DC term.
pub fn build_mask(
    dim: (usize, usize),
    spec: Option<&NoiseSpec>,
    policy: &MaskPolicy,
) -> Result<Mask, SpectralError> {
    match spec {
        Some(NoiseSpec::Points { points }) if !points.is_empty() => {
            notch_mask(dim, points, policy)
        }
        Some(NoiseSpec::Band { cutoff_freq, width }) => band_mask(dim, *cutoff_freq, *width),
        _ => Ok(dc_mask(dim, policy.dc_radius)),
    }
}

fn center(dim: (usize, usize)) -> (f64, f64) {
    ((dim.0 / 2) as f64, (dim.1 / 2) as f64)
}

fn notch_mask(
    dim: (usize, usize),
    points: &[[f64; 2]],
    policy: &MaskPolicy,
) -> Result<Mask, SpectralError> {
    if points.len() > MAX_NOTCH_POINTS {
        return Err(SpectralError::InvalidInput(format!(
            "{} notch points given, at most {} allowed",
            points.len(),
            MAX_NOTCH_POINTS
        )));
    }
    let (crow, ccol) = center(dim);
    let mut centers: Vec<(f64, f64)> = Vec::with_capacity(points.len() * 2);

    for &[x, y] in points {
        if !x.is_finite() || !y.is_finite() || x.abs() > 1.0 || y.abs() > 1.0 {
            return Err(SpectralError::InvalidInput(format!(
                "notch point ({}, {}) is outside [-1, 1]",
                x, y
            )));
        }
        // A real image's spectrum is conjugate-symmetric, so each peak has a twin.
        let peak = (crow - y * crow, ccol + x * ccol);
        let mirror = (crow + y * crow, ccol - x * ccol);
        for candidate in [peak, mirror] {
            let seen = centers.iter().any(|&(r, c)| {
                (r - candidate.0).abs() < CENTER_EPSILON && (c - candidate.1).abs() < CENTER_EPSILON
            });
            if !seen {
                centers.push(candidate);
            }
        }
    }

    let radius = policy.notch_radius(dim.0, dim.1);
    let two_r2 = 2.0 * radius * radius;
    let data = Array2::from_shape_fn(dim, |(row, col)| {
        centers.iter().fold(1.0, |acc, &(pr, pc)| {
            let d2 = (row as f64 - pr).powi(2) + (col as f64 - pc).powi(2);
            let pass = match policy.point_falloff {
                PointFalloff::Gaussian => 1.0 - (-d2 / two_r2).exp(),
                PointFalloff::Hard if d2 <= radius * radius => 0.0,
                PointFalloff::Hard => 1.0,
            };
            acc * pass
        })
    });

    Ok(Mask { data })
}

fn band_mask(dim: (usize, usize), cutoff: f64, width: f64) -> Result<Mask, SpectralError> {
    if !cutoff.is_finite() || !width.is_finite() || cutoff < 0.0 || width < 0.0 {
        return Err(SpectralError::InvalidInput(format!(
            "band needs a non-negative cutoff and width, got cutoff={} width={}",
            cutoff, width
        )));
    }
    let (crow, ccol) = center(dim);
    let inner = cutoff - width / 2.0;
    let outer = cutoff + width / 2.0;
    let data = Array2::from_shape_fn(dim, |(row, col)| {
        let d = ((row as f64 - crow).powi(2) + (col as f64 - ccol).powi(2)).sqrt();
        if d >= inner && d <= outer {
            0.0
        } else {
            1.0
        }
    });
    Ok(Mask { data })
}

fn dc_mask(dim: (usize, usize), radius: f64) -> Mask {
    let (crow, ccol) = center(dim);
    let r2 = radius * radius;
    let data = Array2::from_shape_fn(dim, |(row, col)| {
        let d2 = (row as f64 - crow).powi(2) + (col as f64 - ccol).powi(2);
        if d2 <= r2 {
            0.0
        } else {
            1.0
        }
    });
    Mask { data }
}
