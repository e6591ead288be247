//! Sobel and Laplace edge detection.
//!
//! Both operate on the luminance plane, rescale the response to the full
//! 8-bit range and broadcast it back over the colour channels. Kernels are
//! the separable binomial/derivative pairs, borders reflect without
//! repeating the edge sample.

use ndarray::{ArrayD, ArrayViewD, Zip};
use serde::{Deserialize, Serialize};

use crate::models::error::AppError;
use crate::spectral::pipeline::{luminance, restore, validate};
use crate::spectral::{normalize_to_u8, Plane};

pub const KERNEL_SIZES: [usize; 4] = [1, 3, 5, 7];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SobelDirection {
    X,
    Y,
    #[default]
    Both,
}

pub fn sobel(
    image: ArrayViewD<'_, u8>,
    direction: SobelDirection,
    kernel_size: usize,
) -> Result<ArrayD<u8>, AppError> {
    check_kernel_size(kernel_size)?;
    let layout = validate(&image, 1)?;
    let gray = luminance(&image, &layout);

    let response = match direction {
        SobelDirection::X => derivative(&gray, 1, 0, kernel_size),
        SobelDirection::Y => derivative(&gray, 0, 1, kernel_size),
        SobelDirection::Both => {
            let gx = derivative(&gray, 1, 0, kernel_size);
            let gy = derivative(&gray, 0, 1, kernel_size);
            Zip::from(&gx).and(&gy).map_collect(|x, y| x.hypot(*y))
        }
    };
    Ok(restore(normalize_to_u8(&response), &image, &layout, true))
}

pub fn laplace(image: ArrayViewD<'_, u8>, kernel_size: usize) -> Result<ArrayD<u8>, AppError> {
    check_kernel_size(kernel_size)?;
    let layout = validate(&image, 1)?;
    let gray = luminance(&image, &layout);
    let response = derivative(&gray, 2, 0, kernel_size) + derivative(&gray, 0, 2, kernel_size);
    Ok(restore(normalize_to_u8(&response), &image, &layout, true))
}

fn check_kernel_size(kernel_size: usize) -> Result<(), AppError> {
    if KERNEL_SIZES.contains(&kernel_size) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "kernelSize must be one of {:?}, got {}",
            KERNEL_SIZES, kernel_size
        )))
    }
}

/// `dx`-th derivative along columns and `dy`-th along rows.
fn derivative(plane: &Plane, dx: usize, dy: usize, kernel_size: usize) -> Plane {
    let kx = kernel(dx, kernel_size);
    let ky = kernel(dy, kernel_size);
    separable(plane, &kx, &ky)
}

/// 1-D kernel for a derivative of `order`. Size 1 means the 3-tap
/// difference with no smoothing.
fn kernel(order: usize, size: usize) -> Vec<f64> {
    if size == 1 {
        return match order {
            0 => vec![1.0],
            1 => vec![-1.0, 0.0, 1.0],
            _ => vec![1.0, -2.0, 1.0],
        };
    }
    let mut k = binomial(size - order);
    for _ in 0..order {
        k = convolve(&k, &[-1.0, 1.0]);
    }
    k
}

fn binomial(len: usize) -> Vec<f64> {
    let mut row = vec![1.0];
    for _ in 1..len {
        row = convolve(&row, &[1.0, 1.0]);
    }
    row
}

fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Correlates rows with `kx`, then columns with `ky`.
fn separable(plane: &Plane, kx: &[f64], ky: &[f64]) -> Plane {
    let (rows, cols) = plane.dim();
    let hx = (kx.len() / 2) as isize;
    let hy = (ky.len() / 2) as isize;

    let horizontal = Plane::from_shape_fn((rows, cols), |(r, c)| {
        kx.iter()
            .enumerate()
            .map(|(i, w)| w * plane[[r, reflect_101(c as isize + i as isize - hx, cols)]])
            .sum()
    });
    Plane::from_shape_fn((rows, cols), |(r, c)| {
        ky.iter()
            .enumerate()
            .map(|(i, w)| w * horizontal[[reflect_101(r as isize + i as isize - hy, rows), c]])
            .sum()
    })
}

/// `dcb|abcd|cba` border indexing.
fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let i = i.rem_euclid(period);
    if i >= n as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}
