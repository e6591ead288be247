use ndarray::{Array2, ArrayViewMut1, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};

use super::Plane;

/// Centered 2-D spectrum: the zero-frequency term sits at `(rows / 2, cols / 2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyField {
    data: Array2<Complex64>,
}

impl FrequencyField {
    /// Wraps coefficients that are already in centered order.
    pub fn from_centered(data: Array2<Complex64>) -> Self {
        Self { data }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<Complex64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<Complex64> {
        &mut self.data
    }
}

/// Forward 2-D DFT of a single plane, shifted so low frequencies are centered.
pub fn forward(plane: &Plane) -> FrequencyField {
    let (rows, cols) = plane.dim();
    let mut data = plane.mapv(|v| Complex64::new(v, 0.0));
    if data.is_empty() {
        return FrequencyField { data };
    }
    fft_2d(&mut data, FftDirection::Forward);
    FrequencyField {
        data: roll(&data, rows / 2, cols / 2),
    }
}

/// Undo the centering, run the inverse DFT and keep the magnitude.
///
/// The inverse is normalized by `1 / (rows * cols)` so that
/// `inverse(&forward(p))` reproduces `p` up to rounding.
pub fn inverse(field: &FrequencyField) -> Plane {
    let (rows, cols) = field.dim();
    if field.data.is_empty() {
        return Plane::zeros((rows, cols));
    }
    let mut data = roll(&field.data, rows - rows / 2, cols - cols / 2);
    fft_2d(&mut data, FftDirection::Inverse);
    let scale = 1.0 / (rows * cols) as f64;
    data.mapv(|c| c.norm() * scale)
}

/// Log-magnitude view of a spectrum, `20 * ln(|F| + 1)`.
pub fn magnitude_spectrum(field: &FrequencyField) -> Plane {
    field.data.mapv(|c| 20.0 * (c.norm() + 1.0).ln())
}

fn fft_2d(data: &mut Array2<Complex64>, direction: FftDirection) {
    let (rows, cols) = data.dim();
    let mut planner = FftPlanner::new();
    let mut scratch = Vec::new();
    let mut buffer = Vec::with_capacity(rows.max(cols));

    let row_fft = planner.plan_fft(cols, direction);
    for lane in data.axis_iter_mut(Axis(0)) {
        process_lane(row_fft.as_ref(), lane, &mut buffer, &mut scratch);
    }

    let col_fft = planner.plan_fft(rows, direction);
    for lane in data.axis_iter_mut(Axis(1)) {
        process_lane(col_fft.as_ref(), lane, &mut buffer, &mut scratch);
    }
}

// Lanes along axis 1 are strided, so every lane goes through a contiguous buffer.
fn process_lane(
    fft: &dyn Fft<f64>,
    mut lane: ArrayViewMut1<'_, Complex64>,
    buffer: &mut Vec<Complex64>,
    scratch: &mut Vec<Complex64>,
) {
    buffer.clear();
    buffer.extend(lane.iter().copied());
    scratch.resize(fft.get_inplace_scratch_len(), Complex64::default());
    fft.process_with_scratch(buffer, scratch);
    lane.iter_mut()
        .zip(buffer.iter())
        .for_each(|(dst, src)| *dst = *src);
}

/// Circular shift: element `(r, c)` moves to `((r + shift_rows) % rows, (c + shift_cols) % cols)`.
fn roll(data: &Array2<Complex64>, shift_rows: usize, shift_cols: usize) -> Array2<Complex64> {
    let (rows, cols) = data.dim();
    let back_rows = rows - shift_rows % rows;
    let back_cols = cols - shift_cols % cols;
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        data[[(r + back_rows) % rows, (c + back_cols) % cols]]
    })
}
