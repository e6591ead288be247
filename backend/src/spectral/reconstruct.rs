use ndarray::{Array2, Zip};

use super::mask::Mask;
use super::{FrequencyField, Plane, SpectralError};

/// Ranges narrower than this are treated as constant.
const DEGENERATE_RANGE: f64 = 1e-12;

/// Multiplies every coefficient by the matching mask entry.
pub fn apply_mask(field: &mut FrequencyField, mask: &Mask) -> Result<(), SpectralError> {
    if field.dim() != mask.dim() {
        return Err(SpectralError::ShapeMismatch {
            field: field.dim(),
            mask: mask.dim(),
        });
    }
    Zip::from(field.data_mut())
        .and(mask.data())
        .for_each(|coef, &m| *coef *= m);
    Ok(())
}

/// Min-max rescale to `[0, 255]`.
///
/// A constant plane has no dynamic range to stretch and maps to all zeros.
pub fn normalize_to_u8(plane: &Plane) -> Array2<u8> {
    let (min, max) = plane
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range < DEGENERATE_RANGE {
        return Array2::zeros(plane.dim());
    }
    plane.mapv(|v| ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn constant_plane_normalizes_to_zero() {
        let plane = Plane::from_elem((8, 8), 127.5);
        assert!(normalize_to_u8(&plane).iter().all(|v| *v == 0));
    }

    #[test]
    fn normalized_output_spans_full_range() {
        let plane = Plane::from_shape_fn((9, 11), |(r, c)| (r as f64 * 0.37 - c as f64).sin());
        let out = normalize_to_u8(&plane);
        assert_eq!(out.iter().copied().min(), Some(0));
        assert_eq!(out.iter().copied().max(), Some(255));
    }

    #[test]
    fn mask_shape_must_match() {
        let mut field = FrequencyField::from_centered(Array2::from_elem((4, 4), Complex64::new(1.0, 0.0)));
        let err = apply_mask(&mut field, &Mask::ones((4, 5))).unwrap_err();
        assert!(matches!(err, SpectralError::ShapeMismatch { .. }));
    }

    #[test]
    fn ones_mask_leaves_field_unchanged() {
        let data = Array2::from_shape_fn((6, 6), |(r, c)| Complex64::new(r as f64, -(c as f64)));
        let mut field = FrequencyField::from_centered(data.clone());
        apply_mask(&mut field, &Mask::ones((6, 6))).unwrap();
        assert_eq!(field.data(), &data);
    }
}
