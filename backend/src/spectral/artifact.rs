use ndarray::{Array2, ArrayViewD};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{FrequencyField, SpectralError};

/// A spectrum persisted between a forward and a later inverse call.
///
/// Holds one centred field per filtered plane: a single luminance plane, or
/// one per colour channel. The fingerprint binds it to the exact pixels it
/// was computed from; an inverse against any other image is refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumArtifact {
    pub fingerprint: String,
    pub rows: usize,
    pub cols: usize,
    pub planes: Vec<SpectrumPlane>,
}

/// Real and imaginary parts of one field in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPlane {
    pub re: Vec<f64>,
    pub im: Vec<f64>,
}

impl SpectrumArtifact {
    pub fn capture(source: &ArrayViewD<'_, u8>, fields: &[FrequencyField]) -> Self {
        let (rows, cols) = fields.first().map(FrequencyField::dim).unwrap_or((0, 0));
        let planes = fields
            .iter()
            .map(|field| {
                let (re, im) = field.data().iter().map(|c| (c.re, c.im)).unzip();
                SpectrumPlane { re, im }
            })
            .collect();
        Self {
            fingerprint: fingerprint(source),
            rows,
            cols,
            planes,
        }
    }

    pub fn verify(&self, source: &ArrayViewD<'_, u8>) -> Result<(), SpectralError> {
        let actual = fingerprint(source);
        if actual != self.fingerprint {
            return Err(SpectralError::StaleArtifact {
                expected: self.fingerprint.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn to_fields(&self) -> Result<Vec<FrequencyField>, SpectralError> {
        if self.planes.is_empty() {
            return Err(SpectralError::InvalidInput(
                "spectrum holds no planes".to_string(),
            ));
        }
        self.planes.iter().map(|plane| self.plane_field(plane)).collect()
    }

    fn plane_field(&self, plane: &SpectrumPlane) -> Result<FrequencyField, SpectralError> {
        let len = self.rows * self.cols;
        if plane.re.len() != len || plane.im.len() != len {
            return Err(SpectralError::InvalidInput(format!(
                "spectrum holds {}/{} coefficients for a {}x{} plane",
                plane.re.len(),
                plane.im.len(),
                self.rows,
                self.cols
            )));
        }
        let coefs = plane
            .re
            .iter()
            .zip(&plane.im)
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect();
        let data = Array2::from_shape_vec((self.rows, self.cols), coefs)
            .map_err(|e| SpectralError::InvalidInput(e.to_string()))?;
        Ok(FrequencyField::from_centered(data))
    }
}

/// Hex SHA-256 over the array shape followed by its pixels in row-major order.
pub fn fingerprint(image: &ArrayViewD<'_, u8>) -> String {
    let mut hasher = Sha256::new();
    hasher.update((image.ndim() as u64).to_le_bytes());
    for &len in image.shape() {
        hasher.update((len as u64).to_le_bytes());
    }
    match image.as_slice() {
        Some(pixels) => hasher.update(pixels),
        None => hasher.update(image.iter().copied().collect::<Vec<u8>>()),
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::transform::forward;
    use crate::spectral::Plane;
    use ndarray::{ArrayD, IxDyn};

    fn image(seed: u8) -> ArrayD<u8> {
        ArrayD::from_shape_fn(IxDyn(&[12, 10]), |idx| {
            (idx[0] as u8).wrapping_mul(13).wrapping_add(idx[1] as u8 ^ seed)
        })
    }

    fn field_of(img: &ArrayD<u8>) -> FrequencyField {
        let plane: Plane = img
            .view()
            .into_dimensionality::<ndarray::Ix2>()
            .unwrap()
            .mapv(f64::from);
        forward(&plane)
    }

    #[test]
    fn artifact_survives_json() {
        let img = image(3);
        let field = field_of(&img);
        let artifact = SpectrumArtifact::capture(&img.view(), std::slice::from_ref(&field));
        let json = serde_json::to_string(&artifact).unwrap();
        let restored: SpectrumArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.to_fields().unwrap(), vec![field]);
        restored.verify(&img.view()).unwrap();
    }

    #[test]
    fn different_source_is_stale() {
        let img = image(3);
        let artifact = SpectrumArtifact::capture(&img.view(), &[field_of(&img)]);
        let other = image(4);
        let err = artifact.verify(&other.view()).unwrap_err();
        assert!(matches!(err, SpectralError::StaleArtifact { .. }));
    }

    #[test]
    fn keeps_every_plane_bit_exact() {
        let a = field_of(&image(1));
        let b = field_of(&image(9));
        let artifact = SpectrumArtifact::capture(&image(1).view(), &[a.clone(), b.clone()]);
        let json = serde_json::to_vec(&artifact).unwrap();
        let restored: SpectrumArtifact = serde_json::from_slice(&json).unwrap();
        let fields = restored.to_fields().unwrap();
        assert_eq!(fields.len(), 2);
        for (got, want) in fields.iter().zip([&a, &b]) {
            for (x, y) in got.data().iter().zip(want.data()) {
                assert_eq!(x.re.to_bits(), y.re.to_bits());
                assert_eq!(x.im.to_bits(), y.im.to_bits());
            }
        }
    }

    #[test]
    fn empty_artifact_is_rejected() {
        let mut artifact = SpectrumArtifact::capture(&image(1).view(), &[field_of(&image(1))]);
        artifact.planes.clear();
        assert!(matches!(artifact.to_fields(), Err(SpectralError::InvalidInput(_))));
    }

    #[test]
    fn fingerprint_depends_on_shape() {
        let flat = ArrayD::<u8>::zeros(IxDyn(&[4, 6]));
        let tall = ArrayD::<u8>::zeros(IxDyn(&[6, 4]));
        assert_ne!(fingerprint(&flat.view()), fingerprint(&tall.view()));
    }

    #[test]
    fn truncated_coefficients_are_rejected() {
        let img = image(1);
        let mut artifact = SpectrumArtifact::capture(&img.view(), &[field_of(&img)]);
        artifact.planes[0].im.pop();
        assert!(artifact.to_fields().is_err());
    }
}
