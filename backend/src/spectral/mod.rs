//! Frequency-domain noise removal.
//!
//! The pipeline has three stages, each in its own module:
//!
//! 1. **Transform** – 2-D DFT with the zero frequency shifted to the centre,
//!    and its inverse.
//! 2. **Mask** – attenuation field built from a [`NoiseSpec`] (notch points,
//!    a reject band, or the default DC disk).
//! 3. **Reconstruct** – mask application, inverse transform and min-max
//!    rescaling back to 8-bit intensities.
//!
//! Everything here is pure and synchronous. Callers own logging, storage
//! and auditing.

pub mod artifact;
pub mod mask;
pub mod pipeline;
pub mod reconstruct;
pub mod transform;

#[cfg(test)]
mod tests;

use ndarray::Array2;

pub use artifact::SpectrumArtifact;
pub use mask::{build_mask, MaskPolicy, NoiseSpec, PointFalloff};
pub use pipeline::{invert_artifact, remove_noise, spectrum, ChannelPolicy, SpectralOptions};
pub use reconstruct::normalize_to_u8;
pub use transform::{magnitude_spectrum, FrequencyField};

/// A single real-valued image plane indexed `(row, col)`.
pub type Plane = Array2<f64>;

#[derive(Debug, thiserror::Error)]
pub enum SpectralError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("spectrum fingerprint {expected} does not match source image {actual}")]
    StaleArtifact { expected: String, actual: String },

    #[error("shape mismatch: field is {field:?}, mask is {mask:?}")]
    ShapeMismatch {
        field: (usize, usize),
        mask: (usize, usize),
    },
}
