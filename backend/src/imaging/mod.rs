//! Spatial-domain operations on decoded 8-bit images.
//!
//! Images are ndarray arrays shaped `(rows, cols)` or `(rows, cols, channels)`
//! with channels in RGB(A) order. Alpha is never modified.

pub mod adjust;
pub mod codec;
pub mod edges;
pub mod histogram;
pub mod noise;

use crate::spectral::pipeline::Layout;

/// True for every sample that is not an alpha channel.
pub(crate) fn is_color_sample(layout: &Layout, channel: usize) -> bool {
    layout.alpha_channel() != Some(channel)
}
