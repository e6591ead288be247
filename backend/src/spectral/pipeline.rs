use ndarray::{Array2, ArrayD, ArrayViewD, Axis, Ix2, IxDyn};
use serde::Deserialize;

use super::mask::{build_mask, Mask, MaskPolicy, NoiseSpec};
use super::reconstruct::{apply_mask, normalize_to_u8};
use super::transform::{forward, inverse, FrequencyField};
use super::{Plane, SpectralError, SpectrumArtifact};

/// How colour inputs are taken through the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPolicy {
    /// Collapse to one luminance plane and filter that.
    Luminance,
    /// Filter each colour channel on its own with the same mask.
    PerChannel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralOptions {
    pub mask: MaskPolicy,
    pub channels: ChannelPolicy,
    /// Broadcast a luminance result back to the source's channel count.
    pub restore_channels: bool,
    /// Smallest accepted edge length, in pixels.
    pub min_edge: usize,
}

impl Default for SpectralOptions {
    fn default() -> Self {
        Self {
            mask: MaskPolicy::default(),
            channels: ChannelPolicy::Luminance,
            restore_channels: true,
            min_edge: 8,
        }
    }
}

/// Shape of a validated input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub rows: usize,
    pub cols: usize,
    /// `None` for a plain 2-D array.
    pub channels: Option<usize>,
}

impl Layout {
    pub fn color_channels(&self) -> usize {
        match self.channels {
            None | Some(1) | Some(2) => 1,
            Some(_) => 3,
        }
    }

    pub fn alpha_channel(&self) -> Option<usize> {
        match self.channels {
            Some(2) => Some(1),
            Some(4) => Some(3),
            _ => None,
        }
    }
}

pub fn validate(image: &ArrayViewD<'_, u8>, min_edge: usize) -> Result<Layout, SpectralError> {
    let shape = image.shape();
    let layout = match *shape {
        [rows, cols] => Layout {
            rows,
            cols,
            channels: None,
        },
        [rows, cols, channels] => Layout {
            rows,
            cols,
            channels: Some(channels),
        },
        _ => {
            return Err(SpectralError::InvalidInput(format!(
                "expected a 2-D or 3-D image, got {} dimensions",
                shape.len()
            )))
        }
    };
    if image.is_empty() {
        return Err(SpectralError::InvalidInput("image is empty".to_string()));
    }
    if let Some(channels) = layout.channels {
        if !(1..=4).contains(&channels) {
            return Err(SpectralError::InvalidInput(format!(
                "unsupported channel count {}",
                channels
            )));
        }
    }
    if layout.rows < min_edge || layout.cols < min_edge {
        return Err(SpectralError::InvalidInput(format!(
            "image is {}x{}, minimum edge is {}",
            layout.cols, layout.rows, min_edge
        )));
    }
    Ok(layout)
}

/// One channel of a validated image as floats.
pub fn channel_plane(image: &ArrayViewD<'_, u8>, channel: usize) -> Plane {
    match image.ndim() {
        2 => image
            .view()
            .into_dimensionality::<Ix2>()
            .map(|v| v.mapv(f64::from))
            .unwrap_or_else(|_| Plane::zeros((0, 0))),
        _ => image
            .index_axis(Axis(2), channel)
            .into_dimensionality::<Ix2>()
            .map(|v| v.mapv(f64::from))
            .unwrap_or_else(|_| Plane::zeros((0, 0))),
    }
}

/// Rec.601 luma for colour inputs, the first channel otherwise.
pub fn luminance(image: &ArrayViewD<'_, u8>, layout: &Layout) -> Plane {
    if layout.color_channels() == 1 {
        return channel_plane(image, 0);
    }
    let r = channel_plane(image, 0);
    let g = channel_plane(image, 1);
    let b = channel_plane(image, 2);
    r * 0.299 + g * 0.587 + b * 0.114
}

/// Forward → mask → inverse → normalize for one plane.
pub fn filter_plane(plane: &Plane, mask: &Mask) -> Result<Array2<u8>, SpectralError> {
    let mut field = forward(plane);
    apply_mask(&mut field, mask)?;
    Ok(normalize_to_u8(&inverse(&field)))
}

/// True when `opts` asks for colour channels to be filtered separately and
/// the image has more than one.
fn splits_channels(layout: &Layout, opts: &SpectralOptions) -> bool {
    opts.channels == ChannelPolicy::PerChannel && layout.color_channels() > 1
}

/// The planes that go through the transform: one per colour channel, or a
/// single luminance plane.
fn source_planes(image: &ArrayViewD<'_, u8>, layout: &Layout, opts: &SpectralOptions) -> Vec<Plane> {
    if splits_channels(layout, opts) {
        (0..layout.color_channels())
            .map(|c| channel_plane(image, c))
            .collect()
    } else {
        vec![luminance(image, layout)]
    }
}

/// Shapes filtered planes like the source.
fn finish(
    planes: Vec<Array2<u8>>,
    source: &ArrayViewD<'_, u8>,
    layout: &Layout,
    opts: &SpectralOptions,
) -> Result<ArrayD<u8>, SpectralError> {
    if splits_channels(layout, opts) {
        return Ok(assemble(&planes, source, layout));
    }
    let plane = planes
        .into_iter()
        .next()
        .ok_or_else(|| SpectralError::InvalidInput("no filtered plane".to_string()))?;
    Ok(restore(plane, source, layout, opts.restore_channels))
}

/// Removes the frequencies described by `spec` from `image`.
///
/// The output has the input's spatial size. Colour handling follows
/// `opts.channels`; with the luminance policy the result is single-channel
/// unless `opts.restore_channels` asks for it to be broadcast back.
pub fn remove_noise(
    image: ArrayViewD<'_, u8>,
    spec: Option<&NoiseSpec>,
    opts: &SpectralOptions,
) -> Result<ArrayD<u8>, SpectralError> {
    let layout = validate(&image, opts.min_edge)?;
    let mask = build_mask((layout.rows, layout.cols), spec, &opts.mask)?;
    let filtered = source_planes(&image, &layout, opts)
        .iter()
        .map(|plane| filter_plane(plane, &mask))
        .collect::<Result<Vec<_>, _>>()?;
    finish(filtered, &image, &layout, opts)
}

/// Spectra of a validated image for split-phase processing, one per plane
/// the channel policy filters.
pub fn spectrum(
    image: ArrayViewD<'_, u8>,
    opts: &SpectralOptions,
) -> Result<(Vec<FrequencyField>, SpectrumArtifact), SpectralError> {
    let layout = validate(&image, opts.min_edge)?;
    let fields: Vec<FrequencyField> = source_planes(&image, &layout, opts)
        .iter()
        .map(forward)
        .collect();
    let artifact = SpectrumArtifact::capture(&image, &fields);
    Ok((fields, artifact))
}

/// Finishes a split-phase run: checks the artifact belongs to `source` and
/// was taken under the same channel policy, masks every plane and
/// reconstructs.
pub fn invert_artifact(
    artifact: &SpectrumArtifact,
    source: ArrayViewD<'_, u8>,
    spec: Option<&NoiseSpec>,
    opts: &SpectralOptions,
) -> Result<ArrayD<u8>, SpectralError> {
    let layout = validate(&source, opts.min_edge)?;
    artifact.verify(&source)?;
    let fields = artifact.to_fields()?;
    let expected = if splits_channels(&layout, opts) {
        layout.color_channels()
    } else {
        1
    };
    if fields.len() != expected {
        return Err(SpectralError::InvalidInput(format!(
            "spectrum holds {} planes, channel policy needs {}",
            fields.len(),
            expected
        )));
    }
    let mask = build_mask((layout.rows, layout.cols), spec, &opts.mask)?;
    let filtered = fields
        .into_iter()
        .map(|mut field| {
            apply_mask(&mut field, &mask)?;
            Ok(normalize_to_u8(&inverse(&field)))
        })
        .collect::<Result<Vec<_>, SpectralError>>()?;
    finish(filtered, &source, &layout, opts)
}

/// Shapes a single-plane result like the source: 2-D stays 2-D, a
/// single-channel image keeps its channel axis, and colour images get the
/// plane broadcast across colour channels (alpha copied over) when
/// `broadcast` is set.
pub fn restore(
    plane: Array2<u8>,
    like: &ArrayViewD<'_, u8>,
    layout: &Layout,
    broadcast: bool,
) -> ArrayD<u8> {
    match layout.channels {
        None => plane.into_dyn(),
        Some(1) => plane.insert_axis(Axis(2)).into_dyn(),
        Some(_) if broadcast => {
            let planes = vec![plane; layout.color_channels()];
            assemble(&planes, like, layout)
        }
        Some(_) => plane.into_dyn(),
    }
}

/// Stacks colour planes and carries the source alpha channel over unchanged.
pub fn assemble(planes: &[Array2<u8>], like: &ArrayViewD<'_, u8>, layout: &Layout) -> ArrayD<u8> {
    let channels = layout.channels.unwrap_or(1);
    let alpha = layout.alpha_channel();
    ArrayD::from_shape_fn(IxDyn(&[layout.rows, layout.cols, channels]), |idx| {
        let (row, col, ch) = (idx[0], idx[1], idx[2]);
        if Some(ch) == alpha {
            like[&[row, col, ch][..]]
        } else {
            planes[ch.min(planes.len() - 1)][[row, col]]
        }
    })
}
