//! End-to-end checks of the noise removal pipeline.

use std::f64::consts::PI;

use ndarray::{Array2, ArrayD, Axis, Ix2, Ix3, IxDyn};

use super::mask::Mask;
use super::pipeline::{filter_plane, invert_artifact, spectrum, validate};
use super::*;

fn gray(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> ArrayD<u8> {
    ArrayD::from_shape_fn(IxDyn(&[rows, cols]), |idx| {
        f(idx[0], idx[1]).round().clamp(0.0, 255.0) as u8
    })
}

fn as_plane(image: &ArrayD<u8>) -> Plane {
    image
        .view()
        .into_dimensionality::<Ix2>()
        .unwrap()
        .mapv(f64::from)
}

fn diff_variance(a: &Array2<u8>, b: &Array2<u8>) -> f64 {
    let diffs: Vec<f64> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 - *y as f64)
        .collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64
}

// ========================================================================
// Properties
// ========================================================================

#[test]
fn ones_mask_reproduces_full_range_image() {
    let image = gray(32, 40, |r, c| ((r * 8 + c * 5) % 256) as f64);
    let plane = as_plane(&image);
    assert_eq!(plane.iter().cloned().fold(f64::INFINITY, f64::min), 0.0);
    assert_eq!(plane.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 255.0);

    let out = filter_plane(&plane, &Mask::ones((32, 40))).unwrap();
    for (a, b) in out.iter().zip(plane.iter()) {
        assert!((*a as f64 - b).abs() <= 1.0);
    }
}

#[test]
fn reconstruction_spans_zero_to_255() {
    let image = gray(48, 48, |r, c| 90.0 + 30.0 * ((r + 2 * c) as f64 / 7.0).sin());
    let spec = NoiseSpec::Points {
        points: vec![[0.3, 0.1]],
    };
    let out = remove_noise(image.view(), Some(&spec), &SpectralOptions::default()).unwrap();
    assert_eq!(out.shape(), &[48, 48]);
    assert_eq!(out.iter().copied().min(), Some(0));
    assert_eq!(out.iter().copied().max(), Some(255));
}

// ========================================================================
// Scenarios
// ========================================================================

#[test]
fn constant_image_with_center_notch_becomes_black() {
    let image = gray(64, 64, |_, _| 128.0);
    let spec = NoiseSpec::Points {
        points: vec![[0.0, 0.0]],
    };
    let out = remove_noise(image.view(), Some(&spec), &SpectralOptions::default()).unwrap();
    assert_eq!(out.shape(), &[64, 64]);
    assert!(out.iter().all(|v| *v == 0));
}

#[test]
fn band_reject_removes_periodic_pattern() {
    let n = 128;
    let f = 20.0;
    let base = |_: usize, c: usize| 100.0 + 50.0 * (2.0 * PI * c as f64 / n as f64).cos();
    let pattern = |r: usize, c: usize| {
        40.0 * ((2.0 * PI * f * c as f64 / n as f64).sin()
            + (2.0 * PI * f * r as f64 / n as f64).sin())
            / 2.0
    };
    let clean = gray(n, n, base);
    let noisy = gray(n, n, |r, c| base(r, c) + pattern(r, c));

    let spec = NoiseSpec::Band {
        cutoff_freq: f,
        width: 4.0,
    };
    let out = remove_noise(noisy.view(), Some(&spec), &SpectralOptions::default()).unwrap();
    let out = out.into_dimensionality::<Ix2>().unwrap();

    let reference = normalize_to_u8(&as_plane(&clean));
    let noisy_scaled = normalize_to_u8(&as_plane(&noisy));

    let before = diff_variance(&noisy_scaled, &reference);
    let after = diff_variance(&out, &reference);
    assert!(
        after < before * 0.1,
        "pattern energy only dropped from {} to {}",
        before,
        after
    );
}

#[test]
fn empty_points_match_default_suppression() {
    let image = gray(40, 40, |r, c| (r * c % 200) as f64);
    let opts = SpectralOptions::default();
    let empty = NoiseSpec::Points { points: vec![] };
    let a = remove_noise(image.view(), Some(&empty), &opts).unwrap();
    let b = remove_noise(image.view(), None, &opts).unwrap();
    assert_eq!(a, b);
}

// ========================================================================
// Channels
// ========================================================================

fn rgba(rows: usize, cols: usize) -> ArrayD<u8> {
    ArrayD::from_shape_fn(IxDyn(&[rows, cols, 4]), |idx| match idx[2] {
        0 => ((idx[0] * 9 + idx[1] * 4) % 256) as u8,
        1 => 60,
        2 => ((idx[1] * 11) % 256) as u8,
        _ => 200,
    })
}

#[test]
fn luminance_result_is_broadcast_and_keeps_alpha() {
    let image = rgba(24, 20);
    let out = remove_noise(image.view(), None, &SpectralOptions::default()).unwrap();
    assert_eq!(out.shape(), &[24, 20, 4]);
    let out = out.into_dimensionality::<Ix3>().unwrap();
    for px in out.lanes(Axis(2)) {
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 200);
    }
}

#[test]
fn luminance_without_restore_is_single_plane() {
    let image = rgba(16, 16);
    let opts = SpectralOptions {
        restore_channels: false,
        ..SpectralOptions::default()
    };
    let out = remove_noise(image.view(), None, &opts).unwrap();
    assert_eq!(out.shape(), &[16, 16]);
}

#[test]
fn per_channel_filters_channels_independently() {
    let image = rgba(20, 20);
    let opts = SpectralOptions {
        channels: ChannelPolicy::PerChannel,
        ..SpectralOptions::default()
    };
    let out = remove_noise(image.view(), None, &opts).unwrap();
    assert_eq!(out.shape(), &[20, 20, 4]);
    // The constant green channel has nothing left after DC removal.
    assert!(out.index_axis(Axis(2), 1).iter().all(|v| *v == 0));
    assert!(out.index_axis(Axis(2), 0).iter().any(|v| *v == 255));
    assert!(out.index_axis(Axis(2), 3).iter().all(|v| *v == 200));
}

// ========================================================================
// Validation
// ========================================================================

#[test]
fn rejects_bad_shapes() {
    let min_edge = SpectralOptions::default().min_edge;
    let flat = ArrayD::<u8>::zeros(IxDyn(&[64]));
    let deep = ArrayD::<u8>::zeros(IxDyn(&[16, 16, 5]));
    let tiny = ArrayD::<u8>::zeros(IxDyn(&[4, 64]));
    let empty = ArrayD::<u8>::zeros(IxDyn(&[0, 0]));
    for image in [flat, deep, tiny, empty] {
        assert!(matches!(
            validate(&image.view(), min_edge),
            Err(SpectralError::InvalidInput(_))
        ));
    }
}

// ========================================================================
// Split-phase
// ========================================================================

#[test]
fn split_phase_matches_single_pass() {
    let image = rgba(32, 32);
    let opts = SpectralOptions::default();
    let spec = NoiseSpec::Band {
        cutoff_freq: 6.0,
        width: 2.0,
    };
    let (_, artifact) = spectrum(image.view(), &opts).unwrap();
    let split = invert_artifact(&artifact, image.view(), Some(&spec), &opts).unwrap();
    let single = remove_noise(image.view(), Some(&spec), &opts).unwrap();
    assert_eq!(split, single);
}

#[test]
fn per_channel_split_phase_matches_single_pass() {
    let image = rgba(32, 32);
    let opts = SpectralOptions {
        channels: ChannelPolicy::PerChannel,
        ..SpectralOptions::default()
    };
    let (fields, artifact) = spectrum(image.view(), &opts).unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(artifact.planes.len(), 3);

    let split = invert_artifact(&artifact, image.view(), None, &opts).unwrap();
    let single = remove_noise(image.view(), None, &opts).unwrap();
    assert_eq!(split, single);
    let green = single.index_axis(Axis(2), 1);
    assert!(green.iter().all(|&v| v == 0));
    assert_eq!(split.index_axis(Axis(2), 3), image.index_axis(Axis(2), 3));
}

#[test]
fn split_phase_refuses_other_channel_policy() {
    let image = rgba(32, 32);
    let luminance = SpectralOptions::default();
    let per_channel = SpectralOptions {
        channels: ChannelPolicy::PerChannel,
        ..SpectralOptions::default()
    };
    let (_, artifact) = spectrum(image.view(), &luminance).unwrap();
    let err = invert_artifact(&artifact, image.view(), None, &per_channel).unwrap_err();
    assert!(matches!(err, SpectralError::InvalidInput(_)));

    let (_, artifact) = spectrum(image.view(), &per_channel).unwrap();
    let err = invert_artifact(&artifact, image.view(), None, &luminance).unwrap_err();
    assert!(matches!(err, SpectralError::InvalidInput(_)));
}

#[test]
fn split_phase_refuses_other_image() {
    let image = rgba(32, 32);
    let opts = SpectralOptions::default();
    let (_, artifact) = spectrum(image.view(), &opts).unwrap();
    let mut edited = image.clone();
    edited[&[0, 0, 0][..]] ^= 1;
    let err = invert_artifact(&artifact, edited.view(), None, &opts).unwrap_err();
    assert!(matches!(err, SpectralError::StaleArtifact { .. }));
}
