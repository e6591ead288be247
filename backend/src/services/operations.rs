use std::sync::Arc;

use ndarray::{ArrayD, ArrayViewD};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::imaging::adjust::{adjust, Adjustments};
use crate::imaging::edges::{laplace, sobel, SobelDirection};
use crate::imaging::histogram::equalize;
use crate::imaging::noise::{gaussian, periodic, salt_pepper, PeriodicPattern};
use crate::models::error::AppError;
use crate::spectral::mask::MAX_NOTCH_POINTS;
use crate::spectral::{remove_noise, NoiseSpec, SpectralOptions};

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    Filter,
    NoiseAdd,
    NoiseRemove,
    Histogram,
    Adjust,
}

impl OperationCategory {
    /// Operation used when a request names none.
    pub fn default_operation(self) -> &'static str {
        match self {
            OperationCategory::Filter => "sobel",
            OperationCategory::NoiseAdd => "salt_pepper",
            OperationCategory::NoiseRemove => "notch_reject",
            OperationCategory::Histogram => "equalize",
            OperationCategory::Adjust => "adjust",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub name: String,
    pub category: OperationCategory,
    pub description: String,
    pub defaults: serde_json::Value,
}

/// Settings shared by every run.
pub struct OperationContext {
    pub spectral: SpectralOptions,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait ImageOperation: Send + Sync {
    fn descriptor(&self) -> OperationDescriptor;
    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct OperationRegistry {
    operations: Vec<Arc<dyn ImageOperation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        let operations: Vec<Arc<dyn ImageOperation>> = vec![
            Arc::new(Sobel),
            Arc::new(Laplace),
            Arc::new(SaltPepper),
            Arc::new(Gaussian),
            Arc::new(Periodic),
            Arc::new(NotchReject),
            Arc::new(BandReject),
            Arc::new(DcReject),
            Arc::new(Equalize),
            Arc::new(Adjust),
        ];
        tracing::debug!("OperationRegistry loaded {} operations", operations.len());
        Self { operations }
    }

    pub fn list(&self) -> Vec<OperationDescriptor> {
        self.operations.iter().map(|op| op.descriptor()).collect()
    }

    /// Looks up `name` within `category`, or the category default.
    pub fn get(
        &self,
        category: OperationCategory,
        name: Option<&str>,
    ) -> Result<Arc<dyn ImageOperation>, AppError> {
        let name = name.unwrap_or_else(|| category.default_operation());
        self.operations
            .iter()
            .find(|op| {
                let d = op.descriptor();
                d.category == category && d.name == name
            })
            .cloned()
            .ok_or_else(|| AppError::UnknownOperation(name.to_string()))
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Missing or `null` params mean all defaults.
fn parse_params<T: DeserializeOwned + Default>(params: serde_json::Value) -> Result<T, AppError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params)
        .map_err(|e| AppError::ValidationError(format!("Invalid params: {}", e)))
}

fn descriptor<T: Serialize + Default>(
    name: &str,
    category: OperationCategory,
    description: &str,
) -> OperationDescriptor {
    OperationDescriptor {
        name: name.to_string(),
        category,
        description: description.to_string(),
        defaults: serde_json::to_value(T::default()).unwrap_or(serde_json::Value::Null),
    }
}

fn rng_for(seed: Option<u64>) -> StdRng {
    seed.map(StdRng::seed_from_u64).unwrap_or_else(StdRng::from_entropy)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SobelParams {
    direction: SobelDirection,
    kernel_size: usize,
}

impl Default for SobelParams {
    fn default() -> Self {
        Self {
            direction: SobelDirection::Both,
            kernel_size: 3,
        }
    }
}

struct Sobel;

impl ImageOperation for Sobel {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<SobelParams>(
            "sobel",
            OperationCategory::Filter,
            "Sobel gradient (x, y or magnitude of both)",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        _ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let p: SobelParams = parse_params(params)?;
        sobel(image, p.direction, p.kernel_size)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LaplaceParams {
    kernel_size: usize,
}

impl Default for LaplaceParams {
    fn default() -> Self {
        Self { kernel_size: 3 }
    }
}

struct Laplace;

impl ImageOperation for Laplace {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<LaplaceParams>("laplace", OperationCategory::Filter, "Laplacian edge response")
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        _ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let p: LaplaceParams = parse_params(params)?;
        laplace(image, p.kernel_size)
    }
}

// ---------------------------------------------------------------------------
// Noise generators
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SaltPepperParams {
    density: f64,
    seed: Option<u64>,
}

impl Default for SaltPepperParams {
    fn default() -> Self {
        Self {
            density: 0.05,
            seed: None,
        }
    }
}

struct SaltPepper;

impl ImageOperation for SaltPepper {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<SaltPepperParams>(
            "salt_pepper",
            OperationCategory::NoiseAdd,
            "Random white and black pixels",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        _ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let p: SaltPepperParams = parse_params(params)?;
        salt_pepper(image, p.density, &mut rng_for(p.seed))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GaussianParams {
    mean: f64,
    sigma: f64,
    seed: Option<u64>,
}

impl Default for GaussianParams {
    fn default() -> Self {
        Self {
            mean: 0.0,
            sigma: 25.0,
            seed: None,
        }
    }
}

struct Gaussian;

impl ImageOperation for Gaussian {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<GaussianParams>(
            "gaussian",
            OperationCategory::NoiseAdd,
            "Additive normally distributed noise",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        _ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let p: GaussianParams = parse_params(params)?;
        gaussian(image, p.mean, p.sigma, &mut rng_for(p.seed))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PeriodicParams {
    frequency: f64,
    amplitude: f64,
    pattern: PeriodicPattern,
}

impl Default for PeriodicParams {
    fn default() -> Self {
        Self {
            frequency: 20.0,
            amplitude: 50.0,
            pattern: PeriodicPattern::Sine,
        }
    }
}

struct Periodic;

impl ImageOperation for Periodic {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<PeriodicParams>(
            "periodic",
            OperationCategory::NoiseAdd,
            "Horizontal plus vertical periodic pattern",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        _ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let p: PeriodicParams = parse_params(params)?;
        periodic(image, p.frequency, p.amplitude, p.pattern)
    }
}

// ---------------------------------------------------------------------------
// Frequency-domain removal
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct NotchParams {
    points: Vec<[f64; 2]>,
}

struct NotchReject;

impl ImageOperation for NotchReject {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<NotchParams>(
            "notch_reject",
            OperationCategory::NoiseRemove,
            "Suppress spectrum peaks at normalized points; no points suppresses the DC disk",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let p: NotchParams = parse_params(params)?;
        if p.points.len() > MAX_NOTCH_POINTS {
            return Err(AppError::ValidationError(format!(
                "points: at most {} allowed, got {}",
                MAX_NOTCH_POINTS,
                p.points.len()
            )));
        }
        let spec = NoiseSpec::Points { points: p.points };
        Ok(remove_noise(image, Some(&spec), &ctx.spectral)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BandParams {
    cutoff_freq: f64,
    width: f64,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            cutoff_freq: 30.0,
            width: 10.0,
        }
    }
}

struct BandReject;

impl ImageOperation for BandReject {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<BandParams>(
            "band_reject",
            OperationCategory::NoiseRemove,
            "Suppress an annulus of frequencies around the centre",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let p: BandParams = parse_params(params)?;
        let spec = NoiseSpec::Band {
            cutoff_freq: p.cutoff_freq,
            width: p.width,
        };
        Ok(remove_noise(image, Some(&spec), &ctx.spectral)?)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NoParams {}

struct DcReject;

impl ImageOperation for DcReject {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<NoParams>(
            "dc_reject",
            OperationCategory::NoiseRemove,
            "Suppress a small disk around the zero frequency",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let _: NoParams = parse_params(params)?;
        Ok(remove_noise(image, None, &ctx.spectral)?)
    }
}

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

struct Equalize;

impl ImageOperation for Equalize {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<NoParams>(
            "equalize",
            OperationCategory::Histogram,
            "Per-channel histogram equalization",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        _ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let _: NoParams = parse_params(params)?;
        equalize(image)
    }
}

struct Adjust;

impl ImageOperation for Adjust {
    fn descriptor(&self) -> OperationDescriptor {
        descriptor::<Adjustments>(
            "adjust",
            OperationCategory::Adjust,
            "Brightness, contrast and saturation in percent",
        )
    }

    fn apply(
        &self,
        image: ArrayViewD<'_, u8>,
        params: serde_json::Value,
        _ctx: &OperationContext,
    ) -> Result<ArrayD<u8>, AppError> {
        let adj: Adjustments = parse_params(params)?;
        adjust(image, &adj)
    }
}
