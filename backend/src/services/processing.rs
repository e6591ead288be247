use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use ndarray::{ArrayD, Axis};
use tokio::sync::Semaphore;
use tracing::info;

use crate::imaging::codec::{encode_png, from_array, load_image, to_array};
use crate::imaging::histogram::{compute_histogram, HistogramData};
use crate::models::config::AppConfig;
use crate::models::error::AppError;
use crate::services::operations::{OperationCategory, OperationContext, OperationRegistry};
use crate::services::storage::{FileStore, StoredFile};
use crate::spectral::pipeline::validate;
use crate::spectral::{
    build_mask, invert_artifact, magnitude_spectrum, normalize_to_u8, spectrum, FrequencyField,
    NoiseSpec, SpectrumArtifact,
};

/// Runs CPU-bound image work off the async runtime, at most
/// `MAX_PARALLEL_JOBS` at a time.
pub struct ProcessingService {
    config: Arc<AppConfig>,
    registry: OperationRegistry,
    job_semaphore: Semaphore,
}

#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    pub stored: StoredFile,
    pub operation: String,
}

#[derive(Debug, Clone)]
pub struct SpectrumOutput {
    pub spectrum: StoredFile,
    pub magnitude: StoredFile,
    pub fingerprint: String,
    pub rows: usize,
    pub cols: usize,
}

impl ProcessingService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            job_semaphore: Semaphore::new(config.max_parallel_jobs.max(1)),
            registry: OperationRegistry::new(),
            config,
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub async fn apply(
        &self,
        store: &FileStore,
        file_id: &str,
        category: OperationCategory,
        name: Option<&str>,
        params: serde_json::Value,
    ) -> Result<ProcessedOutput, AppError> {
        let op = self.registry.get(category, name)?;
        let operation = op.descriptor().name;
        let started = Instant::now();

        let data = store.read_bytes(file_id).await?;
        let ctx = OperationContext {
            spectral: self.config.spectral_options(),
        };
        let (png, width, height) = self
            .run_blocking(move || {
                let image = to_array(&load_image(&data)?)?;
                let out = op.apply(image.view(), params, &ctx)?;
                encode_array(out)
            })
            .await?;

        let stored = store.store_processed(&png, width, height).await?;
        info!(
            file_id = %file_id,
            output_id = %stored.file_id,
            operation = %operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Operation applied"
        );
        Ok(ProcessedOutput { stored, operation })
    }

    /// Forward half of a split run: persists the spectrum and a viewable
    /// log-magnitude image, grey for one plane and colour for per-channel
    /// spectra.
    pub async fn forward_spectrum(
        &self,
        store: &FileStore,
        file_id: &str,
    ) -> Result<SpectrumOutput, AppError> {
        let started = Instant::now();
        let data = store.read_bytes(file_id).await?;
        let opts = self.config.spectral_options();

        let (artifact, png) = self
            .run_blocking(move || {
                let image = to_array(&load_image(&data)?)?;
                let (fields, artifact) = spectrum(image.view(), &opts)?;
                let (png, _, _) = encode_array(magnitude_view(&fields)?)?;
                Ok((artifact, png))
            })
            .await?;

        let spectrum = store.store_spectrum(&artifact, file_id).await?;
        let magnitude = store
            .store_processed(&png, artifact.cols as u32, artifact.rows as u32)
            .await?;
        info!(
            file_id = %file_id,
            spectrum_id = %spectrum.file_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Spectrum computed"
        );
        Ok(SpectrumOutput {
            spectrum,
            magnitude,
            fingerprint: artifact.fingerprint,
            rows: artifact.rows,
            cols: artifact.cols,
        })
    }

    /// Inverse half of a split run. Refused when `file_id` no longer holds
    /// the pixels the spectrum was computed from.
    pub async fn inverse_spectrum(
        &self,
        store: &FileStore,
        spectrum_id: &str,
        file_id: &str,
        noise: Option<NoiseSpec>,
    ) -> Result<ProcessedOutput, AppError> {
        let started = Instant::now();
        let artifact: SpectrumArtifact = store.read_spectrum(spectrum_id).await?;
        let data = store.read_bytes(file_id).await?;
        let opts = self.config.spectral_options();

        let (png, width, height) = self
            .run_blocking(move || {
                let image = to_array(&load_image(&data)?)?;
                let out = invert_artifact(&artifact, image.view(), noise.as_ref(), &opts)?;
                encode_array(out)
            })
            .await?;

        let stored = store.store_processed(&png, width, height).await?;
        info!(
            file_id = %file_id,
            spectrum_id = %spectrum_id,
            output_id = %stored.file_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Spectrum inverted"
        );
        Ok(ProcessedOutput {
            stored,
            operation: "fft_inverse".to_string(),
        })
    }

    /// The mask `noise` would produce for this image, white where
    /// frequencies pass, as PNG bytes.
    pub async fn mask_preview(
        &self,
        store: &FileStore,
        file_id: &str,
        noise: Option<NoiseSpec>,
    ) -> Result<Vec<u8>, AppError> {
        let data = store.read_bytes(file_id).await?;
        let opts = self.config.spectral_options();

        self.run_blocking(move || {
            let image = to_array(&load_image(&data)?)?;
            let layout = validate(&image.view(), opts.min_edge)?;
            let mask = build_mask((layout.rows, layout.cols), noise.as_ref(), &opts.mask)?;
            tracing::debug!(
                rows = layout.rows,
                cols = layout.cols,
                suppressed = mask.suppressed_area(),
                "Mask preview built"
            );
            let pixels = mask.data().mapv(|m| (m * 255.0).round().clamp(0.0, 255.0) as u8);
            let (png, _, _) = encode_array(pixels.into_dyn())?;
            Ok(png)
        })
        .await
    }

    pub async fn histogram(
        &self,
        store: &FileStore,
        file_id: &str,
    ) -> Result<HistogramData, AppError> {
        let data = store.read_bytes(file_id).await?;
        self.run_blocking(move || {
            let image = to_array(&load_image(&data)?)?;
            compute_histogram(image.view())
        })
        .await
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .job_semaphore
            .acquire()
            .await
            .map_err(|_| AppError::Internal("Job semaphore closed".to_string()))?;
        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| AppError::Internal(format!("Worker task failed: {}", e)))?
    }
}

/// Log magnitude of each field, stacked along a channel axis when there is
/// more than one.
fn magnitude_view(fields: &[FrequencyField]) -> Result<ArrayD<u8>, AppError> {
    let planes: Vec<_> = fields
        .iter()
        .map(|field| normalize_to_u8(&magnitude_spectrum(field)))
        .collect();
    match planes.as_slice() {
        [] => Err(AppError::Internal("spectrum has no planes".to_string())),
        [plane] => Ok(plane.clone().into_dyn()),
        _ => {
            let views: Vec<_> = planes.iter().map(|p| p.view()).collect();
            ndarray::stack(Axis(2), &views)
                .map(|stacked| stacked.into_dyn())
                .map_err(|e| AppError::Internal(e.to_string()))
        }
    }
}

/// PNG bytes plus `(width, height)`.
fn encode_array(pixels: ArrayD<u8>) -> Result<(Vec<u8>, u32, u32), AppError> {
    let img: DynamicImage = from_array(&pixels)?;
    let png = encode_png(&img)?;
    Ok((png, img.width(), img.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::{remove_noise, ChannelPolicy};
    use image::{GrayImage, Luma};

    async fn setup(dir: &std::path::Path) -> (ProcessingService, FileStore) {
        let config = Arc::new(AppConfig {
            storage_dir: dir.to_string_lossy().into_owned(),
            ..AppConfig::default()
        });
        let store = FileStore::new(config.clone()).await.unwrap();
        (ProcessingService::new(config), store)
    }

    fn striped_png() -> Vec<u8> {
        let img = GrayImage::from_fn(32, 32, |x, _| Luma([if (x / 4) % 2 == 0 { 60 } else { 180 }]));
        encode_png(&DynamicImage::ImageLuma8(img)).unwrap()
    }

    #[tokio::test]
    async fn apply_stores_processed_png() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = setup(dir.path()).await;
        let upload = store.store_upload("s.png", &striped_png(), "image/png").await.unwrap();

        let out = service
            .apply(
                &store,
                &upload.file_id,
                OperationCategory::Filter,
                Some("laplace"),
                serde_json::Value::Null,
            )
            .await
            .unwrap();
        assert_eq!(out.operation, "laplace");
        assert_eq!((out.stored.width, out.stored.height), (Some(32), Some(32)));
        let bytes = store.read_bytes(&out.stored.file_id).await.unwrap();
        assert_eq!(load_image(&bytes).unwrap().width(), 32);
    }

    #[tokio::test]
    async fn split_run_round_trips_through_storage() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = setup(dir.path()).await;
        let upload = store.store_upload("s.png", &striped_png(), "image/png").await.unwrap();

        let fwd = service.forward_spectrum(&store, &upload.file_id).await.unwrap();
        assert_eq!((fwd.rows, fwd.cols), (32, 32));
        assert_eq!(fwd.fingerprint.len(), 64);

        let out = service
            .inverse_spectrum(&store, &fwd.spectrum.file_id, &upload.file_id, None)
            .await
            .unwrap();
        assert_eq!(out.stored.width, Some(32));
    }

    #[tokio::test]
    async fn per_channel_split_run_keeps_colour() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(AppConfig {
            storage_dir: dir.path().to_string_lossy().into_owned(),
            channel_policy: ChannelPolicy::PerChannel,
            ..AppConfig::default()
        });
        let store = FileStore::new(config.clone()).await.unwrap();
        let service = ProcessingService::new(config.clone());
        let rgb = image::RgbImage::from_fn(32, 32, |x, y| {
            image::Rgb([(x * 8) as u8, 60, ((x + y) * 11 % 256) as u8])
        });
        let bytes = encode_png(&DynamicImage::ImageRgb8(rgb)).unwrap();
        let upload = store.store_upload("c.png", &bytes, "image/png").await.unwrap();

        let fwd = service.forward_spectrum(&store, &upload.file_id).await.unwrap();
        let magnitude = store.read_bytes(&fwd.magnitude.file_id).await.unwrap();
        assert!(matches!(load_image(&magnitude).unwrap(), DynamicImage::ImageRgb8(_)));

        let out = service
            .inverse_spectrum(&store, &fwd.spectrum.file_id, &upload.file_id, None)
            .await
            .unwrap();
        let split = to_array(&load_image(&store.read_bytes(&out.stored.file_id).await.unwrap()).unwrap()).unwrap();
        let source = to_array(&load_image(&bytes).unwrap()).unwrap();
        let single = remove_noise(source.view(), None, &config.spectral_options()).unwrap();
        assert_eq!(split, single);
    }

    #[tokio::test]
    async fn inverse_against_other_image_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = setup(dir.path()).await;
        let a = store.store_upload("a.png", &striped_png(), "image/png").await.unwrap();
        let other = encode_png(&DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([3])))).unwrap();
        let b = store.store_upload("b.png", &other, "image/png").await.unwrap();

        let fwd = service.forward_spectrum(&store, &a.file_id).await.unwrap();
        let err = service
            .inverse_spectrum(&store, &fwd.spectrum.file_id, &b.file_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleSpectrum(_)));
    }

    #[tokio::test]
    async fn mask_preview_is_black_at_dc() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = setup(dir.path()).await;
        let upload = store.store_upload("s.png", &striped_png(), "image/png").await.unwrap();

        let png = service.mask_preview(&store, &upload.file_id, None).await.unwrap();
        let mask = load_image(&png).unwrap().to_luma8();
        assert_eq!(mask.get_pixel(16, 16), &Luma([0]));
        assert_eq!(mask.get_pixel(0, 0), &Luma([255]));
    }
}
