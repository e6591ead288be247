use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{info, warn};

use crate::imaging::codec::read_dimensions;
use crate::models::config::AppConfig;
use crate::models::error::AppError;
use crate::spectral::SpectrumArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredKind {
    Upload,
    Processed,
    Spectrum,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_id: String,
    pub path: PathBuf,
    pub kind: StoredKind,
    pub mime_type: String,
    pub size_bytes: u64,
    pub original_filename: String,
    pub hash: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub expires_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn url(&self) -> String {
        format!("/api/v1/files/{}", self.file_id)
    }
}

/// Disk-backed file store with an in-memory index. Entries expire after
/// `STORAGE_TTL_SECS` and are swept by [`FileStore::cleanup_expired`].
pub struct FileStore {
    config: Arc<AppConfig>,
    files: DashMap<String, StoredFile>,
    storage_dir: PathBuf,
}

impl FileStore {
    pub async fn new(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let storage_dir = PathBuf::from(&config.storage_dir);
        fs::create_dir_all(&storage_dir).await?;

        Ok(Self {
            config,
            files: DashMap::new(),
            storage_dir,
        })
    }

    /// Stores an uploaded image. Only the header is read here; undecodable
    /// uploads are rejected before they reach disk.
    pub async fn store_upload(
        &self,
        filename: &str,
        data: &[u8],
        mime_type: &str,
    ) -> Result<StoredFile, AppError> {
        if data.len() as u64 > self.config.max_upload_bytes {
            return Err(AppError::FileTooLarge(data.len() as u64));
        }
        let (width, height) = read_dimensions(data)?;

        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        self.write_entry(
            StoredKind::Upload,
            ext,
            data,
            mime_type,
            filename.to_string(),
            Some((width, height)),
        )
        .await
    }

    /// Stores an operation result, named after the time it was produced.
    pub async fn store_processed(
        &self,
        png: &[u8],
        width: u32,
        height: u32,
    ) -> Result<StoredFile, AppError> {
        let name = format!("processed_{}.png", Utc::now().format("%Y%m%d_%H%M%S"));
        self.write_entry(
            StoredKind::Processed,
            "png",
            png,
            "image/png",
            name,
            Some((width, height)),
        )
        .await
    }

    pub async fn store_spectrum(
        &self,
        artifact: &SpectrumArtifact,
        source_file_id: &str,
    ) -> Result<StoredFile, AppError> {
        let data = serde_json::to_vec(artifact)
            .map_err(|e| AppError::Internal(format!("Failed to serialize spectrum: {}", e)))?;
        self.write_entry(
            StoredKind::Spectrum,
            "json",
            &data,
            "application/json",
            format!("spectrum_{}", source_file_id),
            None,
        )
        .await
    }

    async fn write_entry(
        &self,
        kind: StoredKind,
        ext: &str,
        data: &[u8],
        mime_type: &str,
        original_filename: String,
        dimensions: Option<(u32, u32)>,
    ) -> Result<StoredFile, AppError> {
        let file_id = uuid::Uuid::new_v4().to_string();
        let path = self.storage_dir.join(format!("{}.{}", file_id, ext));

        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hex::encode(hasher.finalize());

        let now = Utc::now();
        let stored = StoredFile {
            file_id: file_id.clone(),
            path,
            kind,
            mime_type: mime_type.to_string(),
            size_bytes: data.len() as u64,
            original_filename,
            hash,
            width: dimensions.map(|d| d.0),
            height: dimensions.map(|d| d.1),
            expires_at: now + Duration::seconds(self.config.storage_ttl_secs as i64),
        };

        self.files.insert(file_id.clone(), stored.clone());
        info!(file_id = %file_id, kind = ?kind, size = data.len(), "File stored");

        Ok(stored)
    }

    /// Expired entries read as missing; their files stay until the next sweep.
    pub fn get(&self, file_id: &str) -> Result<StoredFile, AppError> {
        match self.files.get(file_id) {
            Some(entry) if entry.expires_at >= Utc::now() => Ok(entry.clone()),
            _ => Err(AppError::FileNotFound(file_id.to_string())),
        }
    }

    pub async fn read_bytes(&self, file_id: &str) -> Result<Vec<u8>, AppError> {
        let stored = self.get(file_id)?;
        fs::read(&stored.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read stored file: {}", e)))
    }

    /// Loads a spectrum artifact. Ids of other kinds are reported as missing.
    pub async fn read_spectrum(&self, spectrum_id: &str) -> Result<SpectrumArtifact, AppError> {
        if self.get(spectrum_id)?.kind != StoredKind::Spectrum {
            return Err(AppError::FileNotFound(spectrum_id.to_string()));
        }
        let data = self.read_bytes(spectrum_id).await?;
        serde_json::from_slice(&data)
            .map_err(|e| AppError::Internal(format!("Corrupt spectrum {}: {}", spectrum_id, e)))
    }

    pub async fn delete(&self, file_id: &str) -> Result<(), AppError> {
        if let Some((_, stored)) = self.files.remove(file_id) {
            let _ = fs::remove_file(&stored.path).await;
            info!(file_id = %file_id, "File deleted");
            Ok(())
        } else {
            Err(AppError::FileNotFound(file_id.to_string()))
        }
    }

    /// Removes expired entries and their files, returning how many went.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let to_remove: Vec<String> = self
            .files
            .iter()
            .filter(|entry| entry.expires_at < now)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for file_id in to_remove {
            if let Some((_, stored)) = self.files.remove(&file_id) {
                let _ = fs::remove_file(&stored.path).await;
                warn!(file_id = %file_id, "Expired file removed");
                removed += 1;
            }
        }
        removed
    }

    pub fn usage_bytes(&self) -> u64 {
        self.files.iter().map(|entry| entry.size_bytes).sum()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
