use std::env;

use crate::spectral::{ChannelPolicy, MaskPolicy, PointFalloff, SpectralOptions};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub allowed_origins: Vec<String>,
    pub storage_dir: String,
    pub storage_ttl_secs: u64,
    pub max_upload_bytes: u64,
    pub max_parallel_jobs: usize,
    pub log_level: String,
    pub audit_log_capacity: usize,
    pub min_image_edge: usize,
    pub dc_radius: f64,
    pub notch_radius_ratio: f64,
    pub min_notch_radius: f64,
    pub notch_falloff: PointFalloff,
    pub channel_policy: ChannelPolicy,
    pub restore_channels: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            storage_dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "./storage".to_string()),
            storage_ttl_secs: env::var("STORAGE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86400),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(26_214_400),
            max_parallel_jobs: env::var("MAX_PARALLEL_JOBS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            audit_log_capacity: env::var("AUDIT_LOG_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            min_image_edge: env::var("MIN_IMAGE_EDGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            dc_radius: env::var("DC_RADIUS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5.0),
            notch_radius_ratio: env::var("NOTCH_RADIUS_RATIO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.02),
            min_notch_radius: env::var("MIN_NOTCH_RADIUS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5.0),
            notch_falloff: match env::var("NOTCH_FALLOFF").as_deref() {
                Ok("hard") => PointFalloff::Hard,
                _ => PointFalloff::Gaussian,
            },
            channel_policy: match env::var("CHANNEL_POLICY").as_deref() {
                Ok("per_channel") => ChannelPolicy::PerChannel,
                _ => ChannelPolicy::Luminance,
            },
            restore_channels: env::var("RESTORE_CHANNELS")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
        }
    }

    pub fn spectral_options(&self) -> SpectralOptions {
        SpectralOptions {
            mask: MaskPolicy {
                point_falloff: self.notch_falloff,
                notch_radius_ratio: self.notch_radius_ratio,
                min_notch_radius: self.min_notch_radius,
                dc_radius: self.dc_radius,
            },
            channels: self.channel_policy,
            restore_channels: self.restore_channels,
            min_edge: self.min_image_edge,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let options = SpectralOptions::default();
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            allowed_origins: Vec::new(),
            storage_dir: "./storage".to_string(),
            storage_ttl_secs: 86400,
            max_upload_bytes: 26_214_400,
            max_parallel_jobs: 4,
            log_level: "info".to_string(),
            audit_log_capacity: 1000,
            min_image_edge: options.min_edge,
            dc_radius: options.mask.dc_radius,
            notch_radius_ratio: options.mask.notch_radius_ratio,
            min_notch_radius: options.mask.min_notch_radius,
            notch_falloff: options.mask.point_falloff,
            channel_policy: options.channels,
            restore_channels: options.restore_channels,
        }
    }
}
