//! Configuration module
//!
//! Configuration is read once from the environment (plus an optional `.env` file) and
//! then passed by value into every constructor that needs it. Nothing in the pipeline
//! looks configuration up on its own.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const KICAD_CLI_PATH: &str = "kicad-cli";
const KICAD_CLI_TIMEOUT_SECONDS: u64 = 120;
const PREVIEW_MIN_LAYER_BYTES: u64 = 1024;
const PREVIEW_GRID_PADDING_RATIO: f64 = 0.05;
const MAX_ARCHIVE_SIZE_MB: u64 = 100;
const MAX_EXTRACTED_SIZE_MB: u64 = 500;
const MAX_ARCHIVE_ENTRIES: usize = 10_000;
const PROCESSING_MAX_CONCURRENT_RUNS: usize = 2;
const S3_PRESIGN_EXPIRY_SECS: u64 = 3600;
const LOCAL_STORAGE_PATH: &str = "./var/storage";

/// Byte-storage backend settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_storage_path: PathBuf,
    /// Base URL used by `get_url`. Without it the local backend has no URLs and the S3
    /// backend falls back to presigned URLs.
    pub public_base_url: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_presign_expiry_secs: u64,
}

/// External rendering executable contract.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub executable: PathBuf,
    pub timeout: Duration,
}

/// Limits and tuning for archive processing runs.
#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub max_archive_size_bytes: u64,
    pub max_extracted_size_bytes: u64,
    pub max_archive_entries: usize,
    /// Layer drawings smaller than this are treated as empty renders. 0 disables the check.
    pub min_layer_bytes: u64,
    pub grid_padding_ratio: f64,
    pub max_concurrent_runs: usize,
    /// Parent directory for per-run scratch directories. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(KICAD_CLI_PATH),
            timeout: Duration::from_secs(KICAD_CLI_TIMEOUT_SECONDS),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_archive_size_bytes: MAX_ARCHIVE_SIZE_MB * 1024 * 1024,
            max_extracted_size_bytes: MAX_EXTRACTED_SIZE_MB * 1024 * 1024,
            max_archive_entries: MAX_ARCHIVE_ENTRIES,
            min_layer_bytes: PREVIEW_MIN_LAYER_BYTES,
            grid_padding_ratio: PREVIEW_GRID_PADDING_RATIO,
            max_concurrent_runs: PROCESSING_MAX_CONCURRENT_RUNS,
            scratch_dir: None,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: Option<String>,
    pub storage: StorageConfig,
    pub renderer: RendererConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let storage = StorageConfig {
            backend,
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(LOCAL_STORAGE_PATH)),
            public_base_url: lookup("STORAGE_PUBLIC_BASE_URL").filter(|s| !s.trim().is_empty()),
            s3_bucket: lookup("S3_BUCKET"),
            s3_region: lookup("S3_REGION").or_else(|| lookup("AWS_REGION")),
            s3_endpoint: lookup("S3_ENDPOINT"),
            s3_presign_expiry_secs: lookup("S3_PRESIGN_EXPIRY_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(S3_PRESIGN_EXPIRY_SECS),
        };

        let renderer = RendererConfig {
            executable: lookup("KICAD_CLI_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(KICAD_CLI_PATH)),
            timeout: Duration::from_secs(
                lookup("KICAD_CLI_TIMEOUT_SECONDS")
                    .map(|s| {
                        s.parse::<u64>().map_err(|_| {
                            anyhow::anyhow!("KICAD_CLI_TIMEOUT_SECONDS must be a valid number")
                        })
                    })
                    .transpose()?
                    .unwrap_or(KICAD_CLI_TIMEOUT_SECONDS),
            ),
        };

        let processing = ProcessingConfig {
            max_archive_size_bytes: lookup("MAX_ARCHIVE_SIZE_MB")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(MAX_ARCHIVE_SIZE_MB)
                * 1024
                * 1024,
            max_extracted_size_bytes: lookup("MAX_EXTRACTED_SIZE_MB")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(MAX_EXTRACTED_SIZE_MB)
                * 1024
                * 1024,
            max_archive_entries: lookup("MAX_ARCHIVE_ENTRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_ARCHIVE_ENTRIES),
            min_layer_bytes: lookup("PREVIEW_MIN_LAYER_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PREVIEW_MIN_LAYER_BYTES),
            grid_padding_ratio: lookup("PREVIEW_GRID_PADDING_RATIO")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PREVIEW_GRID_PADDING_RATIO),
            max_concurrent_runs: lookup("PROCESSING_MAX_CONCURRENT_RUNS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PROCESSING_MAX_CONCURRENT_RUNS),
            scratch_dir: lookup("SCRATCH_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        let config = Config {
            environment,
            database_url: lookup("DATABASE_URL"),
            storage,
            renderer,
            processing,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.renderer.timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "KICAD_CLI_TIMEOUT_SECONDS must be greater than zero"
            ));
        }

        if !(0.0..1.0).contains(&self.processing.grid_padding_ratio) {
            return Err(anyhow::anyhow!(
                "PREVIEW_GRID_PADDING_RATIO must be in [0, 1)"
            ));
        }

        if self.processing.max_concurrent_runs == 0 {
            return Err(anyhow::anyhow!(
                "PROCESSING_MAX_CONCURRENT_RUNS must be at least 1"
            ));
        }

        if self.storage.backend == StorageBackend::S3
            && (self.storage.s3_bucket.is_none() || self.storage.s3_region.is_none())
        {
            return Err(anyhow::anyhow!(
                "STORAGE_BACKEND=s3 requires S3_BUCKET and S3_REGION (or AWS_REGION)"
            ));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        Ok(())
    }
}
