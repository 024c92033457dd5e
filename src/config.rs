//! Try-on service configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub backend: BackendConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub service_name: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    S3,
    Filesystem,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub endpoint: String,
    pub port: u16,
    pub use_ssl: bool,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Root directory for the filesystem store
    pub root: PathBuf,
    pub timeout_secs: u64,
    pub create_buckets: bool,
    pub buckets: BucketNames,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BucketNames {
    pub body_images: String,
    pub garments: String,
    pub results: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    /// Display name reported by /health
    pub name: Option<String>,
    pub operation: String,
    pub seed: u64,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub result_fetch_timeout_secs: u64,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Where transient artifacts live; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    pub result_content_type: String,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when it is absent or unusable
    pub fn load_or_default(path: &str) -> Self {
        if !Path::new(path).exists() {
            info!("Config file {} not found, using defaults", path);
            return Config::default();
        }

        Self::load(path).unwrap_or_else(|e| {
            warn!("Ignoring invalid config, using defaults: {:#}", e);
            Config::default()
        })
    }

    pub fn default_path() -> String {
        std::env::var("TRYON_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
    }

    /// Apply deployment overrides from the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().with_context(|| format!("Invalid PORT: {}", port))?;
        }
        if let Some(endpoint) = lookup("MINIO_ENDPOINT") {
            self.storage.endpoint = endpoint;
        }
        if let Some(port) = lookup("MINIO_PORT") {
            self.storage.port = port
                .parse()
                .with_context(|| format!("Invalid MINIO_PORT: {}", port))?;
        }
        if let Some(use_ssl) = lookup("MINIO_USE_SSL") {
            self.storage.use_ssl = use_ssl == "true";
        }
        if let Some(access_key) = lookup("MINIO_ACCESS_KEY") {
            self.storage.access_key = access_key;
        }
        if let Some(secret_key) = lookup("MINIO_SECRET_KEY") {
            self.storage.secret_key = secret_key;
        }
        if let Some(url) = lookup("TRYON_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(token) = lookup("TRYON_BACKEND_TOKEN") {
            self.backend.api_token = Some(token).filter(|t| !t.is_empty());
        }
        Ok(())
    }
}

impl StorageConfig {
    /// Endpoint URL of the S3-compatible store
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn result_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.result_fetch_timeout_secs)
    }
}

impl WorkflowConfig {
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            service_name: "AI Try-On Service".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::S3,
            endpoint: "minio".to_string(),
            port: 9000,
            use_ssl: false,
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            root: PathBuf::from("data/buckets"),
            timeout_secs: 30,
            create_buckets: true,
            buckets: BucketNames::default(),
        }
    }
}

impl Default for BucketNames {
    fn default() -> Self {
        Self {
            body_images: "body-images".to_string(),
            garments: "garments".to_string(),
            results: "try-on-results".to_string(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://tryon-model:7860".to_string(),
            name: None,
            operation: "tryon".to_string(),
            seed: 42,
            connect_timeout_secs: 30,
            timeout_secs: 180,
            result_fetch_timeout_secs: 60,
            api_token: None,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            result_content_type: "image/png".to_string(),
        }
    }
}
