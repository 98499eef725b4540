//! Server configuration
//!
//! Loaded from a TOML file; every field has a default so an empty file
//! (or no file) yields a working in-memory server.
//!
//! ```toml
//! bind = "0.0.0.0:3000"
//! listing_cache_ttl_secs = 5
//!
//! [store]
//! kind = "http"
//! endpoint = "https://media.example.net/v1"
//! folder = "collages"
//!
//! [collage]
//! upload_concurrency = 4
//! rollback_on_failure = true
//! ```

use collage_core::CollageConfig;
use collage_store::HttpStoreConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which artifact store backs the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreSettings {
    /// Process-local store, lost on restart
    #[default]
    Memory,
    /// Remote media service
    Http(HttpStoreConfig),
}

/// Store settings given on the command line or environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOverrides {
    /// Remote endpoint; selects the http store
    pub endpoint: Option<String>,
    /// Collection folder
    pub folder: Option<String>,
    /// Bearer token
    pub api_token: Option<String>,
}

impl StoreOverrides {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none() && self.folder.is_none() && self.api_token.is_none()
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Largest accepted multipart body
    pub max_body_bytes: u64,
    /// How long a listing is served from cache (0 disables caching)
    pub listing_cache_ttl_secs: u64,
    /// Artifact store backend
    pub store: StoreSettings,
    /// Orchestrator settings
    pub collage: CollageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_body_bytes: 16 * 1024 * 1024,
            listing_cache_ttl_secs: 5,
            store: StoreSettings::Memory,
            collage: CollageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read and validate a TOML config file
    ///
    /// # Errors
    /// Fails if the file cannot be read, does not parse, or holds unusable values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Fails on malformed TOML or unusable values.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// With store backend
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: StoreSettings) -> Self {
        self.store = store;
        self
    }

    /// Apply store overrides on top of the file values
    ///
    /// An endpoint switches a memory store to http. Folder and token refine
    /// whichever http store results.
    ///
    /// # Errors
    /// Folder or token without any http store to apply them to.
    pub fn with_store_overrides(mut self, overrides: StoreOverrides) -> Result<Self, ConfigError> {
        if overrides.is_empty() {
            return Ok(self);
        }

        let mut http = match (self.store, overrides.endpoint) {
            (StoreSettings::Http(http), Some(endpoint)) => HttpStoreConfig { endpoint, ..http },
            (StoreSettings::Http(http), None) => http,
            (StoreSettings::Memory, Some(endpoint)) => HttpStoreConfig::new(endpoint),
            (StoreSettings::Memory, None) => {
                return Err(ConfigError::Invalid(
                    "store folder and token apply only to an http store; set an endpoint"
                        .to_string(),
                ));
            }
        };
        if let Some(folder) = overrides.folder {
            http = http.with_folder(folder);
        }
        if let Some(token) = overrides.api_token {
            http = http.with_api_token(token);
        }
        self.store = StoreSettings::Http(http);
        Ok(self)
    }

    /// With orchestrator settings
    #[inline]
    #[must_use]
    pub fn with_collage(mut self, collage: CollageConfig) -> Self {
        self.collage = collage;
        self
    }

    /// With listing cache lifetime
    #[inline]
    #[must_use]
    pub fn with_listing_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.listing_cache_ttl_secs = secs;
        self
    }

    /// Listing cache lifetime, `None` when caching is off
    #[inline]
    #[must_use]
    pub fn listing_cache_ttl(&self) -> Option<Duration> {
        (self.listing_cache_ttl_secs > 0).then(|| Duration::from_secs(self.listing_cache_ttl_secs))
    }

    /// Check every field is usable
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if let StoreSettings::Http(http) = &self.store {
            if http.endpoint.trim().is_empty() {
                return Err(ConfigError::Invalid("store endpoint is empty".to_string()));
            }
            if http.folder.trim().is_empty() {
                return Err(ConfigError::Invalid("store folder is empty".to_string()));
            }
        }
        self.collage.validate()?;
        Ok(())
    }
}

/// Configuration failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but unusable
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Orchestrator section unusable
    #[error("invalid [collage] section: {0}")]
    Collage(#[from] collage_core::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.store, StoreSettings::Memory);
        assert_eq!(config.listing_cache_ttl(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn http_store_section() {
        let config = ServerConfig::from_toml(
            r#"
            bind = "0.0.0.0:8080"

            [store]
            kind = "http"
            endpoint = "https://media.example.net/v1"
            api_token = "secret"

            [collage]
            upload_concurrency = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.bind.port(), 8080);
        match &config.store {
            StoreSettings::Http(http) => {
                assert_eq!(http.endpoint, "https://media.example.net/v1");
                assert_eq!(http.folder, "collages");
                assert_eq!(http.api_token.as_deref(), Some("secret"));
            }
            other => panic!("unexpected store: {other:?}"),
        }
        assert_eq!(config.collage.upload_concurrency, 4);
        assert_eq!(config.collage.compose_timeout_secs, 60);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = ServerConfig::from_toml("[collage]\nupload_concurrency = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Collage(collage_core::ConfigError::Zero("upload_concurrency"))
        ));
    }

    #[test]
    fn empty_endpoint_rejected() {
        let err = ServerConfig::from_toml("[store]\nkind = \"http\"\nendpoint = \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_store_kind_is_a_parse_error() {
        let err = ServerConfig::from_toml("[store]\nkind = \"ftp\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let config = ServerConfig::default().with_listing_cache_ttl_secs(0);
        assert_eq!(config.listing_cache_ttl(), None);
    }

    fn http_file() -> ServerConfig {
        ServerConfig::from_toml(
            "[store]\nkind = \"http\"\nendpoint = \"https://media.example.net\"\nfolder = \"from-file\"\n",
        )
        .unwrap()
    }

    fn http_of(config: &ServerConfig) -> &HttpStoreConfig {
        match &config.store {
            StoreSettings::Http(http) => http,
            StoreSettings::Memory => panic!("expected an http store"),
        }
    }

    #[test]
    fn folder_override_applies_to_file_http_store() {
        let config = http_file()
            .with_store_overrides(StoreOverrides {
                folder: Some("from-flag".to_string()),
                api_token: Some("t0k".to_string()),
                ..StoreOverrides::default()
            })
            .unwrap();

        let http = http_of(&config);
        assert_eq!(http.endpoint, "https://media.example.net");
        assert_eq!(http.folder, "from-flag");
        assert_eq!(http.api_token.as_deref(), Some("t0k"));
    }

    #[test]
    fn endpoint_override_keeps_file_folder() {
        let config = http_file()
            .with_store_overrides(StoreOverrides {
                endpoint: Some("http://10.0.0.2:9000".to_string()),
                ..StoreOverrides::default()
            })
            .unwrap();

        let http = http_of(&config);
        assert_eq!(http.endpoint, "http://10.0.0.2:9000");
        assert_eq!(http.folder, "from-file");
    }

    #[test]
    fn endpoint_override_switches_memory_to_http() {
        let config = ServerConfig::default()
            .with_store_overrides(StoreOverrides {
                endpoint: Some("http://10.0.0.2:9000".to_string()),
                folder: Some("charts".to_string()),
                ..StoreOverrides::default()
            })
            .unwrap();

        assert_eq!(http_of(&config).folder, "charts");
    }

    #[test]
    fn folder_without_http_store_is_rejected() {
        let err = ServerConfig::default()
            .with_store_overrides(StoreOverrides {
                folder: Some("charts".to_string()),
                ..StoreOverrides::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn no_overrides_leave_config_alone() {
        let config = ServerConfig::default()
            .with_store_overrides(StoreOverrides::default())
            .unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listing_cache_ttl_secs = 30").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.listing_cache_ttl_secs, 30);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
