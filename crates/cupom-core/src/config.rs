//! Runtime configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Override file (`--config`, else ~/.config/cupom/config.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables are applied last and win over both.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/cupom.toml");

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";

/// Which model backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiBackendKind {
    #[default]
    Gemini,
    Mock,
}

impl AiBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        }
    }
}

impl std::str::FromStr for AiBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown AI backend: {}", s)),
        }
    }
}

/// Which document store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Firestore,
    Local,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Firestore => "firestore",
            Self::Local => "local",
        }
    }
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "local" | "sqlite" => Ok(Self::Local),
            _ => Err(format!("Unknown store: {}", s)),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub store: StoreConfig,
    /// Override file the config was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub backend: AiBackendKind,
    pub gemini: GeminiConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout; none by default
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreKind,
    pub firestore: FirestoreConfig,
    pub local: LocalConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    pub project_id: Option<String>,
    pub database: String,
    pub base_url: String,
    /// Web API key, sent as the `key` query parameter
    pub api_key: Option<String>,
    /// OAuth bearer token
    pub auth_token: Option<String>,
    /// `host:port` of a local emulator; replaces `base_url` with plain HTTP
    pub emulator_host: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: DEFAULT_FIRESTORE_DATABASE.to_string(),
            base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            api_key: None,
            auth_token: None,
            emulator_host: None,
            timeout_secs: None,
        }
    }
}

impl FirestoreConfig {
    /// Base URL after applying the emulator override
    pub fn effective_base_url(&self) -> String {
        match self.emulator_host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
                host.trim_end_matches('/').to_string()
            }
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => self.base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("auth_token", &redact(&self.auth_token))
            .field("emulator_host", &self.emulator_host)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub path: Option<PathBuf>,
}

impl LocalConfig {
    /// Configured path, else ~/.local/share/cupom/cupom.db
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join("cupom").join("cupom.db")))
            .unwrap_or_else(|| PathBuf::from("cupom.db"))
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

/// Default override file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cupom").join("config.toml"))
}

impl Config {
    /// Load configuration from files and the process environment
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(override_path, |key| std::env::var(key).ok())
    }

    /// Load configuration with an injectable environment lookup
    ///
    /// An explicit `override_path` must exist; the default location is
    /// optional.
    pub fn load_with_env<F>(override_path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (content, source) = match override_path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                (content, Some(path.to_path_buf()))
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    let content = fs::read_to_string(&path).map_err(|e| {
                        Error::Config(format!("Failed to read {}: {}", path.display(), e))
                    })?;
                    (content, Some(path))
                }
                None => (DEFAULT_CONFIG.to_string(), None),
            },
        };

        let mut config = Self::from_toml(&content)?;
        config.source = source;
        config.apply_env(env);
        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Apply environment variable overrides; empty values are ignored
    pub fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = var("AI_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.ai.backend = kind,
                Err(e) => warn!(error = %e, "Ignoring AI_BACKEND"),
            }
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            self.ai.gemini.api_key = Some(key);
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.ai.gemini.model = model;
        }
        if let Some(url) = var("GEMINI_BASE_URL") {
            self.ai.gemini.base_url = url;
        }

        if let Some(store) = var("CUPOM_STORE") {
            match store.parse() {
                Ok(kind) => self.store.backend = kind,
                Err(e) => warn!(error = %e, "Ignoring CUPOM_STORE"),
            }
        }
        if let Some(path) = var("CUPOM_DB") {
            self.store.local.path = Some(PathBuf::from(path));
        }

        let firestore = &mut self.store.firestore;
        if let Some(project) = var("FIRESTORE_PROJECT_ID") {
            firestore.project_id = Some(project);
        }
        if let Some(key) = var("FIRESTORE_API_KEY") {
            firestore.api_key = Some(key);
        }
        if let Some(token) = var("FIRESTORE_AUTH_TOKEN") {
            firestore.auth_token = Some(token);
        }
        if let Some(host) = var("FIRESTORE_EMULATOR_HOST") {
            firestore.emulator_host = Some(host);
        }
    }
}
