use crate::failure::{DEFAULT_COOLDOWN_SECS, DEFAULT_FALLBACK_MODEL};
use crate::inference::gemini::DEFAULT_ENDPOINT;
use crate::request::{clamp_temperature, ModelProfile, DEFAULT_REASONING_BUDGET};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = "celestial-lens";
const CONFIG_FILE: &str = "config.json";

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "你是一位精通八字、紫微斗數、三元九運與現代職業戰略的頂尖玄學專家。你擅長將古老的東方智慧轉化為具備未來感、跨領域且符合現代趨勢的實戰建議。你的目標是幫助命主找到其在地球上的『原廠設定』並發揮最大天賦。解讀時請使用 Markdown 格式，表格必須清晰，語氣根據用戶要求調整。";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine a configuration directory")]
    NoConfigDir,

    #[error("Failed to {action} config {path}: {message}")]
    Io {
        action: &'static str,
        path: String,
        message: String,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("No API key: set GEMINI_API_KEY (or add it to .env) or pass --api-key")]
    MissingApiKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub reasoning_budget: u32,
    pub system_instruction: String,
    pub endpoint: String,
    /// Ceiling for one whole analysis, stream included; `None` waits indefinitely
    pub request_timeout_secs: Option<u64>,
    pub rate_limit_cooldown_secs: u64,
    pub fallback_model: String,
    /// Extra or overriding entries for the model capability table
    pub models: Vec<ModelProfile>,
    pub catalog_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            reasoning_budget: DEFAULT_REASONING_BUDGET,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: None,
            rate_limit_cooldown_secs: DEFAULT_COOLDOWN_SECS,
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            models: Vec::new(),
            catalog_path: None,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Where an API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeySource {
    /// Environment / `.env` secret
    Secret,
    /// Entered for this session only (`--api-key`)
    SessionOverride,
}

/// In-memory credential for the current process; never written to disk
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    source: KeySource,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("source", &self.source)
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, source: KeySource) -> Self {
        Self {
            api_key: api_key.into(),
            source,
        }
    }

    /// Primary secret source first, then the session override
    pub fn resolve(session_override: Option<&str>) -> Result<Self, ConfigError> {
        Self::resolve_from(std::env::var(API_KEY_ENV).ok().as_deref(), session_override)
    }

    pub fn resolve_from(secret: Option<&str>, session_override: Option<&str>) -> Result<Self, ConfigError> {
        let pick = |value: Option<&str>| value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);

        let credentials = if let Some(key) = pick(secret) {
            if shadows_override(&key, pick(session_override).as_deref()) {
                tracing::warn!(
                    "--api-key ignored: {} is set and takes precedence",
                    API_KEY_ENV
                );
            }
            Self::new(key, KeySource::Secret)
        } else if let Some(key) = pick(session_override) {
            Self::new(key, KeySource::SessionOverride)
        } else {
            return Err(ConfigError::MissingApiKey);
        };

        tracing::info!(
            "Using API key {} from {:?}",
            mask_api_key(&credentials.api_key),
            credentials.source
        );
        Ok(credentials)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn masked(&self) -> String {
        mask_api_key(&self.api_key)
    }
}

/// Everything one analysis needs, passed explicitly to the orchestrator
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app: AppConfig,
    pub credentials: Credentials,
}

/// A distinct session override loses to the primary secret
fn shadows_override(secret: &str, session_override: Option<&str>) -> bool {
    session_override.is_some_and(|key| key != secret)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Read the config at `path`, writing defaults when missing. A corrupt file is
/// backed up to `*.json.bak` and replaced by defaults.
pub fn load_or_create(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        let config = AppConfig::default();
        save(path, &config)?;
        tracing::info!("Created default config at {}", path.display());
        return Ok(config);
    }

    let raw = fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;
    match serde_json::from_str::<AppConfig>(&raw) {
        Ok(mut config) => {
            normalize_config(&mut config);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!("Config {} is invalid ({}), restoring defaults", path.display(), e);
            let backup = path.with_extension("json.bak");
            let _ = fs::copy(path, backup);
            let config = AppConfig::default();
            save(path, &config)?;
            Ok(config)
        }
    }
}

pub fn save(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| io_error("create directory for", path, e))?;
        }
    }
    let json = serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?;
    fs::write(path, json).map_err(|e| io_error("write", path, e))
}

pub fn normalize_model(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        DEFAULT_MODEL.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn normalize_config(config: &mut AppConfig) {
    config.model = normalize_model(&config.model);
    config.temperature = clamp_temperature(config.temperature);
    if !(config.top_p > 0.0 && config.top_p <= 1.0) {
        config.top_p = DEFAULT_TOP_P;
    }
    if config.endpoint.trim().is_empty() {
        config.endpoint = DEFAULT_ENDPOINT.to_string();
    }
    if config.fallback_model.trim().is_empty() {
        config.fallback_model = DEFAULT_FALLBACK_MODEL.to_string();
    }
    config.models.retain(|m| !m.identifier.trim().is_empty());
}

pub fn mask_api_key(api_key: &str) -> String {
    if api_key.len() <= 10 || !api_key.is_ascii() {
        return "******".to_string();
    }

    let prefix = &api_key[..6];
    let suffix = &api_key[api_key.len().saturating_sub(4)..];
    format!("{}********{}", prefix, suffix)
}

fn io_error(action: &'static str, path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::Io {
        action,
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
