use crate::error::ConfigError;
use crate::types::Credential;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_MATHPIX_ENDPOINT: &str = "https://api.mathpix.com/v3/text";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub document: DocumentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Png,
    Jpeg,
}

impl SnapshotFormat {
    pub fn mime(self) -> &'static str {
        match self {
            SnapshotFormat::Png => "image/png",
            SnapshotFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Png => "png",
            SnapshotFormat::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default = "default_camera_backend")]
    pub backend: String,

    #[serde(default = "default_camera_device")]
    pub device: String,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,

    #[serde(default)]
    pub format: SnapshotFormat,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: default_camera_backend(),
            device: default_camera_device(),
            width: None,
            height: None,
            format: SnapshotFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognitionConfig {
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default)]
    pub mathpix: MathpixConfig,

    #[serde(default)]
    pub null: Option<NullEngineConfig>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            mathpix: MathpixConfig::default(),
            null: None,
        }
    }
}

impl RecognitionConfig {
    /// Engine-specific table handed to `RecognitionEngine::initialize`.
    pub fn engine_table(&self) -> toml::Value {
        let table = match self.engine.as_str() {
            "mathpix" => toml::Value::try_from(&self.mathpix).ok(),
            "null" => self
                .null
                .as_ref()
                .and_then(|cfg| toml::Value::try_from(cfg).ok()),
            _ => None,
        };
        table.unwrap_or_else(|| toml::Value::Table(Default::default()))
    }
}

#[derive(Deserialize, Serialize, Clone)]
pub struct MathpixConfig {
    #[serde(default = "default_app_id")]
    pub app_id: String,

    #[serde(default, skip_serializing)]
    pub app_key: String,

    #[serde(default = "default_mathpix_endpoint")]
    pub endpoint: String,
}

impl Default for MathpixConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            app_key: String::new(),
            endpoint: default_mathpix_endpoint(),
        }
    }
}

impl std::fmt::Debug for MathpixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MathpixConfig")
            .field("app_id", &self.app_id)
            .field("app_key", &Credential::new(self.app_key.clone()))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NullEngineConfig {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    #[serde(default = "default_document_path")]
    pub path: PathBuf,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: default_document_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `v4l` when that backend is compiled in, otherwise the test card.
fn default_camera_backend() -> String {
    if cfg!(feature = "v4l") {
        "v4l".to_string()
    } else {
        "pattern".to_string()
    }
}

fn default_camera_device() -> String {
    "/dev/video0".to_string()
}

fn default_engine() -> String {
    "mathpix".to_string()
}

fn default_app_id() -> String {
    "paper2md".to_string()
}

fn default_mathpix_endpoint() -> String {
    DEFAULT_MATHPIX_ENDPOINT.to_string()
}

fn default_document_path() -> PathBuf {
    PathBuf::from("inbox.md")
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"))
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in env_var_pattern().captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// The recognition service credential, as supplied by the user.
    pub fn credential(&self) -> Credential {
        Credential::new(self.recognition.mathpix.app_key.clone())
    }
}
