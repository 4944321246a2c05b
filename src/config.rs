use crate::{
    error::{GenerationError, Result},
    models::Credentials,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const API_KEY: &str = "api_key";
pub const STEPS_FOR_GENERATION: &str = "steps_for_generation";

pub const DEFAULT_ENDPOINT: &str = "https://api.wizmodel.com/sdapi/v1/txt2img";
pub const DEFAULT_ASSETS_ROOT: &str = "/admin/assets";
pub const DEFAULT_STEPS: u32 = 50;

/// Read-only view of the settings the host stores for this plugin.
pub trait SettingsProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
}

/// In-memory settings, used by hosts that hand over a settings map and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: HashMap<String, Value>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl SettingsProvider for StaticSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

/// Settings backed by process environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings;

impl EnvSettings {
    pub fn new() -> Self {
        Self
    }

    fn variable_for(key: &str) -> Option<&'static str> {
        match key {
            API_KEY => Some("WIZMODEL_API_KEY"),
            STEPS_FOR_GENERATION => Some("SD_CAT_STEPS"),
            _ => None,
        }
    }
}

impl SettingsProvider for EnvSettings {
    fn get(&self, key: &str) -> Option<Value> {
        let variable = Self::variable_for(key)?;
        env::var(variable).ok().map(Value::String)
    }
}

/// Plugin settings as loaded from the host for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginSettings {
    pub api_key: Option<String>,
    pub steps_for_generation: Option<i64>,
}

impl PluginSettings {
    pub fn load(provider: &dyn SettingsProvider) -> Result<Self> {
        Ok(Self {
            api_key: Self::load_api_key(provider)?,
            steps_for_generation: Self::load_steps(provider)?,
        })
    }

    pub fn load_api_key(provider: &dyn SettingsProvider) -> Result<Option<String>> {
        match provider.get(API_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(key)) => {
                let key = key.trim();
                Ok((!key.is_empty()).then(|| key.to_string()))
            }
            Some(other) => Err(GenerationError::ConfigError(format!(
                "{} must be a string, got {}",
                API_KEY, other
            ))),
        }
    }

    /// Whole numbers are accepted as JSON integers, integral floats (`30.0`)
    /// or numeric strings. Blank and `null` mean unset.
    pub fn load_steps(provider: &dyn SettingsProvider) -> Result<Option<i64>> {
        let invalid = |value: &dyn std::fmt::Display| {
            GenerationError::ConfigError(format!(
                "{} must be an integer, got {}",
                STEPS_FOR_GENERATION, value
            ))
        };

        match provider.get(STEPS_FOR_GENERATION) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(steps), _) => Ok(Some(steps)),
                (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(Some(f as i64))
                }
                _ => Err(invalid(&n)),
            },
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid(&format!("{:?}", s))),
            Some(other) => Err(invalid(&other)),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.api_key.clone().unwrap_or_default())
    }
}

/// JSON schema of the plugin settings form shown by the host.
pub fn settings_schema() -> Value {
    json!({
        "title": "StableDiffusionCatSettings",
        "type": "object",
        "properties": {
            API_KEY: {
                "title": "Wizmodel API key",
                "type": "string"
            },
            STEPS_FOR_GENERATION: {
                "title": "Steps for image generation",
                "type": "integer",
                "default": DEFAULT_STEPS
            }
        },
        "required": [API_KEY]
    })
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub assets_root: PathBuf,
    pub default_steps: u32,
    pub request_timeout: Option<Duration>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            assets_root: PathBuf::from(DEFAULT_ASSETS_ROOT),
            default_steps: DEFAULT_STEPS,
            request_timeout: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoint = env::var("SD_CAT_ENDPOINT").unwrap_or(defaults.endpoint);
        let assets_root = env::var("SD_CAT_ASSETS_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.assets_root);
        let request_timeout = env::var("SD_CAT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        GeneratorConfig {
            endpoint,
            assets_root,
            default_steps: defaults.default_steps,
            request_timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_assets_root(mut self, assets_root: impl Into<PathBuf>) -> Self {
        self.assets_root = assets_root.into();
        self
    }

    pub fn with_default_steps(mut self, steps: u32) -> Self {
        self.default_steps = steps;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
