use anyhow::Result;
use serde::Deserialize;

use crate::audio::AudioBackendConfig;
use crate::permission::PermissionsConfig;
use crate::session::SessionOptions;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    pub nats: NatsConfig,
    #[serde(default)]
    pub audio: AudioBackendConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionConfig {
    /// Defaults applied to fields a caller leaves out of `start`
    #[serde(default)]
    pub defaults: SessionOptions,
    /// Locale identifiers advertised by the recognizer
    #[serde(default)]
    pub locales: Vec<String>,
    /// Buffered events per SSE subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            defaults: SessionOptions::default(),
            locales: Vec::new(),
            event_capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

impl Config {
    /// Load `path` (any format the `config` crate knows) with `SPEECH__*`
    /// environment overrides, e.g. `SPEECH__NATS__URL`
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SPEECH").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
