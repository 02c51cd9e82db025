use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub transcripts: TranscriptsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8765".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_samples: 2048,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscriptsConfig {
    pub output_dir: String,
}

impl Default for TranscriptsConfig {
    fn default() -> Self {
        Self {
            output_dir: "transcripts".to_string(),
        }
    }
}

impl Config {
    /// Load from a config file; a missing file falls back to defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
