use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// A fixed-size block of captured audio.
///
/// Samples are mono f32 in the normalized [-1.0, 1.0] range. Conversion to
/// the 16-bit wire format happens at send time (see [`super::pcm`]).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Captured samples, one channel
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (always 1 after downmixing)
    pub channels: u16,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for an audio capture backend.
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (device output is decimated if it runs faster)
    pub sample_rate: u32,
    /// Target channel count (multi-channel input is downmixed)
    pub channels: u16,
    /// Samples per delivered frame (2048 ~= 128ms at 16kHz)
    pub frame_samples: usize,
    /// Request noise suppression from the platform. Best-effort only;
    /// whether it is applied is the platform's decision and not verified.
    pub noise_suppression: bool,
    /// Request echo cancellation from the platform. Best-effort only.
    pub echo_cancellation: bool,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_samples: 2048,
            noise_suppression: true,
            echo_cancellation: true,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream (all platforms)
/// - File: read from a WAV file (for testing/offline streaming)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive fixed-size frames in
    /// capture order.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AudioSource {
    /// Microphone input; `device` picks a named input, `None` the default
    Microphone { device: Option<String> },
    /// WAV file input; `realtime` paces frames at their wall-clock duration
    File { path: PathBuf, realtime: bool },
}

impl Default for AudioSource {
    fn default() -> Self {
        AudioSource::Microphone { device: None }
    }
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create an audio backend for the given source
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone { device } => {
                let backend = super::mic::MicBackend::new(device, config);
                Ok(Box::new(backend))
            }
            AudioSource::File { path, realtime } => {
                let backend = super::file::FileBackend::new(path, config, realtime)?;
                Ok(Box::new(backend))
            }
        }
    }
}
