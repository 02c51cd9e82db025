use crate::audio::AudioSource;
use serde::{Deserialize, Serialize};

/// Configuration for a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "dictation-2026-08-29-standup")
    pub session_id: String,

    /// WebSocket address of the transcription service
    pub server_url: String,

    /// Language code sent with the control message; empty = auto-detect
    pub language: String,

    /// Sample rate for outbound audio (the service expects 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (the service expects mono)
    pub channels: u16,

    /// Samples per frame (2048 ~= 128ms at 16kHz)
    pub frame_samples: usize,

    /// Where audio comes from: microphone or WAV file
    pub source: AudioSource,

    /// Print partial/final transcripts to stdout as they arrive
    pub echo_transcript: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("dictation-{}", uuid::Uuid::new_v4()),
            server_url: "ws://127.0.0.1:8765".to_string(),
            language: String::new(),
            sample_rate: 16000,
            channels: 1,
            frame_samples: 2048,
            source: AudioSource::default(),
            echo_transcript: true,
        }
    }
}
