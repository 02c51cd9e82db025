pub mod audio;
pub mod config;
pub mod session;
pub mod transcript;
pub mod ws;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, FileBackend,
    MicBackend,
};
pub use config::Config;
pub use session::{SessionConfig, SessionState, SessionStats, StreamingSession};
pub use transcript::TranscriptState;
pub use ws::{ControlMessage, ServerMessage, WsClient};
