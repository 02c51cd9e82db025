//! Streaming session management
//!
//! This module provides the `StreamingSession` abstraction that owns:
//! - The WebSocket connection to the transcription service
//! - Audio capture and PCM16 framing
//! - Transcript state (committed + partial text)
//! - Session statistics and state

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::StreamingSession;
pub use stats::{SessionState, SessionStats};
