use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No capture running; the connection may or may not be open
    Idle,
    /// Connection attempt in progress
    Connecting,
    /// Capturing and sending audio
    Streaming,
    /// Connection closed by either side
    Closed,
    /// Connection or send failure; no automatic retry
    Error,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        }
    }
}

/// Statistics about a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio frames sent to the service
    pub frames_sent: u64,

    /// Audio bytes sent to the service
    pub bytes_sent: u64,

    /// Frames discarded because the connection was not open
    pub frames_dropped: u64,

    /// Partial transcript messages received
    pub partials_received: u64,

    /// Final transcript messages received
    pub finals_received: u64,
}
