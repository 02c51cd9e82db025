pub mod state;
pub mod store;

pub use state::TranscriptState;
pub use store::{copy_to_clipboard, save_transcript, timestamp_slug};
