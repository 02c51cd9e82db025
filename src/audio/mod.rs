pub mod backend;
pub mod file;
pub mod mic;
pub mod pcm;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use file::FileBackend;
pub use mic::MicBackend;
