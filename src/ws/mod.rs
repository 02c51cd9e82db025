pub mod client;
pub mod messages;

pub use client::{WsClient, WsReceiver, WsSender};
pub use messages::{ClientErrorMessage, ControlMessage, ServerMessage};
