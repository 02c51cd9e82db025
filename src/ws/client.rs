use super::messages::{ClientErrorMessage, ControlMessage, ServerMessage};
use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsTransport = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection to the transcription service.
///
/// `connect` yields a split sender/receiver pair so audio publishing and
/// transcript consumption can live in separate tasks.
pub struct WsClient;

impl WsClient {
    pub async fn connect(url: &str) -> Result<(WsSender, WsReceiver)> {
        info!("Connecting to transcription service at {}", url);

        let (stream, _response) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to {url}"))?;

        info!("Connected to transcription service");

        let (sink, stream) = stream.split();
        Ok((WsSender { sink }, WsReceiver { stream }))
    }
}

/// Outbound half: control messages as text frames, audio as binary frames.
pub struct WsSender {
    sink: SplitSink<WsTransport, Message>,
}

impl WsSender {
    /// Send a language control message.
    pub async fn send_control(&mut self, language: &str) -> Result<()> {
        let payload = serde_json::to_string(&ControlMessage::set_language(language))?;
        self.sink
            .send(Message::Text(payload))
            .await
            .context("failed to send control message")?;
        debug!("Sent control message (language='{}')", language);
        Ok(())
    }

    /// Report a client-side failure to the service for its logs.
    pub async fn send_client_error(&mut self, message: &str) -> Result<()> {
        let payload = serde_json::to_string(&ClientErrorMessage::new(message))?;
        self.sink
            .send(Message::Text(payload))
            .await
            .context("failed to send client error message")?;
        Ok(())
    }

    /// Send one audio frame as a standalone binary message.
    pub async fn send_audio(&mut self, pcm: Vec<u8>) -> Result<()> {
        self.sink
            .send(Message::Binary(pcm))
            .await
            .context("failed to send audio frame")?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.sink
            .send(Message::Close(None))
            .await
            .context("failed to close connection")?;
        Ok(())
    }
}

/// Inbound half: yields recognized server messages, skipping everything
/// else. Returns `None` once the socket closes or errors.
pub struct WsReceiver {
    stream: SplitStream<WsTransport>,
}

impl WsReceiver {
    pub async fn next(&mut self) -> Option<ServerMessage> {
        while let Some(item) = self.stream.next().await {
            match item {
                Ok(Message::Text(text)) => {
                    if let Some(msg) = ServerMessage::parse(&text) {
                        return Some(msg);
                    }
                    debug!("Ignoring unrecognized payload: {}", text);
                }
                Ok(Message::Close(_)) => {
                    info!("Transcription service closed the connection");
                    return None;
                }
                // The service is not expected to send binary frames;
                // pings and pongs are handled by tungstenite itself.
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    return None;
                }
            }
        }
        None
    }
}
