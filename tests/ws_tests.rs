use futures::{SinkExt, StreamExt};
use livescribe::audio::AudioSource;
use livescribe::ws::WsClient;
use livescribe::{SessionConfig, StreamingSession};
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

struct ServerSeen {
    texts: Vec<serde_json::Value>,
    binary_frames: usize,
    binary_bytes: usize,
}

/// One-connection test server: records every inbound message and, once
/// `reply_after` binary frames have arrived, sends the scripted lines.
async fn spawn_script_server(
    script: Vec<&'static str>,
    reply_after: usize,
) -> (String, tokio::task::JoinHandle<ServerSeen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let mut seen = ServerSeen {
            texts: Vec::new(),
            binary_frames: 0,
            binary_bytes: 0,
        };
        let mut replied = false;

        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(value) = serde_json::from_str(&text) {
                        seen.texts.push(value);
                    }
                }
                Message::Binary(data) => {
                    seen.binary_frames += 1;
                    seen.binary_bytes += data.len();
                    if !replied && seen.binary_frames >= reply_after {
                        for line in &script {
                            ws.send(Message::Text(line.to_string())).await.unwrap();
                        }
                        replied = true;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        seen
    });

    (format!("ws://{}", addr), handle)
}

fn write_wav(path: &Path, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn test_end_to_end_streaming_session() {
    let (url, server) = spawn_script_server(
        vec![
            r#"{"type":"info","message":"asr-ready"}"#,
            r#"{"type":"partial","text":"hel"}"#,
            r#"{"type":"final","text":" hello "}"#,
            r#"{"type":"final","text":"world"}"#,
            "not json at all",
        ],
        2,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let wav_path = dir.path().join("speech.wav");
    write_wav(&wav_path, &vec![500i16; 2048 * 3]);

    let config = SessionConfig {
        server_url: url,
        language: "en".to_string(),
        source: AudioSource::File {
            path: wav_path,
            realtime: false,
        },
        echo_transcript: false,
        ..SessionConfig::default()
    };

    let session = StreamingSession::new(config);
    session.start().await.unwrap();

    let mut received = false;
    for _ in 0..100 {
        if session.stats().await.finals_received >= 2 {
            received = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(received, "timed out waiting for final transcripts");

    assert_eq!(session.transcript_text().await, "hello world");
    assert!(session.is_connected());
    assert_eq!(session.status_line().await, "asr-ready");

    let stats = session.stats().await;
    assert!(stats.frames_sent >= 2);
    assert_eq!(stats.partials_received, 1);
    assert_eq!(stats.finals_received, 2);

    session.stop().await.unwrap();
    session.close().await.unwrap();

    let seen = server.await.unwrap();
    let control = seen
        .texts
        .first()
        .expect("server never saw a control message");
    assert_eq!(control["type"], "control");
    assert_eq!(control["setLanguage"], "en");

    assert!(seen.binary_frames >= 2);
    // Every frame is 2048 mono samples at 2 bytes each
    assert_eq!(seen.binary_bytes % 4096, 0);
}

#[tokio::test]
async fn test_language_changes_reach_the_service() {
    let (url, server) = spawn_script_server(vec![], usize::MAX).await;

    let (mut sender, _receiver) = WsClient::connect(&url).await.unwrap();
    sender.send_control("").await.unwrap();
    sender.send_control("fr").await.unwrap();
    sender.close().await.unwrap();

    let seen = server.await.unwrap();
    assert_eq!(seen.texts.len(), 2);
    assert_eq!(seen.texts[0]["setLanguage"], "");
    assert_eq!(seen.texts[1]["setLanguage"], "fr");
}

#[tokio::test]
async fn test_receiver_skips_unrecognized_payloads() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text("garbage".to_string())).await.unwrap();
        ws.send(Message::Text(r#"{"type":"bogus"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"type":"partial","text":"ok"}"#.to_string()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
    });

    let (_sender, mut receiver) = WsClient::connect(&format!("ws://{}", addr))
        .await
        .unwrap();

    let msg = receiver.next().await.expect("expected a parsed message");
    assert_eq!(
        msg,
        livescribe::ws::ServerMessage::Partial {
            text: "ok".to_string()
        }
    );

    // Nothing valid remains before the close
    assert!(receiver.next().await.is_none());

    server.await.unwrap();
}
