use anyhow::Result;
use clap::Parser;
use livescribe::audio::{AudioSource, MicBackend};
use livescribe::{Config, SessionConfig, StreamingSession};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "livescribe",
    version,
    about = "Stream microphone audio to a transcription service and collect live transcripts"
)]
struct Cli {
    /// WebSocket address of the transcription service
    #[arg(long)]
    server_url: Option<String>,

    /// Language code sent to the service (empty = auto-detect)
    #[arg(long)]
    language: Option<String>,

    /// Input device name (default: system default microphone)
    #[arg(long)]
    device: Option<String>,

    /// Stream a 16-bit WAV file instead of the microphone
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Config file stem (TOML/YAML/JSON, extension resolved automatically)
    #[arg(long, default_value = "config/livescribe")]
    config: String,

    /// Directory for saved transcripts
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Start streaming immediately
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if cli.list_devices {
        for name in MicBackend::list_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let cfg = Config::load(&cli.config)?;

    let source = match cli.wav {
        Some(path) => AudioSource::File {
            path,
            realtime: true,
        },
        None => AudioSource::Microphone { device: cli.device },
    };

    let session_config = SessionConfig {
        server_url: cli.server_url.unwrap_or(cfg.server.url),
        language: cli.language.unwrap_or_default(),
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        frame_samples: cfg.audio.frame_samples,
        source,
        ..SessionConfig::default()
    };

    let output_dir = cli
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&cfg.transcripts.output_dir));

    info!("livescribe v{}", env!("CARGO_PKG_VERSION"));
    info!("Service: {}", session_config.server_url);

    let session = StreamingSession::new(session_config);

    if cli.autostart {
        if let Err(e) = session.start().await {
            error!("Failed to start streaming: {e:#}");
        }
    }

    println!("Commands: start, stop, clear, copy, save, lang <code>, status, show, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (cmd, arg) = match line.split_once(' ') {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };

        match cmd {
            "" => {}
            "start" => {
                if let Err(e) = session.start().await {
                    error!("Failed to start streaming: {e:#}");
                }
            }
            "stop" => match session.stop().await {
                Ok(stats) => info!(
                    "Stopped after {} frames sent ({} bytes)",
                    stats.frames_sent, stats.bytes_sent
                ),
                Err(e) => error!("Failed to stop capture: {e:#}"),
            },
            "clear" => {
                session.clear_transcript().await;
                println!("(transcript cleared)");
            }
            "copy" => match session.copy_transcript().await {
                Ok(()) => println!("(copied to clipboard)"),
                Err(e) => error!("Copy failed: {e:#}"),
            },
            "save" => match session.save_transcript(&output_dir).await {
                Ok(path) => println!("(saved to {})", path.display()),
                Err(e) => error!("Save failed: {e:#}"),
            },
            "lang" => {
                if let Err(e) = session.set_language(arg).await {
                    error!("Language change failed: {e:#}");
                }
            }
            "status" => {
                let stats = session.stats().await;
                println!(
                    "{} ({}) | frames sent: {} | dropped: {} | partials: {} | finals: {}",
                    stats.state.label(),
                    session.status_line().await,
                    stats.frames_sent,
                    stats.frames_dropped,
                    stats.partials_received,
                    stats.finals_received
                );
                if let Some(err) = session.last_error().await {
                    println!("last service error: {err}");
                }
            }
            "show" => println!("{}", session.transcript_text().await),
            "quit" | "exit" => break,
            other => println!("unknown command: {other}"),
        }
    }

    session.close().await?;
    Ok(())
}
