use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::mic::downmix_into;
use anyhow::{anyhow, Context, Result};
use hound::WavReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// WAV file audio source.
///
/// Produces the same fixed-size mono frames as the microphone backend, for
/// tests and offline streaming. With `realtime` set, frames are paced at
/// their wall-clock duration so the service sees a live-like stream.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    realtime: bool,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: AudioBackendConfig, realtime: bool) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("audio file not found: {}", path.display()));
        }
        Ok(Self {
            path,
            config,
            realtime,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        })
    }

    fn load_frames(&self) -> Result<Vec<AudioFrame>> {
        let reader = WavReader::open(&self.path)
            .with_context(|| format!("failed to open WAV file: {}", self.path.display()))?;
        let spec = reader.spec();

        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(anyhow!(
                "unsupported WAV format: expected 16-bit int, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            ));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read audio samples")?;

        let mut mono = Vec::with_capacity(samples.len() / usize::from(spec.channels.max(1)));
        downmix_into(&mut mono, &samples, usize::from(spec.channels.max(1)), |s| {
            s as f32 / 32_768.0
        });

        // Integer decimation, same policy as the live backend.
        let target_rate = self.config.sample_rate;
        let resampled: Vec<f32> = if target_rate > 0 && spec.sample_rate > target_rate {
            let step = (spec.sample_rate / target_rate) as usize;
            mono.iter().copied().step_by(step.max(1)).collect()
        } else {
            mono
        };

        let frame_samples = self.config.frame_samples.max(1);
        let mut frames = Vec::new();
        let mut sent: u64 = 0;
        for chunk in resampled.chunks_exact(frame_samples) {
            let timestamp_ms = sent * 1000 / u64::from(target_rate.max(1));
            sent += frame_samples as u64;
            frames.push(AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: target_rate,
                channels: 1,
                timestamp_ms,
            });
        }

        info!(
            "Loaded {}: {} frames of {} samples at {}Hz",
            self.path.display(),
            frames.len(),
            frame_samples,
            target_rate
        );

        Ok(frames)
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(anyhow!("file playback already running"));
        }

        let frames = self.load_frames()?;
        let (tx, rx) = mpsc::channel(32);

        self.capturing.store(true, Ordering::SeqCst);
        let capturing = Arc::clone(&self.capturing);
        let frame_duration = Duration::from_millis(
            self.config.frame_samples.max(1) as u64 * 1000
                / u64::from(self.config.sample_rate.max(1)),
        );
        let realtime = self.realtime;

        let task = tokio::spawn(async move {
            for frame in frames {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(frame).await.is_err() {
                    break;
                }
                if realtime {
                    tokio::time::sleep(frame_duration).await;
                }
            }
            capturing.store(false, Ordering::SeqCst);
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
