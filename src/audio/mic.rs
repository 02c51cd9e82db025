use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Microphone capture backend built on cpal.
///
/// The cpal stream is not `Send`, so a dedicated worker thread owns the
/// device and stream for the lifetime of the capture. Frames reach the
/// session through a bounded channel; when the consumer falls behind,
/// whole frames are dropped rather than buffered.
pub struct MicBackend {
    preferred_device: Option<String>,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicBackend {
    pub fn new(preferred_device: Option<String>, config: AudioBackendConfig) -> Self {
        Self {
            preferred_device,
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicUsize::new(0)),
            worker: None,
        }
    }

    /// List input device names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(anyhow!("microphone capture already running"));
        }

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.capturing.store(true, Ordering::SeqCst);
        self.dropped.store(0, Ordering::SeqCst);

        let preferred = self.preferred_device.clone();
        let config = self.config.clone();
        let running = Arc::clone(&self.capturing);
        let dropped = Arc::clone(&self.dropped);

        let worker = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || capture_worker(preferred, config, tx, running, dropped, ready_tx))
            .context("failed to spawn capture thread")?;

        match ready_rx.await {
            Ok(Ok(device_name)) => {
                info!(
                    "Capturing from '{}' ({}Hz mono, {} samples/frame)",
                    device_name, self.config.sample_rate, self.config.frame_samples
                );
                debug!(
                    "noise_suppression={} echo_cancellation={} (platform-managed, best-effort)",
                    self.config.noise_suppression, self.config.echo_cancellation
                );
                self.worker = Some(worker);
                Ok(rx)
            }
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = worker.join();
                Err(anyhow!("capture thread exited before reporting readiness"))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .context("capture thread join task failed")?
                .map_err(|_| anyhow!("capture thread panicked"))?;
        }

        let dropped = self.dropped.load(Ordering::SeqCst);
        if dropped > 0 {
            warn!("{} frames dropped during capture (consumer fell behind)", dropped);
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Downmix interleaved multi-channel input to mono while applying the
/// provided converter, so the rest of the pipeline stays format-agnostic.
pub(crate) fn downmix_into<T, F>(buf: &mut Vec<f32>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Accumulates device callbacks into fixed-size mono frames at the target
/// rate and hands them off without blocking the audio thread.
struct FrameSlicer {
    frame_samples: usize,
    step: usize,
    sample_rate: u32,
    pending: Vec<f32>,
    mono: Vec<f32>,
    sent_samples: u64,
    tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicUsize>,
}

impl FrameSlicer {
    fn new(
        config: &AudioBackendConfig,
        device_rate: u32,
        tx: mpsc::Sender<AudioFrame>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        // Integer decimation only; a device running slower than the target
        // rate passes through unchanged.
        let step = if config.sample_rate > 0 && device_rate > config.sample_rate {
            (device_rate / config.sample_rate) as usize
        } else {
            1
        };

        Self {
            frame_samples: config.frame_samples.max(1),
            step: step.max(1),
            sample_rate: config.sample_rate,
            pending: Vec::with_capacity(config.frame_samples),
            mono: Vec::new(),
            sent_samples: 0,
            tx,
            dropped,
        }
    }

    fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.mono.clear();
        downmix_into(&mut self.mono, data, channels, convert);

        if self.step > 1 {
            self.pending.extend(self.mono.iter().copied().step_by(self.step));
        } else {
            self.pending.extend_from_slice(&self.mono);
        }

        while self.pending.len() >= self.frame_samples {
            let samples: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            let timestamp_ms = self.sent_samples * 1000 / u64::from(self.sample_rate.max(1));
            self.sent_samples += self.frame_samples as u64;

            let frame = AudioFrame {
                samples,
                sample_rate: self.sample_rate,
                channels: 1,
                timestamp_ms,
            };

            match self.tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}

fn open_device(preferred: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match preferred {
        Some(name) => {
            let mut devices = host.input_devices().context("no input devices available")?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("input device '{name}' not found"))
        }
        None => host
            .default_input_device()
            .context("no default input device available"),
    }
}

fn build_stream(
    device: &cpal::Device,
    device_config: &StreamConfig,
    format: SampleFormat,
    channels: usize,
    mut slicer: FrameSlicer,
) -> Result<cpal::Stream> {
    let err_fn = |err| warn!("audio stream error: {err}");

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            device_config,
            move |data: &[f32], _| slicer.push(data, channels, |s| s),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            device_config,
            move |data: &[i16], _| slicer.push(data, channels, |s| s as f32 / 32_768.0),
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            device_config,
            move |data: &[u16], _| {
                slicer.push(data, channels, |s| (s as f32 - 32_768.0) / 32_768.0)
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("unsupported sample format: {other:?}")),
    };

    Ok(stream)
}

fn capture_worker(
    preferred: Option<String>,
    config: AudioBackendConfig,
    tx: mpsc::Sender<AudioFrame>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    ready: oneshot::Sender<Result<String>>,
) {
    let setup = (|| -> Result<(cpal::Stream, String)> {
        let device = open_device(preferred.as_deref())?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());

        let default_config = device
            .default_input_config()
            .context("failed to query default input config")?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let device_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        debug!(
            "Input device '{}': format={:?} rate={}Hz channels={}",
            device_name, format, device_rate, channels
        );

        let slicer = FrameSlicer::new(&config, device_rate, tx, dropped);
        let stream = build_stream(&device, &device_config, format, channels, slicer)?;
        stream.play().context("failed to start input stream")?;
        Ok((stream, device_name))
    })();

    match setup {
        Ok((stream, device_name)) => {
            if ready.send(Ok(device_name)).is_err() {
                return;
            }
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }
            // Dropping the stream disconnects the capture graph and
            // releases the device.
            drop(stream);
        }
        Err(e) => {
            let _ = ready.send(Err(e));
        }
    }
}
