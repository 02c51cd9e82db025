use livescribe::audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
};
use std::path::Path;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

async fn collect_frames(backend: &mut Box<dyn AudioBackend>) -> Vec<AudioFrame> {
    let mut rx = backend.start().await.unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    frames
}

fn config_2048() -> AudioBackendConfig {
    AudioBackendConfig {
        sample_rate: 16000,
        channels: 1,
        frame_samples: 2048,
        ..AudioBackendConfig::default()
    }
}

#[tokio::test]
async fn test_file_backend_produces_fixed_size_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mono16k.wav");

    // 5000 samples: two full frames, the 904-sample tail is discarded
    write_wav(&path, 16000, 1, &vec![1000i16; 5000]);

    let mut backend = AudioBackendFactory::create(
        AudioSource::File {
            path,
            realtime: false,
        },
        config_2048(),
    )
    .unwrap();

    let frames = collect_frames(&mut backend).await;
    assert_eq!(frames.len(), 2);
    for frame in &frames {
        assert_eq!(frame.samples.len(), 2048);
        assert_eq!(frame.sample_rate, 16000);
        assert_eq!(frame.channels, 1);
    }

    // 2048 samples at 16kHz is 128ms
    assert_eq!(frames[0].timestamp_ms, 0);
    assert_eq!(frames[1].timestamp_ms, 128);

    backend.stop().await.unwrap();
}

#[tokio::test]
async fn test_file_backend_downmixes_and_decimates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo32k.wav");

    // Stereo at 32kHz: 8192 samples per channel interleaved.
    // Downmix -> 8192 mono, decimate by 2 -> 4096 -> two 2048 frames.
    write_wav(&path, 32000, 2, &vec![2000i16; 16384]);

    let mut backend = AudioBackendFactory::create(
        AudioSource::File {
            path,
            realtime: false,
        },
        config_2048(),
    )
    .unwrap();

    let frames = collect_frames(&mut backend).await;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].samples.len(), 2048);

    // Both channels carry the same value, so the downmix preserves it
    let expected = 2000.0f32 / 32768.0;
    assert!((frames[0].samples[0] - expected).abs() < 1e-6);
}

#[tokio::test]
async fn test_file_backend_sample_values_are_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("values.wav");

    let mut samples = vec![0i16; 2048];
    samples[0] = i16::MIN;
    samples[1] = i16::MAX;
    write_wav(&path, 16000, 1, &samples);

    let mut backend = AudioBackendFactory::create(
        AudioSource::File {
            path,
            realtime: false,
        },
        config_2048(),
    )
    .unwrap();

    let frames = collect_frames(&mut backend).await;
    assert_eq!(frames.len(), 1);
    assert!((frames[0].samples[0] - (-1.0)).abs() < 1e-6);
    assert!(frames[0].samples[1] < 1.0);
    assert!(frames[0].samples[1] > 0.999);
}

#[tokio::test]
async fn test_missing_file_is_rejected_at_creation() {
    let result = AudioBackendFactory::create(
        AudioSource::File {
            path: "does-not-exist.wav".into(),
            realtime: false,
        },
        config_2048(),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_backend_capturing_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flag.wav");
    write_wav(&path, 16000, 1, &vec![0i16; 4096]);

    let mut backend = AudioBackendFactory::create(
        AudioSource::File {
            path,
            realtime: false,
        },
        config_2048(),
    )
    .unwrap();

    assert!(!backend.is_capturing());
    let mut rx = backend.start().await.unwrap();
    while rx.recv().await.is_some() {}
    backend.stop().await.unwrap();
    assert!(!backend.is_capturing());
}
