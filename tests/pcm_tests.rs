use livescribe::audio::pcm::{f32_to_pcm16, frame_to_wire, pcm16_to_le_bytes};

#[test]
fn test_clamping_extremes() {
    // Anything at or above 1.0 maps to the max positive value
    assert_eq!(f32_to_pcm16(&[1.0]), vec![32767]);
    assert_eq!(f32_to_pcm16(&[2.5]), vec![32767]);

    // Anything at or below -1.0 maps to the minimum value
    assert_eq!(f32_to_pcm16(&[-1.0]), vec![-32768]);
    assert_eq!(f32_to_pcm16(&[-7.0]), vec![-32768]);
}

#[test]
fn test_asymmetric_scaling_with_truncation() {
    // 0.5 * 32767 = 16383.5, truncated; -0.5 * 32768 = -16384 exactly
    let out = f32_to_pcm16(&[0.5, -0.5, 1.5, -1.5]);
    assert_eq!(out, vec![16383, -16384, 32767, -32768]);
}

#[test]
fn test_zero_and_fractional_values() {
    assert_eq!(f32_to_pcm16(&[0.0]), vec![0]);

    // 0.25 * 32767 = 8191.75 truncates to 8191
    assert_eq!(f32_to_pcm16(&[0.25]), vec![8191]);

    // -0.25 * 32768 = -8192 exactly
    assert_eq!(f32_to_pcm16(&[-0.25]), vec![-8192]);
}

#[test]
fn test_little_endian_serialization() {
    assert_eq!(pcm16_to_le_bytes(&[1]), vec![0x01, 0x00]);
    assert_eq!(pcm16_to_le_bytes(&[-2]), vec![0xFE, 0xFF]);
    assert_eq!(pcm16_to_le_bytes(&[0x1234]), vec![0x34, 0x12]);
}

#[test]
fn test_frame_to_wire_length() {
    let samples = vec![0.1f32; 2048];
    let wire = frame_to_wire(&samples);
    assert_eq!(wire.len(), 4096);
}

#[test]
fn test_frame_to_wire_roundtrip_values() {
    let wire = frame_to_wire(&[0.5, -1.0]);
    let decoded: Vec<i16> = wire
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(decoded, vec![16383, -32768]);
}
