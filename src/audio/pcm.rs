/// Convert normalized f32 samples to signed 16-bit PCM.
///
/// Each sample is clamped to [-1.0, 1.0] before scaling. Negative values
/// scale by 32768 and non-negative values by 32767 so both ends of the
/// 16-bit range are reachable without overflow. The scaled value is
/// truncated by the cast, not rounded.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

/// Serialize PCM16 samples as little-endian bytes for the wire.
pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Convert one captured frame straight to its binary wire payload.
pub fn frame_to_wire(samples: &[f32]) -> Vec<u8> {
    pcm16_to_le_bytes(&f32_to_pcm16(samples))
}
