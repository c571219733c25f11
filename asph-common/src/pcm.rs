//! Byte layout of signed little-endian PCM samples
//!
//! Samples are carried as `i32` in their native range (for example
//! -32768..=32767 for 16-bit) and packed into 1, 2 or 3 bytes.

/// Pack samples of `bits_per_sample` width into little-endian bytes.
///
/// Values outside the range of the target width are truncated to its low bits,
/// so callers convert into range first.
pub fn pack_samples(samples: &[i32], bits_per_sample: u16) -> Vec<u8> {
    let width = bits_per_sample as usize / 8;
    let mut out = Vec::with_capacity(samples.len() * width);
    for &sample in samples {
        out.extend_from_slice(&sample.to_le_bytes()[..width]);
    }
    out
}

/// Unpack little-endian bytes into sign-extended samples.
///
/// A trailing partial sample is ignored.
pub fn unpack_samples(bytes: &[u8], bits_per_sample: u16) -> Vec<i32> {
    match bits_per_sample {
        8 => bytes.iter().map(|&b| b as i8 as i32).collect(),
        16 => bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as i32)
            .collect(),
        24 => bytes
            .chunks_exact(3)
            .map(|c| i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8)
            .collect(),
        _ => Vec::new(),
    }
}

/// Full-scale magnitude for a bit depth (2^(bits-1))
pub fn full_scale(bits_per_sample: u16) -> f32 {
    (1u32 << (bits_per_sample.clamp(1, 32) - 1)) as f32
}

/// Convert a native-range sample to `[-1.0, 1.0)`
pub fn to_f32(sample: i32, bits_per_sample: u16) -> f32 {
    sample as f32 / full_scale(bits_per_sample)
}

/// Convert a float sample to the native range of `bits_per_sample`, clamping
pub fn from_f32(sample: f32, bits_per_sample: u16) -> i32 {
    let scale = full_scale(bits_per_sample);
    let max = scale - 1.0;
    (sample * scale).round().clamp(-scale, max) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_24bit_layout() {
        let bytes = pack_samples(&[-2, 0x123456], 24);
        assert_eq!(bytes, vec![0xFE, 0xFF, 0xFF, 0x56, 0x34, 0x12]);
        assert_eq!(unpack_samples(&bytes, 24), vec![-2, 0x123456]);
    }

    #[test]
    fn test_unpack_sign_extends() {
        assert_eq!(unpack_samples(&[0x80], 8), vec![-128]);
        assert_eq!(unpack_samples(&[0x00, 0x80], 16), vec![-32768]);
        assert_eq!(unpack_samples(&[0x00, 0x00, 0x80], 24), vec![-8_388_608]);
    }

    #[test]
    fn test_unpack_ignores_partial_sample() {
        assert_eq!(unpack_samples(&[1, 0, 7], 16), vec![1]);
    }

    #[test]
    fn test_float_conversion_clamps() {
        assert_eq!(from_f32(1.5, 16), 32767);
        assert_eq!(from_f32(-1.5, 16), -32768);
        assert_eq!(from_f32(0.5, 8), 64);
        assert!((to_f32(-32768, 16) + 1.0).abs() < f32::EPSILON);
    }
}
