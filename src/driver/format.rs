//! Buffer sample formats

/// Layout of the bytes handed to [`Buffer::data`](super::Buffer::data)
///
/// 8-bit samples are unsigned with 128 as silence; every wider format is
/// little endian (signed for 16-bit, IEEE for the float formats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Mono8,
    Stereo8,
    Mono16,
    Stereo16,
    MonoFloat32,
    StereoFloat32,
    MonoDouble,
    StereoDouble,
}

impl Format {
    pub fn channels(self) -> u16 {
        match self {
            Format::Mono8 | Format::Mono16 | Format::MonoFloat32 | Format::MonoDouble => 1,
            _ => 2,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            Format::Mono8 | Format::Stereo8 => 1,
            Format::Mono16 | Format::Stereo16 => 2,
            Format::MonoFloat32 | Format::StereoFloat32 => 4,
            Format::MonoDouble | Format::StereoDouble => 8,
        }
    }

    pub fn bits(self) -> u16 {
        self.bytes_per_sample() as u16 * 8
    }

    /// Bytes per frame (one sample for every channel)
    pub fn frame_size(self) -> usize {
        self.bytes_per_sample() * self.channels() as usize
    }

    /// Decode one sample; `bytes` must be exactly `bytes_per_sample()` long
    pub fn decode_sample(self, bytes: &[u8]) -> f32 {
        match self {
            Format::Mono8 | Format::Stereo8 => (bytes[0] as f32 - 128.0) / 128.0,
            Format::Mono16 | Format::Stereo16 => {
                i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0
            }
            Format::MonoFloat32 | Format::StereoFloat32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
            Format::MonoDouble | Format::StereoDouble => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                f64::from_le_bytes(raw) as f32
            }
        }
    }

    /// Decode a whole byte slice into interleaved `f32` samples
    pub fn decode(self, bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(self.bytes_per_sample())
            .map(|sample| self.decode_sample(sample))
            .collect()
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layout = if self.channels() == 1 { "mono" } else { "stereo" };
        match self {
            Format::MonoFloat32 | Format::StereoFloat32 => write!(f, "{} float32", layout),
            Format::MonoDouble | Format::StereoDouble => write!(f, "{} double", layout),
            _ => write!(f, "{} {}-bit", layout, self.bits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sizes() {
        assert_eq!(Format::Mono8.frame_size(), 1);
        assert_eq!(Format::Stereo16.frame_size(), 4);
        assert_eq!(Format::StereoFloat32.frame_size(), 8);
        assert_eq!(Format::MonoDouble.bits(), 64);
        assert_eq!(Format::StereoDouble.channels(), 2);
    }

    #[test]
    fn test_decode_eight_bit_is_unsigned() {
        assert_relative_eq!(Format::Mono8.decode_sample(&[128]), 0.0);
        assert_relative_eq!(Format::Mono8.decode_sample(&[0]), -1.0);
        assert_relative_eq!(Format::Mono8.decode_sample(&[192]), 0.5);
    }

    #[test]
    fn test_decode_wide_formats() {
        let half = (16384i16).to_le_bytes();
        assert_relative_eq!(Format::Mono16.decode_sample(&half), 0.5);

        let quarter = 0.25f32.to_le_bytes();
        assert_relative_eq!(Format::MonoFloat32.decode_sample(&quarter), 0.25);

        let negative = (-0.75f64).to_le_bytes();
        assert_relative_eq!(Format::MonoDouble.decode_sample(&negative), -0.75);
    }

    #[test]
    fn test_decode_slice() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i16.to_le_bytes());
        bytes.extend_from_slice(&(-32768i16).to_le_bytes());
        let samples = Format::Stereo16.decode(&bytes);
        assert_eq!(samples.len(), 2);
        assert_relative_eq!(samples[1], -1.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Format::Stereo16.to_string(), "stereo 16-bit");
        assert_eq!(Format::MonoDouble.to_string(), "mono double");
    }
}
