//! Clip file reading
//!
//! Parses WAV headers with `hound` and decodes samples straight into the
//! byte layout of the device format the clip will be uploaded as.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::WavReader;
use log::{debug, warn};

use crate::driver::Format;
use crate::error::{AudioError, Result};

// ============================================================================
// Encodings
// ============================================================================

/// Sample encoding declared by a file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Pcm8,
    Pcm16,
    Pcm24,
    Pcm32,
    Float32,
    Float64,
    /// Anything else the header may declare
    Other { bits: u16, float: bool },
}

impl SampleEncoding {
    pub fn from_spec(spec: &hound::WavSpec) -> Self {
        match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8) => SampleEncoding::Pcm8,
            (hound::SampleFormat::Int, 16) => SampleEncoding::Pcm16,
            (hound::SampleFormat::Int, 24) => SampleEncoding::Pcm24,
            (hound::SampleFormat::Int, 32) => SampleEncoding::Pcm32,
            (hound::SampleFormat::Float, 32) => SampleEncoding::Float32,
            (hound::SampleFormat::Float, 64) => SampleEncoding::Float64,
            (format, bits) => SampleEncoding::Other {
                bits,
                float: format == hound::SampleFormat::Float,
            },
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            SampleEncoding::Pcm8 => 8,
            SampleEncoding::Pcm16 => 16,
            SampleEncoding::Pcm24 => 24,
            SampleEncoding::Pcm32 | SampleEncoding::Float32 => 32,
            SampleEncoding::Float64 => 64,
            SampleEncoding::Other { bits, .. } => bits,
        }
    }
}

impl std::fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleEncoding::Float32 | SampleEncoding::Float64 => {
                write!(f, "{}-bit float", self.bits())
            }
            SampleEncoding::Other { bits, float: true } => write!(f, "{}-bit float", bits),
            _ => write!(f, "{}-bit PCM", self.bits()),
        }
    }
}

/// Device format a clip with this encoding and channel count is uploaded as.
///
/// 8-bit PCM stays 8-bit, 32-bit float stays float and 64-bit float becomes
/// double; every other encoding is converted to 16-bit. One channel picks
/// the mono variant, anything else the stereo one.
pub fn resolve_format(encoding: SampleEncoding, channels: u16) -> Format {
    let mono = channels == 1;
    match encoding {
        SampleEncoding::Pcm8 if mono => Format::Mono8,
        SampleEncoding::Pcm8 => Format::Stereo8,
        SampleEncoding::Float32 if mono => Format::MonoFloat32,
        SampleEncoding::Float32 => Format::StereoFloat32,
        SampleEncoding::Float64 if mono => Format::MonoDouble,
        SampleEncoding::Float64 => Format::StereoDouble,
        _ if mono => Format::Mono16,
        _ => Format::Stereo16,
    }
}

// ============================================================================
// ClipFile
// ============================================================================

/// Header facts of a clip file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    pub frames: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

/// An open clip file, closed when dropped
pub struct ClipFile {
    reader: WavReader<BufReader<File>>,
    info: ClipInfo,
}

impl ClipFile {
    /// Open `path` and parse its header
    pub fn open(path: &Path) -> Result<Self> {
        let reader = WavReader::open(path).map_err(|e| AudioError::FileOpen {
            path: path.to_path_buf(),
            source: e,
        })?;

        let spec = reader.spec();
        let channels = spec.channels.max(1);
        let info = ClipInfo {
            frames: reader.len() as u64 / channels as u64,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            encoding: SampleEncoding::from_spec(&spec),
        };
        debug!("Opened {}: {:?}", path.display(), info);

        Ok(Self { reader, info })
    }

    pub fn info(&self) -> &ClipInfo {
        &self.info
    }

    /// Decode every frame into `out` using `format`'s byte layout.
    ///
    /// Files with more than two channels keep their first two. Decoding stops
    /// at the first unreadable sample; the return value is the number of
    /// complete frames decoded.
    pub fn decode_into(&mut self, format: Format, out: &mut Vec<u8>) -> u64 {
        let keep = format.channels() as usize;
        let bits = self.info.encoding.bits();

        match format {
            Format::Mono8 | Format::Stereo8 => self.decode_samples::<i8, _>(keep, out, |s, out| {
                out.push((s as i16 + 128) as u8);
            }),
            Format::Mono16 | Format::Stereo16 if bits <= 16 => {
                let shift = 16 - bits.max(1);
                self.decode_samples::<i16, _>(keep, out, |s, out| {
                    out.extend_from_slice(&(s << shift).to_le_bytes());
                })
            }
            Format::Mono16 | Format::Stereo16 => {
                let shift = bits.min(32) - 16;
                self.decode_samples::<i32, _>(keep, out, |s, out| {
                    out.extend_from_slice(&((s >> shift) as i16).to_le_bytes());
                })
            }
            Format::MonoFloat32 | Format::StereoFloat32 => {
                self.decode_samples::<f32, _>(keep, out, |s, out| {
                    out.extend_from_slice(&s.to_le_bytes());
                })
            }
            Format::MonoDouble | Format::StereoDouble => {
                self.decode_samples::<f32, _>(keep, out, |s, out| {
                    out.extend_from_slice(&(s as f64).to_le_bytes());
                })
            }
        }
    }

    fn decode_samples<S, F>(&mut self, keep: usize, out: &mut Vec<u8>, mut encode: F) -> u64
    where
        S: hound::Sample,
        F: FnMut(S, &mut Vec<u8>),
    {
        let channels = self.info.channels.max(1) as usize;
        let mut decoded: u64 = 0;

        for (index, sample) in self.reader.samples::<S>().enumerate() {
            let sample = match sample {
                Ok(sample) => sample,
                Err(e) => {
                    warn!("Stopped decoding after {} samples: {}", decoded, e);
                    break;
                }
            };
            if index % channels < keep {
                encode(sample, out);
            }
            decoded += 1;
        }

        decoded / channels as u64
    }
}
