//! Clip loading
//!
//! Loading runs in eight steps: generate a buffer, generate a source, open
//! the file, pick the device format, allocate the decode scratch buffer,
//! decode, upload, and attach the buffer to the source. Every step owns what
//! it acquired as a local, so an early return releases exactly those things
//! in reverse order: scratch buffer, file, source, buffer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info};

use super::io::{resolve_format, ClipFile, SampleEncoding};
use crate::config::LoaderConfig;
use crate::driver::{Buffer, Context, Format, Source};
use crate::error::{AudioError, Result};

/// A decoded sound file, uploaded to a buffer and attached to its own source.
///
/// Dropping a clip unloads it: the source is deleted first, then the buffer.
pub struct Clip<'ctx> {
    // Field order is drop order
    source: Source<'ctx>,
    buffer: Buffer<'ctx>,
    path: PathBuf,
    frames: u64,
    sample_rate: u32,
    channels: u16,
    format: Format,
    encoding: SampleEncoding,
}

/// Bytes needed to hold `frames` frames of `format`, within `limit`
fn scratch_size(frames: u64, format: Format, limit: usize) -> Result<usize> {
    let requested = frames as u128 * format.frame_size() as u128;
    if requested > limit as u128 {
        return Err(AudioError::OutOfMemory { requested, limit });
    }
    usize::try_from(requested).map_err(|_| AudioError::OutOfMemory { requested, limit })
}

impl<'ctx> Clip<'ctx> {
    /// Load the clip at `path` into objects of the current `context`
    pub fn load(context: &'ctx Context, path: &Path, loader: &LoaderConfig) -> Result<Self> {
        info!("Load audio clip: {}", path.display());

        let buffer = context
            .gen_buffer()
            .inspect_err(|e| error!("Failed to generate clip buffer: {}", e))
            .map_err(AudioError::BufferAlloc)?;

        let source = context
            .gen_source()
            .inspect_err(|e| error!("Failed to generate clip source: {}", e))
            .map_err(AudioError::SourceAlloc)?;

        let mut file = ClipFile::open(path)
            .inspect_err(|e| error!("Failed to open clip file: {}", e))?;
        let header = *file.info();

        let format = resolve_format(header.encoding, header.channels);
        debug!(
            "{} {} channel(s) -> {}",
            header.encoding, header.channels, format
        );

        let bytes = scratch_size(header.frames, format, loader.max_decode_bytes)
            .inspect_err(|e| error!("Failed to allocate memory to temporary clip data buffer: {}", e))?;
        let mut scratch: Vec<u8> = Vec::new();
        scratch.try_reserve_exact(bytes).map_err(|_| {
            error!("Failed to allocate memory to temporary clip data buffer");
            AudioError::OutOfMemory {
                requested: bytes as u128,
                limit: loader.max_decode_bytes,
            }
        })?;

        let read = file.decode_into(format, &mut scratch);
        drop(file);
        if read != header.frames {
            error!("Failed to read clip file completely");
            return Err(AudioError::ShortRead {
                expected: header.frames,
                read,
            });
        }

        let uploaded = buffer.data(format, &scratch, header.sample_rate);
        drop(scratch);
        uploaded
            .inspect_err(|e| error!("Failed to copy clip file data to clip buffer: {}", e))
            .map_err(AudioError::Upload)?;

        source
            .set_buffer(Some(&buffer))
            .inspect_err(|e| error!("Failed to attach clip buffer to its source: {}", e))
            .map_err(AudioError::Bind)?;

        info!(
            "Audio clip loaded: {} frames, {}Hz, {} audio",
            header.frames,
            header.sample_rate,
            if header.channels == 1 { "Mono" } else { "Stereo" }
        );

        Ok(Self {
            source,
            buffer,
            path: path.to_path_buf(),
            frames: header.frames,
            sample_rate: header.sample_rate,
            channels: header.channels,
            format,
            encoding: header.encoding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count declared by the file
    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    /// Playing time at the clip's own rate
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    pub fn source(&self) -> &Source<'ctx> {
        &self.source
    }

    pub fn buffer(&self) -> &Buffer<'ctx> {
        &self.buffer
    }

    pub fn is_playing(&self) -> bool {
        self.source.is_playing()
    }
}

impl Drop for Clip<'_> {
    fn drop(&mut self) {
        info!("Unload audio clip: {}", self.path.display());
    }
}

impl std::fmt::Debug for Clip<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clip")
            .field("path", &self.path)
            .field("frames", &self.frames)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("format", &self.format)
            .finish()
    }
}
