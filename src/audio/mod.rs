//! Clip playback on top of the driver
//!
//! [`AudioSubsystem`] owns the device and the current context. Clips,
//! environments and everything else generated from it borrow it, so
//! [`AudioSubsystem::shutdown`] can only run once they are all gone.

pub mod clip;
pub mod environment;
pub mod io;
pub mod track;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info};

pub use clip::Clip;
pub use environment::Environment;
pub use io::{resolve_format, ClipFile, ClipInfo, SampleEncoding};
pub use track::{Track, TrackEntry};

use crate::config::{AudioConfig, DeviceConfig, WaitStrategy};
use crate::driver::{
    Context, Device, DriverResult, NullDevice, ReverbPreset, ReverbProperties, Source,
};
use crate::error::{AudioError, Result};

// ============================================================================
// AudioSubsystem
// ============================================================================

/// The process's audio device and its current context.
///
/// Only one subsystem can be initialized at a time: a second `init` fails
/// with [`AudioError::ContextActivation`] until the first is shut down.
pub struct AudioSubsystem {
    // Field order is release order: context first, then the device
    context: Context,
    device: Device,
    config: AudioConfig,
}

impl AudioSubsystem {
    /// Open the configured device, create a context on it and make it current
    pub fn init(config: AudioConfig) -> Result<Self> {
        Self::open(config, Device::open)
    }

    /// Like [`init`](Self::init), on a null device sharing `null`'s journal
    /// and faults
    pub fn init_null(config: AudioConfig, null: &NullDevice) -> Result<Self> {
        Self::open(config, |device| Device::open_null(device, null))
    }

    fn open<F>(config: AudioConfig, open_device: F) -> Result<Self>
    where
        F: FnOnce(&DeviceConfig) -> DriverResult<Device>,
    {
        config.validate()?;
        info!("Initialize audio subsystem");

        let device = open_device(&config.device)
            .inspect_err(|e| error!("Failed to open default audio device: {}", e))
            .map_err(AudioError::DeviceOpen)?;

        let context = Context::create(&device, config.limits)
            .inspect_err(|e| error!("Failed to create device context: {}", e))
            .map_err(AudioError::ContextCreate)?;

        context
            .make_current()
            .inspect_err(|e| error!("Failed to make context current: {}", e))
            .map_err(AudioError::ContextActivation)?;

        Ok(Self {
            context,
            device,
            config,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Clips
    // ------------------------------------------------------------------------

    pub fn load_clip(&self, path: impl AsRef<Path>) -> Result<Clip<'_>> {
        Clip::load(&self.context, path.as_ref(), &self.config.loader)
    }

    /// Delete the clip's source, then its buffer.
    ///
    /// The clip file was already closed by [`Clip::load`].
    pub fn unload_clip(&self, clip: Clip<'_>) {
        drop(clip);
    }

    /// Start every clip in order.
    ///
    /// The first failure is returned; clips started before it keep playing.
    pub fn play_clips(&self, clips: &[Clip<'_>]) -> Result<()> {
        for clip in clips {
            clip.source()
                .play()
                .inspect_err(|e| error!("Failed to play audio clip: {}", e))
                .map_err(AudioError::Playback)?;
        }
        Ok(())
    }

    /// True only while the clip's source is `Playing`
    pub fn is_clip_playing(&self, clip: &Clip<'_>) -> bool {
        clip.is_playing()
    }

    /// Block until none of `clips` is playing.
    ///
    /// Gives up after the longest clip's duration plus the configured slack.
    pub fn wait_for_clips(&self, clips: &[Clip<'_>]) -> Result<()> {
        let longest = clips.iter().map(Clip::duration).max().unwrap_or_default();
        let timeout = longest + Duration::from_millis(self.config.playback.timeout_slack_ms);
        let sources: Vec<&Source<'_>> = clips.iter().map(Clip::source).collect();

        let stopped = match self.config.playback.wait {
            WaitStrategy::Notify => self.context.wait_until_stopped(&sources, timeout),
            WaitStrategy::Poll => self.poll_until_stopped(&sources, timeout),
        };

        if stopped {
            debug!("{} clip(s) finished", clips.len());
            Ok(())
        } else {
            error!("Clips still playing after {:?}", timeout);
            Err(AudioError::WaitTimeout { waited: timeout })
        }
    }

    fn poll_until_stopped(&self, sources: &[&Source<'_>], timeout: Duration) -> bool {
        let interval = Duration::from_millis(self.config.playback.poll_interval_ms);
        let deadline = Instant::now() + timeout;
        loop {
            if sources.iter().all(|s| !s.is_playing()) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(interval.min(deadline - now));
        }
    }

    // ------------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------------

    /// Start every clip of `track` on the same output frame.
    ///
    /// `clips` is the list the track's indices refer to. Offsets are not
    /// applied.
    pub fn play_track(&self, track: &Track, clips: &[Clip<'_>]) -> Result<()> {
        track.validate(clips.len())?;

        let sources: Vec<&Source<'_>> = track.iter().map(|e| clips[e.clip].source()).collect();
        for entry in track {
            debug!(
                "Track entry: clip {} at offset {:?}",
                entry.clip, entry.offset
            );
        }

        self.context
            .play_sources(&sources)
            .inspect_err(|e| error!("Failed to play audio clip: {}", e))
            .map_err(AudioError::Playback)
    }

    // ------------------------------------------------------------------------
    // Environments
    // ------------------------------------------------------------------------

    pub fn create_reverb(&self, preset: ReverbPreset) -> Result<Environment<'_>> {
        Environment::create(&self.context, &preset.properties(), Some(preset))
    }

    pub fn create_environment(&self, properties: &ReverbProperties) -> Result<Environment<'_>> {
        Environment::create(&self.context, properties, None)
    }

    /// Release the context, destroy it and close the device
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for AudioSubsystem {
    fn drop(&mut self) {
        info!("Quit audio subsystem");
    }
}

impl std::fmt::Debug for AudioSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSubsystem")
            .field("device", &self.device)
            .field("context", &self.context)
            .finish()
    }
}
