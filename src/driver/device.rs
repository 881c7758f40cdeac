//! Output devices

use std::sync::Arc;

use log::{debug, info};

use super::journal::{DriverCall, DriverEvent, NullDevice, Probe};
use super::{DriverError, DriverResult};
use crate::config::{BackendKind, DeviceConfig};

/// Preferred rate when neither the backend nor the configuration has one
pub const FALLBACK_SAMPLE_RATE: u32 = 48_000;

/// Preferred layout when neither the backend nor the configuration has one
pub const FALLBACK_CHANNELS: u16 = 2;

/// Rate and channel layout the device is driven with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

pub(crate) enum Backend {
    Null,
    #[cfg(feature = "cpal")]
    Cpal(cpal::Device),
}

pub(crate) struct DeviceInner {
    name: String,
    spec: OutputSpec,
    period_frames: usize,
    backend: Backend,
    probe: Probe,
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        debug!("Close device: {}", self.name);
        self.probe.record(DriverEvent::DeviceClosed);
    }
}

/// An open output device.
///
/// Contexts keep a clone, so the device closes once the last context created
/// on it and the handle returned by `open` are both gone.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Open the default device of the configured backend
    pub fn open(config: &DeviceConfig) -> DriverResult<Self> {
        match config.backend {
            BackendKind::Null => Self::null_with_probe(config, Probe::default()),
            BackendKind::Default => Self::open_default(config),
        }
    }

    /// Open a null device whose journal and faults are shared with `null`
    pub fn open_null(config: &DeviceConfig, null: &NullDevice) -> DriverResult<Self> {
        Self::null_with_probe(config, Probe::null(null))
    }

    fn null_with_probe(config: &DeviceConfig, probe: Probe) -> DriverResult<Self> {
        probe.check(DriverCall::OpenDevice)?;

        let spec = OutputSpec {
            sample_rate: config.sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE),
            channels: config.channels.unwrap_or(FALLBACK_CHANNELS),
        };
        let device = Self::from_parts("null".to_string(), spec, config, Backend::Null, probe);
        device.inner.probe.record(DriverEvent::DeviceOpened);
        Ok(device)
    }

    #[cfg(feature = "cpal")]
    fn open_default(config: &DeviceConfig) -> DriverResult<Self> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DriverError::NoDevice)?;
        let preferred = device
            .default_output_config()
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        if preferred.sample_format() != cpal::SampleFormat::F32 {
            return Err(DriverError::Backend(format!(
                "unsupported device sample format {:?}",
                preferred.sample_format()
            )));
        }

        let spec = OutputSpec {
            sample_rate: config.sample_rate.unwrap_or(preferred.sample_rate().0),
            channels: config.channels.unwrap_or(preferred.channels()),
        };
        let name = device.name().unwrap_or_else(|_| "default".to_string());
        Ok(Self::from_parts(
            name,
            spec,
            config,
            Backend::Cpal(device),
            Probe::default(),
        ))
    }

    #[cfg(not(feature = "cpal"))]
    fn open_default(_config: &DeviceConfig) -> DriverResult<Self> {
        Err(DriverError::BackendUnavailable("cpal"))
    }

    fn from_parts(
        name: String,
        spec: OutputSpec,
        config: &DeviceConfig,
        backend: Backend,
        probe: Probe,
    ) -> Self {
        info!(
            "Opened output device '{}': {}Hz, {} channel(s)",
            name, spec.sample_rate, spec.channels
        );
        Self {
            inner: Arc::new(DeviceInner {
                name,
                spec,
                period_frames: config.period_frames.max(1),
                backend,
                probe,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn spec(&self) -> OutputSpec {
        self.inner.spec
    }

    pub fn period_frames(&self) -> usize {
        self.inner.period_frames
    }

    pub(crate) fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    pub(crate) fn probe(&self) -> &Probe {
        &self.inner.probe
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.inner.name)
            .field("spec", &self.inner.spec)
            .field("journaled", &self.inner.probe.is_recording())
            .finish()
    }
}
