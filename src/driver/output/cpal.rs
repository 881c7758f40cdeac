//! Output through `cpal`'s default host.
//!
//! The data callback renders straight from the context's mixer, so there is
//! no intermediate sample queue to drain or discard.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use log::{debug, error};

use crate::driver::context::Shared;
use crate::driver::device::OutputSpec;
use crate::driver::{DriverError, DriverResult};

pub(crate) struct CpalStream {
    stream: cpal::Stream,
}

impl CpalStream {
    pub(crate) fn build(
        device: &cpal::Device,
        spec: OutputSpec,
        shared: Arc<Shared>,
    ) -> DriverResult<Self> {
        let config = cpal::StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        debug!("cpal stream config: {:?}", config);

        let channels = spec.channels.max(1) as usize;
        let data_callback = move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
            shared.render(output, channels);
        };
        let error_callback = |err: cpal::StreamError| {
            error!("Output stream error: {}", err);
        };

        let stream = device
            .build_output_stream(&config, data_callback, error_callback, None)
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        // Some hosts start streams on creation
        if let Err(e) = stream.pause() {
            debug!("Could not pause new stream: {}", e);
        }

        Ok(Self { stream })
    }

    pub(crate) fn play(&mut self) -> DriverResult<()> {
        self.stream
            .play()
            .map_err(|e| DriverError::Backend(e.to_string()))
    }

    pub(crate) fn pause(&mut self) -> DriverResult<()> {
        self.stream
            .pause()
            .map_err(|e| DriverError::Backend(e.to_string()))
    }
}
