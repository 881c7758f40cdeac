//! Silent output.
//!
//! Mixes on a timer thread at the device's rate and throws the result away.
//! It advances sources exactly like a real device would, which is what the
//! tests and headless runs rely on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::driver::context::Shared;
use crate::driver::device::OutputSpec;
use crate::driver::{DriverError, DriverResult};

#[derive(Default)]
struct Control {
    playing: AtomicBool,
    shutdown: AtomicBool,
}

pub(crate) struct NullStream {
    control: Arc<Control>,
    thread: Option<JoinHandle<()>>,
}

impl NullStream {
    pub(crate) fn spawn(
        spec: OutputSpec,
        period_frames: usize,
        shared: Arc<Shared>,
    ) -> DriverResult<Self> {
        let control = Arc::new(Control::default());
        let channels = spec.channels.max(1) as usize;
        let period = Duration::from_secs_f64(period_frames as f64 / spec.sample_rate.max(1) as f64);
        debug!(
            "Null output: {} frames per {:?} period, {} channel(s)",
            period_frames, period, channels
        );

        let thread_control = Arc::clone(&control);
        let thread = thread::Builder::new()
            .name("clipdeck-null-output".to_string())
            .spawn(move || {
                let mut out = vec![0.0f32; period_frames * channels];
                let mut deadline = Instant::now();
                while !thread_control.shutdown.load(Ordering::Acquire) {
                    if !thread_control.playing.load(Ordering::Acquire) {
                        thread::park_timeout(period);
                        deadline = Instant::now();
                        continue;
                    }

                    shared.render(&mut out, channels);
                    trace!("Null output rendered {} frames", period_frames);

                    // Pace by deadline so render time does not accumulate as drift
                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        deadline = now;
                    }
                }
            })
            .map_err(|e| DriverError::Backend(format!("failed to spawn output thread: {}", e)))?;

        Ok(Self {
            control,
            thread: Some(thread),
        })
    }

    pub(crate) fn play(&mut self) {
        self.control.playing.store(true, Ordering::Release);
        if let Some(thread) = &self.thread {
            thread.thread().unpark();
        }
    }

    pub(crate) fn pause(&mut self) {
        self.control.playing.store(false, Ordering::Release);
    }
}

impl Drop for NullStream {
    fn drop(&mut self) {
        self.control.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                debug!("Null output thread panicked");
            }
        }
    }
}
