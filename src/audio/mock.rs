// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use crate::audio::{AudioError, Device as AudioDevice, StreamHandle};
use crate::dsp::CHANNELS;
use crate::render::{CallbackResult, CallbackTimer, OutputCallback};

/// A mock device. Calls the output callback at the block cadence on a plain
/// thread and keeps the last block it was handed.
#[derive(Clone)]
pub struct Device {
    name: String,
    period: Duration,
    frame_count: usize,
    callbacks: Arc<AtomicU64>,
    last_block: Arc<Mutex<Vec<f32>>>,
}

impl Device {
    /// A mock device running in real time at `sample_rate`.
    pub fn new(name: &str, sample_rate: u32, block_size: usize) -> Device {
        Device {
            name: name.to_string(),
            period: Duration::from_secs_f64(block_size as f64 / sample_rate.max(1) as f64),
            frame_count: block_size,
            callbacks: Arc::new(AtomicU64::new(0)),
            last_block: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Overrides the time between callbacks.
    pub fn with_period(mut self, period: Duration) -> Device {
        self.period = period;
        self
    }

    /// Requests a different number of frames per callback than the stream was
    /// configured with, like a driver ignoring the fixed buffer size.
    pub fn with_frame_count(mut self, frame_count: usize) -> Device {
        self.frame_count = frame_count;
        self
    }

    /// Callbacks made so far.
    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Relaxed)
    }

    /// The most recent block written by the callback.
    pub fn last_block(&self) -> Vec<f32> {
        self.last_block.lock().clone()
    }
}

impl AudioDevice for Device {
    fn start(&self, mut callback: OutputCallback) -> Result<StreamHandle, AudioError> {
        let span = span!(Level::INFO, "output stream (mock)");
        let _enter = span.enter();

        info!(device = self.name, "Starting stream.");
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let device = self.clone();

        let join = thread::Builder::new()
            .name("footfall-mock-output".into())
            .spawn(move || {
                let mut buffer = vec![0.0; device.frame_count * CHANNELS];
                let timer = CallbackTimer::new(device.period);
                let mut last_callback: Option<Instant> = None;
                loop {
                    match stop_rx.recv_timeout(device.period) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let now = Instant::now();
                    let status = timer.status(last_callback.map(|last| now - last));
                    last_callback = Some(now);
                    let result = callback.fill(&mut buffer, device.frame_count, &status);
                    device.callbacks.fetch_add(1, Ordering::Relaxed);
                    if result == CallbackResult::Abort {
                        error!(device = device.name, "Block size does not match, stream aborted.");
                        break;
                    }
                    device.last_block.lock().clone_from(&buffer);
                }
                info!(device = device.name, "Stream stopped.");
            })?;

        Ok(StreamHandle::new(stop_tx, join))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use super::Device;
    use crate::audio::Device as _;
    use crate::render::{BlockQueue, OutputCallback, RenderStats};
    use crate::testutil::eventually;

    #[test]
    fn plays_silence_when_nothing_is_ready() {
        let device = Device::new("mock", 48000, 64).with_period(Duration::from_millis(1));
        let stats = Arc::new(RenderStats::default());
        let queue = Arc::new(BlockQueue::new(2, 64));
        let mut stream = device
            .start(OutputCallback::new(queue, stats.clone()))
            .unwrap();

        eventually(|| device.callbacks() >= 3, "Mock device never called back");
        stream.stop();
        assert!(!stream.is_running());
        assert!(stats.snapshot().underruns >= 3);
        assert_eq!(device.last_block(), vec![0.0; 128]);
    }

    #[test]
    fn aborts_on_frame_count_mismatch() {
        let device = Device::new("mock", 48000, 64)
            .with_period(Duration::from_millis(1))
            .with_frame_count(32);
        let stats = Arc::new(RenderStats::default());
        let queue = Arc::new(BlockQueue::new(2, 64));
        let stream = device
            .start(OutputCallback::new(queue, stats.clone()))
            .unwrap();

        eventually(|| !stream.is_running(), "Stream never aborted");
        assert_eq!(stats.snapshot().aborts, 1);
        assert_eq!(device.callbacks(), 1);
    }
}
