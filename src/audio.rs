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
use std::fmt;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use tracing::warn;

use crate::render::OutputCallback;

pub mod cpal;
mod error;
pub mod mock;
mod thread_priority;

pub use error::AudioError;
pub use thread_priority::AudioThreadPriority;

/// An output the engine can play through.
pub trait Device: fmt::Display + Send {
    /// Opens a stereo stream that pulls every block from `callback`. The
    /// stream runs until the returned handle is stopped or dropped.
    fn start(&self, callback: OutputCallback) -> Result<StreamHandle, AudioError>;
}

/// A running output stream.
pub struct StreamHandle {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub(crate) fn new(stop: Sender<()>, join: JoinHandle<()>) -> StreamHandle {
        StreamHandle {
            stop: Some(stop),
            join: Some(join),
        }
    }

    /// True while the stream thread is alive. A stream that aborted is finished.
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Stops the stream and waits for its thread.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the stream thread's stop receiver.
        self.stop.take();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("Audio stream thread panicked.");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::DeviceInfo>, AudioError> {
    cpal::Device::list()
}

/// Gets a device by name. Names starting with `mock` give a mock device;
/// `default` or an empty name gives the host's default output.
pub fn get_device(
    name: &str,
    sample_rate: u32,
    block_size: usize,
) -> Result<Box<dyn Device>, AudioError> {
    if name.starts_with("mock") {
        return Ok(Box::new(mock::Device::new(name, sample_rate, block_size)));
    }
    Ok(Box::new(cpal::Device::get(name, sample_rate, block_size)?))
}
