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

//! Decoded audio clips and the loaders that produce them.

mod decode;
mod error;
mod loader;
mod transcode;

use std::time::Duration;

pub use decode::{decode_file, frame_count_of};
pub use error::ClipError;
pub use loader::{discover_clips, ClipLoader, FileLoader, MemoryLoader};
pub use transcode::{transcode, transcoded_len};

/// Channels kept from a decoded file. Anything past stereo is dropped.
pub const MAX_CHANNELS: usize = 2;

/// Immutable decoded audio, stored planar.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    name: String,
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Clip {
    /// Builds a clip from planar channel data. Channels past stereo are dropped.
    pub fn new(
        name: impl Into<String>,
        mut channels: Vec<Vec<f32>>,
        sample_rate: u32,
    ) -> Result<Clip, ClipError> {
        let name = name.into();
        channels.truncate(MAX_CHANNELS);

        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if frames == 0 {
            return Err(ClipError::Empty(name));
        }
        if channels.iter().any(|c| c.len() != frames) {
            return Err(ClipError::Ragged(name));
        }

        Ok(Clip {
            name,
            channels,
            sample_rate,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate.max(1) as f64)
    }

    /// Returns this clip at `target_rate`, resampling if the rate differs.
    pub fn into_rate(self, target_rate: u32) -> Result<Clip, ClipError> {
        if self.sample_rate == target_rate {
            return Ok(self);
        }
        let channels = transcode(&self.channels, self.sample_rate, target_rate)?;
        Ok(Clip {
            name: self.name,
            channels,
            sample_rate: target_rate,
        })
    }
}
