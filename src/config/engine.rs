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
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;
use crate::render::DEFAULT_BLOCKS;
use crate::streamer::DEFAULT_SLOTS;

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_CLIPS: &str = "clips";
const DEFAULT_SAMPLE_RATE: u32 = 48000;
const DEFAULT_BLOCK_SIZE: usize = 256;
const DEFAULT_WARMUP_MS: u64 = 2000;

/// A YAML representation of the engine configuration.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Engine {
    /// The output device. `default` picks the host default, `mock*` a mock device.
    device: Option<String>,

    /// Directory scanned for clips.
    clips: Option<PathBuf>,

    /// Output sample rate in Hz (default: 48000).
    sample_rate: Option<u32>,

    /// Frames per block (default: 256).
    block_size: Option<usize>,

    /// Rendered blocks pooled between the render thread and the device (default: 8).
    blocks: Option<usize>,

    /// Slots in the streamer's ring (default: 4).
    streamer_slots: Option<usize>,

    /// Decode every clip up front instead of streaming them.
    preload: Option<bool>,

    /// How long to wait for the first clip before giving up, in milliseconds.
    warmup_ms: Option<u64>,

    /// Fixed seed for clip selection and randomization.
    seed: Option<u64>,
}

impl Engine {
    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    pub fn clips(&self) -> PathBuf {
        self.clips
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIPS))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    pub fn blocks(&self) -> usize {
        self.blocks.unwrap_or(DEFAULT_BLOCKS).max(2)
    }

    pub fn streamer_slots(&self) -> usize {
        self.streamer_slots.unwrap_or(DEFAULT_SLOTS).max(2)
    }

    pub fn preload(&self) -> bool {
        self.preload.unwrap_or(false)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms.unwrap_or(DEFAULT_WARMUP_MS))
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn set_device(&mut self, device: &str) {
        self.device = Some(device.to_string());
    }

    pub fn set_clips(&mut self, clips: PathBuf) {
        self.clips = Some(clips);
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = Some(sample_rate);
    }

    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = Some(block_size);
    }

    pub fn set_preload(&mut self, preload: bool) {
        self.preload = Some(preload);
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Checks the values that can be checked without a clip pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate() == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.sample_rate",
                reason: "must be non-zero".into(),
            });
        }
        if self.block_size() == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.block_size",
                reason: "must be non-zero".into(),
            });
        }
        Ok(())
    }
}
