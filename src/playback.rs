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

//! Clip selection, per-step randomization and block rendering.

mod params;
mod provider;
mod voice;

pub use params::{
    semitones_to_ratio, step_frames_for_speed, volume_floor_from_db, PlayParams, DEFAULT_Q,
    MAX_CUTOFF,
};
pub use provider::{ClipFetch, ClipProvider, PreloadedClips};
pub use voice::{PlaybackVoice, VoiceState};

use crate::select::MAX_POOL_SIZE;

/// Smallest block the voice renders, in frames.
pub const MIN_BLOCK_SIZE: usize = 16;
/// Largest block the voice renders, in frames.
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Reasons a voice cannot be built.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("The clip pool is empty")]
    EmptyPool,

    #[error("The clip pool holds {0} clips, at most {MAX_POOL_SIZE} are supported")]
    PoolTooLarge(usize),

    #[error("Unsupported block size {0}: must be a multiple of 4 between {MIN_BLOCK_SIZE} and {MAX_BLOCK_SIZE}")]
    BlockSize(usize),

    #[error("Sample rate must be non-zero")]
    SampleRate,
}

/// Checks the block size and pool size a voice would be built with.
pub fn validate(pool_size: usize, block_size: usize, sample_rate: u32) -> Result<(), PlaybackError> {
    if sample_rate == 0 {
        return Err(PlaybackError::SampleRate);
    }
    if block_size % 4 != 0 || !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(PlaybackError::BlockSize(block_size));
    }
    if pool_size == 0 {
        return Err(PlaybackError::EmptyPool);
    }
    if pool_size > MAX_POOL_SIZE {
        return Err(PlaybackError::PoolTooLarge(pool_size));
    }
    Ok(())
}
