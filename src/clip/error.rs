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

/// Errors raised while finding or decoding clips.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio file error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("No audio track found in {0}")]
    NoTrack(String),

    #[error("Sample rate not specified in {0}")]
    NoSampleRate(String),

    #[error("Clip {0} has no frames")]
    Empty(String),

    #[error("Clip {0} has channels of unequal length")]
    Ragged(String),

    #[error("Unable to resample from {source_rate} Hz to {target_rate} Hz")]
    Resample { source_rate: u32, target_rate: u32 },

    #[error("Clip index {0} is out of range")]
    OutOfRange(usize),

    #[error("Clip {0} could not be loaded")]
    Unavailable(String),
}
