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

//! A procedural real-time renderer for randomized footstep and ambient loops.
//!
//! Clips are picked without repeats, pitch shifted, run through a gain or LFO
//! stage, a waveshaper and a low-pass filter, and handed to the audio device
//! through a lock-free block queue.

pub mod audio;
pub mod clip;
pub mod config;
pub mod controller;
pub mod dsp;
pub mod engine;
pub mod playback;
pub mod render;
pub mod resample;
pub mod select;
pub mod streamer;
pub mod sync;
#[cfg(test)]
mod testutil;

pub use engine::{render_to_wav, Engine, EngineError};
