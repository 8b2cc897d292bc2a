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
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("No output device found with name {0}")]
    NotFound(String),

    #[error("The host has no default output device")]
    NoDefault,

    #[error("Device {device} has no stereo f32 output")]
    Unsupported { device: String },

    #[error("Host unavailable: {0}")]
    Host(#[from] cpal::HostUnavailable),

    #[error("Error listing devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Error reading device name: {0}")]
    Name(#[from] cpal::DeviceNameError),

    #[error("Error reading device configs: {0}")]
    Configs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Error building output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Error starting output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("The stream thread exited before the stream started")]
    StreamThread,

    #[error(transparent)]
    Io(#[from] io::Error),
}
