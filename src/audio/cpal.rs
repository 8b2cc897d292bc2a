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
use std::{fmt, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use crate::audio::{AudioError, AudioThreadPriority, Device as AudioDevice, StreamHandle};
use crate::dsp::CHANNELS;
use crate::render::{CallbackResult, CallbackTimer, OutputCallback};

/// A device as shown by the `devices` command.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub host: String,
    pub max_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// A small wrapper around a cpal::Device opened at a fixed rate and block size.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    sample_rate: u32,
    block_size: usize,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host_id.name())
    }
}

/// Widest output config a device offers, or None if it has no usable output.
fn max_output_channels(device: &cpal::Device) -> Option<u16> {
    device
        .supported_output_configs()
        .ok()?
        .map(|config| config.channels())
        .max()
        .filter(|channels| *channels > 0)
}

impl Device {
    /// Lists cpal output devices across all hosts.
    pub fn list() -> Result<Vec<DeviceInfo>, AudioError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .filter_map(|(host_id, device)| {
                Some(DeviceInfo {
                    name: device.name().ok()?,
                    host: host_id.name().to_string(),
                    max_channels: max_output_channels(&device)?,
                })
            })
            .collect())
    }

    fn list_cpal_devices() -> Result<Vec<(cpal::HostId, cpal::Device)>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };
            devices.extend(host_devices.map(|device| (host_id, device)));
        }

        devices.sort_by_key(|(_, device)| device.name().unwrap_or_default());
        Ok(devices)
    }

    /// Gets the named device, or the default output for `default` or an empty name.
    pub fn get(name: &str, sample_rate: u32, block_size: usize) -> Result<Device, AudioError> {
        let (host_id, device) = if name.is_empty() || name == "default" {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(AudioError::NoDefault)?;
            (host.id(), device)
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|(_, device)| device.name().map(|n| n.trim() == name).unwrap_or(false))
                .ok_or_else(|| AudioError::NotFound(name.to_string()))?
        };

        let name = device.name()?;
        let stereo = device
            .supported_output_configs()?
            .any(|config| config.channels() as usize >= CHANNELS);
        if !stereo {
            return Err(AudioError::Unsupported { device: name });
        }

        Ok(Device {
            name,
            host_id,
            device,
            sample_rate,
            block_size,
        })
    }
}

impl AudioDevice for Device {
    fn start(&self, mut callback: OutputCallback) -> Result<StreamHandle, AudioError> {
        let span = span!(Level::INFO, "output stream (cpal)");
        let _enter = span.enter();

        let device = self.device.clone();
        let config = cpal::StreamConfig {
            channels: CHANNELS as u16,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.block_size as u32),
        };
        let name = self.name.clone();
        let timer = CallbackTimer::for_blocks(self.block_size, self.sample_rate);
        let mut priority = AudioThreadPriority::from_env();

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let (abort_tx, abort_rx) = crossbeam_channel::bounded::<()>(1);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);

        info!(
            device = self.name,
            sample_rate = self.sample_rate,
            block_size = self.block_size,
            "Starting stream."
        );

        // cpal streams are not Send on every host, so the stream lives on its own thread.
        let join = thread::Builder::new()
            .name("footfall-output".into())
            .spawn(move || {
                let mut aborted = false;
                let mut last_callback: Option<cpal::StreamInstant> = None;

                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                        priority.apply("output");
                        let now = info.timestamp().callback;
                        let status =
                            timer.status(last_callback.and_then(|last| now.duration_since(&last)));
                        last_callback = Some(now);
                        if aborted {
                            data.fill(0.0);
                            return;
                        }
                        let frames = data.len() / CHANNELS;
                        if callback.fill(data, frames, &status) == CallbackResult::Abort {
                            aborted = true;
                            data.fill(0.0);
                            let _ = abort_tx.try_send(());
                        }
                    },
                    |err| error!(error = %err, "CPAL output stream error"),
                    None,
                );

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = started_tx.send(Err(e.into()));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = started_tx.send(Err(e.into()));
                    return;
                }
                let _ = started_tx.send(Ok(()));

                crossbeam_channel::select! {
                    recv(stop_rx) -> _ => {}
                    recv(abort_rx) -> _ => {
                        error!(device = name, "Device block size does not match, stream aborted.");
                    }
                }
                drop(stream);
                info!(device = name, "Stream stopped.");
            })?;

        match started_rx.recv() {
            Ok(Ok(())) => Ok(StreamHandle::new(stop_tx, join)),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(AudioError::StreamThread)
            }
        }
    }
}
