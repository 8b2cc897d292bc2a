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
use rubato::{
    SincFixedIn, SincInterpolationParameters, SincInterpolationType, VecResampler, WindowFunction,
};

use super::ClipError;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Frames a clip of `frames` frames has once converted, rounded up.
pub fn transcoded_len(frames: usize, source_rate: u32, target_rate: u32) -> usize {
    let frames = frames as u64;
    let (source, target) = (source_rate as u64, target_rate as u64);
    ((frames * target + source - 1) / source) as usize
}

/// Converts planar channels between sample rates with a sinc resampler. The
/// resampler's delay is trimmed so the output lines up with the input.
pub fn transcode(
    channels: &[Vec<f32>],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<Vec<f32>>, ClipError> {
    let frames = channels.first().map(Vec::len).unwrap_or(0);
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 || frames == 0 {
        return Ok(channels.to_vec());
    }
    let failed = || ClipError::Resample {
        source_rate,
        target_rate,
    };

    let sinc_params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        1.0,
        sinc_params,
        INPUT_BLOCK_SIZE,
        channels.len(),
    )
    .map_err(|_| failed())?;

    let delay = resampler.output_delay();
    let wanted = transcoded_len(frames, source_rate, target_rate);
    let mut scratch = resampler.output_buffer_allocate(true);
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted + delay); channels.len()];
    let mut input: Vec<Vec<f32>> = vec![Vec::with_capacity(INPUT_BLOCK_SIZE); channels.len()];

    let mut position = 0;
    while output[0].len() < wanted + delay {
        let needed = resampler.input_frames_next();
        let available = frames.saturating_sub(position).min(needed);
        for (chunk, channel) in input.iter_mut().zip(channels) {
            chunk.clear();
            chunk.extend_from_slice(&channel[position..position + available]);
        }
        position += available;

        let processed = if available == needed {
            resampler.process_into_buffer(&input, &mut scratch, None)
        } else if available > 0 {
            resampler.process_partial_into_buffer(Some(&input as &[Vec<f32>]), &mut scratch, None)
        } else {
            // Past the end: flush the filter with silence.
            resampler.process_partial_into_buffer(None::<&[Vec<f32>]>, &mut scratch, None)
        };
        let (_, produced) = processed.map_err(|_| failed())?;
        if produced == 0 && available == 0 {
            break;
        }

        for (out, produced_channel) in output.iter_mut().zip(&scratch) {
            out.extend_from_slice(&produced_channel[..produced]);
        }
    }

    for channel in output.iter_mut() {
        channel.drain(..delay.min(channel.len()));
        channel.resize(wanted, 0.0);
    }
    Ok(output)
}
