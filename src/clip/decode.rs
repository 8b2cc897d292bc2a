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
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::{transcoded_len, Clip, ClipError, MAX_CHANNELS};

/// Opens `path` and returns the clip name with the probed format reader.
fn open(path: &Path) -> Result<(String, Box<dyn FormatReader>), ClipError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    let file = File::open(path).map_err(|e| {
        ClipError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok((name, probed.format))
}

fn audio_track<'a>(format_reader: &'a dyn FormatReader, name: &str) -> Result<&'a Track, ClipError> {
    format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ClipError::NoTrack(name.to_string()))
}

/// Length in frames `path` will have once decoded at `target_rate`. Reads the
/// container header when it records a frame count and decodes otherwise.
pub fn frame_count_of(path: &Path, target_rate: u32) -> Result<usize, ClipError> {
    let (name, format_reader) = open(path)?;
    let params = &audio_track(format_reader.as_ref(), &name)?.codec_params;
    match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(source_rate)) if frames > 0 => {
            Ok(transcoded_len(frames as usize, source_rate, target_rate))
        }
        _ => Ok(decode_file(path, target_rate)?.frame_count()),
    }
}

/// Decodes an entire audio file (WAV, FLAC, OGG, MP3, ...) into memory and
/// converts it to `target_rate`.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<Clip, ClipError> {
    let (name, mut format_reader) = open(path)?;

    let track = audio_track(format_reader.as_ref(), &name)?;
    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ClipError::NoSampleRate(name.clone()))?;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            // Some formats report the end of the stream as a decode error.
            Err(SymphoniaError::DecodeError(_)) => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(clip = %name, error = e, "Skipping undecodable packet.");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        let channel_count = spec.channels.count();
        if frames == 0 || channel_count == 0 {
            continue;
        }
        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count.min(MAX_CHANNELS)];
        }

        let needed = decoded.capacity() * channel_count;
        if sample_buffer.as_ref().is_some_and(|b| b.capacity() < needed) {
            sample_buffer = None;
        }
        let buffer = sample_buffer
            .get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buffer.copy_planar_ref(decoded);

        // Planar layout: every frame of channel 0, then channel 1, and so on.
        let samples = buffer.samples();
        for (index, channel) in channels.iter_mut().enumerate() {
            channel.extend_from_slice(&samples[index * frames..(index + 1) * frames]);
        }
    }

    debug!(clip = %name, source_rate, "Decoded clip.");
    let clip = Clip::new(name, channels, source_rate)?;
    if source_rate != target_rate {
        info!(
            clip = clip.name(),
            source_rate,
            target_rate,
            "Transcoding clip"
        );
    }
    clip.into_rate(target_rate)
}
