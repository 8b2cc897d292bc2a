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

//! Block resampler used to pitch-shift clips.
//!
//! Each call turns a run of `in_frames` source frames into `out_frames` output
//! frames by linear interpolation and pads the block to `frames_per_buffer`.

/// Length of the linear ramp applied to a tail block when fading out.
pub const FADE_FRAMES: usize = 40;

/// One block worth of resampling work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleRequest {
    /// First source frame to read.
    pub file_offset: usize,
    /// Source frames this block should cover.
    pub in_frames: usize,
    /// Output frames to produce; anything short of `frames_per_buffer` is a tail block.
    pub out_frames: usize,
    pub frames_per_buffer: usize,
    /// Ramp a tail block down to silence before padding.
    pub fadeout: bool,
}

/// What a call to [`resample`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampled {
    /// Source frames the caller should advance its cursor by.
    pub frames_consumed: usize,
    /// Output frames holding audio; the rest of the block is silence.
    pub frames_written: usize,
    /// The source ran out before `out_frames` could be produced.
    pub truncated: bool,
}

/// Resamples the requested window of every source channel into the matching
/// destination channel.
///
/// Only `min(source.len(), dest.len())` channels are touched. Every touched
/// destination channel must hold at least `frames_per_buffer` samples. Source
/// data is never read past the end of the shortest channel: if interpolation
/// would need to, the block is cut short and flagged as truncated.
pub fn resample(source: &[Vec<f32>], dest: &mut [Vec<f32>], req: &ResampleRequest) -> Resampled {
    let channels = source.len().min(dest.len());
    let fpb = req.frames_per_buffer;
    let out_frames = req.out_frames.min(fpb);
    let len = source[..channels]
        .iter()
        .map(Vec::len)
        .min()
        .unwrap_or(0);

    if channels == 0 || out_frames == 0 || req.file_offset >= len {
        for channel in dest[..channels].iter_mut() {
            channel[..fpb].fill(0.0);
        }
        return Resampled {
            frames_consumed: 0,
            frames_written: 0,
            truncated: out_frames > 0,
        };
    }

    let offset = req.file_offset;
    let (produced, consumed) = if req.in_frames == out_frames {
        let produced = out_frames.min(len - offset);
        for (src, dst) in source.iter().zip(dest.iter_mut()) {
            dst[..produced].copy_from_slice(&src[offset..offset + produced]);
        }
        (produced, produced)
    } else {
        interpolate(source, dest, channels, len, req)
    };

    let truncated = produced < out_frames;
    for channel in dest[..channels].iter_mut() {
        if req.fadeout && produced < fpb {
            fade_out(&mut channel[..produced]);
        }
        channel[produced..fpb].fill(0.0);
    }

    Resampled {
        frames_consumed: consumed.min(len - offset),
        frames_written: produced,
        truncated,
    }
}

/// Linear interpolation path. Returns (frames produced, frames consumed).
fn interpolate(
    source: &[Vec<f32>],
    dest: &mut [Vec<f32>],
    channels: usize,
    len: usize,
    req: &ResampleRequest,
) -> (usize, usize) {
    let offset = req.file_offset;
    let in_frames = req.in_frames;
    let out_frames = req.out_frames.min(req.frames_per_buffer);
    let tail = out_frames < req.frames_per_buffer;
    let step = in_frames as f32 / out_frames as f32;

    // Output 0 is the frame at the cursor; output i reads between
    // offset + 1 + floor(i * step) and the frame after it.
    let produced = (1..out_frames)
        .find(|i| offset + 2 + (*i as f32 * step) as usize >= len)
        .unwrap_or(out_frames);

    for (src, dst) in source[..channels].iter().zip(dest.iter_mut()) {
        dst[0] = src[offset];
        for (i, out) in dst[1..produced].iter_mut().enumerate() {
            let x = (i + 1) as f32 * step;
            let y = x as usize;
            let z = x - y as f32;
            let a = src[offset + 1 + y];
            let b = src[offset + 2 + y];
            *out = a + (b - a) * z;
        }
    }

    let consumed = if produced < out_frames {
        produced
    } else if tail && step < 1.0 {
        // A slowed-down tail has to finish the clip, otherwise the cursor would
        // never reach the end.
        out_frames
    } else {
        in_frames
    };
    (produced, consumed)
}

fn fade_out(samples: &mut [f32]) {
    let fade = samples.len().min(FADE_FRAMES);
    if fade == 0 {
        return;
    }
    let start = samples.len() - fade;
    let delta = 1.0 / fade as f32;
    let mut gain = 1.0f32;
    for sample in samples[start..].iter_mut() {
        *sample *= gain;
        gain -= delta;
    }
}

#[cfg(test)]
mod test {
    use super::{resample, ResampleRequest, Resampled, FADE_FRAMES};

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32).collect()
    }

    fn dest(channels: usize, fpb: usize) -> Vec<Vec<f32>> {
        vec![vec![f32::NAN; fpb]; channels]
    }

    #[test]
    fn identity_copies_exactly() {
        for fpb in [16usize, 64, 256, 1024] {
            let source = vec![
                (0..4096).map(|i| (i as f32 * 0.01).sin()).collect::<Vec<_>>(),
                (0..4096).map(|i| (i as f32 * 0.02).cos()).collect::<Vec<_>>(),
            ];
            let mut out = dest(2, fpb);
            let result = resample(
                &source,
                &mut out,
                &ResampleRequest {
                    file_offset: 100,
                    in_frames: fpb,
                    out_frames: fpb,
                    frames_per_buffer: fpb,
                    fadeout: false,
                },
            );
            assert_eq!(
                result,
                Resampled {
                    frames_consumed: fpb,
                    frames_written: fpb,
                    truncated: false
                }
            );
            for channel in 0..2 {
                assert_eq!(out[channel], source[channel][100..100 + fpb]);
            }
        }
    }

    #[test]
    fn integer_ratio_hits_endpoints() {
        let fpb = 256;
        let source = vec![ramp(4 * fpb)];
        let mut out = dest(1, fpb);
        let result = resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 0,
                in_frames: 2 * fpb,
                out_frames: fpb,
                frames_per_buffer: fpb,
                fadeout: false,
            },
        );
        assert_eq!(result.frames_consumed, 2 * fpb);
        assert!(!result.truncated);
        assert_eq!(out[0][0], source[0][0]);
        assert_eq!(out[0][fpb - 1], source[0][2 * fpb - 1]);
        assert!(out[0].windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn fractional_ratio_interpolates() {
        let source = vec![ramp(64)];
        let mut out = dest(1, 8);
        resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 0,
                in_frames: 12,
                out_frames: 8,
                frames_per_buffer: 8,
                fadeout: false,
            },
        );
        // Output i (i >= 1) sits at 1 + 1.5 * i on a linear ramp.
        assert_eq!(out[0][0], 0.0);
        for i in 1..8 {
            assert!((out[0][i] - (1.0 + 1.5 * i as f32)).abs() < 1e-5);
        }
    }

    #[test]
    fn overrun_truncates_and_pads() {
        let source = vec![ramp(20), ramp(20)];
        let mut out = dest(2, 16);
        let result = resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 4,
                in_frames: 32,
                out_frames: 16,
                frames_per_buffer: 16,
                fadeout: false,
            },
        );
        // Output i needs frame 4 + 2 + 2i < 20, so i <= 6 is the last valid output.
        assert!(result.truncated);
        assert_eq!(result.frames_written, 7);
        assert_eq!(result.frames_consumed, 7);
        for channel in &out {
            assert_eq!(channel[6], 4.0 + 1.0 + 12.0);
            assert!(channel[7..].iter().all(|s| *s == 0.0));
        }
    }

    #[test]
    fn tail_is_faded_then_padded() {
        let fpb = 128;
        let source = vec![vec![1.0; 100]];
        let mut out = dest(1, fpb);
        let result = resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 0,
                in_frames: 100,
                out_frames: 100,
                frames_per_buffer: fpb,
                fadeout: true,
            },
        );
        assert_eq!(result.frames_written, 100);
        assert!(!result.truncated);

        let channel = &out[0];
        assert!(channel[..100 - FADE_FRAMES].iter().all(|s| *s == 1.0));
        assert_eq!(channel[100 - FADE_FRAMES], 1.0);
        assert!(channel[100 - FADE_FRAMES..100]
            .windows(2)
            .all(|w| w[1] < w[0]));
        assert!(channel[99] > 0.0 && channel[99] < 0.05);
        assert!(channel[100..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn short_tail_fades_whole_run() {
        let source = vec![vec![1.0; 10]];
        let mut out = dest(1, 32);
        resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 0,
                in_frames: 10,
                out_frames: 10,
                frames_per_buffer: 32,
                fadeout: true,
            },
        );
        assert_eq!(out[0][0], 1.0);
        assert!((out[0][9] - 0.1).abs() < 1e-5);
    }

    #[test]
    fn tail_without_fade_is_untouched() {
        let source = vec![vec![1.0; 10]];
        let mut out = dest(1, 32);
        resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 0,
                in_frames: 10,
                out_frames: 10,
                frames_per_buffer: 32,
                fadeout: false,
            },
        );
        assert!(out[0][..10].iter().all(|s| *s == 1.0));
        assert!(out[0][10..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn slowed_tail_finishes_clip() {
        let source = vec![ramp(1000)];
        let mut out = dest(1, 256);
        let result = resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 900,
                in_frames: 50,
                out_frames: 100,
                frames_per_buffer: 256,
                fadeout: false,
            },
        );
        assert_eq!(result.frames_consumed, 100);
        assert_eq!(result.frames_written, 100);
    }

    #[test]
    fn offset_past_end_is_silent() {
        let source = vec![ramp(10)];
        let mut out = dest(1, 16);
        let result = resample(
            &source,
            &mut out,
            &ResampleRequest {
                file_offset: 10,
                in_frames: 16,
                out_frames: 16,
                frames_per_buffer: 16,
                fadeout: false,
            },
        );
        assert!(result.truncated);
        assert_eq!(result.frames_consumed, 0);
        assert!(out[0].iter().all(|s| *s == 0.0));
    }
}
