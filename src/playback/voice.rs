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
use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use super::params::{semitones_to_ratio, PlayParams, DEFAULT_Q, MAX_CUTOFF};
use super::provider::{ClipFetch, ClipProvider};
use super::{validate, PlaybackError};
use crate::clip::Clip;
use crate::dsp::{ChainSettings, DspChain, CHANNELS};
use crate::resample::{resample, ResampleRequest};
use crate::select::RepeatGuard;

/// Where a voice is within its current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Nothing rendered yet.
    Idle,
    /// The next block starts a new step with a fresh clip and parameters.
    Selecting,
    /// The selected clip still has frames left in this step.
    Playing,
    /// The clip is done (or missing); silence until the step ends.
    Draining,
}

/// A single stream of randomized clip playback, rendered one block at a time.
///
/// All buffers are sized at construction; rendering a block does not allocate.
pub struct PlaybackVoice<P: ClipProvider> {
    provider: P,
    guard: RepeatGuard,
    rng: StdRng,
    params: PlayParams,
    chain: DspChain,
    scratch: Vec<Vec<f32>>,
    block_size: usize,

    state: VoiceState,
    clip: Option<Arc<Clip>>,
    clip_index: Option<usize>,
    frame_index: usize,
    frame_counter: usize,
    step_frames: usize,
    longest: usize,
    pitch: f32,
    force_select: bool,

    selections: u64,
    skips: u64,
}

impl<P: ClipProvider> PlaybackVoice<P> {
    /// Builds a voice and requests its first clip. A seed makes selection and
    /// randomization reproducible.
    pub fn new(
        mut provider: P,
        params: PlayParams,
        sample_rate: u32,
        block_size: usize,
        seed: Option<u64>,
    ) -> Result<PlaybackVoice<P>, PlaybackError> {
        let pool_size = provider.pool_size();
        validate(pool_size, block_size, sample_rate)?;
        let mut guard = RepeatGuard::new(pool_size).ok_or(PlaybackError::PoolTooLarge(pool_size))?;

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let first = guard.pick(&mut rng);
        if !provider.request(first) {
            debug!(index = first, "First clip request refused.");
        }
        let longest = provider.longest_clip();

        Ok(PlaybackVoice {
            provider,
            guard,
            rng,
            params,
            chain: DspChain::new(sample_rate),
            scratch: vec![vec![0.0; block_size]; CHANNELS],
            block_size,
            state: VoiceState::Idle,
            clip: None,
            clip_index: None,
            frame_index: 0,
            frame_counter: 0,
            step_frames: params.step_frames.max(1),
            longest,
            pitch: 1.0,
            force_select: false,
            selections: 0,
            skips: 0,
        })
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// True when the next block starts a new step. Parameter changes are
    /// picked up at this point.
    pub fn at_step_boundary(&self) -> bool {
        self.frame_counter == 0 || self.force_select
    }

    /// Replaces the parameters. They apply from the next selection on.
    pub fn set_params(&mut self, params: PlayParams) {
        self.params = params;
    }

    pub fn params(&self) -> &PlayParams {
        &self.params
    }

    /// Index of the clip selected for the current step, if it loaded.
    pub fn clip_index(&self) -> Option<usize> {
        self.clip_index
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Length of the current step in frames.
    pub fn step_frames(&self) -> usize {
        self.step_frames
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn selections(&self) -> u64 {
        self.selections
    }

    /// Selections that came up without a clip because loading failed or the
    /// request was refused.
    pub fn skips(&self) -> u64 {
        self.skips
    }

    /// Renders one interleaved stereo block into `out`, which must hold
    /// exactly `2 * block_size` samples.
    pub fn render_block(&mut self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.block_size * CHANNELS);

        if self.at_step_boundary() {
            self.select();
        }

        let fpb = self.block_size;
        let clip_len = self.clip.as_ref().map(|c| c.frame_count()).unwrap_or(0);
        let total = clip_len.min(self.step_frames);

        match self.clip.clone() {
            Some(clip) if self.frame_index < total => {
                let out_frames = (total - self.frame_index).min(fpb);
                let request = ResampleRequest {
                    file_offset: self.frame_index,
                    in_frames: (out_frames as f32 * self.pitch) as usize,
                    out_frames,
                    frames_per_buffer: fpb,
                    fadeout: self.params.fadeout && total < clip_len,
                };
                let result = resample(clip.channels(), &mut self.scratch, &request);

                if clip.channel_count() == 1 {
                    let (left, right) = self.scratch.split_at_mut(1);
                    right[0].copy_from_slice(&left[0]);
                }
                self.chain.process(&mut self.scratch);

                for (i, frame) in out.chunks_exact_mut(CHANNELS).enumerate() {
                    frame[0] = self.scratch[0][i];
                    frame[1] = self.scratch[1][i];
                }

                if result.truncated {
                    self.force_select = true;
                }
                self.frame_index += result.frames_consumed;
                if result.frames_consumed == 0 {
                    self.frame_index = total;
                }
            }
            _ => out.fill(0.0),
        }

        self.frame_counter += fpb;
        if self.frame_counter >= self.step_frames || self.force_select {
            self.frame_counter = 0;
        }

        self.state = if self.at_step_boundary() {
            VoiceState::Selecting
        } else if self.clip.is_some() && self.frame_index < total {
            VoiceState::Playing
        } else {
            VoiceState::Draining
        };
    }

    fn select(&mut self) {
        self.state = VoiceState::Selecting;
        self.force_select = false;
        self.frame_counter = 0;

        let request_next = match self.provider.take() {
            ClipFetch::Ready { index, clip } => {
                self.longest = self.longest.max(clip.frame_count());
                self.clip = Some(clip);
                self.clip_index = Some(index);
                true
            }
            ClipFetch::Failed { index } => {
                debug!(index, "Selected clip failed to load, skipping step.");
                self.clip = None;
                self.clip_index = None;
                self.skips += 1;
                true
            }
            ClipFetch::Pending => {
                self.clip = None;
                self.clip_index = None;
                false
            }
            ClipFetch::Empty => {
                debug!("No clip was requested for this step, skipping.");
                self.clip = None;
                self.clip_index = None;
                self.skips += 1;
                true
            }
        };
        if request_next {
            let next = self.guard.pick(&mut self.rng);
            if !self.provider.request(next) {
                debug!(index = next, "Clip request refused.");
            }
        }

        self.randomize();
        self.selections += 1;
    }

    fn randomize(&mut self) {
        let p = self.params;

        let semitones = self.uniform(-p.pitch_deviation, p.pitch_deviation);
        self.pitch = semitones_to_ratio(semitones);
        let volume = self.uniform(p.volume_floor.clamp(0.0, 1.0), 1.0);
        let cutoff = self.uniform(MAX_CUTOFF - p.lpf_freq_deviation, MAX_CUTOFF);
        let q = self.uniform(DEFAULT_Q, DEFAULT_Q + p.lpf_q_deviation);

        self.chain.configure(
            ChainSettings {
                volume,
                lfo: p.lfo_enabled,
                distortion: p.distortion,
            },
            cutoff,
            q,
            p.lfo_rate,
            p.lfo_depth,
        );

        // Without fade-out every step lasts as long as the longest clip.
        self.step_frames = if p.fadeout { p.step_frames } else { self.longest }.max(1);
        self.frame_index = 0;

        debug!(
            clip = ?self.clip_index,
            pitch = self.pitch,
            volume,
            cutoff,
            q,
            step_frames = self.step_frames,
            "Selected."
        );
    }

    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        low + self.rng.gen::<f32>() * (high - low)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{PlaybackVoice, VoiceState};
    use crate::playback::{ClipFetch, ClipProvider, PlayParams, PlaybackError, PreloadedClips};
    use crate::testutil::clip_of_len;

    const FPB: usize = 256;
    const STEP: usize = 4096;

    fn params() -> PlayParams {
        PlayParams {
            step_frames: STEP,
            ..PlayParams::new(48000)
        }
    }

    fn pool(lengths: &[usize]) -> PreloadedClips {
        PreloadedClips::new(
            lengths
                .iter()
                .enumerate()
                .map(|(i, len)| Arc::new(clip_of_len(&format!("clip{i}"), *len)))
                .collect(),
        )
    }

    #[test]
    fn rejects_bad_configuration() {
        assert_eq!(
            PlaybackVoice::new(pool(&[]), params(), 48000, FPB, Some(1)).err(),
            Some(PlaybackError::EmptyPool)
        );
        assert_eq!(
            PlaybackVoice::new(pool(&[10; 33]), params(), 48000, FPB, Some(1)).err(),
            Some(PlaybackError::PoolTooLarge(33))
        );
        assert_eq!(
            PlaybackVoice::new(pool(&[10]), params(), 48000, 102, Some(1)).err(),
            Some(PlaybackError::BlockSize(102))
        );
    }

    #[test]
    fn step_cycle_and_anti_repeat() {
        let lengths = [1000usize, 2000, 1500, 1800];
        let mut voice = PlaybackVoice::new(pool(&lengths), params(), 48000, FPB, Some(7)).unwrap();
        assert_eq!(voice.state(), VoiceState::Idle);

        let mut out = vec![0.0f32; FPB * 2];
        let blocks_per_step = STEP / FPB;
        let mut picks = Vec::new();

        for _ in 0..8 {
            assert!(voice.at_step_boundary());
            let mut states = Vec::new();
            for _ in 0..blocks_per_step {
                voice.render_block(&mut out);
                states.push(voice.state());
            }
            let index = voice.clip_index().unwrap();
            picks.push(index);

            let playing = lengths[index].div_ceil(FPB);
            for (block, state) in states.iter().enumerate() {
                let expected = if block + 1 == blocks_per_step {
                    VoiceState::Selecting
                } else if block < playing - 1 {
                    VoiceState::Playing
                } else {
                    VoiceState::Draining
                };
                assert_eq!(*state, expected, "clip {index} block {block}");
            }
        }

        for window in picks.chunks(lengths.len()) {
            let mut sorted = window.to_vec();
            sorted.sort();
            assert_eq!(sorted, vec![0, 1, 2, 3], "picks {picks:?}");
        }
        assert_eq!(voice.selections(), 8);
    }

    #[test]
    fn shortest_clip_drains_after_four_blocks() {
        let mut voice = PlaybackVoice::new(pool(&[1000]), params(), 48000, FPB, Some(3)).unwrap();
        let mut out = vec![0.0f32; FPB * 2];
        for _ in 0..3 {
            voice.render_block(&mut out);
            assert_eq!(voice.state(), VoiceState::Playing);
        }
        voice.render_block(&mut out);
        assert_eq!(voice.state(), VoiceState::Draining);
        assert_eq!(voice.frame_index(), 1000);

        // Draining blocks are silent.
        voice.render_block(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn mono_is_duplicated_to_both_channels() {
        let mut voice = PlaybackVoice::new(pool(&[2000]), params(), 48000, FPB, Some(3)).unwrap();
        let mut out = vec![0.0f32; FPB * 2];
        voice.render_block(&mut out);
        assert!(out.chunks_exact(2).all(|f| f[0] == f[1]));
        assert!(out.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn failed_clip_skips_step() {
        let clips = PreloadedClips::load(
            &crate::clip::MemoryLoader::new(vec![clip_of_len("only", 1000)]).failing(0),
        );
        let mut voice = PlaybackVoice::new(clips, params(), 48000, FPB, Some(3)).unwrap();
        let mut out = vec![1.0f32; FPB * 2];
        voice.render_block(&mut out);
        assert_eq!(voice.state(), VoiceState::Draining);
        assert_eq!(voice.skips(), 1);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn overrun_forces_selection() {
        let params = PlayParams {
            pitch_deviation: 12.0,
            ..params()
        };
        let mut voice = PlaybackVoice::new(pool(&[300]), params, 48000, FPB, Some(11)).unwrap();
        let mut out = vec![0.0f32; FPB * 2];

        // Render until a raised pitch overruns the short clip.
        let mut forced = false;
        for _ in 0..(STEP / FPB) * 20 {
            voice.render_block(&mut out);
            if voice.state() == VoiceState::Selecting && voice.frame_index() < 300 && voice.pitch() > 1.0 {
                forced = true;
                break;
            }
        }
        assert!(forced);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn step_spans_clip_without_fadeout() {
        let params = PlayParams {
            step_frames: 512,
            fadeout: false,
            ..params()
        };
        let mut voice = PlaybackVoice::new(pool(&[2000]), params, 48000, FPB, Some(5)).unwrap();
        let mut out = vec![0.0f32; FPB * 2];
        voice.render_block(&mut out);
        assert_eq!(voice.step_frames(), 2000);
        // The step ends with the clip: seven full blocks, then the tail block.
        for _ in 0..6 {
            voice.render_block(&mut out);
            assert_eq!(voice.state(), VoiceState::Playing);
        }
        voice.render_block(&mut out);
        assert_eq!(voice.frame_index(), 2000);
        assert_eq!(voice.state(), VoiceState::Selecting);
    }

    #[test]
    fn params_apply_at_next_step() {
        let mut voice = PlaybackVoice::new(pool(&[1000, 1200]), params(), 48000, FPB, Some(5)).unwrap();
        let mut out = vec![0.0f32; FPB * 2];
        voice.render_block(&mut out);
        voice.set_params(PlayParams {
            step_frames: 1024,
            ..params()
        });
        assert_eq!(voice.step_frames(), STEP);
        while !voice.at_step_boundary() {
            voice.render_block(&mut out);
        }
        voice.render_block(&mut out);
        assert_eq!(voice.step_frames(), 1024);
    }

    #[test]
    fn cadence_without_fadeout_follows_longest_clip() {
        let params = PlayParams {
            step_frames: 512,
            fadeout: false,
            pitch_deviation: 0.0,
            ..params()
        };
        let mut voice = PlaybackVoice::new(pool(&[1000, 3000]), params, 48000, FPB, Some(5)).unwrap();
        let mut out = vec![0.0f32; FPB * 2];

        let mut steps = Vec::new();
        for _ in 0..6 {
            let mut blocks = 0;
            loop {
                voice.render_block(&mut out);
                blocks += 1;
                if voice.at_step_boundary() {
                    break;
                }
            }
            steps.push((voice.clip_index().unwrap(), voice.step_frames(), blocks));
        }

        assert!(steps.iter().any(|(index, _, _)| *index == 0), "{steps:?}");
        assert!(steps.iter().any(|(index, _, _)| *index == 1), "{steps:?}");
        assert!(
            steps.iter().all(|(_, frames, blocks)| *frames == 3000 && *blocks == 12),
            "{steps:?}"
        );
    }

    struct Refusing;

    impl ClipProvider for Refusing {
        fn pool_size(&self) -> usize {
            2
        }

        fn longest_clip(&self) -> usize {
            0
        }

        fn request(&mut self, _index: usize) -> bool {
            false
        }

        fn take(&mut self) -> ClipFetch {
            ClipFetch::Empty
        }
    }

    #[test]
    fn refused_requests_count_as_skips() {
        let mut voice = PlaybackVoice::new(Refusing, params(), 48000, FPB, Some(2)).unwrap();
        let mut out = vec![1.0f32; FPB * 2];
        for _ in 0..(STEP / FPB) * 2 {
            voice.render_block(&mut out);
            assert!(out.iter().all(|s| *s == 0.0));
        }
        assert_eq!(voice.selections(), 2);
        assert_eq!(voice.skips(), 2);
    }
}
