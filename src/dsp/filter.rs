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
use std::f32::consts::PI;

use super::CHANNELS;

const MIN_CUTOFF: f32 = 10.0;
const MIN_Q: f32 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// Second order low-pass (RBJ cookbook) with independent history per channel.
#[derive(Debug, Clone)]
pub struct LowPass {
    sample_rate: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    history: [History; CHANNELS],
}

impl LowPass {
    /// Creates a pass-through filter.
    pub fn new(sample_rate: u32) -> LowPass {
        LowPass {
            sample_rate: sample_rate as f32,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            history: [History::default(); CHANNELS],
        }
    }

    /// Recomputes coefficients and clears the history of every channel.
    ///
    /// The cutoff is kept between 10 Hz and 0.49 of the sample rate.
    pub fn setup(&mut self, cutoff: f32, q: f32) {
        let cutoff = cutoff.clamp(MIN_CUTOFF, self.sample_rate * 0.49);
        let q = q.max(MIN_Q);

        let w0 = 2.0 * PI * cutoff / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = (1.0 - cos_w0) * 0.5;
        let b1 = 1.0 - cos_w0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        let inv_a0 = 1.0 / a0;
        self.b0 = b0 * inv_a0;
        self.b1 = b1 * inv_a0;
        self.b2 = b2 * inv_a0;
        self.a1 = a1 * inv_a0;
        self.a2 = a2 * inv_a0;
        self.clear();
    }

    pub fn clear(&mut self) {
        self.history = [History::default(); CHANNELS];
    }

    #[inline]
    pub fn tick(&mut self, channel: usize, input: f32) -> f32 {
        let h = &mut self.history[channel];
        let output = self.b0 * input + self.b1 * h.x1 + self.b2 * h.x2
            - self.a1 * h.y1
            - self.a2 * h.y2;
        h.x2 = h.x1;
        h.x1 = input;
        h.y2 = h.y1;
        h.y1 = output;
        output
    }

    pub fn process(&mut self, channel: usize, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.tick(channel, *sample);
        }
    }
}

#[cfg(test)]
mod test {
    use super::LowPass;

    const SETTLE: usize = 4096;

    #[test]
    fn impulse_response_decays() {
        // Cutoffs span the randomized range (20 kHz minus up to 19 kHz of
        // deviation) and Q spans 0.707 plus up to 8 of deviation.
        for cutoff in [1000.0f32, 2500.0, 5000.0, 10000.0, 15000.0, 20000.0] {
            for q in [0.707f32, 1.0, 2.0, 4.707, 8.707] {
                let mut filter = LowPass::new(48000);
                filter.setup(cutoff, q);

                let mut impulse = vec![0.0f32; SETTLE];
                impulse[0] = 1.0;
                filter.process(0, &mut impulse);

                assert!(impulse.iter().all(|s| s.is_finite()), "{cutoff} {q}");
                let tail = impulse[SETTLE - 64..]
                    .iter()
                    .fold(0.0f32, |acc, s| acc.max(s.abs()));
                assert!(tail < 1e-4, "cutoff {cutoff} q {q} tail {tail}");
            }
        }
    }

    #[test]
    fn dc_passes_at_unity() {
        let mut filter = LowPass::new(48000);
        filter.setup(5000.0, 0.707);
        let mut dc = vec![1.0f32; 2048];
        filter.process(1, &mut dc);
        assert!((dc[2047] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn channels_are_independent() {
        let mut filter = LowPass::new(48000);
        filter.setup(2000.0, 1.0);
        let mut left = vec![1.0f32; 64];
        filter.process(0, &mut left);

        let mut right = vec![0.0f32; 64];
        filter.process(1, &mut right);
        assert!(right.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn extreme_cutoff_is_clamped() {
        let mut filter = LowPass::new(48000);
        filter.setup(96000.0, 0.0);
        let mut noise = (0..1024)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect::<Vec<f32>>();
        filter.process(0, &mut noise);
        assert!(noise.iter().all(|s| s.is_finite()));
    }
}
