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

/// Entries in one wavetable period. Must be a power of two.
pub const LFO_TABLE_SIZE: usize = 1024;

/// Wavetable amplitude modulator with one phase per channel.
pub struct Lfo {
    table: Box<[f32; LFO_TABLE_SIZE]>,
    phase: [f32; CHANNELS],
    increment: f32,
    depth: f32,
    sample_rate: f32,
}

impl Lfo {
    pub fn new(sample_rate: u32) -> Lfo {
        let mut table = Box::new([0.0f32; LFO_TABLE_SIZE]);
        for (i, entry) in table.iter_mut().enumerate() {
            let theta = (i as f32 / LFO_TABLE_SIZE as f32) * 2.0 * PI;
            *entry = (1.0 - theta.sin()) * 0.5;
        }

        Lfo {
            table,
            phase: [0.0; CHANNELS],
            increment: 0.0,
            depth: 0.0,
            sample_rate: sample_rate as f32,
        }
    }

    /// Sets the rate in Hz and the depth in `[0, 1]`, restarting every channel at phase zero.
    pub fn set_rate(&mut self, rate: f32, depth: f32) {
        self.phase = [0.0; CHANNELS];
        self.increment = LFO_TABLE_SIZE as f32 * rate / self.sample_rate;
        self.depth = depth.clamp(0.0, 1.0);
    }

    /// Gain for the next sample of `channel`. Depth 0 always yields 1.
    #[inline]
    pub fn next(&mut self, channel: usize) -> f32 {
        let phase = self.phase[channel];
        let index = phase as usize;
        let frac = phase - index as f32;
        let next = (index + 1) & (LFO_TABLE_SIZE - 1);
        let value = self.table[index] * (1.0 - frac) + self.table[next] * frac;

        let advanced = phase + self.increment;
        let whole = advanced as usize;
        self.phase[channel] = (whole & (LFO_TABLE_SIZE - 1)) as f32 + (advanced - whole as f32);

        1.0 - value * self.depth
    }
}

#[cfg(test)]
mod test {
    use super::{Lfo, LFO_TABLE_SIZE};

    #[test]
    fn zero_depth_is_transparent() {
        let mut lfo = Lfo::new(48000);
        lfo.set_rate(7.0, 0.0);
        for _ in 0..10_000 {
            assert_eq!(lfo.next(0), 1.0);
        }
    }

    #[test]
    fn full_depth_spans_unit_range() {
        let mut lfo = Lfo::new(48000);
        lfo.set_rate(10.0, 1.0);
        let gains = (0..4800).map(|_| lfo.next(1)).collect::<Vec<_>>();
        let min = gains.iter().cloned().fold(f32::MAX, f32::min);
        let max = gains.iter().cloned().fold(f32::MIN, f32::max);
        assert!(min >= 0.0 && min < 0.01, "{min}");
        assert!(max <= 1.0 && max > 0.99, "{max}");
        // Phase zero sits on the table midpoint.
        assert!((gains[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn period_matches_rate() {
        let mut lfo = Lfo::new(1024);
        lfo.set_rate(1.0, 1.0);
        let first = lfo.next(0);
        for _ in 1..LFO_TABLE_SIZE {
            lfo.next(0);
        }
        assert!((lfo.next(0) - first).abs() < 1e-5);
    }

    #[test]
    fn set_rate_resets_phase() {
        let mut lfo = Lfo::new(48000);
        lfo.set_rate(3.0, 0.8);
        let start = lfo.next(0);
        for _ in 0..1000 {
            lfo.next(0);
        }
        lfo.set_rate(3.0, 0.8);
        assert_eq!(lfo.next(0), start);
    }
}
