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

/// Upper bound of the randomized low-pass cutoff, in Hz.
pub const MAX_CUTOFF: f32 = 20000.0;

/// Resonance used when no Q deviation is requested.
pub const DEFAULT_Q: f32 = 0.707;

/// Distance covered by one step, in meters.
const STEP_LENGTH_METERS: f32 = 0.762;

/// A snapshot of the user-tunable rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayParams {
    /// Frames between two selections.
    pub step_frames: usize,
    /// Maximum pitch deviation in semitones, in either direction.
    pub pitch_deviation: f32,
    /// Lowest linear volume a selection may draw.
    pub volume_floor: f32,
    /// How far below 20 kHz the cutoff may be drawn, in Hz.
    pub lpf_freq_deviation: f32,
    /// How far above 0.707 the resonance may be drawn.
    pub lpf_q_deviation: f32,
    pub lfo_enabled: bool,
    /// LFO rate in Hz.
    pub lfo_rate: f32,
    /// LFO depth in `[0, 1]`.
    pub lfo_depth: f32,
    pub distortion: bool,
    /// Fade clips cut short by the step length. When disabled, every step
    /// lasts as long as the longest clip in the pool so no clip is cut.
    pub fadeout: bool,
}

impl PlayParams {
    /// Defaults for a 4 km/h walk at `sample_rate`.
    pub fn new(sample_rate: u32) -> PlayParams {
        PlayParams {
            step_frames: step_frames_for_speed(sample_rate, 4.0),
            pitch_deviation: 0.0,
            volume_floor: 1.0,
            lpf_freq_deviation: 0.0,
            lpf_q_deviation: 0.0,
            lfo_enabled: false,
            lfo_rate: 1.0,
            lfo_depth: 1.0,
            distortion: false,
            fadeout: true,
        }
    }
}

impl Default for PlayParams {
    fn default() -> Self {
        PlayParams::new(48000)
    }
}

/// Frames per step at a walking speed given in km/h.
pub fn step_frames_for_speed(sample_rate: u32, kmh: f32) -> usize {
    let meters_per_second = kmh.max(0.1) / 3.6;
    (sample_rate as f32 * STEP_LENGTH_METERS / meters_per_second).ceil() as usize
}

/// Linear gain for an attenuation in dB.
pub fn volume_floor_from_db(db: f32) -> f32 {
    10f32.powf(-0.05 * db)
}

/// Frequency ratio for a shift in semitones.
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    2f32.powf(semitones / 12.0)
}

#[cfg(test)]
mod test {
    use super::{semitones_to_ratio, step_frames_for_speed, volume_floor_from_db, PlayParams};

    #[test]
    fn step_length_from_speed() {
        // 3.6 km/h is one meter per second.
        assert!((36576..=36577).contains(&step_frames_for_speed(48000, 3.6)));
        assert!(step_frames_for_speed(48000, 12.0) < step_frames_for_speed(48000, 1.0));
        assert_eq!(PlayParams::new(48000).step_frames, step_frames_for_speed(48000, 4.0));
    }

    #[test]
    fn conversions() {
        assert_eq!(volume_floor_from_db(0.0), 1.0);
        assert!((volume_floor_from_db(20.0) - 0.1).abs() < 1e-6);
        assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-6);
        assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 1e-6);
    }
}
