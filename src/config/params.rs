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
use std::fmt;
use std::ops::RangeInclusive;

use serde::Deserialize;

use crate::playback::{step_frames_for_speed, volume_floor_from_db, PlayParams};

pub const WALK_KMH: RangeInclusive<f32> = 1.0..=12.0;
pub const PITCH_SEMITONES: RangeInclusive<f32> = 0.0..=12.0;
pub const VOLUME_DB: RangeInclusive<f32> = 0.0..=90.0;
pub const LPF_KHZ: RangeInclusive<f32> = 0.0..=19.0;
pub const Q_DEVIATION: RangeInclusive<f32> = 0.0..=8.0;
pub const LFO_HZ: RangeInclusive<f32> = 1.0..=20.0;
pub const LFO_PERCENT: RangeInclusive<f32> = 0.0..=100.0;

fn clamp(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

/// User-facing parameters, in the units they are typed in. Values are
/// clamped to their ranges whenever they are read or set.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Walking speed in km/h; sets the step length.
    walk: f32,
    /// Pitch deviation in semitones.
    pitch: f32,
    /// Volume deviation in dB.
    volume: f32,
    /// Low-pass cutoff deviation in kHz below 20 kHz.
    lpf: f32,
    /// Resonance deviation above 0.707.
    q: f32,
    lfo: bool,
    /// LFO rate in Hz.
    lfo_rate: f32,
    /// LFO depth in percent.
    lfo_depth: f32,
    distortion: bool,
    fadeout: bool,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            walk: 4.0,
            pitch: 0.0,
            volume: 0.0,
            lpf: 0.0,
            q: 0.0,
            lfo: false,
            lfo_rate: 1.0,
            lfo_depth: 100.0,
            distortion: false,
            fadeout: true,
        }
    }
}

impl Params {
    pub fn walk(&self) -> f32 {
        clamp(self.walk, &WALK_KMH)
    }

    pub fn pitch(&self) -> f32 {
        clamp(self.pitch, &PITCH_SEMITONES)
    }

    pub fn volume(&self) -> f32 {
        clamp(self.volume, &VOLUME_DB)
    }

    pub fn lpf(&self) -> f32 {
        clamp(self.lpf, &LPF_KHZ)
    }

    pub fn q(&self) -> f32 {
        clamp(self.q, &Q_DEVIATION)
    }

    /// LFO rate and depth, if the LFO is on.
    pub fn lfo(&self) -> Option<(f32, f32)> {
        self.lfo.then(|| {
            (
                clamp(self.lfo_rate, &LFO_HZ),
                clamp(self.lfo_depth, &LFO_PERCENT),
            )
        })
    }

    pub fn distortion(&self) -> bool {
        self.distortion
    }

    pub fn fadeout(&self) -> bool {
        self.fadeout
    }

    pub fn set_walk(&mut self, kmh: f32) -> f32 {
        self.walk = clamp(kmh, &WALK_KMH);
        self.walk
    }

    pub fn set_pitch(&mut self, semitones: f32) -> f32 {
        self.pitch = clamp(semitones, &PITCH_SEMITONES);
        self.pitch
    }

    pub fn set_volume(&mut self, db: f32) -> f32 {
        self.volume = clamp(db, &VOLUME_DB);
        self.volume
    }

    pub fn set_lpf(&mut self, khz: f32) -> f32 {
        self.lpf = clamp(khz, &LPF_KHZ);
        self.lpf
    }

    pub fn set_q(&mut self, q: f32) -> f32 {
        self.q = clamp(q, &Q_DEVIATION);
        self.q
    }

    /// Turns the LFO on with the given rate and depth, or off with `None`.
    pub fn set_lfo(&mut self, lfo: Option<(f32, f32)>) {
        match lfo {
            Some((rate, depth)) => {
                self.lfo = true;
                self.lfo_rate = clamp(rate, &LFO_HZ);
                self.lfo_depth = clamp(depth, &LFO_PERCENT);
            }
            None => self.lfo = false,
        }
    }

    pub fn set_distortion(&mut self, on: bool) {
        self.distortion = on;
    }

    pub fn set_fadeout(&mut self, on: bool) {
        self.fadeout = on;
    }

    /// Converts to the snapshot the render thread consumes.
    pub fn to_play_params(&self, sample_rate: u32) -> PlayParams {
        let (lfo_rate, lfo_depth) = self.lfo().unwrap_or((self.lfo_rate, self.lfo_depth));
        PlayParams {
            step_frames: step_frames_for_speed(sample_rate, self.walk()),
            pitch_deviation: self.pitch(),
            volume_floor: volume_floor_from_db(self.volume()),
            lpf_freq_deviation: self.lpf() * 1000.0,
            lpf_q_deviation: self.q(),
            lfo_enabled: self.lfo,
            lfo_rate: clamp(lfo_rate, &LFO_HZ),
            lfo_depth: clamp(lfo_depth, &LFO_PERCENT) / 100.0,
            distortion: self.distortion,
            fadeout: self.fadeout,
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "walk      {:.1} km/h", self.walk())?;
        writeln!(f, "pitch     +/-{:.1} semitones", self.pitch())?;
        writeln!(f, "volume    -{:.1} dB", self.volume())?;
        writeln!(f, "lpf       -{:.1} kHz", self.lpf())?;
        writeln!(f, "q         +{:.2}", self.q())?;
        match self.lfo() {
            Some((rate, depth)) => writeln!(f, "lfo       {rate:.1} Hz {depth:.0} %")?,
            None => writeln!(f, "lfo       off")?,
        }
        writeln!(f, "dist      {}", on_off(self.distortion))?;
        write!(f, "fade      {}", on_off(self.fadeout))
    }
}
