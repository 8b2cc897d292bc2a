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

const PI_DIV_4: f32 = 0.785_398_163_39;
const SIGN_BIT: u32 = 0x8000_0000;

/// Waveshaper configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveshaperParams {
    /// Drive for samples with the sign bit clear.
    pub coef_pos: f32,
    /// Drive for samples with the sign bit set.
    pub coef_neg: f32,
    pub stages: u32,
    /// Stages whose index shares a bit with this mask flip the sign of their output.
    pub invert_stages: u32,
    /// Makeup gain applied after the last stage.
    pub gain: f32,
}

impl Default for WaveshaperParams {
    fn default() -> Self {
        WaveshaperParams {
            coef_pos: 0.2,
            coef_neg: 1.8,
            stages: 9,
            invert_stages: 1,
            gain: 0.12,
        }
    }
}

/// Stateless cascade of polynomial arctangent soft clippers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Waveshaper {
    params: WaveshaperParams,
}

#[inline]
fn fast_atan(x: f32) -> f32 {
    let abs = f32::from_bits(x.to_bits() & !SIGN_BIT);
    PI_DIV_4 * x - x * (abs - 1.0) * (0.2447 + 0.0663 * abs)
}

impl Waveshaper {
    pub fn new(params: WaveshaperParams) -> Waveshaper {
        Waveshaper { params }
    }

    pub fn params(&self) -> &WaveshaperParams {
        &self.params
    }

    #[inline]
    pub fn shape(&self, input: f32) -> f32 {
        let p = &self.params;
        let mut sample = input;
        for stage in 0..p.stages {
            // Arithmetic shift of the sign bit: all ones for negative samples.
            let mask = (sample.to_bits() as i32 >> 31) as u32;
            let coef = f32::from_bits((!mask & p.coef_pos.to_bits()) | (mask & p.coef_neg.to_bits()));
            sample = (1.0 / fast_atan(coef)) * fast_atan(coef * sample);

            let flip = SIGN_BIT & !(p.invert_stages & stage).wrapping_sub(1);
            sample = f32::from_bits(sample.to_bits() ^ flip);
        }
        sample * p.gain
    }

    pub fn process(&self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.shape(*sample);
        }
    }
}
