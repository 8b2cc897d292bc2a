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

//! The per-voice effect chain: gain or LFO, optional waveshaper, low-pass filter.

mod filter;
mod lfo;
mod waveshaper;

pub use filter::LowPass;
pub use lfo::{Lfo, LFO_TABLE_SIZE};
pub use waveshaper::{Waveshaper, WaveshaperParams};

/// Number of output channels the chain processes.
pub const CHANNELS: usize = 2;

/// Per-selection settings of the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub volume: f32,
    pub lfo: bool,
    pub distortion: bool,
}

/// Effect state owned by a playback voice.
pub struct DspChain {
    lfo: Lfo,
    waveshaper: Waveshaper,
    low_pass: LowPass,
    settings: ChainSettings,
}

impl DspChain {
    pub fn new(sample_rate: u32) -> DspChain {
        DspChain {
            lfo: Lfo::new(sample_rate),
            waveshaper: Waveshaper::default(),
            low_pass: LowPass::new(sample_rate),
            settings: ChainSettings {
                volume: 1.0,
                lfo: false,
                distortion: false,
            },
        }
    }

    /// Applies the settings drawn for a new selection. Resets filter history,
    /// and resets LFO phase when the LFO is in use.
    pub fn configure(
        &mut self,
        settings: ChainSettings,
        cutoff: f32,
        q: f32,
        lfo_rate: f32,
        lfo_depth: f32,
    ) {
        self.settings = settings;
        self.low_pass.setup(cutoff, q);
        if settings.lfo {
            self.lfo.set_rate(lfo_rate, lfo_depth);
        }
    }

    pub fn settings(&self) -> ChainSettings {
        self.settings
    }

    /// Runs the chain in place over each channel.
    pub fn process(&mut self, channels: &mut [Vec<f32>]) {
        for (channel, samples) in channels.iter_mut().enumerate().take(CHANNELS) {
            if self.settings.lfo {
                for sample in samples.iter_mut() {
                    *sample *= self.lfo.next(channel);
                }
            } else {
                let volume = self.settings.volume;
                samples.iter_mut().for_each(|sample| *sample *= volume);
            }

            if self.settings.distortion {
                self.waveshaper.process(samples);
            }

            self.low_pass.process(channel, samples);
        }
    }
}
