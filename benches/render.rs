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

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use footfall::clip::Clip;
use footfall::dsp::{ChainSettings, DspChain};
use footfall::playback::{PlayParams, PlaybackVoice, PreloadedClips};
use footfall::resample::{resample, ResampleRequest};

const SAMPLE_RATE: u32 = 48000;
const BLOCK: usize = 256;

fn generate_clip(name: &str, seconds: f32) -> Clip {
    let frames = (seconds * SAMPLE_RATE as f32) as usize;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 880.0 * t).sin()
        })
        .collect::<Vec<_>>();
    Clip::new(name, vec![samples.clone(), samples], SAMPLE_RATE).unwrap()
}

fn benchmark_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    let clip = generate_clip("bench", 1.0);
    let mut dest = vec![vec![0.0; BLOCK]; 2];

    for (name, ratio) in [("copy", 1.0f32), ("down_fifth", 0.667), ("up_octave", 2.0)] {
        let request = ResampleRequest {
            file_offset: 0,
            in_frames: (BLOCK as f32 * ratio) as usize,
            out_frames: BLOCK,
            frames_per_buffer: BLOCK,
            fadeout: false,
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| black_box(resample(clip.channels(), &mut dest, black_box(request))))
        });
    }

    group.finish();
}

fn benchmark_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp_chain");

    for (name, lfo, distortion) in [
        ("gain", false, false),
        ("lfo", true, false),
        ("distortion", false, true),
        ("all", true, true),
    ] {
        let mut chain = DspChain::new(SAMPLE_RATE);
        chain.configure(
            ChainSettings {
                volume: 0.8,
                lfo,
                distortion,
            },
            8000.0,
            2.0,
            4.0,
            0.5,
        );
        let clip = generate_clip("bench", 0.1);
        let mut block = vec![clip.channel(0)[..BLOCK].to_vec(), clip.channel(1)[..BLOCK].to_vec()];

        group.bench_function(name, |b| {
            b.iter(|| {
                chain.process(black_box(&mut block));
            })
        });
    }

    group.finish();
}

fn benchmark_voice(c: &mut Criterion) {
    let clips = (0..8)
        .map(|i| Arc::new(generate_clip(&format!("step{i}"), 0.3)))
        .collect();
    let mut params = PlayParams::new(SAMPLE_RATE);
    params.pitch_deviation = 3.0;
    params.lpf_freq_deviation = 12000.0;
    params.lpf_q_deviation = 2.0;
    params.distortion = true;

    let mut voice =
        PlaybackVoice::new(PreloadedClips::new(clips), params, SAMPLE_RATE, BLOCK, Some(1)).unwrap();
    let mut out = vec![0.0; BLOCK * 2];

    c.bench_function("voice_render_block", |b| {
        b.iter(|| {
            voice.render_block(black_box(&mut out));
        })
    });
}

criterion_group!(benches, benchmark_resample, benchmark_chain, benchmark_voice);
criterion_main!(benches);
