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

//! The render thread and the hardware callback it feeds.
//!
//! Blocks cycle between two rings: the renderer takes a block from `free`,
//! renders into it and pushes it onto `ready`; the callback pops from `ready`,
//! copies it out and returns it to `free`. Nothing is allocated once the pool
//! is built.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::AudioThreadPriority;
use crate::dsp::CHANNELS;
use crate::playback::{ClipProvider, PlayParams, PlaybackVoice};
use crate::sync::{Publisher, RingBuffer, Subscriber};

/// Default number of pooled blocks.
pub const DEFAULT_BLOCKS: usize = 8;

/// Backoff when there is nothing to render into.
const BACKOFF: Duration = Duration::from_millis(1);

/// One interleaved stereo block.
pub struct RenderedBlock {
    samples: Box<[f32]>,
}

impl RenderedBlock {
    fn new(block_size: usize) -> RenderedBlock {
        RenderedBlock {
            samples: vec![0.0; block_size * CHANNELS].into_boxed_slice(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// The two rings blocks travel through.
pub struct BlockQueue {
    ready: RingBuffer<RenderedBlock>,
    free: RingBuffer<RenderedBlock>,
    block_size: usize,
}

impl BlockQueue {
    /// Builds a pool of `blocks` blocks (rounded up to a power of two), all free.
    pub fn new(blocks: usize, block_size: usize) -> BlockQueue {
        let ready = RingBuffer::new(blocks);
        let free = RingBuffer::new(blocks);
        for _ in 0..free.capacity() {
            // The free ring was sized for exactly this many blocks.
            let _ = free.try_push(RenderedBlock::new(block_size));
        }
        BlockQueue {
            ready,
            free,
            block_size,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Blocks rendered and waiting for the callback.
    pub fn ready(&self) -> usize {
        self.ready.len()
    }

    pub fn capacity(&self) -> usize {
        self.free.capacity()
    }
}

/// Counters shared by the render thread and the callback.
#[derive(Debug, Default)]
pub struct RenderStats {
    underruns: AtomicU64,
    xruns: AtomicU64,
    blocks_rendered: AtomicU64,
    blocks_played: AtomicU64,
    selections: AtomicU64,
    clip_skips: AtomicU64,
    aborts: AtomicU64,
}

/// A point-in-time copy of [`RenderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Callbacks that found no block ready and played silence.
    pub underruns: u64,
    /// Underflows reported by the driver itself.
    pub xruns: u64,
    pub blocks_rendered: u64,
    pub blocks_played: u64,
    pub selections: u64,
    /// Selections whose clip failed to load.
    pub clip_skips: u64,
    /// Callbacks rejected for a block size mismatch.
    pub aborts: u64,
}

impl RenderStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            underruns: self.underruns.load(Ordering::Relaxed),
            xruns: self.xruns.load(Ordering::Relaxed),
            blocks_rendered: self.blocks_rendered.load(Ordering::Relaxed),
            blocks_played: self.blocks_played.load(Ordering::Relaxed),
            selections: self.selections.load(Ordering::Relaxed),
            clip_skips: self.clip_skips.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
        }
    }
}

/// Mono downmix of the most recent block, for meters and scopes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VizFrame {
    /// Number of the block this frame was taken from.
    pub seq: u64,
    pub samples: Vec<f32>,
}

impl VizFrame {
    pub fn new(block_size: usize) -> VizFrame {
        VizFrame {
            seq: 0,
            samples: vec![0.0; block_size],
        }
    }

    /// Root mean square of the frame.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        (self.samples.iter().map(|s| s * s).sum::<f32>() / self.samples.len() as f32).sqrt()
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }
}

/// Drives a voice and keeps the ready ring topped up.
pub struct Renderer<P: ClipProvider> {
    voice: PlaybackVoice<P>,
    params: Subscriber<PlayParams>,
    viz: Publisher<VizFrame>,
    queue: Arc<BlockQueue>,
    stats: Arc<RenderStats>,
    seq: u64,
}

impl<P: ClipProvider> Renderer<P> {
    pub fn new(
        voice: PlaybackVoice<P>,
        params: Subscriber<PlayParams>,
        viz: Publisher<VizFrame>,
        queue: Arc<BlockQueue>,
        stats: Arc<RenderStats>,
    ) -> Renderer<P> {
        Renderer {
            voice,
            params,
            viz,
            queue,
            stats,
            seq: 0,
        }
    }

    /// Renders one block if there is room for it. Returns false when the
    /// ready ring is full.
    pub fn render_one(&mut self) -> bool {
        if self.queue.ready.is_full() {
            return false;
        }
        let Some(mut block) = self.queue.free.try_pop() else {
            return false;
        };

        if self.voice.at_step_boundary() {
            if let Some(params) = self.params.try_read().map(|p| *p) {
                self.voice.set_params(params);
            }
        }
        self.voice.render_block(&mut block.samples);

        self.seq += 1;
        let seq = self.seq;
        let samples = &block.samples;
        self.viz.publish_with(|frame| {
            frame.seq = seq;
            frame.samples.clear();
            frame
                .samples
                .extend(samples.chunks_exact(CHANNELS).map(|f| (f[0] + f[1]) * 0.5));
        });

        self.stats.blocks_rendered.fetch_add(1, Ordering::Relaxed);
        self.stats
            .selections
            .store(self.voice.selections(), Ordering::Relaxed);
        self.stats
            .clip_skips
            .store(self.voice.skips(), Ordering::Relaxed);

        if let Err(block) = self.queue.ready.try_push(block) {
            let _ = self.queue.free.try_push(block);
        }
        true
    }

    /// Renders until `running` is cleared.
    pub fn run(mut self, running: &AtomicBool) {
        AudioThreadPriority::from_env().apply("render");

        info!(block_size = self.voice.block_size(), "Render thread started.");
        while running.load(Ordering::Acquire) {
            if !self.render_one() {
                thread::sleep(BACKOFF);
            }
        }
        info!(
            blocks = self.seq,
            selections = self.voice.selections(),
            "Render thread stopped."
        );
    }
}

/// Spawns the render thread. It runs until `running` is cleared.
pub fn spawn_renderer<P: ClipProvider + 'static>(
    renderer: Renderer<P>,
    running: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("footfall-render".into())
        .spawn(move || renderer.run(&running))
}

/// Driver-side flags passed to every callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackStatus {
    pub output_underflow: bool,
}

/// Derives [`CallbackStatus`] from callback arrival times. A callback that
/// arrives more than one and a half periods after the previous one means the
/// driver ran dry in between.
#[derive(Debug, Clone, Copy)]
pub struct CallbackTimer {
    period: Duration,
}

impl CallbackTimer {
    pub fn new(period: Duration) -> CallbackTimer {
        CallbackTimer { period }
    }

    /// Timer for blocks of `block_size` frames at `sample_rate`.
    pub fn for_blocks(block_size: usize, sample_rate: u32) -> CallbackTimer {
        CallbackTimer::new(Duration::from_secs_f64(
            block_size as f64 / sample_rate.max(1) as f64,
        ))
    }

    /// Status for a callback arriving `gap` after the previous one.
    pub fn status(&self, gap: Option<Duration>) -> CallbackStatus {
        CallbackStatus {
            output_underflow: gap.is_some_and(|gap| gap > self.period * 3 / 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    Continue,
    /// The stream must be stopped.
    Abort,
}

/// The only code that runs on the driver's real-time thread. Copies one
/// ready block out per call, or silence when none is ready.
pub struct OutputCallback {
    queue: Arc<BlockQueue>,
    stats: Arc<RenderStats>,
}

impl OutputCallback {
    pub fn new(queue: Arc<BlockQueue>, stats: Arc<RenderStats>) -> OutputCallback {
        OutputCallback { queue, stats }
    }

    pub fn block_size(&self) -> usize {
        self.queue.block_size
    }

    /// Fills `output` with `frame_count` interleaved stereo frames.
    pub fn fill(
        &mut self,
        output: &mut [f32],
        frame_count: usize,
        status: &CallbackStatus,
    ) -> CallbackResult {
        if frame_count != self.queue.block_size || output.len() != frame_count * CHANNELS {
            self.stats.aborts.fetch_add(1, Ordering::Relaxed);
            return CallbackResult::Abort;
        }
        if status.output_underflow {
            self.stats.xruns.fetch_add(1, Ordering::Relaxed);
        }

        match self.queue.ready.try_pop() {
            Some(block) => {
                output.copy_from_slice(&block.samples);
                self.stats.blocks_played.fetch_add(1, Ordering::Relaxed);
                // The free ring holds every block of the pool, so this never fails.
                let _ = self.queue.free.try_push(block);
            }
            None => {
                output.fill(0.0);
                self.stats.underruns.fetch_add(1, Ordering::Relaxed);
            }
        }
        CallbackResult::Continue
    }
}

/// Logs a summary of the counters, warning if the callback ever went hungry.
pub fn log_stats(stats: &StatsSnapshot) {
    if stats.underruns > 0 || stats.xruns > 0 {
        warn!(
            underruns = stats.underruns,
            xruns = stats.xruns,
            played = stats.blocks_played,
            "Output underran."
        );
    }
    info!(
        rendered = stats.blocks_rendered,
        played = stats.blocks_played,
        selections = stats.selections,
        skips = stats.clip_skips,
        aborts = stats.aborts,
        "Render stats."
    );
}
