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
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{info, span, warn, Level};

use crate::audio::{AudioError, Device, StreamHandle};
use crate::clip::ClipLoader;
use crate::config::{self, ConfigError};
use crate::dsp::CHANNELS;
use crate::playback::{self, ClipProvider, PlayParams, PlaybackError, PlaybackVoice, PreloadedClips};
use crate::render::{
    log_stats, spawn_renderer, BlockQueue, OutputCallback, RenderStats, Renderer, StatsSnapshot,
    VizFrame,
};
use crate::streamer::Streamer;
use crate::sync::{triple_buffer, Subscriber};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid engine configuration: {0}")]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("Error spawning thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("No clip was loaded within {0:?}")]
    Warmup(Duration),

    #[error("Error writing WAV file: {0}")]
    Wav(#[from] hound::Error),
}

/// A running engine: streamer, render thread and output stream.
pub struct Engine {
    stream: Option<StreamHandle>,
    renderer: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    streamer: Option<Streamer>,
    queue: Arc<BlockQueue>,
    stats: Arc<RenderStats>,
    visualization: Option<Subscriber<VizFrame>>,
}

impl Engine {
    /// Validates the configuration, starts the streamer and waits for the
    /// first clip, then starts the render thread and the device.
    pub fn start<L: ClipLoader>(
        settings: &config::Engine,
        loader: L,
        device: &dyn Device,
        mut params: Subscriber<PlayParams>,
    ) -> Result<Engine, EngineError> {
        let span = span!(Level::INFO, "engine");
        let _enter = span.enter();

        settings.validate()?;
        let sample_rate = settings.sample_rate();
        let block_size = settings.block_size();
        playback::validate(loader.len(), block_size, sample_rate)?;

        let initial = *params.latest();
        let (provider, streamer): (Box<dyn ClipProvider>, Option<Streamer>) = if settings.preload()
        {
            info!(clips = loader.len(), "Preloading clips.");
            (Box::new(PreloadedClips::load(&loader)), None)
        } else {
            let (streamer, handle) = Streamer::start(loader, settings.streamer_slots())?;
            (Box::new(handle), Some(streamer))
        };

        let voice = PlaybackVoice::new(provider, initial, sample_rate, block_size, settings.seed())?;
        if let Some(streamer) = &streamer {
            if !streamer.wait_completed(1, settings.warmup()) {
                return Err(EngineError::Warmup(settings.warmup()));
            }
        }

        let queue = Arc::new(BlockQueue::new(settings.blocks(), block_size));
        let stats = Arc::new(RenderStats::default());
        let (viz_tx, viz_rx) = triple_buffer(VizFrame::new(block_size));
        let running = Arc::new(AtomicBool::new(true));

        let renderer = Renderer::new(voice, params, viz_tx, queue.clone(), stats.clone());
        let mut engine = Engine {
            stream: None,
            renderer: Some(spawn_renderer(renderer, running.clone())?),
            running,
            streamer,
            queue: queue.clone(),
            stats: stats.clone(),
            visualization: Some(viz_rx),
        };

        // An early return from here on drops the engine, which joins what was started.
        engine.stream = Some(device.start(OutputCallback::new(queue, stats))?);
        info!(
            device = %device,
            sample_rate,
            block_size,
            blocks = engine.queue.capacity(),
            "Engine started."
        );
        Ok(engine)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Blocks rendered and waiting for the device.
    pub fn queued(&self) -> usize {
        self.queue.ready()
    }

    /// Hands out the visualization feed. Only the first call gets it.
    pub fn take_visualization(&mut self) -> Option<Subscriber<VizFrame>> {
        self.visualization.take()
    }

    /// False once the output stream has stopped, e.g. after an abort.
    pub fn is_running(&self) -> bool {
        self.stream.as_ref().is_some_and(StreamHandle::is_running)
    }

    /// Stops the device, then the render thread, then the streamer.
    pub fn shutdown(&mut self) {
        let Some(renderer) = self.renderer.take() else {
            return;
        };
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        self.running.store(false, Ordering::Release);
        if renderer.join().is_err() {
            warn!("Render thread panicked.");
        }
        if let Some(mut streamer) = self.streamer.take() {
            streamer.shutdown();
        }
        log_stats(&self.stats.snapshot());
        info!("Engine stopped.");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Renders `seconds` of audio through the same voice and effect chain into a
/// 32-bit float stereo WAV file. Returns the number of frames written.
pub fn render_to_wav<L: ClipLoader>(
    path: &Path,
    settings: &config::Engine,
    loader: &L,
    params: PlayParams,
    seconds: f32,
) -> Result<u64, EngineError> {
    settings.validate()?;
    let sample_rate = settings.sample_rate();
    let block_size = settings.block_size();
    playback::validate(loader.len(), block_size, sample_rate)?;

    let clips = PreloadedClips::load(loader);
    let mut voice = PlaybackVoice::new(clips, params, sample_rate, block_size, settings.seed())?;

    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: CHANNELS as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = (seconds.max(0.0) * sample_rate as f32).ceil() as usize;
    let mut block = vec![0.0; block_size * CHANNELS];
    let mut written = 0usize;
    while written < frames {
        voice.render_block(&mut block);
        let take = (frames - written).min(block_size);
        for sample in &block[..take * CHANNELS] {
            writer.write_sample(*sample)?;
        }
        written += take;
    }
    writer.finalize()?;

    info!(
        path = ?path,
        frames = written,
        selections = voice.selections(),
        skips = voice.skips(),
        "Rendered."
    );
    Ok(written as u64)
}
