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
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{decode_file, frame_count_of, Clip, ClipError};

/// Extensions picked up when scanning a clip directory.
const CLIP_EXTENSIONS: &[&str] = &["wav", "flac", "ogg", "mp3", "aiff", "aif", "m4a"];

/// A fixed pool of clips addressed by index.
pub trait ClipLoader: Send + 'static {
    /// Number of clips in the pool.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display name of a clip, used in logs.
    fn name(&self, index: usize) -> String;

    /// Loads a clip. Called from the streamer thread, never from the render path.
    fn load(&self, index: usize) -> Result<Clip, ClipError>;

    /// Frame count of a clip as `load` would return it.
    fn frame_count(&self, index: usize) -> Result<usize, ClipError> {
        self.load(index).map(|clip| clip.frame_count())
    }

    /// Frame count of the longest clip that can be loaded, or 0 if none can.
    fn longest(&self) -> usize {
        (0..self.len())
            .filter_map(|index| self.frame_count(index).ok())
            .max()
            .unwrap_or(0)
    }
}

/// Lists the audio files in `dir`, sorted by file name.
pub fn discover_clips(dir: &Path) -> Result<Vec<PathBuf>, ClipError> {
    let mut paths = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| CLIP_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

/// Loads clips from files, decoding on every call.
#[derive(Debug, Clone)]
pub struct FileLoader {
    paths: Vec<PathBuf>,
    sample_rate: u32,
}

impl FileLoader {
    pub fn new(paths: Vec<PathBuf>, sample_rate: u32) -> FileLoader {
        FileLoader { paths, sample_rate }
    }

    /// Builds a loader over every clip found in `dir`.
    pub fn from_dir(dir: &Path, sample_rate: u32) -> Result<FileLoader, ClipError> {
        let paths = discover_clips(dir)?;
        info!(dir = ?dir, clips = paths.len(), "Found clips.");
        Ok(FileLoader::new(paths, sample_rate))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl ClipLoader for FileLoader {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn name(&self, index: usize) -> String {
        self.paths
            .get(index)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("#{index}"))
    }

    fn load(&self, index: usize) -> Result<Clip, ClipError> {
        let path = self.paths.get(index).ok_or(ClipError::OutOfRange(index))?;
        decode_file(path, self.sample_rate)
    }

    fn frame_count(&self, index: usize) -> Result<usize, ClipError> {
        let path = self.paths.get(index).ok_or(ClipError::OutOfRange(index))?;
        frame_count_of(path, self.sample_rate)
    }
}

/// Serves clips that are already in memory. Selected indices can be marked as
/// failing to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    clips: Vec<Clip>,
    failing: HashSet<usize>,
}

impl MemoryLoader {
    pub fn new(clips: Vec<Clip>) -> MemoryLoader {
        MemoryLoader {
            clips,
            failing: HashSet::new(),
        }
    }

    /// Makes every load of `index` fail.
    pub fn failing(mut self, index: usize) -> MemoryLoader {
        self.failing.insert(index);
        self
    }
}

impl ClipLoader for MemoryLoader {
    fn len(&self) -> usize {
        self.clips.len()
    }

    fn name(&self, index: usize) -> String {
        self.clips
            .get(index)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| format!("#{index}"))
    }

    fn load(&self, index: usize) -> Result<Clip, ClipError> {
        if self.failing.contains(&index) {
            return Err(ClipError::Unavailable(self.name(index)));
        }
        self.clips
            .get(index)
            .cloned()
            .ok_or(ClipError::OutOfRange(index))
    }

    fn frame_count(&self, index: usize) -> Result<usize, ClipError> {
        if self.failing.contains(&index) {
            return Err(ClipError::Unavailable(self.name(index)));
        }
        self.clips
            .get(index)
            .map(Clip::frame_count)
            .ok_or(ClipError::OutOfRange(index))
    }
}
