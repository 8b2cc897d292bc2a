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
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::warn;

use crate::clip::{Clip, ClipLoader};

/// Requests a voice may have outstanding with an in-memory provider.
const MAX_PENDING: usize = 4;

/// Result of asking a provider for the next requested clip.
#[derive(Debug, Clone)]
pub enum ClipFetch {
    Ready { index: usize, clip: Arc<Clip> },
    /// The requested clip could not be loaded.
    Failed { index: usize },
    /// A request is outstanding but not loaded yet.
    Pending,
    /// Nothing was requested.
    Empty,
}

/// Where a voice gets its clips from. `request` and `take` are called from the
/// render thread and must not block.
pub trait ClipProvider: Send {
    fn pool_size(&self) -> usize;

    /// Frame count of the longest clip in the pool.
    fn longest_clip(&self) -> usize;

    /// Queues a clip for loading. Returns false if the request could not be queued.
    fn request(&mut self, index: usize) -> bool;

    /// Hands out the oldest request.
    fn take(&mut self) -> ClipFetch;
}

impl<P: ClipProvider + ?Sized> ClipProvider for Box<P> {
    fn pool_size(&self) -> usize {
        (**self).pool_size()
    }

    fn longest_clip(&self) -> usize {
        (**self).longest_clip()
    }

    fn request(&mut self, index: usize) -> bool {
        (**self).request(index)
    }

    fn take(&mut self) -> ClipFetch {
        (**self).take()
    }
}

/// A provider whose clips are all decoded up front.
pub struct PreloadedClips {
    clips: Vec<Option<Arc<Clip>>>,
    requests: VecDeque<usize>,
}

impl PreloadedClips {
    pub fn new(clips: Vec<Arc<Clip>>) -> PreloadedClips {
        PreloadedClips {
            clips: clips.into_iter().map(Some).collect(),
            requests: VecDeque::with_capacity(MAX_PENDING),
        }
    }

    /// Loads every clip of `loader`. Clips that fail to load are logged and
    /// reported as failed when selected.
    pub fn load<L: ClipLoader + ?Sized>(loader: &L) -> PreloadedClips {
        let clips = (0..loader.len())
            .map(|index| match loader.load(index) {
                Ok(clip) => Some(Arc::new(clip)),
                Err(e) => {
                    warn!(clip = loader.name(index), error = %e, "Failed to load clip.");
                    None
                }
            })
            .collect();
        PreloadedClips {
            clips,
            requests: VecDeque::with_capacity(MAX_PENDING),
        }
    }
}

impl ClipProvider for PreloadedClips {
    fn pool_size(&self) -> usize {
        self.clips.len()
    }

    fn longest_clip(&self) -> usize {
        self.clips
            .iter()
            .flatten()
            .map(|clip| clip.frame_count())
            .max()
            .unwrap_or(0)
    }

    fn request(&mut self, index: usize) -> bool {
        if self.requests.len() >= MAX_PENDING {
            return false;
        }
        self.requests.push_back(index);
        true
    }

    fn take(&mut self) -> ClipFetch {
        match self.requests.pop_front() {
            None => ClipFetch::Empty,
            Some(index) => match self.clips.get(index) {
                Some(Some(clip)) => ClipFetch::Ready {
                    index,
                    clip: clip.clone(),
                },
                _ => ClipFetch::Failed { index },
            },
        }
    }
}
