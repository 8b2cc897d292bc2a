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

//! Background clip loading.
//!
//! The render thread asks for clips through a [`StreamerHandle`]; a dedicated
//! thread decodes them into a small ring of slots. The render side only ever
//! uses `try_lock` on a slot, so a slow decode shows up as a pending fetch and
//! never as a stall.

use std::collections::HashMap;
use std::io;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clip::{Clip, ClipLoader};
use crate::playback::{ClipFetch, ClipProvider};
use crate::sync::Semaphore;

/// Default number of slots between the streamer and the render thread.
pub const DEFAULT_SLOTS: usize = 4;

/// How often an idle streamer rechecks its running flag.
const IDLE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Requested(usize),
    Loading(usize),
    Ready(usize, Arc<Clip>),
    Failed(usize),
}

struct Shared {
    slots: Box<[Mutex<Slot>]>,
    mask: usize,
    demand: Semaphore,
    running: AtomicBool,
    loaded: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn slot(&self, position: usize) -> &Mutex<Slot> {
        &self.slots[position & self.mask]
    }
}

/// Owns the loader thread. Dropping it stops and joins the thread.
pub struct Streamer {
    shared: Arc<Shared>,
    join: Option<JoinHandle<()>>,
}

/// The render thread's end of the streamer.
pub struct StreamerHandle {
    shared: Arc<Shared>,
    pool_size: usize,
    longest: usize,
    read: usize,
    write: usize,
}

impl Streamer {
    /// Spawns the loader thread with `slots` slots (rounded up to a power of two).
    pub fn start<L: ClipLoader>(loader: L, slots: usize) -> io::Result<(Streamer, StreamerHandle)> {
        let slots = slots.max(1).next_power_of_two();
        let pool_size = loader.len();
        let longest = loader.longest();
        let shared = Arc::new(Shared {
            slots: (0..slots).map(|_| Mutex::new(Slot::Empty)).collect(),
            mask: slots - 1,
            demand: Semaphore::new(),
            running: AtomicBool::new(true),
            loaded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        let thread_shared = shared.clone();
        let join = thread::Builder::new()
            .name("footfall-streamer".into())
            .spawn(move || stream(loader, thread_shared))?;

        info!(slots, clips = pool_size, longest, "Streamer started.");
        Ok((
            Streamer {
                shared: shared.clone(),
                join: Some(join),
            },
            StreamerHandle {
                shared,
                pool_size,
                longest,
                read: 0,
                write: 0,
            },
        ))
    }

    /// Clips decoded so far, successfully or not.
    pub fn completed(&self) -> u64 {
        self.shared.loaded.load(Ordering::Relaxed) + self.shared.failed.load(Ordering::Relaxed)
    }

    /// Clips that failed to decode.
    pub fn failed(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }

    /// Waits until at least `count` requests have completed. Returns false on timeout.
    pub fn wait_completed(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.completed() < count {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stops the loader thread and waits for it to exit.
    pub fn shutdown(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        self.shared.running.store(false, Ordering::Release);
        self.shared.demand.signal();
        if join.join().is_err() {
            warn!("Streamer thread panicked.");
        }
        info!("Streamer stopped.");
    }
}

impl Drop for Streamer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The loader thread: one semaphore count per request, served in order.
fn stream<L: ClipLoader>(loader: L, shared: Arc<Shared>) {
    let mut cache: HashMap<usize, Arc<Clip>> = HashMap::with_capacity(loader.len());
    let mut position = 0usize;

    while shared.running.load(Ordering::Acquire) {
        if !shared.demand.wait_timeout(IDLE_TIMEOUT) {
            continue;
        }
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        let index = {
            let mut slot = shared.slot(position).lock();
            match *slot {
                Slot::Requested(index) => {
                    *slot = Slot::Loading(index);
                    index
                }
                _ => continue,
            }
        };

        let result = match cache.get(&index) {
            Some(clip) => Ok(clip.clone()),
            None => loader.load(index).map(Arc::new),
        };

        let done = match result {
            Ok(clip) => {
                debug!(index, frames = clip.frame_count(), "Clip ready.");
                cache.entry(index).or_insert_with(|| clip.clone());
                shared.loaded.fetch_add(1, Ordering::Relaxed);
                Slot::Ready(index, clip)
            }
            Err(e) => {
                warn!(clip = loader.name(index), error = %e, "Failed to load clip.");
                shared.failed.fetch_add(1, Ordering::Relaxed);
                Slot::Failed(index)
            }
        };
        *shared.slot(position).lock() = done;
        position = position.wrapping_add(1);
    }
}

impl ClipProvider for StreamerHandle {
    fn pool_size(&self) -> usize {
        self.pool_size
    }

    fn longest_clip(&self) -> usize {
        self.longest
    }

    fn request(&mut self, index: usize) -> bool {
        if self.write.wrapping_sub(self.read) > self.shared.mask {
            return false;
        }
        let Some(mut slot) = self.shared.slot(self.write).try_lock() else {
            return false;
        };
        if !matches!(*slot, Slot::Empty) {
            return false;
        }
        *slot = Slot::Requested(index);
        drop(slot);

        self.write = self.write.wrapping_add(1);
        self.shared.demand.signal();
        true
    }

    fn take(&mut self) -> ClipFetch {
        if self.read == self.write {
            return ClipFetch::Empty;
        }
        let Some(mut slot) = self.shared.slot(self.read).try_lock() else {
            return ClipFetch::Pending;
        };
        let fetch = match mem::take(&mut *slot) {
            Slot::Ready(index, clip) => ClipFetch::Ready { index, clip },
            Slot::Failed(index) => ClipFetch::Failed { index },
            pending @ (Slot::Requested(_) | Slot::Loading(_)) => {
                *slot = pending;
                return ClipFetch::Pending;
            }
            Slot::Empty => return ClipFetch::Empty,
        };
        drop(slot);

        self.read = self.read.wrapping_add(1);
        fetch
    }
}
