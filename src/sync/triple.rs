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

//! A three-slot single-writer/single-reader cell.
//!
//! The writer owns the back slot and the reader owns the front slot. The
//! middle slot index lives in one atomic together with a freshness bit, so
//! publishing and consuming are each a single atomic swap. Slot ownership is
//! exclusive at all times, which means the per-slot mutexes are never
//! contended; they exist only to hand out references safely.

use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use parking_lot::{Mutex, MutexGuard};

const INDEX_MASK: u8 = 0b011;
const FRESH: u8 = 0b100;

struct Shared<T> {
    slots: [Mutex<T>; 3],
    middle: AtomicU8,
}

/// Writing half of a triple buffer.
pub struct Publisher<T> {
    shared: Arc<Shared<T>>,
    back: u8,
}

/// Reading half of a triple buffer.
pub struct Subscriber<T> {
    shared: Arc<Shared<T>>,
    front: u8,
}

/// Creates a triple buffer whose three slots start as copies of `initial`.
///
/// The initial value counts as unread, so the first [`Subscriber::update`]
/// reports new data.
pub fn triple_buffer<T: Clone>(initial: T) -> (Publisher<T>, Subscriber<T>) {
    let shared = Arc::new(Shared {
        slots: [
            Mutex::new(initial.clone()),
            Mutex::new(initial.clone()),
            Mutex::new(initial),
        ],
        middle: AtomicU8::new(1 | FRESH),
    });

    (
        Publisher {
            shared: shared.clone(),
            back: 2,
        },
        Subscriber { shared, front: 0 },
    )
}

impl<T> Publisher<T> {
    /// Publishes a new value. Never waits on the reader.
    pub fn publish(&mut self, value: T) {
        self.publish_with(|slot| *slot = value);
    }

    /// Fills the back slot in place and publishes it.
    ///
    /// The slot holds whatever value last cycled through it, so `fill` must
    /// overwrite everything the reader depends on.
    pub fn publish_with<F>(&mut self, fill: F)
    where
        F: FnOnce(&mut T),
    {
        fill(&mut self.shared.slots[self.back as usize].lock());
        let previous = self
            .shared
            .middle
            .swap(self.back | FRESH, Ordering::AcqRel);
        self.back = previous & INDEX_MASK;
    }
}

impl<T> Subscriber<T> {
    /// Returns true if a value was published since the last update.
    pub fn has_update(&self) -> bool {
        self.shared.middle.load(Ordering::Acquire) & FRESH != 0
    }

    /// Swaps in the most recently published value, if there is one.
    pub fn update(&mut self) -> bool {
        // Only the reader clears the fresh bit, so a set bit cannot vanish between the
        // check and the swap.
        if !self.has_update() {
            return false;
        }
        let previous = self.shared.middle.swap(self.front, Ordering::AcqRel);
        self.front = previous & INDEX_MASK;
        true
    }

    /// The value currently held by the reader.
    pub fn read(&self) -> MutexGuard<'_, T> {
        self.shared.slots[self.front as usize].lock()
    }

    /// Updates and returns the value only if something new was published.
    pub fn try_read(&mut self) -> Option<MutexGuard<'_, T>> {
        if self.update() {
            Some(self.read())
        } else {
            None
        }
    }

    /// Updates and returns the latest value, new or not.
    pub fn latest(&mut self) -> MutexGuard<'_, T> {
        self.update();
        self.read()
    }
}
