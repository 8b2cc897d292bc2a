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
use std::{
    hint,
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::{Mutex, MutexGuard};

/// A bounded single-producer/single-consumer queue.
///
/// Bookkeeping is guarded by a spinlock that is only ever held for a slot
/// assignment and two index updates. Neither side ever sleeps: a full queue
/// rejects the push, an empty queue returns nothing.
pub struct RingBuffer<T> {
    state: Mutex<RingState<T>>,
    len: AtomicUsize,
    capacity: usize,
}

struct RingState<T> {
    slots: Box<[Option<T>]>,
    read: usize,
    write: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a ring with at least `capacity` slots, rounded up to a power of two.
    pub fn new(capacity: usize) -> RingBuffer<T> {
        let capacity = capacity.max(1).next_power_of_two();
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();
        RingBuffer {
            state: Mutex::new(RingState {
                slots: slots.into_boxed_slice(),
                read: 0,
                write: 0,
            }),
            len: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Pushes an item, handing it back if the ring is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }

        let mask = self.capacity - 1;
        let mut state = self.spin_lock();
        if state.write.wrapping_sub(state.read) == self.capacity {
            return Err(item);
        }
        let write = state.write;
        state.slots[write & mask] = Some(item);
        state.write = write.wrapping_add(1);
        self.len.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Pops the oldest item, if any.
    pub fn try_pop(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let mask = self.capacity - 1;
        let mut state = self.spin_lock();
        if state.write == state.read {
            return None;
        }
        let read = state.read;
        let item = state.slots[read & mask].take();
        state.read = read.wrapping_add(1);
        self.len.fetch_sub(1, Ordering::Release);
        item
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn spin_lock(&self) -> MutexGuard<'_, RingState<T>> {
        loop {
            if let Some(guard) = self.state.try_lock() {
                return guard;
            }
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use super::RingBuffer;

    #[test]
    fn capacity_rounds_up() {
        assert_eq!(RingBuffer::<u32>::new(0).capacity(), 1);
        assert_eq!(RingBuffer::<u32>::new(5).capacity(), 8);
        assert_eq!(RingBuffer::<u32>::new(16).capacity(), 16);
    }

    #[test]
    fn full_and_empty_report_failure() {
        let ring = RingBuffer::new(4);
        assert!(ring.try_pop().is_none());

        for i in 0..4 {
            assert!(ring.try_push(i).is_ok());
        }
        assert!(ring.is_full());
        assert_eq!(ring.try_push(99), Err(99));

        for i in 0..4 {
            assert_eq!(ring.try_pop(), Some(i));
        }
        assert!(ring.is_empty());
        assert!(ring.try_pop().is_none());
    }

    #[test]
    fn wraps_around() {
        let ring = RingBuffer::new(2);
        for i in 0..100 {
            ring.try_push(i).unwrap();
            assert_eq!(ring.try_pop(), Some(i));
        }
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn spsc_stress_preserves_order() {
        const COUNT: u64 = 200_000;
        let ring = Arc::new(RingBuffer::new(8));

        let producer = {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut rejected = 0u64;
                let mut next = 0u64;
                while next < COUNT {
                    match ring.try_push(next) {
                        Ok(()) => next += 1,
                        Err(item) => {
                            assert_eq!(item, next);
                            rejected += 1;
                            thread::yield_now();
                        }
                    }
                }
                rejected
            })
        };

        let consumer = {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut empty = 0u64;
                let mut expected = 0u64;
                while expected < COUNT {
                    match ring.try_pop() {
                        Some(item) => {
                            assert_eq!(item, expected);
                            expected += 1;
                        }
                        None => {
                            empty += 1;
                            thread::yield_now();
                        }
                    }
                }
                empty
            })
        };

        producer.join().unwrap();
        consumer.join().unwrap();
        assert!(ring.is_empty());
    }
}
