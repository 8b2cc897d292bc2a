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
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A counting semaphore. Signalling never blocks.
#[derive(Default)]
pub struct Semaphore {
    count: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore {
    pub fn new() -> Semaphore {
        Semaphore::default()
    }

    pub fn signal(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.condvar.notify_one();
    }

    /// Waits up to `timeout` for a permit and consumes it. Returns whether a
    /// permit was taken.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            let _ = self
                .condvar
                .wait_while_for(&mut count, |count| *count == 0, timeout);
        }
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }
}
