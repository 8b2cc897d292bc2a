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
use rand::Rng;

/// The largest pool a [`RepeatGuard`] can cover.
pub const MAX_POOL_SIZE: usize = 32;

/// Anti-repeat selection over a pool of at most 32 candidates.
///
/// Every index is handed out once before any index is handed out again.
#[derive(Debug, Clone)]
pub struct RepeatGuard {
    mask: u32,
    full: u32,
    pool_size: usize,
}

impl RepeatGuard {
    /// Creates a guard for `pool_size` candidates. Returns None if the pool is
    /// empty or wider than [`MAX_POOL_SIZE`].
    pub fn new(pool_size: usize) -> Option<RepeatGuard> {
        if pool_size == 0 || pool_size > MAX_POOL_SIZE {
            return None;
        }
        Some(RepeatGuard {
            mask: 0,
            full: ((1u64 << pool_size) - 1) as u32,
            pool_size,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of candidates not yet returned in the current cycle.
    pub fn remaining(&self) -> usize {
        self.pool_size - self.mask.count_ones() as usize
    }

    pub fn reset(&mut self) {
        self.mask = 0;
    }

    /// Accepts `candidate` or the next unused index after it, wrapping around
    /// the pool. Starts a new cycle first if every index has been used.
    pub fn check(&mut self, candidate: usize) -> usize {
        if self.mask == self.full {
            self.mask = 0;
        }

        let mut index = candidate % self.pool_size;
        while self.mask & (1 << index) != 0 {
            index = (index + 1) % self.pool_size;
        }
        self.mask |= 1 << index;
        index
    }

    /// Draws a uniform candidate from `rng` and passes it through [`RepeatGuard::check`].
    pub fn pick<R: Rng>(&mut self, rng: &mut R) -> usize {
        let candidate = rng.gen_range(0..self.pool_size);
        self.check(candidate)
    }
}
