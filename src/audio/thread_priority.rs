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

use std::env;

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{debug, warn};

const PRIORITY_VAR: &str = "FOOTFALL_THREAD_PRIORITY";
const DISABLE_RT_VAR: &str = "FOOTFALL_DISABLE_RT_AUDIO";

/// Used when FOOTFALL_THREAD_PRIORITY is unset or out of range.
const DEFAULT_PRIORITY: u8 = 70;

/// Scheduling wanted for the render and output threads.
///
/// Built from the environment before a thread starts its loop; [`apply`] is
/// then cheap to call on every iteration or callback since it only acts once.
///
/// [`apply`]: AudioThreadPriority::apply
#[derive(Debug, Clone, Copy)]
pub struct AudioThreadPriority {
    value: Option<ThreadPriorityValue>,
    realtime: bool,
    applied: bool,
}

impl AudioThreadPriority {
    /// Reads FOOTFALL_THREAD_PRIORITY (0-99) and FOOTFALL_DISABLE_RT_AUDIO.
    pub fn from_env() -> AudioThreadPriority {
        let level = parse_priority(env::var(PRIORITY_VAR).ok().as_deref());
        let realtime = !env::var(DISABLE_RT_VAR).is_ok_and(|v| is_truthy(&v));
        AudioThreadPriority::new(level, realtime)
    }

    pub fn new(level: u8, realtime: bool) -> AudioThreadPriority {
        AudioThreadPriority {
            value: ThreadPriorityValue::try_from(level).ok(),
            realtime,
            applied: false,
        }
    }

    pub fn realtime(&self) -> bool {
        self.realtime
    }

    /// Raises the calling thread's priority the first time it is called.
    /// Failures are logged and not retried.
    pub fn apply(&mut self, thread: &str) {
        if self.applied {
            return;
        }
        self.applied = true;
        let Some(value) = self.value else {
            return;
        };

        let priority = ThreadPriority::Crossplatform(value);
        if let Err(e) = set_current_thread_priority(priority) {
            warn!(thread, error = ?e, "Could not raise thread priority.");
        }
        if self.realtime {
            set_fifo(thread, priority);
        }
    }
}

#[cfg(unix)]
fn set_fifo(thread: &str, priority: ThreadPriority) {
    use thread_priority::unix::{
        set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
        ThreadSchedulePolicy,
    };

    let policy = ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo);
    match set_thread_priority_and_policy(thread_native_id(), priority, policy) {
        Ok(()) => debug!(thread, "Running with SCHED_FIFO."),
        Err(e) => warn!(thread, error = %e, "Could not switch to SCHED_FIFO."),
    }
}

#[cfg(not(unix))]
fn set_fifo(_thread: &str, _priority: ThreadPriority) {}

fn parse_priority(value: Option<&str>) -> u8 {
    value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|level| *level < 100)
        .unwrap_or(DEFAULT_PRIORITY)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod test {
    use super::{is_truthy, parse_priority, AudioThreadPriority, DEFAULT_PRIORITY};

    #[test]
    fn priority_falls_back_to_default() {
        assert_eq!(parse_priority(None), DEFAULT_PRIORITY);
        assert_eq!(parse_priority(Some("85")), 85);
        assert_eq!(parse_priority(Some(" 0 ")), 0);
        assert_eq!(parse_priority(Some("100")), DEFAULT_PRIORITY);
        assert_eq!(parse_priority(Some("high")), DEFAULT_PRIORITY);
    }

    #[test]
    fn truthy_values() {
        for value in ["1", "true", "YES", "On"] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["0", "false", "", "nope"] {
            assert!(!is_truthy(value), "{value}");
        }
    }

    #[test]
    fn applies_once() {
        let mut priority = AudioThreadPriority::new(DEFAULT_PRIORITY, false);
        assert!(!priority.realtime());
        priority.apply("test");
        assert!(priority.applied);
        priority.apply("test");
        assert!(priority.applied);
    }
}
