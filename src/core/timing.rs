// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Timing Event System
//!
//! IOP-cycle based event scheduling for the serial subsystem. The SIO0
//! transfer interrupt does not fire on the TX write itself: real hardware
//! shifts the byte out at the configured baud rate first, so the write
//! schedules an event and the interrupt is raised once the owning VM has
//! advanced time past it.
//!
//! # Example
//!
//! ```
//! use ps2rx::core::timing::TimingEventManager;
//!
//! let mut timing = TimingEventManager::new();
//! let event_id = timing.register_event("SIO0 IRQ");
//!
//! timing.schedule(event_id, 147);
//! timing.add_pending_ticks(147);
//! assert_eq!(timing.run_events(), vec![event_id]);
//! ```

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Tick count type (signed for relative deltas)
pub type TickCount = i32;

/// Global tick counter type
pub type GlobalTicks = u64;

/// Event handle (index into the event table)
pub type EventHandle = usize;

/// Timing event
///
/// A single one-shot event that executes at a specific time.
#[derive(Debug, Clone)]
pub struct TimingEvent {
    /// Event ID (handle)
    pub id: EventHandle,

    /// Event name (for debugging)
    pub name: &'static str,

    /// Next execution time (global ticks)
    pub next_run_time: GlobalTicks,

    /// Whether this event is currently scheduled
    pub active: bool,
}

impl TimingEvent {
    /// Create a new, inactive timing event
    pub fn new(id: EventHandle, name: &'static str) -> Self {
        Self {
            id,
            name,
            next_run_time: 0,
            active: false,
        }
    }
}

/// Snapshot of a scheduled event, relative to the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PendingEvent {
    pub handle: EventHandle,
    pub remaining: GlobalTicks,
}

/// Timing Event Manager
///
/// - Global tick counter tracks absolute time
/// - Pending ticks accumulate IOP cycles between event checks
#[derive(Debug, Clone)]
pub struct TimingEventManager {
    /// Global tick counter (absolute time since reset)
    pub global_tick_counter: GlobalTicks,

    /// Pending ticks (accumulated since last event run)
    pub pending_ticks: TickCount,

    /// Registered events, indexed by handle
    events: Vec<TimingEvent>,
}

impl TimingEventManager {
    /// Create a new timing event manager with no events
    pub fn new() -> Self {
        Self {
            global_tick_counter: 0,
            pending_ticks: 0,
            events: Vec::new(),
        }
    }

    /// Register a new timing event
    ///
    /// The event is initially inactive and must be scheduled with
    /// `schedule()` to run.
    pub fn register_event(&mut self, name: &'static str) -> EventHandle {
        let handle = self.events.len();
        self.events.push(TimingEvent::new(handle, name));
        handle
    }

    /// Schedule an event to run after `ticks` IOP cycles from now
    ///
    /// Rescheduling an already active event moves it.
    pub fn schedule(&mut self, handle: EventHandle, ticks: TickCount) {
        let current_time = self.current_time();

        let event = &mut self.events[handle];
        event.next_run_time = current_time + ticks.max(0) as GlobalTicks;
        event.active = true;
    }

    /// Deactivate an event
    pub fn deactivate(&mut self, handle: EventHandle) {
        self.events[handle].active = false;
    }

    /// Whether the event is currently scheduled
    pub fn is_active(&self, handle: EventHandle) -> bool {
        self.events[handle].active
    }

    /// Accumulate executed IOP cycles
    ///
    /// Time never runs backwards: negative counts are ignored.
    pub fn add_pending_ticks(&mut self, ticks: TickCount) {
        self.pending_ticks = self.pending_ticks.saturating_add(ticks.max(0));
    }

    /// Current time (global_tick_counter + pending_ticks)
    #[inline]
    fn current_time(&self) -> GlobalTicks {
        self.global_tick_counter + self.pending_ticks as GlobalTicks
    }

    /// Run pending timing events
    ///
    /// Advances global time by pending_ticks and deactivates every event
    /// whose execution time has been reached, returning their handles in
    /// execution order.
    pub fn run_events(&mut self) -> Vec<EventHandle> {
        self.global_tick_counter = self.current_time();
        self.pending_ticks = 0;

        let now = self.global_tick_counter;
        let mut triggered: Vec<&mut TimingEvent> = self
            .events
            .iter_mut()
            .filter(|e| e.active && e.next_run_time <= now)
            .collect();
        triggered.sort_by_key(|e| e.next_run_time);

        triggered
            .into_iter()
            .map(|event| {
                log::trace!(
                    "Timing: Event '{}' executed (late: {} ticks)",
                    event.name,
                    now - event.next_run_time
                );
                event.active = false;
                event.id
            })
            .collect()
    }

    /// Capture every active event relative to the current time
    pub fn pending_events(&self) -> Vec<PendingEvent> {
        let now = self.current_time();
        self.events
            .iter()
            .filter(|e| e.active)
            .map(|e| PendingEvent {
                handle: e.id,
                remaining: e.next_run_time.saturating_sub(now),
            })
            .collect()
    }

    /// Restore events captured by `pending_events()`
    ///
    /// Events not present in `pending` end up inactive.
    pub fn restore_pending(&mut self, pending: &[PendingEvent]) {
        for event in &mut self.events {
            event.active = false;
        }
        let now = self.current_time();
        for p in pending {
            if let Some(event) = self.events.get_mut(p.handle) {
                event.next_run_time = now + p.remaining;
                event.active = true;
            }
        }
    }

    /// Reset the timing system
    ///
    /// Clears time and deactivates all events; registrations are kept.
    pub fn reset(&mut self) {
        self.global_tick_counter = 0;
        self.pending_ticks = 0;

        for event in &mut self.events {
            event.active = false;
            event.next_run_time = 0;
        }
    }
}

impl Default for TimingEventManager {
    fn default() -> Self {
        Self::new()
    }
}
