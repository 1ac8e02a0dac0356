// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Click disambiguation.
//!
//! A single click is only delivered once the double-click window has passed without a second
//! click on the same block. [`ClickTracker`] is a plain state machine over millisecond
//! timestamps; callers supply the time from a [`Clock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::model::BlockId;

pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Shared, manually advanced clock for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.set(self.now.get().saturating_add(by));
    }

    pub fn set(&self, now_ms: u64) {
        self.now.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Waiting for a possible second click. `flushed` is an earlier single click on another
    /// block that must be delivered now.
    Pending { flushed: Option<BlockId> },
    Double(BlockId),
}

#[derive(Debug, Clone)]
pub struct ClickTracker {
    window_ms: u64,
    last: Option<(BlockId, u64)>,
}

impl ClickTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
            last: None,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn click(&mut self, block_id: &BlockId, now_ms: u64) -> ClickOutcome {
        match self.last.take() {
            Some((last_id, at)) if &last_id == block_id && now_ms < at.saturating_add(self.window_ms) => {
                ClickOutcome::Double(last_id)
            }
            previous => {
                self.last = Some((block_id.clone(), now_ms));
                ClickOutcome::Pending {
                    flushed: previous.map(|(id, _)| id),
                }
            }
        }
    }

    /// Deliver the pending click once its window has elapsed.
    pub fn expire(&mut self, now_ms: u64) -> Option<BlockId> {
        match &self.last {
            Some((_, at)) if now_ms >= at.saturating_add(self.window_ms) => {
                self.last.take().map(|(id, _)| id)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) -> Option<BlockId> {
        self.last.take().map(|(id, _)| id)
    }

    /// When the pending click becomes a single click.
    pub fn deadline(&self) -> Option<u64> {
        self.last
            .as_ref()
            .map(|(_, at)| at.saturating_add(self.window_ms))
    }

    pub fn pending(&self) -> Option<&BlockId> {
        self.last.as_ref().map(|(id, _)| id)
    }
}
