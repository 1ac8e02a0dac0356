// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Minimal callback registry.
//!
//! Listeners are plain closures; [`Listeners::subscribe`] hands back a [`Subscription`] whose
//! [`Subscription::unsubscribe`] detaches the closure again. Emission works on a snapshot, so a
//! listener may subscribe or unsubscribe other listeners while being notified.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct ListenerSet<E> {
    next_id: u64,
    entries: Vec<(u64, Callback<E>)>,
}

impl<E> ListenerSet<E> {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }
}

pub struct Listeners<E> {
    inner: Rc<RefCell<ListenerSet<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListenerSet {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<E: 'static> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

impl<E: 'static> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl FnMut(&E) + 'static) -> Subscription {
        let id = {
            let mut set = self.inner.borrow_mut();
            let id = set.next_id;
            set.next_id = set.next_id.wrapping_add(1);
            let callback: Callback<E> = Rc::new(RefCell::new(callback));
            set.entries.push((id, callback));
            id
        };

        let weak: Weak<RefCell<ListenerSet<E>>> = Rc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Notify every listener; returns how many were called.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<(u64, Callback<E>)> = self.inner.borrow().entries.clone();

        let mut called = 0;
        for (id, callback) in snapshot {
            if !self.inner.borrow().contains(id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut callback) => {
                    (&mut *callback)(event);
                    called += 1;
                }
                Err(_) => tracing::warn!(listener = id, "listener re-entered during emit; skipped"),
            }
        }
        called
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().entries.clear();
    }
}

/// Handle returned by [`Listeners::subscribe`].
///
/// Dropping the handle keeps the listener attached; call [`Subscription::unsubscribe`] to
/// detach it.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
