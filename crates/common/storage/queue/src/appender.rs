// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Appender handles and who keeps them alive.
//!
//! Each thread gets one [`Appender`] per queue. Whether the queue itself
//! keeps that appender alive is decided by [`AppenderOwnership`]:
//!
//! - `Owned`: the queue holds a strong reference. The appender lives until
//!   the queue is closed, and every `acquire` on the same thread returns the
//!   same appender.
//! - `Borrowed`: the queue only remembers a weak reference. The appender
//!   lives as long as the caller holds it; once dropped, the next `acquire`
//!   creates a fresh one.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, ThreadId},
};

use tracing::debug;

/// Retention policy the queue applies to the appenders it hands out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AppenderOwnership {
    /// The queue holds a strong reference; appender lifetime is tied to the
    /// queue.
    Owned,
    /// The queue holds a weak reference; appender lifetime is tied to the
    /// caller.
    #[default]
    Borrowed,
}

impl AppenderOwnership {
    /// Maps the `strong_appenders` flag onto an ownership policy.
    #[must_use]
    pub const fn from_strong(strong_appenders: bool) -> Self {
        if strong_appenders { Self::Owned } else { Self::Borrowed }
    }

    #[must_use]
    pub const fn is_strong(self) -> bool { matches!(self, Self::Owned) }
}

/// Writer handle into the queue, bound to the thread that acquired it.
#[derive(Debug)]
pub struct Appender {
    id:     u64,
    thread: ThreadId,
}

impl Appender {
    /// Identifier unique within the owning queue.
    #[must_use]
    pub const fn id(&self) -> u64 { self.id }

    /// Thread this appender was created for.
    #[must_use]
    pub const fn thread(&self) -> ThreadId { self.thread }
}

#[derive(Debug)]
enum Slot {
    Owned(Arc<Appender>),
    Borrowed(Weak<Appender>),
}

impl Slot {
    fn upgrade(&self) -> Option<Arc<Appender>> {
        match self {
            Self::Owned(appender) => Some(appender.clone()),
            Self::Borrowed(appender) => appender.upgrade(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::Owned(_) => true,
            Self::Borrowed(appender) => appender.strong_count() > 0,
        }
    }
}

/// Per-thread appender slots of one queue.
#[derive(Debug)]
pub(crate) struct AppenderRegistry {
    ownership: AppenderOwnership,
    next_id:   AtomicU64,
    slots:     Mutex<HashMap<ThreadId, Slot>>,
}

impl AppenderRegistry {
    pub(crate) fn new(ownership: AppenderOwnership) -> Self {
        Self {
            ownership,
            next_id: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current thread's appender, creating it if there is none
    /// alive.
    pub(crate) fn acquire(&self) -> Arc<Appender> {
        let thread = thread::current().id();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(appender) = slots.get(&thread).and_then(Slot::upgrade) {
            return appender;
        }

        let appender = Arc::new(Appender {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            thread,
        });
        // Borrowed slots of exited threads are never reacquired.
        slots.retain(|_, slot| slot.is_alive());

        let slot = match self.ownership {
            AppenderOwnership::Owned => Slot::Owned(appender.clone()),
            AppenderOwnership::Borrowed => Slot::Borrowed(Arc::downgrade(&appender)),
        };
        slots.insert(thread, slot);

        debug!(id = appender.id, ownership = %self.ownership, "Appender created");
        appender
    }

    /// Number of appenders that are still alive.
    pub(crate) fn live(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.is_alive())
            .count()
    }

    /// Drops every slot, releasing appenders the queue owns.
    pub(crate) fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_strong() {
        assert_eq!(AppenderOwnership::from_strong(true), AppenderOwnership::Owned);
        assert_eq!(AppenderOwnership::from_strong(false), AppenderOwnership::Borrowed);
        assert_eq!(AppenderOwnership::default(), AppenderOwnership::Borrowed);
    }

    #[test]
    fn test_owned_appender_outlives_caller() {
        let registry = AppenderRegistry::new(AppenderOwnership::Owned);

        let appender = registry.acquire();
        assert_eq!(Arc::strong_count(&appender), 2);
        let id = appender.id();
        drop(appender);

        assert_eq!(registry.live(), 1);
        assert_eq!(registry.acquire().id(), id);

        registry.clear();
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_borrowed_appender_dies_with_caller() {
        let registry = AppenderRegistry::new(AppenderOwnership::Borrowed);

        let appender = registry.acquire();
        assert_eq!(Arc::strong_count(&appender), 1);
        let weak = Arc::downgrade(&appender);
        let id = appender.id();

        assert_eq!(registry.acquire().id(), id, "same thread reuses a live appender");

        drop(appender);
        assert!(weak.upgrade().is_none());
        assert_eq!(registry.live(), 0);
        assert_ne!(registry.acquire().id(), id);
    }

    #[test]
    fn test_dead_borrowed_slots_are_pruned() {
        let registry = Arc::new(AppenderRegistry::new(AppenderOwnership::Borrowed));

        for _ in 0..100 {
            let registry = registry.clone();
            thread::spawn(move || drop(registry.acquire())).join().unwrap();
        }
        assert_eq!(registry.live(), 0);

        let appender = registry.acquire();
        let slots = registry.slots.lock().unwrap();
        assert_eq!(slots.len(), 1);
        assert!(slots.contains_key(&appender.thread()));
    }

    #[test]
    fn test_appenders_are_per_thread() {
        let registry = Arc::new(AppenderRegistry::new(AppenderOwnership::Owned));
        let main = registry.acquire();

        let other = {
            let registry = registry.clone();
            thread::spawn(move || registry.acquire().id()).join().unwrap()
        };

        assert_ne!(main.id(), other);
        assert_eq!(main.thread(), thread::current().id());
        assert_eq!(registry.live(), 2);
    }
}
