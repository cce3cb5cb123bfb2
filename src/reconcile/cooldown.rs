//! Per-order retry cooldown
//!
//! Hint only: losing the map delays nothing but a skip, it never corrupts
//! order state.

use super::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct CooldownTracker {
    until: Mutex<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl CooldownTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            until: Mutex::new(HashMap::new()),
            clock,
        }
    }

    // Critical sections never span an await, a poisoned map is still usable
    fn entries(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.until.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True while `order_number` is cooling down. Expired entries are
    /// dropped on lookup.
    pub fn should_skip(&self, order_number: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(order_number) {
            Some(until) if *until > now => true,
            Some(_) => {
                entries.remove(order_number);
                false
            }
            None => false,
        }
    }

    /// Skip `order_number` until `until`; an existing later deadline wins.
    pub fn mark_cooldown(&self, order_number: &str, until: DateTime<Utc>) {
        let now = self.clock.now();
        let mut entries = self.entries();
        entries.retain(|_, deadline| *deadline > now);

        let deadline = entries.entry(order_number.to_string()).or_insert(until);
        if until > *deadline {
            *deadline = until;
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
