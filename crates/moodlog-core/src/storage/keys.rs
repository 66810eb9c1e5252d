//! Primary key generation
//!
//! Keys read as creation timestamps (epoch milliseconds) but are strictly
//! increasing: two entries created within the same millisecond still get
//! distinct keys.

use chrono::Utc;

/// Issues strictly increasing keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyGenerator {
    last: i64,
}

impl KeyGenerator {
    /// Start after `last`, usually the largest key already stored
    pub fn seeded(last: i64) -> Self {
        Self { last }
    }

    /// Next key based on the wall clock
    pub fn next_key(&mut self) -> i64 {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Next key given the current time in milliseconds
    pub fn next_at(&mut self, now_millis: i64) -> i64 {
        let key = now_millis.max(self.last.saturating_add(1));
        self.last = key;
        key
    }

    /// Note a key that was used elsewhere so it is never issued again
    pub fn observe(&mut self, key: i64) {
        self.last = self.last.max(key);
    }

    /// The most recently issued or observed key
    pub fn last(&self) -> i64 {
        self.last
    }
}
