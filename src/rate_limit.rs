use std::time::{Duration, Instant};

use dashmap::DashMap;

const MAX_FAILURES: u32 = 5;
const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Per-email login brute force limiter.
#[derive(Default)]
pub struct LoginRateLimiter {
    /// normalized email -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a login attempt is allowed: 5 failures per 15 minutes.
    /// Returns the seconds to wait when blocked. Does not count the attempt;
    /// call `record_failure()` when the credentials turn out to be invalid.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&key(email)) else {
            return Ok(());
        };
        let (count, start) = *entry.value();

        if now.duration_since(start) > WINDOW {
            return Ok(());
        }

        if count >= MAX_FAILURES {
            let elapsed = now.duration_since(start).as_secs();
            return Err(WINDOW.as_secs().saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, email: &str) {
        let now = Instant::now();

        let mut entry = self.entries.entry(key(email)).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > WINDOW {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    pub fn reset(&self, email: &str) {
        self.entries.remove(&key(email));
    }

    /// Drop windows older than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(email: &str) -> String {
    email.trim().to_lowercase()
}
