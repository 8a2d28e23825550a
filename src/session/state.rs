use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use tracing::debug;

use super::key_manager::MasterKey;

/// Cache of the master key between prompts.
///
/// Owned by exactly one [`SessionManager`](super::SessionManager). Never
/// persisted.
#[derive(Debug)]
pub struct Session {
    last_activity: DateTime<Utc>,
    timeout: Duration,
    cached_key: Option<MasterKey>,
    is_active: bool,
}

impl Session {
    pub fn inactive(timeout_minutes: u32) -> Self {
        Self {
            last_activity: DateTime::<Utc>::MIN_UTC,
            timeout: Duration::minutes(i64::from(timeout_minutes)),
            cached_key: None,
            is_active: false,
        }
    }

    /// Caches `key` unless the timeout is zero, in which case the key is
    /// used once and dropped by the caller.
    pub fn activate(&mut self, key: MasterKey, now: DateTime<Utc>) {
        if self.timeout.is_zero() {
            return;
        }
        self.cached_key = Some(key);
        self.is_active = true;
        self.last_activity = now;
        debug!("session opened");
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.timeout.is_zero() && now - self.last_activity < self.timeout
    }

    /// Slides the expiry window forward.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            self.last_activity = now;
        }
    }

    /// The cached key if the session is still valid. An expired session is
    /// cleared on the way.
    pub fn key(&mut self, now: DateTime<Utc>) -> Option<&MasterKey> {
        if !self.is_valid(now) {
            if self.is_active {
                debug!("session expired");
            }
            self.clear();
            return None;
        }
        self.cached_key.as_ref()
    }

    /// Drops the cached key, which zeroes it. Idempotent.
    pub fn clear(&mut self) {
        self.cached_key = None;
        self.is_active = false;
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout_minutes: u32) {
        self.timeout = Duration::minutes(i64::from(timeout_minutes));
        if self.timeout.is_zero() {
            self.clear();
        }
    }
}
