use chrono::DateTime;
use chrono::Utc;

/// Source of the current time for session expiry and record timestamps.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
