/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Source of wall-clock time for deadline checks.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Millis;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        timestamp_now()
    }
}

/// Current Unix time in milliseconds.
pub fn timestamp_now() -> Millis {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as Millis
}
