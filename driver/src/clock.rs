use std::sync::{Arc, RwLock};

use kernel::interface::clock::Clock;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<RwLock<OffsetDateTime>>);

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self(Arc::new(RwLock::new(start)))
    }

    pub fn set(&self, time: OffsetDateTime) {
        let mut current = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod test {
    use kernel::interface::clock::Clock;
    use time::{Duration, OffsetDateTime};

    use crate::clock::ManualClock;

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let other = clock.clone();
        clock.advance(Duration::days(7));
        assert_eq!(other.now(), OffsetDateTime::UNIX_EPOCH + Duration::days(7));
        other.set(OffsetDateTime::UNIX_EPOCH);
        assert_eq!(clock.now(), OffsetDateTime::UNIX_EPOCH);
    }
}
