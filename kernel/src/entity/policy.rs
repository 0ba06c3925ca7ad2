use time::{Duration, OffsetDateTime};

/// Rolling borrow cap: at most `max_loans` loans whose `borrowed_at` falls
/// inside the trailing `window`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LendingPolicy {
    window: Duration,
    max_loans: i64,
}

impl LendingPolicy {
    pub const DEFAULT_WINDOW_DAYS: i64 = 7;
    pub const DEFAULT_MAX_LOANS: i64 = 5;

    pub fn new(window: Duration, max_loans: i64) -> Self {
        Self { window, max_loans }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_loans(&self) -> i64 {
        self.max_loans
    }

    /// Start of the window. A loan borrowed exactly at this instant still counts.
    pub fn window_start(&self, now: OffsetDateTime) -> OffsetDateTime {
        now - self.window
    }

    pub fn is_exceeded(&self, recent_loans: i64) -> bool {
        recent_loans >= self.max_loans
    }
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self::new(
            Duration::days(Self::DEFAULT_WINDOW_DAYS),
            Self::DEFAULT_MAX_LOANS,
        )
    }
}

#[cfg(test)]
mod test {
    use time::{Duration, OffsetDateTime};

    use crate::entity::LendingPolicy;

    #[test]
    fn default_window() {
        let policy = LendingPolicy::default();
        let now = OffsetDateTime::UNIX_EPOCH + Duration::days(30);
        assert_eq!(
            policy.window_start(now),
            OffsetDateTime::UNIX_EPOCH + Duration::days(23)
        );
        assert!(!policy.is_exceeded(4));
        assert!(policy.is_exceeded(5));
    }

    #[test]
    fn custom() {
        let policy = LendingPolicy::new(Duration::days(1), 2);
        assert_eq!(policy.window(), Duration::days(1));
        assert!(policy.is_exceeded(2));
    }
}
