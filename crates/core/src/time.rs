use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in the engine and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Whole seconds left until `deadline`, rounded up.
///
/// Always derived from the absolute deadline so a delayed or skipped
/// sample can never drift the countdown. Zero or negative means expired.
#[must_use]
pub fn remaining_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds();
    millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) != 0)
}

/// Milliseconds since the Unix epoch, the persisted form of timestamps.
#[must_use]
pub fn to_epoch_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Inverse of [`to_epoch_millis`]. Returns `None` for out-of-range values.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_rounds_partial_seconds_up() {
        let now = fixed_now();
        assert_eq!(remaining_seconds(now + Duration::milliseconds(1), now), 1);
        assert_eq!(remaining_seconds(now + Duration::milliseconds(1000), now), 1);
        assert_eq!(remaining_seconds(now + Duration::milliseconds(1001), now), 2);
        assert_eq!(remaining_seconds(now, now), 0);
    }

    #[test]
    fn remaining_is_non_positive_after_deadline() {
        let now = fixed_now();
        assert_eq!(remaining_seconds(now - Duration::milliseconds(1000), now), -1);
        assert_eq!(remaining_seconds(now - Duration::milliseconds(500), now), 0);
    }

    #[test]
    fn remaining_never_increases_as_time_passes() {
        let deadline = fixed_now() + Duration::minutes(20);
        let mut clock = fixed_clock();
        let mut previous = remaining_seconds(deadline, clock.now());
        for step in [1, 250, 999, 1000, 7_777, 60_000, 1_200_000] {
            clock.advance(Duration::milliseconds(step));
            let current = remaining_seconds(deadline, clock.now());
            assert!(current <= previous);
            previous = current;
        }
        assert!(previous <= 0);
    }

    #[test]
    fn epoch_millis_round_trip() {
        let now = fixed_now();
        assert_eq!(from_epoch_millis(to_epoch_millis(now)), Some(now));
    }

    #[test]
    fn advance_is_ignored_on_default_clock() {
        let mut clock = Clock::default_clock();
        clock.advance(Duration::days(1));
        assert!(matches!(clock, Clock::Default));
    }
}
