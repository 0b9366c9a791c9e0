use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Per-mirror monotonic "last observed change" wall clock, in milliseconds
/// since UTC Epoch.
///
/// Every observed mutation of the owning mirror [`touch`]es the clock.
/// Delta queries compare the clock against a caller-provided `since` value to
/// short-circuit responses that would carry no novelty.
///
/// [`touch`]: FreshnessClock::touch
#[derive(Debug, Default)]
pub struct FreshnessClock(AtomicI64);

impl FreshnessClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock to `now`.
    ///
    /// `fetch_max` keeps the clock monotonic non-decreasing even if the host
    /// wall clock steps backwards.
    pub fn touch(&self) {
        self.0.fetch_max(Utc::now().timestamp_millis(), Ordering::AcqRel);
    }

    /// Milliseconds since UTC Epoch of the last observed change.
    ///
    /// `0` until the first change (or initial sync event) is observed.
    pub fn last_update_millis(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::FreshnessClock;

    #[test]
    fn starts_at_zero_and_advances_on_touch() {
        let clock = FreshnessClock::new();
        assert_eq!(clock.last_update_millis(), 0);

        let before = Utc::now().timestamp_millis();
        clock.touch();
        let after = Utc::now().timestamp_millis();

        let t = clock.last_update_millis();
        assert!(before <= t && t <= after);
    }

    #[test]
    fn never_goes_backwards() {
        let clock = FreshnessClock::new();

        clock.touch();
        let t1 = clock.last_update_millis();
        clock.touch();
        let t2 = clock.last_update_millis();

        assert!(t2 >= t1);
    }
}
