use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

use crate::{measurement::Measurement, sensor::SensorKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestState {
    pub pm25: f64,
    pub temperature: f64,
    /// Time of whichever sensor was applied last, not the newer of the two.
    pub last_update_time: Option<NaiveDateTime>,
}

#[derive(Debug, Default)]
pub struct ReadingCache {
    state: Mutex<LatestState>,
}

impl ReadingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, m: &Measurement) {
        let mut state = self.lock();
        match m.kind {
            SensorKind::ParticulateMatter => state.pm25 = m.value,
            SensorKind::Temperature => state.temperature = m.value,
        }
        state.last_update_time = Some(m.observed_at);
    }

    pub fn snapshot(&self) -> LatestState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, LatestState> {
        // Every write leaves the state whole, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use crate::time;

    use super::*;

    fn measurement(kind: SensorKind, value: f64, at: &str) -> Measurement {
        Measurement {
            kind,
            value,
            observed_at: time::parse(at).unwrap(),
        }
    }

    #[test]
    fn test_defaults() {
        let cache = ReadingCache::new();
        assert_eq!(
            cache.snapshot(),
            LatestState {
                pm25: 0.0,
                temperature: 0.0,
                last_update_time: None,
            }
        );
    }

    #[test]
    fn test_apply_overwrites_own_field() {
        let cache = ReadingCache::new();
        cache.apply(&measurement(
            SensorKind::ParticulateMatter,
            10.0,
            "2025-06-01 07:00:00",
        ));
        cache.apply(&measurement(
            SensorKind::ParticulateMatter,
            15.0,
            "2025-06-01 07:05:00",
        ));

        let state = cache.snapshot();
        assert_eq!(state.pm25, 15.0);
        assert_eq!(state.temperature, 0.0);
        assert_eq!(
            state.last_update_time,
            Some(time::parse("2025-06-01 07:05:00").unwrap())
        );
    }

    #[test]
    fn test_last_writer_wins_for_update_time() {
        let cache = ReadingCache::new();
        cache.apply(&measurement(
            SensorKind::ParticulateMatter,
            3.0,
            "2025-06-01 09:00:00",
        ));
        cache.apply(&measurement(
            SensorKind::Temperature,
            28.5,
            "2025-06-01 08:00:00",
        ));

        let state = cache.snapshot();
        assert_eq!(state.pm25, 3.0);
        assert_eq!(state.temperature, 28.5);
        assert_eq!(
            state.last_update_time,
            Some(time::parse("2025-06-01 08:00:00").unwrap())
        );
    }
}
