//! Rate limiter for the "library in use" supportability metric
//!
//! The metric is emitted at most once per emission interval, no matter how
//! many requests race through the check. Callers that see a recent emission
//! return without touching the mutex; the rest serialize on it and re-check
//! before emitting.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NEVER: u64 = 0;

/// Source of wall-clock time in Unix milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Manually advanced clock, for deterministic tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Heartbeat timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Below this age the lock-free check returns immediately
    pub check_interval_seconds: u64,
    /// Minimum age of the last emission before emitting again
    pub emission_interval_seconds: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 3_600,
            emission_interval_seconds: 82_800,
        }
    }
}

/// Shared last-emission timestamp plus the lock serializing emitters
///
/// One instance is shared (via `Arc`) by every adapter that should count as
/// the same process for heartbeat purposes.
#[derive(Debug, Default)]
pub struct HeartbeatState {
    last_emission_ms: AtomicU64,
    lock: Mutex<()>,
}

impl HeartbeatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unix millis of the last successful emission, `None` if never emitted
    pub fn last_emission_millis(&self) -> Option<u64> {
        match self.last_emission_ms.load(Ordering::Acquire) {
            NEVER => None,
            millis => Some(millis),
        }
    }

    fn elapsed_millis(&self, now: u64) -> u64 {
        match self.last_emission_ms.load(Ordering::Acquire) {
            NEVER => u64::MAX,
            last => now.saturating_sub(last),
        }
    }
}

/// Double-checked gate in front of the supportability metric
#[derive(Clone)]
pub struct HeartbeatLimiter {
    state: Arc<HeartbeatState>,
    clock: Arc<dyn Clock>,
    check_interval_ms: u64,
    emission_interval_ms: u64,
}

impl HeartbeatLimiter {
    pub fn new(state: Arc<HeartbeatState>, config: HeartbeatConfig) -> Self {
        Self::with_clock(state, config, Arc::new(SystemClock))
    }

    pub fn with_clock(state: Arc<HeartbeatState>, config: HeartbeatConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state,
            clock,
            check_interval_ms: config.check_interval_seconds.saturating_mul(1000),
            emission_interval_ms: config.emission_interval_seconds.saturating_mul(1000),
        }
    }

    pub fn state(&self) -> &Arc<HeartbeatState> {
        &self.state
    }

    /// Run `emit` if the emission interval has elapsed
    ///
    /// `emit` runs while the lock is held and returns whether the metric was
    /// actually recorded; only then is the timestamp advanced. Returns `true`
    /// when this call performed the emission.
    pub fn check_and_emit<F>(&self, emit: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if self.state.elapsed_millis(self.clock.now_millis()) < self.check_interval_ms {
            return false;
        }

        let _guard = self.state.lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have emitted while we waited for the lock.
        let now = self.clock.now_millis();
        if self.state.elapsed_millis(now) < self.emission_interval_ms {
            return false;
        }

        if emit() {
            self.state.last_emission_ms.store(now.max(1), Ordering::Release);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    const START: u64 = 1_700_000_000_000;

    fn limiter(clock: Arc<ManualClock>) -> HeartbeatLimiter {
        HeartbeatLimiter::with_clock(Arc::new(HeartbeatState::new()), HeartbeatConfig::default(), clock)
    }

    #[test]
    fn test_first_call_emits() {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(clock);

        assert!(limiter.state().last_emission_millis().is_none());
        assert!(limiter.check_and_emit(|| true));
        assert_eq!(limiter.state().last_emission_millis(), Some(START));
    }

    #[test]
    fn test_fast_path_skips_within_check_interval() {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(clock.clone());
        assert!(limiter.check_and_emit(|| true));

        clock.advance(Duration::from_secs(60));
        let mut called = false;
        assert!(!limiter.check_and_emit(|| {
            called = true;
            true
        }));
        assert!(!called);
    }

    #[test]
    fn test_slow_path_rechecks_full_interval() {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(clock.clone());
        assert!(limiter.check_and_emit(|| true));

        // Past the check interval but well short of the emission interval.
        clock.advance(Duration::from_secs(2 * 3_600));
        assert!(!limiter.check_and_emit(|| panic!("must not emit")));
    }

    #[test]
    fn test_one_emission_per_interval_crossed() {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(clock.clone());
        let emissions = AtomicUsize::new(0);
        let emit = || {
            emissions.fetch_add(1, Ordering::SeqCst);
            true
        };

        for _ in 0..3 {
            for _ in 0..5 {
                limiter.check_and_emit(emit);
                clock.advance(Duration::from_secs(600));
            }
            clock.advance(Duration::from_secs(82_800));
        }

        assert_eq!(emissions.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failed_emission_does_not_advance_timestamp() {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(clock);

        assert!(!limiter.check_and_emit(|| false));
        assert!(limiter.state().last_emission_millis().is_none());
        assert!(limiter.check_and_emit(|| true));
    }

    #[test]
    fn test_concurrent_callers_emit_once() {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = Arc::new(limiter(clock));
        let emissions = Arc::new(AtomicUsize::new(0));
        let threads = 32;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let limiter = limiter.clone();
                let emissions = emissions.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    limiter.check_and_emit(|| {
                        emissions.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        true
                    })
                })
            })
            .collect();

        let emitted: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(emissions.load(Ordering::SeqCst), 1);
        assert_eq!(emitted, 1);
    }

    #[test]
    fn test_state_is_isolated_per_instance() {
        let clock = Arc::new(ManualClock::new(START));
        let a = limiter(clock.clone());
        let b = limiter(clock);

        assert!(a.check_and_emit(|| true));
        assert!(b.check_and_emit(|| true));
    }

    #[test]
    fn test_shared_state_across_limiters() {
        let clock = Arc::new(ManualClock::new(START));
        let state = Arc::new(HeartbeatState::new());
        let a = HeartbeatLimiter::with_clock(state.clone(), HeartbeatConfig::default(), clock.clone());
        let b = HeartbeatLimiter::with_clock(state, HeartbeatConfig::default(), clock);

        assert!(a.check_and_emit(|| true));
        assert!(!b.check_and_emit(|| true));
    }
}
