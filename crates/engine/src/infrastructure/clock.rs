//! Clock and dice-random ports, with fixed test doubles (SPEC_FULL.md §2,
//! "Test tooling": "fixed `Clock`/`Random` implementations for
//! deterministic time- and dice-dependent tests, grounded in
//! `infrastructure/clock.rs`'s `FixedClock`/`FixedRandom`").

use chrono::{DateTime, Utc};

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// d20 + dex-bonus initiative roll, and the generic `gen_range` dice
/// primitive rules adjudication builds on (spec.md §4.7, "Initiative").
pub trait RandomPort: Send + Sync {
    fn gen_range(&self, min: i32, max: i32) -> i32;

    fn roll_d20(&self) -> i32 {
        self.gen_range(1, 20)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        use rand::Rng;
        rand::thread_rng().gen_range(min..=max)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Always returns the same value; deterministic for tests that assert on
/// an exact initiative or damage roll.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub i32);

impl RandomPort for FixedRandom {
    fn gen_range(&self, _min: i32, _max: i32) -> i32 {
        self.0
    }
}

/// Cycles through a fixed sequence, looping, for tests that need more than
/// one distinct roll (e.g. ordering two participants' initiative).
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<i32>,
    index: std::sync::atomic::AtomicUsize,
}

impl SequenceRandom {
    pub fn new(values: Vec<i32>) -> Self {
        Self { values, index: std::sync::atomic::AtomicUsize::new(0) }
    }
}

impl RandomPort for SequenceRandom {
    fn gen_range(&self, _min: i32, _max: i32) -> i32 {
        let i = self.index.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.values[i % self.values.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_pinned_time() {
        let now = Utc::now();
        let clock = FixedClock(now);
        assert_eq!(clock.now(), now);
    }

    #[test]
    fn sequence_random_cycles() {
        let r = SequenceRandom::new(vec![5, 12]);
        assert_eq!(r.gen_range(1, 20), 5);
        assert_eq!(r.gen_range(1, 20), 12);
        assert_eq!(r.gen_range(1, 20), 5);
    }
}
