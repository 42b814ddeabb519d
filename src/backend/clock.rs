use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::usecases::contracts::Clock;

/// Wall clock in epoch milliseconds that never repeats or goes backwards
/// within the process.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    fn next_after(&self, wall_ms: i64) -> i64 {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = wall_ms.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.next_after(Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_wall_clock_when_it_advances() {
        let clock = SystemClock::default();

        assert_eq!(clock.next_after(100), 100);
        assert_eq!(clock.next_after(250), 250);
    }

    #[test]
    fn never_repeats_a_value_for_same_wall_time() {
        let clock = SystemClock::default();

        let first = clock.next_after(100);
        let second = clock.next_after(100);

        assert!(second > first);
    }

    #[test]
    fn ignores_wall_clock_stepping_backwards() {
        let clock = SystemClock::default();
        clock.next_after(500);

        assert_eq!(clock.next_after(10), 501);
    }

    #[test]
    fn consecutive_reads_are_strictly_increasing() {
        let clock = SystemClock::default();

        let stamps: Vec<i64> = (0..100).map(|_| clock.now_ms()).collect();

        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
