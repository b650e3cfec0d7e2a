use std::time::Duration;

use proptest::prelude::*;
use resmirror::backoff::{Backoff, BackoffPolicy};

proptest! {
    #[test]
    fn test_delays_grow_monotonically_up_to_the_cap(
        initial_ms in 1u64..1_000,
        max_ms in 1u64..100_000,
        attempts in 1u32..200,
    ) {
        let policy = BackoffPolicy::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
            2.0,
        );

        let mut previous = Duration::ZERO;
        for attempt in 0..attempts {
            let delay = policy.delay_for_attempt(attempt);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= policy.max);
            previous = delay;
        }
    }

    #[test]
    fn test_reset_returns_to_initial_delay(failures in 1u32..50) {
        let policy = BackoffPolicy::reconnect();
        let mut backoff = Backoff::new(policy);
        for _ in 0..failures {
            backoff.next_delay();
        }
        prop_assert_eq!(backoff.attempts(), failures);

        backoff.reset();
        prop_assert_eq!(backoff.attempts(), 0);
        prop_assert_eq!(backoff.next_delay(), policy.initial);
    }
}
