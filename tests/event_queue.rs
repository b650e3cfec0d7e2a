use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use resmirror::backoff::BackoffPolicy;
use resmirror::queue::EventQueue;
use resmirror_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn test_add_is_idempotent_while_pending() -> TestResult {
    init_tracing();
    let queue = EventQueue::new("pods");

    queue.add("ns/a");
    queue.add("ns/a");
    queue.add("ns/b");
    assert_eq!(queue.len(), 2);

    assert_eq!(with_timeout(queue.get()).await.as_deref(), Some("ns/a"));
    assert_eq!(with_timeout(queue.get()).await.as_deref(), Some("ns/b"));
    assert!(queue.is_empty());
    assert_eq!(queue.in_flight(), 2);
    Ok(())
}

#[tokio::test]
async fn test_add_while_processing_is_deferred_until_done() -> TestResult {
    init_tracing();
    let queue = EventQueue::new("pods");

    queue.add("ns/a");
    let key = with_timeout(queue.get()).await.ok_or("queue closed")?;
    assert_eq!(key, "ns/a");

    // Re-added twice while in flight: collapses to one deferred entry.
    queue.add("ns/a");
    queue.add("ns/a");
    assert_eq!(queue.len(), 0, "in-flight key must not be handed out twice");

    queue.done(&key);
    assert_eq!(queue.len(), 1);
    assert_eq!(with_timeout(queue.get()).await.as_deref(), Some("ns/a"));
    queue.done("ns/a");
    assert!(queue.is_empty());
    assert_eq!(queue.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn test_done_without_readd_does_not_requeue() -> TestResult {
    init_tracing();
    let queue = EventQueue::new("pods");

    queue.add("x");
    let key = with_timeout(queue.get()).await.ok_or("queue closed")?;
    queue.done(&key);

    assert!(queue.is_empty());
    assert_eq!(queue.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_drains_pending_then_returns_none() -> TestResult {
    init_tracing();
    let queue = EventQueue::new("pods");

    queue.add("a");
    queue.add("b");
    queue.shut_down();
    assert!(queue.is_shutting_down());

    queue.add("c");
    assert_eq!(queue.len(), 2, "adds after shutdown are ignored");

    assert_eq!(with_timeout(queue.get()).await.as_deref(), Some("a"));
    assert_eq!(with_timeout(queue.get()).await.as_deref(), Some("b"));
    assert_eq!(with_timeout(queue.get()).await, None);
    Ok(())
}

#[tokio::test]
async fn test_get_waits_for_add() -> TestResult {
    init_tracing();
    let queue = Arc::new(EventQueue::new("pods"));

    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.get().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    queue.add("late");
    let got = with_timeout(waiter).await?;
    assert_eq!(got.as_deref(), Some("late"));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_wakes_every_blocked_getter() -> TestResult {
    init_tracing();
    let queue = Arc::new(EventQueue::new("pods"));

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.shut_down();

    for waiter in waiters {
        assert_eq!(with_timeout(waiter).await?, None);
    }
    Ok(())
}

#[tokio::test]
async fn test_shutdown_does_not_interrupt_in_flight_key() -> TestResult {
    init_tracing();
    let queue = EventQueue::new("pods");

    queue.add("busy");
    let key = with_timeout(queue.get()).await.ok_or("queue closed")?;
    queue.shut_down();

    assert_eq!(queue.in_flight(), 1);
    queue.done(&key);
    assert_eq!(with_timeout(queue.get()).await, None);
    Ok(())
}

#[tokio::test]
async fn test_add_after_delays_the_key() -> TestResult {
    init_tracing();
    let queue = Arc::new(EventQueue::new("pods"));

    queue.add_after("later", Duration::from_millis(30));
    assert!(queue.is_empty());

    wait_until("delayed key to arrive", || queue.len() == 1).await;
    assert_eq!(with_timeout(queue.get()).await.as_deref(), Some("later"));
    Ok(())
}

#[tokio::test]
async fn test_add_after_zero_delay_adds_immediately() -> TestResult {
    init_tracing();
    let queue = Arc::new(EventQueue::new("pods"));

    queue.add_after("now", Duration::ZERO);
    assert_eq!(queue.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rate_limited_adds_count_requeues_until_forgotten() -> TestResult {
    init_tracing();
    let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(10), 2.0);
    let queue = Arc::new(EventQueue::with_rate_limit("pods", policy));

    queue.add_rate_limited("flaky");
    queue.add_rate_limited("flaky");
    queue.add_rate_limited("flaky");
    assert_eq!(queue.num_requeues("flaky"), 3);
    assert_eq!(queue.num_requeues("other"), 0);

    wait_until("rate-limited key to arrive", || queue.len() == 1).await;

    queue.forget("flaky");
    assert_eq!(queue.num_requeues("flaky"), 0);
    Ok(())
}
