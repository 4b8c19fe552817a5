//! Fixed-interval polling until a probe reports a terminal state.
//!
//! [`poll_until`] drives an async probe on the tokio clock; [`poll_until_blocking`]
//! is the same loop for synchronous callers. Neither retries: a probe error
//! ends the loop and is handed back in [`PollOutcome::Error`].

use std::future::Future;
use std::time::Duration;

/// What a single probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Still working; probe again after the interval.
    Pending,
    /// Terminal value; the loop stops.
    Done(T),
}

/// How a poll loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T, E> {
    Terminal(T),
    Error(E),
    /// The optional ceiling was reached while the probe still reported pending.
    TimedOut { elapsed: Duration, attempts: u32 },
}

fn ceiling_reached(timeout: Option<Duration>, elapsed: Duration) -> bool {
    timeout.is_some_and(|limit| elapsed >= limit)
}

/// Calls `probe` until it returns [`PollStatus::Done`] or an error, sleeping
/// `interval` between attempts.
///
/// With `timeout = None` the loop runs until the probe reaches a terminal state.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    timeout: Option<Duration>,
    mut probe: F,
) -> PollOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, E>>,
{
    let started = tokio::time::Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match probe().await {
            Ok(PollStatus::Done(value)) => return PollOutcome::Terminal(value),
            Err(err) => return PollOutcome::Error(err),
            Ok(PollStatus::Pending) => {}
        }

        let elapsed = started.elapsed();
        if ceiling_reached(timeout, elapsed) {
            return PollOutcome::TimedOut { elapsed, attempts };
        }
        tracing::debug!(attempts, ?elapsed, "still pending; sleeping");
        tokio::time::sleep(interval).await;
    }
}

/// Blocking counterpart of [`poll_until`] for callers outside a runtime.
pub fn poll_until_blocking<T, E, F>(
    interval: Duration,
    timeout: Option<Duration>,
    mut probe: F,
) -> PollOutcome<T, E>
where
    F: FnMut() -> Result<PollStatus<T>, E>,
{
    let started = std::time::Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match probe() {
            Ok(PollStatus::Done(value)) => return PollOutcome::Terminal(value),
            Err(err) => return PollOutcome::Error(err),
            Ok(PollStatus::Pending) => {}
        }

        let elapsed = started.elapsed();
        if ceiling_reached(timeout, elapsed) {
            return PollOutcome::TimedOut { elapsed, attempts };
        }
        std::thread::sleep(interval);
    }
}
