//! Token-bucket rate limiter with strict FIFO hand-off.
//!
//! The bucket holds `capacity` tokens and is refilled to full capacity on every
//! tick. Callers that find the bucket empty (or find others already waiting)
//! queue up; a refill serves the queue in arrival order before any token is
//! left for late arrivals.
//!
//! The refill tick runs on tokio's clock, so tests can drive it with a paused
//! runtime. [`RateLimiter::manual`] builds a bucket without any timer for callers
//! that want to drive [`RateLimiter::refill`] themselves.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use mailguard_core::{GuardError, Result};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::config::RateLimit;

/// Shared token bucket
pub struct RateLimiter {
    shared: Arc<Bucket>,
    refill_task: StdMutex<Option<JoinHandle<()>>>,
}

struct Bucket {
    capacity: u32,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: u32,
    waiters: VecDeque<oneshot::Sender<()>>,
    closed: bool,
}

impl Bucket {
    fn new(capacity: u32) -> Self {
        Self {
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                waiters: VecDeque::new(),
                closed: false,
            }),
        }
    }

    async fn refill(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.tokens = self.capacity;

        while state.tokens > 0 {
            let Some(waiter) = state.waiters.pop_front() else {
                break;
            };
            // A dropped receiver means the caller gave up; its token stays in the bucket.
            if waiter.send(()).is_ok() {
                state.tokens -= 1;
            }
        }
        trace!(tokens = state.tokens, queued = state.waiters.len(), "bucket refilled");
    }
}

impl RateLimiter {
    /// Start a limiter whose bucket refills on `limit.refill_interval`
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(limit: RateLimit) -> Self {
        let limiter = Self::manual(limit.capacity);
        let weak = Arc::downgrade(&limiter.shared);
        let handle = tokio::spawn(refill_loop(weak, limit.refill_interval));
        if let Ok(mut slot) = limiter.refill_task.lock() {
            *slot = Some(handle);
        }
        debug!(
            capacity = limit.capacity,
            interval_ms = u64::try_from(limit.refill_interval.as_millis()).unwrap_or(u64::MAX),
            "rate limiter started"
        );
        limiter
    }

    /// Build a limiter with no refill timer
    #[must_use]
    pub fn manual(capacity: u32) -> Self {
        Self {
            shared: Arc::new(Bucket::new(capacity.max(1))),
            refill_task: StdMutex::new(None),
        }
    }

    /// Take one token, waiting in line if none is free
    ///
    /// Fails only once the limiter has been shut down.
    pub async fn acquire(&self) -> Result<()> {
        let receiver = {
            let mut state = self.shared.state.lock().await;
            if state.closed {
                return Err(GuardError::Internal("rate limiter is shut down".into()));
            }
            if state.waiters.is_empty() && state.tokens > 0 {
                state.tokens -= 1;
                return Ok(());
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            receiver
        };

        receiver
            .await
            .map_err(|_| GuardError::Internal("rate limiter shut down while waiting".into()))
    }

    /// Refill the bucket now, releasing queued callers first
    pub async fn refill(&self) {
        self.shared.refill().await;
    }

    /// Number of callers waiting for a token
    pub async fn queued(&self) -> usize {
        self.shared.state.lock().await.waiters.len()
    }

    /// Tokens currently available
    pub async fn available(&self) -> u32 {
        self.shared.state.lock().await.tokens
    }

    /// Stop the refill timer and fail every waiting caller
    pub async fn shutdown(&self) {
        self.abort_refill_task();
        let mut state = self.shared.state.lock().await;
        state.closed = true;
        state.waiters.clear();
        debug!("rate limiter shut down");
    }

    fn abort_refill_task(&self) {
        if let Ok(mut slot) = self.refill_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.abort_refill_task();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.shared.capacity)
            .finish_non_exhaustive()
    }
}

async fn refill_loop(bucket: Weak<Bucket>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(bucket) = bucket.upgrade() else {
            break;
        };
        bucket.refill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_ok, task};

    #[tokio::test]
    async fn grants_up_to_capacity() {
        let limiter = RateLimiter::manual(3);
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
        assert_eq!(limiter.available().await, 0);
        assert_eq!(limiter.queued().await, 0);
    }

    #[tokio::test]
    async fn overflow_waits_for_refill_in_fifo_order() {
        let limiter = RateLimiter::manual(3);
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }

        let mut fourth = task::spawn(limiter.acquire());
        let mut fifth = task::spawn(limiter.acquire());
        assert_pending!(fourth.poll());
        assert_pending!(fifth.poll());
        assert_eq!(limiter.queued().await, 2);

        limiter.refill().await;

        assert!(fourth.is_woken());
        assert!(fifth.is_woken());
        assert_ready_ok!(fourth.poll());
        assert_ready_ok!(fifth.poll());
        assert_eq!(limiter.queued().await, 0);
        assert_eq!(limiter.available().await, 1);
    }

    #[tokio::test]
    async fn queued_callers_beat_late_arrivals() {
        let limiter = RateLimiter::manual(1);
        limiter.acquire().await.unwrap();

        let mut first = task::spawn(limiter.acquire());
        let mut second = task::spawn(limiter.acquire());
        assert_pending!(first.poll());
        assert_pending!(second.poll());

        limiter.refill().await;
        assert_ready_ok!(first.poll());
        assert_pending!(second.poll());

        // Bucket is empty again; a newcomer queues behind `second`.
        let mut late = task::spawn(limiter.acquire());
        assert_pending!(late.poll());

        limiter.refill().await;
        assert_ready_ok!(second.poll());
        assert_pending!(late.poll());
    }

    #[tokio::test]
    async fn abandoned_waiter_does_not_consume_token() {
        let limiter = RateLimiter::manual(1);
        limiter.acquire().await.unwrap();

        let mut gone = task::spawn(limiter.acquire());
        assert_pending!(gone.poll());
        drop(gone);

        limiter.refill().await;
        assert_eq!(limiter.available().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_releases_queue_on_next_tick() {
        let limiter = RateLimiter::start(RateLimit {
            capacity: 3,
            refill_interval: Duration::from_secs(1),
        });
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }

        let mut fourth = task::spawn(limiter.acquire());
        let mut fifth = task::spawn(limiter.acquire());
        assert_pending!(fourth.poll());
        assert_pending!(fifth.poll());
        assert_eq!(limiter.queued().await, 2);

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_pending!(fourth.poll());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_ready_ok!(fourth.poll());
        assert_ready_ok!(fifth.poll());
        limiter.acquire().await.unwrap();
        assert_eq!(limiter.available().await, 0);

        limiter.shutdown().await;
        assert!(limiter.refill_task.lock().unwrap().is_none());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(limiter.available().await, 0);
    }

    #[tokio::test]
    async fn shutdown_fails_waiters_and_new_callers() {
        let limiter = RateLimiter::manual(1);
        limiter.acquire().await.unwrap();

        let mut waiting = task::spawn(limiter.acquire());
        assert_pending!(waiting.poll());

        limiter.shutdown().await;
        assert!(matches!(
            waiting.poll(),
            std::task::Poll::Ready(Err(GuardError::Internal(_)))
        ));
        assert!(limiter.acquire().await.is_err());
    }
}
