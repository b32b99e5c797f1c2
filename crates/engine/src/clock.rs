//! Timed-delivery simulation.
//!
//! Pouring an ingredient takes `volume / rate` seconds. The engine awaits a
//! [`DeliveryClock`] for that long instead of sleeping directly, so tests can
//! swap in a [`VirtualClock`] that only keeps score.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

/// Suspension point used while an ingredient is being poured.
#[async_trait]
pub trait DeliveryClock: Send + Sync {
    /// Wait while `ingredient` pours for `duration`.
    async fn deliver(&self, ingredient: &str, duration: Duration);
}

/// Real time: suspends the calling task with `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl DeliveryClock for TokioClock {
    async fn deliver(&self, _ingredient: &str, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual time: advances an internal counter and yields once.
///
/// The yield keeps the await a real suspension point, so other tasks still
/// interleave the way they would against [`TokioClock`].
#[derive(Debug, Default)]
pub struct VirtualClock {
    elapsed: Mutex<Duration>,
    deliveries: Mutex<Vec<(String, Duration)>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time spent pouring.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or_default()
    }

    /// Every pour seen so far, in order.
    pub fn deliveries(&self) -> Vec<(String, Duration)> {
        self.deliveries.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DeliveryClock for VirtualClock {
    async fn deliver(&self, ingredient: &str, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push((ingredient.to_string(), duration));
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn virtual_clock_accumulates_without_waiting() {
        let clock = VirtualClock::new();
        let started = std::time::Instant::now();

        clock.deliver("water", Duration::from_secs(60)).await;
        clock.deliver("citrus", Duration::from_secs(30)).await;

        assert_eq!(clock.elapsed(), Duration::from_secs(90));
        assert_eq!(clock.deliveries()[1].0, "citrus");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_sleeps_for_the_pour_time() {
        let started = tokio::time::Instant::now();
        TokioClock.deliver("berry", Duration::from_secs(3)).await;
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
