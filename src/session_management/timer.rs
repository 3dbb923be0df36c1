use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session_management::descriptor::{format_clock, SessionDescriptor};

/// Counts a session down to zero at one tick per second and delivers
/// exactly one expiry signal. The initial value is derived from the
/// session descriptor, so a client joining an in-flight session starts
/// from the true remaining time rather than the full duration.
pub struct SessionTimer {
    remaining: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionTimer {
    pub fn start(descriptor: &SessionDescriptor) -> (Self, mpsc::Receiver<()>) {
        let (expiry_tx, expiry_rx) = mpsc::channel(1);
        let remaining = Arc::new(AtomicU64::new(
            descriptor.remaining_secs(Utc::now()),
        ));

        let counter = Arc::clone(&remaining);
        let session_id = descriptor.session_id;
        let handle = tokio::spawn(async move {
            if counter.load(Ordering::SeqCst) == 0 {
                info!("session {} already expired", session_id);
                let _ = expiry_tx.send(()).await;
                return;
            }

            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let current = counter.load(Ordering::SeqCst);
                if current == 0 {
                    break;
                }
                let next = current - 1;
                counter.store(next, Ordering::SeqCst);
                debug!("session {} clock {}", session_id, format_clock(next));
                if next == 0 {
                    info!("session {} expired", session_id);
                    let _ = expiry_tx.send(()).await;
                    break;
                }
            }
        });

        (
            Self {
                remaining,
                handle: Mutex::new(Some(handle)),
            },
            expiry_rx,
        )
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Stops the countdown. No expiry is delivered after this returns.
    /// Safe to call more than once.
    pub fn cancel(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn descriptor(elapsed_secs: i64, duration_mins: u64) -> SessionDescriptor {
        SessionDescriptor {
            session_id: Uuid::new_v4(),
            start_time: Utc::now() - ChronoDuration::seconds(elapsed_secs),
            session_duration: duration_mins,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn starts_from_derived_remaining_time() {
        // 10-minute session, 5 minutes already elapsed.
        let (timer, _rx) = SessionTimer::start(&descriptor(300, 10));
        assert_eq!(timer.remaining_secs(), 300);
        timer.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_one_second_per_tick() {
        let (timer, _rx) = SessionTimer::start(&descriptor(0, 10));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert_eq!(timer.remaining_secs(), 597);
        timer.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_exactly_one_expiry_at_zero() {
        let (timer, mut rx) = SessionTimer::start(&descriptor(58, 1));

        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.remaining_secs(), 1);
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.remaining_secs(), 0);
        assert!(rx.try_recv().is_ok());

        // No further signals after expiry.
        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(timer.remaining_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_descriptor_signals_immediately() {
        let (timer, mut rx) = SessionTimer::start(&descriptor(1200, 10));

        tokio::task::yield_now().await;
        assert_eq!(timer.remaining_secs(), 0);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_freezes_the_clock() {
        let (timer, mut rx) = SessionTimer::start(&descriptor(0, 1));

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.remaining_secs(), 58);

        timer.cancel();
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.remaining_secs(), 58);
        assert!(rx.try_recv().is_err());
    }
}
