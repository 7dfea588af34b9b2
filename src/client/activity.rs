use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{info, trace};

/// Forced sign-out after this much user inactivity. Policy constant.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// How often the watcher re-checks the idle clock.
pub const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Event classes that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Pointer,
    Key,
    Scroll,
    Touch,
}

struct ActivityClock {
    started: Instant,
    last_activity_ms: AtomicU64,
    active: AtomicBool,
}

impl ActivityClock {
    fn touch(&self) {
        if self.active.load(Ordering::Relaxed) {
            self.last_activity_ms
                .store(self.started.elapsed().as_millis() as u64, Ordering::Relaxed);
        }
    }

    fn idle_for(&self) -> Option<Duration> {
        if !self.active.load(Ordering::Relaxed) {
            return None;
        }
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        Some(self.started.elapsed().saturating_sub(last))
    }
}

/// Idle-timeout tracker for one session lifetime.
///
/// One watcher task per monitor, aborted explicitly on `stop`. The timeout
/// here is independent of the server-side session expiry and never the
/// authoritative one; it only forces an early local sign-out.
pub struct ActivityMonitor {
    clock: Arc<ActivityClock>,
    timeout: Duration,
    watcher: JoinHandle<()>,
}

impl ActivityMonitor {
    pub fn start<F, Fut>(on_timeout: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::start_with(IDLE_TIMEOUT, IDLE_CHECK_INTERVAL, on_timeout)
    }

    pub fn start_with<F, Fut>(timeout: Duration, check_interval: Duration, on_timeout: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let clock = Arc::new(ActivityClock {
            started: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            active: AtomicBool::new(true),
        });

        let watcher = tokio::spawn({
            let clock = clock.clone();
            async move {
                let mut ticker = tokio::time::interval(check_interval);
                loop {
                    ticker.tick().await;
                    let Some(idle) = clock.idle_for() else { break };
                    if idle >= timeout {
                        clock.active.store(false, Ordering::Relaxed);
                        info!(idle_secs = idle.as_secs(), "idle timeout reached, forcing sign-out");
                        // The callback may call `stop` on this monitor, so it
                        // runs in its own task, outside the abort's reach.
                        tokio::spawn(on_timeout());
                        break;
                    }
                }
            }
        });

        Self {
            clock,
            timeout,
            watcher,
        }
    }

    pub fn record_interaction(&self, interaction: Interaction) {
        trace!(?interaction, "activity recorded");
        self.clock.touch();
    }

    pub fn is_active(&self) -> bool {
        self.clock.active.load(Ordering::Relaxed)
    }

    /// Time since the last recorded interaction, `None` once stopped.
    pub fn idle_for(&self) -> Option<Duration> {
        self.clock.idle_for()
    }

    /// Derived countdown for UI warnings. Informational only.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.idle_for().map(|idle| self.timeout.saturating_sub(idle))
    }

    /// Stop tracking and cancel the watcher. Idempotent; the clock reads
    /// `None` for everything afterwards.
    pub fn stop(&self) {
        self.clock.active.store(false, Ordering::Relaxed);
        self.watcher.abort();
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fired_flag() -> (Arc<AtomicUsize>, impl Fn() -> std::future::Ready<()> + Send + Sync) {
        let fired = Arc::new(AtomicUsize::new(0));
        let flag = fired.clone();
        let on_timeout = move || {
            flag.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        };
        (fired, on_timeout)
    }

    #[tokio::test]
    async fn forces_sign_out_after_the_idle_budget() {
        let (fired, on_timeout) = fired_flag();
        let monitor = ActivityMonitor::start_with(
            Duration::from_millis(40),
            Duration::from_millis(10),
            on_timeout,
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!monitor.is_active());
        assert!(monitor.time_until_expiry().is_none());
    }

    #[tokio::test]
    async fn interactions_keep_the_session_alive() {
        let (fired, on_timeout) = fired_flag();
        let monitor = ActivityMonitor::start_with(
            Duration::from_millis(100),
            Duration::from_millis(20),
            on_timeout,
        );

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(30)).await;
            monitor.record_interaction(Interaction::Pointer);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(monitor.is_active());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_resets_the_clock_and_cancels_the_watcher() {
        let (fired, on_timeout) = fired_flag();
        let monitor = ActivityMonitor::start_with(
            Duration::from_millis(30),
            Duration::from_millis(10),
            on_timeout,
        );
        monitor.record_interaction(Interaction::Key);
        monitor.stop();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn time_until_expiry_counts_down_and_resets_on_activity() {
        let (_fired, on_timeout) = fired_flag();
        let monitor = ActivityMonitor::start_with(
            Duration::from_secs(10),
            Duration::from_secs(1),
            on_timeout,
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        let before = monitor.time_until_expiry().unwrap();
        assert!(before < Duration::from_secs(10));

        monitor.record_interaction(Interaction::Scroll);
        let after = monitor.time_until_expiry().unwrap();
        assert!(after >= before);

        monitor.stop();
        assert!(monitor.idle_for().is_none());
    }
}
