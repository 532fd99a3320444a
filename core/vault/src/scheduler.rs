//! Auto-lock timer.
//!
//! One single-shot timer per gate. Every reset or cancel bumps a generation
//! counter; a timer task carries the generation it was armed with and the
//! gate ignores fires whose generation is no longer current. A timer that
//! was cancelled while already in flight therefore cannot lock a vault that
//! has been unlocked again since.

use async_trait::async_trait;
use std::sync::Weak;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::lifecycle::LifecycleEvent;
use crate::policy::AutoLockPolicy;

/// Receiver of timer fires.
#[async_trait]
pub trait AutoLockTarget: Send + Sync {
    /// Called when the timer armed with `generation` expires.
    async fn auto_lock_fired(&self, generation: u64);
}

/// Resettable, cancelable inactivity timer.
pub struct AutoLockScheduler {
    policy: AutoLockPolicy,
    generation: u64,
    timer: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
    target: Option<Weak<dyn AutoLockTarget>>,
}

impl AutoLockScheduler {
    /// Create an idle scheduler.
    pub fn new(policy: AutoLockPolicy) -> Self {
        Self {
            policy,
            generation: 0,
            timer: None,
            deadline: None,
            target: None,
        }
    }

    /// Set the receiver of timer fires.
    ///
    /// Without a target the scheduler still tracks deadlines but spawns no
    /// tasks.
    pub fn attach(&mut self, target: Weak<dyn AutoLockTarget>) {
        self.target = Some(target);
    }

    /// Current policy.
    pub fn policy(&self) -> AutoLockPolicy {
        self.policy
    }

    /// Change the policy without arming anything.
    pub fn set_policy(&mut self, policy: AutoLockPolicy) {
        self.policy = policy;
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel any pending timer and arm a new one for `policy`.
    ///
    /// `Immediate` and `Never` arm nothing.
    pub fn reset(&mut self, policy: AutoLockPolicy) {
        self.abort_timer();
        self.generation = self.generation.wrapping_add(1);
        self.policy = policy;

        let Some(timeout) = policy.timeout() else {
            debug!("Auto-lock timer not armed for policy {:?}", policy);
            return;
        };

        let deadline = Instant::now() + timeout;
        self.deadline = Some(deadline);

        let Some(target) = self.target.clone() else {
            return;
        };
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("No async runtime, auto-lock timer not armed: {}", e);
                return;
            }
        };

        let generation = self.generation;
        self.timer = Some(handle.spawn(async move {
            sleep_until(deadline).await;
            if let Some(target) = target.upgrade() {
                target.auto_lock_fired(generation).await;
            }
        }));
        debug!(
            "Auto-lock timer armed for {}s (generation {})",
            timeout.as_secs(),
            generation
        );
    }

    /// Invalidate and abort the pending timer. Idempotent.
    pub fn cancel_on_lock(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.abort_timer();
    }

    /// Accept a fire from the timer armed with `generation`.
    ///
    /// Returns false for stale generations. On success the task handle is
    /// released without aborting, since the caller is running on that task.
    pub fn fired(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            debug!(
                "Ignoring stale auto-lock fire (generation {}, current {})",
                generation, self.generation
            );
            return false;
        }
        self.timer = None;
        self.deadline = None;
        true
    }

    /// Whether `generation` is still current.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Whether `event` locks the vault under the current policy.
    pub fn should_lock_on(&self, event: LifecycleEvent) -> bool {
        self.policy.locks_on_leave() && event.is_leave()
    }

    /// Whether a timer is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the pending timer expires.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.deadline = None;
    }
}

impl Drop for AutoLockScheduler {
    fn drop(&mut self) {
        self.abort_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        fires: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl AutoLockTarget for Recorder {
        async fn auto_lock_fired(&self, generation: u64) {
            self.fires.lock().unwrap().push(generation);
        }
    }

    fn scheduler_with(recorder: &Arc<Recorder>) -> AutoLockScheduler {
        let mut scheduler = AutoLockScheduler::new(AutoLockPolicy::default());
        let target: Arc<dyn AutoLockTarget> = recorder.clone();
        scheduler.attach(Arc::downgrade(&target));
        scheduler
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline_not_before() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = scheduler_with(&recorder);

        scheduler.reset(AutoLockPolicy::Minutes(5));
        let generation = scheduler.generation();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(recorder.fires.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*recorder.fires.lock().unwrap(), vec![generation]);
        assert!(scheduler.fired(generation));
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_replaces_timer() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = scheduler_with(&recorder);

        scheduler.reset(AutoLockPolicy::Minutes(1));
        tokio::time::sleep(Duration::from_secs(45)).await;
        scheduler.reset(AutoLockPolicy::Minutes(1));
        let generation = scheduler.generation();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(recorder.fires.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(*recorder.fires.lock().unwrap(), vec![generation]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = scheduler_with(&recorder);

        scheduler.reset(AutoLockPolicy::Minutes(1));
        let armed = scheduler.generation();
        scheduler.cancel_on_lock();
        scheduler.cancel_on_lock();

        assert!(!scheduler.is_armed());
        assert!(!scheduler.is_current(armed));
        assert!(!scheduler.fired(armed));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(recorder.fires.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_and_immediate_arm_nothing() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = scheduler_with(&recorder);

        scheduler.reset(AutoLockPolicy::Never);
        assert!(!scheduler.is_armed());
        scheduler.reset(AutoLockPolicy::Immediate);
        assert!(!scheduler.is_armed());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(recorder.fires.lock().unwrap().is_empty());
    }

    #[test]
    fn test_should_lock_on() {
        let mut scheduler = AutoLockScheduler::new(AutoLockPolicy::Immediate);
        assert!(scheduler.should_lock_on(LifecycleEvent::Background));
        assert!(scheduler.should_lock_on(LifecycleEvent::FocusLost));
        assert!(!scheduler.should_lock_on(LifecycleEvent::Foreground));

        scheduler.set_policy(AutoLockPolicy::Minutes(5));
        assert!(!scheduler.should_lock_on(LifecycleEvent::Background));
    }

    #[test]
    fn test_reset_outside_runtime_tracks_deadline() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = scheduler_with(&recorder);
        // Instant::now() works outside a runtime; only spawning is skipped
        scheduler.reset(AutoLockPolicy::Minutes(5));
        assert!(scheduler.is_armed());
    }
}
