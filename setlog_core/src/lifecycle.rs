//! Bridge from host suspend/resume signals to the session clock.
//!
//! No ticks fire while the host has us suspended, so the adapter samples
//! the clock when suspension starts and again on resume; the second sample
//! credits the whole gap in one step. While suspending it holds a grace
//! period from the host so the first sample is not cut short. If the host
//! revokes the grace period early nothing is lost: the resume sample only
//! depends on the last recorded timestamp.

use crate::controller::{SessionController, SharedController};
use std::sync::MutexGuard;
use std::time::Duration;

/// Handle for one granted grace period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraceToken(pub u64);

/// Host facility for extra execution time around suspension
pub trait GraceScheduler: Send {
    /// Ask for continued execution; `None` if the host refuses
    fn begin(&mut self, reason: &str) -> Option<GraceToken>;

    /// Give a grace period back
    fn end(&mut self, token: GraceToken);
}

/// Scheduler for hosts with nothing to ask: always grants and logs
#[derive(Debug)]
pub struct LoggingGraceScheduler {
    budget: Duration,
    next_token: u64,
    outstanding: Vec<GraceToken>,
}

impl LoggingGraceScheduler {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            next_token: 1,
            outstanding: Vec::new(),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }
}

impl GraceScheduler for LoggingGraceScheduler {
    fn begin(&mut self, reason: &str) -> Option<GraceToken> {
        let token = GraceToken(self.next_token);
        self.next_token += 1;
        self.outstanding.push(token);
        tracing::debug!(
            "Grace period {:?} granted for {} ({}s budget)",
            token,
            reason,
            self.budget.as_secs()
        );
        Some(token)
    }

    fn end(&mut self, token: GraceToken) {
        self.outstanding.retain(|t| *t != token);
        tracing::debug!("Grace period {:?} ended", token);
    }
}

pub struct LifecycleAdapter<G: GraceScheduler> {
    controller: SharedController,
    scheduler: G,
    held: Option<GraceToken>,
}

impl<G: GraceScheduler> LifecycleAdapter<G> {
    pub fn new(controller: SharedController, scheduler: G) -> Self {
        Self {
            controller,
            scheduler,
            held: None,
        }
    }

    pub fn scheduler(&self) -> &G {
        &self.scheduler
    }

    pub fn held_grace(&self) -> Option<GraceToken> {
        self.held
    }

    /// Host is about to suspend the process
    pub fn about_to_suspend(&mut self) {
        if let Some(mut ctl) = self.lock() {
            ctl.mark_suspended();
        }
        if self.held.is_none() {
            self.held = self.scheduler.begin("suspend");
        }
    }

    /// Host moved the process to the background
    ///
    /// Some hosts only honour grace requests per transition, so any held
    /// grace is returned and requested again.
    pub fn entered_background(&mut self) {
        if let Some(mut ctl) = self.lock() {
            ctl.mark_suspended();
        }
        if let Some(token) = self.held.take() {
            self.scheduler.end(token);
        }
        self.held = self.scheduler.begin("background");
    }

    /// Host is running the process again
    pub fn resumed(&mut self) {
        if let Some(token) = self.held.take() {
            self.scheduler.end(token);
        }
        if let Some(mut ctl) = self.lock() {
            ctl.mark_resumed();
        }
    }

    /// Host revoked or ran out the grace period
    pub fn grace_expired(&mut self, token: GraceToken) {
        if self.held != Some(token) {
            return;
        }
        self.held = None;
        if let Some(mut ctl) = self.lock() {
            ctl.mark_suspended();
        }
        tracing::debug!("Grace period {:?} expired", token);
    }

    fn lock(&self) -> Option<MutexGuard<'_, SessionController>> {
        match self.controller.lock() {
            Ok(ctl) => Some(ctl),
            Err(_) => {
                tracing::warn!("Session controller lock poisoned, ignoring lifecycle signal");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use crate::Config;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingScheduler {
        begun: Vec<String>,
        ended: Vec<GraceToken>,
        next: u64,
        refuse: bool,
    }

    impl GraceScheduler for RecordingScheduler {
        fn begin(&mut self, reason: &str) -> Option<GraceToken> {
            self.begun.push(reason.to_string());
            if self.refuse {
                return None;
            }
            self.next += 1;
            Some(GraceToken(self.next))
        }

        fn end(&mut self, token: GraceToken) {
            self.ended.push(token);
        }
    }

    fn running_session() -> (SharedController, ManualClock) {
        let clock = ManualClock::default();
        let mut ctl = SessionController::with_clock(&Config::default(), Arc::new(clock.clone()));
        ctl.start(None, &MemoryStore::new());
        (ctl.into_shared(), clock)
    }

    #[test]
    fn test_suspension_time_is_credited_on_resume() {
        let (shared, clock) = running_session();
        let mut adapter = LifecycleAdapter::new(shared.clone(), RecordingScheduler::default());

        clock.advance(Duration::from_secs(5));
        adapter.about_to_suspend();
        clock.advance(Duration::from_secs(30));
        adapter.resumed();

        assert_eq!(shared.lock().unwrap().elapsed(), Duration::from_secs(35));
        assert_eq!(adapter.scheduler().begun, vec!["suspend"]);
        assert_eq!(adapter.scheduler().ended, vec![GraceToken(1)]);
        assert!(adapter.held_grace().is_none());
    }

    #[test]
    fn test_background_rearms_grace() {
        let (shared, clock) = running_session();
        let mut adapter = LifecycleAdapter::new(shared.clone(), RecordingScheduler::default());

        adapter.about_to_suspend();
        adapter.entered_background();

        assert_eq!(adapter.scheduler().begun, vec!["suspend", "background"]);
        assert_eq!(adapter.scheduler().ended, vec![GraceToken(1)]);
        assert_eq!(adapter.held_grace(), Some(GraceToken(2)));

        clock.advance(Duration::from_secs(120));
        adapter.resumed();
        assert_eq!(shared.lock().unwrap().elapsed(), Duration::from_secs(120));
    }

    #[test]
    fn test_revoked_grace_does_not_lose_time() {
        let (shared, clock) = running_session();
        let mut adapter = LifecycleAdapter::new(shared.clone(), RecordingScheduler::default());

        clock.advance(Duration::from_secs(2));
        adapter.about_to_suspend();
        clock.advance(Duration::from_secs(3));
        let token = adapter.held_grace().unwrap();
        adapter.grace_expired(token);
        clock.advance(Duration::from_secs(10));
        adapter.resumed();

        assert_eq!(shared.lock().unwrap().elapsed(), Duration::from_secs(15));
        // Expired grace is not handed back again
        assert!(adapter.scheduler().ended.is_empty());
    }

    #[test]
    fn test_refused_grace_still_accounts_time() {
        let (shared, clock) = running_session();
        let scheduler = RecordingScheduler {
            refuse: true,
            ..Default::default()
        };
        let mut adapter = LifecycleAdapter::new(shared.clone(), scheduler);

        adapter.about_to_suspend();
        clock.advance(Duration::from_secs(45));
        adapter.resumed();

        assert!(adapter.held_grace().is_none());
        assert_eq!(shared.lock().unwrap().elapsed(), Duration::from_secs(45));
    }

    #[test]
    fn test_signals_without_session_are_harmless() {
        let shared = SessionController::new(&Config::default()).into_shared();
        let scheduler = LoggingGraceScheduler::new(Duration::from_secs(30));
        let mut adapter = LifecycleAdapter::new(shared.clone(), scheduler);

        adapter.about_to_suspend();
        adapter.entered_background();
        adapter.resumed();

        assert!(!shared.lock().unwrap().is_active());
        assert_eq!(adapter.scheduler().outstanding(), 0);
    }
}
