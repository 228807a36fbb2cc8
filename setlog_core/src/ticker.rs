//! Background ticking for a shared session controller.
//!
//! One thread samples the clock every `tick_interval` and steps the
//! heart-rate walk every `heart_rate_interval`. Both go through the
//! controller mutex, the same path as user mutations.

use crate::config::SessionConfig;
use crate::controller::SharedController;
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Instant;

/// Handle to the ticking thread; dropping it stops the thread
pub struct Ticker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(controller: SharedController, config: &SessionConfig) -> Self {
        let tick_interval = config.tick_interval();
        let heart_rate_interval = config.heart_rate_interval();
        let (stop_tx, stop_rx) = channel::<()>();

        let handle = std::thread::Builder::new()
            .name("session-ticker".into())
            .spawn(move || {
                let mut next_heart_rate = Instant::now() + heart_rate_interval;
                loop {
                    match stop_rx.recv_timeout(tick_interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let mut ctl = match controller.lock() {
                        Ok(ctl) => ctl,
                        Err(_) => {
                            tracing::error!("Session controller lock poisoned, stopping ticker");
                            break;
                        }
                    };
                    ctl.tick();
                    if Instant::now() >= next_heart_rate {
                        ctl.sample_heart_rate();
                        next_heart_rate = Instant::now() + heart_rate_interval;
                    }
                }
                tracing::debug!("Ticker stopped");
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to spawn ticker thread: {}", e);
                None
            }
        };

        Self {
            stop: Some(stop_tx),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::controller::SessionController;
    use crate::events::SessionEvent;
    use crate::store::MemoryStore;
    use crate::Config;
    use std::sync::Arc;
    use std::time::Duration;

    const TEST_INTERVAL: Duration = Duration::from_millis(10);

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.session.tick_interval_ms = TEST_INTERVAL.as_millis() as u64;
        config.session.heart_rate_interval_ms = TEST_INTERVAL.as_millis() as u64;
        config
    }

    #[test]
    fn test_ticker_feeds_clock_deltas_into_controller() {
        let config = fast_config();
        let clock = ManualClock::default();
        let mut controller = SessionController::with_clock(&config, Arc::new(clock.clone()));
        let rx = controller.subscribe();
        controller.start(None, &MemoryStore::new());
        let shared = controller.into_shared();

        let _ = rx.recv_timeout(Duration::from_secs(1)); // start
        clock.advance(Duration::from_secs(7));

        let mut ticker = Ticker::spawn(shared.clone(), &config.session);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            SessionEvent::Changed
        );
        ticker.stop();

        assert!(!ticker.is_running());
        assert_eq!(shared.lock().unwrap().elapsed(), Duration::from_secs(7));
    }

    #[test]
    fn test_ticker_is_harmless_when_idle() {
        let config = fast_config();
        let shared = SessionController::new(&config).into_shared();

        let ticker = Ticker::spawn(shared.clone(), &config.session);
        std::thread::sleep(TEST_INTERVAL * 5);
        drop(ticker);

        assert!(!shared.lock().unwrap().is_active());
    }
}
