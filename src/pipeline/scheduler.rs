//! Scheduler - drives the tick at a fixed interval.
//!
//! Hosts with their own event loop call [`Scheduler::poll`] whenever they
//! wake up; hosts without one call [`Scheduler::run`], which blocks until
//! [`Scheduler::stop`] is called through the shared flag.
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = Scheduler::from_config(engine.config());
//!
//! // Option 1: inside the host's loop
//! if let Some(report) = scheduler.poll(&mut engine, Instant::now()) {
//!     // ...
//! }
//!
//! // Option 2: blocking
//! let stop = scheduler.stop_flag();
//! scheduler.run(&mut engine);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::info;

use super::tick::TickReport;
use crate::config::EngineConfig;
use crate::engine::Engine;

pub struct Scheduler {
    interval: Duration,
    next_due: Option<Instant>,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.tick_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The running flag, for stopping from a signal handler or another
    /// thread.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Tick if one is due at `now`. The first poll always ticks.
    /// The timer is re-armed once the tick completes.
    pub fn poll(&mut self, engine: &mut Engine, now: Instant) -> Option<TickReport> {
        if !self.is_running() {
            return None;
        }
        if self.next_due.is_some_and(|due| now < due) {
            return None;
        }
        let started = Instant::now();
        let report = engine.tick();
        self.next_due = Some(now + started.elapsed() + self.interval);
        Some(report)
    }

    /// Time left until the next tick is due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due
            .map_or(Duration::ZERO, |due| due.saturating_duration_since(now))
    }

    /// Tick every interval until stopped.
    pub fn run(&mut self, engine: &mut Engine) {
        info!("event=scheduler_started interval_ms={}", self.interval.as_millis());
        while self.is_running() {
            self.poll(engine, Instant::now());
            std::thread::sleep(self.time_until_due(Instant::now()));
        }
        info!("event=scheduler_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{StubObject, TypeFactory};

    fn engine() -> Engine {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.add_factory(TypeFactory::new().with("View", |_| StubObject::boxed(1)));
        engine
    }

    #[test]
    fn test_poll_respects_interval() {
        let mut engine = engine();
        let mut scheduler = Scheduler::new(Duration::from_millis(50));
        let start = Instant::now();

        engine.mount(r#"{"id":"a","type":"View"}"#);
        let report = scheduler.poll(&mut engine, start).unwrap();
        assert_eq!(report.created, 1);

        engine.mount(r#"{"id":"b","type":"View"}"#);
        assert!(scheduler.poll(&mut engine, start + Duration::from_millis(10)).is_none());
        assert!(!engine.contains("b"));
        assert!(scheduler.time_until_due(start + Duration::from_millis(10)) >= Duration::from_millis(40));

        let later = start + Duration::from_secs(1);
        assert!(scheduler.poll(&mut engine, later).is_some());
        assert!(engine.contains("b"));
    }

    #[test]
    fn test_stop() {
        let mut engine = engine();
        let mut scheduler = Scheduler::from_config(engine.config());
        let flag = scheduler.stop_flag();
        flag.store(false, Ordering::SeqCst);

        assert!(!scheduler.is_running());
        assert!(scheduler.poll(&mut engine, Instant::now()).is_none());
        // Returns immediately once stopped.
        scheduler.run(&mut engine);
    }
}
