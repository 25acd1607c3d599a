//! Fixed-timestep driver.
//!
//! The driver owns no game state. It measures wall time, converts it into a
//! whole number of simulation ticks and asks the hub to run them, so the world
//! advances at the same rate however the scheduler wakes us.

use crate::hub::GameEvent;
use crate::shutdown::Shutdown;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Upper bound on ticks replayed after a single stall.
pub const MAX_CATCH_UP_TICKS: u32 = 30;

/// Accumulates elapsed time and hands it out in whole steps.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: Duration,
    lag: Duration,
    max_catch_up: u32,
}

impl FixedTimestep {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            lag: Duration::ZERO,
            max_catch_up: MAX_CATCH_UP_TICKS,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Leftover time not yet consumed by a tick.
    pub fn lag(&self) -> Duration {
        self.lag
    }

    /// Adds `elapsed` and returns how many ticks are now due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.step.is_zero() {
            return 0;
        }

        self.lag += elapsed;
        let mut ticks = 0;
        while self.lag >= self.step {
            self.lag -= self.step;
            ticks += 1;

            if ticks == self.max_catch_up && self.lag >= self.step {
                let skipped = self.lag.as_nanos() / self.step.as_nanos();
                warn!("simulation fell behind, dropping {} ticks", skipped);
                let remainder = self.lag.as_nanos() % self.step.as_nanos();
                self.lag = Duration::from_nanos(remainder as u64);
                break;
            }
        }
        ticks
    }
}

/// Posts `Tick` events for one game until shut down or the hub goes away.
pub async fn run(
    generation: u64,
    step: Duration,
    events: mpsc::Sender<GameEvent>,
    mut shutdown: Shutdown,
) {
    let mut timestep = FixedTimestep::new(step);
    let mut ticker = interval(step);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.recv() => break,
        }

        let now = Instant::now();
        let ticks = timestep.advance(now - last);
        last = now;
        if ticks == 0 {
            continue;
        }

        let tick = GameEvent::Tick { generation, ticks };
        tokio::select! {
            sent = events.send(tick) => {
                if sent.is_err() {
                    break;
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    debug!("simulation driver for game {} stopped", generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;

    const STEP: Duration = Duration::from_millis(16);

    #[test]
    fn test_short_interval_yields_no_tick() {
        let mut timestep = FixedTimestep::new(STEP);
        assert_eq!(timestep.advance(Duration::from_millis(10)), 0);
        assert_eq!(timestep.lag(), Duration::from_millis(10));
        assert_eq!(timestep.advance(Duration::from_millis(10)), 1);
        assert_eq!(timestep.lag(), Duration::from_millis(4));
    }

    #[test]
    fn test_long_interval_catches_up() {
        let mut timestep = FixedTimestep::new(STEP);
        assert_eq!(timestep.advance(STEP * 3 + Duration::from_millis(1)), 3);
        assert_eq!(timestep.lag(), Duration::from_millis(1));
    }

    #[test]
    fn test_catch_up_is_capped() {
        let mut timestep = FixedTimestep::new(STEP);
        let ticks = timestep.advance(STEP * 100 + Duration::from_millis(5));
        assert_eq!(ticks, MAX_CATCH_UP_TICKS);
        assert!(timestep.lag() < STEP);
        assert_eq!(timestep.lag(), Duration::from_millis(5));
    }

    #[test]
    fn test_total_ticks_match_elapsed_time() {
        let mut timestep = FixedTimestep::new(STEP);
        let total: u32 = (0..100)
            .map(|i| timestep.advance(Duration::from_millis(if i % 2 == 0 { 5 } else { 27 })))
            .sum();
        // 100 wakes of 16ms on average
        assert_eq!(total, 100);
    }

    #[test]
    fn test_zero_step_never_ticks() {
        let mut timestep = FixedTimestep::new(Duration::ZERO);
        assert_eq!(timestep.advance(Duration::from_secs(1)), 0);
    }

    #[tokio::test]
    async fn test_driver_posts_ticks_and_stops() {
        let (signal, shutdown) = shutdown::channel();
        let (tx, mut rx) = mpsc::channel(16);
        let driver = tokio::spawn(run(4, Duration::from_millis(5), tx, shutdown));

        match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
            Ok(Some(GameEvent::Tick { generation, ticks })) => {
                assert_eq!(generation, 4);
                assert!(ticks >= 1);
            }
            other => panic!("expected a tick, got {:?}", other),
        }

        signal.fire();
        tokio::time::timeout(Duration::from_secs(1), driver)
            .await
            .expect("driver ignored shutdown")
            .unwrap();
    }
}
