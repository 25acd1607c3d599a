use crate::hub::GameEvent;
use crate::shutdown::Shutdown;
use arena_shared::Coin;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;

/// Drops a coin at a random spot every so often while a game runs.
pub struct CoinSpawner {
    generation: u64,
    events: mpsc::Sender<GameEvent>,
    shutdown: Shutdown,
    max_interval: Duration,
    rng: StdRng,
}

impl CoinSpawner {
    pub fn new(
        generation: u64,
        events: mpsc::Sender<GameEvent>,
        shutdown: Shutdown,
        max_interval: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            generation,
            events,
            shutdown,
            max_interval,
            rng,
        }
    }

    pub async fn run(mut self) {
        let max_millis = self.max_interval.as_millis().max(1) as u64;
        loop {
            let pause = Duration::from_millis(self.rng.gen_range(1..=max_millis));
            if !self.shutdown.sleep(pause).await {
                break;
            }

            let coin = Coin::spawn(&mut self.rng);
            let event = GameEvent::CoinSpawned {
                generation: self.generation,
                coin,
            };
            let delivered = tokio::select! {
                sent = self.events.send(event) => sent.is_ok(),
                _ = self.shutdown.recv() => false,
            };
            if !delivered {
                break;
            }
        }
        debug!("coin spawner of game {} stopped", self.generation);
    }
}
