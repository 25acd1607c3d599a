//! Autonomous wanderers that fill the table indices no human holds.
//!
//! Each AI is its own task. It never touches the world: it reads the latest
//! published positions and posts synthetic input to the hub, tagged with its
//! table index and the game generation it belongs to.

use crate::hub::AiInput;
use crate::shutdown::Shutdown;
use crate::world::Positions;
use arena_shared::{InputState, SCREEN_HEIGHT, SCREEN_WIDTH};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::PI;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy)]
pub struct AiTiming {
    /// Longest idle pause before choosing a direction.
    pub think_max: Duration,
    /// Longest walk in the chosen direction.
    pub walk_max: Duration,
}

pub struct AiController {
    id: usize,
    generation: u64,
    inputs: mpsc::Sender<AiInput>,
    positions: watch::Receiver<Positions>,
    shutdown: Shutdown,
    timing: AiTiming,
    rng: StdRng,
}

impl AiController {
    pub fn new(
        id: usize,
        generation: u64,
        inputs: mpsc::Sender<AiInput>,
        positions: watch::Receiver<Positions>,
        shutdown: Shutdown,
        timing: AiTiming,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            generation,
            inputs,
            positions,
            shutdown,
            timing,
            rng,
        }
    }

    pub async fn run(mut self) {
        loop {
            let think = random_duration(&mut self.rng, self.timing.think_max);
            if !self.shutdown.sleep(think).await {
                break;
            }

            let position = self.positions.borrow().get(self.id).copied().flatten();
            let Some((px, py)) = position else {
                // Dead or gone; nothing left to steer.
                break;
            };

            let (fx, fy) = wander(&mut self.rng, px, py);
            let input = match InputState::from_axes(fx, fy) {
                Ok(input) => input,
                Err(e) => {
                    warn!("ai {} produced a bad direction: {}", self.id, e);
                    InputState::released()
                }
            };
            if !self.post(input).await {
                break;
            }

            let walk = random_duration(&mut self.rng, self.timing.walk_max);
            if !self.shutdown.sleep(walk).await {
                break;
            }
            if !self.post(InputState::released()).await {
                break;
            }
        }
        debug!("ai {} of game {} stopped", self.id, self.generation);
    }

    async fn post(&mut self, input: InputState) -> bool {
        let message = AiInput {
            generation: self.generation,
            id: self.id,
            input,
        };
        tokio::select! {
            sent = self.inputs.send(message) => sent.is_ok(),
            _ = self.shutdown.recv() => false,
        }
    }
}

fn random_duration<R: Rng + ?Sized>(rng: &mut R, max: Duration) -> Duration {
    let millis = max.as_millis() as u64;
    if millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..=millis))
}

/// Picks a direction that drifts away from the nearest edges.
///
/// Each axis samples a standard normal shifted by `-(position / size - 0.5)`
/// and rounds it to -1, 0 or 1.
pub fn wander<R: Rng + ?Sized>(rng: &mut R, px: f64, py: f64) -> (i32, i32) {
    let bias_x = px / SCREEN_WIDTH - 0.5;
    let bias_y = py / SCREEN_HEIGHT - 0.5;
    (
        axis(standard_normal(rng) - bias_x),
        axis(standard_normal(rng) - bias_y),
    )
}

fn axis(raw: f64) -> i32 {
    (raw.round() as i32).clamp(-1, 1)
}

// Box-Muller
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
