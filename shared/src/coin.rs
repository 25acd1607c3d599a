use crate::{COIN_PICKUP_RADIUS, SCREEN_HEIGHT, SCREEN_PADDING, SCREEN_WIDTH};
use rand::Rng;

/// A collectable coin. Once picked up it stays picked up.
#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub px: f64,
    pub py: f64,
    pub pickup_radius: f64,
    pub picked_up: bool,
    pub animation_offset: i32,
}

impl Coin {
    pub fn new_at(px: f64, py: f64) -> Self {
        Self {
            px,
            py,
            pickup_radius: COIN_PICKUP_RADIUS,
            picked_up: false,
            animation_offset: 0,
        }
    }

    /// Places a coin at a random position, kept further from the edges than
    /// characters spawn.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let span_x = (SCREEN_WIDTH - SCREEN_PADDING * 5.0) as u32;
        let span_y = (SCREEN_HEIGHT - SCREEN_PADDING * 5.0) as u32;

        let mut coin = Self::new_at(
            SCREEN_PADDING + f64::from(rng.gen_range(0..span_x)),
            SCREEN_PADDING + f64::from(rng.gen_range(0..span_y)),
        );
        coin.animation_offset = rng.gen_range(0..3);
        coin
    }

    /// Marks the coin collected. Returns false if it already was.
    pub fn pick_up(&mut self) -> bool {
        if self.picked_up {
            return false;
        }
        self.picked_up = true;
        true
    }
}
