//! Types shared between the arena server and its clients: world constants,
//! the character and coin model, player input, and the wire protocol.

pub mod coin;
pub mod entity;
pub mod error;
pub mod input;
pub mod protocol;

pub use coin::Coin;
pub use entity::{is_hit, Char};
pub use error::{Error, Result};
pub use input::InputState;
pub use protocol::{ClientMessage, EntityUpdate, ServerMessage};

pub const SCREEN_WIDTH: f64 = 480.0;
pub const SCREEN_HEIGHT: f64 = 320.0;
pub const SCREEN_PADDING: f64 = 10.0;

/// Size of the entity table: human slots first, AI for the rest.
pub const MAX_CHARS: usize = 32;
/// Number of human player slots.
pub const MAX_CLIENTS: usize = 8;

pub const HIT_RADIUS: f64 = 12.0;
pub const COIN_PICKUP_RADIUS: f64 = 10.0;

/// Ticks an attack lasts; the hit lands on the last one.
pub const ATTACK_FRAMES: u32 = 20;
pub const CHAR_SPEED: i32 = 1;

pub const TICK_RATE: u32 = 60;
