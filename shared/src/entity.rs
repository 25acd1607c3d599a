use crate::input::InputState;
use crate::protocol::EntityUpdate;
use crate::{ATTACK_FRAMES, CHAR_SPEED, SCREEN_HEIGHT, SCREEN_PADDING, SCREEN_WIDTH};
use rand::Rng;

/// A character in the arena, human or AI controlled.
///
/// Facing and velocity components are always -1, 0 or 1 (velocity scaled by
/// `speed`). Characters have no behaviour of their own beyond these pure
/// operations; the server decides when to call them.
#[derive(Debug, Clone, PartialEq)]
pub struct Char {
    pub fx: i32,
    pub fy: i32,
    pub vx: i32,
    pub vy: i32,
    pub px: f64,
    pub py: f64,
    pub speed: i32,
    /// Cosmetic sprite clock offset, not used by any game rule.
    pub animation_offset: i32,
    /// Ticks left in the current attack, 0 when not attacking.
    pub attack_frame: u32,
    pub is_dead: bool,
}

impl Char {
    pub fn new_at(px: f64, py: f64) -> Self {
        Self {
            fx: 1,
            fy: 1,
            vx: 0,
            vy: 0,
            px,
            py,
            speed: CHAR_SPEED,
            animation_offset: 0,
            attack_frame: 0,
            is_dead: false,
        }
    }

    /// Creates a character at a random position inside the playable area.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let span_x = (SCREEN_WIDTH - SCREEN_PADDING * 3.0) as u32;
        let span_y = (SCREEN_HEIGHT - SCREEN_PADDING * 3.0) as u32;
        let px = SCREEN_PADDING + f64::from(rng.gen_range(0..span_x));
        let py = SCREEN_PADDING + f64::from(rng.gen_range(0..span_y));

        let mut char = Self::new_at(px, py);
        char.animation_offset = rng.gen_range(0..10);
        char
    }

    /// Applies a participant's held buttons.
    ///
    /// Holding action starts an attack (or keeps one going) and stops the
    /// character. Otherwise velocity follows the pressed directions. Facing
    /// follows velocity and is kept while standing still, so a stationary
    /// character still attacks the way it last moved. Dead characters
    /// ignore input; returns whether anything was applied.
    pub fn apply_input(&mut self, input: &InputState) -> bool {
        if self.is_dead {
            return false;
        }

        if input.action {
            if self.attack_frame == 0 {
                self.attack_frame = ATTACK_FRAMES;
            } else if self.attack_frame > 1 {
                // The final 1 -> 0 step belongs to the simulation tick.
                self.attack_frame -= 1;
            }
            self.vx = 0;
            self.vy = 0;
            return true;
        }

        let (x, y) = input.axes();
        self.vx = x * self.speed;
        self.vy = y * self.speed;
        if x != 0 || y != 0 {
            self.fx = x;
            self.fy = y;
        }
        true
    }

    pub fn is_attacking(&self) -> bool {
        self.attack_frame > 0
    }

    /// Advances an in-progress attack by one tick.
    ///
    /// Returns true exactly on the tick the attack finishes, which is when
    /// the hit lands.
    pub fn advance_attack(&mut self) -> bool {
        if self.attack_frame == 0 {
            return false;
        }
        self.attack_frame -= 1;
        self.attack_frame == 0
    }

    /// Point struck by an attack: one `radius` ahead along the facing.
    ///
    /// `None` when the character has no facing.
    pub fn impact_site(&self, radius: f64) -> Option<(f64, f64)> {
        let fx = f64::from(self.fx);
        let fy = f64::from(self.fy);
        let norm = (fx * fx + fy * fy).sqrt();
        if norm == 0.0 {
            return None;
        }
        Some((self.px + fx * radius / norm, self.py + fy * radius / norm))
    }

    /// Moves one tick along the current velocity and clamps to the arena.
    pub fn step(&mut self) {
        if self.is_dead || (self.vx == 0 && self.vy == 0) {
            return;
        }

        let vx = f64::from(self.vx);
        let vy = f64::from(self.vy);
        let norm = (vx * vx + vy * vy).sqrt();
        let speed = f64::from(self.speed);

        self.px += vx / norm * speed;
        if self.px >= SCREEN_WIDTH - SCREEN_PADDING {
            self.px = SCREEN_WIDTH - SCREEN_PADDING - 1.0;
        }
        if self.px <= SCREEN_PADDING {
            self.px = SCREEN_PADDING + 1.0;
        }

        self.py += vy / norm * speed;
        if self.py >= SCREEN_HEIGHT - SCREEN_PADDING - 10.0 {
            self.py = SCREEN_HEIGHT - SCREEN_PADDING - 11.0;
        }
        if self.py <= SCREEN_PADDING {
            self.py = SCREEN_PADDING + 1.0;
        }
    }

    pub fn to_update(&self, index: u32) -> EntityUpdate {
        EntityUpdate {
            index,
            fx: self.fx,
            fy: self.fy,
            vx: self.vx,
            vy: self.vy,
            px: self.px,
            py: self.py,
            speed: self.speed,
            attack_frame: self.attack_frame,
            is_dead: self.is_dead,
        }
    }

    /// Overwrites this character with the server's view of it.
    pub fn apply_update(&mut self, update: &EntityUpdate) {
        self.fx = update.fx;
        self.fy = update.fy;
        self.vx = update.vx;
        self.vy = update.vy;
        self.px = update.px;
        self.py = update.py;
        self.speed = update.speed;
        self.attack_frame = update.attack_frame;
        self.is_dead = update.is_dead;
    }
}

impl From<&EntityUpdate> for Char {
    fn from(update: &EntityUpdate) -> Self {
        let mut char = Char::new_at(update.px, update.py);
        char.apply_update(update);
        char
    }
}

/// True when (x1, y1) lies within `radius` of (x0, y0), boundary included.
pub fn is_hit(x0: f64, y0: f64, x1: f64, y1: f64, radius: f64) -> bool {
    let dx = x1 - x0;
    let dy = y1 - y0;
    (dx * dx + dy * dy).sqrt() <= radius
}
