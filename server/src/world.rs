//! Authoritative game state and the per-tick update.
//!
//! The world never talks to the network. Every mutation returns the messages
//! that describe it and the hub decides who receives them.

use crate::slots::PlayerSlots;
use arena_shared::{
    is_hit, Char, Coin, EntityUpdate, InputState, ServerMessage, HIT_RADIUS, MAX_CHARS,
    MAX_CLIENTS,
};
use log::{debug, info};
use rand::Rng;

/// Last known position of every table index, `None` for empty or dead.
pub type Positions = Vec<Option<(f64, f64)>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    NotStarted,
    Running,
    Ended,
}

#[derive(Debug, Clone)]
pub struct World {
    chars: Vec<Option<Char>>,
    player_slots: PlayerSlots,
    coins: Vec<Coin>,
    score: [i32; MAX_CLIENTS],
    host_slot: Option<usize>,
    phase: GamePhase,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            chars: vec![None; MAX_CHARS],
            player_slots: PlayerSlots::new(),
            coins: Vec::new(),
            score: [0; MAX_CLIENTS],
            host_slot: None,
            phase: GamePhase::NotStarted,
        }
    }

    /// Fresh world holding the same lobby, with newly spawned human chars.
    pub fn from_lobby<R: Rng + ?Sized>(previous: &World, rng: &mut R) -> Self {
        let mut world = Self::new();
        world.player_slots = previous.player_slots;
        world.host_slot = previous.host_slot;
        for slot in previous.player_slots.occupied() {
            world.chars[slot] = Some(Char::spawn(rng));
        }
        world
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn player_slots(&self) -> &PlayerSlots {
        &self.player_slots
    }

    pub fn host_slot(&self) -> Option<usize> {
        self.host_slot
    }

    pub fn set_host_slot(&mut self, slot: Option<usize>) {
        self.host_slot = slot;
    }

    /// Marks `slot` as human controlled and gives it a char.
    ///
    /// Returns the spawn position.
    pub fn join<R: Rng + ?Sized>(&mut self, slot: usize, rng: &mut R) -> (f64, f64) {
        self.player_slots.occupy(slot);
        let char = Char::spawn(rng);
        let position = (char.px, char.py);
        self.chars[slot] = Some(char);
        position
    }

    /// Frees `slot`. Outside a running game the char goes with it; during a
    /// game it stays on the table as an uncontrolled body.
    pub fn leave(&mut self, slot: usize) {
        self.player_slots.release(slot);
        if !self.is_running() {
            if let Some(entry) = self.chars.get_mut(slot) {
                *entry = None;
            }
        }
    }

    pub fn char(&self, id: usize) -> Option<&Char> {
        self.chars.get(id).and_then(Option::as_ref)
    }

    pub fn is_ai(&self, id: usize) -> bool {
        id < MAX_CHARS && !self.player_slots.is_occupied(id) && self.char(id).is_some()
    }

    /// Fills every table index for a new game: humans keep (or get) their
    /// char, all remaining indices become AI.
    ///
    /// Returns the AI ids, or nothing if the game was already set up.
    pub fn setup<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<usize> {
        if self.phase != GamePhase::NotStarted {
            return Vec::new();
        }

        let mut ai = Vec::with_capacity(MAX_CHARS);
        for id in 0..MAX_CHARS {
            if self.player_slots.is_occupied(id) {
                if self.chars[id].is_none() {
                    self.chars[id] = Some(Char::spawn(rng));
                }
            } else {
                self.chars[id] = Some(Char::spawn(rng));
                ai.push(id);
            }
        }
        ai
    }

    pub fn start(&mut self) {
        if self.phase == GamePhase::NotStarted {
            self.phase = GamePhase::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.phase == GamePhase::Running {
            self.phase = GamePhase::Ended;
        }
    }

    /// Applies input to a live char and returns its new state.
    pub fn apply_input(&mut self, id: usize, input: &InputState) -> Option<EntityUpdate> {
        let char = self.chars.get_mut(id)?.as_mut()?;
        if !char.apply_input(input) {
            return None;
        }
        Some(char.to_update(id as u32))
    }

    /// Adds a coin and returns its announcement.
    pub fn add_coin(&mut self, coin: Coin) -> ServerMessage {
        let index = self.coins.len() as u32;
        let message = ServerMessage::NewCoin {
            index,
            px: coin.px,
            py: coin.py,
            animation_offset: coin.animation_offset,
        };
        self.coins.push(coin);
        message
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    /// Runs one simulation tick.
    ///
    /// Does nothing unless the game is running.
    pub fn update(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        if !self.is_running() {
            return messages;
        }

        for id in 0..MAX_CHARS {
            let impact = match self.chars[id].as_mut() {
                Some(char) if !char.is_dead => {
                    let finished = char.advance_attack();
                    let impact = if finished {
                        char.impact_site(HIT_RADIUS)
                    } else {
                        None
                    };
                    char.step();
                    impact
                }
                _ => continue,
            };

            if let Some((x, y)) = impact {
                self.resolve_hits(id, x, y, &mut messages);
            }
        }

        self.collect_coins(&mut messages);

        let alive: Vec<usize> = self.alive_humans().collect();
        match alive.as_slice() {
            [survivor] => {
                info!("slot {} is the last one standing", survivor);
                messages.push(ServerMessage::GameEnd {
                    survivor_slot: *survivor as u32,
                    score: self.score.to_vec(),
                });
                self.phase = GamePhase::Ended;
            }
            // Every remaining player is dead; nobody to crown.
            [] => {
                info!("no players left alive, ending the game without a survivor");
                self.phase = GamePhase::Ended;
            }
            _ => {}
        }

        messages
    }

    fn resolve_hits(&mut self, attacker: usize, x: f64, y: f64, out: &mut Vec<ServerMessage>) {
        for slot in 0..MAX_CLIENTS {
            if slot == attacker || !self.player_slots.is_occupied(slot) {
                continue;
            }
            let Some(target) = self.chars[slot].as_mut() else {
                continue;
            };
            if target.is_dead || !is_hit(x, y, target.px, target.py, HIT_RADIUS) {
                continue;
            }

            target.is_dead = true;
            target.vx = 0;
            target.vy = 0;
            debug!("char {} killed slot {}", attacker, slot);
            out.push(ServerMessage::UpdateEntity(target.to_update(slot as u32)));
        }
    }

    fn collect_coins(&mut self, out: &mut Vec<ServerMessage>) {
        for (index, coin) in self.coins.iter_mut().enumerate() {
            if coin.picked_up {
                continue;
            }

            let finder = self.player_slots.occupied().find(|&slot| {
                self.chars[slot].as_ref().map_or(false, |char| {
                    !char.is_dead && is_hit(coin.px, coin.py, char.px, char.py, coin.pickup_radius)
                })
            });

            if let Some(slot) = finder {
                if coin.pick_up() {
                    self.score[slot] += 1;
                    out.push(ServerMessage::CoinGot {
                        index: index as u32,
                    });
                }
            }
        }
    }

    fn alive_humans(&self) -> impl Iterator<Item = usize> + '_ {
        self.player_slots.occupied().filter(move |&slot| {
            self.chars[slot]
                .as_ref()
                .map_or(false, |char| !char.is_dead)
        })
    }

    /// Full state of every live char.
    pub fn snapshot(&self) -> Vec<EntityUpdate> {
        self.chars
            .iter()
            .enumerate()
            .filter_map(|(id, char)| match char {
                Some(char) if !char.is_dead => Some(char.to_update(id as u32)),
                _ => None,
            })
            .collect()
    }

    pub fn positions(&self) -> Positions {
        self.chars
            .iter()
            .map(|char| match char {
                Some(char) if !char.is_dead => Some((char.px, char.py)),
                _ => None,
            })
            .collect()
    }

    pub fn score(&self) -> &[i32] {
        &self.score
    }

    #[cfg(test)]
    pub(crate) fn char_mut(&mut self, id: usize) -> Option<&mut Char> {
        self.chars.get_mut(id).and_then(Option::as_mut)
    }
}
