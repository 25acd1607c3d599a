//! Logical messages exchanged over a connection and their binary encoding.
//!
//! One message travels per WebSocket binary frame. The byte layout is plain
//! `bincode` of the enums below; both ends must agree on the variant order.

use crate::error::{Error, Result};
use crate::input::InputState;
use serde::{Deserialize, Serialize};

/// Full state of one character as broadcast to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    /// Slot for human characters, table index for AI.
    pub index: u32,
    pub fx: i32,
    pub fy: i32,
    pub vx: i32,
    pub vy: i32,
    pub px: f64,
    pub py: f64,
    pub speed: i32,
    pub attack_frame: u32,
    pub is_dead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    ConnectResponse {
        slot: u32,
        is_host: bool,
        px: f64,
        py: f64,
    },
    ConnectError {
        message: String,
    },
    UpdateLobby {
        connected_slots: Vec<bool>,
        host_slot: Option<u32>,
    },
    UpdateEntity(EntityUpdate),
    UpdateEntities(Vec<EntityUpdate>),
    GameStart,
    GameEnd {
        survivor_slot: u32,
        score: Vec<i32>,
    },
    PlayerDisconnected {
        slot: u32,
    },
    NewHost {
        slot: u32,
    },
    NewCoin {
        index: u32,
        px: f64,
        py: f64,
        animation_offset: i32,
    },
    CoinGot {
        index: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Input(InputState),
    StartGame,
    /// Asks for a full entity snapshot.
    WorldUpdate,
}

impl ServerMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Error::Decode)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ConnectResponse { .. } => "ConnectResponse",
            ServerMessage::ConnectError { .. } => "ConnectError",
            ServerMessage::UpdateLobby { .. } => "UpdateLobby",
            ServerMessage::UpdateEntity(_) => "UpdateEntity",
            ServerMessage::UpdateEntities(_) => "UpdateEntities",
            ServerMessage::GameStart => "GameStart",
            ServerMessage::GameEnd { .. } => "GameEnd",
            ServerMessage::PlayerDisconnected { .. } => "PlayerDisconnected",
            ServerMessage::NewHost { .. } => "NewHost",
            ServerMessage::NewCoin { .. } => "NewCoin",
            ServerMessage::CoinGot { .. } => "CoinGot",
        }
    }
}

impl ClientMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Error::Decode)
    }
}
