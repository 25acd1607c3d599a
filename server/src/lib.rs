//! # Arena Server Library
//!
//! Authoritative server for a small real-time arena game. Up to eight humans
//! share one world with a crowd of wandering AI characters; attacks kill,
//! coins score, and the last human standing wins.
//!
//! ## Architecture
//!
//! ### Single-Writer Hub
//! One coordinator task (`hub`) owns the client registry and the `World`.
//! Connection tasks, AI controllers, the coin spawner and the simulation
//! driver never share memory with it; they post messages onto bounded queues
//! and the hub handles them one at a time, so every client sees the same
//! events in the same order.
//!
//! ### Connections
//! Each client is a WebSocket (`connection`) with a read pump feeding the hub
//! and a write pump draining a bounded outbound queue. A client whose queue
//! fills up is disconnected rather than allowed to stall everybody else.
//!
//! ### Fixed Timestep
//! The simulation driver (`simulation`) converts wall time into whole 60 Hz
//! ticks. Slow wakes produce catch-up ticks, fast wakes produce none, so the
//! game runs at the same speed however the scheduler behaves.
//!
//! ## Module Organization
//!
//! - `config`: command line and defaults
//! - `connection`: WebSocket pumps, keepalive and latency
//! - `hub`: the coordinator and its event types
//! - `world`: game state and the per-tick update
//! - `slots`: human slot allocation
//! - `simulation`: fixed-timestep driver
//! - `ai`, `coins`: background tasks of a running game
//! - `shutdown`: cancellation of those tasks
//! - `network`: TCP accept loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use arena_server::config::ServerConfig;
//! use arena_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod coins;
pub mod config;
pub mod connection;
pub mod error;
pub mod hub;
pub mod network;
pub mod shutdown;
pub mod simulation;
pub mod slots;
pub mod world;
