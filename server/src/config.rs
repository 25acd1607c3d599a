use clap::Parser;
use std::time::Duration;

/// Runtime settings for the arena server.
///
/// Parsed from the command line by the binary; `Default` yields the same
/// values as running with no flags.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on (0 picks a free port)
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Simulation ticks per second
    #[arg(
        short,
        long,
        default_value_t = arena_shared::TICK_RATE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub tick_rate: u32,

    /// Interval between keepalive pings, in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub ping_period_ms: u64,

    /// Drop a connection after this long without any frame from the peer
    #[arg(long, default_value_t = 10_000)]
    pub pong_wait_ms: u64,

    /// Messages buffered per connection before it counts as unresponsive
    #[arg(long, default_value_t = 256)]
    pub outbound_capacity: usize,

    /// Largest inbound message accepted from a client, in bytes
    #[arg(long, default_value_t = 512)]
    pub max_message_size: usize,

    /// Upper bound on how long an AI idles before picking a direction
    #[arg(long, default_value_t = 3_000)]
    pub ai_think_max_ms: u64,

    /// Upper bound on how long an AI keeps walking
    #[arg(long, default_value_t = 2_000)]
    pub ai_walk_max_ms: u64,

    /// Upper bound on the pause between coin spawns
    #[arg(long, default_value_t = 5_000)]
    pub coin_interval_max_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["arena-server"])
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_period_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    pub fn ai_think_max(&self) -> Duration {
        Duration::from_millis(self.ai_think_max_ms)
    }

    pub fn ai_walk_max(&self) -> Duration {
        Duration::from_millis(self.ai_walk_max_ms)
    }

    pub fn coin_interval_max(&self) -> Duration {
        Duration::from_millis(self.coin_interval_max_ms)
    }
}
