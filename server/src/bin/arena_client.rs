use arena_server::ai::wander;
use arena_server::connection::{Connection, ConnectionConfig, ConnectionHandle, Frame, Inbound};
use arena_shared::{Char, ClientMessage, InputState, ServerMessage, MAX_CHARS, TICK_RATE};
use clap::Parser;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Connects to an arena server and prints what it says.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Send StartGame once connected (only honoured for the host)
    #[arg(long)]
    start: bool,

    /// Walk around randomly, changing direction every this many milliseconds.
    /// Directions are picked from a locally extrapolated position, so they
    /// can drift from the server's view between updates.
    #[arg(long)]
    wander_ms: Option<u64>,
}

struct Client {
    handle: ConnectionHandle,
    slot: Option<usize>,
    chars: Vec<Option<Char>>,
    rng: StdRng,
}

impl Client {
    fn send(&self, message: &ClientMessage) {
        let bytes = match message.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", message, e);
                return;
            }
        };
        if let Err(e) = self.handle.send(Frame::from(bytes)) {
            warn!("Failed to send {:?}: {}", message, e);
        }
    }

    fn handle_message(&mut self, message: ServerMessage, start: bool) {
        match &message {
            ServerMessage::ConnectResponse {
                slot, is_host, ..
            } => {
                info!("Connected as slot {} (host: {})", slot, is_host);
                self.slot = Some(*slot as usize);
                if start && *is_host {
                    self.send(&ClientMessage::StartGame);
                }
            }
            ServerMessage::GameStart => {
                info!("Game started");
                self.send(&ClientMessage::WorldUpdate);
            }
            ServerMessage::UpdateEntity(update) => {
                if let Some(entry) = self.chars.get_mut(update.index as usize) {
                    match entry {
                        Some(char) => char.apply_update(update),
                        None => *entry = Some(Char::from(update)),
                    }
                }
                if update.is_dead && Some(update.index as usize) == self.slot {
                    info!("We were killed");
                }
            }
            ServerMessage::UpdateEntities(updates) => {
                for update in updates {
                    if let Some(entry) = self.chars.get_mut(update.index as usize) {
                        *entry = Some(Char::from(update));
                    }
                }
                info!("Snapshot of {} entities", updates.len());
            }
            ServerMessage::GameEnd {
                survivor_slot,
                score,
            } => {
                info!("Game over, slot {} survived, score {:?}", survivor_slot, score);
            }
            _ => info!("{:?}", message),
        }
        debug!("{} handled", message.kind());
    }

    /// Moves every known char one tick, mirroring the server between updates.
    fn step(&mut self) {
        for char in self.chars.iter_mut().flatten() {
            char.step();
        }
    }

    fn own_char(&self) -> Option<&Char> {
        self.slot
            .and_then(|slot| self.chars.get(slot))
            .and_then(Option::as_ref)
    }

    fn wander(&mut self) {
        let Some((px, py)) = self.own_char().map(|char| (char.px, char.py)) else {
            return;
        };
        let (fx, fy) = wander(&mut self.rng, px, py);
        match InputState::from_axes(fx, fy) {
            Ok(input) => self.send(&ClientMessage::Input(input)),
            Err(e) => warn!("{}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let url = format!("ws://{}:{}/ws", args.host, args.port);
    info!("Connecting to {}", url);

    let connection = Connection::dial(&url, ConnectionConfig::default()).await?;
    let mut client = Client {
        handle: connection.handle(),
        slot: None,
        chars: vec![None; MAX_CHARS],
        rng: StdRng::from_entropy(),
    };

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<Inbound>(256);
    let mut listener = tokio::spawn(connection.listen(inbound_tx));

    let period = Duration::from_millis(args.wander_ms.unwrap_or(1_000).max(1));
    let mut wander_timer = interval(period);
    let mut step_timer = interval(Duration::from_secs(1) / TICK_RATE);

    loop {
        tokio::select! {
            inbound = inbound_rx.recv() => {
                let Some(inbound) = inbound else { break };
                match ServerMessage::decode(&inbound.payload) {
                    Ok(message) => client.handle_message(message, args.start),
                    Err(e) => warn!("Undecodable message: {}", e),
                }
            }
            _ = step_timer.tick(), if args.wander_ms.is_some() => client.step(),
            _ = wander_timer.tick(), if args.wander_ms.is_some() => client.wander(),
            reason = &mut listener => {
                info!("Connection closed: {:?}", reason?);
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, disconnecting");
                break;
            }
        }
    }

    Ok(())
}
