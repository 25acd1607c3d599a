//! Per-connection WebSocket plumbing.
//!
//! Each connection runs two pumps until one of them gives up:
//! - the read pump forwards every payload from the peer, tagged with the
//!   session id, and watches for silence longer than `pong_wait`
//! - the write pump drains the bounded outbound queue and sends a timestamped
//!   keepalive ping every `ping_period`; the matching pong gives the
//!   round-trip latency
//!
//! Whoever holds the `ConnectionHandle`s owns the connection's lifetime: once
//! the last handle is dropped the write pump closes the socket.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type SessionId = u64;

/// Encoded message shared between every queue it is fanned out to.
pub type Frame = Arc<[u8]>;

const LATENCY_UNKNOWN: u64 = u64::MAX;

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub outbound_capacity: usize,
    pub ping_period: Duration,
    pub pong_wait: Duration,
    /// Only enforced on accepted (server side) connections.
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for ConnectionConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            outbound_capacity: config.outbound_capacity,
            ping_period: config.ping_period(),
            pong_wait: config.pong_wait(),
            max_message_size: config.max_message_size,
        }
    }
}

/// A payload received from a peer.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub session: SessionId,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Close frame or end of stream.
    PeerClosed,
    ReadError,
    /// Nothing heard from the peer within `pong_wait`.
    Timeout,
    WriteError,
    /// The keepalive ping could not be sent.
    KeepaliveFailed,
    /// Every handle was dropped.
    Released,
    /// Nobody is consuming inbound payloads any more.
    InboundClosed,
}

/// Cheap, cloneable sending side of a connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: SessionId,
    outbound: mpsc::Sender<Frame>,
    latency_micros: Arc<AtomicU64>,
}

impl ConnectionHandle {
    /// A handle whose outbound queue is read directly through the returned
    /// receiver instead of a socket.
    pub fn detached(id: SessionId, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id,
            outbound: tx,
            latency_micros: Arc::new(AtomicU64::new(LATENCY_UNKNOWN)),
        };
        (handle, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queues a frame without waiting.
    ///
    /// A full queue means the peer is not keeping up; the caller is expected
    /// to drop the connection rather than retry.
    pub fn send(&self, frame: Frame) -> ServerResult<()> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => ServerError::Backpressure,
            TrySendError::Closed(_) => ServerError::Closed,
        })
    }

    /// Last measured keepalive round trip.
    pub fn latency(&self) -> Option<Duration> {
        match self.latency_micros.load(Ordering::Relaxed) {
            LATENCY_UNKNOWN => None,
            micros => Some(Duration::from_micros(micros)),
        }
    }
}

pub struct Connection<S> {
    ws: WebSocketStream<S>,
    config: ConnectionConfig,
    handle: ConnectionHandle,
    outbound: mpsc::Receiver<Frame>,
}

impl Connection<TcpStream> {
    /// Performs the server side of the WebSocket handshake.
    pub async fn accept(
        stream: TcpStream,
        id: SessionId,
        config: ConnectionConfig,
    ) -> ServerResult<Self> {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(config.max_message_size);
        ws_config.max_frame_size = Some(config.max_message_size);

        let ws = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await?;
        Ok(Self::from_stream(ws, id, config))
    }
}

impl Connection<MaybeTlsStream<TcpStream>> {
    /// Opens a client connection to `url` (e.g. `ws://127.0.0.1:8080/ws`).
    pub async fn dial(url: &str, config: ConnectionConfig) -> ServerResult<Self> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self::from_stream(ws, 0, config))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn from_stream(ws: WebSocketStream<S>, id: SessionId, config: ConnectionConfig) -> Self {
        let (handle, outbound) = ConnectionHandle::detached(id, config.outbound_capacity);
        Self {
            ws,
            config,
            handle,
            outbound,
        }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Runs both pumps until either stops and reports why.
    ///
    /// The connection keeps no handle of its own, so it lives exactly as
    /// long as the handles given out before this call.
    pub async fn listen<T>(self, inbound: mpsc::Sender<T>) -> DisconnectReason
    where
        T: From<Inbound>,
    {
        let Connection {
            ws,
            config,
            handle,
            outbound,
        } = self;
        let id = handle.id;
        let latency = Arc::clone(&handle.latency_micros);
        drop(handle);

        let started = Instant::now();
        let (sink, stream) = ws.split();

        let reason = tokio::select! {
            reason = read_pump(id, stream, inbound, config.pong_wait, started, latency) => reason,
            reason = write_pump(sink, outbound, config.ping_period, started) => reason,
        };
        debug!("session {} pumps stopped: {:?}", id, reason);
        reason
    }
}

async fn read_pump<S, T>(
    id: SessionId,
    mut stream: SplitStream<WebSocketStream<S>>,
    inbound: mpsc::Sender<T>,
    pong_wait: Duration,
    started: Instant,
    latency: Arc<AtomicU64>,
) -> DisconnectReason
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: From<Inbound>,
{
    loop {
        let next = match timeout(pong_wait, stream.next()).await {
            Ok(next) => next,
            Err(_) => return DisconnectReason::Timeout,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                debug!("session {} read error: {}", id, e);
                return DisconnectReason::ReadError;
            }
            None => return DisconnectReason::PeerClosed,
        };

        let payload = match message {
            Message::Binary(payload) => payload,
            Message::Text(text) => text.into_bytes(),
            Message::Pong(payload) => {
                record_latency(id, &payload, started, &latency);
                continue;
            }
            Message::Ping(_) | Message::Frame(_) => continue,
            Message::Close(_) => return DisconnectReason::PeerClosed,
        };

        let message = Inbound {
            session: id,
            payload,
        };
        if inbound.send(T::from(message)).await.is_err() {
            return DisconnectReason::InboundClosed;
        }
    }
}

async fn write_pump<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut outbound: mpsc::Receiver<Frame>,
    ping_period: Duration,
    started: Instant,
) -> DisconnectReason
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut keepalive = interval_at(Instant::now() + ping_period, ping_period);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if sink.send(Message::Binary(frame.to_vec())).await.is_err() {
                        return DisconnectReason::WriteError;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return DisconnectReason::Released;
                }
            },
            _ = keepalive.tick() => {
                let stamp = started.elapsed().as_micros() as u64;
                if sink.send(Message::Ping(stamp.to_be_bytes().to_vec())).await.is_err() {
                    return DisconnectReason::KeepaliveFailed;
                }
            }
        }
    }
}

fn record_latency(id: SessionId, payload: &[u8], started: Instant, latency: &AtomicU64) {
    let Ok(bytes) = <[u8; 8]>::try_from(payload) else {
        return;
    };
    let sent = u64::from_be_bytes(bytes);
    let now = started.elapsed().as_micros() as u64;
    if let Some(rtt) = now.checked_sub(sent) {
        latency.store(rtt, Ordering::Relaxed);
        debug!("session {} rtt {}us", id, rtt);
    }
}
