use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionConfig, SessionId};
use crate::error::ServerResult;
use crate::hub::{Hub, HubHandle};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Accepts WebSocket clients and hands them to the hub.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Server { listener, config })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Starts the hub and accepts connections until the task is dropped.
    pub async fn run(self) -> ServerResult<()> {
        let (hub, handle) = Hub::new(self.config.clone());
        tokio::spawn(hub.run());

        let connection_config = ConnectionConfig::from(&self.config);
        let mut next_session: SessionId = 1;

        info!("Server started successfully");
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            let session = next_session;
            next_session += 1;
            debug!("accepted {} as session {}", addr, session);

            tokio::spawn(serve_connection(
                stream,
                session,
                connection_config.clone(),
                handle.clone(),
            ));
        }
    }
}

/// Drives one client from handshake to unregistration.
async fn serve_connection(
    stream: TcpStream,
    session: SessionId,
    config: ConnectionConfig,
    hub: HubHandle,
) {
    let connection = match Connection::accept(stream, session, config).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("handshake with session {} failed: {}", session, e);
            return;
        }
    };

    if let Err(e) = hub.register(connection.handle()).await {
        error!("could not register session {}: {}", session, e);
        return;
    }

    let reason = connection.listen(hub.sender()).await;
    debug!("session {} closed: {:?}", session, reason);

    if hub.unregister(session).await.is_err() {
        debug!("hub gone before session {} unregistered", session);
    }
}
