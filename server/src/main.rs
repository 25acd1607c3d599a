use arena_server::config::ServerConfig;
use arena_server::network::Server;
use clap::Parser;
use log::info;

/// Parses command-line arguments, binds the listener and serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    info!(
        "Starting arena server on {} at {} ticks per second",
        config.address(),
        config.tick_rate
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
