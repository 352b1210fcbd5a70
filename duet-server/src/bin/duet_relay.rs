use anyhow::Result;
use clap::Parser;
use duet_server::{AppState, RelayConfig, RendezvousRegistry, SignalRelay, router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "duet-relay")]
#[command(about = "Rendezvous relay for two-party duet sessions")]
struct Args {
    /// Address to serve the signaling WebSocket on.
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();
    let config = RelayConfig::from_env();
    info!("Handing out {} ICE server(s)", config.ice_servers.len());

    let registry = Arc::new(RendezvousRegistry::new());
    let relay = Arc::new(SignalRelay::new(registry));

    let app = router(AppState {
        relay,
        ice_servers: config.ice_servers,
    });

    info!("Relay listening on http://{}", args.listen);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
