//! Gait analysis server: one session per TCP connection.
//!
//! Usage: gait_server [config.toml]

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use nordic_gait::config::{AnalysisConfig, Config};
use nordic_gait::error::GaitError;
use nordic_gait::logging;
use nordic_gait::protocol::{message_stream, recv_message, send_message, ClientMessage};
use nordic_gait::runner::handle_event;
use nordic_gait::session::Session;

const DEFAULT_CONFIG: &str = "gait_server.toml";

async fn serve_client(stream: TcpStream, analysis: AnalysisConfig) -> Result<()> {
    let mut messages = message_stream(stream);
    let mut session = Session::new(&analysis);

    loop {
        let msg: ClientMessage = match recv_message(&mut messages).await {
            Ok(msg) => msg,
            Err(e) => {
                let (closed, malformed) = match e.downcast_ref::<GaitError>() {
                    Some(GaitError::ConnectionClosed) => (true, false),
                    Some(GaitError::Decode(_)) => (false, true),
                    _ => (false, false),
                };
                if closed {
                    return Ok(());
                }
                if malformed {
                    warn!("rejected malformed message: {}", e);
                    continue;
                }
                return Err(e);
            }
        };

        if let Some(reply) = handle_event(&mut session, msg.into()).into_message() {
            send_message(&mut messages, &reply).await?;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path)?;
    logging::init(&config.log)?;

    info!("Gait server ({})", env!("CARGO_PKG_VERSION"));
    info!(
        "View: {}, {} px/cm, {}x{}, pole model {:?}",
        config.analysis.view,
        config.analysis.pixels_per_cm,
        config.analysis.frame_width,
        config.analysis.frame_height,
        config.analysis.pole_model,
    );

    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!("Listening on {}", config.server.listen_addr);

    loop {
        let (tcp_stream, addr) = listener.accept().await?;
        tcp_stream.set_nodelay(true)?;
        info!("Client connected: {}", addr);

        let analysis = config.analysis.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_client(tcp_stream, analysis).await {
                warn!("client {}: {:#}", addr, e);
            }
            info!("Client disconnected: {}", addr);
        });
    }
}
