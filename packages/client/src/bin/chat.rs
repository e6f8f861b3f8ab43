//! Terminal chat client for the Agora forum.
//!
//! Connects to the chat endpoint with a bearer token, joins a room and sends
//! every typed line to it. There is no automatic reconnect; use `/reconnect`
//! after the connection drops.
//!
//! Run with:
//! ```not_rust
//! AGORA_TOKEN=... cargo run --bin agora-chat -- --room general
//! cargo run --bin agora-chat -- -t <token> -u ws://127.0.0.1:8080/ws/chat
//! ```

use clap::Parser;

use agora_client::{
    ChatConfig,
    config::DEFAULT_ENDPOINT,
    connection::{EnvCredentialSource, StaticToken},
    console::run_console,
    domain::RoomId,
};
use agora_shared::logger::setup_logger;

const TOKEN_VARIABLE: &str = "AGORA_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "agora-chat")]
#[command(about = "Real-time chat client for the Agora forum", long_about = None)]
struct Args {
    /// WebSocket chat endpoint
    #[arg(short = 'u', long, default_value = DEFAULT_ENDPOINT)]
    url: String,

    /// Bearer token issued at sign-in; read from AGORA_TOKEN on each connect when omitted
    #[arg(short = 't', long)]
    token: Option<String>,

    /// Room to join once connected
    #[arg(short = 'r', long, default_value = "general")]
    room: String,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logger("agora_client", env!("CARGO_BIN_NAME"), &args.log_level);

    let room = match RoomId::new(args.room) {
        Ok(room) => room,
        Err(e) => {
            tracing::error!("Invalid room: {}", e);
            std::process::exit(1);
        }
    };
    let config = ChatConfig::default().with_endpoint(args.url);

    let result = match args.token {
        Some(token) => run_console(config, StaticToken::new(token), room).await,
        None => run_console(config, EnvCredentialSource::new(TOKEN_VARIABLE), room).await,
    };
    if let Err(e) = result {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
