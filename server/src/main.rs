use clap::Parser;
use connect4_server::{Server, ServerConfig};
use log::{error, info};
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Maximum concurrent connections
    #[clap(short, long, default_value = "1024")]
    max_connections: usize,
    /// Seconds between public room list refreshes
    #[clap(long, default_value = "3")]
    public_refresh_secs: u64,
    /// Chat messages allowed per connection per minute
    #[clap(long, default_value = "30")]
    chat_limit: usize,
    /// Additional word to mask in chat, may be repeated
    #[clap(long = "blocked-word")]
    blocked_words: Vec<String>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            max_connections: args.max_connections,
            public_refresh: Duration::from_secs(args.public_refresh_secs.max(1)),
            chat_limit: args.chat_limit,
            blocked_words: args.blocked_words,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());
    let mut server = Server::new(&config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Server stopped: {}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
