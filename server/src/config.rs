use std::time::Duration;

/// Runtime settings for the network server and gateway
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    /// How often the public room directory snapshot is rebuilt
    pub public_refresh: Duration,
    /// Chat messages admitted per connection within `chat_window`
    pub chat_limit: usize,
    pub chat_window: Duration,
    /// Extra words masked by the chat filter
    pub blocked_words: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_connections: 1024,
            public_refresh: Duration::from_secs(3),
            chat_limit: 30,
            chat_window: Duration::from_secs(60),
            blocked_words: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
