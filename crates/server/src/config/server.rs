use serde::Deserialize;

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Graceful shutdown timeout in seconds.
    ///
    /// Upper bound on the wait for in-flight uploads once the listener has
    /// stopped accepting connections.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    5000
}

/// Limits applied to `POST /upload`.
#[derive(Debug, Deserialize)]
pub struct UploadConfig {
    /// Multipart field carrying the file.
    #[serde(default = "default_field_name")]
    pub field_name: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            field_name: default_field_name(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_field_name() -> String {
    "image".to_owned()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}
