use clap::builder::BoolishValueParser;
use clap::{ ArgAction, Parser };
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_KEY is not set; the upstream completion service cannot be called without it")]
    MissingApiKey,
    #[error("Both --tls-cert-path and --tls-key-path must be provided to enable TLS")]
    IncompleteTls,
    #[error("Invalid listen address '{0}': {1}")]
    InvalidAddress(String, std::net::AddrParseError),
}

#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Upstream Completion Args ---
    /// API key for the upstream chat completion service (required)
    #[arg(long, env = "API_KEY")]
    pub api_key: Option<String>,

    /// Model identifier sent with every completion request
    #[arg(long, env = "MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Root of the OpenAI-compatible API (the client appends /chat/completions)
    #[arg(long, env = "BASE_URL", default_value = "https://api.openai.com/v1")]
    pub base_url: String,

    /// Maximum number of tokens the upstream may generate per reply
    #[arg(long, env = "MAX_TOKENS", default_value = "500")]
    pub max_tokens: u32,

    /// Sampling temperature for the upstream model
    #[arg(long, env = "TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Seconds to wait for the upstream before giving up
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    // --- Server Args ---
    /// Interface the HTTP server binds to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Secret used by the web layer for signing; only validated at startup
    #[arg(long, env = "SECRET_KEY", default_value = DEV_SECRET_KEY)]
    pub secret_key: String,

    /// Enable debug logging and verbose error responses (accepts 1/0, on/off, yes/no, true/false)
    #[arg(
        long,
        env = "DEBUG",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    /// Serve HTTPS using --tls-cert-path and --tls-key-path
    #[arg(
        long,
        env = "ENABLE_TLS",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub enable_tls: bool,
}

// Hand-written so secrets never end up in logs.
impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secret_key", &"<redacted>")
            .field("debug", &self.debug)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("enable_tls", &self.enable_tls)
            .finish()
    }
}

impl Args {
    /// Returns the upstream credential, rejecting a missing or blank value.
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidAddress(raw, e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Certificate and key paths when TLS is switched on.
    pub fn tls_paths(&self) -> Result<Option<(String, String)>, ConfigError> {
        if !self.enable_tls {
            return Ok(None);
        }
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Ok(Some((cert.clone(), key.clone()))),
            _ => Err(ConfigError::IncompleteTls),
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY || self.secret_key.trim().is_empty()
    }
}
