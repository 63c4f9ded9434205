//! Server configuration from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// 6574 spells "AB" in ASCII, the first two letters of a word association
pub const DEFAULT_PORT: u16 = 6574;
pub const DEFAULT_LANG: &str = "en";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Newline-delimited prompt deck; the built-in deck is used when unset
    pub prompts_file: Option<PathBuf>,
    /// Locale for rooms created without one
    pub default_lang: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            prompts_file: None,
            default_lang: DEFAULT_LANG.to_string(),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ServerConfig {
    /// Read `STRIKESIKE_BIND`, `STRIKESIKE_PORT`, `PROMPTS_FILE` and `DEFAULT_LANG`.
    /// Unparseable values fall back to the defaults with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind = match env_var("STRIKESIKE_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Invalid STRIKESIKE_BIND '{}': {}, using {}", raw, e, defaults.bind);
                defaults.bind
            }),
            None => defaults.bind,
        };

        let port = match env_var("STRIKESIKE_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Invalid STRIKESIKE_PORT '{}': {}, using {}", raw, e, defaults.port);
                defaults.port
            }),
            None => defaults.port,
        };

        let prompts_file = env_var("PROMPTS_FILE").map(PathBuf::from);
        let default_lang = env_var("DEFAULT_LANG")
            .map(|lang| lang.to_lowercase())
            .unwrap_or(defaults.default_lang);

        Self {
            bind,
            port,
            prompts_file,
            default_lang,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
