use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Runtime configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub frontend_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: String,
    pub gemini_model: String,
    pub gemini_live_model: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        fn string_env(name: &str, default: &str) -> String {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
        }
        let bind = string_env("HUB_BIND_ADDR", "0.0.0.0:8080");
        let bind_addr = bind.parse().with_context(|| format!("HUB_BIND_ADDR is not a socket address: {bind}"))?;
        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(string_env("HUB_DATA_DIR", "data")),
            frontend_url: string_env("FRONTEND_URL", "http://localhost:5173"),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            gemini_endpoint: string_env("GEMINI_ENDPOINT", "https://generativelanguage.googleapis.com"),
            gemini_model: string_env("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_live_model: string_env("GEMINI_LIVE_MODEL", "gemini-2.5-flash-native-audio-preview-09-2025"),
        })
    }
}
