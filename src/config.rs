// src/config.rs - Environment-driven configuration
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub trades_table: String,
    pub host: String,
    pub port: u16,
    pub ws_port: u16,
    pub enable_realtime: bool,
    pub allowed_origin: String,
}

impl Config {
    /// Reads configuration from the environment. `SUPABASE_URL` and
    /// `SUPABASE_ANON_KEY` are required, everything else has defaults.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")?,
            trades_table: env::var("TRADES_TABLE").unwrap_or_else(|_| "trades".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            ws_port: env::var("WS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8083),
            enable_realtime: env::var("ENABLE_REALTIME")
                .unwrap_or_else(|_| "true".to_string())
                .trim()
                .to_lowercase()
                == "true",
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        })
    }
}
