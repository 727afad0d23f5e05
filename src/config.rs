// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : oms_dashboard — terminal monitor & order entry for an OMS gateway
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Connects to an OMS WebSocket gateway, mirrors instruments,
          accounts, orders and executions, derives positions, shows one
          live order book, validates order tickets, exports CSV, exposes
          Prometheus metrics, and records JSONL traffic.
=============================================================================
*/
use clap::Parser;
use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

use crate::book::DEFAULT_BOOK_DEPTH;
use crate::session::DEFAULT_RECONNECT_DELAY;
use crate::store::DEFAULT_MAX_EXECUTIONS;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid gateway url `{url}`: {source}")]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("gateway url must be ws:// or wss://, got `{0}`")]
    Scheme(String),
}

/// Urutan: .env -> env var -> flag CLI (flag menang).
#[derive(Parser, Clone, Debug)]
#[command(name = "oms_dashboard", version, about = "Terminal dashboard for an OMS gateway")]
pub struct Args {
    /// Gateway endpoint
    #[arg(long, env = "OMS_WS_URL", default_value = DEFAULT_WS_URL)]
    pub url: String,

    /// Fixed delay before a reconnect attempt
    #[arg(long, env = "RECONNECT_MS", default_value_t = DEFAULT_RECONNECT_DELAY.as_millis() as u64)]
    pub reconnect_ms: u64,

    /// Execution log cap (oldest evicted)
    #[arg(long, env = "MAX_EXECUTIONS", default_value_t = DEFAULT_MAX_EXECUTIONS as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_executions: u64,

    /// Book levels shown per side
    #[arg(long, env = "BOOK_DEPTH", default_value_t = DEFAULT_BOOK_DEPTH as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub book_depth: u64,

    /// Redraw / staleness tick
    #[arg(long, env = "REFRESH_MS", default_value_t = 2000, value_parser = clap::value_parser!(u64).range(100..))]
    pub refresh_ms: u64,

    /// Prometheus exporter port (0 disables)
    #[arg(long, env = "METRICS_PORT", default_value_t = 9899)]
    pub metrics_port: u16,

    /// Append inbound/outbound traffic as JSONL
    #[arg(long, env = "RECORD_FILE")]
    pub record_file: Option<String>,

    /// No screen redraws; commands and logs only
    #[arg(long, env = "HEADLESS")]
    pub headless: bool,
}

impl Args {
    pub fn ws_url(&self) -> Result<Url, ConfigError> {
        parse_ws_url(&self.url)
    }
}

pub fn parse_ws_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::BadUrl { url: raw.to_string(), source })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::Scheme(other.to_string())),
    }
}

pub fn load() -> Args {
    // Pastikan .env dibaca sebelum clap melihat env var
    let _ = dotenv();
    Args::parse()
}
