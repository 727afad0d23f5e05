// ===============================
// src/main.rs
// ===============================
/*
 cargo run -- --url ws://localhost:8080/ws

 # status koneksi & trafik
curl -s localhost:9899/metrics | egrep '^oms_(ws_connected|ws_reconnects_total|decode_errors_total)'
curl -s localhost:9899/metrics | grep '^oms_frames_in_total'

*/
/*
=============================================================================
Project : oms_dashboard — terminal monitor & order entry for an OMS gateway
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Connects to an OMS WebSocket gateway, mirrors instruments,
          accounts, orders and executions, derives positions, shows one
          live order book, validates order tickets, exports CSV, exposes
          Prometheus metrics, and records JSONL traffic.
=============================================================================
*/
mod app;
mod book;
mod codec;
mod commands;
mod config;
mod domain;
mod entry;
mod export;
mod format;
mod metrics;
mod positions;
mod recorder;
mod session;
mod store;
mod view;

use anyhow::Context;
use tokio::{sync::mpsc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::recorder::JournalEntry;
use crate::session::{SessionConfig, SessionEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---- Logging (stderr; stdout belongs to the dashboard) ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // ---- Config ----
    let args = config::load();
    let url = args.ws_url().context("startup config")?;

    info!(
        url = %url,
        reconnect_ms = args.reconnect_ms,
        max_executions = args.max_executions,
        book_depth = args.book_depth,
        refresh_ms = args.refresh_ms,
        metrics_port = args.metrics_port,
        record_file = ?args.record_file,
        headless = args.headless,
        "startup config"
    );

    // ---- Metrics ----
    metrics::init();
    if args.metrics_port != 0 {
        metrics::serve_metrics(args.metrics_port);
    }

    // ---- Recorder (optional) ----
    let journal_tx = args.record_file.clone().map(|path| {
        let (tx, rx) = mpsc::channel::<JournalEntry>(8192);
        tokio::spawn(recorder::run(rx, path));
        tx
    });

    // ---- Session ----
    let (ev_tx, ev_rx) = mpsc::channel::<SessionEvent>(4096);
    let handle = session::spawn(
        SessionConfig { url, reconnect_delay: Duration::from_millis(args.reconnect_ms) },
        ev_tx,
    );

    // ---- Dashboard (runs until quit / ctrl-c) ----
    let cfg = app::DashboardCfg {
        max_executions: usize::try_from(args.max_executions).context("max executions")?,
        book_depth: usize::try_from(args.book_depth).context("book depth")?,
        refresh: Duration::from_millis(args.refresh_ms),
        headless: args.headless,
    };
    app::run(cfg, handle, ev_rx, journal_tx).await;
    Ok(())
}
