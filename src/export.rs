// ===============================
// src/export.rs (execution blotter -> CSV)
// ===============================
use ahash::AHashMap as HashMap;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::domain::{ExecKind, Execution, Order, OrderId};
use crate::format::format_iso;
use crate::view::exec_details;

pub const HEADERS: [&str; 11] = [
    "Time", "ExecID", "Type", "Symbol", "OrderID", "Side", "LastQty", "LastPx", "OrdStatus",
    "Market", "Details",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Quote a field when it holds a comma, quote, CR or LF; inner quotes doubled.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(exec: &Execution, orders: &HashMap<OrderId, Order>) -> Vec<String> {
    let order = orders.get(&exec.order_id);
    let (last_qty, last_px) = match &exec.kind {
        ExecKind::Trade { last_qty, last_px, .. } => (last_qty.to_string(), last_px.to_string()),
        _ => (String::new(), String::new()),
    };
    vec![
        format_iso(exec.transact_time),
        exec.exec_id.to_string(),
        exec.exec_type().as_str().to_string(),
        order.map(|o| o.symbol.clone()).unwrap_or_default(),
        exec.order_id.to_string(),
        order.map(|o| o.side.as_str().to_string()).unwrap_or_default(),
        last_qty,
        last_px,
        exec.order_status.as_str().to_string(),
        exec.market.clone(),
        exec_details(exec),
    ]
}

pub fn executions_csv(executions: &VecDeque<Execution>, orders: &HashMap<OrderId, Order>) -> String {
    let mut lines = Vec::with_capacity(executions.len() + 1);
    lines.push(HEADERS.iter().map(|h| escape_field(h)).collect::<Vec<_>>().join(","));
    for exec in executions {
        let fields = row(exec, orders);
        lines.push(fields.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

pub fn default_file_name() -> String {
    format!("executions-{}.csv", chrono::Utc::now().format("%Y-%m-%d"))
}

pub async fn write_executions(
    path: &Path,
    executions: &VecDeque<Execution>,
    orders: &HashMap<OrderId, Order>,
) -> Result<usize, ExportError> {
    let csv = executions_csv(executions, orders);
    tokio::fs::write(path, csv.as_bytes())
        .await
        .map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;
    info!(path = %path.display(), rows = executions.len(), "executions exported");
    Ok(executions.len())
}
