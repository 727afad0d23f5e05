// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Gateway session --------
pub static WS_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("oms_ws_connected", "1 if the gateway WS is open, 0 otherwise").unwrap()
});

pub static WS_RECONNECTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("oms_ws_reconnects_total", "reconnect timers armed after a close").unwrap()
});

pub static WS_LAST_EVENT_TS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("oms_ws_last_event_ts", "Unix seconds of the last received frame").unwrap()
});

// -------- Codec --------
pub static FRAMES_IN: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("oms_frames_in_total", "decoded inbound frames (label: type)"),
        &["type"],
    )
    .unwrap()
});

pub static DECODE_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("oms_decode_errors_total", "inbound frames dropped as malformed").unwrap()
});

pub static COMMANDS_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("oms_commands_sent_total", "outbound commands written (label: type)"),
        &["type"],
    )
    .unwrap()
});

pub static COMMANDS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oms_commands_dropped_total",
            "outbound commands dropped while disconnected (label: type)",
        ),
        &["type"],
    )
    .unwrap()
});

// -------- Store / business --------
pub static REJECTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("oms_rejects_total", "rejects and server errors (label: kind)"),
        &["kind"],
    )
    .unwrap()
});

pub static ORDERS_TRACKED: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("oms_orders_tracked", "orders in the local map").unwrap());

pub static ORDERS_ACTIVE: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("oms_orders_active", "working orders").unwrap());

pub static EXEC_LOG_LEN: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("oms_exec_log_len", "executions held in the log").unwrap());

pub static VALIDATION_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("oms_validation_failures_total", "order tickets blocked locally").unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(WS_CONNECTED.clone())),
        REGISTRY.register(Box::new(WS_RECONNECTS.clone())),
        REGISTRY.register(Box::new(WS_LAST_EVENT_TS.clone())),
        REGISTRY.register(Box::new(FRAMES_IN.clone())),
        REGISTRY.register(Box::new(DECODE_ERRORS.clone())),
        REGISTRY.register(Box::new(COMMANDS_SENT.clone())),
        REGISTRY.register(Box::new(COMMANDS_DROPPED.clone())),
        REGISTRY.register(Box::new(REJECTS.clone())),
        REGISTRY.register(Box::new(ORDERS_TRACKED.clone())),
        REGISTRY.register(Box::new(ORDERS_ACTIVE.clone())),
        REGISTRY.register(Box::new(EXEC_LOG_LEN.clone())),
        REGISTRY.register(Box::new(VALIDATION_FAILURES.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics) — tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// Metrics server on its own OS thread; the dashboard owns stdout, so log via tracing.
pub fn serve_metrics(port: u16) {
    thread::spawn(move || {
        let addr = format!("0.0.0.0:{port}");
        let listener = match TcpListener::bind(&addr) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(%addr, ?e, "metrics bind failed, exporter disabled");
                return;
            }
        };
        tracing::info!("metrics listening on http://{addr}/ (and /metrics)");

        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => tracing::warn!(?e, "metrics accept error"),
            }
        }
    });
}
