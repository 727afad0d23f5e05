// ===============================
// src/session.rs (OMS gateway WebSocket session)
// ===============================
//
// One connection, one task. Lifecycle:
//   Disconnected -> Connecting -> Connected -> Disconnected -> ...   (Closed on teardown)
//
// - Close / protocol error / failed connect => exactly one reconnect timer
//   (fixed delay, single slot; a second close while armed is a no-op).
// - Outbound commands are written only while Connected; anything else is
//   dropped, never queued.
// - Malformed inbound frames are logged and dropped; the session stays up.
//
use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{sleep_until, Duration, Instant},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::codec::{self, ClientMessage, ServerMessage};
use crate::format::now_ms;
use crate::metrics::{
    COMMANDS_DROPPED, COMMANDS_SENT, DECODE_ERRORS, FRAMES_IN, WS_CONNECTED, WS_LAST_EVENT_TS,
    WS_RECONNECTS,
};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    /// Torn down; never reconnects.
    Closed,
}

/// What the dashboard sees from the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    Message(ServerMessage),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: Url,
    pub reconnect_delay: Duration,
}

/// Connection state machine with a single-slot reconnect timer.
#[derive(Debug)]
pub struct Link {
    state: LinkState,
    reconnect_at: Option<Instant>,
    delay: Duration,
}

impl Link {
    pub fn new(delay: Duration) -> Self {
        Self { state: LinkState::Disconnected, reconnect_at: None, delay }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Start a connection attempt. Clears any armed timer first.
    /// Returns false once torn down.
    pub fn begin_connect(&mut self) -> bool {
        if self.state == LinkState::Closed {
            return false;
        }
        self.reconnect_at = None;
        self.state = LinkState::Connecting;
        true
    }

    pub fn on_open(&mut self) {
        if self.state == LinkState::Connecting {
            self.state = LinkState::Connected;
        }
    }

    /// Connection lost (or never made). Arms the reconnect timer unless one
    /// is already pending; returns true only when a new timer was armed.
    pub fn on_close(&mut self, now: Instant) -> bool {
        if self.state == LinkState::Closed {
            return false;
        }
        self.state = LinkState::Disconnected;
        if self.reconnect_at.is_some() {
            return false;
        }
        self.reconnect_at = Some(now + self.delay);
        true
    }

    /// Cancel the pending timer and stop for good.
    pub fn teardown(&mut self) {
        self.reconnect_at = None;
        self.state = LinkState::Closed;
    }
}

/// Caller side of the session task.
#[derive(Debug)]
pub struct SessionHandle {
    out_tx: mpsc::UnboundedSender<ClientMessage>,
    link_rx: watch::Receiver<LinkState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn link_state(&self) -> LinkState {
        *self.link_rx.borrow()
    }

    /// Fire-and-forget. Returns false (and drops the command) when the
    /// connection is not open.
    pub fn send(&self, msg: ClientMessage) -> bool {
        if self.link_state() != LinkState::Connected {
            COMMANDS_DROPPED.with_label_values(&[msg.kind()]).inc();
            debug!(kind = msg.kind(), "not connected, command dropped");
            return false;
        }
        self.out_tx.send(msg).is_ok()
    }

    /// Cancel any pending reconnect, close the socket and wait for the task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(?e, "session task failed");
            }
        }
    }
}

pub fn spawn(cfg: SessionConfig, events: mpsc::Sender<SessionEvent>) -> SessionHandle {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (link_tx, link_rx) = watch::channel(LinkState::Disconnected);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run(cfg, events, out_rx, link_tx, shutdown_rx));
    SessionHandle { out_tx, link_rx, shutdown_tx: Some(shutdown_tx), task: Some(task) }
}

enum PumpExit {
    Closed,
    Shutdown,
}

async fn run(
    cfg: SessionConfig,
    events: mpsc::Sender<SessionEvent>,
    mut out_rx: mpsc::UnboundedReceiver<ClientMessage>,
    link_tx: watch::Sender<LinkState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut link = Link::new(cfg.reconnect_delay);

    'session: while link.begin_connect() {
        let _ = link_tx.send(link.state());
        info!(url = %cfg.url, "connecting OMS gateway");

        let attempt = tokio::select! {
            res = connect_async(cfg.url.as_str()) => res,
            _ = &mut shutdown_rx => break 'session,
        };

        match attempt {
            Ok((ws, _resp)) => {
                link.on_open();
                let _ = link_tx.send(link.state());
                WS_CONNECTED.set(1);
                info!(url = %cfg.url, "gateway connected");
                if events.send(SessionEvent::Connected).await.is_err() {
                    break 'session;
                }
                match pump(ws, &mut out_rx, &events, &mut shutdown_rx).await {
                    PumpExit::Closed => {}
                    PumpExit::Shutdown => {
                        WS_CONNECTED.set(0);
                        let _ = events.send(SessionEvent::Disconnected).await;
                        break 'session;
                    }
                }
            }
            Err(e) => warn!(error = %e, "gateway connect failed"),
        }

        WS_CONNECTED.set(0);
        if link.on_close(Instant::now()) {
            WS_RECONNECTS.inc();
            info!(delay_ms = cfg.reconnect_delay.as_millis() as u64, "gateway disconnected, reconnect scheduled");
        }
        let _ = link_tx.send(link.state());
        if events.send(SessionEvent::Disconnected).await.is_err() {
            break 'session;
        }

        let Some(deadline) = link.reconnect_at() else { break 'session };
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => break,
                cmd = out_rx.recv() => match cmd {
                    Some(msg) => {
                        COMMANDS_DROPPED.with_label_values(&[msg.kind()]).inc();
                        debug!(kind = msg.kind(), "disconnected, command dropped");
                    }
                    None => break 'session,
                },
                _ = &mut shutdown_rx => break 'session,
            }
        }
    }

    link.teardown();
    let _ = link_tx.send(link.state());
    WS_CONNECTED.set(0);
    info!("session closed");
}

async fn pump(
    ws: WsStream,
    out_rx: &mut mpsc::UnboundedReceiver<ClientMessage>,
    events: &mpsc::Sender<SessionEvent>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> PumpExit {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            // queued commands go out before a shutdown closes the socket
            biased;

            cmd = out_rx.recv() => match cmd {
                Some(msg) => match codec::encode(&msg) {
                    Ok(txt) => {
                        if let Err(e) = sink.send(Message::Text(txt)).await {
                            warn!(error = %e, kind = msg.kind(), "ws send failed, forcing close");
                            let _ = sink.close().await;
                            return PumpExit::Closed;
                        }
                        COMMANDS_SENT.with_label_values(&[msg.kind()]).inc();
                        debug!(kind = msg.kind(), "command sent");
                    }
                    Err(e) => error!(error = %e, kind = msg.kind(), "encode failed, command dropped"),
                },
                None => {
                    let _ = sink.close().await;
                    return PumpExit::Shutdown;
                }
            },
            _ = &mut *shutdown_rx => {
                let _ = sink.close().await;
                return PumpExit::Shutdown;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(txt))) => {
                    if let Some(msg) = decode_frame(&txt) {
                        if events.send(SessionEvent::Message(msg)).await.is_err() {
                            let _ = sink.close().await;
                            return PumpExit::Shutdown;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "gateway sent close");
                    return PumpExit::Closed;
                }
                Some(Ok(_)) => {
                    // ping/pong/binary: nothing to apply
                }
                Some(Err(e)) => {
                    warn!(error = %e, "ws error, forcing close");
                    let _ = sink.close().await;
                    return PumpExit::Closed;
                }
                None => return PumpExit::Closed,
            },
        }
    }
}

fn decode_frame(txt: &str) -> Option<ServerMessage> {
    match codec::decode(txt) {
        Ok(msg) => {
            FRAMES_IN.with_label_values(&[msg.kind()]).inc();
            WS_LAST_EVENT_TS.set((now_ms() / 1000) as i64);
            Some(msg)
        }
        Err(e) => {
            DECODE_ERRORS.inc();
            warn!(error = %e, "dropping malformed frame");
            None
        }
    }
}
