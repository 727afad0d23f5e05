// ===============================
// src/app.rs (dashboard loop)
// ===============================
//
// Single owner of the store and all view state. Session events, stdin
// command lines and the refresh tick are handled one at a time on this task;
// whatever must go out is handed to the session as fire-and-forget commands.
//
use std::io::Write as _;
use std::path::PathBuf;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    select,
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::book::BookSubscription;
use crate::codec::{ClientMessage, ServerMessage};
use crate::commands::{self, Command, HELP};
use crate::domain::CancelOrderRequest;
use crate::entry::{ensure_cancelable, SUBMITTED};
use crate::export;
use crate::format::now_ms;
use crate::metrics::{EXEC_LOG_LEN, ORDERS_ACTIVE, ORDERS_TRACKED, REJECTS, VALIDATION_FAILURES};
use crate::recorder::JournalEntry;
use crate::session::{SessionEvent, SessionHandle};
use crate::store::{Action, Store};
use crate::view::{self, Frame, Tab};

#[derive(Debug, Clone)]
pub struct DashboardCfg {
    pub max_executions: usize,
    pub book_depth: usize,
    pub refresh: Duration,
    pub headless: bool,
}

/// What the loop has to do after a command line.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Nothing,
    Send(Vec<ClientMessage>),
    Export(PathBuf),
    Quit,
}

pub struct Dashboard {
    store: Store,
    book: BookSubscription,
    tab: Tab,
    last_result: Option<String>,
    cfg: DashboardCfg,
}

impl Dashboard {
    pub fn new(cfg: DashboardCfg) -> Self {
        Self {
            store: Store::new(cfg.max_executions),
            book: BookSubscription::default(),
            tab: Tab::default(),
            last_result: None,
            cfg,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    fn note(&mut self, msg: impl Into<String>) {
        self.last_result = Some(msg.into());
    }

    fn dispatch(&mut self, action: Action) {
        self.store.dispatch(action);
        let state = self.store.state();
        ORDERS_TRACKED.set(state.orders.len() as i64);
        ORDERS_ACTIVE.set(state.active_order_count() as i64);
        EXEC_LOG_LEN.set(state.executions.len() as i64);
    }

    /// Apply one session event; returns commands to send right away.
    pub fn on_session_event(&mut self, ev: SessionEvent) -> Vec<ClientMessage> {
        match ev {
            SessionEvent::Connected => {
                self.dispatch(Action::Connected);
                self.book.resubscribe().into_iter().collect()
            }
            SessionEvent::Disconnected => {
                self.dispatch(Action::Disconnected);
                Vec::new()
            }
            SessionEvent::Message(msg) => {
                self.on_server_message(msg);
                Vec::new()
            }
        }
    }

    fn on_server_message(&mut self, msg: ServerMessage) {
        match &msg {
            ServerMessage::CancelReject { data } => {
                REJECTS.with_label_values(&["cancel"]).inc();
                warn!(order_id = data.order_id, reason = %data.reason, "cancel rejected");
                self.note(format!("Cancel rejected for order {}: {}", data.order_id, data.reason));
            }
            ServerMessage::BusinessReject { data } => {
                REJECTS.with_label_values(&["business"]).inc();
                warn!(ref_id = data.ref_id, reason = %data.reason, "business reject");
                self.note(format!("Rejected ({}): {}", data.ref_id, data.reason));
            }
            ServerMessage::Error { message } => {
                REJECTS.with_label_values(&["error"]).inc();
                warn!(%message, "gateway error");
                self.note(format!("Gateway error: {message}"));
            }
            _ => {}
        }
        if let Some(action) = Action::from_server(msg) {
            self.dispatch(action);
        }
    }

    /// Parse and validate one command line. Failures are reported inline
    /// and nothing is sent.
    pub fn on_command(&mut self, line: &str) -> Outcome {
        let cmd = match commands::parse(line) {
            Ok(cmd) => cmd,
            Err(commands::CommandError::Empty) => return Outcome::Nothing,
            Err(e) => {
                self.note(e.to_string());
                return Outcome::Nothing;
            }
        };

        let state = self.store.state();
        let checked = match cmd {
            Command::NewOrder(form) => form.validate(state).map(|data| {
                (ClientMessage::NewOrder { data }, SUBMITTED.to_string())
            }),
            Command::Cancel(order_id) => ensure_cancelable(state, order_id).map(|()| {
                (
                    ClientMessage::CancelOrder { data: CancelOrderRequest { order_id, cl_order_id: None } },
                    format!("Cancel requested for order {order_id}"),
                )
            }),
            Command::Replace(form) => form.validate(state).map(|data| {
                let id = data.order_id;
                (ClientMessage::ReplaceOrder { data }, format!("Replace requested for order {id}"))
            }),
            Command::Book(symbol) => {
                let out = self.book.select(&symbol);
                self.note(format!("Book: {symbol}"));
                return Outcome::Send(out);
            }
            Command::Show(tab) => {
                self.tab = tab;
                return Outcome::Nothing;
            }
            Command::Export(path) => {
                let path = path.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(export::default_file_name()));
                return Outcome::Export(path);
            }
            Command::Help => {
                self.note(HELP);
                return Outcome::Nothing;
            }
            Command::Quit => return Outcome::Quit,
        };

        match checked {
            Ok((msg, note)) => {
                self.note(note);
                Outcome::Send(vec![msg])
            }
            Err(e) => {
                VALIDATION_FAILURES.inc();
                self.note(e.to_string());
                Outcome::Nothing
            }
        }
    }

    /// Teardown: release the book subscription.
    pub fn teardown(&mut self) -> Option<ClientMessage> {
        self.book.clear()
    }

    pub fn render(&self, now_ms: u64) -> String {
        let frame = Frame {
            tab: self.tab,
            book: &self.book,
            book_depth: self.cfg.book_depth,
            last_result: self.last_result.as_deref(),
            now_ms,
            ansi: !self.cfg.headless,
        };
        view::render(self.store.state(), &frame)
    }
}

fn journal(tx: &Option<mpsc::Sender<JournalEntry>>, entry: JournalEntry) {
    if let Some(tx) = tx {
        let _ = tx.try_send(entry);
    }
}

/// Hand commands to the session; returns false if any was dropped.
fn send_all(
    handle: &SessionHandle,
    journal_tx: &Option<mpsc::Sender<JournalEntry>>,
    msgs: Vec<ClientMessage>,
) -> bool {
    let mut all_sent = true;
    for msg in msgs {
        journal(journal_tx, JournalEntry::Out { ts_ms: now_ms(), msg: msg.clone() });
        all_sent &= handle.send(msg);
    }
    all_sent
}

fn redraw(dash: &Dashboard) {
    if dash.cfg.headless {
        return;
    }
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(dash.render(now_ms()).as_bytes());
    let _ = out.flush();
}

pub async fn run(
    cfg: DashboardCfg,
    handle: SessionHandle,
    mut events: mpsc::Receiver<SessionEvent>,
    journal_tx: Option<mpsc::Sender<JournalEntry>>,
) {
    let mut tick = interval(cfg.refresh);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut dash = Dashboard::new(cfg);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        select! {
            ev = events.recv() => {
                let Some(ev) = ev else { break };
                match &ev {
                    SessionEvent::Connected => journal(&journal_tx, JournalEntry::Link { ts_ms: now_ms(), connected: true }),
                    SessionEvent::Disconnected => journal(&journal_tx, JournalEntry::Link { ts_ms: now_ms(), connected: false }),
                    SessionEvent::Message(msg) => journal(&journal_tx, JournalEntry::In { ts_ms: now_ms(), msg: msg.clone() }),
                }
                let out = dash.on_session_event(ev);
                send_all(&handle, &journal_tx, out);
            }

            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        match dash.on_command(&line) {
                            Outcome::Nothing => {}
                            Outcome::Send(msgs) => {
                                if !send_all(&handle, &journal_tx, msgs) {
                                    dash.note("Not connected: command dropped");
                                }
                            }
                            Outcome::Export(path) => {
                                let state = dash.store().snapshot();
                                match export::write_executions(&path, &state.executions, &state.orders).await {
                                    Ok(n) => dash.note(format!("Exported {n} executions to {}", path.display())),
                                    Err(e) => {
                                        warn!(error = %e, "export failed");
                                        dash.note(e.to_string());
                                    }
                                }
                            }
                            Outcome::Quit => break,
                        }
                        if let Some(msg) = dash.last_result().filter(|_| dash.cfg.headless) {
                            info!(result = %msg, "command");
                        }
                        redraw(&dash);
                    }
                    Ok(None) => {
                        info!("stdin closed, monitoring only");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(?e, "stdin read failed, monitoring only");
                        stdin_open = false;
                    }
                }
            }

            _ = tick.tick() => redraw(&dash),

            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c, shutting down");
                break;
            }
        }
    }

    if let Some(msg) = dash.teardown() {
        send_all(&handle, &journal_tx, vec![msg]);
    }
    handle.shutdown().await;
    info!("dashboard stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BusinessReject, Instrument, OrderStatus, Side};
    use crate::store::tests::order;

    fn dashboard() -> Dashboard {
        let mut dash = Dashboard::new(DashboardCfg {
            max_executions: 1000,
            book_depth: 8,
            refresh: Duration::from_millis(2000),
            headless: true,
        });
        dash.on_session_event(SessionEvent::Connected);
        dash.on_session_event(SessionEvent::Message(ServerMessage::InstrumentList {
            data: vec![Instrument {
                id: 1,
                symbol: "EURUSD".into(),
                security_id: String::new(),
                security_id_source: String::new(),
            }],
        }));
        dash
    }

    #[test]
    fn valid_order_is_sent_and_acknowledged() {
        let mut dash = dashboard();
        let Outcome::Send(msgs) = dash.on_command("buy EURUSD 100 @1.2") else { panic!("expected send") };
        assert_eq!(msgs.len(), 1);
        assert!(matches!(&msgs[0], ClientMessage::NewOrder { data } if data.order_qty == 100));
        assert_eq!(dash.last_result(), Some(SUBMITTED));
    }

    #[test]
    fn invalid_order_is_reported_and_not_sent() {
        let mut dash = dashboard();
        assert_eq!(dash.on_command("buy EURUSD 0 @1.2"), Outcome::Nothing);
        assert_eq!(dash.last_result(), Some("Quantity must be > 0"));
        assert_eq!(dash.on_command("launch"), Outcome::Nothing);
        assert_eq!(dash.last_result(), Some("unknown command `launch` (try `help`)"));
    }

    #[test]
    fn cancel_of_finished_order_is_blocked() {
        let mut dash = dashboard();
        dash.on_session_event(SessionEvent::Message(ServerMessage::OrderSnapshot {
            data: vec![
                order(7, "EURUSD", Side::Buy, OrderStatus::Filled),
                order(8, "EURUSD", Side::Buy, OrderStatus::New),
            ],
        }));
        assert_eq!(dash.on_command("cancel 7"), Outcome::Nothing);
        let Outcome::Send(msgs) = dash.on_command("cancel 8") else { panic!("expected send") };
        assert_eq!(
            msgs,
            vec![ClientMessage::CancelOrder { data: CancelOrderRequest { order_id: 8, cl_order_id: None } }]
        );
    }

    #[test]
    fn book_switch_and_resubscribe_after_reconnect() {
        let mut dash = dashboard();
        assert_eq!(
            dash.on_command("book eurusd"),
            Outcome::Send(vec![ClientMessage::SubscribeBook { symbol: "EURUSD".into() }])
        );
        assert_eq!(
            dash.on_command("book gbpusd"),
            Outcome::Send(vec![
                ClientMessage::UnsubscribeBook { symbol: "EURUSD".into() },
                ClientMessage::SubscribeBook { symbol: "GBPUSD".into() },
            ])
        );

        assert!(dash.on_session_event(SessionEvent::Disconnected).is_empty());
        assert!(!dash.store().state().connected);
        assert_eq!(
            dash.on_session_event(SessionEvent::Connected),
            vec![ClientMessage::SubscribeBook { symbol: "GBPUSD".into() }]
        );
        assert_eq!(
            dash.teardown(),
            Some(ClientMessage::UnsubscribeBook { symbol: "GBPUSD".into() })
        );
    }

    #[test]
    fn reject_is_shown_and_state_untouched() {
        let mut dash = dashboard();
        let before = dash.store().state().orders.len();
        dash.on_session_event(SessionEvent::Message(ServerMessage::BusinessReject {
            data: BusinessReject { ref_id: 3, reason: "Unknown account".into() },
        }));
        assert_eq!(dash.last_result(), Some("Rejected (3): Unknown account"));
        assert_eq!(dash.store().state().orders.len(), before);
    }

    #[test]
    fn tabs_export_and_quit() {
        let mut dash = dashboard();
        assert_eq!(dash.on_command("positions"), Outcome::Nothing);
        assert!(dash.render(0).contains("[positions]"));
        assert_eq!(dash.on_command("export /tmp/x.csv"), Outcome::Export(PathBuf::from("/tmp/x.csv")));
        assert!(matches!(dash.on_command("export"), Outcome::Export(p) if p.to_string_lossy().starts_with("executions-")));
        assert_eq!(dash.on_command("quit"), Outcome::Quit);
    }
}
