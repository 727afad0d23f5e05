// ===============================
// src/view.rs (text panels)
// ===============================
//
// Stateless renderers: snapshot in, text out. The dashboard loop decides
// when to redraw; nothing here touches the store or the session.
//
use std::fmt::Write as _;

use crate::book::{BookSubscription, Staleness};
use crate::domain::{ExecKind, Execution, OrderBookSnapshot, Position};
use crate::format::{format_id, format_price, format_quantity, format_time};
use crate::positions::{derive_positions, totals};
use crate::store::OmsState;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const CLEAR: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Orders,
    Executions,
    Positions,
}

/// Everything a full redraw needs besides the store snapshot.
pub struct Frame<'a> {
    pub tab: Tab,
    pub book: &'a BookSubscription,
    pub book_depth: usize,
    pub last_result: Option<&'a str>,
    pub now_ms: u64,
    pub ansi: bool,
}

pub fn exec_details(exec: &Execution) -> String {
    match &exec.kind {
        ExecKind::Trade { last_qty, last_px, .. } => {
            format!("{} @ {}", format_quantity(*last_qty as i64), format_price(*last_px))
        }
        ExecKind::Reject { reject_reason } if !reject_reason.is_empty() => reject_reason.clone(),
        ExecKind::Reject { .. } => "Rejected".to_string(),
        ExecKind::Correct { exec_ref_id, last_qty, last_px, .. } => format!(
            "Ref: {} | {} @ {}",
            format_id(*exec_ref_id),
            format_quantity(*last_qty as i64),
            format_price(*last_px)
        ),
        ExecKind::Cancel { exec_ref_id } if *exec_ref_id != 0 => {
            format!("Ref: {}", format_id(*exec_ref_id))
        }
        ExecKind::Replace { orig_order_id } if *orig_order_id != 0 => {
            format!("Orig: {}", format_id(*orig_order_id))
        }
        _ => String::new(),
    }
}

pub fn render_header(state: &OmsState) -> String {
    format!(
        "OMS Dashboard   [{}]   active orders: {}   executions: {}\n",
        if state.connected { "Connected" } else { "Disconnected" },
        state.active_order_count(),
        state.executions.len()
    )
}

pub fn render_book(state: &OmsState, sub: &BookSubscription, depth: usize, now_ms: u64) -> String {
    let mut out = String::from("== Order Book ==\n");
    let symbols: Vec<&str> = state.instruments.iter().map(|i| i.symbol.as_str()).collect();
    if symbols.is_empty() {
        out.push_str("instruments: (none)\n");
    } else {
        let _ = writeln!(out, "instruments: {}", symbols.join(" "));
    }

    let Some(symbol) = sub.selected() else {
        out.push_str("Select an instrument\n");
        return out;
    };
    let Some(snap) = state.book(symbol) else {
        out.push_str("Waiting for data...\n");
        return out;
    };

    let age_ms = now_ms.saturating_sub(snap.timestamp);
    let _ = writeln!(
        out,
        "{symbol}   {}s ago ({})",
        age_ms / 1000,
        Staleness::from_age_ms(age_ms).as_str()
    );
    render_depth(&mut out, snap, depth);
    out
}

fn render_depth(out: &mut String, snap: &OrderBookSnapshot, depth: usize) {
    let _ = writeln!(out, "{:>6} {:>10} {:>12} | {:<12} {:>10} {:>6}", "#", "Bid Qty", "Bid", "Ask", "Ask Qty", "#");
    let rows = snap.bids.len().max(snap.asks.len()).min(depth);
    if rows == 0 {
        let _ = writeln!(out, "{:>30} | {:<30}", "No bids", "No asks");
        return;
    }
    for i in 0..rows {
        let bid = snap.bids.get(i).map(|l| {
            format!("{:>6} {:>10} {:>12}", l.order_count, format_quantity(l.qty as i64), format_price(l.price))
        });
        let ask = snap.asks.get(i).map(|l| {
            format!("{:<12} {:>10} {:>6}", format_price(l.price), format_quantity(l.qty as i64), l.order_count)
        });
        let _ = writeln!(
            out,
            "{} | {}",
            bid.unwrap_or_else(|| format!("{:>30}", if i == 0 { "No bids" } else { "" })),
            ask.unwrap_or_else(|| if i == 0 { "No asks".to_string() } else { String::new() })
        );
    }
}

pub fn render_orders(state: &OmsState, ansi: bool) -> String {
    let orders = state.orders_by_recency();
    if orders.is_empty() {
        return "No orders\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<10} {:<8} {:<6} {:<9} {:>10} {:>7} {:>7} {:>7} {:>10} {:<15} {}",
        "Time", "OrderID", "Symbol", "Side", "Type", "Price", "Qty", "Filled", "Leaves", "AvgPx", "Status", ""
    );
    for o in orders {
        let line = format!(
            "{:<8} {:<10} {:<8} {:<6} {:<9} {:>10} {:>7} {:>7} {:>7} {:>10} {:<15} {}",
            format_time(o.creation_time),
            format_id(o.order_id),
            o.symbol,
            o.side.label(),
            o.ord_type.as_str(),
            if o.price > 0.0 { format_price(o.price) } else { "--".into() },
            format_quantity(o.order_qty as i64),
            if o.cum_qty > 0 { format_quantity(o.cum_qty as i64) } else { "--".into() },
            format_quantity(o.leaves_qty as i64),
            if o.avg_px > 0.0 { format_price(o.avg_px) } else { "--".into() },
            o.status.label(),
            if o.status.is_cancelable() { "[cancel|replace]" } else { "" },
        );
        if ansi && !o.status.is_active() {
            let _ = writeln!(out, "{DIM}{}{RESET}", line.trim_end());
        } else {
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }
    out
}

pub fn render_executions(state: &OmsState) -> String {
    if state.executions.is_empty() {
        return "No executions\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<10} {:<12} {:<8} {:<10} {:<10} {:>7} {:>10} {:<15} {:<6} {}",
        "Time", "ExecID", "Type", "Symbol", "OrderID", "Side", "LastQty", "LastPx", "OrdStatus", "Market", "Details"
    );
    for e in state.executions.iter() {
        let order = state.order(e.order_id);
        let trade = match &e.kind {
            ExecKind::Trade { last_qty, last_px, .. } => Some((*last_qty, *last_px)),
            _ => None,
        };
        let line = format!(
            "{:<8} {:<10} {:<12} {:<8} {:<10} {:<10} {:>7} {:>10} {:<15} {:<6} {}",
            format_time(e.transact_time),
            format_id(e.exec_id),
            e.exec_type().as_str().replace('_', " "),
            order.map(|o| o.symbol.as_str()).unwrap_or("--"),
            format_id(e.order_id),
            order.map(|o| o.side.as_str()).unwrap_or("--"),
            trade.map(|(q, _)| format_quantity(q as i64)).unwrap_or_else(|| "--".into()),
            trade.map(|(_, p)| format_price(p)).unwrap_or_else(|| "--".into()),
            e.order_status.label(),
            e.market,
            exec_details(e),
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

pub fn render_positions(positions: &[Position]) -> String {
    if positions.is_empty() {
        return "No positions\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:>10} {:<6} {:>10} {:>7} {:<9}",
        "Symbol", "Net Qty", "Dir", "Avg Px", "Trades", "Last"
    );
    for p in positions {
        let _ = writeln!(
            out,
            "{:<10} {:>10} {:<6} {:>10} {:>7} {:<9}",
            p.symbol,
            format_quantity(p.net_qty),
            p.direction(),
            if p.avg_px > 0.0 { format_price(p.avg_px) } else { "--".into() },
            p.trade_count,
            if p.last_trade_time > 0 { format_time(p.last_trade_time) } else { "--".into() },
        );
    }
    let (gross, trades) = totals(positions);
    let _ = writeln!(
        out,
        "{:<10} {:>10} {:<6} {:>10} {:>7}",
        "Total",
        format_quantity(gross as i64),
        "",
        "",
        trades
    );
    let unresolved: Vec<String> = positions
        .iter()
        .filter(|p| p.unresolved_cancels > 0)
        .map(|p| format!("{} x{}", p.symbol, p.unresolved_cancels))
        .collect();
    if !unresolved.is_empty() {
        let _ = writeln!(out, "* unmatched trade cancels (not netted): {}", unresolved.join(", "));
    }
    out
}

pub fn render(state: &OmsState, frame: &Frame<'_>) -> String {
    let mut out = String::new();
    if frame.ansi {
        out.push_str(CLEAR);
    }
    out.push_str(&render_header(state));
    out.push('\n');
    out.push_str(&render_book(state, frame.book, frame.book_depth, frame.now_ms));
    out.push('\n');

    let tab_label = |t: Tab, name: &str| if frame.tab == t { format!("[{name}]") } else { name.to_string() };
    let _ = writeln!(
        out,
        "{}  {}  {}",
        tab_label(Tab::Orders, "orders"),
        tab_label(Tab::Executions, "execs"),
        tab_label(Tab::Positions, "positions")
    );
    match frame.tab {
        Tab::Orders => out.push_str(&render_orders(state, frame.ansi)),
        Tab::Executions => out.push_str(&render_executions(state)),
        Tab::Positions => {
            let positions = derive_positions(&state.executions, &state.orders);
            out.push_str(&render_positions(&positions));
        }
    }
    if let Some(msg) = frame.last_result {
        let _ = writeln!(out, "\n> {msg}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, Currency, Instrument, OrderStatus, Side};
    use crate::store::tests::{exec, order};
    use crate::store::{Action, Store, DEFAULT_MAX_EXECUTIONS};

    fn level(price: f64, qty: u64) -> BookLevel {
        BookLevel { price, qty, order_count: 1 }
    }

    fn store_with_book(levels: usize) -> Store {
        let mut store = Store::new(DEFAULT_MAX_EXECUTIONS);
        store.dispatch(Action::InstrumentList(vec![Instrument {
            id: 1,
            symbol: "EURUSD".into(),
            security_id: String::new(),
            security_id_source: String::new(),
        }]));
        store.dispatch(Action::BookUpdate(OrderBookSnapshot {
            symbol: "EURUSD".into(),
            bids: (0..levels).map(|i| level(1.2 - i as f64 * 0.0001, 100)).collect(),
            asks: (0..levels).map(|i| level(1.2001 + i as f64 * 0.0001, 100)).collect(),
            timestamp: 1_000,
        }));
        store
    }

    #[test]
    fn book_panel_empty_states() {
        let store = store_with_book(1);
        let mut sub = BookSubscription::default();
        assert!(render_book(store.state(), &sub, 8, 2_000).contains("Select an instrument"));
        sub.select("GBPUSD");
        assert!(render_book(store.state(), &sub, 8, 2_000).contains("Waiting for data..."));
    }

    #[test]
    fn book_panel_caps_depth_and_shows_age() {
        let store = store_with_book(12);
        let mut sub = BookSubscription::default();
        sub.select("EURUSD");
        let text = render_book(store.state(), &sub, 8, 7_000);
        assert!(text.contains("6s ago (aging)"));
        assert!(text.contains("1.2000"));
        assert!(text.contains("1.1993"));
        assert!(!text.contains("1.1992"));
        // header + instruments + symbol line + column header + 8 levels
        assert_eq!(text.lines().count(), 4 + 8);
    }

    #[test]
    fn exec_details_per_kind() {
        let t = exec(1, 1, ExecKind::Trade { last_qty: 1_500, last_px: 1.2, currency: Currency::Usd, trade_date: 0 });
        assert_eq!(exec_details(&t), "2K @ 1.2000");
        assert_eq!(exec_details(&exec(2, 1, ExecKind::Reject { reject_reason: String::new() })), "Rejected");
        assert_eq!(exec_details(&exec(3, 1, ExecKind::Cancel { exec_ref_id: 7 })), "Ref: 7");
        assert_eq!(exec_details(&exec(4, 1, ExecKind::Cancel { exec_ref_id: 0 })), "");
        assert_eq!(exec_details(&exec(5, 1, ExecKind::Replace { orig_order_id: 123_456_789 })), "Orig: 1234..6789");
        assert_eq!(exec_details(&exec(6, 1, ExecKind::Status)), "");
    }

    #[test]
    fn order_blotter_dims_terminal_orders() {
        let mut store = Store::new(DEFAULT_MAX_EXECUTIONS);
        store.dispatch(Action::OrderSnapshot(vec![
            order(1, "EURUSD", Side::Buy, OrderStatus::New),
            order(2, "EURUSD", Side::Sell, OrderStatus::Canceled),
        ]));
        let text = render_orders(store.state(), true);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with(DIM) && lines[1].contains("Canceled"));
        assert!(!lines[2].starts_with(DIM) && lines[2].contains("[cancel|replace]"));
        assert_eq!(render_orders(&OmsState::default(), true), "No orders\n");
    }

    #[test]
    fn positions_table_flags_unmatched_cancels() {
        let mut store = Store::new(DEFAULT_MAX_EXECUTIONS);
        store.dispatch(Action::OrderSnapshot(vec![
            order(1, "EURUSD", Side::Buy, OrderStatus::Filled),
            order(2, "GBPUSD", Side::Buy, OrderStatus::Filled),
        ]));
        for e in [
            exec(1, 1, ExecKind::Trade { last_qty: 40, last_px: 1.2, currency: Currency::Usd, trade_date: 0 }),
            exec(2, 2, ExecKind::Trade { last_qty: 10, last_px: 1.3, currency: Currency::Usd, trade_date: 0 }),
            exec(3, 1, ExecKind::Cancel { exec_ref_id: 77 }),
        ] {
            store.dispatch(Action::ExecutionReport(e));
        }
        let s = store.state();
        let text = render_positions(&derive_positions(&s.executions, &s.orders));
        assert!(text.lines().last().unwrap().contains("unmatched trade cancels (not netted): EURUSD x1"));
        assert!(!text.contains("GBPUSD x"));
    }

    #[test]
    fn full_frame_renders_selected_tab() {
        let mut store = store_with_book(2);
        store.dispatch(Action::Connected);
        store.dispatch(Action::OrderSnapshot(vec![order(1, "EURUSD", Side::Buy, OrderStatus::New)]));
        store.dispatch(Action::ExecutionReport(exec(
            1,
            1,
            ExecKind::Trade { last_qty: 40, last_px: 1.2, currency: Currency::Usd, trade_date: 0 },
        )));
        let sub = BookSubscription::default();
        let frame = Frame {
            tab: Tab::Positions,
            book: &sub,
            book_depth: 8,
            last_result: Some("Order submitted"),
            now_ms: 2_000,
            ansi: false,
        };
        let text = render(store.state(), &frame);
        assert!(text.starts_with("OMS Dashboard   [Connected]   active orders: 1   executions: 1"));
        assert!(text.contains("[positions]"));
        assert!(text.contains("EURUSD") && text.contains("LONG"));
        assert!(text.contains("> Order submitted"));
    }
}
