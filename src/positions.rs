// ===============================
// src/positions.rs (net position & VWAP per symbol)
// ===============================
//
// Pure fold over the execution log, recomputed on every render. The log is
// bounded, so a full refold stays cheap.
//
// - TRADE / CORRECT: signed qty = lastQty * side.sign(), accumulate cost & qty.
// - CANCEL: the referenced fill is netted out (never booked) when it is still
//   in the log and its own order is known; a fill is cancelled at most once.
//   Anything else has no quantity to reverse and is counted as unresolved
//   against the cancel's symbol.
//
// Two passes so the result does not depend on log order.
//
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use std::collections::VecDeque;
use tracing::debug;

use crate::domain::{ExecId, ExecKind, Execution, ExecType, Order, OrderId, Position};

pub fn derive_positions(
    executions: &VecDeque<Execution>,
    orders: &HashMap<OrderId, Order>,
) -> Vec<Position> {
    let by_exec_id: HashMap<ExecId, &Execution> =
        executions.iter().map(|e| (e.exec_id, e)).collect();

    // pass 1: resolve trade cancels
    let mut cancelled: HashSet<ExecId> = HashSet::new();
    let mut unresolved: HashSet<(&str, ExecId)> = HashSet::new();
    for exec in executions {
        let ExecKind::Cancel { exec_ref_id } = &exec.kind else { continue };
        let resolvable = by_exec_id
            .get(exec_ref_id)
            .is_some_and(|orig| orig.fill().is_some() && orders.contains_key(&orig.order_id));
        if resolvable {
            cancelled.insert(*exec_ref_id);
        } else if let Some(order) = orders.get(&exec.order_id) {
            debug!(exec_id = exec.exec_id, exec_ref_id, "trade cancel without fill in log");
            unresolved.insert((order.symbol.as_str(), *exec_ref_id));
        }
    }

    // pass 2: book every live fill
    let mut pos_map: HashMap<String, Position> = HashMap::new();
    for exec in executions {
        // order belum dikenal -> skip
        let Some(order) = orders.get(&exec.order_id) else { continue };
        let entry = pos_map.entry(order.symbol.clone()).or_insert_with(|| Position {
            symbol: order.symbol.clone(),
            ..Position::default()
        });
        if !cancelled.contains(&exec.exec_id) {
            apply_fill(entry, exec, order);
        }
    }
    for (symbol, _) in unresolved {
        if let Some(p) = pos_map.get_mut(symbol) {
            p.unresolved_cancels += 1;
        }
    }

    let mut out: Vec<Position> = pos_map
        .into_values()
        .map(|mut p| {
            p.avg_px = if p.total_qty > 0 { p.total_cost / p.total_qty as f64 } else { 0.0 };
            p
        })
        .collect();
    out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    out
}

fn apply_fill(pos: &mut Position, exec: &Execution, order: &Order) {
    let Some((last_qty, last_px)) = exec.fill() else { return };
    let qty = last_qty as i64;

    pos.net_qty += qty * order.side.sign();
    pos.total_cost += last_px * qty as f64;
    pos.total_qty += qty;

    if exec.exec_type() == ExecType::Trade {
        pos.trade_count += 1;
        pos.last_trade_time = pos.last_trade_time.max(exec.transact_time);
    }
}

/// Totals row: (sum of |netQty|, sum of tradeCount).
pub fn totals(positions: &[Position]) -> (u64, u32) {
    positions.iter().fold((0, 0), |(q, n), p| {
        (q + p.net_qty.unsigned_abs(), n + p.trade_count)
    })
}
