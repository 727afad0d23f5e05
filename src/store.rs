// ===============================
// src/store.rs (OMS state reducer)
// ===============================
//
// Snapshot = cheap clone of a handful of Arcs. Every transition goes through
// `reduce`, which copies-on-write only the collection it touches, so a
// snapshot already handed to a renderer never observes a half-applied update.
//
use ahash::AHashMap as HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::codec::ServerMessage;
use crate::domain::{Account, Execution, Instrument, Order, OrderBookSnapshot, OrderId};

pub const DEFAULT_MAX_EXECUTIONS: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct OmsState {
    pub connected: bool,
    pub instruments: Arc<Vec<Instrument>>,
    pub accounts: Arc<Vec<Account>>,
    pub orders: Arc<HashMap<OrderId, Order>>,
    /// Newest first.
    pub executions: Arc<VecDeque<Execution>>,
    pub books: Arc<HashMap<String, OrderBookSnapshot>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Connected,
    Disconnected,
    InstrumentList(Vec<Instrument>),
    AccountList(Vec<Account>),
    OrderSnapshot(Vec<Order>),
    OrderUpdate(Order),
    ExecutionReport(Execution),
    BookUpdate(OrderBookSnapshot),
}

impl Action {
    /// State-bearing messages only; acks, rejects and errors map to `None`.
    pub fn from_server(msg: ServerMessage) -> Option<Action> {
        match msg {
            ServerMessage::InstrumentList { data } => Some(Action::InstrumentList(data)),
            ServerMessage::AccountList { data } => Some(Action::AccountList(data)),
            ServerMessage::OrderSnapshot { data } => Some(Action::OrderSnapshot(data)),
            ServerMessage::OrderUpdate { data } => Some(Action::OrderUpdate(data)),
            ServerMessage::ExecutionReport { data } => Some(Action::ExecutionReport(data)),
            ServerMessage::BookUpdate { data } => Some(Action::BookUpdate(data)),
            ServerMessage::Connected
            | ServerMessage::CancelReject { .. }
            | ServerMessage::BusinessReject { .. }
            | ServerMessage::Error { .. } => None,
        }
    }
}

/// Pure transition: (snapshot, action) -> next snapshot. Taking the snapshot
/// by value lets an unshared collection be updated in place.
pub fn reduce(state: OmsState, action: Action, max_executions: usize) -> OmsState {
    let mut next = state;
    match action {
        Action::Connected => next.connected = true,
        Action::Disconnected => next.connected = false,
        Action::InstrumentList(list) => next.instruments = Arc::new(list),
        Action::AccountList(list) => next.accounts = Arc::new(list),
        Action::OrderSnapshot(list) => {
            let orders: HashMap<OrderId, Order> =
                list.into_iter().map(|o| (o.order_id, o)).collect();
            next.orders = Arc::new(orders);
        }
        Action::OrderUpdate(order) => {
            // last write wins, no sequence check
            Arc::make_mut(&mut next.orders).insert(order.order_id, order);
        }
        Action::ExecutionReport(exec) => {
            let log = Arc::make_mut(&mut next.executions);
            log.push_front(exec);
            log.truncate(max_executions);
        }
        Action::BookUpdate(book) => {
            Arc::make_mut(&mut next.books).insert(book.symbol.clone(), book);
        }
    }
    next
}

impl OmsState {
    /// Orders with the most recently updated first.
    pub fn orders_by_recency(&self) -> Vec<&Order> {
        let mut v: Vec<&Order> = self.orders.values().collect();
        v.sort_by(|a, b| {
            b.last_update_time
                .cmp(&a.last_update_time)
                .then(b.order_id.cmp(&a.order_id))
        });
        v
    }

    pub fn active_order_count(&self) -> usize {
        self.orders.values().filter(|o| o.status.is_active()).count()
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    pub fn book(&self, symbol: &str) -> Option<&OrderBookSnapshot> {
        self.books.get(symbol)
    }
}

/// Owner of the current snapshot.
#[derive(Debug)]
pub struct Store {
    state: OmsState,
    max_executions: usize,
}

impl Store {
    pub fn new(max_executions: usize) -> Self {
        Self { state: OmsState::default(), max_executions: max_executions.max(1) }
    }

    pub fn dispatch(&mut self, action: Action) {
        let current = std::mem::take(&mut self.state);
        self.state = reduce(current, action, self.max_executions);
    }

    pub fn state(&self) -> &OmsState {
        &self.state
    }

    pub fn snapshot(&self) -> OmsState {
        self.state.clone()
    }
}
