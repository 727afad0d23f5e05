// ===============================
// src/book.rs (order book panel state)
// ===============================
use crate::codec::ClientMessage;

pub const DEFAULT_BOOK_DEPTH: usize = 8;

/// Age buckets for the book staleness indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Aging,
    Stale,
}

impl Staleness {
    pub fn from_age_ms(age_ms: u64) -> Self {
        match age_ms {
            a if a < 5_000 => Staleness::Fresh,
            a if a < 30_000 => Staleness::Aging,
            _ => Staleness::Stale,
        }
    }

    /// Snapshot timestamps in the future count as age 0.
    pub fn of(snapshot_ts_ms: u64, now_ms: u64) -> Self {
        Self::from_age_ms(now_ms.saturating_sub(snapshot_ts_ms))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Staleness::Fresh => "fresh",
            Staleness::Aging => "aging",
            Staleness::Stale => "stale",
        }
    }
}

/// Tracks the single live depth subscription.
#[derive(Debug, Default)]
pub struct BookSubscription {
    selected: Option<String>,
}

impl BookSubscription {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Switch to `symbol`. Returns the messages to send, unsubscribe first.
    /// Selecting the current symbol again is a no-op.
    pub fn select(&mut self, symbol: &str) -> Vec<ClientMessage> {
        if self.selected.as_deref() == Some(symbol) {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(2);
        if let Some(prev) = self.selected.take() {
            out.push(ClientMessage::UnsubscribeBook { symbol: prev });
        }
        out.push(ClientMessage::SubscribeBook { symbol: symbol.to_string() });
        self.selected = Some(symbol.to_string());
        out
    }

    /// Drop the live subscription (teardown).
    pub fn clear(&mut self) -> Option<ClientMessage> {
        self.selected
            .take()
            .map(|symbol| ClientMessage::UnsubscribeBook { symbol })
    }

    /// After a reconnect the gateway has forgotten us; ask again.
    pub fn resubscribe(&self) -> Option<ClientMessage> {
        self.selected
            .as_ref()
            .map(|s| ClientMessage::SubscribeBook { symbol: s.clone() })
    }
}
