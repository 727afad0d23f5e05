// ===============================
// src/domain.rs
// ===============================
//
// Wire-level records shared by the codec, the store and the views.
// Field names follow the gateway JSON (camelCase); enum values follow the
// gateway's upper-case strings.
//
use serde::{Deserialize, Serialize};
use std::fmt;

pub type OrderId = u64;
pub type ExecId = u64;
/// Milliseconds since the Unix epoch, as sent by the gateway.
pub type TimestampMs = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    #[default]
    Buy,
    Sell,
    BuyMinus,
    SellPlus,
    SellShort,
    Cross,
}

impl Side {
    /// +1 for buy-class sides, -1 for everything else.
    pub fn sign(&self) -> i64 {
        match self {
            Side::Buy | Side::BuyMinus => 1,
            Side::Sell | Side::SellPlus | Side::SellShort | Side::Cross => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::BuyMinus => "BUY_MINUS",
            Side::SellPlus => "SELL_PLUS",
            Side::SellShort => "SELL_SHORT",
            Side::Cross => "CROSS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
            Side::BuyMinus => "Buy-",
            Side::SellPlus => "Sell+",
            Side::SellShort => "Short",
            Side::Cross => "Cross",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    #[default]
    Limit,
    Stop,
    #[serde(rename = "STOPLIMIT")]
    StopLimit,
}

impl OrderType {
    pub fn needs_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::StopLimit)
    }

    pub fn needs_stop_px(&self) -> bool {
        matches!(self, OrderType::Stop | OrderType::StopLimit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
            OrderType::StopLimit => "STOPLIMIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    #[default]
    Day,
    Gtd,
    Gtc,
    Fok,
    Ioc,
    Opg,
    #[serde(rename = "ATCLOSE")]
    AtClose,
}

impl TimeInForce {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAY" => Some(TimeInForce::Day),
            "GTD" => Some(TimeInForce::Gtd),
            "GTC" => Some(TimeInForce::Gtc),
            "FOK" => Some(TimeInForce::Fok),
            "IOC" => Some(TimeInForce::Ioc),
            "OPG" => Some(TimeInForce::Opg),
            "ATCLOSE" | "AT_CLOSE" => Some(TimeInForce::AtClose),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    ReceivedNew,
    PendingNew,
    PendingReplace,
    New,
    PartialFill,
    Filled,
    Expired,
    DoneForDay,
    Suspended,
    Replaced,
    Canceled,
    Rejected,
}

impl OrderStatus {
    /// Working orders (counted in the header, not dimmed in the blotter).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::ReceivedNew
                | OrderStatus::PendingNew
                | OrderStatus::New
                | OrderStatus::PartialFill
                | OrderStatus::Suspended
        )
    }

    /// Statuses where cancel/replace is allowed.
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            OrderStatus::New | OrderStatus::PartialFill | OrderStatus::Suspended
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::ReceivedNew => "RECEIVED_NEW",
            OrderStatus::PendingNew => "PENDING_NEW",
            OrderStatus::PendingReplace => "PENDING_REPLACE",
            OrderStatus::New => "NEW",
            OrderStatus::PartialFill => "PARTIAL_FILL",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::DoneForDay => "DONE_FOR_DAY",
            OrderStatus::Suspended => "SUSPENDED",
            OrderStatus::Replaced => "REPLACED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::ReceivedNew => "Received",
            OrderStatus::PendingNew => "Pending New",
            OrderStatus::PendingReplace => "Pending Replace",
            OrderStatus::New => "New",
            OrderStatus::PartialFill => "Partial Fill",
            OrderStatus::Filled => "Filled",
            OrderStatus::Expired => "Expired",
            OrderStatus::DoneForDay => "Done for Day",
            OrderStatus::Suspended => "Suspended",
            OrderStatus::Replaced => "Replaced",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecType {
    New,
    Trade,
    Dfd,
    Correct,
    Cancel,
    Reject,
    Replace,
    Expired,
    Suspended,
    Status,
    Restated,
    PendCancel,
    PendReplace,
}

impl ExecType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecType::New => "NEW",
            ExecType::Trade => "TRADE",
            ExecType::Dfd => "DFD",
            ExecType::Correct => "CORRECT",
            ExecType::Cancel => "CANCEL",
            ExecType::Reject => "REJECT",
            ExecType::Replace => "REPLACE",
            ExecType::Expired => "EXPIRED",
            ExecType::Suspended => "SUSPENDED",
            ExecType::Status => "STATUS",
            ExecType::Restated => "RESTATED",
            ExecType::PendCancel => "PEND_CANCEL",
            ExecType::PendReplace => "PEND_REPLACE",
        }
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capacity {
    #[default]
    Agency,
    Principal,
    Proprietary,
    Individual,
    RisklessPrincipal,
    AgentForAnotherMember,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Principal,
    Agency,
}

// ---- Reference data ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub id: u64,
    pub symbol: String,
    #[serde(default)]
    pub security_id: String,
    #[serde(default)]
    pub security_id_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    pub account: String,
    #[serde(default)]
    pub firm: String,
    #[serde(rename = "type")]
    pub kind: AccountType,
}

// ---- Orders ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    #[serde(default)]
    pub orig_order_id: OrderId,
    #[serde(default)]
    pub cl_order_id: String,
    #[serde(default)]
    pub orig_cl_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub ord_type: OrderType,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stop_px: f64,
    #[serde(default)]
    pub avg_px: f64,
    pub order_qty: u64,
    #[serde(default)]
    pub cum_qty: u64,
    #[serde(default)]
    pub leaves_qty: u64,
    #[serde(default)]
    pub min_qty: u64,
    pub status: OrderStatus,
    #[serde(default)]
    pub tif: TimeInForce,
    #[serde(default)]
    pub capacity: Capacity,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub creation_time: TimestampMs,
    #[serde(default)]
    pub last_update_time: TimestampMs,
    #[serde(default)]
    pub expire_time: TimestampMs,
}

// ---- Executions ----

/// One execution report: common envelope plus the payload chosen by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub exec_id: ExecId,
    pub order_id: OrderId,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub transact_time: TimestampMs,
    #[serde(flatten)]
    pub kind: ExecKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ExecKind {
    New,
    Trade {
        last_qty: u64,
        last_px: f64,
        #[serde(default)]
        currency: Currency,
        #[serde(default)]
        trade_date: u64,
    },
    Dfd,
    Correct {
        #[serde(default)]
        cum_qty: u64,
        #[serde(default)]
        leaves_qty: u64,
        last_qty: u64,
        last_px: f64,
        #[serde(default)]
        currency: Currency,
        #[serde(default)]
        trade_date: u64,
        #[serde(default)]
        orig_order_id: OrderId,
        #[serde(default)]
        exec_ref_id: ExecId,
    },
    Cancel {
        #[serde(default)]
        exec_ref_id: ExecId,
    },
    Reject {
        #[serde(default)]
        reject_reason: String,
    },
    Replace {
        #[serde(default)]
        orig_order_id: OrderId,
    },
    Expired,
    Suspended,
    Status,
    Restated,
    PendCancel,
    PendReplace,
}

impl ExecKind {
    pub fn exec_type(&self) -> ExecType {
        match self {
            ExecKind::New => ExecType::New,
            ExecKind::Trade { .. } => ExecType::Trade,
            ExecKind::Dfd => ExecType::Dfd,
            ExecKind::Correct { .. } => ExecType::Correct,
            ExecKind::Cancel { .. } => ExecType::Cancel,
            ExecKind::Reject { .. } => ExecType::Reject,
            ExecKind::Replace { .. } => ExecType::Replace,
            ExecKind::Expired => ExecType::Expired,
            ExecKind::Suspended => ExecType::Suspended,
            ExecKind::Status => ExecType::Status,
            ExecKind::Restated => ExecType::Restated,
            ExecKind::PendCancel => ExecType::PendCancel,
            ExecKind::PendReplace => ExecType::PendReplace,
        }
    }
}

impl Execution {
    pub fn exec_type(&self) -> ExecType {
        self.kind.exec_type()
    }

    /// (lastQty, lastPx) for fills that move a position (TRADE, CORRECT).
    pub fn fill(&self) -> Option<(u64, f64)> {
        match &self.kind {
            ExecKind::Trade { last_qty, last_px, .. }
            | ExecKind::Correct { last_qty, last_px, .. } => Some((*last_qty, *last_px)),
            _ => None,
        }
    }
}

// ---- Order book ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookLevel {
    pub price: f64,
    pub qty: u64,
    #[serde(default)]
    pub order_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Best first, descending price.
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    /// Best first, ascending price.
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    pub timestamp: TimestampMs,
}

// ---- Rejects ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelReject {
    pub order_id: OrderId,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessReject {
    pub ref_id: u64,
    #[serde(default)]
    pub reason: String,
}

// ---- Client requests ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub symbol: String,
    pub side: Side,
    pub ord_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_px: Option<f64>,
    pub order_qty: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_qty: Option<u64>,
    pub tif: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cl_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOrderRequest {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_qty: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tif: Option<TimeInForce>,
}

// ---- Derived ----

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub net_qty: i64,
    pub avg_px: f64,
    pub trade_count: u32,
    pub last_trade_time: TimestampMs,
    pub total_cost: f64,
    pub total_qty: i64,
    /// Trade cancels whose referenced fill is no longer in the log.
    pub unresolved_cancels: u32,
}

impl Position {
    pub fn direction(&self) -> &'static str {
        match self.net_qty {
            0 => "FLAT",
            q if q > 0 => "LONG",
            _ => "SHORT",
        }
    }
}
