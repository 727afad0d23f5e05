// ===============================
// src/codec.rs (gateway wire protocol)
// ===============================
//
// Every frame is one JSON object tagged by `type`.
// Server -> client: connected, instrument_list, account_list, order_snapshot,
//   order_update, execution_report, book_update, cancel_reject,
//   business_reject, error.
// Client -> server: new_order, cancel_order, replace_order, subscribe_book,
//   unsubscribe_book.
//
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    Account, BusinessReject, CancelOrderRequest, CancelReject, Execution, Instrument,
    NewOrderRequest, Order, OrderBookSnapshot, ReplaceOrderRequest,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected,
    InstrumentList { data: Vec<Instrument> },
    AccountList { data: Vec<Account> },
    OrderSnapshot { data: Vec<Order> },
    OrderUpdate { data: Order },
    ExecutionReport { data: Execution },
    BookUpdate { data: OrderBookSnapshot },
    CancelReject { data: CancelReject },
    BusinessReject { data: BusinessReject },
    Error { message: String },
}

impl ServerMessage {
    /// Wire tag, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected => "connected",
            ServerMessage::InstrumentList { .. } => "instrument_list",
            ServerMessage::AccountList { .. } => "account_list",
            ServerMessage::OrderSnapshot { .. } => "order_snapshot",
            ServerMessage::OrderUpdate { .. } => "order_update",
            ServerMessage::ExecutionReport { .. } => "execution_report",
            ServerMessage::BookUpdate { .. } => "book_update",
            ServerMessage::CancelReject { .. } => "cancel_reject",
            ServerMessage::BusinessReject { .. } => "business_reject",
            ServerMessage::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    NewOrder { data: NewOrderRequest },
    CancelOrder { data: CancelOrderRequest },
    ReplaceOrder { data: ReplaceOrderRequest },
    SubscribeBook { symbol: String },
    UnsubscribeBook { symbol: String },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::NewOrder { .. } => "new_order",
            ClientMessage::CancelOrder { .. } => "cancel_order",
            ClientMessage::ReplaceOrder { .. } => "replace_order",
            ClientMessage::SubscribeBook { .. } => "subscribe_book",
            ClientMessage::UnsubscribeBook { .. } => "unsubscribe_book",
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed frame ({len} bytes): {source}")]
    Decode {
        len: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn decode(frame: &str) -> Result<ServerMessage, CodecError> {
    serde_json::from_str(frame).map_err(|source| CodecError::Decode { len: frame.len(), source })
}

pub fn encode(msg: &ClientMessage) -> Result<String, CodecError> {
    Ok(serde_json::to_string(msg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecKind, ExecType, OrderStatus, OrderType, Side, TimeInForce};
    use serde_json::{json, Value};

    fn order_json(id: u64) -> Value {
        json!({
            "orderId": id, "origOrderId": 0, "clOrderId": "WS-1", "origClOrderId": "",
            "symbol": "EURUSD", "side": "BUY", "ordType": "LIMIT",
            "price": 1.2, "stopPx": 0.0, "avgPx": 0.0,
            "orderQty": 100, "cumQty": 0, "leavesQty": 100, "minQty": 0,
            "status": "NEW", "tif": "DAY", "capacity": "AGENCY", "currency": "USD",
            "account": "ACC1", "destination": "Internal", "source": "WebSocket",
            "creationTime": 1700000000000u64, "lastUpdateTime": 1700000000000u64, "expireTime": 0
        })
    }

    #[test]
    fn decodes_connected_ack() {
        assert_eq!(decode(r#"{"type":"connected"}"#).unwrap(), ServerMessage::Connected);
    }

    #[test]
    fn decodes_order_snapshot_and_update() {
        let frame = json!({ "type": "order_snapshot", "data": [order_json(1), order_json(2)] });
        match decode(&frame.to_string()).unwrap() {
            ServerMessage::OrderSnapshot { data } => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[0].side, Side::Buy);
                assert_eq!(data[0].ord_type, OrderType::Limit);
                assert_eq!(data[1].order_id, 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let frame = json!({ "type": "order_update", "data": order_json(7) });
        assert!(matches!(
            decode(&frame.to_string()).unwrap(),
            ServerMessage::OrderUpdate { data } if data.order_id == 7 && data.status == OrderStatus::New
        ));
    }

    #[test]
    fn decodes_every_execution_shape() {
        let base = |ty: &str| {
            json!({
                "execId": 10, "orderId": 1, "type": ty, "orderStatus": "PARTIAL_FILL",
                "market": "XNAS", "transactTime": 1700000000500u64
            })
        };

        let mut trade = base("TRADE");
        trade["lastQty"] = json!(40);
        trade["lastPx"] = json!(1.2);
        trade["currency"] = json!("USD");
        trade["tradeDate"] = json!(20240101);
        let exec = match decode(&json!({"type": "execution_report", "data": trade}).to_string()).unwrap() {
            ServerMessage::ExecutionReport { data } => data,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(exec.exec_type(), ExecType::Trade);
        assert_eq!(exec.fill(), Some((40, 1.2)));

        let mut correct = base("CORRECT");
        for (k, v) in [("cumQty", 40), ("leavesQty", 60), ("lastQty", 5), ("origOrderId", 0), ("execRefId", 9)] {
            correct[k] = json!(v);
        }
        correct["lastPx"] = json!(1);
        correct["currency"] = json!("EUR");
        correct["tradeDate"] = json!(0);
        let exec: Execution = serde_json::from_value(correct).unwrap();
        assert!(matches!(exec.kind, ExecKind::Correct { exec_ref_id: 9, last_qty: 5, .. }));
        assert_eq!(exec.fill(), Some((5, 1.0)));

        let mut cancel = base("CANCEL");
        cancel["execRefId"] = json!(10);
        let exec: Execution = serde_json::from_value(cancel).unwrap();
        assert_eq!(exec.kind, ExecKind::Cancel { exec_ref_id: 10 });

        let mut reject = base("REJECT");
        reject["rejectReason"] = json!("no liquidity");
        let exec: Execution = serde_json::from_value(reject).unwrap();
        assert_eq!(exec.kind, ExecKind::Reject { reject_reason: "no liquidity".into() });

        let mut replace = base("REPLACE");
        replace["origOrderId"] = json!(3);
        let exec: Execution = serde_json::from_value(replace).unwrap();
        assert_eq!(exec.kind, ExecKind::Replace { orig_order_id: 3 });

        for ty in ["NEW", "DFD", "EXPIRED", "SUSPENDED", "STATUS", "RESTATED", "PEND_CANCEL", "PEND_REPLACE"] {
            let exec: Execution = serde_json::from_value(base(ty)).unwrap();
            assert_eq!(exec.exec_type().as_str(), ty);
            assert_eq!(exec.fill(), None);
        }
    }

    #[test]
    fn decodes_book_and_rejects() {
        let frame = json!({
            "type": "book_update",
            "data": {
                "symbol": "EURUSD",
                "bids": [{"price": 1.1999, "qty": 500, "orderCount": 2}],
                "asks": [{"price": 1.2001, "qty": 300, "orderCount": 1}],
                "timestamp": 1700000000000u64
            }
        });
        match decode(&frame.to_string()).unwrap() {
            ServerMessage::BookUpdate { data } => {
                assert_eq!(data.symbol, "EURUSD");
                assert_eq!(data.bids[0].qty, 500);
                assert_eq!(data.asks[0].order_count, 1);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cr = decode(r#"{"type":"cancel_reject","data":{"orderId":5,"reason":"too late"}}"#).unwrap();
        assert_eq!(cr.kind(), "cancel_reject");
        let br = decode(r#"{"type":"business_reject","data":{"refId":6,"reason":"bad"}}"#).unwrap();
        assert!(matches!(br, ServerMessage::BusinessReject { data } if data.ref_id == 6));
        let err = decode(r#"{"type":"error","message":"Unknown instrument: XYZ"}"#).unwrap();
        assert!(matches!(err, ServerMessage::Error { message } if message.contains("XYZ")));
    }

    #[test]
    fn decodes_reference_lists() {
        let inst = decode(
            r#"{"type":"instrument_list","data":[{"id":1,"symbol":"EURUSD","securityId":"EU","securityIdSource":"RIC"}]}"#,
        )
        .unwrap();
        assert!(matches!(inst, ServerMessage::InstrumentList { data } if data[0].symbol == "EURUSD"));
        let acct = decode(
            r#"{"type":"account_list","data":[{"id":1,"account":"ACC1","firm":"FIRM","type":"AGENCY"}]}"#,
        )
        .unwrap();
        assert!(matches!(acct, ServerMessage::AccountList { data } if data[0].firm == "FIRM"));
    }

    #[test]
    fn malformed_frames_are_errors() {
        for frame in [
            "",
            "not json",
            r#"{"type":"mystery"}"#,
            r#"{"type":"order_update","data":{"orderId":"x"}}"#,
            r#"{"data":[]}"#,
        ] {
            let err = decode(frame).unwrap_err();
            assert!(matches!(err, CodecError::Decode { len, .. } if len == frame.len()));
        }
    }

    #[test]
    fn encodes_commands_with_optional_fields_omitted() {
        let msg = ClientMessage::NewOrder {
            data: NewOrderRequest {
                symbol: "EURUSD".into(),
                side: Side::SellShort,
                ord_type: OrderType::StopLimit,
                price: Some(1.2),
                stop_px: Some(1.19),
                order_qty: 100,
                min_qty: None,
                tif: TimeInForce::AtClose,
                account: None,
                currency: None,
                capacity: None,
            },
        };
        let v: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(v["type"], "new_order");
        assert_eq!(v["data"]["side"], "SELL_SHORT");
        assert_eq!(v["data"]["ordType"], "STOPLIMIT");
        assert_eq!(v["data"]["tif"], "ATCLOSE");
        assert_eq!(v["data"]["orderQty"], 100);
        assert!(v["data"].get("minQty").is_none());
        assert!(v["data"].get("account").is_none());

        let cancel = ClientMessage::CancelOrder {
            data: CancelOrderRequest { order_id: 42, cl_order_id: None },
        };
        assert_eq!(encode(&cancel).unwrap(), r#"{"type":"cancel_order","data":{"orderId":42}}"#);

        let sub = ClientMessage::SubscribeBook { symbol: "GBPUSD".into() };
        assert_eq!(encode(&sub).unwrap(), r#"{"type":"subscribe_book","symbol":"GBPUSD"}"#);
        let unsub = ClientMessage::UnsubscribeBook { symbol: "GBPUSD".into() };
        assert_eq!(encode(&unsub).unwrap(), r#"{"type":"unsubscribe_book","symbol":"GBPUSD"}"#);

        let replace = ClientMessage::ReplaceOrder {
            data: ReplaceOrderRequest { order_id: 9, price: Some(1.5), order_qty: None, tif: None },
        };
        assert_eq!(
            encode(&replace).unwrap(),
            r#"{"type":"replace_order","data":{"orderId":9,"price":1.5}}"#
        );
    }
}
