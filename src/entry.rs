// ===============================
// src/entry.rs (order entry form)
// ===============================
//
// Raw text fields in, validated request out. Validation order matters: the
// first failing check is the one reported.
//
use thiserror::Error;

use crate::domain::{
    Capacity, Currency, NewOrderRequest, OrderType, ReplaceOrderRequest, Side, TimeInForce,
};
use crate::store::OmsState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("Select an instrument")]
    NoInstrument,
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("Quantity must be > 0")]
    Quantity,
    #[error("Price must be > 0 for LIMIT orders")]
    Price,
    #[error("Stop price must be > 0 for STOP orders")]
    StopPrice,
    #[error("Min quantity must be a whole number")]
    MinQuantity,
    #[error("Order {0} cannot be canceled or replaced in its current status")]
    NotCancelable(u64),
}

pub const SUBMITTED: &str = "Order submitted";

#[derive(Debug, Clone, PartialEq)]
pub struct OrderForm {
    pub symbol: String,
    pub side: Side,
    pub ord_type: OrderType,
    pub price: String,
    pub stop_px: String,
    pub order_qty: String,
    pub min_qty: String,
    pub tif: TimeInForce,
    pub account: String,
    pub currency: Currency,
    pub capacity: Capacity,
}

impl Default for OrderForm {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            side: Side::Buy,
            ord_type: OrderType::Limit,
            price: String::new(),
            stop_px: String::new(),
            order_qty: String::new(),
            min_qty: String::new(),
            tif: TimeInForce::Day,
            account: String::new(),
            currency: Currency::Usd,
            capacity: Capacity::Agency,
        }
    }
}

fn positive_int(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok().filter(|q| *q > 0)
}

fn positive_num(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|p| p.is_finite() && *p > 0.0)
}

impl OrderForm {
    /// Check the form and build the outbound request. `state` supplies the
    /// instrument list; a symbol the gateway never listed is rejected here.
    pub fn validate(&self, state: &OmsState) -> Result<NewOrderRequest, EntryError> {
        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            return Err(EntryError::NoInstrument);
        }
        if state.instrument(symbol).is_none() {
            return Err(EntryError::UnknownInstrument(symbol.to_string()));
        }
        let order_qty = positive_int(&self.order_qty).ok_or(EntryError::Quantity)?;

        let price = if self.ord_type.needs_price() {
            Some(positive_num(&self.price).ok_or(EntryError::Price)?)
        } else {
            None
        };
        let stop_px = if self.ord_type.needs_stop_px() {
            Some(positive_num(&self.stop_px).ok_or(EntryError::StopPrice)?)
        } else {
            None
        };

        let min_qty = match self.min_qty.trim() {
            "" => None,
            s => Some(s.parse::<u64>().map_err(|_| EntryError::MinQuantity)?),
        };
        let account = match self.account.trim() {
            "" => None,
            a => Some(a.to_string()),
        };

        Ok(NewOrderRequest {
            symbol: symbol.to_string(),
            side: self.side,
            ord_type: self.ord_type,
            price,
            stop_px,
            order_qty,
            min_qty,
            tif: self.tif,
            account,
            currency: Some(self.currency),
            capacity: Some(self.capacity),
        })
    }
}

/// Replace ticket from the blotter. Only cancelable orders may be replaced;
/// any price/qty given must be positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaceForm {
    pub order_id: u64,
    pub price: Option<String>,
    pub order_qty: Option<String>,
    pub tif: Option<TimeInForce>,
}

impl ReplaceForm {
    pub fn validate(&self, state: &OmsState) -> Result<ReplaceOrderRequest, EntryError> {
        ensure_cancelable(state, self.order_id)?;
        let price = match &self.price {
            Some(p) => Some(positive_num(p).ok_or(EntryError::Price)?),
            None => None,
        };
        let order_qty = match &self.order_qty {
            Some(q) => Some(positive_int(q).ok_or(EntryError::Quantity)?),
            None => None,
        };
        Ok(ReplaceOrderRequest { order_id: self.order_id, price, order_qty, tif: self.tif })
    }
}

/// Unknown orders pass: the gateway is the authority and will reject.
pub fn ensure_cancelable(state: &OmsState, order_id: u64) -> Result<(), EntryError> {
    match state.order(order_id) {
        Some(o) if !o.status.is_cancelable() => Err(EntryError::NotCancelable(order_id)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Instrument, OrderStatus};
    use crate::store::tests::order;
    use crate::store::{Action, Store, DEFAULT_MAX_EXECUTIONS};
    use test_case::test_case;

    fn state() -> OmsState {
        let mut store = Store::new(DEFAULT_MAX_EXECUTIONS);
        store.dispatch(Action::InstrumentList(vec![Instrument {
            id: 1,
            symbol: "EURUSD".into(),
            security_id: "EUR=".into(),
            security_id_source: "RIC".into(),
        }]));
        store.dispatch(Action::OrderSnapshot(vec![
            order(1, "EURUSD", Side::Buy, OrderStatus::New),
            order(2, "EURUSD", Side::Buy, OrderStatus::Filled),
        ]));
        store.snapshot()
    }

    fn form(ord_type: OrderType, qty: &str, price: &str, stop: &str) -> OrderForm {
        OrderForm {
            symbol: "EURUSD".into(),
            ord_type,
            order_qty: qty.into(),
            price: price.into(),
            stop_px: stop.into(),
            ..OrderForm::default()
        }
    }

    #[test_case(form(OrderType::Limit, "0", "1.2", ""), EntryError::Quantity ; "zero qty")]
    #[test_case(form(OrderType::Limit, "-5", "1.2", ""), EntryError::Quantity ; "negative qty")]
    #[test_case(form(OrderType::Limit, "1.5", "1.2", ""), EntryError::Quantity ; "fractional qty")]
    #[test_case(form(OrderType::Limit, "", "1.2", ""), EntryError::Quantity ; "empty qty")]
    #[test_case(form(OrderType::Limit, "100", "", ""), EntryError::Price ; "limit without price")]
    #[test_case(form(OrderType::Limit, "100", "0", ""), EntryError::Price ; "limit zero price")]
    #[test_case(form(OrderType::StopLimit, "100", "1.2", "abc"), EntryError::StopPrice ; "stoplimit bad stop")]
    #[test_case(form(OrderType::Stop, "100", "", "-1"), EntryError::StopPrice ; "stop negative")]
    #[test_case(form(OrderType::StopLimit, "100", "", ""), EntryError::Price ; "stoplimit checks price first")]
    fn rejects_invalid_forms(f: OrderForm, expected: EntryError) {
        assert_eq!(f.validate(&state()).unwrap_err(), expected);
    }

    #[test]
    fn instrument_must_be_selected_and_known() {
        let mut f = form(OrderType::Market, "100", "", "");
        f.symbol.clear();
        assert_eq!(f.validate(&state()).unwrap_err(), EntryError::NoInstrument);
        assert_eq!(f.validate(&state()).unwrap_err().to_string(), "Select an instrument");
        f.symbol = "XYZ".into();
        assert_eq!(
            f.validate(&state()).unwrap_err(),
            EntryError::UnknownInstrument("XYZ".into())
        );
    }

    #[test]
    fn market_order_carries_no_prices_or_optionals() {
        let req = form(OrderType::Market, "100", "9", "9").validate(&state()).unwrap();
        assert_eq!(req.order_qty, 100);
        assert_eq!(req.price, None);
        assert_eq!(req.stop_px, None);
        assert_eq!(req.min_qty, None);
        assert_eq!(req.account, None);
        assert_eq!(req.currency, Some(Currency::Usd));
        assert_eq!(req.capacity, Some(Capacity::Agency));
    }

    #[test]
    fn optional_fields_included_when_provided() {
        let mut f = form(OrderType::StopLimit, "250", "1.21", "1.2");
        f.min_qty = "50".into();
        f.account = "ACC1".into();
        let req = f.validate(&state()).unwrap();
        assert_eq!(req.price, Some(1.21));
        assert_eq!(req.stop_px, Some(1.2));
        assert_eq!(req.min_qty, Some(50));
        assert_eq!(req.account.as_deref(), Some("ACC1"));
    }

    #[test]
    fn replace_checks_status_and_values() {
        let s = state();
        let ok = ReplaceForm { order_id: 1, price: Some("1.25".into()), ..ReplaceForm::default() };
        let req = ok.validate(&s).unwrap();
        assert_eq!(req.price, Some(1.25));
        assert_eq!(req.order_qty, None);

        let filled = ReplaceForm { order_id: 2, ..ReplaceForm::default() };
        assert_eq!(filled.validate(&s).unwrap_err(), EntryError::NotCancelable(2));

        let bad_qty = ReplaceForm { order_id: 1, order_qty: Some("0".into()), ..ReplaceForm::default() };
        assert_eq!(bad_qty.validate(&s).unwrap_err(), EntryError::Quantity);

        assert!(ensure_cancelable(&s, 404).is_ok());
    }
}
