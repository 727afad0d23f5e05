// ===============================
// src/commands.rs (stdin command line)
// ===============================
//
// Contoh:
//   buy EURUSD 100 @1.2000 tif=GTC acct=ACC1
//   sell GBPUSD 1000000 stoplimit @1.25 stop=1.2510 min=100
//   cancel 42 | replace 42 px=1.21 qty=500 | book EURUSD
//   orders | execs | positions | export [path] | help | quit
//
use thiserror::Error;

use crate::domain::{Capacity, Currency, OrderType, Side, TimeInForce};
use crate::entry::{OrderForm, ReplaceForm};
use crate::view::Tab;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NewOrder(OrderForm),
    Cancel(u64),
    Replace(ReplaceForm),
    Book(String),
    Show(Tab),
    Export(Option<String>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("bad {what}: `{value}`")]
    Bad { what: &'static str, value: String },
}

pub const HELP: &str = "\
commands:
  buy|sell|buy-|sell+|short|cross SYMBOL QTY [market|limit|stop|stoplimit] [@PX] [stop=PX] [min=QTY] [tif=TIF] [acct=ACCOUNT] [ccy=USD|EUR] [cap=CAPACITY]
  cancel ORDER_ID
  replace ORDER_ID [px=PRICE] [qty=QTY] [tif=TIF]
  book SYMBOL
  orders | execs | positions
  export [PATH]
  help | quit";

fn bad(what: &'static str, value: &str) -> CommandError {
    CommandError::Bad { what, value: value.to_string() }
}

fn parse_side(s: &str) -> Option<Side> {
    match s.to_ascii_lowercase().as_str() {
        "buy" | "b" => Some(Side::Buy),
        "sell" | "s" => Some(Side::Sell),
        "buy-" | "buy_minus" => Some(Side::BuyMinus),
        "sell+" | "sell_plus" => Some(Side::SellPlus),
        "short" | "sell_short" => Some(Side::SellShort),
        "cross" => Some(Side::Cross),
        _ => None,
    }
}

fn parse_ord_type(s: &str) -> Option<OrderType> {
    match s.to_ascii_lowercase().as_str() {
        "market" | "mkt" => Some(OrderType::Market),
        "limit" | "lmt" => Some(OrderType::Limit),
        "stop" => Some(OrderType::Stop),
        "stoplimit" | "stop_limit" => Some(OrderType::StopLimit),
        _ => None,
    }
}

fn parse_currency(s: &str) -> Option<Currency> {
    match s.to_ascii_uppercase().as_str() {
        "USD" => Some(Currency::Usd),
        "EUR" => Some(Currency::Eur),
        _ => None,
    }
}

fn parse_capacity(s: &str) -> Option<Capacity> {
    match s.to_ascii_uppercase().as_str() {
        "AGENCY" => Some(Capacity::Agency),
        "PRINCIPAL" => Some(Capacity::Principal),
        "PROPRIETARY" => Some(Capacity::Proprietary),
        "INDIVIDUAL" => Some(Capacity::Individual),
        "RISKLESS_PRINCIPAL" => Some(Capacity::RisklessPrincipal),
        "AGENT_FOR_ANOTHER_MEMBER" => Some(Capacity::AgentForAnotherMember),
        _ => None,
    }
}

fn parse_id(tok: Option<&str>) -> Result<u64, CommandError> {
    let tok = tok.ok_or(CommandError::Missing("order id"))?;
    tok.parse().map_err(|_| bad("order id", tok))
}

/// Numbers stay as text: the entry form owns numeric validation.
fn parse_order(side: Side, rest: &[&str]) -> Result<OrderForm, CommandError> {
    let mut form = OrderForm { side, ..OrderForm::default() };
    let mut it = rest.iter();
    form.symbol = it.next().map(|s| s.to_ascii_uppercase()).unwrap_or_default();
    form.order_qty = it.next().map(|s| s.to_string()).unwrap_or_default();

    for tok in it {
        if let Some(px) = tok.strip_prefix('@') {
            form.price = px.to_string();
        } else if let Some((key, val)) = tok.split_once('=') {
            match key.to_ascii_lowercase().as_str() {
                "px" | "price" => form.price = val.to_string(),
                "stop" => form.stop_px = val.to_string(),
                "min" => form.min_qty = val.to_string(),
                "tif" => form.tif = TimeInForce::parse(val).ok_or_else(|| bad("tif", val))?,
                "acct" | "account" => form.account = val.to_string(),
                "ccy" | "currency" => form.currency = parse_currency(val).ok_or_else(|| bad("currency", val))?,
                "cap" | "capacity" => form.capacity = parse_capacity(val).ok_or_else(|| bad("capacity", val))?,
                _ => return Err(bad("option", tok)),
            }
        } else if let Some(t) = parse_ord_type(tok) {
            form.ord_type = t;
        } else {
            return Err(bad("argument", tok));
        }
    }
    Ok(form)
}

fn parse_replace(rest: &[&str]) -> Result<ReplaceForm, CommandError> {
    let mut form = ReplaceForm { order_id: parse_id(rest.first().copied())?, ..ReplaceForm::default() };
    for tok in rest.iter().skip(1) {
        let (key, val) = tok.split_once('=').ok_or_else(|| bad("option", tok))?;
        match key.to_ascii_lowercase().as_str() {
            "px" | "price" => form.price = Some(val.to_string()),
            "qty" => form.order_qty = Some(val.to_string()),
            "tif" => form.tif = Some(TimeInForce::parse(val).ok_or_else(|| bad("tif", val))?),
            _ => return Err(bad("option", tok)),
        }
    }
    Ok(form)
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let toks: Vec<&str> = line.split_whitespace().collect();
    let (head, rest) = toks.split_first().ok_or(CommandError::Empty)?;

    if let Some(side) = parse_side(head) {
        return parse_order(side, rest).map(Command::NewOrder);
    }
    match head.to_ascii_lowercase().as_str() {
        "cancel" => Ok(Command::Cancel(parse_id(rest.first().copied())?)),
        "replace" => parse_replace(rest).map(Command::Replace),
        "book" => rest
            .first()
            .map(|s| Command::Book(s.to_ascii_uppercase()))
            .ok_or(CommandError::Missing("symbol")),
        "orders" => Ok(Command::Show(Tab::Orders)),
        "execs" | "executions" => Ok(Command::Show(Tab::Executions)),
        "positions" | "pos" => Ok(Command::Show(Tab::Positions)),
        "export" => Ok(Command::Export(rest.first().map(|s| s.to_string()))),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(head.to_string())),
    }
}
