//! Translation tables between Tiger vocabulary and the canonical model.
//!
//! Broker strings are first parsed into small Tiger-native enums, then
//! converted with exhaustive matches, so adding a variant on either side
//! is a compile error until every table handles it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::TransportError;
use crate::models::{
    AssetType, Bar, BarInterval, OrderRequest, OrderResponse, OrderSide, OrderStatus, OrderType,
    OrderValidationError, Position, TimeInForce,
};

use super::BROKER_NAME;
use super::wire::{TigerBar, TigerOrder, TigerPlaceOrder, TigerPosition};

/// Uppercases and strips `_`, `-` and spaces so `"PARTIALLY_FILLED"`,
/// `"PartiallyFilled"` and `"partially filled"` compare equal.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Order status
// ---------------------------------------------------------------------------

/// Order states Tiger reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TigerOrderStatus {
    Initial,
    PendingNew,
    PendingSubmit,
    Submitted,
    PartiallyFilled,
    Filled,
    PendingCancel,
    Cancelled,
    Inactive,
    Invalid,
    Rejected,
    Expired,
    /// Anything not listed above.
    Unknown(String),
}

/// Status strings the connector recognizes, in Tiger's own spelling.
pub const KNOWN_STATUSES: [&str; 12] = [
    "Initial",
    "PendingNew",
    "PendingSubmit",
    "Submitted",
    "PartiallyFilled",
    "Filled",
    "PendingCancel",
    "Cancelled",
    "Inactive",
    "Invalid",
    "Rejected",
    "Expired",
];

impl TigerOrderStatus {
    /// Total parse: unrecognized strings become [`TigerOrderStatus::Unknown`].
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "INITIAL" => Self::Initial,
            "PENDINGNEW" | "NEW" => Self::PendingNew,
            "PENDINGSUBMIT" => Self::PendingSubmit,
            "SUBMITTED" | "HELD" => Self::Submitted,
            "PARTIALLYFILLED" => Self::PartiallyFilled,
            "FILLED" => Self::Filled,
            "PENDINGCANCEL" => Self::PendingCancel,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            "INACTIVE" => Self::Inactive,
            "INVALID" => Self::Invalid,
            "REJECTED" => Self::Rejected,
            "EXPIRED" => Self::Expired,
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

/// Converts a Tiger status into the canonical one.
///
/// `PendingCancel` stays `New`: the order is still working until the
/// broker confirms the cancel. `Unknown` also maps to `New`, which is a
/// conservative guess rather than a proven default; it is logged so a
/// misreported rejection can be traced.
pub fn to_order_status(status: &TigerOrderStatus) -> OrderStatus {
    match status {
        TigerOrderStatus::Initial
        | TigerOrderStatus::PendingNew
        | TigerOrderStatus::PendingSubmit
        | TigerOrderStatus::Submitted
        | TigerOrderStatus::PendingCancel => OrderStatus::New,
        TigerOrderStatus::PartiallyFilled => OrderStatus::PartiallyFilled,
        TigerOrderStatus::Filled => OrderStatus::Filled,
        TigerOrderStatus::Cancelled => OrderStatus::Canceled,
        TigerOrderStatus::Inactive | TigerOrderStatus::Invalid | TigerOrderStatus::Rejected => {
            OrderStatus::Rejected
        }
        TigerOrderStatus::Expired => OrderStatus::Expired,
        TigerOrderStatus::Unknown(raw) => {
            warn!(broker = BROKER_NAME, status = %raw, "unrecognized order status, reporting as new");
            OrderStatus::New
        }
    }
}

/// Maps a raw Tiger status string. Never fails.
pub fn map_order_status(raw: &str) -> OrderStatus {
    to_order_status(&TigerOrderStatus::parse(raw))
}

/// Whether `raw` is a status the tables know, as opposed to one that only
/// maps to `New` through the fallback.
pub fn is_known_status(raw: &str) -> bool {
    !matches!(TigerOrderStatus::parse(raw), TigerOrderStatus::Unknown(_))
}

// ---------------------------------------------------------------------------
// Order type, side, time in force
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TigerOrderType {
    Mkt,
    Lmt,
    Stp,
    StpLmt,
    Trail,
}

impl TigerOrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mkt => "MKT",
            Self::Lmt => "LMT",
            Self::Stp => "STP",
            Self::StpLmt => "STP_LMT",
            Self::Trail => "TRAIL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "MKT" => Some(Self::Mkt),
            "LMT" => Some(Self::Lmt),
            "STP" => Some(Self::Stp),
            "STPLMT" => Some(Self::StpLmt),
            "TRAIL" => Some(Self::Trail),
            _ => None,
        }
    }
}

/// Canonical to Tiger. `None` means Tiger cannot express the type.
pub fn to_tiger_order_type(order_type: OrderType) -> Option<TigerOrderType> {
    match order_type {
        OrderType::Market => Some(TigerOrderType::Mkt),
        OrderType::Limit => Some(TigerOrderType::Lmt),
        OrderType::Stop => Some(TigerOrderType::Stp),
        OrderType::StopLimit => Some(TigerOrderType::StpLmt),
        OrderType::TrailingStop => Some(TigerOrderType::Trail),
    }
}

/// Tiger to canonical; inverse of [`to_tiger_order_type`].
pub fn from_tiger_order_type(order_type: TigerOrderType) -> OrderType {
    match order_type {
        TigerOrderType::Mkt => OrderType::Market,
        TigerOrderType::Lmt => OrderType::Limit,
        TigerOrderType::Stp => OrderType::Stop,
        TigerOrderType::StpLmt => OrderType::StopLimit,
        TigerOrderType::Trail => OrderType::TrailingStop,
    }
}

pub fn to_tiger_action(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}

pub fn from_tiger_action(raw: &str) -> Option<OrderSide> {
    match normalize(raw).as_str() {
        "BUY" => Some(OrderSide::Buy),
        "SELL" => Some(OrderSide::Sell),
        _ => None,
    }
}

/// Tiger only knows day and good-'til-cancelled orders.
pub fn to_tiger_time_in_force(tif: TimeInForce) -> Option<&'static str> {
    match tif {
        TimeInForce::Day => Some("DAY"),
        TimeInForce::Gtc => Some("GTC"),
        TimeInForce::Ioc | TimeInForce::Fok => None,
    }
}

// ---------------------------------------------------------------------------
// Asset type
// ---------------------------------------------------------------------------

pub fn to_sec_type(asset_type: AssetType) -> &'static str {
    match asset_type {
        AssetType::Stock => "STK",
        AssetType::Option => "OPT",
        AssetType::Future => "FUT",
        AssetType::Forex => "CASH",
        AssetType::Crypto => "CC",
        AssetType::Fund => "FUND",
        AssetType::Warrant => "WAR",
    }
}

/// Tiger security type to canonical asset type.
///
/// Missing or unrecognized values fall back to [`AssetType::Stock`].
pub fn from_sec_type(raw: Option<&str>) -> AssetType {
    let Some(raw) = raw else {
        return AssetType::Stock;
    };
    match normalize(raw).as_str() {
        "STK" => AssetType::Stock,
        "OPT" => AssetType::Option,
        "FUT" => AssetType::Future,
        "CASH" | "FOREX" => AssetType::Forex,
        "CC" | "CRYPTO" => AssetType::Crypto,
        "FUND" => AssetType::Fund,
        "WAR" | "IOPT" => AssetType::Warrant,
        _ => {
            warn!(broker = BROKER_NAME, sec_type = raw, "unrecognized security type, treating as stock");
            AssetType::Stock
        }
    }
}

// ---------------------------------------------------------------------------
// Bar interval
// ---------------------------------------------------------------------------

/// Canonical interval to Tiger `period`.
pub fn to_tiger_period(interval: BarInterval) -> &'static str {
    match interval {
        BarInterval::OneMinute => "1min",
        BarInterval::FiveMinutes => "5min",
        BarInterval::FifteenMinutes => "15min",
        BarInterval::ThirtyMinutes => "30min",
        BarInterval::OneHour => "60min",
        BarInterval::FourHours => "4hour",
        BarInterval::OneDay => "day",
        BarInterval::OneWeek => "week",
        BarInterval::OneMonth => "month",
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Epoch milliseconds to UTC.
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Builds the `POST /order` payload.
///
/// # Errors
///
/// Returns [`OrderValidationError`] when the request uses an order type or
/// time in force Tiger cannot express. Nothing is downgraded silently.
pub fn to_place_order(
    request: &OrderRequest,
    account: &str,
) -> Result<TigerPlaceOrder, OrderValidationError> {
    let order_type = to_tiger_order_type(request.order_type).ok_or_else(|| {
        OrderValidationError::UnsupportedOrderType {
            broker: BROKER_NAME.to_string(),
            order_type: request.order_type,
        }
    })?;

    let tif = request.time_in_force.unwrap_or(TimeInForce::Day);
    let time_in_force = to_tiger_time_in_force(tif).ok_or_else(|| {
        OrderValidationError::UnsupportedTimeInForce {
            broker: BROKER_NAME.to_string(),
            time_in_force: tif,
        }
    })?;

    Ok(TigerPlaceOrder {
        account: account.to_string(),
        symbol: request.symbol.trim().to_string(),
        sec_type: to_sec_type(request.asset_type.unwrap_or_default()),
        action: to_tiger_action(request.side),
        order_type: order_type.as_str(),
        total_quantity: request.quantity,
        limit_price: request.price,
        aux_price: request.stop_price,
        time_in_force,
        external_id: request.client_order_id.clone(),
    })
}

/// Converts a Tiger order into the canonical response.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] if the side, order type or
/// timestamps cannot be interpreted.
pub fn to_order_response(order: TigerOrder) -> Result<OrderResponse, TransportError> {
    let side = from_tiger_action(&order.action)
        .ok_or_else(|| TransportError::Decode(format!("unknown order action {:?}", order.action)))?;
    let order_type = TigerOrderType::parse(&order.order_type)
        .map(from_tiger_order_type)
        .ok_or_else(|| {
            TransportError::Decode(format!("unknown order type {:?}", order.order_type))
        })?;
    let created_time = from_millis(order.open_time)
        .ok_or_else(|| TransportError::Decode(format!("invalid openTime {}", order.open_time)))?;
    let updated_time = order
        .update_time
        .and_then(from_millis)
        .map_or(created_time, |t| t.max(created_time));

    let status = map_order_status(&order.status);
    let filled_quantity = filled_for(&order, status);

    Ok(OrderResponse {
        order_id: order.id.to_string(),
        symbol: order.symbol,
        side,
        order_type,
        quantity: order.total_quantity,
        price: order.limit_price,
        stop_price: order.aux_price,
        status,
        filled_quantity,
        remaining_quantity: OrderResponse::remaining_for(
            status,
            order.total_quantity,
            filled_quantity,
        ),
        created_time,
        updated_time,
        client_order_id: order.external_id,
    })
}

/// Filled quantity, kept within `0..=total_quantity`.
///
/// A `Filled` order without `filledQuantity` is taken as fully filled.
/// Overfill reports are clamped so `filled + remaining == quantity` holds.
fn filled_for(order: &TigerOrder, status: OrderStatus) -> Decimal {
    let total = order.total_quantity;
    let filled = match order.filled_quantity {
        Some(filled) => filled,
        None if status == OrderStatus::Filled => total,
        None => Decimal::ZERO,
    };

    if filled > total {
        warn!(
            broker = BROKER_NAME,
            order_id = order.id,
            %filled,
            %total,
            "filled quantity exceeds order quantity, clamping"
        );
        return total;
    }
    filled.max(Decimal::ZERO)
}

/// Converts a Tiger holding into a canonical position.
///
/// `fallback_time` is used when the broker omits the update timestamp.
pub fn to_position(position: TigerPosition, fallback_time: DateTime<Utc>) -> Position {
    let market_value = position
        .market_value
        .unwrap_or(position.quantity * position.market_price);
    Position {
        asset_type: from_sec_type(position.sec_type.as_deref()),
        unrealized_pnl_percent: Position::pnl_percent(
            position.quantity,
            position.average_cost,
            position.unrealized_pnl,
        ),
        symbol: position.symbol,
        quantity: position.quantity,
        entry_price: position.average_cost,
        mark_price: position.market_price,
        unrealized_pnl: position.unrealized_pnl,
        market_value,
        last_updated: position
            .update_timestamp
            .and_then(from_millis)
            .unwrap_or(fallback_time),
    }
}

/// Converts one candle.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] for an invalid bar timestamp.
pub fn to_bar(symbol: &str, interval: BarInterval, bar: TigerBar) -> Result<Bar, TransportError> {
    let open_time = from_millis(bar.time)
        .ok_or_else(|| TransportError::Decode(format!("invalid bar time {}", bar.time)))?;
    Ok(Bar {
        symbol: symbol.to_string(),
        interval,
        open_time,
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_type_round_trips() {
        for order_type in OrderType::ALL {
            let tiger = to_tiger_order_type(order_type).unwrap();
            assert_eq!(from_tiger_order_type(tiger), order_type);
            // The wire string parses back to the same Tiger type.
            assert_eq!(TigerOrderType::parse(tiger.as_str()), Some(tiger));
        }
    }

    #[test]
    fn every_known_status_maps() {
        for raw in KNOWN_STATUSES {
            assert!(is_known_status(raw), "{raw} should be known");
            // Upper-case spellings are accepted too.
            assert_eq!(map_order_status(raw), map_order_status(&raw.to_uppercase()));
        }
    }

    #[test]
    fn status_table() {
        assert_eq!(map_order_status("Initial"), OrderStatus::New);
        assert_eq!(map_order_status("Submitted"), OrderStatus::New);
        assert_eq!(map_order_status("PendingCancel"), OrderStatus::New);
        assert_eq!(map_order_status("PARTIALLY_FILLED"), OrderStatus::PartiallyFilled);
        assert_eq!(map_order_status("FILLED"), OrderStatus::Filled);
        assert_eq!(map_order_status("Cancelled"), OrderStatus::Canceled);
        assert_eq!(map_order_status("CANCELED"), OrderStatus::Canceled);
        assert_eq!(map_order_status("Inactive"), OrderStatus::Rejected);
        assert_eq!(map_order_status("Invalid"), OrderStatus::Rejected);
        assert_eq!(map_order_status("Expired"), OrderStatus::Expired);
    }

    #[test]
    fn unknown_status_defaults_to_new() {
        // Known limitation: an unrecognized terminal state is reported as live.
        assert!(!is_known_status("Suspended"));
        assert_eq!(map_order_status("Suspended"), OrderStatus::New);
        assert_eq!(map_order_status(""), OrderStatus::New);
    }

    #[test]
    fn tif_ioc_and_fok_unsupported() {
        assert_eq!(to_tiger_time_in_force(TimeInForce::Day), Some("DAY"));
        assert_eq!(to_tiger_time_in_force(TimeInForce::Gtc), Some("GTC"));
        assert!(to_tiger_time_in_force(TimeInForce::Ioc).is_none());
        assert!(to_tiger_time_in_force(TimeInForce::Fok).is_none());
    }

    #[test]
    fn sec_type_round_trips_and_falls_back() {
        for asset in [
            AssetType::Stock,
            AssetType::Option,
            AssetType::Future,
            AssetType::Forex,
            AssetType::Crypto,
            AssetType::Fund,
            AssetType::Warrant,
        ] {
            assert_eq!(from_sec_type(Some(to_sec_type(asset))), asset);
        }
        assert_eq!(from_sec_type(Some("BOND")), AssetType::Stock);
        assert_eq!(from_sec_type(None), AssetType::Stock);
    }

    #[test]
    fn every_interval_has_a_period() {
        let periods: Vec<_> = BarInterval::ALL.into_iter().map(to_tiger_period).collect();
        assert_eq!(
            periods,
            ["1min", "5min", "15min", "30min", "60min", "4hour", "day", "week", "month"]
        );
    }

    #[test]
    fn place_order_payload() {
        let request = OrderRequest {
            client_order_id: Some("cl-1".into()),
            time_in_force: Some(TimeInForce::Gtc),
            ..OrderRequest::limit("AAPL", OrderSide::Sell, dec!(3), dec!(190))
        };
        let payload = to_place_order(&request, "U1").unwrap();
        assert_eq!(payload.account, "U1");
        assert_eq!(payload.action, "SELL");
        assert_eq!(payload.order_type, "LMT");
        assert_eq!(payload.sec_type, "STK");
        assert_eq!(payload.time_in_force, "GTC");
        assert_eq!(payload.limit_price, Some(dec!(190)));
        assert_eq!(payload.external_id.as_deref(), Some("cl-1"));
    }

    #[test]
    fn place_order_rejects_ioc() {
        let request = OrderRequest {
            time_in_force: Some(TimeInForce::Ioc),
            ..OrderRequest::market("AAPL", OrderSide::Buy, dec!(1))
        };
        assert!(matches!(
            to_place_order(&request, "U1"),
            Err(OrderValidationError::UnsupportedTimeInForce { .. })
        ));
    }

    fn tiger_order(status: &str, filled: Decimal) -> TigerOrder {
        TigerOrder {
            id: 99,
            symbol: "AAPL".into(),
            action: "BUY".into(),
            order_type: "LMT".into(),
            total_quantity: dec!(10),
            filled_quantity: Some(filled),
            limit_price: Some(dec!(150)),
            aux_price: None,
            status: status.into(),
            open_time: 1_700_000_000_000,
            update_time: Some(1_700_000_060_000),
            external_id: None,
        }
    }

    #[test]
    fn order_response_quantities() {
        let resp = to_order_response(tiger_order("PartiallyFilled", dec!(4))).unwrap();
        assert_eq!(resp.order_id, "99");
        assert_eq!(resp.status, OrderStatus::PartiallyFilled);
        assert_eq!(resp.filled_quantity + resp.remaining_quantity, resp.quantity);
        assert!(resp.updated_time >= resp.created_time);
    }

    #[test]
    fn filled_order_without_fill_amount_is_fully_filled() {
        let mut order = tiger_order("FILLED", dec!(0));
        order.filled_quantity = None;
        let resp = to_order_response(order).unwrap();
        assert_eq!(resp.status, OrderStatus::Filled);
        assert_eq!(resp.filled_quantity, dec!(10));
        assert_eq!(resp.remaining_quantity, dec!(0));
    }

    #[test]
    fn working_order_without_fill_amount_has_nothing_filled() {
        let mut order = tiger_order("Submitted", dec!(0));
        order.filled_quantity = None;
        let resp = to_order_response(order).unwrap();
        assert_eq!(resp.filled_quantity, dec!(0));
        assert_eq!(resp.remaining_quantity, dec!(10));
    }

    #[test]
    fn overfill_is_clamped_to_order_quantity() {
        let resp = to_order_response(tiger_order("Filled", dec!(11))).unwrap();
        assert_eq!(resp.filled_quantity, dec!(10));
        assert_eq!(resp.remaining_quantity, dec!(0));
        assert_eq!(resp.filled_quantity + resp.remaining_quantity, resp.quantity);
    }

    #[test]
    fn order_response_clamps_update_before_creation() {
        let mut order = tiger_order("Submitted", dec!(0));
        order.update_time = Some(order.open_time - 5_000);
        let resp = to_order_response(order).unwrap();
        assert_eq!(resp.updated_time, resp.created_time);
    }

    #[test]
    fn order_response_rejects_unknown_action() {
        let mut order = tiger_order("Filled", dec!(10));
        order.action = "SHORT".into();
        assert!(matches!(
            to_order_response(order),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn position_mapping() {
        let position = TigerPosition {
            symbol: "TSLA".into(),
            sec_type: Some("STK".into()),
            quantity: dec!(-5),
            average_cost: dec!(200),
            market_price: dec!(190),
            unrealized_pnl: dec!(50),
            market_value: None,
            update_timestamp: None,
        };
        let now = Utc::now();
        let mapped = to_position(position, now);
        assert!(mapped.is_short());
        assert_eq!(mapped.market_value, dec!(-950));
        assert_eq!(mapped.unrealized_pnl_percent, dec!(5));
        assert_eq!(mapped.last_updated, now);
    }
}
