//! Tiger Brokers connector.
//!
//! Talks to the Tiger open API over REST and exposes it through the
//! [`Broker`] contract. The connector is organized by concern:
//! - [`wire`] - JSON types exactly as Tiger sends and expects them
//! - [`mapping`] - translation between Tiger vocabulary and canonical models

pub mod mapping;
pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::Result;
use crate::auth::{AuthHeaders, RequestSigner};
use crate::broker::{Broker, DEFAULT_HISTORY_LIMIT};
use crate::config::TigerConfig;
use crate::credentials::Credentials;
use crate::error::{BrokerError, TransportError};
use crate::models::{
    AccountInfo, Bar, BarInterval, ConnectionStatus, MarketQuote, OrderRequest, OrderResponse,
    OrderType, Position,
};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

use wire::{
    Envelope, TigerAccountSummary, TigerKlines, TigerOrder, TigerOrderAck, TigerPosition,
    TigerQuote, TigerSymbol,
};

/// Broker identifier used in logs and errors.
pub const BROKER_NAME: &str = "tiger";

const AUTH_HEADERS: AuthHeaders = AuthHeaders {
    account: "X-Tiger-Account",
    timestamp: "X-Tiger-Timestamp",
    signature: "X-Tiger-Signature",
};

/// Connectivity probe used by `connect`.
const PROBE_PATH: &str = "/account/summary";

/// Envelope code Tiger sends with a 404 for an order it does not hold.
const ORDER_NOT_FOUND_CODE: i64 = 404;

/// Authenticated state shared by all operations.
#[derive(Default)]
struct Session {
    status: ConnectionStatus,
    credentials: Option<Arc<Credentials>>,
}

/// [`Broker`] implementation for Tiger Brokers.
///
/// One instance holds one transport and one session. Operations read a
/// snapshot of the session, so a concurrent [`connect`](Broker::connect)
/// is seen either entirely or not at all.
pub struct TigerConnector {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
    session: RwLock<Session>,
    /// Serializes `connect` calls.
    connect_lock: Mutex<()>,
}

impl TigerConnector {
    /// Creates a connector talking HTTP to `config.base_url`.
    ///
    /// Credentials in `config` are not used here; pass them to
    /// [`connect`](Broker::connect).
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &TigerConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.base_url, config.timeout)
            .map_err(|e| BrokerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Creates a connector over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            signer: RequestSigner::new(AUTH_HEADERS),
            session: RwLock::new(Session::default()),
            connect_lock: Mutex::new(()),
        }
    }

    /// Returns the live session's credentials.
    async fn credentials(&self) -> Result<Arc<Credentials>> {
        let session = self.session.read().await;
        match (&session.status, &session.credentials) {
            (ConnectionStatus::Connected, Some(credentials)) => Ok(Arc::clone(credentials)),
            _ => Err(BrokerError::NotConnected {
                broker: BROKER_NAME.to_string(),
            }),
        }
    }

    async fn install(&self, status: ConnectionStatus, credentials: Option<Arc<Credentials>>) {
        let mut session = self.session.write().await;
        session.status = status;
        session.credentials = credentials;
    }

    /// Drops the session if it still uses `credentials`.
    async fn revoke(&self, credentials: &Arc<Credentials>) {
        let mut session = self.session.write().await;
        let current = session
            .credentials
            .as_ref()
            .is_some_and(|c| Arc::ptr_eq(c, credentials));
        if current {
            warn!(broker = BROKER_NAME, "credentials rejected, session closed");
            session.status = ConnectionStatus::Error;
            session.credentials = None;
        }
    }

    /// Logs a transport failure and wraps it for the caller.
    fn fail(&self, operation: &'static str, source: TransportError) -> BrokerError {
        warn!(
            broker = BROKER_NAME,
            operation,
            timeout = source.is_timeout(),
            error = %source,
            "broker request failed"
        );
        BrokerError::RequestFailed {
            broker: BROKER_NAME.to_string(),
            operation,
            source,
        }
    }

    /// Signs `request` with `credentials` and sends it once.
    async fn send(
        &self,
        operation: &'static str,
        credentials: &Credentials,
        mut request: HttpRequest,
    ) -> Result<HttpResponse> {
        self.signer
            .apply(credentials, &mut request)
            .map_err(|e| self.fail(operation, e))?;

        debug!(
            broker = BROKER_NAME,
            operation,
            method = %request.method,
            path = %request.path,
            "sending request"
        );

        self.transport
            .send(request)
            .await
            .map_err(|e| self.fail(operation, e))
    }

    /// Sends within the session and closes it on an authentication failure.
    async fn send_in_session(
        &self,
        operation: &'static str,
        credentials: &Arc<Credentials>,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let response = self.send(operation, credentials, request).await?;
        if response.is_auth_failure() {
            self.revoke(credentials).await;
        }
        Ok(response)
    }

    /// Checks the status and unwraps the envelope payload.
    fn decode<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: HttpResponse,
    ) -> Result<Option<T>> {
        if !response.is_success() {
            return Err(self.fail(
                operation,
                TransportError::Status {
                    status: response.status,
                    body: response.body,
                },
            ));
        }

        let envelope: Envelope<T> = serde_json::from_str(&response.body)
            .map_err(|e| self.fail(operation, TransportError::Decode(e.to_string())))?;
        envelope.into_data().map_err(|e| self.fail(operation, e))
    }

    /// Sends an authenticated request and decodes its payload.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        credentials: &Arc<Credentials>,
        request: HttpRequest,
    ) -> Result<Option<T>> {
        let response = self.send_in_session(operation, credentials, request).await?;
        self.decode(operation, response)
    }

    /// Like [`call`](Self::call) but treats a missing payload as malformed.
    async fn call_required<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        credentials: &Arc<Credentials>,
        request: HttpRequest,
    ) -> Result<T> {
        self.call(operation, credentials, request)
            .await?
            .ok_or_else(|| {
                self.fail(
                    operation,
                    TransportError::Decode("response has no data".to_string()),
                )
            })
    }

    async fn fetch_positions(&self, credentials: &Arc<Credentials>) -> Result<Vec<Position>> {
        let path = format!("/account/{}/positions", credentials.account_id());
        let positions: Vec<TigerPosition> = self
            .call("get_positions", credentials, HttpRequest::get(path))
            .await?
            .unwrap_or_default();

        let now = Utc::now();
        Ok(positions
            .into_iter()
            .map(|p| mapping::to_position(p, now))
            .collect())
    }

    /// Path for one order. Tiger order ids are decimal integers; anything
    /// else cannot name an order and is refused before any I/O.
    fn order_path(&self, order_id: &str) -> Result<String> {
        if order_id.is_empty() || !order_id.bytes().all(|b| b.is_ascii_digit()) {
            debug!(broker = BROKER_NAME, order_id, "malformed order id");
            return Err(BrokerError::NotFound {
                broker: BROKER_NAME.to_string(),
                what: format!("order {order_id:?}"),
            });
        }
        Ok(format!("/order/{order_id}"))
    }

    fn map_orders(
        &self,
        operation: &'static str,
        orders: Vec<TigerOrder>,
    ) -> Result<Vec<OrderResponse>> {
        orders
            .into_iter()
            .map(|o| mapping::to_order_response(o).map_err(|e| self.fail(operation, e)))
            .collect()
    }
}

#[async_trait]
impl Broker for TigerConnector {
    fn name(&self) -> &str {
        BROKER_NAME
    }

    async fn status(&self) -> ConnectionStatus {
        self.session.read().await.status
    }

    fn supports_order_type(&self, order_type: OrderType) -> bool {
        mapping::to_tiger_order_type(order_type).is_some()
    }

    async fn connect(&self, credentials: Credentials) -> Result<ConnectionStatus> {
        let _guard = self.connect_lock.lock().await;

        if credentials.is_incomplete() {
            self.install(ConnectionStatus::Error, None).await;
            return Err(BrokerError::ConnectionFailed {
                broker: BROKER_NAME.to_string(),
                reason: "account id, api key and api secret are all required".to_string(),
            });
        }

        // Probe with the new credentials before installing them, so readers
        // keep the old session until the new one is confirmed.
        let credentials = Arc::new(credentials);
        let probe = match self
            .send("connect", &credentials, HttpRequest::get(PROBE_PATH))
            .await
        {
            Ok(response) => self.decode::<serde_json::Value>("connect", response),
            Err(e) => Err(e),
        };

        match probe {
            Ok(_) => {
                info!(
                    broker = BROKER_NAME,
                    account = credentials.account_id(),
                    "connected"
                );
                self.install(ConnectionStatus::Connected, Some(credentials))
                    .await;
                Ok(ConnectionStatus::Connected)
            }
            Err(e) => {
                warn!(broker = BROKER_NAME, error = %e, "connection probe failed");
                self.install(ConnectionStatus::Error, None).await;
                Ok(ConnectionStatus::Error)
            }
        }
    }

    async fn get_account_info(&self) -> Result<AccountInfo> {
        let credentials = self.credentials().await?;

        let path = format!("/account/{}/summary", credentials.account_id());
        let summary: TigerAccountSummary = self
            .call_required("get_account_summary", &credentials, HttpRequest::get(path))
            .await
            .map_err(|e| BrokerError::AccountQueryFailed(Box::new(e)))?;

        let positions = self
            .fetch_positions(&credentials)
            .await
            .map_err(|e| BrokerError::AccountQueryFailed(Box::new(e)))?;

        let account_id = if summary.account.is_empty() {
            credentials.account_id().to_string()
        } else {
            summary.account
        };

        Ok(AccountInfo {
            account_id,
            balance: summary.cash_balance,
            currency: summary.currency,
            equity: summary.net_liquidation,
            margin_used: summary.init_margin_req,
            margin_available: summary.available_funds,
            positions,
            last_updated: summary
                .update_timestamp
                .and_then(mapping::from_millis)
                .unwrap_or_else(Utc::now),
        })
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        let credentials = self.credentials().await?;
        self.fetch_positions(&credentials).await
    }

    async fn place_order(&self, request: OrderRequest) -> Result<OrderResponse> {
        request.validate()?;
        let credentials = self.credentials().await?;
        let payload = mapping::to_place_order(&request, credentials.account_id())?;
        let body = serde_json::to_string(&payload)?;

        let ack: TigerOrderAck = self
            .call_required(
                "place_order",
                &credentials,
                HttpRequest::post("/order").with_json_body(body),
            )
            .await?;

        let order_id = ack.id.to_string();
        info!(
            broker = BROKER_NAME,
            order_id = %order_id,
            symbol = %request.symbol,
            side = ?request.side,
            order_type = %request.order_type,
            qty = %request.quantity,
            "order accepted"
        );

        Ok(OrderResponse::accepted(order_id, &request, Utc::now()))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool> {
        let path = self.order_path(order_id)?;
        let credentials = self.credentials().await?;
        let request = HttpRequest::delete(path)
            .with_query("account", credentials.account_id());

        match self.call::<serde_json::Value>("cancel_order", &credentials, request).await {
            Ok(_) => {
                info!(broker = BROKER_NAME, order_id, "cancel accepted");
                Ok(true)
            }
            // The broker answered but declined, e.g. the order already filled.
            Err(BrokerError::RequestFailed {
                source: TransportError::Api { code, message },
                ..
            }) => {
                info!(broker = BROKER_NAME, order_id, code, %message, "cancel declined");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderResponse>> {
        let path = self.order_path(order_id)?;
        let credentials = self.credentials().await?;
        let request = HttpRequest::get(path)
            .with_query("account", credentials.account_id());
        let response = self
            .send_in_session("get_order", &credentials, request)
            .await?;

        // A 404 only counts as absence when the body is Tiger's envelope
        // with its not-found code. Proxy pages, empty bodies and gateway
        // JSON for unknown routes are failures.
        if response.status == 404 {
            let envelope = serde_json::from_str::<Envelope<serde_json::Value>>(&response.body);
            return match envelope {
                Ok(envelope) if envelope.code == ORDER_NOT_FOUND_CODE => {
                    debug!(broker = BROKER_NAME, order_id, "order not found");
                    Ok(None)
                }
                _ => Err(self.fail(
                    "get_order",
                    TransportError::Status {
                        status: response.status,
                        body: response.body,
                    },
                )),
            };
        }

        match self.decode::<TigerOrder>("get_order", response)? {
            Some(order) => mapping::to_order_response(order)
                .map(Some)
                .map_err(|e| self.fail("get_order", e)),
            None => {
                debug!(broker = BROKER_NAME, order_id, "order not found");
                Ok(None)
            }
        }
    }

    async fn get_open_orders(&self) -> Result<Vec<OrderResponse>> {
        let credentials = self.credentials().await?;
        let path = format!("/account/{}/orders/active", credentials.account_id());
        let orders: Vec<TigerOrder> = self
            .call("get_open_orders", &credentials, HttpRequest::get(path))
            .await?
            .unwrap_or_default();
        self.map_orders("get_open_orders", orders)
    }

    async fn get_order_history(
        &self,
        symbol: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<OrderResponse>> {
        let credentials = self.credentials().await?;
        let path = format!("/account/{}/orders/history", credentials.account_id());
        let mut request = HttpRequest::get(path)
            .with_query("limit", limit.unwrap_or(DEFAULT_HISTORY_LIMIT).to_string());
        if let Some(symbol) = symbol {
            request = request.with_query("symbol", symbol);
        }

        let orders: Vec<TigerOrder> = self
            .call("get_order_history", &credentials, request)
            .await?
            .unwrap_or_default();
        self.map_orders("get_order_history", orders)
    }

    async fn get_quote(&self, symbol: &str) -> Result<MarketQuote> {
        let credentials = self.credentials().await?;
        let unavailable = || BrokerError::QuoteUnavailable {
            broker: BROKER_NAME.to_string(),
            symbol: symbol.to_string(),
        };

        let request = HttpRequest::get("/market/quote").with_query("symbols", symbol);
        let quotes: Vec<TigerQuote> = self
            .call("get_quote", &credentials, request)
            .await?
            .unwrap_or_default();

        let quote = quotes
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(unavailable)?;

        let (Some(bid), Some(ask), Some(last)) =
            (quote.bid_price, quote.ask_price, quote.latest_price)
        else {
            return Err(unavailable());
        };

        Ok(MarketQuote {
            symbol: quote.symbol,
            bid,
            ask,
            last,
            volume: quote.volume.unwrap_or_default(),
            timestamp: quote
                .latest_time
                .and_then(mapping::from_millis)
                .unwrap_or_else(Utc::now),
        })
    }

    async fn get_historical_data(
        &self,
        symbol: &str,
        interval: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let credentials = self.credentials().await?;
        let (interval, _fallback) = BarInterval::parse_or_fallback(interval);

        let request = HttpRequest::get("/market/history")
            .with_query("symbol", symbol)
            .with_query("period", mapping::to_tiger_period(interval))
            .with_query("startTime", from.timestamp_millis().to_string())
            .with_query("endTime", to.timestamp_millis().to_string());

        let Some(klines) = self
            .call::<TigerKlines>("get_historical_data", &credentials, request)
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut bars = klines
            .items
            .into_iter()
            .map(|bar| mapping::to_bar(&klines.symbol, interval, bar))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.fail("get_historical_data", e))?;
        bars.sort_by_key(|b| b.open_time);
        Ok(bars)
    }

    async fn validate_symbol(&self, symbol: &str) -> Result<bool> {
        let credentials = self.credentials().await?;
        if symbol.trim().is_empty() {
            return Ok(false);
        }

        let request = HttpRequest::get("/market/symbols/search").with_query("keyword", symbol);
        let hits: Vec<TigerSymbol> = self
            .call("validate_symbol", &credentials, request)
            .await?
            .unwrap_or_default();

        Ok(hits.iter().any(|hit| hit.symbol == symbol))
    }
}
