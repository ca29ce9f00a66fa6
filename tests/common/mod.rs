//! Shared test utilities: a scripted, recording transport.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use brokerlink::TransportError;
use brokerlink::broker::Broker;
use brokerlink::connectors::TigerConnector;
use brokerlink::credentials::Credentials;
use brokerlink::models::ConnectionStatus;
use brokerlink::transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};

pub const ACCOUNT: &str = "U1234567";

/// Canned answer for one route.
#[derive(Clone, Debug)]
pub enum Reply {
    Respond(HttpResponse),
    /// A real network failure: the request goes to a closed local port.
    Unreachable,
}

impl Reply {
    /// `200` with a Tiger success envelope around `data`.
    pub fn ok(data: serde_json::Value) -> Self {
        let body = serde_json::json!({"code": 0, "message": "success", "data": data});
        Self::Respond(HttpResponse::new(200, body.to_string()))
    }

    /// `200` with a success envelope and no `data`.
    pub fn ok_empty() -> Self {
        Self::Respond(HttpResponse::new(200, r#"{"code":0,"message":"success"}"#))
    }

    /// `200` with a broker error code.
    pub fn api_error(code: i64, message: &str) -> Self {
        let body = serde_json::json!({"code": code, "message": message});
        Self::Respond(HttpResponse::new(200, body.to_string()))
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::Respond(HttpResponse::new(status, body))
    }
}

/// Transport that answers from a route table and records every request.
///
/// Each route holds a queue of replies; the last reply repeats once the
/// queue is down to one entry. Unrouted requests get a 404 with an HTML
/// body, which no connector should read as a broker answer.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues `reply` for `method path`.
    pub fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Replaces everything queued for `method path` with `reply`.
    pub fn set(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), VecDeque::from([reply]));
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        match self.next_reply(request.method, &request.path) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Unreachable) => {
                // Port 9 (discard) is closed on test hosts, so this fails
                // with a genuine connection error.
                let closed = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2))?;
                closed.send(request).await
            }
            None => Ok(HttpResponse::new(404, "<html>not found</html>")),
        }
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(ACCOUNT, "test-api-key", "test-api-secret")
}

/// Connector over `transport` with a successful probe already performed.
pub async fn connected(transport: &Arc<MockTransport>) -> TigerConnector {
    transport.on(
        Method::Get,
        "/account/summary",
        Reply::ok(serde_json::json!({"account": ACCOUNT})),
    );
    let connector = TigerConnector::with_transport(transport.clone());
    let status = connector
        .connect(credentials())
        .await
        .expect("connect should not error");
    assert_eq!(status, ConnectionStatus::Connected);
    connector
}

/// Tiger order JSON as returned by lookups.
pub fn tiger_order(id: i64, symbol: &str, status: &str, total: u32, filled: u32) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "symbol": symbol,
        "action": "BUY",
        "orderType": "MKT",
        "totalQuantity": total,
        "filledQuantity": filled,
        "status": status,
        "openTime": 1_700_000_000_000_i64,
        "updateTime": 1_700_000_030_000_i64
    })
}
