use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing;

use super::{HistoryRecord, HostRecord, ItemRecord, MonitoringApi, Session};
use crate::error::{Error, Result};
use crate::model::{HostId, ItemId, Window};

static API_PATH: &str = "api_jsonrpc.php";

/// `history.get` value type for numeric floats.
const HISTORY_FLOAT: u8 = 0;

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    method: &'static str,
    params: P,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct Response<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

/// Unwraps a JSON-RPC envelope into its typed `result`.
fn decode<R: DeserializeOwned>(op: &'static str, body: serde_json::Value) -> Result<R> {
    let response: Response<R> =
        serde_json::from_value(body).map_err(|e| Error::query(op, format!("bad response: {}", e)))?;

    match (response.result, response.error) {
        (_, Some(err)) => Err(Error::query(
            op,
            format!("{} (code {}): {}", err.message, err.code, err.data),
        )),
        (Some(result), None) => Ok(result),
        (None, None) => Err(Error::query(op, "response carries neither result nor error")),
    }
}

#[derive(Debug)]
pub struct ZabbixClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl ZabbixClient {
    pub fn new(server: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::query("client", e))?;

        Ok(Self {
            http,
            url: format!("{}/{}", server.trim_end_matches('/'), API_PATH),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<P, R>(&self, method: &'static str, params: P, auth: Option<&Session>) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = Request {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            auth: auth.map(Session::token),
        };

        tracing::debug!("{} -> {}", method, self.url);

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::query(method, e))?;

        if !response.status().is_success() {
            return Err(Error::query(method, format!("http status {}", response.status())));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| Error::query(method, e))?;
        decode(method, body)
    }
}

#[async_trait]
impl MonitoringApi for ZabbixClient {
    async fn login(&self, user: &str, password: &str) -> Result<Session> {
        let token: String = self
            .call("user.login", json!({ "user": user, "password": password }), None)
            .await
            .map_err(|e| Error::Auth {
                reason: e.to_string(),
            })?;
        Ok(Session::new(token))
    }

    async fn logout(&self, session: Session) -> Result<()> {
        let done: bool = self.call("user.logout", json!([]), Some(&session)).await?;
        tracing::info!("logout result: {}", done);
        Ok(())
    }

    async fn get_hosts(&self, session: &Session, names: &[String]) -> Result<Vec<HostRecord>> {
        self.call(
            "host.get",
            json!({
                "output": ["hostid", "host"],
                "filter": { "host": names },
            }),
            Some(session),
        )
        .await
    }

    async fn get_items(
        &self,
        session: &Session,
        host: &HostId,
        key: &str,
    ) -> Result<Vec<ItemRecord>> {
        self.call(
            "item.get",
            json!({
                "output": "extend",
                "hostids": host.0,
                "search": { "key_": key },
            }),
            Some(session),
        )
        .await
    }

    async fn get_history(
        &self,
        session: &Session,
        item: &ItemId,
        window: Window,
    ) -> Result<Vec<HistoryRecord>> {
        self.call(
            "history.get",
            json!({
                "output": "extend",
                "history": HISTORY_FLOAT,
                "itemids": item.0,
                "time_from": window.from,
                "time_till": window.till,
                "sortfield": "clock",
                "sortorder": "ASC",
            }),
            Some(session),
        )
        .await
    }
}
