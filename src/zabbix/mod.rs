pub mod client;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Host, HostId, ItemId, Metric, Sample, Window};

/// Authentication token handed out by `user.login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostRecord {
    pub hostid: HostId,
    pub host: String,
}

impl From<HostRecord> for Host {
    fn from(r: HostRecord) -> Self {
        Host {
            name: r.host,
            id: r.hostid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRecord {
    pub itemid: ItemId,
    pub hostid: HostId,
    #[serde(default)]
    pub key_: String,
    #[serde(default)]
    pub name: String,
}

impl From<ItemRecord> for Metric {
    fn from(r: ItemRecord) -> Self {
        Metric {
            id: r.itemid,
            host_id: r.hostid,
        }
    }
}

/// A `history.get` row. The server sends both fields as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryRecord {
    pub clock: String,
    pub value: String,
}

impl HistoryRecord {
    pub fn parse(&self) -> Result<Sample> {
        let clock = self.clock.trim().parse::<i64>().map_err(|_| Error::Parse {
            field: "clock",
            value: self.clock.clone(),
        })?;
        let value = self
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::Parse {
                field: "value",
                value: self.value.clone(),
            })?;
        Ok(Sample { clock, value })
    }
}

/// The lookups the pipeline needs from a monitoring server.
#[async_trait]
pub trait MonitoringApi: std::fmt::Debug + Send + Sync {
    async fn login(&self, user: &str, password: &str) -> Result<Session>;

    async fn logout(&self, session: Session) -> Result<()>;

    async fn get_hosts(&self, session: &Session, names: &[String]) -> Result<Vec<HostRecord>>;

    async fn get_items(&self, session: &Session, host: &HostId, key: &str)
        -> Result<Vec<ItemRecord>>;

    async fn get_history(
        &self,
        session: &Session,
        item: &ItemId,
        window: Window,
    ) -> Result<Vec<HistoryRecord>>;
}
