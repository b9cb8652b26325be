use tracing;

use crate::assembler::{assemble, Alignment};
use crate::error::Result;
use crate::history::fetch_history;
use crate::model::{HostSeries, SeriesTable, Window};
use crate::resolver::{resolve_hosts, resolve_metric};
use crate::zabbix::{MonitoringApi, Session};

#[derive(Debug, Clone)]
pub struct Request {
    pub user: String,
    pub password: String,
    pub hosts: Vec<String>,
    pub item: String,
    pub alignment: Alignment,
    /// Wall clock at the start of the run, epoch seconds.
    pub now: i64,
    /// Length of the trailing history window in seconds.
    pub span: i64,
}

/// Logs in, collects the history of every host and logs out again, whether
/// or not collection succeeded.
pub async fn run<A: MonitoringApi + ?Sized>(api: &A, request: &Request) -> Result<SeriesTable> {
    let session = api.login(&request.user, &request.password).await?;
    tracing::info!("logged in as {}", request.user);

    let result = collect(api, &session, request).await;

    if let Err(e) = api.logout(session).await {
        tracing::warn!("logout failed: {}", e);
    }

    result
}

async fn collect<A: MonitoringApi + ?Sized>(
    api: &A,
    session: &Session,
    request: &Request,
) -> Result<SeriesTable> {
    let window = Window::new(request.now - request.span, request.now)?;
    let hosts = resolve_hosts(api, session, &request.hosts).await?;

    let mut series = Vec::with_capacity(hosts.len());
    for host in hosts {
        let metric = match resolve_metric(api, session, &host, &request.item).await? {
            Some(metric) => metric,
            None => continue,
        };

        let samples = fetch_history(api, session, &metric, window).await?;
        series.push(HostSeries {
            host: host.name,
            samples,
        });
    }

    assemble(series, request.alignment)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::Error;
    use crate::model::{HostId, ItemId, WEEK};
    use crate::zabbix::{HistoryRecord, HostRecord, ItemRecord};

    /// In-memory stand-in for a Zabbix server.
    #[derive(Debug, Default)]
    pub(crate) struct FakeApi {
        hosts: Vec<HostRecord>,
        items: HashMap<String, ItemRecord>,
        history: HashMap<String, Vec<HistoryRecord>>,
        fail_on: Option<(&'static str, usize)>,
        reject_login: bool,
        unfiltered_hosts: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeApi {
        pub(crate) fn host(mut self, name: &str, id: &str) -> Self {
            self.hosts.push(HostRecord {
                hostid: HostId(id.into()),
                host: name.into(),
            });
            self
        }

        pub(crate) fn item(mut self, host_id: &str, item_id: &str) -> Self {
            self.items.insert(
                host_id.into(),
                ItemRecord {
                    itemid: ItemId(item_id.into()),
                    hostid: HostId(host_id.into()),
                    key_: "gpu.avgutilization".into(),
                    name: String::new(),
                },
            );
            self
        }

        pub(crate) fn history(mut self, item_id: &str, points: &[(i64, &str)]) -> Self {
            self.history.insert(
                item_id.into(),
                points
                    .iter()
                    .map(|(clock, value)| HistoryRecord {
                        clock: clock.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
            );
            self
        }

        /// Fail the `nth` (1-based) call of `op` with a transport error.
        pub(crate) fn fail(mut self, op: &'static str, nth: usize) -> Self {
            self.fail_on = Some((op, nth));
            self
        }

        pub(crate) fn reject_login(mut self) -> Self {
            self.reject_login = true;
            self
        }

        /// Answer `host.get` with every known host, ignoring the filter.
        pub(crate) fn unfiltered_hosts(mut self) -> Self {
            self.unfiltered_hosts = true;
            self
        }

        pub(crate) fn calls_of(&self, op: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
        }

        fn record(&self, op: &'static str) -> Result<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(op);
            let seen = calls.iter().filter(|c| **c == op).count();
            match self.fail_on {
                Some((fail_op, nth)) if fail_op == op && nth == seen => {
                    Err(Error::query(op, "connection reset by peer"))
                }
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MonitoringApi for FakeApi {
        async fn login(&self, _user: &str, _password: &str) -> Result<Session> {
            self.record("user.login")?;
            if self.reject_login {
                return Err(Error::Auth {
                    reason: "Login name or password is incorrect.".into(),
                });
            }
            Ok(Session::new("token"))
        }

        async fn logout(&self, _session: Session) -> Result<()> {
            self.record("user.logout")
        }

        async fn get_hosts(&self, _session: &Session, names: &[String]) -> Result<Vec<HostRecord>> {
            self.record("host.get")?;
            Ok(self
                .hosts
                .iter()
                .filter(|h| self.unfiltered_hosts || names.contains(&h.host))
                .cloned()
                .collect())
        }

        async fn get_items(
            &self,
            _session: &Session,
            host: &HostId,
            _key: &str,
        ) -> Result<Vec<ItemRecord>> {
            self.record("item.get")?;
            Ok(self.items.get(&host.0).cloned().into_iter().collect())
        }

        async fn get_history(
            &self,
            _session: &Session,
            item: &ItemId,
            _window: Window,
        ) -> Result<Vec<HistoryRecord>> {
            self.record("history.get")?;
            Ok(self.history.get(&item.0).cloned().unwrap_or_default())
        }
    }

    const NOW: i64 = 1_700_000_000;

    fn request(hosts: &[&str]) -> Request {
        Request {
            user: "admin".into(),
            password: "passwd".into(),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            item: "gpu.avgutilization".into(),
            alignment: Alignment::Positional,
            now: NOW,
            span: WEEK,
        }
    }

    fn scenario() -> FakeApi {
        FakeApi::default()
            .host("server1", "10105")
            .host("server2", "10106")
            .item("10105", "55667")
            .history(
                "55667",
                &[(NOW - 180, "10.0"), (NOW - 120, "20.0"), (NOW - 60, "15.0")],
            )
    }

    #[tokio::test]
    async fn host_without_metric_is_left_out() {
        let api = scenario();

        let table = run(&api, &request(&["server1", "server2"])).await.unwrap();

        assert_eq!(table.columns().len(), 1);
        let column = table.column("server1").unwrap();
        assert_eq!(column.values, vec![Some(10.0), Some(20.0), Some(15.0)]);
        assert_eq!(table.len(), 3);
        assert!(table.column("server2").is_none());

        assert_eq!(api.calls_of("item.get"), 2);
        assert_eq!(api.calls_of("history.get"), 1);
        assert_eq!(api.calls_of("user.logout"), 1);
    }

    #[tokio::test]
    async fn unmatched_host_name_is_ignored() {
        let api = scenario();

        let table = run(&api, &request(&["nosuchhost", "server1"])).await.unwrap();

        assert_eq!(table.columns().len(), 1);
        assert_eq!(api.calls_of("item.get"), 1);
    }

    #[tokio::test]
    async fn transport_error_aborts_but_still_logs_out() {
        let api = scenario().fail("item.get", 2);

        let result = run(&api, &request(&["server1", "server2"])).await;

        assert!(matches!(result, Err(Error::Query { op: "item.get", .. })));
        assert_eq!(api.calls_of("history.get"), 1);
        assert_eq!(api.calls_of("user.logout"), 1);
    }

    #[tokio::test]
    async fn failed_logout_does_not_hide_the_table() {
        let api = scenario().fail("user.logout", 1);

        let table = run(&api, &request(&["server1"])).await.unwrap();
        assert_eq!(table.len(), 3);
    }

    #[tokio::test]
    async fn rejected_login_stops_before_any_query() {
        let api = scenario().reject_login();

        let result = run(&api, &request(&["server1"])).await;

        assert!(matches!(result, Err(Error::Auth { .. })));
        assert_eq!(api.calls_of("host.get"), 0);
        assert_eq!(api.calls_of("user.logout"), 0);
    }

    #[tokio::test]
    async fn empty_history_for_every_host_is_an_empty_dataset() {
        let api = FakeApi::default()
            .host("server1", "10105")
            .item("10105", "55667");

        let result = run(&api, &request(&["server1"])).await;

        assert!(matches!(result, Err(Error::EmptyDataset)));
        assert_eq!(api.calls_of("history.get"), 1);
        assert_eq!(api.calls_of("user.logout"), 1);
    }

    #[tokio::test]
    async fn no_host_with_the_metric_is_an_empty_dataset() {
        let api = FakeApi::default().host("server2", "10106");

        let result = run(&api, &request(&["server2"])).await;
        assert!(matches!(result, Err(Error::EmptyDataset)));
        assert_eq!(api.calls_of("user.logout"), 1);
    }
}
