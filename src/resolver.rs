use std::collections::{HashMap, HashSet};

use tracing;

use crate::error::{Error, Result};
use crate::model::{Host, Metric};
use crate::zabbix::{MonitoringApi, Session};

/// Resolves host names to host identifiers with a single `host.get` call.
///
/// The result keeps the caller's name order. Names the server does not know
/// are dropped with a warning.
pub async fn resolve_hosts<A: MonitoringApi + ?Sized>(
    api: &A,
    session: &Session,
    names: &[String],
) -> Result<Vec<Host>> {
    let mut seen = HashSet::new();
    let requested: Vec<String> = names
        .iter()
        .filter(|n| !n.is_empty() && seen.insert(n.as_str()))
        .cloned()
        .collect();

    if requested.is_empty() {
        return Err(Error::NoHosts);
    }

    let records = api.get_hosts(session, &requested).await?;

    let mut by_name: HashMap<String, Host> = HashMap::new();
    let mut ids = HashSet::new();
    for record in records {
        let host = Host::from(record);
        if !seen.contains(host.name.as_str()) {
            return Err(Error::query(
                "host.get",
                format!("unrequested host {:?} in response", host.name),
            ));
        }
        if !ids.insert(host.id.clone()) {
            return Err(Error::query(
                "host.get",
                format!("host id {} returned more than once", host.id),
            ));
        }
        if by_name.contains_key(&host.name) {
            return Err(Error::query(
                "host.get",
                format!("host name {:?} is ambiguous", host.name),
            ));
        }
        by_name.insert(host.name.clone(), host);
    }

    let mut hosts = Vec::with_capacity(by_name.len());
    for name in &requested {
        match by_name.remove(name) {
            Some(host) => hosts.push(host),
            None => tracing::warn!("host {} not known to server, skipping", name),
        }
    }

    tracing::info!("resolved {} of {} hosts", hosts.len(), requested.len());
    Ok(hosts)
}

/// Looks up the item matching `key` on `host`. `Ok(None)` when the host has
/// no such item.
pub async fn resolve_metric<A: MonitoringApi + ?Sized>(
    api: &A,
    session: &Session,
    host: &Host,
    key: &str,
) -> Result<Option<Metric>> {
    let items = api.get_items(session, &host.id, key).await?;
    let metric = items.into_iter().next().map(Metric::from);

    match &metric {
        Some(m) => tracing::info!("host {} item {} is {}", host.name, key, m.id),
        None => tracing::warn!("host {} has no item matching {}", host.name, key),
    }

    Ok(metric)
}
