use tracing;

use crate::error::{Error, Result};
use crate::model::{Metric, Sample, Window};
use crate::zabbix::{MonitoringApi, Session};

/// Pulls the samples recorded for `metric` inside `window`, oldest first.
pub async fn fetch_history<A: MonitoringApi + ?Sized>(
    api: &A,
    session: &Session,
    metric: &Metric,
    window: Window,
) -> Result<Vec<Sample>> {
    if window.from > window.till {
        return Err(Error::InvalidWindow {
            from: window.from,
            till: window.till,
        });
    }

    let records = api.get_history(session, &metric.id, window).await?;
    let received = records.len();

    let mut samples = records
        .iter()
        .map(|r| r.parse())
        .collect::<Result<Vec<_>>>()?;
    samples.retain(|s| window.contains(s.clock));
    samples.sort_by_key(|s| s.clock);

    if samples.len() != received {
        tracing::debug!(
            "item {}: dropped {} samples outside {}..{}",
            metric.id,
            received - samples.len(),
            window.from,
            window.till
        );
    }
    tracing::info!("item {}: {} samples", metric.id, samples.len());

    Ok(samples)
}
