use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Seven days, the trailing history window of a run.
pub const WEEK: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub id: HostId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub id: ItemId,
    pub host_id: HostId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// UTC epoch seconds.
    pub clock: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostSeries {
    pub host: String,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: i64,
    pub till: i64,
}

impl Window {
    pub fn new(from: i64, till: i64) -> Result<Self> {
        if from > till {
            return Err(Error::InvalidWindow { from, till });
        }
        Ok(Self { from, till })
    }

    /// The `span` seconds leading up to `now`.
    pub fn trailing(now: i64, span: i64) -> Self {
        Self {
            from: now - span.max(0),
            till: now,
        }
    }

    pub fn contains(&self, clock: i64) -> bool {
        self.from <= clock && clock <= self.till
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub host: String,
    pub values: Vec<Option<f64>>,
}

/// Per-host values laid out against one shared time axis. Every column holds
/// exactly one entry per timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl SeriesTable {
    pub(crate) fn new(timestamps: Vec<DateTime<Utc>>, columns: Vec<Column>) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == timestamps.len()));
        Self {
            timestamps,
            columns,
        }
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, host: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.host == host)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, Vec<(&str, Option<f64>)>)> + '_ {
        self.timestamps.iter().enumerate().map(move |(i, ts)| {
            let values = self
                .columns
                .iter()
                .map(|c| (c.host.as_str(), c.values[i]))
                .collect();
            (*ts, values)
        })
    }

    /// Largest value across all columns, if any value is present.
    pub fn max_value(&self) -> Option<f64> {
        self.columns
            .iter()
            .flat_map(|c| c.values.iter().flatten().copied())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    pub fn min_value(&self) -> Option<f64> {
        self.columns
            .iter()
            .flat_map(|c| c.values.iter().flatten().copied())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_rejects_inverted_bounds() {
        assert!(matches!(
            Window::new(10, 5),
            Err(Error::InvalidWindow { from: 10, till: 5 })
        ));
        assert!(Window::new(5, 5).is_ok());
    }

    #[test]
    fn trailing_week_spans_exactly_seven_days() {
        let w = Window::trailing(1_700_000_000, WEEK);
        assert_eq!(w.till - w.from, 604_800);
        assert!(w.contains(w.from));
        assert!(w.contains(w.till));
        assert!(!w.contains(w.till + 1));
    }

    #[test]
    fn rows_follow_column_order() {
        let ts = vec![Utc.timestamp_opt(0, 0).unwrap(), Utc.timestamp_opt(60, 0).unwrap()];
        let table = SeriesTable::new(
            ts,
            vec![
                Column {
                    host: "b".into(),
                    values: vec![Some(1.0), None],
                },
                Column {
                    host: "a".into(),
                    values: vec![Some(2.0), Some(3.0)],
                },
            ],
        );

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].1, vec![("b", None), ("a", Some(3.0))]);
        assert_eq!(table.max_value(), Some(3.0));
        assert_eq!(table.min_value(), Some(1.0));
    }
}
