use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::model::{Column, HostSeries, SeriesTable};

/// How a host's samples are laid against the canonical time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// The i-th sample of every host lands on the i-th axis timestamp.
    Positional,
    /// A sample lands only on an axis timestamp with the identical clock.
    Timestamp,
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::Positional
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "positional" => Ok(Alignment::Positional),
            "timestamp" => Ok(Alignment::Timestamp),
            other => Err(format!("unknown alignment {:?}, expected positional or timestamp", other)),
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Positional => f.write_str("positional"),
            Alignment::Timestamp => f.write_str("timestamp"),
        }
    }
}

fn to_datetime(clock: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(clock, 0).single().ok_or_else(|| Error::Parse {
        field: "clock",
        value: clock.to_string(),
    })
}

/// Merges per-host series into one table.
///
/// The first series' timestamps become the time axis. Samples another host
/// has beyond that axis are not represented. Fails unless at least one host
/// brought samples.
pub fn assemble(series: Vec<HostSeries>, alignment: Alignment) -> Result<SeriesTable> {
    if series.iter().all(|s| s.samples.is_empty()) {
        return Err(Error::EmptyDataset);
    }

    let axis: Vec<i64> = series
        .first()
        .map(|first| first.samples.iter().map(|s| s.clock).collect())
        .unwrap_or_default();

    let timestamps = axis
        .iter()
        .map(|&clock| to_datetime(clock))
        .collect::<Result<Vec<_>>>()?;

    let columns = series
        .into_iter()
        .map(|s| {
            let values = match alignment {
                Alignment::Positional => (0..axis.len())
                    .map(|i| s.samples.get(i).map(|sample| sample.value))
                    .collect(),
                Alignment::Timestamp => {
                    let by_clock: HashMap<i64, f64> =
                        s.samples.iter().map(|x| (x.clock, x.value)).collect();
                    axis.iter().map(|clock| by_clock.get(clock).copied()).collect()
                }
            };
            Column {
                host: s.host,
                values,
            }
        })
        .collect();

    Ok(SeriesTable::new(timestamps, columns))
}
