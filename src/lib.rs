//! Fetches a week of Zabbix item history for a set of hosts, lines the
//! per-host series up on one time axis and charts them.

pub mod assembler;
pub mod chart;
pub mod error;
pub mod history;
pub mod model;
pub mod pipeline;
pub mod resolver;
pub mod zabbix;

pub use error::{Error, Result};
