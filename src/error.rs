use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("login failed: {reason}")]
    Auth { reason: String },

    #[error("{op} failed: {reason}")]
    Query { op: &'static str, reason: String },

    #[error("malformed {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("no host produced any history")]
    EmptyDataset,

    #[error("no hosts requested")]
    NoHosts,

    #[error("invalid time window: from {from} is after till {till}")]
    InvalidWindow { from: i64, till: i64 },

    #[error("chart rendering failed: {reason}")]
    Render { reason: String },
}

impl Error {
    pub fn query(op: &'static str, reason: impl ToString) -> Self {
        Error::Query {
            op,
            reason: reason.to_string(),
        }
    }
}
