use std::fmt;

use thiserror::Error;

use crate::riemann::RiemannError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The two remote endpoints the agent keeps a connection to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Database,
    Collector,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Database => "database",
            Endpoint::Collector => "collector",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An endpoint is unreachable, refused us, or stopped answering its liveness probe.
/// Never fatal: the poll loop skips the cycle and tries again one interval later.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("unable to connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        #[source]
        source: BoxError,
    },
    #[error("{endpoint} liveness probe failed: {source}")]
    Probe {
        endpoint: Endpoint,
        #[source]
        source: BoxError,
    },
}

impl ConnectionError {
    pub fn connect(endpoint: Endpoint, source: impl Into<BoxError>) -> Self {
        ConnectionError::Connect {
            endpoint,
            source: source.into(),
        }
    }

    pub fn probe(endpoint: Endpoint, source: impl Into<BoxError>) -> Self {
        ConnectionError::Probe {
            endpoint,
            source: source.into(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            ConnectionError::Connect { endpoint, .. } | ConnectionError::Probe { endpoint, .. } => {
                *endpoint
            }
        }
    }
}

/// The replication status query itself failed.
#[derive(Error, Debug)]
#[error("unable to query replication status: {0}")]
pub struct QueryError(#[from] pub sqlx::Error);

/// A single column of a single status row could not be read.
#[derive(Error, Debug)]
#[error("unable to read {column}: {source}")]
pub struct RowFieldError {
    pub column: &'static str,
    #[source]
    pub source: sqlx::Error,
}

/// The collector rejected or dropped a batch of events.
#[derive(Error, Debug)]
#[error("unable to send {events} events to riemann: {source}")]
pub struct SubmissionError {
    pub events: usize,
    #[source]
    pub source: RiemannError,
}

/// Invalid settings. The only fatal error class, reported before polling starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("interval must be at least one second")]
    ZeroInterval,
    #[error("interval must be at most {max} seconds, got {got}")]
    IntervalTooLong { got: u64, max: u64 },
    #[error("delay must be a finite, non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
    #[error("{0} is not a supported riemann protocol, expected tcp or tls")]
    UnknownProtocol(String),
    #[error("RIEMANN_TLS_CERT and RIEMANN_TLS_KEY must be set together")]
    IncompleteIdentity,
    #[error("unable to read {path}: {source}")]
    ReadTlsMaterial {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TLS material: {0}")]
    Tls(#[from] tokio_native_tls::native_tls::Error),
}
