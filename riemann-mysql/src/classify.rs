//! Maps one replication status row to a riemann state, a description and the lag metric.

use std::fmt;

use crate::error::RowFieldError;

pub const CONNECTION_NAME: &str = "Connection_name";
pub const CHANNEL_NAME: &str = "Channel_Name";
pub const SLAVE_IO_RUNNING: &str = "Slave_IO_Running";
pub const SLAVE_SQL_RUNNING: &str = "Slave_SQL_Running";
pub const SECONDS_BEHIND_MASTER: &str = "Seconds_Behind_Master";

/// Read access to the columns of one replication channel's status row.
/// `Ok(None)` is a NULL column, `Err` a column that could not be read at all.
pub trait StatusRow {
    /// Name of the replication channel, `None` or empty for the default channel.
    fn connection_name(&self) -> Option<String>;
    fn io_running(&self) -> Result<Option<String>, RowFieldError>;
    fn sql_running(&self) -> Result<Option<String>, RowFieldError>;
    fn seconds_behind_master(&self) -> Result<Option<i64>, RowFieldError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Ok => "ok",
            State::Warning => "warning",
            State::Critical => "critical",
            State::Unknown => "unknown",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Stopped,
}

impl ThreadState {
    /// Only a case-insensitive "yes" counts as running. "Connecting", "No" and NULL do not.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(flag) if flag.eq_ignore_ascii_case("yes") => ThreadState::Running,
            _ => ThreadState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadState::Running => "running",
            ThreadState::Stopped => "stopped",
        }
    }
}

/// The outcome of checking one replication channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub state: State,
    pub description: String,
    pub metric: Option<f64>,
}

impl Health {
    pub fn unknown(description: impl Into<String>) -> Self {
        Health {
            state: State::Unknown,
            description: description.into(),
            metric: None,
        }
    }
}

/// Classify a single row. Columns are read IO thread first, then SQL thread, then lag,
/// and the first unreadable column turns the whole row into `unknown`.
pub fn classify<R: StatusRow + ?Sized>(row: &R) -> Health {
    match read_row(row) {
        Ok((io, sql, lag)) => health(io, sql, lag),
        Err(e) => Health::unknown(e.to_string()),
    }
}

fn read_row<R: StatusRow + ?Sized>(
    row: &R,
) -> Result<(ThreadState, ThreadState, Option<i64>), RowFieldError> {
    let io = ThreadState::from_flag(row.io_running()?.as_deref());
    let sql = ThreadState::from_flag(row.sql_running()?.as_deref());
    let lag = row.seconds_behind_master()?;
    Ok((io, sql, lag))
}

/// State from the two thread states. A stopped SQL thread is a warning, a stopped
/// IO thread is critical and wins over the SQL thread.
pub fn health(io: ThreadState, sql: ThreadState, seconds_behind: Option<i64>) -> Health {
    let mut state = State::Ok;
    if sql != ThreadState::Running {
        state = State::Warning;
    }
    if io != ThreadState::Running {
        state = State::Critical;
    }

    Health {
        state,
        description: format!(
            "slave io: {}, slave sql: {}",
            io.as_str(),
            sql.as_str()
        ),
        metric: seconds_behind.map(|s| s as f64),
    }
}
