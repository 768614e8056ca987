#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use riemann_mysql::classify::{StatusRow, SLAVE_IO_RUNNING};
use riemann_mysql::connection::{Connector, EventSink, ReplicationSource, Session};
use riemann_mysql::error::{
    ConnectionError, Endpoint, QueryError, RowFieldError, SubmissionError,
};
use riemann_mysql::event::{Annotations, HealthEvent};
use riemann_mysql::poller::PollerConfig;
use riemann_mysql::riemann::RiemannError;

pub const PREFIX: &str = "mysql/replication";

pub fn poller_config(interval: Duration) -> PollerConfig {
    PollerConfig {
        interval,
        service_prefix: PREFIX.to_owned(),
        annotations: Annotations::new(
            interval.as_secs_f64() + 2.0,
            vec!["mysql".to_owned(), "replication".to_owned()],
            "db1.example.com".to_owned(),
        ),
    }
}

/// Counts what happened to the sessions of one endpoint and scripts their failures.
#[derive(Clone, Default)]
pub struct Script {
    connects: Arc<AtomicUsize>,
    probes: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    refuse_connect: Arc<AtomicBool>,
    fail_probe: Arc<AtomicBool>,
}

impl Script {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    fn connect(&self, endpoint: Endpoint) -> Result<(), ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(ConnectionError::connect(endpoint, "connection refused"));
        }
        Ok(())
    }

    fn probe(&self, endpoint: Endpoint) -> Result<(), ConnectionError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(ConnectionError::probe(endpoint, "server has gone away"));
        }
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeRow {
    pub name: Option<String>,
    pub io: Option<String>,
    pub sql: Option<String>,
    pub lag: Option<i64>,
    pub unreadable_io: bool,
}

impl FakeRow {
    pub fn new(io: Option<&str>, sql: Option<&str>, lag: Option<i64>) -> Self {
        FakeRow {
            io: io.map(str::to_owned),
            sql: sql.map(str::to_owned),
            lag,
            ..Default::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }
}

impl StatusRow for FakeRow {
    fn connection_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn io_running(&self) -> Result<Option<String>, RowFieldError> {
        if self.unreadable_io {
            return Err(RowFieldError {
                column: SLAVE_IO_RUNNING,
                source: sqlx::Error::ColumnNotFound(SLAVE_IO_RUNNING.to_owned()),
            });
        }
        Ok(self.io.clone())
    }

    fn sql_running(&self) -> Result<Option<String>, RowFieldError> {
        Ok(self.sql.clone())
    }

    fn seconds_behind_master(&self) -> Result<Option<i64>, RowFieldError> {
        Ok(self.lag)
    }
}

/// What the next replication status queries return.
#[derive(Clone)]
pub enum Status {
    Rows(Vec<FakeRow>),
    Fails(&'static str),
}

#[derive(Clone)]
pub struct FakeDatabase {
    pub script: Script,
    status: Arc<Mutex<Status>>,
    queries: Arc<AtomicUsize>,
}

impl FakeDatabase {
    pub fn new(status: Status) -> Self {
        FakeDatabase {
            script: Script::default(),
            status: Arc::new(Mutex::new(status)),
            queries: Arc::default(),
        }
    }

    pub fn set_status(&self, status: Status) {
        *self.status.lock().unwrap() = status;
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeDatabase {
    type Session = FakeDatabaseSession;

    async fn connect(&self) -> Result<FakeDatabaseSession, ConnectionError> {
        self.script.connect(Endpoint::Database)?;
        Ok(FakeDatabaseSession {
            database: self.clone(),
        })
    }
}

pub struct FakeDatabaseSession {
    database: FakeDatabase,
}

#[async_trait]
impl Session for FakeDatabaseSession {
    const ENDPOINT: Endpoint = Endpoint::Database;

    async fn probe(&mut self) -> Result<(), ConnectionError> {
        self.database.script.probe(Endpoint::Database)
    }

    async fn close(self) {
        self.database.script.close();
    }
}

#[async_trait]
impl ReplicationSource for FakeDatabaseSession {
    type Row = FakeRow;

    async fn replication_status(&mut self) -> Result<Vec<FakeRow>, QueryError> {
        self.database.queries.fetch_add(1, Ordering::SeqCst);
        let status = self.database.status.lock().unwrap().clone();
        match status {
            Status::Rows(rows) => Ok(rows),
            Status::Fails(message) => Err(QueryError(sqlx::Error::Protocol(message.to_owned()))),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeCollector {
    pub script: Script,
    batches: Arc<Mutex<Vec<Vec<HealthEvent>>>>,
    reject_submit: Arc<AtomicBool>,
}

impl FakeCollector {
    pub fn batches(&self) -> Vec<Vec<HealthEvent>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn reject_submit(&self, reject: bool) {
        self.reject_submit.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for FakeCollector {
    type Session = FakeCollectorSession;

    async fn connect(&self) -> Result<FakeCollectorSession, ConnectionError> {
        self.script.connect(Endpoint::Collector)?;
        Ok(FakeCollectorSession {
            collector: self.clone(),
        })
    }
}

pub struct FakeCollectorSession {
    collector: FakeCollector,
}

#[async_trait]
impl Session for FakeCollectorSession {
    const ENDPOINT: Endpoint = Endpoint::Collector;

    async fn probe(&mut self) -> Result<(), ConnectionError> {
        self.collector.script.probe(Endpoint::Collector)
    }

    async fn close(self) {
        self.collector.script.close();
    }
}

#[async_trait]
impl EventSink for FakeCollectorSession {
    async fn submit(&mut self, events: Vec<HealthEvent>) -> Result<(), SubmissionError> {
        if self.collector.reject_submit.load(Ordering::SeqCst) {
            return Err(SubmissionError {
                events: events.len(),
                source: RiemannError::Closed,
            });
        }
        self.collector.batches.lock().unwrap().push(events);
        Ok(())
    }
}
