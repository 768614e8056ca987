use std::time::Duration;

use health::HealthHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classify::State;
use crate::connection::{Connection, Connector, EventSink, ReplicationSource, Session};
use crate::error::ConnectionError;
use crate::event::{checks_from_status, Annotations, ServiceCheck};
use crate::metrics_consts::{
    CYCLES_SKIPPED, CYCLES_STARTED, CYCLE_TIME, ENDPOINT_CONNECTED, EVENTS_EMITTED, QUERY_FAILURES,
    REPLICATION_LAG, SUBMIT_FAILURES,
};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub service_prefix: String,
    pub annotations: Annotations,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// An endpoint could not be acquired, nothing was gathered or sent.
    Skipped(ConnectionError),
    Submitted { events: usize },
    /// The batch was built but the collector did not take it. It is not retried.
    SubmitFailed { events: usize },
}

impl CycleOutcome {
    /// How long to idle before the next cycle. Skipped cycles back off for a full
    /// interval, the others only for what is left of it.
    pub fn pause(&self, interval: Duration, elapsed: Duration) -> Duration {
        match self {
            CycleOutcome::Skipped(_) => interval,
            CycleOutcome::Submitted { .. } | CycleOutcome::SubmitFailed { .. } => {
                pause_for(interval, elapsed)
            }
        }
    }
}

/// Remainder of the interval after `elapsed`, zero when the cycle overran it.
pub fn pause_for(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Runs the poll cycles. Owns both connections, cycles never overlap.
pub struct Poller<D, C>
where
    D: Connector,
    C: Connector,
{
    config: PollerConfig,
    database_connector: D,
    collector_connector: C,
    database: Connection<D::Session>,
    collector: Connection<C::Session>,
}

impl<D, C> Poller<D, C>
where
    D: Connector,
    D::Session: ReplicationSource,
    C: Connector,
    C::Session: EventSink,
{
    pub fn new(database_connector: D, collector_connector: C, config: PollerConfig) -> Self {
        Self {
            config,
            database_connector,
            collector_connector,
            database: Connection::Disconnected,
            collector: Connection::Disconnected,
        }
    }

    /// Poll until `shutdown` is cancelled, then close both connections.
    /// Cancellation is checked between cycles and interrupts the idle wait,
    /// a cycle that already started runs to completion.
    pub async fn run(mut self, shutdown: CancellationToken, liveness: HealthHandle) {
        info!(interval = ?self.config.interval, "starting replication poll loop");

        while !shutdown.is_cancelled() {
            let started = Instant::now();
            let outcome = self.run_cycle().await;
            liveness.report_healthy().await;

            let pause = outcome.pause(self.config.interval, started.elapsed());
            debug!(?pause, "waiting for next cycle");
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("replication poll loop stopping");
        self.shutdown().await;
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        metrics::counter!(CYCLES_STARTED).increment(1);
        let started = Instant::now();
        let outcome = self.cycle().await;
        metrics::histogram!(CYCLE_TIME).record(started.elapsed().as_millis() as f64);
        record_connected(&self.database);
        record_connected(&self.collector);
        outcome
    }

    /// Close whichever connections are open. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        self.database.close().await;
        self.collector.close().await;
    }

    async fn cycle(&mut self) -> CycleOutcome {
        debug!("getting database handle");
        let database = match self.database.acquire(&self.database_connector).await {
            Ok(session) => session,
            Err(e) => return skipped(e),
        };

        debug!("getting riemann handle");
        let collector = match self.collector.acquire(&self.collector_connector).await {
            Ok(session) => session,
            Err(e) => return skipped(e),
        };

        let time = time::OffsetDateTime::now_utc().unix_timestamp();

        debug!("gathering replication status");
        let status = database.replication_status().await;
        if let Err(e) = &status {
            warn!("{}", e);
            metrics::counter!(QUERY_FAILURES).increment(1);
        }

        let checks = checks_from_status(&self.config.service_prefix, status);
        checks.iter().for_each(record_check);
        let events = self.config.annotations.annotate(checks, time);
        let count = events.len();

        debug!(events = count, "sending riemann events");
        match collector.submit(events).await {
            Ok(()) => CycleOutcome::Submitted { events: count },
            Err(e) => {
                error!("{}", e);
                metrics::counter!(SUBMIT_FAILURES).increment(1);
                // The stream may be left mid-frame, start over with a fresh connection
                self.collector.close().await;
                CycleOutcome::SubmitFailed { events: count }
            }
        }
    }
}

fn skipped(e: ConnectionError) -> CycleOutcome {
    warn!("unable to get {} handle: {}", e.endpoint(), e);
    metrics::counter!(CYCLES_SKIPPED, "endpoint" => e.endpoint().as_str()).increment(1);
    CycleOutcome::Skipped(e)
}

fn record_connected<S: Session>(connection: &Connection<S>) {
    let connected = if connection.is_connected() { 1.0 } else { 0.0 };
    metrics::gauge!(ENDPOINT_CONNECTED, "endpoint" => S::ENDPOINT.as_str()).set(connected);
}

fn record_check(check: &ServiceCheck) {
    let health = &check.health;
    match health.state {
        State::Unknown => warn!(service = %check.service, "{}", health.description),
        _ => debug!(
            service = %check.service,
            state = %health.state,
            description = %health.description,
            seconds_behind = ?health.metric,
            "gathered"
        ),
    }

    metrics::counter!(EVENTS_EMITTED, "state" => health.state.as_str()).increment(1);
    if let Some(lag) = health.metric {
        metrics::gauge!(REPLICATION_LAG, "service" => check.service.clone()).set(lag);
    }
}
