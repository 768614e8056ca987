use async_trait::async_trait;

use crate::connection::{Connector, EventSink, Session};
use crate::error::{ConnectionError, Endpoint, SubmissionError};
use crate::event::HealthEvent;
use crate::riemann::{proto, ClientOptions, RiemannClient};

/// Matches riemann's own instrumentation events, always present on a live server.
pub const PROBE_QUERY: &str = "service =~ \"riemann %\"";

pub struct RiemannConnector {
    options: ClientOptions,
}

impl RiemannConnector {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for RiemannConnector {
    type Session = RiemannClient;

    async fn connect(&self) -> Result<RiemannClient, ConnectionError> {
        RiemannClient::connect(&self.options)
            .await
            .map_err(|e| ConnectionError::connect(Endpoint::Collector, e))
    }
}

#[async_trait]
impl Session for RiemannClient {
    const ENDPOINT: Endpoint = Endpoint::Collector;

    async fn probe(&mut self) -> Result<(), ConnectionError> {
        self.query(PROBE_QUERY)
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::probe(Endpoint::Collector, e))
    }

    async fn close(self) {
        RiemannClient::close(self).await
    }
}

#[async_trait]
impl EventSink for RiemannClient {
    async fn submit(&mut self, events: Vec<HealthEvent>) -> Result<(), SubmissionError> {
        let count = events.len();
        let events: Vec<proto::Event> = events.into_iter().map(proto::Event::from).collect();

        self.send_events(events)
            .await
            .map_err(|source| SubmissionError {
                events: count,
                source,
            })
    }
}
