use async_trait::async_trait;
use tracing::{debug, info};

use crate::classify::StatusRow;
use crate::error::{ConnectionError, Endpoint, QueryError, SubmissionError};
use crate::event::HealthEvent;

/// An established session with one of the agent's endpoints.
#[async_trait]
pub trait Session: Send + Sized {
    const ENDPOINT: Endpoint;

    /// Cheap round trip proving the session still works.
    async fn probe(&mut self) -> Result<(), ConnectionError>;

    async fn close(self);
}

/// Opens new sessions from the resolved configuration. Each call is a single attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    async fn connect(&self) -> Result<Self::Session, ConnectionError>;
}

/// A database session able to report replication status.
#[async_trait]
pub trait ReplicationSource: Session {
    type Row: StatusRow + Send;

    async fn replication_status(&mut self) -> Result<Vec<Self::Row>, QueryError>;
}

/// A collector session accepting batches of events.
#[async_trait]
pub trait EventSink: Session {
    async fn submit(&mut self, events: Vec<HealthEvent>) -> Result<(), SubmissionError>;
}

/// A lazily established, reusable connection to one endpoint.
pub enum Connection<S> {
    Disconnected,
    Connected(S),
}

impl<S> Default for Connection<S> {
    fn default() -> Self {
        Connection::Disconnected
    }
}

impl<S: Session> Connection<S> {
    /// Hand out a working session. An existing session is probed and returned when
    /// it answers; a session failing its probe is closed and the error returned, so
    /// the next call reconnects. Without a session, exactly one connect is attempted.
    pub async fn acquire<C>(&mut self, connector: &C) -> Result<&mut S, ConnectionError>
    where
        C: Connector<Session = S>,
    {
        let session = match std::mem::take(self) {
            Connection::Connected(mut session) => match session.probe().await {
                Ok(()) => session,
                Err(e) => {
                    info!(endpoint = %S::ENDPOINT, "closing dead connection");
                    session.close().await;
                    return Err(e);
                }
            },
            Connection::Disconnected => {
                debug!(endpoint = %S::ENDPOINT, "connecting");
                let session = connector.connect().await?;
                info!(endpoint = %S::ENDPOINT, "connected");
                session
            }
        };

        Ok(self.store(session))
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Connection::Connected(_))
    }

    /// Close the session if there is one. Closing a disconnected handle is a no-op.
    pub async fn close(&mut self) {
        if let Connection::Connected(session) = std::mem::take(self) {
            debug!(endpoint = %S::ENDPOINT, "closing connection");
            session.close().await;
        }
    }

    fn store(&mut self, session: S) -> &mut S {
        *self = Connection::Connected(session);
        match self {
            Connection::Connected(session) => session,
            Connection::Disconnected => unreachable!("session was just stored"),
        }
    }
}
