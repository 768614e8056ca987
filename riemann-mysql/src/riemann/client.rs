use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use prost::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::{native_tls, TlsConnector};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::debug;

use super::proto::{Event, Msg};

#[derive(Error, Debug)]
pub enum RiemannError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("timed out during {0}")]
    Timeout(&'static str),
    #[error("invalid response: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("connection closed by server")]
    Closed,
    #[error("server error: {0}")]
    Server(String),
}

/// Anything a riemann client can speak the framed protocol over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

#[derive(Clone)]
pub struct TlsOptions {
    pub connector: TlsConnector,
    pub handshake_timeout: Duration,
}

#[derive(Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    /// Bounds the TCP connect and every request/response round trip
    pub timeout: Duration,
    pub tls: Option<TlsOptions>,
}

impl ClientOptions {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A riemann client over one persistent stream. Every message is a protobuf
/// `Msg` prefixed by its length as a big-endian u32, and every request is
/// answered by exactly one `Msg`.
pub struct RiemannClient {
    frames: Framed<Box<dyn Transport>, LengthDelimitedCodec>,
    request_timeout: Duration,
}

impl RiemannClient {
    pub async fn connect(options: &ClientOptions) -> Result<Self, RiemannError> {
        let address = options.address();
        let stream = timeout(options.timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| RiemannError::Timeout("connect"))??;
        stream.set_nodelay(true)?;

        let transport: Box<dyn Transport> = match &options.tls {
            None => Box::new(stream),
            Some(tls) => {
                let stream = timeout(
                    tls.handshake_timeout,
                    tls.connector.connect(&options.host, stream),
                )
                .await
                .map_err(|_| RiemannError::Timeout("tls handshake"))??;
                Box::new(stream)
            }
        };

        debug!(%address, tls = options.tls.is_some(), "connected to riemann");
        Ok(Self::from_transport(transport, options.timeout))
    }

    pub fn from_transport(transport: Box<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            frames: Framed::new(transport, LengthDelimitedCodec::new()),
            request_timeout,
        }
    }

    /// Send a batch of events as one message, succeeding once the server acknowledges it.
    pub async fn send_events(&mut self, events: Vec<Event>) -> Result<(), RiemannError> {
        self.request(Msg::events(events)).await.map(|_| ())
    }

    /// Run a query against the server index and return the matching events.
    pub async fn query(&mut self, query: &str) -> Result<Vec<Event>, RiemannError> {
        self.request(Msg::query(query))
            .await
            .map(|response| response.events)
    }

    pub async fn close(mut self) {
        if let Err(e) = SinkExt::<Bytes>::close(&mut self.frames).await {
            debug!("error while closing riemann connection: {}", e);
        }
    }

    async fn request(&mut self, msg: Msg) -> Result<Msg, RiemannError> {
        let frame = Bytes::from(msg.encode_to_vec());
        timeout(self.request_timeout, self.round_trip(frame))
            .await
            .map_err(|_| RiemannError::Timeout("request"))?
    }

    async fn round_trip(&mut self, frame: Bytes) -> Result<Msg, RiemannError> {
        self.frames.send(frame).await?;
        let response = self.frames.next().await.ok_or(RiemannError::Closed)??;
        let response = Msg::decode(response.freeze())?;

        match response.ok {
            Some(true) => Ok(response),
            _ => Err(RiemannError::Server(
                response
                    .error
                    .unwrap_or_else(|| "request not acknowledged".to_owned()),
            )),
        }
    }
}
