//! Minimal riemann client: protobuf messages over a length-prefixed TCP or TLS stream.

mod client;
pub mod proto;

pub use client::{ClientOptions, RiemannClient, RiemannError, TlsOptions, Transport};
