pub mod classify;
pub mod collector;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod event;
pub mod http;
pub mod metrics_consts;
pub mod poller;
pub mod riemann;
pub mod shutdown;
