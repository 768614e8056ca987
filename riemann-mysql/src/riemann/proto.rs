//! Riemann protocol buffer messages (proto2), declared by hand with prost derives.
//! Field tags follow riemann's `proto.proto`; fields the agent never reads or
//! writes are left out and skipped by the decoder.

#[derive(Clone, PartialEq, prost::Message)]
pub struct Msg {
    #[prost(bool, optional, tag = "2")]
    pub ok: Option<bool>,
    #[prost(string, optional, tag = "3")]
    pub error: Option<String>,
    #[prost(message, optional, tag = "5")]
    pub query: Option<Query>,
    #[prost(message, repeated, tag = "6")]
    pub events: Vec<Event>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Query {
    #[prost(string, optional, tag = "1")]
    pub string: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Event {
    #[prost(int64, optional, tag = "1")]
    pub time: Option<i64>,
    #[prost(string, optional, tag = "2")]
    pub state: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub service: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub host: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub description: Option<String>,
    #[prost(string, repeated, tag = "7")]
    pub tags: Vec<String>,
    #[prost(float, optional, tag = "8")]
    pub ttl: Option<f32>,
    #[prost(sint64, optional, tag = "13")]
    pub metric_sint64: Option<i64>,
    #[prost(double, optional, tag = "14")]
    pub metric_d: Option<f64>,
    #[prost(float, optional, tag = "15")]
    pub metric_f: Option<f32>,
}

impl Msg {
    pub fn events(events: Vec<Event>) -> Self {
        Msg {
            events,
            ..Default::default()
        }
    }

    pub fn query(query: &str) -> Self {
        Msg {
            query: Some(Query {
                string: Some(query.to_owned()),
            }),
            ..Default::default()
        }
    }

    /// A bare acknowledgement, as the server sends for accepted events.
    pub fn acknowledged() -> Self {
        Msg {
            ok: Some(true),
            ..Default::default()
        }
    }
}
