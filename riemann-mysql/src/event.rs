use tracing::info;

use crate::classify::{classify, Health, State, StatusRow};
use crate::error::QueryError;
use crate::riemann::proto;

/// A named check result, before the per-cycle annotations are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCheck {
    pub service: String,
    pub health: Health,
}

/// An event as handed to the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthEvent {
    pub service: String,
    pub state: State,
    pub description: String,
    pub metric: Option<f64>,
    pub ttl: f32,
    pub tags: Vec<String>,
    /// Seconds since the unix epoch
    pub time: i64,
    pub host: String,
}

/// The fields every event of a run carries regardless of its check.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotations {
    pub ttl: f32,
    pub tags: Vec<String>,
    pub host: String,
}

impl Annotations {
    pub fn new(ttl_secs: f64, tags: Vec<String>, host: String) -> Self {
        Self {
            ttl: ttl_secs as f32,
            tags,
            host,
        }
    }

    pub fn annotate(&self, checks: Vec<ServiceCheck>, time: i64) -> Vec<HealthEvent> {
        checks
            .into_iter()
            .map(|check| HealthEvent {
                service: check.service,
                state: check.health.state,
                description: check.health.description,
                metric: check.health.metric,
                ttl: self.ttl,
                tags: self.tags.clone(),
                time,
                host: self.host.clone(),
            })
            .collect()
    }
}

/// Service of the event for channel `index`, named after the channel when it has a name.
pub fn channel_service(prefix: &str, index: usize, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{prefix}/{name}"),
        _ => format!("{prefix}/conn{index}"),
    }
}

pub fn master_service(prefix: &str) -> String {
    format!("{prefix}/master")
}

/// Turn the outcome of one status query into checks: one per row, a single `ok`
/// master check when the server has no replication channel, or a single
/// `unknown` check on the bare prefix when the query failed.
pub fn checks_from_status<R: StatusRow>(
    prefix: &str,
    status: Result<Vec<R>, QueryError>,
) -> Vec<ServiceCheck> {
    let rows = match status {
        Ok(rows) => rows,
        Err(e) => {
            return vec![ServiceCheck {
                service: prefix.to_owned(),
                health: Health::unknown(e.to_string()),
            }]
        }
    };

    if rows.is_empty() {
        info!("no replication status, looks like a master");
        return vec![ServiceCheck {
            service: master_service(prefix),
            health: Health {
                state: State::Ok,
                description: "no replication channel configured, looks like a master".to_owned(),
                metric: None,
            },
        }];
    }

    rows.iter()
        .enumerate()
        .map(|(index, row)| ServiceCheck {
            service: channel_service(prefix, index, row.connection_name().as_deref()),
            health: classify(row),
        })
        .collect()
}

impl From<HealthEvent> for proto::Event {
    fn from(event: HealthEvent) -> Self {
        proto::Event {
            time: Some(event.time),
            state: Some(event.state.as_str().to_owned()),
            service: Some(event.service),
            host: Some(event.host),
            description: Some(event.description),
            tags: event.tags,
            ttl: Some(event.ttl),
            metric_d: event.metric,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names() {
        assert_eq!(
            channel_service("mysql/replication", 0, None),
            "mysql/replication/conn0"
        );
        assert_eq!(
            channel_service("mysql/replication", 2, Some("")),
            "mysql/replication/conn2"
        );
        assert_eq!(
            channel_service("mysql/replication", 1, Some("eu-west")),
            "mysql/replication/eu-west"
        );
        assert_eq!(master_service("mysql/replication"), "mysql/replication/master");
    }

    #[test]
    fn annotations_apply_to_every_event() {
        let annotations = Annotations::new(32.0, vec!["mysql".to_owned()], "db1".to_owned());
        let checks = vec![
            ServiceCheck {
                service: "mysql/replication/conn0".to_owned(),
                health: Health::unknown("boom"),
            },
            ServiceCheck {
                service: "mysql/replication/conn1".to_owned(),
                health: Health {
                    state: State::Ok,
                    description: "slave io: running, slave sql: running".to_owned(),
                    metric: Some(1.0),
                },
            },
        ];

        let events = annotations.annotate(checks, 1_700_000_000);
        assert_eq!(events.len(), 2);
        for event in &events {
            assert_eq!(event.ttl, 32.0);
            assert_eq!(event.tags, vec!["mysql"]);
            assert_eq!(event.host, "db1");
            assert_eq!(event.time, 1_700_000_000);
        }
        assert_eq!(events[1].metric, Some(1.0));
    }

    #[test]
    fn proto_event_leaves_absent_metric_unset() {
        let event = HealthEvent {
            service: "mysql/replication/conn0".to_owned(),
            state: State::Critical,
            description: "slave io: stopped, slave sql: running".to_owned(),
            metric: None,
            ttl: 32.0,
            tags: vec![],
            time: 1,
            host: "db1".to_owned(),
        };

        let proto: proto::Event = event.into();
        assert_eq!(proto.state.as_deref(), Some("critical"));
        assert_eq!(proto.metric_d, None);
        assert_eq!(proto.metric_sint64, None);
        assert_eq!(proto.metric_f, None);
        assert_eq!(proto.ttl, Some(32.0));
    }
}
