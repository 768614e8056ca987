pub const CYCLES_STARTED: &str = "riemann_mysql_cycles_started";
pub const CYCLE_TIME: &str = "riemann_mysql_cycle_ms";

// Labelled with the endpoint that could not be acquired
pub const CYCLES_SKIPPED: &str = "riemann_mysql_cycles_skipped";

pub const QUERY_FAILURES: &str = "riemann_mysql_query_failures";

// Labelled with the event state
pub const EVENTS_EMITTED: &str = "riemann_mysql_events_emitted";
pub const SUBMIT_FAILURES: &str = "riemann_mysql_submit_failures";

// Last seen Seconds_Behind_Master, labelled with the event service
pub const REPLICATION_LAG: &str = "riemann_mysql_replication_lag_seconds";

// 1 while a session to the labelled endpoint is held between cycles, 0 otherwise
pub const ENDPOINT_CONNECTED: &str = "riemann_mysql_endpoint_connected";
