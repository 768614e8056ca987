use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;
use sqlx::mysql::MySqlConnectOptions;
use tokio_native_tls::native_tls;

use crate::error::ConfigError;
use crate::event::Annotations;
use crate::poller::PollerConfig;
use crate::riemann::{ClientOptions, TlsOptions};

/// Longest accepted poll interval, one day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Cycles missed before the liveness probe reports the poller as stalled.
pub const LIVENESS_CYCLES: u32 = 4;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3310")]
    pub port: u16,

    #[envconfig(default = "true")]
    pub metrics_enabled: bool,

    #[envconfig(default = "30")]
    pub interval_secs: u64,

    // Added to the interval to form the event TTL, so events outlive one missed cycle
    #[envconfig(default = "2.0")]
    pub delay_secs: f64,

    // Overrides the host reported on every event, the machine hostname is used otherwise
    pub event_hostname: Option<String>,

    #[envconfig(default = "")]
    pub event_tags: TagList,

    #[envconfig(default = "mysql/replication")]
    pub service_prefix: String,

    #[envconfig(nested = true)]
    pub mysql: MySqlConfig,

    #[envconfig(nested = true)]
    pub riemann: RiemannConfig,
}

#[derive(Envconfig, Clone)]
pub struct MySqlConfig {
    #[envconfig(default = "localhost")]
    pub mysql_host: String,

    #[envconfig(default = "3306")]
    pub mysql_port: u16,

    #[envconfig(default = "root")]
    pub mysql_user: String,

    #[envconfig(default = "root")]
    pub mysql_password: String,

    #[envconfig(default = "")]
    pub mysql_database: String,

    // MariaDB lists every channel with SHOW ALL SLAVES STATUS, MySQL only knows SHOW SLAVE STATUS
    #[envconfig(default = "SHOW ALL SLAVES STATUS")]
    pub replication_query: String,
}

#[derive(Envconfig, Clone)]
pub struct RiemannConfig {
    #[envconfig(default = "localhost")]
    pub riemann_host: String,

    #[envconfig(default = "5555")]
    pub riemann_port: u16,

    #[envconfig(default = "tcp")]
    pub riemann_protocol: String,

    pub riemann_tls_cert: Option<String>,

    pub riemann_tls_key: Option<String>,

    pub riemann_tls_ca: Option<String>,

    #[envconfig(default = "false")]
    pub riemann_tls_insecure: bool,

    #[envconfig(default = "10000")]
    pub riemann_tls_handshake_timeout_ms: EnvMsDuration,

    #[envconfig(default = "5000")]
    pub riemann_timeout_ms: EnvMsDuration,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check every setting and resolve the runtime values. Any error here is fatal.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.interval_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooLong {
                got: self.interval_secs,
                max: MAX_INTERVAL_SECS,
            });
        }
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(ConfigError::InvalidDelay(self.delay_secs));
        }
        let interval = Duration::from_secs(self.interval_secs);

        let host = match &self.event_hostname {
            Some(hostname) if !hostname.is_empty() => hostname.clone(),
            _ => local_hostname(),
        };

        Ok(Settings {
            interval,
            service_prefix: self.service_prefix.clone(),
            annotations: Annotations::new(
                interval.as_secs_f64() + self.delay_secs,
                self.event_tags.0.clone(),
                host,
            ),
            mysql: self.mysql.connect_options(),
            replication_query: self.mysql.replication_query.clone(),
            riemann: self.riemann.client_options()?,
        })
    }
}

impl MySqlConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.mysql_host)
            .port(self.mysql_port)
            .username(&self.mysql_user)
            .password(&self.mysql_password);

        if self.mysql_database.is_empty() {
            options
        } else {
            options.database(&self.mysql_database)
        }
    }
}

impl RiemannConfig {
    pub fn client_options(&self) -> Result<ClientOptions, ConfigError> {
        let tls = match self.riemann_protocol.parse::<Protocol>()? {
            Protocol::Tcp => None,
            Protocol::Tls => Some(TlsOptions {
                connector: self.tls_connector()?,
                handshake_timeout: self.riemann_tls_handshake_timeout_ms.0,
            }),
        };

        Ok(ClientOptions {
            host: self.riemann_host.clone(),
            port: self.riemann_port,
            timeout: self.riemann_timeout_ms.0,
            tls,
        })
    }

    fn tls_connector(&self) -> Result<tokio_native_tls::TlsConnector, ConfigError> {
        let mut builder = native_tls::TlsConnector::builder();

        match (&self.riemann_tls_cert, &self.riemann_tls_key) {
            (Some(cert), Some(key)) => {
                let identity =
                    native_tls::Identity::from_pkcs8(&read_pem(cert)?, &read_pem(key)?)?;
                builder.identity(identity);
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteIdentity),
        }

        if let Some(ca) = &self.riemann_tls_ca {
            builder.add_root_certificate(native_tls::Certificate::from_pem(&read_pem(ca)?)?);
        }

        if self.riemann_tls_insecure {
            builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?.into())
    }
}

fn read_pem(path: &str) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::ReadTlsMaterial {
        path: path.to_owned(),
        source,
    })
}

fn local_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "<unknown>".to_owned())
}

/// Runtime values derived from a validated `Config`, immutable for the life of the process.
#[derive(Clone)]
pub struct Settings {
    pub interval: Duration,
    pub service_prefix: String,
    pub annotations: Annotations,
    pub mysql: MySqlConnectOptions,
    pub replication_query: String,
    pub riemann: ClientOptions,
}

impl Settings {
    pub fn liveness_deadline(&self) -> Duration {
        self.interval * LIVENESS_CYCLES
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.interval,
            service_prefix: self.service_prefix.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Tls,
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_ref() {
            "tcp" => Ok(Protocol::Tcp),
            "tls" => Ok(Protocol::Tls),
            _ => Err(ConfigError::UnknownProtocol(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(Duration::from_millis(ms)))
    }
}

/// Whitespace separated list of tags attached to every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList(pub Vec<String>);

impl FromStr for TagList {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TagList(s.split_whitespace().map(str::to_owned).collect()))
    }
}
