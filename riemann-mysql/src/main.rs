use envconfig::Envconfig;
use eyre::{Result, WrapErr};
use health::HealthRegistry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use riemann_mysql::collector::RiemannConnector;
use riemann_mysql::config::Config;
use riemann_mysql::database::MySqlConnector;
use riemann_mysql::http::{app, serve, setup_metrics_routes};
use riemann_mysql::poller::Poller;
use riemann_mysql::shutdown::spawn_signal_listener;

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

fn start_health_liveness_server(config: &Config, liveness: HealthRegistry) -> JoinHandle<()> {
    let router = app(liveness);
    let bind = config.bind();
    tokio::task::spawn(async move {
        let router = match setup_metrics_routes(router) {
            Ok(router) => router,
            Err(e) => {
                error!("failed to install metrics recorder: {}", e);
                return;
            }
        };
        if let Err(e) = serve(router, &bind).await {
            error!("failed to serve metrics on {}: {}", bind, e);
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    info!("starting riemann-mysql");

    let config = Config::init_from_env().wrap_err("failed to load configuration from env")?;
    let settings = config.validate().wrap_err("invalid configuration")?;
    info!(
        interval = ?settings.interval,
        ttl = settings.annotations.ttl,
        host = %settings.annotations.host,
        riemann = %settings.riemann.address(),
        "configuration loaded"
    );

    let liveness = HealthRegistry::new("liveness");
    let poller_liveness = liveness
        .register("replication_poller", settings.liveness_deadline())
        .await;

    if config.metrics_enabled {
        start_health_liveness_server(&config, liveness.clone());
    }

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let poller = Poller::new(
        MySqlConnector::new(settings.mysql.clone(), &settings.replication_query),
        RiemannConnector::new(settings.riemann.clone()),
        settings.poller_config(),
    );
    poller.run(shutdown, poller_liveness).await;

    info!("terminating");
    Ok(())
}
