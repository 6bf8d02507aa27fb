use std::{io::Error, sync::Arc, time::Duration};

use messenger::{
    config::Config,
    domain::repositories::HistoryRepository,
    infrastructure::{
        messaging::ProviderClient,
        repositories::{
            in_memory::{InMemoryHistoryRepository, InMemorySenderConfigStore},
            postgres::{self, PostgresHistoryRepository},
        },
    },
    server::{Components, Gateway},
};
use poem::{Server, listener::TcpListener};
use tokio::main;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::try_parse().map_err(Error::other)?;
    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);

    let history: Arc<dyn HistoryRepository> = match &config.database_url {
        Some(url) => {
            let pool = postgres::connect(url).await.map_err(Error::other)?;
            info!("history stored in postgres");
            PostgresHistoryRepository::new(pool)
        }
        None => {
            info!("DATABASE_URL not set, history kept in memory");
            Arc::new(InMemoryHistoryRepository::new())
        }
    };
    let senders = config.sender_configs().map_err(Error::other)?;
    info!(count = senders.len(), "loaded sender configs");

    let gateway = Gateway::start(Components {
        store: Arc::new(InMemorySenderConfigStore::with_configs(senders)),
        history,
        client: ProviderClient::new(config.outbound_max_attempts).map_err(Error::other)?,
        auth_rules: config.auth_rules().map_err(Error::other)?,
        queue_capacity: config.queue_capacity,
    })
    .await;

    info!(%server_url, "starting server");
    Server::new(TcpListener::bind(format!("{}:{}", config.host, config.port)))
        .run_with_graceful_shutdown(
            gateway.app(&server_url),
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
            Some(Duration::from_secs(10)),
        )
        .await?;

    gateway.shutdown().await;
    Ok(())
}
