//! Waiting for the index database and preparing its schema.

use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use storage::PgIndex;
use tokio::net::{lookup_host, TcpStream};
use tracing::{error, info, warn};

use crate::exit::StartupError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings of the index database.
#[derive(Debug, Clone)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Skip resolving the host before probing the port.
    pub no_ping: bool,
    pub max_retries: u8,
    pub sleep: Duration,
}

impl DbSettings {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Retry until the database accepts connections, then create the schema.
pub async fn connect_and_initialize(settings: &DbSettings) -> Result<PgIndex, StartupError> {
    let index = wait_for_database(settings).await?;
    index
        .migrate()
        .await
        .map_err(|e| StartupError::DatabaseInit(e.to_string()))?;
    Ok(index)
}

async fn wait_for_database(settings: &DbSettings) -> Result<PgIndex, StartupError> {
    for attempt in 1..=settings.max_retries {
        info!(
            attempt = attempt,
            max_retries = settings.max_retries,
            host = %settings.host,
            port = settings.port,
            "Checking database connection"
        );

        match try_connect(settings).await {
            Ok(index) => {
                info!(database = %settings.database, "Database connection established");
                return Ok(index);
            }
            Err(reason) => warn!(attempt = attempt, reason = %reason, "Database not ready"),
        }

        if attempt < settings.max_retries {
            tokio::time::sleep(settings.sleep).await;
        }
    }

    error!(host = %settings.host, "Could not connect to database");
    Err(StartupError::DatabaseUnreachable {
        attempts: settings.max_retries,
    })
}

async fn try_connect(settings: &DbSettings) -> Result<PgIndex, String> {
    let address = (settings.host.as_str(), settings.port);

    if !settings.no_ping {
        let mut resolved = lookup_host(address)
            .await
            .map_err(|e| format!("host '{}' could not be resolved: {}", settings.host, e))?;
        if resolved.next().is_none() {
            return Err(format!("host '{}' has no address", settings.host));
        }
    }

    match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(address)).await {
        Ok(Ok(_)) => info!(port = settings.port, "Database port is open"),
        Ok(Err(e)) => return Err(format!("port {} is closed: {}", settings.port, e)),
        Err(_) => return Err(format!("port {} did not answer", settings.port)),
    }

    let index = PgIndex::connect_with(settings.connect_options())
        .await
        .map_err(|e| e.to_string())?;
    index.ping().await.map_err(|e| e.to_string())?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(port: u16) -> DbSettings {
        DbSettings {
            host: "127.0.0.1".to_string(),
            port,
            user: "opendatacube".to_string(),
            password: "opendatacube".to_string(),
            database: "opendatacube".to_string(),
            no_ping: true,
            max_retries: 2,
            sleep: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        // bind and drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = connect_and_initialize(&settings(port)).await.unwrap_err();
        assert!(matches!(
            err,
            StartupError::DatabaseUnreachable { attempts: 2 }
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let mut settings = settings(5432);
        settings.host = "no-such-host.invalid".to_string();
        settings.no_ping = false;
        settings.max_retries = 1;

        let err = connect_and_initialize(&settings).await.unwrap_err();
        assert_eq!(err.code(), crate::exit::DATABASE_UNREACHABLE);
    }
}
