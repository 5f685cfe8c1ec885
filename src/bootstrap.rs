//! Startup wiring: open the store and wait for the database to come up.
//!
//! The database usually starts alongside the service, so the first pings are
//! expected to fail. Retries happen only here; nothing retries after startup.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::store::{MySqlStore, SeriesStore};

pub const CONNECT_ATTEMPTS: u32 = 15;
pub const CONNECT_DELAY: Duration = Duration::from_secs(2);

/// Runs `op` up to `attempts` times, sleeping a fixed `delay` between failures.
///
/// `op` receives the 1-based attempt number. Returns the first success, or
/// the error from the final attempt.
pub async fn retry_fixed<T, E, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(attempt, "database not available, retrying in {delay:?}: {e}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Opens the connection pool and blocks until the database answers a ping.
pub async fn connect(config: &Config) -> Result<MySqlStore, Error> {
    let store = MySqlStore::connect_lazy(&config.database_url())?;
    retry_fixed(CONNECT_ATTEMPTS, CONNECT_DELAY, |_| store.ping()).await?;
    info!(host = %config.db_host, database = %config.db_name, "database connection established");
    Ok(store)
}
