//! Service entry point.
//!
//! Run with:
//!   RUST_LOG=info DB_HOST=localhost cargo run

use tracing::info;
use tracing_subscriber::EnvFilter;

use watchlist::{AppState, Config, Error, Server, StaticFiles, api, bootstrap};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let addr = config.socket_addr()?;

    let store = bootstrap::connect(&config).await?;
    let assets = StaticFiles::new(&config.static_dir);
    info!(dir = %assets.root().display(), "serving static assets");

    let app = api::routes(AppState::new(store, assets));
    Server::bind(addr).serve(app).await
}
