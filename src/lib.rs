//! # watchlist
//!
//! A small JSON API for tracking series: what you are watching, how far you
//! got, and where each show ranks. Records live in one MySQL/MariaDB table;
//! every path the API does not claim is served from a static directory that
//! hosts the frontend.
//!
//! ## Endpoints
//!
//! | Method | Path | Result |
//! |---|---|---|
//! | `GET` | `/api/series?status=&search=&sort=` | filtered list |
//! | `GET` | `/api/series/{id}` | one record, or 404 |
//! | `POST` | `/api/series` | created record with its id |
//! | `PUT` | `/api/series/{id}` | full replace |
//! | `DELETE` | `/api/series/{id}` | 204 |
//! | `PATCH` | `/api/series/{id}/episode` | episodes watched + 1 |
//! | `PATCH` | `/api/series/{id}/upvote` | ranking + 1 |
//! | `PATCH` | `/api/series/{id}/downvote` | ranking - 1 |
//! | `PATCH` | `/api/series/{id}/status` | new status |
//! | `GET` | `/api` | redirect to `/api/series` |
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use watchlist::{AppState, Config, Server, StaticFiles, api, bootstrap};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), watchlist::Error> {
//!     let config = Config::from_env();
//!     let store = bootstrap::connect(&config).await?;
//!     let app = api::routes(AppState::new(store, StaticFiles::new(&config.static_dir)));
//!     Server::bind(config.socket_addr()?).serve(app).await
//! }
//! ```
//!
//! The HTTP layer is a thin radix-tree router over hyper. Handlers are plain
//! `async fn(Arc<State>, Request) -> impl IntoResponse`.

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod api;
pub mod assets;
pub mod bootstrap;
pub mod config;
pub mod series;
pub mod store;

pub use api::{ApiError, AppState};
pub use assets::StaticFiles;
pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::Router;
pub use series::{ListFilter, Series, Sort};
pub use server::Server;
pub use status::Status;
pub use store::{Counter, MySqlStore, SeriesStore, StoreError};
