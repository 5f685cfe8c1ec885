//! The `/api/series` endpoints.
//!
//! Each handler parses the path, query or body, issues one store operation
//! (two for the mutate-then-refetch endpoints) and encodes the result as JSON.

use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::assets::StaticFiles;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;
use crate::series::{ListFilter, Series, StatusUpdate};
use crate::status::Status;
use crate::store::{Counter, SeriesStore, StoreError};

/// Everything a handler can reach: the store and the asset directory.
pub struct AppState {
    pub store: Arc<dyn SeriesStore>,
    pub assets: StaticFiles,
}

impl AppState {
    pub fn new(store: impl SeriesStore + 'static, assets: StaticFiles) -> Self {
        Self { store: Arc::new(store), assets }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid series id")]
    InvalidId,

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("series not found")]
    NotFound,

    /// The row was gone when an update was re-read.
    #[error("series {0} not found after update")]
    Vanished(i64),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            Self::InvalidId | Self::InvalidBody(_) => Status::BadRequest,
            Self::NotFound => Status::NotFound,
            Self::Vanished(_) | Self::Store(_) => Status::InternalServerError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == Status::InternalServerError {
            error!("request failed: {self}");
        }
        Response::builder().status(status).text(self.to_string())
    }
}

/// Wires every API route plus the static-asset fallback.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::with_state(state)
        .get("/api", api_root)
        .get("/api/series", list_series)
        .post("/api/series", create_series)
        .get("/api/series/{id}", get_series)
        .put("/api/series/{id}", replace_series)
        .delete("/api/series/{id}", delete_series)
        .patch("/api/series/{id}/episode", increment_episode)
        .patch("/api/series/{id}/upvote", upvote)
        .patch("/api/series/{id}/downvote", downvote)
        .patch("/api/series/{id}/status", set_status)
        .fallback(static_assets)
}

fn series_id(req: &Request) -> Result<i64, ApiError> {
    req.param("id")
        .and_then(|raw| raw.parse().ok())
        .ok_or(ApiError::InvalidId)
}

// GET /api
async fn api_root(_state: Arc<AppState>, _req: Request) -> Response {
    Response::redirect(Status::Found, "/api/series")
}

// GET /api/series?status=&search=&sort=
async fn list_series(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let filter = ListFilter::from_request(&req);
    let series = state.store.list(&filter).await?;
    Ok(Response::json(&series))
}

// GET /api/series/{id}
async fn get_series(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let id = series_id(&req)?;
    let series = state.store.get(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Response::json(&series))
}

// POST /api/series
async fn create_series(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let mut series: Series = req.json()?;
    series.id = state.store.create(&series).await?;
    Ok(Response::json(&series))
}

// PUT /api/series/{id}
//
// Echoes the body under the path id. No existence or version check: the last
// writer wins.
async fn replace_series(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let id = series_id(&req)?;
    let mut series: Series = req.json()?;
    series.id = id;
    state.store.replace(id, &series).await?;
    Ok(Response::json(&series))
}

// DELETE /api/series/{id}
async fn delete_series(state: Arc<AppState>, req: Request) -> Result<Status, ApiError> {
    let id = series_id(&req)?;
    state.store.delete(id).await?;
    Ok(Status::NoContent)
}

// PATCH /api/series/{id}/episode
async fn increment_episode(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    adjust(&state, &req, Counter::Episodes, 1).await
}

// PATCH /api/series/{id}/upvote
async fn upvote(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    adjust(&state, &req, Counter::Ranking, 1).await
}

// PATCH /api/series/{id}/downvote
async fn downvote(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    adjust(&state, &req, Counter::Ranking, -1).await
}

// PATCH /api/series/{id}/status  body: {"status": "..."}
async fn set_status(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let id = series_id(&req)?;
    let update: StatusUpdate = req.json()?;
    state.store.set_status(id, &update.status).await?;
    refetch(&state, id).await
}

/// Relative update in the store, then re-read the row.
async fn adjust(
    state: &AppState,
    req: &Request,
    counter: Counter,
    delta: i64,
) -> Result<Response, ApiError> {
    let id = series_id(req)?;
    state.store.adjust(id, counter, delta).await?;
    refetch(state, id).await
}

async fn refetch(state: &AppState, id: i64) -> Result<Response, ApiError> {
    let series = state.store.get(id).await?.ok_or(ApiError::Vanished(id))?;
    Ok(Response::json(&series))
}

// Everything else
async fn static_assets(state: Arc<AppState>, req: Request) -> Response {
    state.assets.serve(req.path()).await
}
