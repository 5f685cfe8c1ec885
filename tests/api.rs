//! End-to-end tests through the full router, backed by an in-memory store.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use watchlist::{
    AppState, Counter, ListFilter, Method, Request, Response, Router, Series, SeriesStore, Sort,
    StaticFiles, Status, StoreError, api,
};

/// Case-sensitive, exact status and substring title, like the binary
/// comparison and LIKE the MySQL store issues.
fn matches(filter: &ListFilter, series: &Series) -> bool {
    filter.status.as_ref().is_none_or(|s| series.status == *s)
        && filter.search.as_ref().is_none_or(|q| series.title.contains(q.as_str()))
}

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<(i64, Vec<Series>)>,
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Series>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut found: Vec<Series> = rows.1.iter().filter(|s| matches(filter, s)).cloned().collect();
        match filter.sort {
            Some(Sort::Asc) => found.sort_by_key(|s| s.ranking),
            Some(Sort::Desc) => found.sort_by_key(|s| std::cmp::Reverse(s.ranking)),
            None => {}
        }
        Ok(found)
    }

    async fn get(&self, id: i64) -> Result<Option<Series>, StoreError> {
        Ok(self.rows.lock().unwrap().1.iter().find(|s| s.id == id).cloned())
    }

    async fn create(&self, series: &Series) -> Result<i64, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        rows.0 += 1;
        let id = rows.0;
        rows.1.push(Series { id, ..series.clone() });
        Ok(id)
    }

    async fn replace(&self, id: i64, series: &Series) -> Result<(), StoreError> {
        if let Some(row) = self.rows.lock().unwrap().1.iter_mut().find(|s| s.id == id) {
            *row = Series { id, ..series.clone() };
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.rows.lock().unwrap().1.retain(|s| s.id != id);
        Ok(())
    }

    async fn adjust(&self, id: i64, counter: Counter, delta: i64) -> Result<(), StoreError> {
        if let Some(row) = self.rows.lock().unwrap().1.iter_mut().find(|s| s.id == id) {
            match counter {
                Counter::Episodes => row.last_episode_watched += delta,
                Counter::Ranking => row.ranking += delta,
            }
        }
        Ok(())
    }

    async fn set_status(&self, id: i64, status: &str) -> Result<(), StoreError> {
        if let Some(row) = self.rows.lock().unwrap().1.iter_mut().find(|s| s.id == id) {
            row.status = status.to_owned();
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Fails every operation the way an unreachable database would.
struct DownStore;

#[async_trait]
impl SeriesStore for DownStore {
    async fn list(&self, _: &ListFilter) -> Result<Vec<Series>, StoreError> { Err(down()) }
    async fn get(&self, _: i64) -> Result<Option<Series>, StoreError> { Err(down()) }
    async fn create(&self, _: &Series) -> Result<i64, StoreError> { Err(down()) }
    async fn replace(&self, _: i64, _: &Series) -> Result<(), StoreError> { Err(down()) }
    async fn delete(&self, _: i64) -> Result<(), StoreError> { Err(down()) }
    async fn adjust(&self, _: i64, _: Counter, _: i64) -> Result<(), StoreError> { Err(down()) }
    async fn set_status(&self, _: i64, _: &str) -> Result<(), StoreError> { Err(down()) }
    async fn ping(&self) -> Result<(), StoreError> { Err(down()) }
}

fn down() -> StoreError {
    StoreError::Sqlx(sqlx::Error::PoolTimedOut)
}

fn app(store: impl SeriesStore + 'static) -> Router<AppState> {
    api::routes(AppState::new(store, StaticFiles::new("./does-not-exist")))
}

async fn call(app: &Router<AppState>, method: Method, target: &str, body: Option<Value>) -> Response {
    let body = body.map(|v| v.to_string().into_bytes()).unwrap_or_default();
    app.handle(Request::new(method, target, body)).await
}

fn body_json(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

async fn create(app: &Router<AppState>, title: &str, status: &str, ranking: i64) -> i64 {
    let res = call(
        app,
        Method::Post,
        "/api/series",
        Some(json!({
            "title": title,
            "status": status,
            "lastEpisodeWatched": 0,
            "totalEpisodes": 12,
            "ranking": ranking
        })),
    )
    .await;
    assert_eq!(res.status_code(), Status::Ok);
    body_json(&res)["id"].as_i64().unwrap()
}

fn titles(res: &Response) -> Vec<String> {
    body_json(res)
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn walkthrough_create_progress_vote_delete() {
    let app = app(MemoryStore::default());

    let res = call(
        &app,
        Method::Post,
        "/api/series",
        Some(json!({"title":"Show A","status":"Watching","lastEpisodeWatched":0,"totalEpisodes":12,"ranking":0})),
    )
    .await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(res.header("content-type"), Some("application/json"));
    let created = body_json(&res);
    assert_eq!(created["id"], 1);
    assert_eq!(created["title"], "Show A");

    let res = call(&app, Method::Patch, "/api/series/1/episode", None).await;
    assert_eq!(body_json(&res)["lastEpisodeWatched"], 1);

    call(&app, Method::Patch, "/api/series/1/upvote", None).await;
    let res = call(&app, Method::Patch, "/api/series/1/upvote", None).await;
    assert_eq!(body_json(&res)["ranking"], 2);

    let res = call(&app, Method::Get, "/api/series?status=Watching", None).await;
    assert_eq!(titles(&res), vec!["Show A"]);

    let res = call(&app, Method::Delete, "/api/series/1", None).await;
    assert_eq!(res.status_code(), Status::NoContent);
    assert!(res.body().is_empty());

    let res = call(&app, Method::Get, "/api/series/1", None).await;
    assert_eq!(res.status_code(), Status::NotFound);
}

#[tokio::test]
async fn ids_are_unique_and_stable() {
    let app = app(MemoryStore::default());
    let a = create(&app, "A", "Watching", 0).await;
    let b = create(&app, "B", "Watching", 0).await;
    assert_ne!(a, b);

    let res = call(&app, Method::Get, &format!("/api/series/{b}"), None).await;
    assert_eq!(body_json(&res)["id"], b);
    assert_eq!(body_json(&res)["title"], "B");
}

#[tokio::test]
async fn create_ignores_body_id() {
    let app = app(MemoryStore::default());
    let res = call(&app, Method::Post, "/api/series", Some(json!({"id": 99, "title": "X"}))).await;
    assert_eq!(body_json(&res)["id"], 1);
}

#[tokio::test]
async fn empty_list_is_an_empty_array() {
    let app = app(MemoryStore::default());
    let res = call(&app, Method::Get, "/api/series", None).await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(res.body(), b"[]");
}

#[tokio::test]
async fn status_filter_is_exact() {
    let app = app(MemoryStore::default());
    create(&app, "A", "Watching", 0).await;
    create(&app, "B", "watching", 0).await;
    create(&app, "C", "Watching later", 0).await;

    let res = call(&app, Method::Get, "/api/series?status=Watching", None).await;
    assert_eq!(titles(&res), vec!["A"]);
}

#[tokio::test]
async fn search_and_status_combine_with_and() {
    let app = app(MemoryStore::default());
    create(&app, "Cowboy Bebop", "Completed", 0).await;
    create(&app, "Space Dandy", "Watching", 0).await;
    create(&app, "Space Brothers", "Completed", 0).await;

    let res = call(&app, Method::Get, "/api/series?search=Space", None).await;
    assert_eq!(titles(&res), vec!["Space Dandy", "Space Brothers"]);

    let res = call(&app, Method::Get, "/api/series?search=Space&status=Completed", None).await;
    assert_eq!(titles(&res), vec!["Space Brothers"]);
}

#[tokio::test]
async fn sort_by_ranking() {
    let app = app(MemoryStore::default());
    create(&app, "Mid", "Watching", 5).await;
    create(&app, "Low", "Watching", -3).await;
    create(&app, "High", "Watching", 9).await;

    let res = call(&app, Method::Get, "/api/series?sort=asc", None).await;
    assert_eq!(titles(&res), vec!["Low", "Mid", "High"]);

    let res = call(&app, Method::Get, "/api/series?sort=desc", None).await;
    assert_eq!(titles(&res), vec!["High", "Mid", "Low"]);

    let res = call(&app, Method::Get, "/api/series?sort=sideways", None).await;
    assert_eq!(titles(&res).len(), 3);
}

#[tokio::test]
async fn episode_increment_touches_only_the_counter() {
    let app = app(MemoryStore::default());
    let id = create(&app, "A", "Watching", 4).await;
    let before = body_json(&call(&app, Method::Get, &format!("/api/series/{id}"), None).await);

    let after = body_json(&call(&app, Method::Patch, &format!("/api/series/{id}/episode"), None).await);
    assert_eq!(after["lastEpisodeWatched"], 1);
    for field in ["id", "title", "status", "totalEpisodes", "ranking"] {
        assert_eq!(before[field], after[field], "{field} changed");
    }
}

#[tokio::test]
async fn episodes_are_not_clamped_to_total() {
    let app = app(MemoryStore::default());
    let res = call(
        &app,
        Method::Post,
        "/api/series",
        Some(json!({"title":"Short","lastEpisodeWatched":3,"totalEpisodes":3})),
    )
    .await;
    let id = body_json(&res)["id"].as_i64().unwrap();

    let res = call(&app, Method::Patch, &format!("/api/series/{id}/episode"), None).await;
    assert_eq!(body_json(&res)["lastEpisodeWatched"], 4);
}

#[tokio::test]
async fn downvote_goes_negative() {
    let app = app(MemoryStore::default());
    let id = create(&app, "A", "Dropped", 0).await;

    call(&app, Method::Patch, &format!("/api/series/{id}/downvote"), None).await;
    let res = call(&app, Method::Patch, &format!("/api/series/{id}/downvote"), None).await;
    assert_eq!(body_json(&res)["ranking"], -2);
}

#[tokio::test]
async fn replace_overwrites_everything_and_uses_path_id() {
    let app = app(MemoryStore::default());
    let id = create(&app, "Old", "Watching", 1).await;

    let res = call(
        &app,
        Method::Put,
        &format!("/api/series/{id}"),
        Some(json!({"id": 500, "title":"New","status":"Completed","lastEpisodeWatched":12,"totalEpisodes":12,"ranking":7})),
    )
    .await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(body_json(&res)["id"], id);

    let stored = body_json(&call(&app, Method::Get, &format!("/api/series/{id}"), None).await);
    assert_eq!(
        stored,
        json!({"id": id, "title":"New","status":"Completed","lastEpisodeWatched":12,"totalEpisodes":12,"ranking":7})
    );
}

#[tokio::test]
async fn status_patch() {
    let app = app(MemoryStore::default());
    let id = create(&app, "A", "Watching", 0).await;

    let res = call(&app, Method::Patch, &format!("/api/series/{id}/status"), Some(json!({"status":"Completed"}))).await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(body_json(&res)["status"], "Completed");
}

#[tokio::test]
async fn invalid_ids_are_400() {
    let app = app(MemoryStore::default());
    for (method, target) in [
        (Method::Get, "/api/series/abc"),
        (Method::Put, "/api/series/abc"),
        (Method::Delete, "/api/series/abc"),
        (Method::Patch, "/api/series/abc/episode"),
        (Method::Patch, "/api/series/abc/upvote"),
        (Method::Patch, "/api/series/abc/downvote"),
        (Method::Patch, "/api/series/abc/status"),
    ] {
        let res = call(&app, method, target, Some(json!({"status": "x"}))).await;
        assert_eq!(res.status_code(), Status::BadRequest, "{method} {target}");
    }
}

#[tokio::test]
async fn malformed_bodies_are_400() {
    let app = app(MemoryStore::default());
    let id = create(&app, "A", "Watching", 0).await;

    let res = app.handle(Request::new(Method::Post, "/api/series", "{not json")).await;
    assert_eq!(res.status_code(), Status::BadRequest);

    let res = app.handle(Request::new(Method::Post, "/api/series", "")).await;
    assert_eq!(res.status_code(), Status::BadRequest);

    let res = call(&app, Method::Put, &format!("/api/series/{id}"), Some(json!({"ranking": "top"}))).await;
    assert_eq!(res.status_code(), Status::BadRequest);

    let res = app.handle(Request::new(Method::Patch, &format!("/api/series/{id}/status"), "[")).await;
    assert_eq!(res.status_code(), Status::BadRequest);
}

#[tokio::test]
async fn mutating_a_missing_row_is_a_server_error() {
    let app = app(MemoryStore::default());
    for target in ["/api/series/41/episode", "/api/series/41/upvote", "/api/series/41/downvote"] {
        let res = call(&app, Method::Patch, target, None).await;
        assert_eq!(res.status_code(), Status::InternalServerError, "{target}");
    }
    let res = call(&app, Method::Patch, "/api/series/41/status", Some(json!({"status":"x"}))).await;
    assert_eq!(res.status_code(), Status::InternalServerError);

    let res = call(&app, Method::Get, "/api/series", None).await;
    assert_eq!(res.body(), b"[]");
}

#[tokio::test]
async fn store_failures_are_500_with_the_error_text() {
    let app = app(DownStore);

    let res = call(&app, Method::Get, "/api/series", None).await;
    assert_eq!(res.status_code(), Status::InternalServerError);
    assert_eq!(String::from_utf8_lossy(res.body()), sqlx::Error::PoolTimedOut.to_string());

    let res = call(&app, Method::Get, "/api/series/1", None).await;
    assert_eq!(res.status_code(), Status::InternalServerError);

    let res = call(&app, Method::Delete, "/api/series/1", None).await;
    assert_eq!(res.status_code(), Status::InternalServerError);
}

#[tokio::test]
async fn api_root_redirects() {
    let app = app(MemoryStore::default());
    let res = call(&app, Method::Get, "/api", None).await;
    assert_eq!(res.status_code(), Status::Found);
    assert_eq!(res.header("location"), Some("/api/series"));
}

#[tokio::test]
async fn wrong_method_on_api_path_falls_through_to_static_files() {
    let app = app(MemoryStore::default());
    let id = create(&app, "A", "Watching", 0).await;

    for (method, target) in [
        (Method::Post, format!("/api/series/{id}")),
        (Method::Head, "/api/series".to_owned()),
        (Method::Post, "/api".to_owned()),
        (Method::Get, format!("/api/series/{id}/upvote")),
    ] {
        let res = call(&app, method, &target, None).await;
        assert_eq!(res.status_code(), Status::NotFound, "{method} {target}");
        assert_eq!(res.body(), b"404 page not found");
    }

    let res = call(&app, Method::Get, &format!("/api/series/{id}"), None).await;
    assert_eq!(body_json(&res)["ranking"], 0);
}

#[tokio::test]
async fn unknown_paths_fall_through_to_static_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<main></main>").unwrap();
    let app = api::routes(AppState::new(MemoryStore::default(), StaticFiles::new(dir.path())));

    let res = call(&app, Method::Get, "/", None).await;
    assert_eq!(res.status_code(), Status::Ok);
    assert_eq!(res.body(), b"<main></main>");

    let res = call(&app, Method::Get, "/missing.js", None).await;
    assert_eq!(res.status_code(), Status::NotFound);
}
