//! Persistence for series records.
//!
//! Handlers only see [`SeriesStore`]; [`MySqlStore`] is the production
//! implementation over a pooled MySQL/MariaDB connection.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{ConnectOptions, Connection, MySql, QueryBuilder};
use thiserror::Error;

use crate::series::{ListFilter, Series, Sort};

const COLUMNS: &str = "id, title, status, episodes_watched, total_episodes, ranking";

/// Writable fields as `(wire name, column)`, in bind order.
const WRITE_COLUMNS: [(&str, &str); 5] = [
    ("title", "title"),
    ("status", "status"),
    ("lastEpisodeWatched", "episodes_watched"),
    ("totalEpisodes", "total_episodes"),
    ("ranking", "ranking"),
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A counter column that can be moved by a relative update.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Counter {
    Episodes,
    Ranking,
}

impl Counter {
    pub fn column(self) -> &'static str {
        match self {
            Self::Episodes => "episodes_watched",
            Self::Ranking => "ranking",
        }
    }
}

/// Storage operations the HTTP handlers are written against.
///
/// Every method is a single statement. Nothing here spans a transaction.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Series>, StoreError>;

    /// `Ok(None)` when no row has this id.
    async fn get(&self, id: i64) -> Result<Option<Series>, StoreError>;

    /// Inserts every field except `id` and returns the id the store assigned.
    async fn create(&self, series: &Series) -> Result<i64, StoreError>;

    /// Overwrites every mutable field of row `id`. A missing row is not an error.
    async fn replace(&self, id: i64, series: &Series) -> Result<(), StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// `counter = counter + delta`, applied by the store in one statement.
    async fn adjust(&self, id: i64, counter: Counter, delta: i64) -> Result<(), StoreError>;

    async fn set_status(&self, id: i64, status: &str) -> Result<(), StoreError>;

    /// Round-trips to the store to prove it is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Builds the list query: fragments and bound values are pushed separately,
/// so no filter value is ever spliced into the SQL text.
pub fn list_query(filter: &ListFilter) -> QueryBuilder<'_, MySql> {
    let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM series WHERE 1=1"));

    // Binary comparison: `_ci` collations fold case and PAD SPACE ones
    // ignore trailing spaces.
    if let Some(status) = &filter.status {
        query
            .push(" AND CAST(status AS BINARY) = CAST(")
            .push_bind(status.as_str())
            .push(" AS BINARY)");
    }
    if let Some(search) = &filter.search {
        query.push(" AND title LIKE ").push_bind(format!("%{}%", escape_like(search)));
    }
    match filter.sort {
        Some(Sort::Asc) => {
            query.push(" ORDER BY ranking ASC");
        }
        Some(Sort::Desc) => {
            query.push(" ORDER BY ranking DESC");
        }
        None => {}
    }

    query
}

fn insert_statement() -> String {
    let columns: Vec<&str> = WRITE_COLUMNS.iter().map(|(_, column)| *column).collect();
    let placeholders = vec!["?"; columns.len()];
    format!(
        "INSERT INTO series ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn replace_statement() -> String {
    let assignments: Vec<String> = WRITE_COLUMNS
        .iter()
        .map(|(_, column)| format!("{column} = ?"))
        .collect();
    format!("UPDATE series SET {} WHERE id = ?", assignments.join(", "))
}

/// `col = col + ?`: the store applies the delta, nothing is read first.
fn adjust_statement(counter: Counter) -> String {
    let column = counter.column();
    format!("UPDATE series SET {column} = {column} + ? WHERE id = ?")
}

/// Values for the [`WRITE_COLUMNS`] placeholders, in the same order.
fn write_values(series: &Series) -> (&str, &str, i64, i64, i64) {
    (
        &series.title,
        &series.status,
        series.last_episode_watched,
        series.total_episodes,
        series.ranking,
    )
}

/// Escapes LIKE wildcards so the search term matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct MySqlStore {
    pool: MySqlPool,
    options: MySqlConnectOptions,
}

impl MySqlStore {
    /// Creates the pool without opening a connection. The first query does that.
    pub fn connect_lazy(url: &str) -> Result<Self, StoreError> {
        let options = MySqlConnectOptions::from_str(url)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(10)
            .connect_lazy_with(options.clone());
        Ok(Self { pool, options })
    }
}

#[async_trait]
impl SeriesStore for MySqlStore {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Series>, StoreError> {
        let mut query = list_query(filter);
        let rows = query.build_query_as::<Series>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> Result<Option<Series>, StoreError> {
        let row = sqlx::query_as::<_, Series>(&format!("SELECT {COLUMNS} FROM series WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(&self, series: &Series) -> Result<i64, StoreError> {
        let (title, status, watched, total, ranking) = write_values(series);
        let result = sqlx::query(&insert_statement())
            .bind(title)
            .bind(status)
            .bind(watched)
            .bind(total)
            .bind(ranking)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_id() as i64)
    }

    async fn replace(&self, id: i64, series: &Series) -> Result<(), StoreError> {
        let (title, status, watched, total, ranking) = write_values(series);
        sqlx::query(&replace_statement())
            .bind(title)
            .bind(status)
            .bind(watched)
            .bind(total)
            .bind(ranking)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM series WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn adjust(&self, id: i64, counter: Counter, delta: i64) -> Result<(), StoreError> {
        sqlx::query(&adjust_statement(counter))
            .bind(delta)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_status(&self, id: i64, status: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE series SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Dials one fresh connection. Going through the pool would retry a
    /// refused connect with growing backoff until the acquire timeout.
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.options.connect().await?;
        conn.ping().await?;
        conn.close().await?;
        Ok(())
    }
}
