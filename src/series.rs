//! The tracked-series record and the inputs that shape queries over it.

use serde::{Deserialize, Serialize};

use crate::request::Request;

/// One tracked show.
///
/// Wire names are camelCase; the episode counter is stored as
/// `episodes_watched` but travels as `lastEpisodeWatched`. Bodies decode
/// leniently: absent fields are zero, unknown fields are ignored.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    pub id: i64,
    pub title: String,
    pub status: String,
    #[sqlx(rename = "episodes_watched")]
    pub last_episode_watched: i64,
    pub total_episodes: i64,
    pub ranking: i64,
}

/// Body of `PATCH /api/series/{id}/status`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusUpdate {
    pub status: String,
}

/// Ranking order for the list endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    /// Only the exact literals `asc` and `desc` select an order.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Optional filters for the list endpoint, combined with AND.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ListFilter {
    /// Exact match on `status`.
    pub status: Option<String>,
    /// Substring match on `title`.
    pub search: Option<String>,
    pub sort: Option<Sort>,
}

impl ListFilter {
    /// Reads `status`, `search` and `sort` from the query string. Empty values
    /// count as absent.
    pub fn from_request(req: &Request) -> Self {
        let present = |key: &str| req.query(key).filter(|v| !v.is_empty()).map(str::to_owned);
        Self {
            status: present("status"),
            search: present("search"),
            sort: req.query("sort").and_then(Sort::parse),
        }
    }
}
