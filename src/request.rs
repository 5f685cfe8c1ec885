//! Incoming HTTP request type.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::method::Method;

/// An incoming HTTP request with its body fully collected.
///
/// Handlers here read only the path, query and body, so headers are not kept.
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Builds a request from a method and a request target (`/path?query`).
    ///
    /// Path parameters are filled in by the router during dispatch.
    pub fn new(method: Method, target: &str, body: impl Into<Vec<u8>>) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, Vec::new()),
        };
        Self {
            method,
            path: path.to_owned(),
            query,
            body: body.into(),
            params: HashMap::new(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Returns a named path parameter.
    ///
    /// For a route `/api/series/{id}`, `req.param("id")` on `/api/series/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the first decoded value of a query-string parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
