//! Static asset serving for the companion frontend.
//!
//! Any path the API router does not claim is looked up under one directory
//! and served byte-for-byte.

use std::path::{Path, PathBuf};

use crate::response::{ContentType, Response};
use crate::status::Status;

#[derive(Clone, Debug)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path to a file under the root. `None` for paths that
    /// try to climb out of it.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(request_path).ok()?;
        let mut file = self.root.clone();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => return None,
                s if s.contains('\\') || s.contains('\0') => return None,
                s => file.push(s),
            }
        }
        if decoded.ends_with('/') || decoded.is_empty() {
            file.push("index.html");
        }
        Some(file)
    }

    /// Reads the file behind `request_path`; directories serve their `index.html`.
    pub async fn serve(&self, request_path: &str) -> Response {
        let Some(mut file) = self.resolve(request_path) else {
            return not_found();
        };

        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_dir() => file.push("index.html"),
            Ok(_) => {}
            Err(_) => return not_found(),
        }

        match tokio::fs::read(&file).await {
            Ok(body) => {
                let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
                Response::builder().bytes(ContentType::from_extension(ext), body)
            }
            Err(_) => not_found(),
        }
    }
}

fn not_found() -> Response {
    Response::builder().status(Status::NotFound).text("404 page not found")
}
