//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A request that matches no
//! route for its method goes to the fallback handler, even when the path is
//! registered under another method.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Owns the shared application state `S` and hands an `Arc<S>` to every
/// handler it dispatches to. Build it once at startup; pass it to
/// [`Server::serve`](crate::Server::serve).
pub struct Router<S> {
    state: Arc<S>,
    routes: HashMap<Method, MatchitRouter<BoxedHandler<S>>>,
    fallback: Option<BoxedHandler<S>>,
}

impl<S: Send + Sync + 'static> Router<S> {
    pub fn with_state(state: S) -> Self {
        Self { state: Arc::new(state), routes: HashMap::new(), fallback: None }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for the same method.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler<S>) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Patch, path, handler)
    }

    /// Handler for every request that matches no route for its method.
    pub fn fallback(mut self, handler: impl Handler<S>) -> Self {
        self.fallback = Some(handler.into_boxed_handler());
        self
    }

    /// Routes one request and produces one response.
    pub async fn handle(&self, mut req: Request) -> Response {
        if let Some((handler, params)) = self.lookup(req.method(), req.path()) {
            req.params = params;
            return handler.call(Arc::clone(&self.state), req).await;
        }
        match &self.fallback {
            Some(handler) => handler.call(Arc::clone(&self.state), req).await,
            None => Response::status(Status::NotFound),
        }
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler<S>, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((Arc::clone(matched.value), params))
    }
}
