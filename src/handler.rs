//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one map per method, so
//! each handler is hidden behind a trait object (`dyn ErasedHandler<S>`).
//! `S` is the application state every handler receives. It is built once in
//! `main` and handed to the router; nothing reaches for a global.
//!
//! ```text
//! async fn get_series(state: Arc<S>, req: Request) -> impl IntoResponse
//!        ↓ router.get("/api/series/{id}", get_series)
//! Arc::new(FnHandler(get_series))                  ← stored as BoxedHandler<S>
//!        ↓ at request time
//! handler.call(Arc::clone(&state), req)            ← one vtable dispatch
//!        ↓
//! Box::pin(async { get_series(state, req).await.into_response() })
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler<S> {
    fn call(&self, state: Arc<S>, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler<S> = Arc<dyn ErasedHandler<S> + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function with the signature:
///
/// ```text
/// async fn name(state: Arc<S>, req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler<S>: private::Sealed<S> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<S>;
}

mod private {
    pub trait Sealed<S> {}
}

impl<S, F, Fut, R> private::Sealed<S> for F
where
    F: Fn(Arc<S>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<S, F, Fut, R> Handler<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<S> {
        Arc::new(FnHandler(self))
    }
}

/// Holds a concrete handler `F` and bridges it to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<S, F, Fut, R> ErasedHandler<S> for FnHandler<F>
where
    F: Fn(Arc<S>, Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, state: Arc<S>, req: Request) -> BoxFuture {
        let fut = (self.0)(state, req);
        Box::pin(async move { fut.await.into_response() })
    }
}
