//! HTTP status codes as a typed enum.
//!
//! Only the codes this service actually answers with. Use [`Status`] anywhere
//! a status code is accepted: `Response::status()`, `Response::builder().status()`,
//! or as a bare handler return value.
//!
//! ```rust
//! use watchlist::{Response, Status};
//!
//! Response::status(Status::NoContent);
//! Response::redirect(Status::Found, "/api/series");
//! ```

/// HTTP status codes emitted by the service.
#[allow(clippy::enum_variant_names)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    NoContent,           // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    Found,               // 302

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::NoContent           => 204,
            Status::Found               => 302,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::InternalServerError => 500,
        }
    }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> http::StatusCode {
        // Every variant above is a registered code, so this never falls back.
        http::StatusCode::from_u16(s.into()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}
