//! # Dispatcher Module
//!
//! The dispatcher is the per-request entry point. For every [`MockRequest`]
//! it:
//!
//! 1. routes the path and method ([`Router`](crate::router::Router)),
//! 2. validates parameters and body against the matched operation (unless
//!    disabled in [`MockConfig`](crate::config::MockConfig)),
//! 3. answers with a registered handler, or with a synthesized mock.
//!
//! The result is an [`Outcome`] value rather than a callback; the transport
//! matches on it or calls [`Outcome::into_response`] for the standard wire
//! shape:
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | `Handled` | from the response | from the response |
//! | `ValidationFailed` | 400 | `{"err": [errors...]}` |
//! | `NotFound` | 404 | `{"err": "not found"}` |
//! | `MethodNotAllowed` | 405 | `{"err": "method not allowed"}` + `Allow` |
//!
//! ## Handler Registration
//!
//! ```rust,ignore
//! use brrtmock::dispatcher::{Dispatcher, MockResponse};
//!
//! dispatcher.register_handler("getPet", |req, route| {
//!     MockResponse::json(200, serde_json::json!({
//!         "id": route.get_path_param("petId"),
//!     }))
//! })?;
//! ```
//!
//! Handler panics are caught and turned into 500 responses.

mod core;
mod request;

pub use self::core::{
    DispatchError, Dispatcher, Handler, HeaderVec, MockResponse, Outcome, MAX_INLINE_HEADERS,
};
pub use self::request::MockRequest;
