//! # Router Module
//!
//! Resolves `(method, path)` to an [`Operation`](crate::spec::Operation) of the
//! loaded definition.
//!
//! ## Architecture
//!
//! 1. **Compilation**: at startup every path template (e.g. `/pets/{petId}`,
//!    `/files/{name}.json`) is split into segments and inserted into a radix
//!    tree. Mixed segments are compiled to anchored regexes once.
//!
//! 2. **Matching**: per request the path is stripped of the API root, split and
//!    percent-decoded, and every template that fits is collected. Candidates
//!    are ranked by literal segment count, then pattern segment count, then
//!    declaration order, so `/pets/mine` wins over `/pets/{petId}`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brrtmock::router::{MatchOutcome, Router};
//! use brrtmock::spec::load_definition;
//! use http::Method;
//!
//! let definition = load_definition("openapi.yaml")?;
//! let router = Router::new(&definition, "/");
//!
//! if let MatchOutcome::Matched(m) = router.route(&Method::GET, "/pets/123") {
//!     println!("Operation: {}", m.operation.id);
//!     println!("Pet id: {:?}", m.get_path_param("petId"));
//! }
//! ```

mod core;
mod radix;
#[cfg(test)]
mod tests;

pub use self::core::{MatchOutcome, ParamVec, RouteEntry, RouteMatch, Router, MAX_INLINE_PARAMS};
