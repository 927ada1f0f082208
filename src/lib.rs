//! # brrtmock
//!
//! **brrtmock** is an OpenAPI driven mock engine. Give it a Swagger 2.0 or
//! OpenAPI 3.x document and it will route requests to the document's
//! operations, validate them against the declared parameters and bodies, and
//! answer with plausible responses built from the document's examples and
//! schemas.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Loads the document (Swagger 2 is normalized to OpenAPI 3)
//!   into an immutable [`Definition`] with an arena of compiled schemas
//! - **[`router`]** - Radix tree over path templates; literal segments beat captures
//! - **[`validator`]** - Schema validation, parameter coercion, response checks
//! - **[`mock`]** - Deterministic response synthesis
//! - **[`dispatcher`]** - Per-request pipeline returning an [`Outcome`]
//! - **[`config`]**, **[`telemetry`]**, **[`ids`]** - Configuration, logging, request ids
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant D as Dispatcher
//!     participant R as Router
//!     participant V as SchemaValidator
//!     participant M as MockSynthesizer
//!
//!     T->>D: handle(MockRequest)
//!     D->>R: route(method, path)
//!     alt no template / no method
//!         R-->>D: NotFound / MethodNotAllowed
//!         D-->>T: Outcome::NotFound / MethodNotAllowed
//!     else matched
//!         R-->>D: RouteMatch
//!         D->>V: validate parameters and body
//!         alt errors
//!             D-->>T: Outcome::ValidationFailed(errors)
//!         else valid
//!             D->>M: generate_with(operation, options)
//!             M-->>D: MockResponse
//!             D-->>T: Outcome::Handled(response)
//!         end
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use brrtmock::{load_definition, Dispatcher, MockConfig, MockRequest};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let definition = Arc::new(load_definition("openapi.yaml")?);
//! let dispatcher = Dispatcher::new(definition, MockConfig::from_env());
//!
//! let outcome = dispatcher.handle(&MockRequest::new(Method::GET, "/pets/42"));
//! let response = outcome.into_response();
//! println!("{} {:?}", response.status, response.body_text());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Everything built from a definition is read-only after construction, so a
//! single `Arc<Dispatcher>` can serve any number of threads.

pub mod config;
pub mod dispatcher;
pub mod ids;
pub mod mock;
pub mod router;
pub mod spec;
pub mod telemetry;
pub mod validator;

pub use config::MockConfig;
pub use dispatcher::{DispatchError, Dispatcher, MockRequest, MockResponse, Outcome};
pub use mock::{MockOptions, MockSynthesizer};
pub use router::{MatchOutcome, RouteMatch, Router};
pub use spec::{load_definition, load_definition_str, Definition, DefinitionError, Operation};
pub use validator::{SchemaValidator, ValidationError, ValidationResult};
