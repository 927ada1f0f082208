//! Schema validation for requests and responses.
//!
//! [`SchemaValidator`] walks a JSON value against a schema of the loaded
//! definition and returns every problem it finds, in order. Raw parameter
//! text is coerced to typed JSON first by [`coerce_parameter`].
//!
//! Unknown keywords, unknown formats and shapes the validator cannot
//! interpret are accepted rather than rejected.

mod format;
mod params;
mod response;
mod schema;
mod types;

pub use format::{check_number, check_string};
pub use params::{coerce_form, coerce_parameter, coerce_scalar, query_object};
pub use schema::{SchemaValidator, MAX_SCHEMA_DEPTH};
pub use types::{
    Direction, ErrorLocation, ValidationContext, ValidationError, ValidationResult,
};
