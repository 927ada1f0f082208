//! # Mock Synthesizer
//!
//! Builds a plausible response for an operation from its definition alone:
//! a status picked from the declared responses, a body taken from the
//! document's examples or generated from the media type schema, and the
//! declared response headers.
//!
//! Generation is deterministic: the same operation and options always give
//! the same response.

mod core;
mod value;

pub use self::core::{select_response, MockOptions, MockSynthesizer};
pub use self::value::{header_text, mock_value, ValueGenerator, MAX_GENERATION_DEPTH};
