//! Definition model: a Swagger 2.0 or OpenAPI 3.x document compiled into an
//! immutable [`Definition`] with every `$ref` resolved into a schema arena.

mod build;
mod error;
mod load;
mod normalize;
mod schema;
mod types;

pub use error::{DefinitionError, DefinitionErrorKind};
pub use load::{load_definition, load_definition_str, DocumentFormat};
pub use schema::{
    AdditionalProperties, Discriminator, Schema, SchemaId, SchemaKind, SchemaTable, SchemaType,
};
pub use types::*;
