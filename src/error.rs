//! Pipeline-wide error taxonomy.

use crate::database::DatabaseKind;
use crate::model::Cardinality;
use thiserror::Error;

/// Every failure the parsing, validation, assembly and scheduling layers can
/// surface. Callers branch on the variant; message text is for humans.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A value the source document must carry is absent (a class, field or
    /// enum name, or an association with no inferable cardinality).
    #[error("Missing {0}")]
    MissingValue(&'static str),

    #[error("Unknown association cardinality: {kind}")]
    UnsupportedAssociation { kind: String },

    #[error("Malformed {kind} association between {from} and {to}: {reason}")]
    MalformedAssociation {
        kind: Cardinality,
        from: String,
        to: String,
        reason: &'static str,
    },

    #[error("{database} does not support relationships between entities")]
    UnsupportedModeling { database: DatabaseKind },

    #[error("Circular dependency involving: {}", remaining.join(", "))]
    CircularDependency { remaining: Vec<String> },

    #[error("Type {name:?} is not supported by {database}")]
    UnsupportedType { name: String, database: DatabaseKind },

    #[error("Validation {validation:?} is not supported for type {field_type:?}")]
    UnsupportedValidation {
        validation: String,
        field_type: String,
    },

    #[error("Illegal name {name:?}: {reason}")]
    IllegalName { name: String, reason: &'static str },

    #[error("Could not detect the source modeling tool")]
    UnknownDialect,

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}
