//! Target-database knowledge: supported scalar types, which validations each
//! type accepts, and reserved words.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[default]
    Sql,
    Mongodb,
    Cassandra,
}

impl DatabaseKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sql" => Some(Self::Sql),
            "mongodb" | "mongo" => Some(Self::Mongodb),
            "cassandra" => Some(Self::Cassandra),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Mongodb => "mongodb",
            Self::Cassandra => "cassandra",
        }
    }

    /// Only relational targets can express associations between entities.
    pub fn supports_relationships(self) -> bool {
        matches!(self, Self::Sql)
    }

    pub fn supports_enums(self) -> bool {
        self.validations_for("Enum").is_some()
    }

    /// The validations a field of the given type accepts, or `None` when the
    /// type itself is not supported by this database.
    pub fn validations_for(self, type_name: &str) -> Option<&'static [&'static str]> {
        match self {
            Self::Sql | Self::Mongodb => match type_name {
                "String" => Some(STRING_VALIDATIONS),
                "Integer" | "Long" | "Float" | "Double" | "BigDecimal" => {
                    Some(NUMERIC_VALIDATIONS)
                }
                "LocalDate" | "ZonedDateTime" | "Boolean" | "Enum" => Some(PRESENCE_ONLY),
                "Blob" | "AnyBlob" | "ImageBlob" | "TextBlob" => Some(BLOB_VALIDATIONS),
                _ => None,
            },
            Self::Cassandra => match type_name {
                "String" => Some(STRING_VALIDATIONS),
                "Integer" | "Long" | "Float" | "Double" | "BigDecimal" => {
                    Some(NUMERIC_VALIDATIONS)
                }
                "Date" | "UUID" | "TimeUUID" | "Boolean" => Some(PRESENCE_ONLY),
                _ => None,
            },
        }
    }

    pub fn supports_type(self, type_name: &str) -> bool {
        self.validations_for(type_name).is_some()
    }

    /// Fails when the type is unknown to this database or the validation is
    /// not in the type's support table.
    pub fn check_validation(self, type_name: &str, validation: &str) -> Result<(), ModelError> {
        let allowed =
            self.validations_for(type_name)
                .ok_or_else(|| ModelError::UnsupportedType {
                    name: type_name.to_string(),
                    database: self,
                })?;
        if allowed.contains(&validation) {
            Ok(())
        } else {
            Err(ModelError::UnsupportedValidation {
                validation: validation.to_string(),
                field_type: type_name.to_string(),
            })
        }
    }

    pub fn is_reserved_word(self, name: &str) -> bool {
        let words = match self {
            Self::Sql => SQL_RESERVED,
            Self::Mongodb => MONGODB_RESERVED,
            Self::Cassandra => CASSANDRA_RESERVED,
        };
        words.iter().any(|w| w.eq_ignore_ascii_case(name))
    }

    /// Class names colliding with a reserved word are always fatal.
    pub fn check_class_name(self, name: &str) -> Result<(), ModelError> {
        if self.is_reserved_word(name) {
            return Err(ModelError::IllegalName {
                name: name.to_string(),
                reason: "reserved class name",
            });
        }
        Ok(())
    }

    /// Table names colliding with a reserved word only fail when enforcement
    /// is requested; otherwise the collision is logged and kept.
    pub fn check_table_name(self, name: &str, enforce: bool) -> Result<(), ModelError> {
        if self.is_reserved_word(name) {
            if enforce {
                return Err(ModelError::IllegalName {
                    name: name.to_string(),
                    reason: "reserved table name",
                });
            }
            log::warn!("table name '{name}' is a reserved {self} word; the generator may need to quote or prefix it");
        }
        Ok(())
    }

    /// Field-name collisions never block.
    pub fn check_field_name(self, name: &str) {
        if self.is_reserved_word(name) {
            log::warn!("field name '{name}' is a reserved {self} word");
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const STRING_VALIDATIONS: &[&str] = &["required", "minlength", "maxlength", "pattern"];
const NUMERIC_VALIDATIONS: &[&str] = &["required", "min", "max"];
const BLOB_VALIDATIONS: &[&str] = &["required", "minbytes", "maxbytes"];
const PRESENCE_ONLY: &[&str] = &["required"];

const SQL_RESERVED: &[&str] = &[
    "select", "insert", "update", "delete", "create", "drop", "alter", "table", "index", "view",
    "from", "where", "join", "union", "group", "order", "having", "limit", "offset", "distinct",
    "values", "into", "primary", "foreign", "constraint", "references", "check", "default",
    "null", "not", "and", "or", "as", "on", "by", "case", "when", "then", "else", "end", "user",
    "grant", "revoke", "commit", "rollback",
];

const MONGODB_RESERVED: &[&str] = &["document", "collection", "db", "admin", "local", "config"];

const CASSANDRA_RESERVED: &[&str] = &[
    "add", "allow", "alter", "and", "apply", "asc", "authorize", "batch", "begin", "by",
    "columnfamily", "create", "delete", "desc", "drop", "from", "grant", "in", "index", "insert",
    "into", "keyspace", "limit", "modify", "primary", "rename", "revoke", "schema", "select",
    "set", "table", "to", "token", "truncate", "unlogged", "update", "use", "using", "where",
    "with",
];
