//! Table configuration ingestion.
//!
//! A [`TableConfig`] names one root message (table number, naming, and
//! IDL type) the registry should register. An [`OrmConfig`] is the
//! top-level `{ "tables": [...] }` object a caller loads (e.g. from a
//! JSON file) and feeds to `SchemaRegistry::register_root` in order.

use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::{Deserialize, Serialize};

use crate::error::OrmResult;

/// Per-root-message table configuration (spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub table_number: u32,
    pub snake_case: String,
    pub camel_case: String,
    pub scheme: String,
    #[serde(default)]
    pub custom_type_handler: bool,
}

impl TableConfig {
    /// Build a config, deriving `snake_case`/`camel_case` from the IDL
    /// type name's final path segment when not supplied explicitly — the
    /// original stores both forms on `TRootMessageConfig` up front, but a
    /// constructor is friendlier for in-memory test fixtures.
    pub fn new(table_number: u32, scheme: impl Into<String>) -> Self {
        let scheme = scheme.into();
        let leaf = scheme.rsplit('.').next().unwrap_or(&scheme);
        Self {
            table_number,
            snake_case: leaf.to_snake_case(),
            camel_case: leaf.to_lower_camel_case(),
            scheme,
            custom_type_handler: false,
        }
    }

    pub fn with_names(mut self, snake_case: impl Into<String>, camel_case: impl Into<String>) -> Self {
        self.snake_case = snake_case.into();
        self.camel_case = camel_case.into();
        self
    }
}

/// The top-level ORM configuration object: the set of tables to register.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrmConfig {
    pub tables: Vec<TableConfig>,
}

impl OrmConfig {
    /// Parse an `OrmConfig` from a JSON document. A syntax error or a
    /// shape mismatch surfaces as `OrmError::LoadFailure`.
    pub fn from_json(text: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_names_from_scheme() {
        let cfg = TableConfig::new(1, "pkg.SimpleMessage");
        assert_eq!(cfg.snake_case, "simple_message");
        assert_eq!(cfg.camel_case, "simpleMessage");
    }

    #[test]
    fn parses_orm_config_json() {
        let json = r#"{
            "tables": [
                { "table_number": 1, "snake_case": "simple_message", "camel_case": "simpleMessage", "scheme": "pkg.SimpleMessage" }
            ]
        }"#;
        let cfg = OrmConfig::from_json(json).unwrap();
        assert_eq!(cfg.tables.len(), 1);
        assert_eq!(cfg.tables[0].table_number, 1);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = OrmConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::error::OrmError::LoadFailure(_)));
    }
}
