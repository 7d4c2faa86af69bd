//! Tagged-union description of a primitive field's value type, default
//! value, and (for integers) auto-increment flag.

/// The value-type descriptor carried by a primitive field.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Bool { default: bool },
    Int32 { default: i32, increment: bool },
    UInt32 { default: u32, increment: bool },
    Int64 { default: i64, increment: bool },
    UInt64 { default: u64, increment: bool },
    Float { default: f32 },
    Double { default: f64 },
    String { default: String },
    Bytes { default: Vec<u8> },
    Enum { default_index: i32, descriptor: String },
    /// Unknown / not-a-primitive.
    Monostate,
}

impl ValueType {
    /// True if this type carries an explicit default value (i.e. not an
    /// auto-increment integer and not [`ValueType::Monostate`]).
    pub fn has_default_value(&self) -> bool {
        match self {
            ValueType::Int32 { increment, .. }
            | ValueType::UInt32 { increment, .. }
            | ValueType::Int64 { increment, .. }
            | ValueType::UInt64 { increment, .. } => !increment,
            ValueType::Monostate => false,
            _ => true,
        }
    }

    /// Is this an auto-increment integer column (`SERIAL`/`BIGSERIAL`)?
    pub fn is_auto_increment(&self) -> bool {
        matches!(
            self,
            ValueType::Int32 { increment: true, .. }
                | ValueType::UInt32 { increment: true, .. }
                | ValueType::Int64 { increment: true, .. }
                | ValueType::UInt64 { increment: true, .. }
        )
    }

    /// Render this type's default value as a SQL literal, per spec.md §4.2.
    ///
    /// Returns `None` for auto-increment integers, whose type itself
    /// (`SERIAL`/`BIGSERIAL`) carries no explicit `DEFAULT`.
    pub fn default_literal(&self) -> Option<String> {
        match self {
            ValueType::Bool { default } => Some(if *default { "TRUE" } else { "FALSE" }.to_string()),
            ValueType::Int32 { default, increment } => (!increment).then(|| default.to_string()),
            ValueType::UInt32 { default, increment } => (!increment).then(|| default.to_string()),
            ValueType::Int64 { default, increment } => (!increment).then(|| default.to_string()),
            ValueType::UInt64 { default, increment } => (!increment).then(|| default.to_string()),
            ValueType::Float { default } => Some(format_float(*default as f64)),
            ValueType::Double { default } => Some(format_float(*default)),
            ValueType::String { default } => Some(quote_sql_string(default)),
            ValueType::Bytes { .. } => Some("''::bytes".to_string()),
            ValueType::Enum { default_index, .. } => Some(default_index.to_string()),
            ValueType::Monostate => Some("NULL".to_string()),
        }
    }

    /// The PostgreSQL column type for `CREATE TABLE`/`ALTER COLUMN`, per
    /// spec.md §4.6's DDL type-mapping table.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ValueType::Bool { .. } => "BOOLEAN",
            ValueType::Int32 { increment, .. } => {
                if *increment {
                    "SERIAL"
                } else {
                    "INTEGER"
                }
            }
            ValueType::UInt32 { increment, .. } => {
                if *increment {
                    "SERIAL"
                } else {
                    "INTEGER"
                }
            }
            ValueType::Int64 { increment, .. } => {
                if *increment {
                    "BIGSERIAL"
                } else {
                    "BIGINT"
                }
            }
            ValueType::UInt64 { increment, .. } => {
                if *increment {
                    "BIGSERIAL"
                } else {
                    "BIGINT"
                }
            }
            ValueType::Float { .. } => "REAL",
            ValueType::Double { .. } => "DOUBLE PRECISION",
            ValueType::String { .. } => "TEXT",
            ValueType::Bytes { .. } => "BYTEA",
            ValueType::Enum { .. } => "INTEGER",
            ValueType::Monostate => "TEXT",
        }
    }
}

/// Render a float the way the builder renders float literals: fixed
/// notation, never scientific, and always carrying a decimal point.
pub fn format_float(value: f64) -> String {
    if value == value.trunc() && value.is_finite() {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Single-quote a string for SQL, doubling embedded quotes (bare `'`
/// doubling, used for default-value literals; the builder's general
/// string-literal emission additionally escapes backslashes and control
/// characters per spec.md §4.6).
pub fn quote_sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_default_literal() {
        assert_eq!(ValueType::Bool { default: true }.default_literal().unwrap(), "TRUE");
        assert_eq!(ValueType::Bool { default: false }.default_literal().unwrap(), "FALSE");
    }

    #[test]
    fn increment_int_has_no_default_literal() {
        let t = ValueType::Int32 {
            default: 0,
            increment: true,
        };
        assert_eq!(t.default_literal(), None);
        assert_eq!(t.sql_type(), "SERIAL");
        assert!(!t.has_default_value());
    }

    #[test]
    fn plain_int_has_default_literal() {
        let t = ValueType::Int32 {
            default: 5,
            increment: false,
        };
        assert_eq!(t.default_literal().unwrap(), "5");
        assert_eq!(t.sql_type(), "INTEGER");
    }

    #[test]
    fn string_default_is_quoted_and_escaped() {
        let t = ValueType::String {
            default: "it's".to_string(),
        };
        assert_eq!(t.default_literal().unwrap(), "'it''s'");
    }

    #[test]
    fn bytes_default_is_empty_bytes_cast() {
        let t = ValueType::Bytes { default: vec![] };
        assert_eq!(t.default_literal().unwrap(), "''::bytes");
    }

    #[test]
    fn enum_default_is_index() {
        let t = ValueType::Enum {
            default_index: 2,
            descriptor: "Status".to_string(),
        };
        assert_eq!(t.default_literal().unwrap(), "2");
    }

    #[test]
    fn monostate_default_is_null() {
        assert_eq!(ValueType::Monostate.default_literal().unwrap(), "NULL");
    }

    #[test]
    fn int64_serial_mapping() {
        let t = ValueType::Int64 {
            default: 0,
            increment: true,
        };
        assert_eq!(t.sql_type(), "BIGSERIAL");
    }
}
