//! Schema objects owned by the registry: primitive fields, messages, and
//! the root-message "table" view used by DDL/DML emission.

use std::collections::BTreeSet;

use crate::path::Path;
use crate::registry::config::TableConfig;
use crate::types::{quote_sql_string, ValueType};

/// A bitset over the kinds an object registered at a path may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectKind(u8);

impl ObjectKind {
    pub const NONE: ObjectKind = ObjectKind(0);
    pub const ROOT_MESSAGE: ObjectKind = ObjectKind(0b001);
    pub const FIELD_MESSAGE: ObjectKind = ObjectKind(0b010);
    pub const PRIMITIVE_FIELD: ObjectKind = ObjectKind(0b100);
    pub const MESSAGE: ObjectKind = ObjectKind(0b011);

    pub fn contains(self, other: ObjectKind) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ObjectKind {
    type Output = ObjectKind;
    fn bitor(self, rhs: Self) -> Self::Output {
        ObjectKind(self.0 | rhs.0)
    }
}

/// A primitive (leaf) field discovered while walking a descriptor.
#[derive(Debug, Clone)]
pub struct PrimitiveFieldInfo {
    pub number: u32,
    pub name: String,
    pub path: Path,
    pub value_type: ValueType,
    pub is_required: bool,
    pub is_primary_key: bool,
    /// Whether the IDL annotated this field with an explicit default,
    /// rather than `value_type` merely holding a scalar's zero value.
    pub has_explicit_default: bool,
}

impl PrimitiveFieldInfo {
    pub fn has_default_value(&self) -> bool {
        self.value_type.has_default_value()
    }

    /// Type-aware default-literal rendering, per spec.md §4.2. Auto-increment
    /// integers never carry one; everything else only does when the IDL
    /// actually annotated an explicit default.
    pub fn default_literal(&self) -> Option<String> {
        if self.value_type.is_auto_increment() || !self.has_explicit_default {
            return None;
        }
        self.value_type.default_literal()
    }

    pub fn sql_type(&self) -> &'static str {
        self.value_type.sql_type()
    }
}

/// A sub-message (or root-message) node discovered while walking a
/// descriptor tree.
#[derive(Debug, Clone)]
pub struct MessageInfo {
    pub path: Path,
    pub idl_type_name: String,
    /// Registration order (IDL field declaration order), not numeric path
    /// order — spec.md §4.6 flattens fields in registration order.
    pub primitive_fields: Vec<Path>,
    pub sub_message_fields: BTreeSet<Path>,
    /// Root messages carry their table configuration; sub-messages don't.
    pub root: Option<TableConfig>,
    /// For root messages: every primary-key path discovered during the walk.
    pub primary_key_paths: BTreeSet<Path>,
}

impl MessageInfo {
    pub fn is_root(&self) -> bool {
        self.root.is_some()
    }
}

/// The root-message view used by DDL/DML emission: the flattened set of
/// primitive fields reachable along singular sub-message fields, the set
/// of directly related sub-messages, and the primary-key set.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub path: Path,
    pub config: TableConfig,
    pub related_messages: BTreeSet<Path>,
    /// Registration order, not numeric path order — spec.md §4.6/§5 require
    /// CREATE TABLE's column list and selector expansion to preserve the
    /// IDL's declared field order, which need not be ascending by number.
    pub related_fields: Vec<Path>,
    pub primary_key_paths: BTreeSet<Path>,
}

impl TableInfo {
    pub fn table_number(&self) -> u32 {
        self.config.table_number
    }
}

/// Render a `default-literal` quoted the way the registry, not the
/// builder, needs it (used by tests and by callers introspecting a
/// field without going through the builder). Kept here rather than in
/// `types` since it is a thin convenience over `quote_sql_string`.
pub fn quote(value: &str) -> String {
    quote_sql_string(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_kind_union_and_disjointness() {
        let union = ObjectKind::ROOT_MESSAGE | ObjectKind::FIELD_MESSAGE | ObjectKind::PRIMITIVE_FIELD;
        assert!(union.contains(ObjectKind::MESSAGE));
        assert!(!ObjectKind::FIELD_MESSAGE.contains(ObjectKind::PRIMITIVE_FIELD));
        assert!(!ObjectKind::PRIMITIVE_FIELD.contains(ObjectKind::FIELD_MESSAGE));
    }
}
