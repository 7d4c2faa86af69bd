//! The IDL descriptor surface the schema registry walks.
//!
//! This models the Protocol-Buffers-style descriptor shape described in
//! spec.md §6 — message descriptors with fields, each field carrying a
//! number, name, wire type, repeated/map/optional flags, and the
//! `primary_key` custom field option — without depending on a real
//! protobuf crate. Callers build a [`DescriptorPool`] in memory (from a
//! code generator, a `.proto` parser, or by hand in tests) the way the
//! original implementation's tests build `google::protobuf::DescriptorProto`
//! trees directly.

use std::collections::HashMap;

use crate::types::ValueType;

/// The primitive wire types a field may carry, mirroring the protobuf
/// scalar type set plus `Message` for nested descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Float,
    Double,
    String,
    Bytes,
    Enum,
    Message,
}

impl FieldKind {
    /// True for every variant that names a nested message rather than a
    /// scalar leaf.
    pub fn is_message(&self) -> bool {
        matches!(self, FieldKind::Message)
    }
}

/// One field of an IDL message descriptor.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub number: u32,
    pub name: String,
    pub kind: FieldKind,
    pub is_map: bool,
    pub is_repeated: bool,
    pub is_optional: bool,
    pub has_presence: bool,
    pub containing_oneof: Option<String>,
    /// Fully qualified name of the message type this field refers to,
    /// when `kind == FieldKind::Message`.
    pub message_type: Option<String>,
    /// Fully qualified name of the enum type this field refers to, when
    /// `kind == FieldKind::Enum`.
    pub enum_type: Option<String>,
    /// The `primary_key` custom field option.
    pub primary_key: bool,
    /// The decoded default value for primitive fields. `None` for
    /// message-typed fields.
    pub value_type: Option<ValueType>,
    /// Whether the IDL actually annotated this field with a default value,
    /// as opposed to `value_type` merely carrying the zero-value a proto3
    /// scalar always has. DDL emission only prints `DEFAULT <lit>` when
    /// this is set — otherwise a fresh `int32` field would render
    /// `DEFAULT 0` on every column, which no seed schema expects.
    pub explicit_default: bool,
}

impl FieldDescriptor {
    pub fn has_default_value(&self) -> bool {
        self.value_type
            .as_ref()
            .map(ValueType::has_default_value)
            .unwrap_or(false)
    }
}

/// Message-level custom options recognized by the CORE.
#[derive(Debug, Clone, Default)]
pub struct MessageOptions {
    pub object_type: Option<ObjectTypeOption>,
    pub in_place: bool,
}

/// `object_type { type_value: int, custom_type_handler: bool }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectTypeOption {
    pub type_value: i32,
    pub custom_type_handler: bool,
}

/// An IDL message descriptor: a fully qualified name and an ordered list
/// of fields.
#[derive(Debug, Clone, Default)]
pub struct MessageDescriptor {
    pub full_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub options: MessageOptions,
}

impl MessageDescriptor {
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }
}

/// A pool of message descriptors, keyed by fully qualified IDL type name.
///
/// This stands in for a protobuf `DescriptorPool`: the schema registry
/// looks up root message types here by name during `register_root`, and
/// resolves nested `message_type` references here while walking.
#[derive(Debug, Clone, Default)]
pub struct DescriptorPool {
    messages: HashMap<String, MessageDescriptor>,
}

impl DescriptorPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: MessageDescriptor) {
        self.messages.insert(descriptor.full_name.clone(), descriptor);
    }

    pub fn get(&self, full_name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_field(number: u32, name: &str) -> FieldDescriptor {
        FieldDescriptor {
            number,
            name: name.to_string(),
            kind: FieldKind::Int32,
            is_map: false,
            is_repeated: false,
            is_optional: false,
            has_presence: false,
            containing_oneof: None,
            message_type: None,
            enum_type: None,
            primary_key: false,
            value_type: Some(ValueType::Int32 {
                default: 0,
                increment: false,
            }),
            explicit_default: false,
        }
    }

    #[test]
    fn pool_round_trips_by_name() {
        let mut pool = DescriptorPool::new();
        pool.insert(MessageDescriptor {
            full_name: "pkg.Thing".to_string(),
            fields: vec![int_field(1, "id")],
            options: MessageOptions::default(),
        });
        let found = pool.get("pkg.Thing").unwrap();
        assert_eq!(found.fields.len(), 1);
        assert!(pool.get("pkg.Missing").is_none());
    }

    #[test]
    fn field_by_number_finds_match() {
        let descriptor = MessageDescriptor {
            full_name: "pkg.Thing".to_string(),
            fields: vec![int_field(1, "id"), int_field(2, "other")],
            options: MessageOptions::default(),
        };
        assert_eq!(descriptor.field_by_number(2).unwrap().name, "other");
        assert!(descriptor.field_by_number(9).is_none());
    }
}
