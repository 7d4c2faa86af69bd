//! The schema registry: the single source of truth for all schema
//! objects.
//!
//! Populated by a sequence of [`SchemaRegistry::register_root`] calls
//! (typically at startup), queried during query construction, and fully
//! reset by [`SchemaRegistry::clear`]. Once the population phase is over
//! the registry is read-only and safe for concurrent readers — mutation
//! entry points (`register_root`, `clear`, `set_parent_message`) take an
//! exclusive lock internally, matching the single-writer/multi-reader
//! model in spec.md §5.

pub mod config;
pub mod object;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::idl::DescriptorPool;
use crate::path::Path;
use crate::types::ValueType;

pub use config::{OrmConfig, TableConfig};
pub use object::{MessageInfo, ObjectKind, PrimitiveFieldInfo, TableInfo};

/// Either schema object a registered path may resolve to.
#[derive(Debug, Clone)]
pub enum RegistryObject {
    Message(Arc<MessageInfo>),
    Field(Arc<PrimitiveFieldInfo>),
}

impl RegistryObject {
    pub fn path(&self) -> &Path {
        match self {
            RegistryObject::Message(m) => &m.path,
            RegistryObject::Field(f) => &f.path,
        }
    }
}

#[derive(Default)]
struct Inner {
    messages: HashMap<Path, Arc<MessageInfo>>,
    fields: HashMap<Path, Arc<PrimitiveFieldInfo>>,
    tables: HashMap<Path, Arc<TableInfo>>,
    table_by_number: HashMap<u32, Path>,
    table_by_name: HashMap<String, Path>,
    /// Parent-path → (segment name → segment number), used to resolve
    /// `Path::new_from`-style string fragments.
    name_namespace: HashMap<Path, HashMap<String, u32>>,
    /// Every registered path (root and descendants) → owning root table path.
    parent_table: HashMap<Path, Path>,
    subtree_cache: HashMap<Path, Arc<BTreeMap<Path, Arc<MessageInfo>>>>,
    ancestors_cache: HashMap<Path, Arc<BTreeMap<Path, RegistryObject>>>,
}

/// The schema registry.
pub struct SchemaRegistry {
    pool: DescriptorPool,
    inner: RwLock<Inner>,
}

impl SchemaRegistry {
    pub fn new(pool: DescriptorPool) -> Self {
        Self {
            pool,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a root message from its table configuration.
    ///
    /// Atomic: a failure leaves the registry exactly as it was before the
    /// call.
    pub fn register_root(&self, config: TableConfig) -> OrmResult<()> {
        let descriptor = self
            .pool
            .get(&config.scheme)
            .cloned()
            .ok_or_else(|| OrmError::unknown_schema(config.scheme.clone()))?;

        let mut inner = self.inner.write().expect("registry lock poisoned");

        if inner.table_by_number.contains_key(&config.table_number) {
            return Err(OrmError::duplicate_registration(format!(
                "table number {} already registered",
                config.table_number
            )));
        }
        if inner.table_by_name.contains_key(&config.snake_case) {
            return Err(OrmError::duplicate_registration(format!(
                "table name '{}' already registered",
                config.snake_case
            )));
        }

        debug!(table_number = config.table_number, scheme = %config.scheme, "registering root message");

        let root_path = Path::single(config.table_number);

        let mut walker = Walker {
            pool: &self.pool,
            messages: BTreeMap::new(),
            fields: BTreeMap::new(),
            name_namespace: HashMap::new(),
            parent_table: BTreeMap::new(),
            related_messages: BTreeSet::new(),
            related_fields: Vec::new(),
            related_fields_seen: HashSet::new(),
            primary_key_paths: BTreeSet::new(),
        };
        walker.walk(&root_path, &descriptor, true);

        let root_info = Arc::new(MessageInfo {
            path: root_path.clone(),
            idl_type_name: descriptor.full_name.clone(),
            primitive_fields: walker
                .messages
                .get(&root_path)
                .map(|m| m.primitive_fields.clone())
                .unwrap_or_default(),
            sub_message_fields: walker
                .messages
                .get(&root_path)
                .map(|m| m.sub_message_fields.clone())
                .unwrap_or_default(),
            root: Some(config.clone()),
            primary_key_paths: walker.primary_key_paths.clone(),
        });

        let table_info = Arc::new(TableInfo {
            path: root_path.clone(),
            config: config.clone(),
            related_messages: walker.related_messages,
            related_fields: walker.related_fields,
            primary_key_paths: walker.primary_key_paths,
        });

        // Commit: at this point nothing can fail, so the registry stays
        // atomic with respect to the caller.
        inner
            .name_namespace
            .entry(Path::new())
            .or_default()
            .insert(config.snake_case.clone(), config.table_number);

        for (path, info) in walker.messages {
            if path == root_path {
                inner.messages.insert(path, root_info.clone());
            } else {
                inner.messages.insert(path, Arc::new(info));
            }
        }
        for (path, info) in walker.fields {
            inner.fields.insert(path, Arc::new(info));
        }
        for (path, names) in walker.name_namespace {
            inner.name_namespace.entry(path).or_default().extend(names);
        }
        for (path, _) in walker.parent_table {
            inner.parent_table.insert(path, root_path.clone());
        }
        inner.parent_table.insert(root_path.clone(), root_path.clone());

        inner.tables.insert(root_path.clone(), table_info);
        inner.table_by_number.insert(config.table_number, root_path.clone());
        inner.table_by_name.insert(config.snake_case.clone(), root_path);

        inner.subtree_cache.clear();
        inner.ancestors_cache.clear();

        Ok(())
    }

    /// Resolve a `/`-separated string of registered names into a [`Path`],
    /// starting at the empty-path namespace.
    pub fn resolve_path(&self, name: &str) -> OrmResult<Path> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut path = Path::new();
        for segment in name.split('/').filter(|s| !s.is_empty()) {
            let number = inner
                .name_namespace
                .get(&path)
                .and_then(|ns| ns.get(segment))
                .copied()
                .ok_or_else(|| OrmError::UnknownPathSegment {
                    prefix: path.to_string(),
                    segment: segment.to_string(),
                })?;
            path = path.join_number(number);
        }
        Ok(path)
    }

    pub fn get_message(&self, path: &Path) -> Option<Arc<MessageInfo>> {
        self.inner.read().expect("registry lock poisoned").messages.get(path).cloned()
    }

    pub fn get_root_message(&self, path: &Path) -> Option<Arc<MessageInfo>> {
        self.get_message(path).filter(|m| m.is_root())
    }

    pub fn get_primitive_field(&self, path: &Path) -> Option<Arc<PrimitiveFieldInfo>> {
        self.inner.read().expect("registry lock poisoned").fields.get(path).cloned()
    }

    /// Alias for [`SchemaRegistry::get_primitive_field`], matching the
    /// original's shorter name.
    pub fn get_field(&self, path: &Path) -> Option<Arc<PrimitiveFieldInfo>> {
        self.get_primitive_field(path)
    }

    pub fn get_object(&self, path: &Path) -> Option<RegistryObject> {
        let inner = self.inner.read().expect("registry lock poisoned");
        if let Some(m) = inner.messages.get(path) {
            return Some(RegistryObject::Message(m.clone()));
        }
        inner.fields.get(path).cloned().map(RegistryObject::Field)
    }

    pub fn get_object_type(&self, path: &Path) -> ObjectKind {
        let inner = self.inner.read().expect("registry lock poisoned");
        if let Some(m) = inner.messages.get(path) {
            return if m.is_root() {
                ObjectKind::ROOT_MESSAGE
            } else {
                ObjectKind::FIELD_MESSAGE
            };
        }
        if inner.fields.contains_key(path) {
            return ObjectKind::PRIMITIVE_FIELD;
        }
        ObjectKind::NONE
    }

    pub fn get_parent_table(&self, path: &Path) -> OrmResult<Arc<TableInfo>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let root = inner
            .parent_table
            .get(path)
            .ok_or_else(|| OrmError::unknown_path(path))?;
        inner
            .tables
            .get(root)
            .cloned()
            .ok_or_else(|| OrmError::unknown_path(path))
    }

    /// Every registered message whose path equals or descends from
    /// `root_path`, cached until the next `clear`.
    pub fn get_messages_from_subtree(&self, root_path: &Path) -> OrmResult<Arc<BTreeMap<Path, Arc<MessageInfo>>>> {
        {
            let inner = self.inner.read().expect("registry lock poisoned");
            if let Some(cached) = inner.subtree_cache.get(root_path) {
                return Ok(cached.clone());
            }
        }

        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(cached) = inner.subtree_cache.get(root_path) {
            return Ok(cached.clone());
        }

        if !inner.messages.contains_key(root_path) {
            return Err(OrmError::unknown_path(root_path));
        }

        let result: BTreeMap<Path, Arc<MessageInfo>> = inner
            .messages
            .iter()
            .filter(|(p, _)| *p == root_path || root_path.is_ancestor_of(p))
            .map(|(p, m)| (p.clone(), m.clone()))
            .collect();

        let result = Arc::new(result);
        inner.subtree_cache.insert(root_path.clone(), result.clone());
        Ok(result)
    }

    /// `path` and every registered ancestor of `path`, cached until the
    /// next `clear` (or, in a fuller implementation, any parent-pointer
    /// mutation — the CORE never mutates parent pointers after
    /// `register_root` commits, so `clear` is the only invalidation
    /// point here).
    pub fn get_object_with_ancestors(&self, path: &Path) -> OrmResult<Arc<BTreeMap<Path, RegistryObject>>> {
        {
            let inner = self.inner.read().expect("registry lock poisoned");
            if let Some(cached) = inner.ancestors_cache.get(path) {
                return Ok(cached.clone());
            }
        }

        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(cached) = inner.ancestors_cache.get(path) {
            return Ok(cached.clone());
        }

        let mut result = BTreeMap::new();
        let mut current = path.clone();
        loop {
            let object = inner
                .messages
                .get(&current)
                .map(|m| RegistryObject::Message(m.clone()))
                .or_else(|| inner.fields.get(&current).map(|f| RegistryObject::Field(f.clone())));
            match object {
                Some(obj) => {
                    result.insert(current.clone(), obj);
                }
                None if current == *path => return Err(OrmError::unknown_path(path)),
                None => break,
            }
            if current.is_empty() {
                break;
            }
            current = current.parent();
        }

        let result = Arc::new(result);
        inner.ancestors_cache.insert(path.clone(), result.clone());
        Ok(result)
    }

    /// Drop all registered state. Must not overlap with any reader.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        *inner = Inner::default();
    }
}

/// Accumulates the results of one `register_root` descriptor walk.
struct Walker<'a> {
    pool: &'a DescriptorPool,
    messages: BTreeMap<Path, MessageInfo>,
    fields: BTreeMap<Path, PrimitiveFieldInfo>,
    name_namespace: HashMap<Path, HashMap<String, u32>>,
    parent_table: BTreeMap<Path, ()>,
    related_messages: BTreeSet<Path>,
    /// Registration order, deduped against `related_fields_seen`.
    related_fields: Vec<Path>,
    related_fields_seen: HashSet<Path>,
    primary_key_paths: BTreeSet<Path>,
}

impl<'a> Walker<'a> {
    /// Walk one message descriptor at `path`. `contributes_to_table` is
    /// false once we have descended through a repeated/map field — those
    /// children belong to an out-of-scope child table and must not widen
    /// the root's `related_fields`/`related_messages`.
    fn walk(&mut self, path: &Path, descriptor: &crate::idl::MessageDescriptor, contributes_to_table: bool) {
        let mut primitive_fields = Vec::new();
        let mut sub_message_fields = BTreeSet::new();

        for field in &descriptor.fields {
            let field_path = path.join_number(field.number);
            self.name_namespace
                .entry(path.clone())
                .or_default()
                .insert(field.name.clone(), field.number);
            self.parent_table.insert(field_path.clone(), ());

            let field_contributes = contributes_to_table && !field.is_repeated && !field.is_map;

            if field.kind.is_message() {
                sub_message_fields.insert(field_path.clone());
                if field_contributes {
                    self.related_messages.insert(field_path.clone());
                }
                let nested = field
                    .message_type
                    .as_deref()
                    .and_then(|name| self.pool.get(name))
                    .cloned();
                self.messages.insert(
                    field_path.clone(),
                    MessageInfo {
                        path: field_path.clone(),
                        idl_type_name: field.message_type.clone().unwrap_or_default(),
                        primitive_fields: Vec::new(),
                        sub_message_fields: BTreeSet::new(),
                        root: None,
                        primary_key_paths: BTreeSet::new(),
                    },
                );
                if let Some(nested) = nested {
                    // Still walked so every path resolves, but
                    // `field_contributes` carries `false` down forever
                    // once we cross a repeated/map field — those
                    // descendants belong to an out-of-scope child table
                    // and must never widen the root's related sets.
                    self.walk(&field_path, &nested, field_contributes);
                }
            } else {
                primitive_fields.push(field_path.clone());
                if field_contributes && self.related_fields_seen.insert(field_path.clone()) {
                    self.related_fields.push(field_path.clone());
                }
                let value_type = decode_value_type(field);
                if field.primary_key {
                    self.primary_key_paths.insert(field_path.clone());
                }
                self.fields.insert(
                    field_path.clone(),
                    PrimitiveFieldInfo {
                        number: field.number,
                        name: field.name.clone(),
                        path: field_path,
                        value_type,
                        is_required: !field.is_optional && !field.has_presence,
                        is_primary_key: field.primary_key,
                        has_explicit_default: field.explicit_default,
                    },
                );
            }
        }

        self.messages.insert(
            path.clone(),
            MessageInfo {
                path: path.clone(),
                idl_type_name: descriptor.full_name.clone(),
                primitive_fields,
                sub_message_fields,
                root: None,
                primary_key_paths: BTreeSet::new(),
            },
        );
    }
}

fn decode_value_type(field: &crate::idl::FieldDescriptor) -> ValueType {
    field.value_type.clone().unwrap_or(ValueType::Monostate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::{FieldDescriptor, FieldKind, MessageDescriptor, MessageOptions};

    fn simple_message_pool() -> DescriptorPool {
        let mut pool = DescriptorPool::new();
        pool.insert(MessageDescriptor {
            full_name: "test.SimpleMessage".to_string(),
            fields: vec![
                FieldDescriptor {
                    number: 1,
                    name: "id".to_string(),
                    kind: FieldKind::Int32,
                    is_map: false,
                    is_repeated: false,
                    is_optional: false,
                    has_presence: false,
                    containing_oneof: None,
                    message_type: None,
                    enum_type: None,
                    primary_key: true,
                    value_type: Some(ValueType::Int32 {
                        default: 0,
                        increment: false,
                    }),
                    explicit_default: false,
                },
                FieldDescriptor {
                    number: 2,
                    name: "name".to_string(),
                    kind: FieldKind::String,
                    is_map: false,
                    is_repeated: false,
                    is_optional: false,
                    has_presence: false,
                    containing_oneof: None,
                    message_type: None,
                    enum_type: None,
                    primary_key: false,
                    value_type: Some(ValueType::String {
                        default: String::new(),
                    }),
                    explicit_default: false,
                },
                FieldDescriptor {
                    number: 3,
                    name: "active".to_string(),
                    kind: FieldKind::Bool,
                    is_map: false,
                    is_repeated: false,
                    is_optional: false,
                    has_presence: false,
                    containing_oneof: None,
                    message_type: None,
                    enum_type: None,
                    primary_key: false,
                    value_type: Some(ValueType::Bool { default: true }),
                    explicit_default: true,
                },
            ],
            options: MessageOptions::default(),
        });
        pool
    }

    #[test]
    fn register_root_populates_table() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();

        let table = registry.get_parent_table(&Path::from_numbers(vec![1, 1])).unwrap();
        assert_eq!(table.path, Path::single(1));
        assert_eq!(table.related_fields.len(), 3);
        assert_eq!(table.primary_key_paths.len(), 1);
        assert!(table.primary_key_paths.contains(&Path::from_numbers(vec![1, 1])));
    }

    #[test]
    fn every_primitive_path_maps_back_to_its_root() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();

        for field_number in 1..=3u32 {
            let path = Path::from_numbers(vec![1, field_number]);
            let table = registry.get_parent_table(&path).unwrap();
            assert_eq!(table.path, Path::single(1));
        }
    }

    #[test]
    fn object_type_union_is_exhaustive_and_disjoint() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();

        assert_eq!(registry.get_object_type(&Path::single(1)), ObjectKind::ROOT_MESSAGE);
        assert_eq!(
            registry.get_object_type(&Path::from_numbers(vec![1, 1])),
            ObjectKind::PRIMITIVE_FIELD
        );
        assert_eq!(registry.get_object_type(&Path::from_numbers(vec![9, 9])), ObjectKind::NONE);
    }

    #[test]
    fn unknown_schema_errors_without_mutating_registry() {
        let registry = SchemaRegistry::new(DescriptorPool::new());
        let err = registry.register_root(TableConfig::new(1, "missing.Thing")).unwrap_err();
        assert!(matches!(err, OrmError::UnknownSchema(_)));
        assert!(registry.get_message(&Path::single(1)).is_none());
    }

    #[test]
    fn duplicate_table_number_is_rejected() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();
        let err = registry
            .register_root(TableConfig::new(1, "test.SimpleMessage").with_names("other", "other"))
            .unwrap_err();
        assert!(matches!(err, OrmError::DuplicateRegistration(_)));
    }

    #[test]
    fn resolve_path_by_name() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();
        let path = registry.resolve_path("simple_message/name").unwrap();
        assert_eq!(path, Path::from_numbers(vec![1, 2]));
    }

    #[test]
    fn resolve_path_rejects_unknown_segment() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();
        let err = registry.resolve_path("simple_message/bogus").unwrap_err();
        assert!(matches!(err, OrmError::UnknownPathSegment { .. }));
    }

    #[test]
    fn clear_drops_all_state() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();
        registry.clear();
        assert!(registry.get_message(&Path::single(1)).is_none());
        assert!(registry.get_parent_table(&Path::single(1)).is_err());
    }

    #[test]
    fn subtree_and_ancestors_are_cached_consistently() {
        let registry = SchemaRegistry::new(simple_message_pool());
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();

        let subtree = registry.get_messages_from_subtree(&Path::single(1)).unwrap();
        assert_eq!(subtree.len(), 1);

        let ancestors = registry
            .get_object_with_ancestors(&Path::from_numbers(vec![1, 1]))
            .unwrap();
        assert_eq!(ancestors.len(), 2);
        assert!(ancestors.contains_key(&Path::single(1)));
        assert!(ancestors.contains_key(&Path::from_numbers(vec![1, 1])));
    }
}
