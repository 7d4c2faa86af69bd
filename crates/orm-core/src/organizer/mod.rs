//! Translates user-facing [`Clause`] trees into [`BuilderClause`] trees
//! with every path resolved against a [`SchemaRegistry`] into concrete
//! `(table, field)` pairs, grounded on the original implementation's
//! `TSqlQueryOrganizer`.

pub mod builder_ir;

use std::collections::HashMap;

use crate::attribute::AttributeValue;
use crate::error::{OrmError, OrmResult};
use crate::ir::{Clause, ColumnKind, DeleteClause, InsertClause, SelectClause, UpdateClause};
use crate::path::Path;
use crate::registry::{ObjectKind, SchemaRegistry};

pub use builder_ir::{
    AlterColumnChange, AlterOperation, BuilderAlterTable, BuilderClause, BuilderDelete, BuilderInsert, BuilderSelect,
    BuilderUpdate, KeyKind,
};

pub struct Organizer<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Organizer<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Translate a single top-level clause (the organizer's public entry
    /// point — every `Clause` variant is already handled by
    /// `transform_clause`, so this is a thin, documented alias).
    pub fn organize(&self, clause: &Clause) -> OrmResult<BuilderClause> {
        self.transform_clause(clause)
    }

    fn resolve_column(&self, path: &Path, column_kind: ColumnKind) -> OrmResult<BuilderClause> {
        let table = self.registry.get_parent_table(path)?;
        self.registry
            .get_primitive_field(path)
            .ok_or_else(|| OrmError::unknown_path(path))?;
        let (_, field_suffix) = path.split_at_table(table.path.size());
        // Per the organizer's Column rule, every plain column reference
        // resolves with key-kind `Simple`; `Primary` is reserved for the
        // explicit `ON CONFLICT` target columns built in `organize_insert`.
        Ok(BuilderClause::column(table.path.clone(), field_suffix, KeyKind::Simple, column_kind))
    }

    /// A message-valued selector expands into every primitive field
    /// reachable under it along singular sub-message fields only
    /// (registration order), per spec.md §4.5's closing caveat that
    /// repeated/map fields are not expanded; any other selector passes
    /// through `transform_clause` unchanged.
    fn expand_selector(&self, clause: &Clause) -> OrmResult<Vec<BuilderClause>> {
        match clause {
            Clause::Column { path, kind } => {
                if ObjectKind::MESSAGE.contains(self.registry.get_object_type(path)) {
                    let table = self.registry.get_parent_table(path)?;
                    let mut result = Vec::new();
                    for field_path in &table.related_fields {
                        if path.is_ancestor_of(field_path) {
                            result.push(self.resolve_column(field_path, *kind)?);
                        }
                    }
                    Ok(result)
                } else {
                    Ok(vec![self.resolve_column(path, *kind)?])
                }
            }
            other => Ok(vec![self.transform_clause(other)?]),
        }
    }

    fn transform_clause(&self, clause: &Clause) -> OrmResult<BuilderClause> {
        match clause {
            Clause::String(s) => Ok(BuilderClause::String(s.clone())),
            Clause::Int(i) => Ok(BuilderClause::Int(*i)),
            Clause::Float(f) => Ok(BuilderClause::Float(*f)),
            Clause::Bool(b) => Ok(BuilderClause::Bool(*b)),
            Clause::All => Ok(BuilderClause::All),
            Clause::Default => Ok(BuilderClause::Default),
            Clause::Column { path, kind } => self.resolve_column(path, *kind),
            Clause::Expression { op, operands } => {
                let operands = operands
                    .iter()
                    .map(|o| self.transform_clause(o))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(BuilderClause::Expression { op: *op, operands })
            }
            Clause::Select(select) => self.organize_select(select),
            Clause::Insert(insert) => self.organize_insert(insert),
            Clause::Update(update) => self.organize_update(update),
            Clause::Delete(delete) => self.organize_delete(delete),
            Clause::Truncate { table_num } => Ok(BuilderClause::Truncate {
                table: Path::single(*table_num),
            }),
            Clause::StartTransaction { read_only } => Ok(BuilderClause::StartTransaction { read_only: *read_only }),
            Clause::CommitTransaction => Ok(BuilderClause::CommitTransaction),
            Clause::RollbackTransaction => Ok(BuilderClause::RollbackTransaction),
        }
    }

    fn organize_select(&self, select: &SelectClause) -> OrmResult<BuilderClause> {
        let mut selectors = Vec::new();
        for selector in &select.selectors {
            selectors.extend(self.expand_selector(selector)?);
        }
        let where_clause = select.where_clause.as_ref().map(|c| self.transform_clause(c)).transpose()?;
        let group_by = select.group_by.as_ref().map(|c| self.transform_clause(c)).transpose()?;
        let having = select.having.as_ref().map(|c| self.transform_clause(c)).transpose()?;
        let order_by = select.order_by.as_ref().map(|c| self.transform_clause(c)).transpose()?;
        let limit = select.limit.as_ref().map(|c| self.transform_clause(c)).transpose()?;
        Ok(BuilderClause::Select(Box::new(BuilderSelect {
            selectors,
            from: Path::single(select.table_num),
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        })))
    }

    /// INSERT's column-widening algorithm: every subrequest contributes
    /// its attribute paths to a single first-appearance-ordered column
    /// list. A subrequest silent on a path already seen in an earlier
    /// subrequest gets `Default` there; a path first seen in a later
    /// subrequest retroactively widens every earlier row with `Default`.
    fn organize_insert(&self, insert: &InsertClause) -> OrmResult<BuilderClause> {
        let table = Path::single(insert.table_num);

        if insert.subrequests.is_empty() {
            return Ok(BuilderClause::Insert(Box::new(BuilderInsert {
                table,
                columns: Vec::new(),
                values: Vec::new(),
                do_update: None,
                conflict_target: None,
            })));
        }

        let mut path_order: Vec<Path> = Vec::new();
        let mut path_index: HashMap<Path, usize> = HashMap::new();
        let mut rows: Vec<Vec<BuilderClause>> = Vec::new();

        for subrequest in &insert.subrequests {
            let mut row = vec![BuilderClause::Default; path_order.len()];
            for attribute in subrequest {
                let idx = match path_index.get(&attribute.path) {
                    Some(&idx) => idx,
                    None => {
                        let idx = path_order.len();
                        path_order.push(attribute.path.clone());
                        path_index.insert(attribute.path.clone(), idx);
                        for existing_row in rows.iter_mut() {
                            existing_row.push(BuilderClause::Default);
                        }
                        row.push(BuilderClause::Default);
                        idx
                    }
                };
                row[idx] = attribute_value_to_builder_clause(&attribute.value);
            }
            rows.push(row);
        }

        let mut columns = Vec::with_capacity(path_order.len());
        for path in &path_order {
            columns.push(self.resolve_column(path, ColumnKind::Singular)?);
        }

        let (do_update, conflict_target) = if insert.update_if_exists {
            let mut pairs = Vec::with_capacity(columns.len());
            for column in &columns {
                if let BuilderClause::Column { table, field, key_kind, .. } = column {
                    let excluded_column =
                        BuilderClause::column(table.clone(), field.clone(), *key_kind, ColumnKind::Excluded);
                    pairs.push((column.clone(), excluded_column));
                }
            }
            let table_info = self.registry.get_parent_table(&Path::single(insert.table_num))?;
            let target = table_info
                .primary_key_paths
                .iter()
                .map(|path| {
                    let (_, field_suffix) = path.split_at_table(table_info.path.size());
                    BuilderClause::column(table_info.path.clone(), field_suffix, KeyKind::Primary, ColumnKind::Singular)
                })
                .collect();
            (Some(pairs), Some(target))
        } else {
            (None, None)
        };

        Ok(BuilderClause::Insert(Box::new(BuilderInsert {
            table,
            columns,
            values: rows,
            do_update,
            conflict_target,
        })))
    }

    fn organize_update(&self, update: &UpdateClause) -> OrmResult<BuilderClause> {
        let table = Path::single(update.table_num);
        let mut assignments = Vec::new();
        for update_set in &update.updates {
            for attribute in update_set {
                let column = self.resolve_column(&attribute.path, ColumnKind::Singular)?;
                let value = attribute_value_to_builder_clause(&attribute.value);
                assignments.push((column, value));
            }
        }
        Ok(BuilderClause::Update(Box::new(BuilderUpdate { table, assignments })))
    }

    fn organize_delete(&self, delete: &DeleteClause) -> OrmResult<BuilderClause> {
        let where_clause = delete.where_clause.as_ref().map(|c| self.transform_clause(c)).transpose()?;
        Ok(BuilderClause::Delete(Box::new(BuilderDelete {
            table: Path::single(delete.table_num),
            where_clause,
        })))
    }

    pub fn create_table(&self, table_num: u32) -> OrmResult<BuilderClause> {
        let table = self.registry.get_parent_table(&Path::single(table_num))?;
        Ok(BuilderClause::CreateTable(table))
    }

    pub fn delete_table(&self, table_num: u32) -> OrmResult<BuilderClause> {
        let table = self.registry.get_parent_table(&Path::single(table_num))?;
        Ok(BuilderClause::DropTable(table))
    }

    /// Resolves the owning table for an `ALTER TABLE` without touching the
    /// individual operations, which are already expressed in resolved
    /// `BuilderClause`-space by the caller (schema migrations are written
    /// directly against tables, not against the user-facing `Clause` IR).
    pub fn alter_table(&self, table_num: u32, operations: Vec<AlterOperation>) -> OrmResult<BuilderClause> {
        let table = self.registry.get_parent_table(&Path::single(table_num))?;
        Ok(BuilderClause::AlterTable(Box::new(BuilderAlterTable {
            table: table.path.clone(),
            operations,
        })))
    }
}

/// `uint64`/`int64` attribute values render through a string literal
/// rather than an integer one — carried over verbatim from the original
/// implementation, which sidesteps precision loss in the wider pipeline
/// an attribute value travels through before reaching here.
fn attribute_value_to_builder_clause(value: &AttributeValue) -> BuilderClause {
    match value {
        AttributeValue::Bool(b) => BuilderClause::Bool(*b),
        AttributeValue::U32(v) => BuilderClause::Int(*v as i32),
        AttributeValue::I32(v) => BuilderClause::Int(*v),
        AttributeValue::U64(v) => BuilderClause::String(v.to_string()),
        AttributeValue::I64(v) => BuilderClause::String(v.to_string()),
        AttributeValue::F32(v) => BuilderClause::Float(*v as f64),
        AttributeValue::F64(v) => BuilderClause::Float(*v),
        AttributeValue::String(s) => BuilderClause::String(s.clone()),
        AttributeValue::Message(_) => BuilderClause::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::idl::{DescriptorPool, FieldDescriptor, FieldKind, MessageDescriptor, MessageOptions};
    use crate::ir::{self, val};
    use crate::registry::TableConfig;
    use crate::types::ValueType;

    fn simple_message_registry() -> SchemaRegistry {
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
                        increment: true,
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
                    value_type: Some(ValueType::String { default: String::new() }),
                    explicit_default: false,
                },
                FieldDescriptor {
                    number: 3,
                    name: "age".to_string(),
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
                },
            ],
            options: MessageOptions::default(),
        });
        let registry = SchemaRegistry::new(pool);
        registry
            .register_root(TableConfig::new(1, "test.SimpleMessage"))
            .unwrap();
        registry
    }

    #[test]
    fn select_expands_all_selector_and_resolves_where() {
        let registry = simple_message_registry();
        let organizer = Organizer::new(&registry);

        let query = ir::Select::new(1)
            .selectors(vec![ir::col(Path::from_numbers(vec![1, 2]))])
            .where_clause(ir::col(Path::from_numbers(vec![1, 1])).gt_(val(0)))
            .build();

        let organized = organizer.organize(&query).unwrap();
        match organized {
            BuilderClause::Select(select) => {
                assert_eq!(select.selectors.len(), 1);
                match &select.selectors[0] {
                    BuilderClause::Column { table, field, key_kind, .. } => {
                        assert_eq!(*table, Path::single(1));
                        assert_eq!(*field, Path::from_numbers(vec![2]));
                        assert_eq!(*key_kind, KeyKind::Simple);
                    }
                    other => panic!("expected a column, got {other:?}"),
                }
                assert!(select.where_clause.is_some());
            }
            other => panic!("expected a Select, got {other:?}"),
        }
    }

    /// `Parent`: `id: int32 [primary_key]` (1), `child: Child` (2, singular),
    /// `items: repeated Item` (3). `Child`: `x: int32` (1), `y: int32` (2).
    /// `Item`: `v: int32` (1).
    fn nested_message_registry() -> SchemaRegistry {
        let mut pool = DescriptorPool::new();
        pool.insert(MessageDescriptor {
            full_name: "test.Child".to_string(),
            fields: vec![
                FieldDescriptor {
                    number: 1,
                    name: "x".to_string(),
                    kind: FieldKind::Int32,
                    is_map: false,
                    is_repeated: false,
                    is_optional: false,
                    has_presence: false,
                    containing_oneof: None,
                    message_type: None,
                    enum_type: None,
                    primary_key: false,
                    value_type: Some(ValueType::Int32 { default: 0, increment: false }),
                    explicit_default: false,
                },
                FieldDescriptor {
                    number: 2,
                    name: "y".to_string(),
                    kind: FieldKind::Int32,
                    is_map: false,
                    is_repeated: false,
                    is_optional: false,
                    has_presence: false,
                    containing_oneof: None,
                    message_type: None,
                    enum_type: None,
                    primary_key: false,
                    value_type: Some(ValueType::Int32 { default: 0, increment: false }),
                    explicit_default: false,
                },
            ],
            options: MessageOptions::default(),
        });
        pool.insert(MessageDescriptor {
            full_name: "test.Item".to_string(),
            fields: vec![FieldDescriptor {
                number: 1,
                name: "v".to_string(),
                kind: FieldKind::Int32,
                is_map: false,
                is_repeated: false,
                is_optional: false,
                has_presence: false,
                containing_oneof: None,
                message_type: None,
                enum_type: None,
                primary_key: false,
                value_type: Some(ValueType::Int32 { default: 0, increment: false }),
                explicit_default: false,
            }],
            options: MessageOptions::default(),
        });
        pool.insert(MessageDescriptor {
            full_name: "test.Parent".to_string(),
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
                    value_type: Some(ValueType::Int32 { default: 0, increment: true }),
                    explicit_default: false,
                },
                FieldDescriptor {
                    number: 2,
                    name: "child".to_string(),
                    kind: FieldKind::Message,
                    is_map: false,
                    is_repeated: false,
                    is_optional: false,
                    has_presence: false,
                    containing_oneof: None,
                    message_type: Some("test.Child".to_string()),
                    enum_type: None,
                    primary_key: false,
                    value_type: None,
                    explicit_default: false,
                },
                FieldDescriptor {
                    number: 3,
                    name: "items".to_string(),
                    kind: FieldKind::Message,
                    is_map: false,
                    is_repeated: true,
                    is_optional: false,
                    has_presence: false,
                    containing_oneof: None,
                    message_type: Some("test.Item".to_string()),
                    enum_type: None,
                    primary_key: false,
                    value_type: None,
                    explicit_default: false,
                },
            ],
            options: MessageOptions::default(),
        });
        let registry = SchemaRegistry::new(pool);
        registry
            .register_root(TableConfig::new(1, "test.Parent"))
            .unwrap();
        registry
    }

    #[test]
    fn message_valued_selector_expands_to_its_singular_primitive_fields() {
        let registry = nested_message_registry();
        let organizer = Organizer::new(&registry);

        let query = ir::Select::new(1)
            .selectors(vec![ir::col(Path::from_numbers(vec![1, 2]))])
            .build();

        let organized = organizer.organize(&query).unwrap();
        match organized {
            BuilderClause::Select(select) => {
                let fields: Vec<Path> = select
                    .selectors
                    .iter()
                    .map(|s| match s {
                        BuilderClause::Column { field, .. } => field.clone(),
                        other => panic!("expected a column, got {other:?}"),
                    })
                    .collect();
                assert_eq!(fields, vec![Path::from_numbers(vec![2, 1]), Path::from_numbers(vec![2, 2])]);
            }
            other => panic!("expected a Select, got {other:?}"),
        }
    }

    #[test]
    fn table_valued_selector_expands_to_singular_fields_only_skipping_repeated() {
        let registry = nested_message_registry();
        let organizer = Organizer::new(&registry);

        let query = ir::Select::new(1)
            .selectors(vec![ir::col(Path::single(1))])
            .build();

        let organized = organizer.organize(&query).unwrap();
        match organized {
            BuilderClause::Select(select) => {
                let fields: Vec<Path> = select
                    .selectors
                    .iter()
                    .map(|s| match s {
                        BuilderClause::Column { field, .. } => field.clone(),
                        other => panic!("expected a column, got {other:?}"),
                    })
                    .collect();
                // `id`, then `child.x`/`child.y` in declaration order; the
                // repeated `items` field never widens the expansion.
                assert_eq!(
                    fields,
                    vec![
                        Path::from_numbers(vec![1]),
                        Path::from_numbers(vec![2, 1]),
                        Path::from_numbers(vec![2, 2]),
                    ]
                );
            }
            other => panic!("expected a Select, got {other:?}"),
        }
    }

    #[test]
    fn insert_widens_columns_across_subrequests() {
        let registry = simple_message_registry();
        let organizer = Organizer::new(&registry);

        let query = ir::Insert::new(1)
            .add_subrequest(vec![Attribute::new(
                Path::from_numbers(vec![1, 2]),
                AttributeValue::from("alice"),
            )])
            .add_subrequest(vec![
                Attribute::new(Path::from_numbers(vec![1, 2]), AttributeValue::from("bob")),
                Attribute::new(Path::from_numbers(vec![1, 3]), AttributeValue::from(30i32)),
            ])
            .build();

        let organized = organizer.organize(&query).unwrap();
        match organized {
            BuilderClause::Insert(insert) => {
                assert_eq!(insert.columns.len(), 2);
                assert_eq!(insert.values.len(), 2);
                assert_eq!(insert.values[0].len(), 2);
                assert_eq!(insert.values[0][1], BuilderClause::Default);
                assert_eq!(insert.values[1][1], BuilderClause::Int(30));
                assert!(insert.do_update.is_none());
            }
            other => panic!("expected an Insert, got {other:?}"),
        }
    }

    #[test]
    fn insert_with_update_if_exists_pairs_excluded_columns() {
        let registry = simple_message_registry();
        let organizer = Organizer::new(&registry);

        let query = ir::Insert::new(1)
            .add_subrequest(vec![Attribute::new(
                Path::from_numbers(vec![1, 2]),
                AttributeValue::from("alice"),
            )])
            .update_if_exists(true)
            .build();

        let organized = organizer.organize(&query).unwrap();
        match organized {
            BuilderClause::Insert(insert) => {
                let pairs = insert.do_update.unwrap();
                assert_eq!(pairs.len(), 1);
                match &pairs[0].1 {
                    BuilderClause::Column { column_kind, .. } => assert_eq!(*column_kind, ColumnKind::Excluded),
                    other => panic!("expected a column, got {other:?}"),
                }
            }
            other => panic!("expected an Insert, got {other:?}"),
        }
    }

    #[test]
    fn update_flattens_attribute_pairs() {
        let registry = simple_message_registry();
        let organizer = Organizer::new(&registry);

        let query = ir::Update::new(1)
            .add_update(vec![Attribute::new(
                Path::from_numbers(vec![1, 3]),
                AttributeValue::from(31i32),
            )])
            .build();

        let organized = organizer.organize(&query).unwrap();
        match organized {
            BuilderClause::Update(update) => {
                assert_eq!(update.assignments.len(), 1);
                assert_eq!(update.assignments[0].1, BuilderClause::Int(31));
            }
            other => panic!("expected an Update, got {other:?}"),
        }
    }

    #[test]
    fn uint64_attribute_renders_as_string() {
        let registry = simple_message_registry();
        let organizer = Organizer::new(&registry);
        let query = ir::Update::new(1)
            .add_update(vec![Attribute::new(
                Path::from_numbers(vec![1, 3]),
                AttributeValue::from(9_999_999_999u64),
            )])
            .build();
        let organized = organizer.organize(&query).unwrap();
        match organized {
            BuilderClause::Update(update) => {
                assert_eq!(update.assignments[0].1, BuilderClause::String("9999999999".to_string()));
            }
            other => panic!("expected an Update, got {other:?}"),
        }
    }

    #[test]
    fn create_and_delete_table_resolve_registered_table() {
        let registry = simple_message_registry();
        let organizer = Organizer::new(&registry);
        assert!(matches!(organizer.create_table(1).unwrap(), BuilderClause::CreateTable(_)));
        assert!(matches!(organizer.delete_table(1).unwrap(), BuilderClause::DropTable(_)));
        assert!(organizer.create_table(99).is_err());
    }
}
