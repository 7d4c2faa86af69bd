//! # orm-core
//!
//! Schema registry, query IR, and PostgreSQL SQL builder for an
//! IDL-driven ORM core.
//!
//! ## Pipeline
//!
//! - **`idl`**/**`types`**: descriptor pool and value-type model a
//!   generated schema feeds in.
//! - **`registry`**: resolves a descriptor tree into tables, messages,
//!   and primitive fields, keyed by numeric [`path::Path`].
//! - **`ir`**: the user-facing query algebra (`Clause`, the operator DSL,
//!   fluent `Select`/`Insert`/`Update`/`Delete` builders) and its flat
//!   wire encoding (`ir::codec`).
//! - **`organizer`**: resolves an `ir::Clause` tree against the registry
//!   into `organizer::BuilderClause`, with every path split into a
//!   concrete `(table, field)` pair.
//! - **`builder`**: renders a `BuilderClause` tree to PostgreSQL text.

pub mod attribute;
pub mod builder;
pub mod error;
pub mod idl;
pub mod ir;
pub mod organizer;
pub mod path;
pub mod registry;
pub mod types;
pub mod util;

pub use attribute::{Attribute, AttributeValue};
pub use builder::{join_queries, PostgresBuilder};
pub use error::{OrmError, OrmResult};
pub use ir::{Clause, Query};
pub use organizer::{BuilderClause, Organizer};
pub use path::Path;
pub use registry::{OrmConfig, SchemaRegistry, TableConfig};
