//! SQL emission: turns a resolved [`crate::organizer::BuilderClause`]
//! tree into PostgreSQL text.

pub mod ident;
pub mod postgres;

pub use postgres::{join_queries, PostgresBuilder};
