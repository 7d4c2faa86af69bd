//! The flat wire encoding for a [`Query`](crate::ir::Query): every clause
//! tree is flattened, post-order, into an index-addressed record list so
//! a transport layer can serialize/deserialize it without recursive
//! pointer structure. Encoding and decoding round-trip to a structurally
//! identical `Query` — this is the bijection guarantee spec.md §8 calls
//! out as a universal property.

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeValue};
use crate::error::{OrmError, OrmResult};
use crate::ir::{Clause, ColumnKind, DeleteClause, ExprOp, InsertClause, Query, SelectClause, UpdateClause};
use crate::path::Path;

/// Flat, serializable counterpart to [`AttributeValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValueRecord {
    Bool(bool),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Message(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub path: Vec<u32>,
    pub value: AttributeValueRecord,
}

/// One flattened node. Cross-references to other nodes are indices into
/// the enclosing [`WireQuery::clauses`], always pointing at an
/// already-encoded (i.e. strictly earlier) entry, since encoding is
/// post-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClauseRecord {
    String(String),
    Int(i32),
    Float(f64),
    Bool(bool),
    All,
    Default,
    Column { path: Vec<u32>, excluded: bool },
    Expression { op: String, operands: Vec<u32> },
    Select {
        table_num: u32,
        selectors: Vec<u32>,
        where_clause: Option<u32>,
        group_by: Option<u32>,
        having: Option<u32>,
        order_by: Option<u32>,
        limit: Option<u32>,
    },
    Insert {
        table_num: u32,
        subrequests: Vec<Vec<AttributeRecord>>,
        update_if_exists: bool,
    },
    Update {
        table_num: u32,
        updates: Vec<Vec<AttributeRecord>>,
    },
    Delete {
        table_num: u32,
        where_clause: Option<u32>,
    },
    Truncate { table_num: u32 },
    StartTransaction { read_only: bool },
    CommitTransaction,
    RollbackTransaction,
}

/// The flat wire envelope: every clause reachable from the original
/// `Query`, plus the indices of its top-level clauses in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireQuery {
    pub clauses: Vec<ClauseRecord>,
    pub start_points: Vec<u32>,
}

fn push(records: &mut Vec<ClauseRecord>, record: ClauseRecord) -> u32 {
    records.push(record);
    (records.len() - 1) as u32
}

fn encode_attribute(attribute: &Attribute) -> AttributeRecord {
    let value = match &attribute.value {
        AttributeValue::Bool(v) => AttributeValueRecord::Bool(*v),
        AttributeValue::U32(v) => AttributeValueRecord::U32(*v),
        AttributeValue::I32(v) => AttributeValueRecord::I32(*v),
        AttributeValue::U64(v) => AttributeValueRecord::U64(*v),
        AttributeValue::I64(v) => AttributeValueRecord::I64(*v),
        AttributeValue::F32(v) => AttributeValueRecord::F32(*v),
        AttributeValue::F64(v) => AttributeValueRecord::F64(*v),
        AttributeValue::String(v) => AttributeValueRecord::String(v.clone()),
        AttributeValue::Message(v) => AttributeValueRecord::Message(v.clone()),
    };
    AttributeRecord {
        path: attribute.path.numbers().to_vec(),
        value,
    }
}

fn decode_attribute(record: &AttributeRecord) -> Attribute {
    let value = match &record.value {
        AttributeValueRecord::Bool(v) => AttributeValue::Bool(*v),
        AttributeValueRecord::U32(v) => AttributeValue::U32(*v),
        AttributeValueRecord::I32(v) => AttributeValue::I32(*v),
        AttributeValueRecord::U64(v) => AttributeValue::U64(*v),
        AttributeValueRecord::I64(v) => AttributeValue::I64(*v),
        AttributeValueRecord::F32(v) => AttributeValue::F32(*v),
        AttributeValueRecord::F64(v) => AttributeValue::F64(*v),
        AttributeValueRecord::String(v) => AttributeValue::String(v.clone()),
        AttributeValueRecord::Message(v) => AttributeValue::Message(v.clone()),
    };
    Attribute::new(Path::from_numbers(record.path.clone()), value)
}

fn encode_clause(clause: &Clause, records: &mut Vec<ClauseRecord>) -> u32 {
    match clause {
        Clause::String(s) => push(records, ClauseRecord::String(s.clone())),
        Clause::Int(i) => push(records, ClauseRecord::Int(*i)),
        Clause::Float(f) => push(records, ClauseRecord::Float(*f)),
        Clause::Bool(b) => push(records, ClauseRecord::Bool(*b)),
        Clause::All => push(records, ClauseRecord::All),
        Clause::Default => push(records, ClauseRecord::Default),
        Clause::Column { path, kind } => push(
            records,
            ClauseRecord::Column {
                path: path.numbers().to_vec(),
                excluded: matches!(kind, ColumnKind::Excluded),
            },
        ),
        Clause::Expression { op, operands } => {
            let operand_indices: Vec<u32> = operands.iter().map(|o| encode_clause(o, records)).collect();
            push(
                records,
                ClauseRecord::Expression {
                    op: op.name().to_string(),
                    operands: operand_indices,
                },
            )
        }
        Clause::Select(select) => {
            let selectors = select.selectors.iter().map(|c| encode_clause(c, records)).collect();
            let where_clause = select.where_clause.as_ref().map(|c| encode_clause(c, records));
            let group_by = select.group_by.as_ref().map(|c| encode_clause(c, records));
            let having = select.having.as_ref().map(|c| encode_clause(c, records));
            let order_by = select.order_by.as_ref().map(|c| encode_clause(c, records));
            let limit = select.limit.as_ref().map(|c| encode_clause(c, records));
            push(
                records,
                ClauseRecord::Select {
                    table_num: select.table_num,
                    selectors,
                    where_clause,
                    group_by,
                    having,
                    order_by,
                    limit,
                },
            )
        }
        Clause::Insert(insert) => {
            let subrequests = insert
                .subrequests
                .iter()
                .map(|attrs| attrs.iter().map(encode_attribute).collect())
                .collect();
            push(
                records,
                ClauseRecord::Insert {
                    table_num: insert.table_num,
                    subrequests,
                    update_if_exists: insert.update_if_exists,
                },
            )
        }
        Clause::Update(update) => {
            let updates = update
                .updates
                .iter()
                .map(|attrs| attrs.iter().map(encode_attribute).collect())
                .collect();
            push(
                records,
                ClauseRecord::Update {
                    table_num: update.table_num,
                    updates,
                },
            )
        }
        Clause::Delete(delete) => {
            let where_clause = delete.where_clause.as_ref().map(|c| encode_clause(c, records));
            push(
                records,
                ClauseRecord::Delete {
                    table_num: delete.table_num,
                    where_clause,
                },
            )
        }
        Clause::Truncate { table_num } => push(records, ClauseRecord::Truncate { table_num: *table_num }),
        Clause::StartTransaction { read_only } => push(
            records,
            ClauseRecord::StartTransaction { read_only: *read_only },
        ),
        Clause::CommitTransaction => push(records, ClauseRecord::CommitTransaction),
        Clause::RollbackTransaction => push(records, ClauseRecord::RollbackTransaction),
    }
}

/// Flatten a [`Query`] into its wire envelope.
pub fn encode(query: &Query) -> WireQuery {
    let mut clauses = Vec::new();
    let start_points = query
        .clauses
        .iter()
        .map(|clause| encode_clause(clause, &mut clauses))
        .collect();
    WireQuery { clauses, start_points }
}

fn get_record(records: &[ClauseRecord], index: u32) -> OrmResult<&ClauseRecord> {
    records
        .get(index as usize)
        .ok_or_else(|| OrmError::malformed(format!("operand index {index} out of range (have {})", records.len())))
}

fn decode_optional(records: &[ClauseRecord], index: Option<u32>) -> OrmResult<Option<Clause>> {
    index.map(|i| decode_at(records, i)).transpose()
}

fn decode_at(records: &[ClauseRecord], index: u32) -> OrmResult<Clause> {
    match get_record(records, index)? {
        ClauseRecord::String(s) => Ok(Clause::String(s.clone())),
        ClauseRecord::Int(i) => Ok(Clause::Int(*i)),
        ClauseRecord::Float(f) => Ok(Clause::Float(*f)),
        ClauseRecord::Bool(b) => Ok(Clause::Bool(*b)),
        ClauseRecord::All => Ok(Clause::All),
        ClauseRecord::Default => Ok(Clause::Default),
        ClauseRecord::Column { path, excluded } => Ok(Clause::Column {
            path: Path::from_numbers(path.clone()),
            kind: if *excluded { ColumnKind::Excluded } else { ColumnKind::Singular },
        }),
        ClauseRecord::Expression { op, operands } => {
            let op = ExprOp::from_name(op).ok_or_else(|| OrmError::UnknownOperator(op.clone()))?;
            let operands = operands
                .iter()
                .map(|&i| decode_at(records, i))
                .collect::<OrmResult<Vec<_>>>()?;
            if !op.arity().contains(operands.len()) {
                return Err(OrmError::invalid_arity(op.name(), op.arity().describe(), operands.len()));
            }
            Ok(Clause::Expression { op, operands })
        }
        ClauseRecord::Select {
            table_num,
            selectors,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        } => {
            let selectors = selectors
                .iter()
                .map(|&i| decode_at(records, i))
                .collect::<OrmResult<Vec<_>>>()?;
            Ok(Clause::Select(Box::new(SelectClause {
                table_num: *table_num,
                selectors,
                where_clause: decode_optional(records, *where_clause)?,
                group_by: decode_optional(records, *group_by)?,
                having: decode_optional(records, *having)?,
                order_by: decode_optional(records, *order_by)?,
                limit: decode_optional(records, *limit)?,
            })))
        }
        ClauseRecord::Insert {
            table_num,
            subrequests,
            update_if_exists,
        } => {
            let subrequests = subrequests
                .iter()
                .map(|attrs| attrs.iter().map(decode_attribute).collect())
                .collect();
            Ok(Clause::Insert(Box::new(InsertClause {
                table_num: *table_num,
                subrequests,
                update_if_exists: *update_if_exists,
            })))
        }
        ClauseRecord::Update { table_num, updates } => {
            let updates = updates
                .iter()
                .map(|attrs| attrs.iter().map(decode_attribute).collect())
                .collect();
            Ok(Clause::Update(Box::new(UpdateClause {
                table_num: *table_num,
                updates,
            })))
        }
        ClauseRecord::Delete { table_num, where_clause } => Ok(Clause::Delete(Box::new(DeleteClause {
            table_num: *table_num,
            where_clause: decode_optional(records, *where_clause)?,
        }))),
        ClauseRecord::Truncate { table_num } => Ok(Clause::Truncate { table_num: *table_num }),
        ClauseRecord::StartTransaction { read_only } => Ok(Clause::StartTransaction { read_only: *read_only }),
        ClauseRecord::CommitTransaction => Ok(Clause::CommitTransaction),
        ClauseRecord::RollbackTransaction => Ok(Clause::RollbackTransaction),
    }
}

/// Reconstruct a [`Query`] from its wire envelope.
///
/// Fails with `MalformedQueryEnvelope` on an out-of-range operand index,
/// an unrecognized operator discriminator, or an operand count that
/// violates the decoded operator's arity contract.
pub fn decode(wire: &WireQuery) -> OrmResult<Query> {
    let clauses = wire
        .start_points
        .iter()
        .map(|&i| decode_at(&wire.clauses, i))
        .collect::<OrmResult<Vec<_>>>()?;
    Ok(Query { clauses })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{self, val};

    #[test]
    fn literal_round_trips() {
        let mut query = Query::new();
        query.add_clause(val(42));
        let wire = encode(&query);
        assert_eq!(decode(&wire).unwrap(), query);
    }

    #[test]
    fn expression_tree_round_trips() {
        let mut query = Query::new();
        query.add_clause(val(1).gt_(val(0)) & val(2).lt_(val(3)));
        let wire = encode(&query);
        assert_eq!(decode(&wire).unwrap(), query);
    }

    #[test]
    fn select_with_optional_clauses_round_trips() {
        let mut query = Query::new();
        query.add_clause(
            ir::Select::new(7)
                .selectors(vec![ir::all()])
                .where_clause(val(1).eq_(val(1)))
                .limit(val(10))
                .build(),
        );
        let wire = encode(&query);
        assert_eq!(decode(&wire).unwrap(), query);
    }

    #[test]
    fn insert_with_attributes_round_trips() {
        let mut query = Query::new();
        query.add_clause(
            ir::Insert::new(3)
                .add_subrequest(vec![Attribute::new(Path::single(1), AttributeValue::from(5i32))])
                .update_if_exists(true)
                .build(),
        );
        let wire = encode(&query);
        assert_eq!(decode(&wire).unwrap(), query);
    }

    #[test]
    fn unknown_operator_name_is_malformed() {
        let wire = WireQuery {
            clauses: vec![
                ClauseRecord::Int(1),
                ClauseRecord::Expression {
                    op: "not_a_real_operator".to_string(),
                    operands: vec![0],
                },
            ],
            start_points: vec![1],
        };
        let err = decode(&wire).unwrap_err();
        assert!(matches!(err, OrmError::UnknownOperator(_)));
    }

    #[test]
    fn out_of_range_operand_index_is_malformed() {
        let wire = WireQuery {
            clauses: vec![ClauseRecord::Expression {
                op: "not_".to_string(),
                operands: vec![99],
            }],
            start_points: vec![0],
        };
        let err = decode(&wire).unwrap_err();
        assert!(matches!(err, OrmError::MalformedQueryEnvelope(_)));
    }

    #[test]
    fn arity_violation_surfaces_on_decode() {
        let wire = WireQuery {
            clauses: vec![
                ClauseRecord::Int(1),
                ClauseRecord::Int(2),
                ClauseRecord::Expression {
                    op: "not_".to_string(),
                    operands: vec![0, 1],
                },
            ],
            start_points: vec![2],
        };
        let err = decode(&wire).unwrap_err();
        assert!(matches!(err, OrmError::InvalidArity { .. }));
    }
}
