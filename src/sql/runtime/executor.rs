use derive_more::From;
use rusqlite::Connection;
use serde::Serialize;

use crate::core::{RowSet, SQLError, Tuple};

/// What executing one statement produced.
#[derive(Debug, Clone, PartialEq, From, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// Every row returned by a query.
    Rows(RowSet),
    /// A statement executed for its effect.
    Mutation(MutationOutcome),
}

impl Outcome {
    /// Rows of a query outcome; mutations carry none.
    pub fn rows(&self) -> &[Tuple] {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Mutation(_) => &[],
        }
    }

    pub fn into_rows(self) -> RowSet {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Mutation(_) => RowSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    #[serde(rename = "success")]
    pub succeeded: bool,
    pub changes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationOutcome {
    pub fn succeeded(changes: u64) -> Self {
        Self {
            succeeded: true,
            changes,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            changes: 0,
            error: Some(error.into()),
        }
    }
}

/// Column names plus rows, in select order.
#[derive(Debug, Clone, Default)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: RowSet,
}

/// Runs a query and collects every row, keyed by column name.
pub fn query(conn: &Connection, statement: &str) -> Result<QueryRows, SQLError> {
    let mut stmt = conn.prepare(statement).map_err(SQLError::execution)?;
    let columns = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let mut rows = stmt.query([]).map_err(SQLError::execution)?;
    let mut result = RowSet::new();
    while let Some(row) = rows.next().map_err(SQLError::execution)? {
        let mut tuple = Tuple::new_default();
        for (index, column) in columns.iter().enumerate() {
            let value = row.get_ref(index).map_err(SQLError::execution)?;
            tuple.insert(column.clone(), value.into());
        }
        result.push(tuple);
    }
    Ok(QueryRows {
        columns,
        rows: result,
    })
}

/// Runs a statement for its effect. Any rows it yields are stepped through
/// and discarded.
pub fn execute(conn: &Connection, statement: &str) -> Result<MutationOutcome, SQLError> {
    let mut stmt = conn.prepare(statement).map_err(SQLError::execution)?;
    let mut rows = stmt.query([]).map_err(SQLError::execution)?;
    while rows.next().map_err(SQLError::execution)?.is_some() {}
    Ok(MutationOutcome::succeeded(conn.changes()))
}
