#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod core;
pub mod lesson;
pub mod metrics;
pub mod sql;
pub mod storage;
pub mod util;

pub use crate::core::{Datum, ErrorKind, RowSet, SQLError, Tuple};
pub use sql::{
    session::{AuditFinding, QueryResult, ValidationResult},
    Session, SessionContext,
};
