use std::fmt::Display;

use rusqlite::types::ValueRef;
use serde::Serialize;

/// A single column value as returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Datum {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Datum::Null,
            ValueRef::Integer(i) => Datum::Int(i),
            ValueRef::Real(f) => Datum::Float(f),
            ValueRef::Text(text) => Datum::String(String::from_utf8_lossy(text).into_owned()),
            ValueRef::Blob(bytes) => Datum::Blob(bytes.to_vec()),
        }
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Null => write!(f, "null"),
            Datum::Int(i) => write!(f, "{i}"),
            Datum::Float(v) => write!(f, "{v}"),
            Datum::String(s) => write!(f, "{s}"),
            Datum::Blob(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
        }
    }
}
