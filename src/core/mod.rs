mod datum;
mod error;
pub mod tuple;

pub use datum::Datum;
pub use error::{ErrorKind, SQLError};
pub use tuple::{RowSet, Tuple};
