pub mod executor;

use log::debug;

pub use executor::{MutationOutcome, Outcome, QueryRows};

use crate::{core::SQLError, lesson::ExerciseMode, storage::DatabaseHandle};

/// Executes an already-guarded statement. Read-only lessons get the full row
/// set back; mutation-teaching lessons get the effect of the statement.
pub fn run(
    handle: &DatabaseHandle,
    statement: &str,
    mode: ExerciseMode,
) -> Result<Outcome, SQLError> {
    debug!("Running statement in {:?} mode: {}", mode, statement);
    if mode.allows_mutation() {
        Ok(executor::execute(handle.connection(), statement)?.into())
    } else {
        Ok(executor::query(handle.connection(), statement)?.rows.into())
    }
}
