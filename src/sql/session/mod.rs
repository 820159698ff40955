pub mod context;

use std::{collections::HashSet, time::Instant};

use log::{debug, error, info, warn};
use serde::Serialize;

use self::context::SessionContext;
use super::{
    compare,
    runtime::{self, executor, MutationOutcome, Outcome},
};
use crate::{
    core::{ErrorKind, RowSet, SQLError},
    lesson::{ExerciseMode, Lesson},
    metrics,
};

pub const CORRECT: &str = "Correct! Well done.";
pub const INCORRECT_ROWS: &str = "Incorrect. Compare your results with the expected output.";
pub const INCORRECT_MUTATION: &str = "Incorrect. Check your syntax.";
pub const EMPTY_QUERY: &str = "Empty query";
pub const LESSON_NOT_FOUND: &str = "Lesson not found";
pub const EXERCISE_NOT_FOUND: &str = "Exercise not found";
pub const NO_SOLUTION: &str = "Exercise has no reference solution";

/// Verdict for one submitted statement. Row sets are empty for
/// mutation-teaching exercises and for rejected statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
    pub student_rows: RowSet,
    pub reference_rows: RowSet,
}

impl ValidationResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            student_rows: RowSet::new(),
            reference_rows: RowSet::new(),
        }
    }

    /// The student's statement never produced an outcome.
    fn rejected(err: &SQLError) -> Self {
        match err.kind {
            ErrorKind::ExecutionError => Self::failed(format!("Query Error: {}", err.message)),
            _ => Self::failed(err.message.clone()),
        }
    }
}

/// Result of a free-form query run against a lesson's dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub success: bool,
    pub data: RowSet,
    pub columns: Vec<String>,
    /// Seconds.
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFinding {
    pub exercise_id: String,
    pub message: String,
}

/// Entry point of the validation engine. Holds no per-request state, so one
/// session serves any number of concurrent requests.
pub struct Session {
    ctx: SessionContext,
}

impl Session {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn lessons(&self) -> Result<Vec<Lesson>, SQLError> {
        self.ctx.lessons.all_lessons()
    }

    pub fn lesson(&self, lesson_id: &str) -> Result<Lesson, SQLError> {
        self.ctx
            .lessons
            .get_lesson(lesson_id)?
            .ok_or_else(|| SQLError::new(ErrorKind::InputError, LESSON_NOT_FOUND))
    }

    /// Grades `statement` against the reference solution of an exercise.
    ///
    /// Every failure caused by the submission comes back as
    /// `Ok(ValidationResult { valid: false, .. })`. Only resource errors
    /// (missing dataset, failed copy, unreadable lesson content) are returned
    /// as `Err`. Handles acquired for the request are released before this
    /// returns, whatever the outcome.
    pub fn validate(
        &self,
        lesson_id: &str,
        exercise_id: &str,
        statement: &str,
    ) -> Result<ValidationResult, SQLError> {
        info!("Validating lesson {} exercise {}", lesson_id, exercise_id);
        let timer = metrics::VALIDATION_SECONDS.start_timer();
        let result = match self.grade(lesson_id, exercise_id, statement) {
            Ok(result) => Ok(result),
            Err(err) if err.is_resource() => {
                error!(
                    "Validation of lesson {} exercise {} aborted: {}",
                    lesson_id, exercise_id, err
                );
                Err(err)
            }
            Err(err) => {
                info!(
                    "Lesson {} exercise {} not graded: {}",
                    lesson_id, exercise_id, err
                );
                Ok(ValidationResult::failed(err.message))
            }
        };
        timer.observe_duration();

        let outcome = match &result {
            Ok(r) if r.valid => "valid",
            Ok(_) => "invalid",
            Err(_) => "error",
        };
        metrics::VALIDATIONS.with_label_values(&[outcome]).inc();
        result
    }

    fn grade(
        &self,
        lesson_id: &str,
        exercise_id: &str,
        statement: &str,
    ) -> Result<ValidationResult, SQLError> {
        if statement.trim().is_empty() {
            return Err(SQLError::new(ErrorKind::InputError, EMPTY_QUERY));
        }
        let lesson = self.lesson(lesson_id)?;
        let exercise = lesson
            .find_exercise(exercise_id)
            .ok_or_else(|| SQLError::new(ErrorKind::InputError, EXERCISE_NOT_FOUND))?;
        let solution = exercise
            .solution()
            .ok_or_else(|| SQLError::new(ErrorKind::InputError, NO_SOLUTION))?;
        let mode = lesson.mode();
        debug!("Lesson {} runs in {:?} mode", lesson_id, mode);

        // Released on every path out of this function.
        let databases = self.ctx.datasets.acquire(lesson_id, mode)?;

        let student = match self
            .ctx
            .policy
            .check(statement, mode)
            .and_then(|s| runtime::run(databases.student(), s, mode))
        {
            Ok(outcome) => outcome,
            Err(err) => {
                info!(
                    "Student statement for lesson {} exercise {} rejected: {}",
                    lesson_id, exercise_id, err
                );
                return Ok(ValidationResult::rejected(&err));
            }
        };

        let reference = match self
            .ctx
            .policy
            .check(solution, mode)
            .and_then(|s| runtime::run(databases.reference(), s, mode))
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    "Reference solution of lesson {} exercise {} failed, lesson content is broken: {}",
                    lesson_id, exercise_id, err
                );
                match mode {
                    ExerciseMode::MutationTeaching => MutationOutcome::failed(err.message).into(),
                    ExerciseMode::ReadOnly => return Err(err),
                }
            }
        };

        let valid = compare::equal(mode, &student, &reference);
        let message = match (valid, mode) {
            (true, _) => CORRECT,
            (false, ExerciseMode::ReadOnly) => INCORRECT_ROWS,
            (false, ExerciseMode::MutationTeaching) => INCORRECT_MUTATION,
        };
        if let (Outcome::Mutation(s), Outcome::Mutation(r)) = (&student, &reference) {
            debug!("Mutation outcomes: student {:?}, reference {:?}", s, r);
        }
        Ok(ValidationResult {
            valid,
            message: message.to_string(),
            student_rows: student.into_rows(),
            reference_rows: reference.into_rows(),
        })
    }

    /// Runs a free-form query against a lesson's dataset under the read-only
    /// policy, whatever the lesson teaches.
    pub fn run_query(&self, lesson_id: &str, statement: &str) -> Result<QueryResult, SQLError> {
        let started = Instant::now();
        let result = self.sandbox(lesson_id, statement);
        let execution_time = started.elapsed().as_secs_f64();
        match result {
            Ok(rows) => Ok(QueryResult {
                success: true,
                data: rows.rows,
                columns: rows.columns,
                execution_time,
                error: None,
            }),
            Err(err) if err.is_resource() => {
                error!("Query against lesson {} aborted: {}", lesson_id, err);
                Err(err)
            }
            Err(err) => Ok(QueryResult {
                success: false,
                data: RowSet::new(),
                columns: Vec::new(),
                execution_time,
                error: Some(err.message),
            }),
        }
    }

    fn sandbox(&self, lesson_id: &str, statement: &str) -> Result<executor::QueryRows, SQLError> {
        if statement.trim().is_empty() {
            return Err(SQLError::new(ErrorKind::InputError, EMPTY_QUERY));
        }
        self.lesson(lesson_id)?;
        let handle = self.ctx.datasets.open_shared(lesson_id)?;
        let statement = self.ctx.policy.check(statement, ExerciseMode::ReadOnly)?;
        executor::query(handle.connection(), statement)
    }

    /// Validates every exercise's reference solution against itself and
    /// reports the exercises that would not accept their own answer.
    pub fn audit_lesson(&self, lesson_id: &str) -> Result<Vec<AuditFinding>, SQLError> {
        let lesson = self.lesson(lesson_id)?;
        let mut seen = HashSet::new();
        let mut findings = Vec::new();
        let mut total = 0;
        for exercise in lesson.exercises() {
            total += 1;
            let message = if !seen.insert(exercise.id()) {
                Some(format!(
                    "Duplicate exercise id {}, only the first is reachable",
                    exercise.id()
                ))
            } else {
                match exercise.solution() {
                    None => Some(NO_SOLUTION.to_string()),
                    Some(solution) => {
                        let result = self.validate(lesson_id, exercise.id(), solution)?;
                        (!result.valid).then_some(result.message)
                    }
                }
            };
            if let Some(message) = message {
                warn!(
                    "Lesson {} exercise {} fails its own solution: {}",
                    lesson_id,
                    exercise.id(),
                    message
                );
                findings.push(AuditFinding {
                    exercise_id: exercise.id().to_string(),
                    message,
                });
            }
        }
        info!(
            "Audited lesson {}: {} of {} exercises need attention",
            lesson_id,
            findings.len(),
            total
        );
        Ok(findings)
    }
}
