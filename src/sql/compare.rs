use std::collections::HashSet;

use crate::{
    core::Tuple,
    lesson::ExerciseMode,
    sql::runtime::Outcome,
};

/// Decides whether the student's outcome matches the reference outcome.
pub fn equal(mode: ExerciseMode, student: &Outcome, reference: &Outcome) -> bool {
    match (mode, student, reference) {
        (ExerciseMode::MutationTeaching, Outcome::Mutation(s), Outcome::Mutation(r)) => {
            s.succeeded && r.succeeded
        }
        (ExerciseMode::ReadOnly, Outcome::Rows(s), Outcome::Rows(r)) => rows_equal(s, r),
        _ => false,
    }
}

/// Row sets compared as unordered collections of column-order independent
/// rows. Equal lengths plus equal sets of distinct rows is enough: multiplicity
/// of a repeated row is not compared beyond the length check.
pub fn rows_equal(a: &[Tuple], b: &[Tuple]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.is_empty() {
        return true;
    }
    let left = a.iter().map(Tuple::canonical).collect::<HashSet<_>>();
    let right = b.iter().map(Tuple::canonical).collect::<HashSet<_>>();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::Datum, sql::runtime::MutationOutcome};

    fn user(id: i64, name: &str) -> Tuple {
        Tuple::new(
            vec!["id".into(), "name".into()],
            vec![Datum::Int(id), Datum::String(name.into())],
        )
    }

    fn user_reordered(id: i64, name: &str) -> Tuple {
        Tuple::new(
            vec!["name".into(), "id".into()],
            vec![Datum::String(name.into()), Datum::Int(id)],
        )
    }

    #[test]
    fn row_and_column_order_do_not_matter() {
        let a = vec![user(1, "ada"), user(2, "grace")];
        let b = vec![user_reordered(2, "grace"), user_reordered(1, "ada")];
        assert!(rows_equal(&a, &b));
    }

    #[test]
    fn different_data_is_unequal() {
        assert!(!rows_equal(&[user(1, "ada")], &[user(1, "alan")]));
        assert!(!rows_equal(&[user(1, "ada")], &[user(1, "ada"), user(2, "grace")]));
    }

    #[test]
    fn empty_sets_are_equal() {
        assert!(rows_equal(&[], &[]));
        assert!(!rows_equal(&[], &[user(1, "ada")]));
    }

    #[test]
    fn multiplicity_only_matters_through_length() {
        let a = vec![user(1, "ada"), user(1, "ada"), user(2, "grace")];
        let b = vec![user(1, "ada"), user(2, "grace"), user(2, "grace")];
        assert!(rows_equal(&a, &b));
        assert!(!rows_equal(&a, &[user(1, "ada"), user(2, "grace")]));
    }

    #[test]
    fn extra_column_is_unequal() {
        let wide = Tuple::new(
            vec!["id".into(), "name".into(), "age".into()],
            vec![Datum::Int(1), Datum::String("ada".into()), Datum::Int(36)],
        );
        assert!(!rows_equal(&[user(1, "ada")], &[wide]));
    }

    #[test]
    fn mutation_mode_compares_success_only() {
        let ok = Outcome::from(MutationOutcome::succeeded(0));
        let other_ok = Outcome::from(MutationOutcome::succeeded(12));
        let failed = Outcome::from(MutationOutcome::failed("syntax error"));
        let mode = ExerciseMode::MutationTeaching;
        assert!(equal(mode, &ok, &other_ok));
        assert!(!equal(mode, &ok, &failed));
        assert!(!equal(mode, &failed, &ok));
    }

    #[test]
    fn mismatched_outcome_kinds_are_unequal() {
        let rows = Outcome::from(vec![user(1, "ada")]);
        let mutation = Outcome::from(MutationOutcome::succeeded(1));
        assert!(equal(ExerciseMode::ReadOnly, &rows, &rows.clone()));
        assert!(!equal(ExerciseMode::ReadOnly, &rows, &mutation));
        assert!(!equal(ExerciseMode::MutationTeaching, &rows, &rows.clone()));
    }
}
