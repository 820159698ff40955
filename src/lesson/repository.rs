use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use super::{is_valid_lesson_id, Lesson};
use crate::core::SQLError;

/// Source of lesson definitions. Read-only once loaded.
pub trait LessonRepository: Send + Sync {
    fn get_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>, SQLError>;

    fn all_lessons(&self) -> Result<Vec<Lesson>, SQLError>;
}

/// Reads `lesson_<id>.json` files from a content directory.
pub struct FileLessonRepository {
    content_dir: PathBuf,
    /// Lessons classified as mutation-teaching when their file does not say so.
    mutation_lessons: Vec<String>,
}

impl FileLessonRepository {
    pub fn new(content_dir: impl Into<PathBuf>, mutation_lessons: Vec<String>) -> Self {
        Self {
            content_dir: content_dir.into(),
            mutation_lessons,
        }
    }

    /// Parses the lesson stored for `lesson_id`. The file name is
    /// authoritative, so the id and the legacy mutation classification both
    /// follow `lesson_id` rather than the id declared inside the file.
    fn load(&self, path: &Path, lesson_id: &str) -> Result<Lesson, SQLError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SQLError::resource(format!("cannot read lesson {}: {e}", path.display()))
        })?;
        let mut lesson: Lesson = serde_json::from_str(&raw).map_err(|e| {
            SQLError::resource(format!("cannot parse lesson {}: {e}", path.display()))
        })?;
        if lesson.id != lesson_id {
            warn!(
                "Lesson file {} declares id {:?}",
                path.display(),
                lesson.id
            );
            lesson.id = lesson_id.to_string();
        }
        lesson.teaches_mutation |= self.mutation_lessons.iter().any(|id| id == lesson_id);
        Ok(lesson)
    }
}

fn lesson_id_of(path: &Path) -> Option<&str> {
    if path.extension()?.to_str()? != "json" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("lesson_")
        .filter(|id| is_valid_lesson_id(id))
}

impl LessonRepository for FileLessonRepository {
    fn get_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>, SQLError> {
        if !is_valid_lesson_id(lesson_id) {
            debug!("Rejecting malformed lesson id {:?}", lesson_id);
            return Ok(None);
        }
        let path = self.content_dir.join(format!("lesson_{lesson_id}.json"));
        if !path.exists() {
            return Ok(None);
        }
        self.load(&path, lesson_id).map(Some)
    }

    fn all_lessons(&self) -> Result<Vec<Lesson>, SQLError> {
        let entries = fs::read_dir(&self.content_dir).map_err(|e| {
            SQLError::resource(format!(
                "cannot list lesson content {}: {e}",
                self.content_dir.display()
            ))
        })?;
        let mut paths = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| lesson_id_of(path).is_some())
            .collect::<Vec<_>>();
        paths.sort();
        paths
            .iter()
            .filter_map(|path| lesson_id_of(path).map(|id| self.load(path, id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::ErrorKind, lesson::ExerciseMode};

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn repository(dir: &Path) -> FileLessonRepository {
        FileLessonRepository::new(dir, vec!["alter-table".to_string()])
    }

    #[test]
    fn loads_lesson_by_id() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "lesson_select-basics.json",
            r#"{"id": "select-basics", "practice": [{"id": "1", "solution": "SELECT 1"}]}"#,
        );
        let lesson = repository(dir.path())
            .get_lesson("select-basics")
            .unwrap()
            .unwrap();
        assert_eq!(lesson.practice.len(), 1);
        assert_eq!(lesson.mode(), ExerciseMode::ReadOnly);
    }

    #[test]
    fn legacy_list_and_explicit_flag_both_classify() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lesson_alter-table.json", r#"{"id": "alter-table"}"#);
        write(
            dir.path(),
            "lesson_indexes.json",
            r#"{"id": "indexes", "teachesMutation": true}"#,
        );
        let repo = repository(dir.path());
        let legacy = repo.get_lesson("alter-table").unwrap().unwrap();
        let explicit = repo.get_lesson("indexes").unwrap().unwrap();
        assert_eq!(legacy.mode(), ExerciseMode::MutationTeaching);
        assert_eq!(explicit.mode(), ExerciseMode::MutationTeaching);
    }

    #[test]
    fn file_name_decides_id_and_classification() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lesson_foo.json", r#"{"id": "alter-table"}"#);
        write(dir.path(), "lesson_alter-table.json", r#"{"id": "renamed"}"#);
        let repo = repository(dir.path());

        let foo = repo.get_lesson("foo").unwrap().unwrap();
        assert_eq!(foo.id, "foo");
        assert_eq!(foo.mode(), ExerciseMode::ReadOnly);

        let alter = repo.get_lesson("alter-table").unwrap().unwrap();
        assert_eq!(alter.id, "alter-table");
        assert_eq!(alter.mode(), ExerciseMode::MutationTeaching);

        let listed = repo
            .all_lessons()
            .unwrap()
            .into_iter()
            .map(|l| (l.id.clone(), l.mode()))
            .collect::<Vec<_>>();
        assert_eq!(
            listed,
            vec![
                ("alter-table".to_string(), ExerciseMode::MutationTeaching),
                ("foo".to_string(), ExerciseMode::ReadOnly),
            ]
        );
    }

    #[test]
    fn unknown_and_malformed_ids_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path());
        assert!(repo.get_lesson("nope").unwrap().is_none());
        assert!(repo.get_lesson("../lesson_nope").unwrap().is_none());
    }

    #[test]
    fn corrupt_content_is_a_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lesson_broken.json", "{ not json");
        let err = repository(dir.path()).get_lesson("broken").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceError);
    }

    #[test]
    fn all_lessons_are_sorted_by_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lesson_b.json", r#"{"id": "b"}"#);
        write(dir.path(), "lesson_a.json", r#"{"id": "a"}"#);
        write(dir.path(), "notes.txt", "ignored");
        write(dir.path(), "manifest.json", "{}");
        let ids = repository(dir.path())
            .all_lessons()
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
