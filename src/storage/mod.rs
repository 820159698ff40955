mod handle;

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use rusqlite::{Connection, OpenFlags};
use uuid::Uuid;

pub use handle::{DatabaseHandle, EphemeralFile};

use crate::{
    core::{ErrorKind, SQLError},
    lesson::{is_valid_lesson_id, ExerciseMode},
};

/// Handles acquired for one validation request.
pub enum Provisioned {
    /// One read-only handle serves both statements.
    Shared(DatabaseHandle),
    /// Independent private copies, so neither statement sees the other's changes.
    Isolated {
        student: DatabaseHandle,
        reference: DatabaseHandle,
    },
}

impl Provisioned {
    pub fn student(&self) -> &DatabaseHandle {
        match self {
            Provisioned::Shared(handle) => handle,
            Provisioned::Isolated { student, .. } => student,
        }
    }

    pub fn reference(&self) -> &DatabaseHandle {
        match self {
            Provisioned::Shared(handle) => handle,
            Provisioned::Isolated { reference, .. } => reference,
        }
    }
}

/// The directory holding one canonical `lesson_<id>.db` per lesson. Canonical
/// files are only ever opened read-only or copied.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    data_dir: PathBuf,
}

impl DatasetStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn canonical_path(&self, lesson_id: &str) -> PathBuf {
        self.data_dir.join(format!("lesson_{lesson_id}.db"))
    }

    pub fn acquire(&self, lesson_id: &str, mode: ExerciseMode) -> Result<Provisioned, SQLError> {
        match mode {
            ExerciseMode::ReadOnly => Ok(Provisioned::Shared(self.open_shared(lesson_id)?)),
            ExerciseMode::MutationTeaching => {
                let student = self.fork(lesson_id)?;
                let reference = self.fork(lesson_id)?;
                Ok(Provisioned::Isolated { student, reference })
            }
        }
    }

    /// Opens the canonical dataset in read-only mode.
    pub fn open_shared(&self, lesson_id: &str) -> Result<DatabaseHandle, SQLError> {
        let path = self.existing_canonical(lesson_id)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags).map_err(|e| {
            SQLError::resource(format!("cannot open {}: {e}", path.display()))
        })?;
        debug!("Opened shared dataset {}", path.display());
        Ok(DatabaseHandle::shared(conn))
    }

    /// Copies the canonical dataset to a fresh uniquely named file and opens
    /// the copy read-write. The copy is deleted when the handle is dropped.
    pub fn fork(&self, lesson_id: &str) -> Result<DatabaseHandle, SQLError> {
        let source = self.existing_canonical(lesson_id)?;
        let target = self.data_dir.join(format!(
            "temp_{lesson_id}_{}.db",
            Uuid::new_v4().simple()
        ));
        let file = EphemeralFile::copy_from(&source, target)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        // On failure `file` is dropped here and the copy removed.
        let conn = Connection::open_with_flags(file.path(), flags).map_err(|e| {
            SQLError::resource(format!("cannot open {}: {e}", file.path().display()))
        })?;
        info!("Forked lesson {} into {}", lesson_id, file.path().display());
        Ok(DatabaseHandle::ephemeral(conn, file))
    }

    fn existing_canonical(&self, lesson_id: &str) -> Result<PathBuf, SQLError> {
        if !is_valid_lesson_id(lesson_id) {
            return Err(SQLError::new(ErrorKind::InputError, "Lesson not found"));
        }
        let path = self.canonical_path(lesson_id);
        if !fs::metadata(&path).map_or(false, |m| m.is_file()) {
            return Err(SQLError::resource(format!(
                "Database not found: lesson_{lesson_id}.db"
            )));
        }
        Ok(path)
    }
}
