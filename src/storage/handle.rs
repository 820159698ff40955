use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use rusqlite::Connection;

use crate::{core::SQLError, metrics};

/// A live connection to a lesson dataset.
///
/// Field order matters: the connection is dropped (closed) before the
/// ephemeral backing file is removed.
pub struct DatabaseHandle {
    conn: Connection,
    file: Option<EphemeralFile>,
}

impl DatabaseHandle {
    pub(super) fn shared(conn: Connection) -> Self {
        Self { conn, file: None }
    }

    pub(super) fn ephemeral(conn: Connection, file: EphemeralFile) -> Self {
        Self {
            conn,
            file: Some(file),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn is_ephemeral(&self) -> bool {
        self.file.is_some()
    }

    /// Backing file of an ephemeral handle.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(EphemeralFile::path)
    }
}

/// A private dataset copy, deleted together with any SQLite side files when
/// dropped.
#[derive(Debug)]
pub struct EphemeralFile {
    path: PathBuf,
}

impl EphemeralFile {
    pub fn copy_from(source: &Path, target: PathBuf) -> Result<Self, SQLError> {
        // Own the path before copying so a partial copy is cleaned up too.
        let file = EphemeralFile { path: target };
        metrics::EPHEMERAL_DATASETS.inc();
        fs::copy(source, &file.path).map_err(|e| {
            SQLError::resource(format!(
                "cannot copy {} to {}: {e}",
                source.display(),
                file.path.display()
            ))
        })?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EphemeralFile {
    fn drop(&mut self) {
        metrics::EPHEMERAL_DATASETS.dec();
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let mut name = self.path.clone().into_os_string();
            name.push(suffix);
            match fs::remove_file(&name) {
                Ok(()) => debug!("Removed {}", Path::new(&name).display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to remove ephemeral dataset {}: {e}",
                    Path::new(&name).display()
                ),
            }
        }
    }
}
