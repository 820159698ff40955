use std::sync::Arc;

use crate::{
    config::Config,
    lesson::{FileLessonRepository, LessonRepository},
    sql::policy::PolicyGuard,
    storage::DatasetStore,
};

/// Collaborators shared by every request a session serves.
pub struct SessionContext {
    pub lessons: Arc<dyn LessonRepository>,
    pub datasets: DatasetStore,
    pub policy: PolicyGuard,
}

impl SessionContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lessons: Arc::new(FileLessonRepository::new(
                config.storage.content_dir.clone(),
                config.validation.mutation_lessons.clone(),
            )),
            datasets: DatasetStore::new(config.storage.data_dir.clone()),
            policy: PolicyGuard::new(config.validation.max_joins),
        }
    }
}
