//! Project metadata repository. Core only reads `project.json`.

use crate::model::project::ProjectMetadata;
use crate::store::{FileStore, StoreResult};

pub trait ProjectRepository {
    /// Returns `None` when no project file exists.
    fn read_project(&self) -> StoreResult<Option<ProjectMetadata>>;
}

impl<T: ProjectRepository + ?Sized> ProjectRepository for &T {
    fn read_project(&self) -> StoreResult<Option<ProjectMetadata>> {
        (**self).read_project()
    }
}

impl ProjectRepository for FileStore {
    fn read_project(&self) -> StoreResult<Option<ProjectMetadata>> {
        let path = self.project_path();
        if !path.exists() {
            return Ok(None);
        }
        self.read_record(&path, |project: &ProjectMetadata| {
            project.validate().map_err(Into::into)
        })
        .map(Some)
    }
}
