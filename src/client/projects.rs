// src/client/projects.rs - Project endpoints

use reqwest::Method;

use super::DojoClient;
use crate::infra::errors::DojoError;
use crate::models::{NewProject, Project, ProjectFiles, ProjectStats, ProjectUpdate};

impl DojoClient {
    pub async fn get_projects(&self) -> Result<Vec<Project>, DojoError> {
        self.get(&["projects"]).await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, DojoError> {
        self.post(&["projects"], project).await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project, DojoError> {
        self.get(&["projects", project_id]).await
    }

    pub async fn update_project(
        &self,
        project_id: &str,
        update: &ProjectUpdate,
    ) -> Result<Project, DojoError> {
        self.put(&["projects", project_id], update).await
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<(), DojoError> {
        self.execute(Method::DELETE, &["projects", project_id]).await
    }

    pub async fn get_project_stats(&self, project_id: &str) -> Result<ProjectStats, DojoError> {
        self.get(&["projects", project_id, "stats"]).await
    }

    /// Directory listing; `path` defaults to the project root.
    pub async fn get_project_files(
        &self,
        project_id: &str,
        path: Option<&str>,
    ) -> Result<ProjectFiles, DojoError> {
        self.get_with(
            &["projects", project_id, "files"],
            &[("path", path.unwrap_or("/").to_string())],
        )
        .await
    }
}
