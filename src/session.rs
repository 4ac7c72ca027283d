//! The owning controller for loaded projects.
//!
//! A `Session` holds the project tree, remembers the current main project and
//! sub-project, and is the only place that applies changes. Every change to a
//! sub-project runs a reducer, normalizes the result and queues an autosave of
//! the enclosing main project.

use std::sync::Arc;

use crate::autosave::{Autosaver, SaveStats};
use crate::db::ProjectStore;
use crate::error::{Error, Result};
use crate::fields::{DesignStage, ProjectType};
use crate::project::{resolve_project, resolve_sub_project, seed_project, MainProject};
use crate::subproject::{ensure_valid, SubProject};

pub struct Session {
    projects: Vec<MainProject>,
    current_project: Option<String>,
    current_sub: Option<String>,
    autosaver: Autosaver,
}

impl Session {
    /// Load every project from the store and select the first one.
    pub async fn open(store: Arc<dyn ProjectStore>) -> Result<Self> {
        let projects = store.list().await?;
        tracing::debug!(store = %store.describe(), count = projects.len(), "session opened");
        let autosaver = Autosaver::spawn(store);
        let mut session = Session {
            projects,
            current_project: None,
            current_sub: None,
            autosaver,
        };
        session.select_first();
        Ok(session)
    }

    fn select_first(&mut self) {
        self.current_project = self.projects.first().map(|p| p.id.clone());
        self.current_sub = self
            .projects
            .first()
            .and_then(|p| p.sub_projects.first())
            .map(|sp| sp.id.clone());
    }

    pub fn projects(&self) -> &[MainProject] {
        &self.projects
    }

    pub fn current_project(&self) -> Option<&MainProject> {
        let id = self.current_project.as_deref()?;
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn current_sub(&self) -> Option<&SubProject> {
        let id = self.current_sub.as_deref()?;
        self.current_project()?.sub_project(id)
    }

    pub fn require_project(&self) -> Result<&MainProject> {
        self.current_project()
            .ok_or_else(|| Error::ProjectNotFound("(none)".to_string()))
    }

    pub fn require_sub(&self) -> Result<&SubProject> {
        self.current_sub()
            .ok_or_else(|| Error::SubProjectNotFound("(none)".to_string()))
    }

    /// Select a main project by id, code or name, and its first sub-project.
    pub fn select_project(&mut self, ident: &str) -> Result<()> {
        let project = resolve_project(&self.projects, ident)?;
        self.current_sub = project.sub_projects.first().map(|sp| sp.id.clone());
        self.current_project = Some(project.id.clone());
        Ok(())
    }

    /// Select a sub-project of the current main project.
    pub fn select_sub_project(&mut self, ident: &str) -> Result<()> {
        let sp = resolve_sub_project(self.require_project()?, ident)?;
        self.current_sub = Some(sp.id.clone());
        Ok(())
    }

    /// Apply a reducer to the current sub-project and queue a save.
    pub fn update_current_sub(&mut self, f: impl FnOnce(&SubProject) -> SubProject) -> Result<&SubProject> {
        let next = f(self.require_sub()?);
        let next = ensure_valid(&serde_json::to_value(&next)?);
        let project_id = self.require_project()?.id.clone();
        let sub_id = next.id.clone();

        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::ProjectNotFound(project_id.clone()))?;
        if !project.replace_sub_project(next) {
            return Err(Error::SubProjectNotFound(sub_id));
        }
        let revision = self.autosaver.submit(project.clone());
        tracing::debug!(project = %project_id, sub_project = %sub_id, revision, "sub-project updated");
        self.current_sub = Some(sub_id);
        self.require_sub()
    }

    /// Create a main project, select it and queue a save.
    pub fn create_project(&mut self, name: &str, code: &str) -> Result<&MainProject> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("project name cannot be empty".to_string()));
        }
        let project = MainProject::new(name.trim(), code.trim());
        self.current_project = Some(project.id.clone());
        self.current_sub = None;
        self.autosaver.submit(project.clone());
        self.projects.push(project);
        self.require_project()
    }

    /// Add a sub-project with synthesized tasks to the current main project.
    pub fn add_sub_project(
        &mut self,
        name: &str,
        code: &str,
        project_type: ProjectType,
        stage: DesignStage,
    ) -> Result<&SubProject> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("sub-project name cannot be empty".to_string()));
        }
        let project_id = self.require_project()?.id.clone();
        let sp = SubProject::new(name.trim(), code.trim(), project_type, stage);
        let sub_id = sp.id.clone();
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::ProjectNotFound(project_id.clone()))?;
        project.sub_projects.push(sp);
        self.autosaver.submit(project.clone());
        self.current_sub = Some(sub_id);
        self.require_sub()
    }

    /// Delete a main project from the store and from the session.
    ///
    /// The delete is queued behind pending saves, so a snapshot written
    /// earlier in the session cannot bring the project back.
    pub async fn remove_project(&mut self, id: &str) -> Result<MainProject> {
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;
        self.autosaver.delete(id).await?;
        let removed = self.projects.remove(index);
        if self.current_project.as_deref() == Some(id) {
            self.select_first();
        }
        tracing::info!(project = %id, "project deleted");
        Ok(removed)
    }

    /// Remove a sub-project from the current main project and queue a save.
    pub fn remove_sub_project(&mut self, id: &str) -> Result<SubProject> {
        let project_id = self.require_project()?.id.clone();
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::ProjectNotFound(project_id.clone()))?;
        let index = project
            .sub_projects
            .iter()
            .position(|sp| sp.id == id)
            .ok_or_else(|| Error::SubProjectNotFound(id.to_string()))?;
        let removed = project.sub_projects.remove(index);
        let first = project.sub_projects.first().map(|sp| sp.id.clone());
        self.autosaver.submit(project.clone());
        if self.current_sub.as_deref() == Some(id) {
            self.current_sub = first;
        }
        Ok(removed)
    }

    /// Add the demo project when nothing is stored yet. Returns whether it did.
    pub fn seed_if_empty(&mut self) -> bool {
        if !self.projects.is_empty() {
            return false;
        }
        let seed = seed_project();
        self.autosaver.submit(seed.clone());
        self.projects.push(seed);
        self.select_first();
        true
    }

    /// Wait for queued saves to finish.
    pub async fn close(self) -> SaveStats {
        let stats = self.autosaver.shutdown().await;
        if stats.failed > 0 {
            tracing::warn!(failed = stats.failed, "some changes could not be saved");
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FileStore;
    use crate::mutation::toggle_complete;
    use crate::stage::advance_stage;
    use tempfile::tempdir;

    async fn open(dir: &std::path::Path) -> Session {
        Session::open(Arc::new(FileStore::new(dir))).await.unwrap()
    }

    #[tokio::test]
    async fn test_changes_are_persisted() {
        let dir = tempdir().unwrap();
        let mut session = open(dir.path()).await;
        assert!(session.current_sub().is_none());
        assert!(session.seed_if_empty());
        assert!(!session.seed_if_empty());

        let task_id = session.require_sub().unwrap().tasks[0].id.clone();
        session.update_current_sub(|sp| toggle_complete(sp, &task_id)).unwrap();
        let advanced = session.update_current_sub(advance_stage).unwrap();
        assert_eq!(advanced.stage, DesignStage::ConstructionDrawing);
        let stats = session.close().await;
        assert_eq!(stats.failed, 0);

        let reopened = open(dir.path()).await;
        let sp = reopened.require_sub().unwrap();
        assert_eq!(sp.stage, DesignStage::ConstructionDrawing);
        assert!(sp.task(&task_id).unwrap().is_completed);
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_create_select_and_remove() {
        let dir = tempdir().unwrap();
        let mut session = open(dir.path()).await;
        assert!(matches!(session.create_project("  ", ""), Err(Error::InvalidInput(_))));

        let id = session.create_project("Harbour Lab", "HL").unwrap().id.clone();
        session.add_sub_project("Plant room", "PR", ProjectType::Other, DesignStage::Schematic).unwrap();
        let lab = session.add_sub_project("Lab", "LB", ProjectType::Other, DesignStage::Preliminary).unwrap().id.clone();
        assert_eq!(session.require_sub().unwrap().name, "Lab");

        session.select_sub_project("plant ROOM").unwrap();
        assert_eq!(session.require_sub().unwrap().code, "PR");
        session.remove_sub_project(&lab).unwrap();
        assert_eq!(session.require_project().unwrap().sub_projects.len(), 1);

        session.select_project("HL").unwrap();
        session.close().await;

        let mut session = open(dir.path()).await;
        assert_eq!(session.projects().len(), 1);
        session.remove_project(&id).await.unwrap();
        assert!(session.current_project().is_none());
        assert!(matches!(session.remove_project(&id).await, Err(Error::ProjectNotFound(_))));
        session.close().await;
    }

    #[tokio::test]
    async fn test_project_created_and_removed_in_one_session_stays_gone() {
        let dir = tempdir().unwrap();
        let mut session = open(dir.path()).await;
        let id = session.create_project("Depot", "DP").unwrap().id.clone();
        session.add_sub_project("Hall", "H1", ProjectType::Other, DesignStage::Schematic).unwrap();
        let task_id = session.require_sub().unwrap().tasks[0].id.clone();
        session.update_current_sub(|sp| toggle_complete(sp, &task_id)).unwrap();

        let removed = session.remove_project(&id).await.unwrap();
        assert_eq!(removed.name, "Depot");
        assert!(session.projects().is_empty());
        let stats = session.close().await;
        assert_eq!((stats.deleted, stats.failed), (1, 0));

        let reopened = open(dir.path()).await;
        assert!(reopened.projects().is_empty());
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_update_without_selection_fails() {
        let dir = tempdir().unwrap();
        let mut session = open(dir.path()).await;
        let result = session.update_current_sub(|sp| sp.clone());
        assert!(matches!(result, Err(Error::SubProjectNotFound(_))));
        session.close().await;
    }
}
