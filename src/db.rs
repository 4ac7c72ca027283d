//! Project storage.
//!
//! `ProjectStore` is the persistence boundary: whole main-project documents
//! are listed, loaded, saved and deleted. `FileStore` keeps one JSON file per
//! main project in the data directory, named `<encoded id>_project.json`; the HTTP
//! implementation lives in [`crate::remote`]. Every document read from a
//! store is normalized with [`MainProject::ensure_valid`].

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::project::MainProject;

const FILE_SUFFIX: &str = "_project.json";

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// All main projects, most recently changed first where the store knows.
    async fn list(&self) -> Result<Vec<MainProject>>;

    async fn load(&self, id: &str) -> Result<Option<MainProject>>;

    /// Insert or replace the whole document.
    async fn save(&self, project: &MainProject) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Short description for log lines and `config show`.
    fn describe(&self) -> String;
}

/// Directory of JSON documents, one per main project.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    /// Path of the document for a main-project id.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", encode_id(id), FILE_SUFFIX))
    }

    async fn read_document(path: &Path) -> Result<MainProject> {
        let data = tokio::fs::read_to_string(path).await?;
        let raw: Value = serde_json::from_str(&data)?;
        Ok(MainProject::ensure_valid(&raw))
    }
}

/// File-name form of a project id.
///
/// Lowercase ASCII letters, digits and `-` are kept; every other byte becomes
/// `_` plus two hex digits. The mapping is injective and never relies on case,
/// so distinct ids get distinct files on case-insensitive file systems too.
pub fn encode_id(id: &str) -> String {
    if id.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{:02x}", b));
        }
    }
    out
}

#[async_trait]
impl ProjectStore for FileStore {
    async fn list(&self) -> Result<Vec<MainProject>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut found: Vec<(MainProject, SystemTime)> = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_doc = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(FILE_SUFFIX))
                .unwrap_or(false);
            if !is_doc {
                continue;
            }
            match Self::read_document(&path).await {
                Ok(project) => {
                    let modified = entry
                        .metadata()
                        .await
                        .and_then(|m| m.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH);
                    found.push((project, modified));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable project file");
                }
            }
        }

        found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(&b.0.name)));
        tracing::debug!(dir = %self.dir.display(), count = found.len(), "listed projects");
        Ok(found.into_iter().map(|(p, _)| p).collect())
    }

    async fn load(&self, id: &str) -> Result<Option<MainProject>> {
        let path = self.path_for(id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let project = Self::read_document(&path).await?;
        if project.id != id {
            tracing::warn!(path = %path.display(), expected = %id, found = %project.id, "project file holds another id");
            return Ok(None);
        }
        Ok(Some(project))
    }

    async fn save(&self, project: &MainProject) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&project.id);
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(project)?;
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(project = %project.id, path = %path.display(), "project saved");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        if !tokio::fs::try_exists(&path).await? {
            return Err(Error::ProjectNotFound(id.to_string()));
        }
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(project = %id, "project deleted");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("files in {}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{DesignStage, ProjectType};
    use crate::project::seed_project;
    use crate::subproject::SubProject;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_load_list_delete() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));
        assert!(store.list().await.unwrap().is_empty());

        let mut seed = seed_project();
        store.save(&seed).await.unwrap();
        assert!(dir.path().join("data").join("mp1_project.json").exists());

        seed.sub_projects.push(SubProject::new("Lab", "L1", ProjectType::Other, DesignStage::Schematic));
        store.save(&seed).await.unwrap();

        let loaded = store.load("mp1").await.unwrap().unwrap();
        assert_eq!(loaded, seed);
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.delete("mp1").await.unwrap();
        assert!(store.load("mp1").await.unwrap().is_none());
        assert!(matches!(store.delete("mp1").await, Err(Error::ProjectNotFound(_))));
    }

    #[test]
    fn test_encode_id_is_case_and_punctuation_safe() {
        assert_eq!(encode_id("mp1"), "mp1");
        assert_eq!(encode_id("mp_1"), "mp_5f1");
        assert_eq!(encode_id("MP-1"), "_4d_50-1");
        assert_eq!(encode_id(""), "_");
        assert_ne!(encode_id("mp 1"), encode_id("mp_1"));
        assert_ne!(encode_id("项目"), encode_id("项"));
    }

    #[tokio::test]
    async fn test_similar_ids_keep_separate_files() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut alpha = MainProject::new("Alpha", "");
        alpha.id = "MP-1".to_string();
        let mut beta = MainProject::new("Beta", "");
        beta.id = "mp_1".to_string();
        store.save(&alpha).await.unwrap();
        store.save(&beta).await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 2);
        assert_eq!(store.load("MP-1").await.unwrap().unwrap().name, "Alpha");
        assert_eq!(store.load("mp_1").await.unwrap().unwrap().name, "Beta");
        store.delete("MP-1").await.unwrap();
        assert!(store.load("MP-1").await.unwrap().is_none());
        assert_eq!(store.load("mp_1").await.unwrap().unwrap().name, "Beta");
    }

    #[tokio::test]
    async fn test_load_rejects_file_with_other_id() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(dir.path().join("other_project.json"), r#"{ "id": "x", "name": "X" }"#).unwrap();
        assert!(store.load("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(&seed_project()).await.unwrap();
        std::fs::write(dir.path().join("broken_project.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let projects = store.list().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "mp1");
    }

    #[tokio::test]
    async fn test_loaded_documents_are_normalized() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(
            dir.path().join("legacy_project.json"),
            r#"{ "id": "legacy", "name": "Old", "subProjects": [{ "id": "s", "stage": "施工图设计" }, 5] }"#,
        )
        .unwrap();

        let project = store.load("legacy").await.unwrap().unwrap();
        assert_eq!(project.sub_projects.len(), 1);
        let sp = &project.sub_projects[0];
        assert_eq!(sp.stage, DesignStage::ConstructionDrawing);
        assert_eq!(sp.tasks.len(), 3);
    }
}
