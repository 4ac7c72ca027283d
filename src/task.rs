//! Task data structures and template synthesis.
//!
//! This module defines `TaskItem`, one checklist entry of a sub-project, along
//! with the lettered `SubmissionVersion`s attached to it, and the synthesizer
//! that turns a template selection into fresh tasks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog;
use crate::fields::{DesignStage, ProjectType, TaskGroup};

/// A file attached to a submission version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SubmissionFile {
    /// Build a file entry from a file name, taking the type from its extension.
    pub fn from_name(name: &str) -> Self {
        let kind = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "file".to_string());
        SubmissionFile {
            name: name.to_string(),
            kind,
        }
    }
}

/// A lettered revision of files submitted against a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionVersion {
    pub version: String,
    pub date: String,
    #[serde(default)]
    pub files: Vec<SubmissionFile>,
}

/// One checklist entry with completion state and attached versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub category_id: String,
    pub category: String,
    pub group: TaskGroup,
    pub stage: DesignStage,
    pub content: String,
    pub is_completed: bool,
    /// Most recent first.
    pub versions: Vec<SubmissionVersion>,
}

/// Generate a fresh, unique id with the given prefix.
pub fn new_id(prefix: &str) -> String {
    let short = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &short[..8])
}

/// Letter tag for the version at `index` (0 -> "A", 1 -> "B", ...).
///
/// Past "Z" the tag continues through the following code points, matching the
/// stored data of the original dashboard.
pub fn version_tag(index: usize) -> String {
    let code = 65u32.saturating_add(index as u32);
    char::from_u32(code).unwrap_or('?').to_string()
}

/// Turn the enabled categories of a template selection into fresh tasks.
///
/// Categories are visited in catalog order; ids not defined for
/// `(project_type, stage)` are ignored. Every call produces new ids.
pub fn synthesize(
    project_type: ProjectType,
    stage: DesignStage,
    enabled_category_ids: &[String],
) -> Vec<TaskItem> {
    synthesize_filtered(project_type, stage, enabled_category_ids, false)
}

/// Like [`synthesize`] but limited to items flagged for the executive view.
pub fn synthesize_minimal(
    project_type: ProjectType,
    stage: DesignStage,
    enabled_category_ids: &[String],
) -> Vec<TaskItem> {
    synthesize_filtered(project_type, stage, enabled_category_ids, true)
}

fn synthesize_filtered(
    project_type: ProjectType,
    stage: DesignStage,
    enabled_category_ids: &[String],
    minimal_only: bool,
) -> Vec<TaskItem> {
    catalog::categories(project_type, stage)
        .iter()
        .filter(|cat| enabled_category_ids.iter().any(|id| id == cat.id))
        .flat_map(|cat| cat.items.iter())
        .filter(|item| !minimal_only || item.minimal)
        .map(|item| TaskItem {
            id: new_id(&format!("{}-{}", stage.slug(), item.id)),
            category_id: item.category_id.to_string(),
            category: item.category.to_string(),
            group: item.group,
            stage,
            content: item.content.to_string(),
            is_completed: false,
            versions: Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_synthesize_all_categories_matches_catalog_order() {
        for t in ProjectType::ALL {
            for s in DesignStage::ALL {
                let ids = catalog::category_ids(t, s);
                let tasks = synthesize(t, s, &ids);
                let expected: Vec<&str> = catalog::categories(t, s)
                    .iter()
                    .flat_map(|c| c.items.iter().map(|i| i.content))
                    .collect();
                let got: Vec<&str> = tasks.iter().map(|t| t.content.as_str()).collect();
                assert_eq!(got, expected);

                let unique: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(unique.len(), tasks.len());
                assert!(tasks.iter().all(|t| !t.is_completed && t.versions.is_empty()));
                assert!(tasks.iter().all(|t| t.stage == s));
            }
        }
    }

    #[test]
    fn test_general_schematic_scenario() {
        let ids = catalog::category_ids(ProjectType::Other, DesignStage::Schematic);
        assert_eq!(ids.len(), 3);
        let tasks = synthesize(ProjectType::Other, DesignStage::Schematic, &ids);
        assert_eq!(tasks.len(), 4);
        let groups: Vec<TaskGroup> = tasks.iter().map(|t| t.group).collect();
        assert_eq!(
            groups,
            vec![
                TaskGroup::InterfaceCoordination,
                TaskGroup::InterfaceCoordination,
                TaskGroup::RiskControl,
                TaskGroup::Deliverable,
            ]
        );
        assert!(tasks.iter().all(|t| !t.is_completed));
    }

    #[test]
    fn test_synthesize_ignores_unknown_ids() {
        let ids = vec!["ni-risk".to_string(), "bogus".to_string(), "gen-risk".to_string()];
        let tasks = synthesize(ProjectType::NuclearIsland, DesignStage::Preliminary, &ids);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.category_id == "ni-risk"));
    }

    #[test]
    fn test_synthesize_twice_gives_independent_ids() {
        let ids = catalog::category_ids(ProjectType::Other, DesignStage::Schematic);
        let a = synthesize(ProjectType::Other, DesignStage::Schematic, &ids);
        let b = synthesize(ProjectType::Other, DesignStage::Schematic, &ids);
        assert!(a.iter().zip(&b).all(|(x, y)| x.id != y.id && x.content == y.content));
    }

    #[test]
    fn test_synthesize_minimal() {
        let ids = catalog::category_ids(ProjectType::AuxiliaryIndustrial, DesignStage::Schematic);
        let tasks = synthesize_minimal(ProjectType::AuxiliaryIndustrial, DesignStage::Schematic, &ids);
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn test_version_tags_and_file_kind() {
        assert_eq!(version_tag(0), "A");
        assert_eq!(version_tag(2), "C");
        assert_eq!(SubmissionFile::from_name("plan.DWG").kind, "dwg");
        assert_eq!(SubmissionFile::from_name("README").kind, "file");
    }
}
