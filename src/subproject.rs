//! Sub-project state and boundary normalization.
//!
//! A `SubProject` is one building or unit within a main project. It carries
//! the selected template (type and stage), the categories enabled for the
//! current stage, and the live task list. Documents of unknown shape are
//! turned into well-formed sub-projects by [`ensure_valid`], which is the only
//! way external data enters the core.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::calendar::DesignPlan;
use crate::catalog;
use crate::fields::{DesignStage, ProjectType, TaskGroup};
use crate::gallery::GalleryItem;
use crate::task::{self, new_id, SubmissionFile, SubmissionVersion, TaskItem};

pub const DEFAULT_SUB_PROJECT_NAME: &str = "Untitled sub-project";
pub const DEFAULT_SUB_PROJECT_CODE: &str = "0000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubProject {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub stage: DesignStage,
    /// Previously occupied stages, in stage order, never the current one.
    pub stage_history: Vec<DesignStage>,
    pub enabled_category_ids: Vec<String>,
    pub tasks: Vec<TaskItem>,
    pub plans: Vec<DesignPlan>,
    pub design_input_content: String,
    pub gallery: Vec<GalleryItem>,
}

impl SubProject {
    /// Create a sub-project with every template category enabled and the
    /// matching tasks generated.
    pub fn new(name: &str, code: &str, project_type: ProjectType, stage: DesignStage) -> Self {
        let enabled = catalog::category_ids(project_type, stage);
        let tasks = task::synthesize(project_type, stage, &enabled);
        SubProject {
            id: new_id("sp"),
            name: name.to_string(),
            code: code.to_string(),
            project_type,
            stage,
            stage_history: Vec::new(),
            enabled_category_ids: enabled,
            tasks,
            plans: Vec::new(),
            design_input_content: String::new(),
            gallery: Vec::new(),
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskItem> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn tasks_for_stage(&self, stage: DesignStage) -> impl Iterator<Item = &TaskItem> {
        self.tasks.iter().filter(move |t| t.stage == stage)
    }

    /// History plus the current stage, in stage order.
    pub fn visited_stages(&self) -> Vec<DesignStage> {
        let mut stages = self.stage_history.clone();
        stages.push(self.stage);
        stages.sort();
        stages.dedup();
        stages
    }

    /// Tasks of stages other than the current one are shown read-only.
    pub fn is_read_only(&self, stage: DesignStage) -> bool {
        stage != self.stage
    }

    /// Whether a task's category is unknown to the template catalog for its stage.
    pub fn is_orphan(&self, task: &TaskItem) -> bool {
        catalog::find_category(self.project_type, task.stage, &task.category_id).is_none()
    }
}

/// Normalize a sub-project document of unknown shape.
///
/// Missing or unrecognised fields fall back to defaults: type `other`, stage
/// `schematic`, every category enabled, and a freshly synthesized task list
/// when `tasks` is absent or not a list. Present task entries are repaired
/// rather than dropped. The result is a fixed point: normalizing its own
/// serialization yields an equal value.
pub fn ensure_valid(raw: &Value) -> SubProject {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let project_type = text(obj, "type")
        .and_then(|s| ProjectType::from_label(&s))
        .unwrap_or_default();
    let stage = text(obj, "stage")
        .and_then(|s| DesignStage::from_label(&s))
        .unwrap_or_default();

    let enabled_category_ids = match obj.get("enabledCategoryIds").and_then(Value::as_array) {
        Some(list) => {
            let mut ids: Vec<String> = Vec::new();
            for id in list.iter().filter_map(Value::as_str) {
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            }
            ids
        }
        None => catalog::category_ids(project_type, stage),
    };

    let tasks = match obj.get("tasks").and_then(Value::as_array) {
        Some(list) => list
            .iter()
            .filter_map(|t| normalize_task(t, stage))
            .collect(),
        None => {
            tracing::debug!(?project_type, ?stage, "sub-project without task list, synthesizing");
            task::synthesize(project_type, stage, &enabled_category_ids)
        }
    };

    let mut stage_history: Vec<DesignStage> = obj
        .get("stageHistory")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .filter_map(DesignStage::from_label)
                .collect()
        })
        .unwrap_or_default();
    stage_history.extend(tasks.iter().map(|t| t.stage));
    stage_history.retain(|s| *s != stage);
    stage_history.sort();
    stage_history.dedup();

    SubProject {
        id: text(obj, "id").unwrap_or_else(|| format!("sp_gen_{}", Utc::now().timestamp_millis())),
        name: text(obj, "name").unwrap_or_else(|| DEFAULT_SUB_PROJECT_NAME.to_string()),
        code: text(obj, "code").unwrap_or_else(|| DEFAULT_SUB_PROJECT_CODE.to_string()),
        project_type,
        stage,
        stage_history,
        enabled_category_ids,
        tasks,
        plans: parse_list(obj, "plans"),
        design_input_content: obj
            .get("designInputContent")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        gallery: parse_list(obj, "gallery"),
    }
}

fn normalize_task(raw: &Value, sub_project_stage: DesignStage) -> Option<TaskItem> {
    let obj = raw.as_object()?;
    let category_id = text(obj, "categoryId").unwrap_or_default();
    let known = catalog::find_category_any(&category_id);

    let group = text(obj, "group")
        .and_then(|g| TaskGroup::from_label(&g))
        .or_else(|| known.map(|c| c.group))
        .unwrap_or(TaskGroup::Deliverable);
    let category = text(obj, "category")
        .or_else(|| known.map(|c| c.name.to_string()))
        .unwrap_or_default();

    let versions = obj
        .get("versions")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(normalize_version).collect())
        .unwrap_or_default();

    Some(TaskItem {
        id: text(obj, "id").unwrap_or_else(|| new_id("task")),
        category_id,
        category,
        group,
        stage: text(obj, "stage")
            .and_then(|s| DesignStage::from_label(&s))
            .unwrap_or(sub_project_stage),
        content: obj
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        is_completed: obj.get("isCompleted").and_then(Value::as_bool).unwrap_or(false),
        versions,
    })
}

fn normalize_version(raw: &Value) -> Option<SubmissionVersion> {
    let obj = raw.as_object()?;
    let files = obj
        .get("files")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_object)
                .filter_map(|f| {
                    let name = text(f, "name")?;
                    let kind = text(f, "type").unwrap_or_else(|| "file".to_string());
                    Some(SubmissionFile { name, kind })
                })
                .collect()
        })
        .unwrap_or_default();
    Some(SubmissionVersion {
        version: text(obj, "version")?,
        date: text(obj, "date").unwrap_or_default(),
        files,
    })
}

/// Non-empty string or number field, as text.
pub(crate) fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Entries of a list field that deserialize cleanly; the rest are dropped.
pub(crate) fn parse_list<T: serde::de::DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Vec<T> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(sp: &SubProject) -> SubProject {
        ensure_valid(&serde_json::to_value(sp).unwrap())
    }

    #[test]
    fn test_empty_document_gets_defaults_and_tasks() {
        let sp = ensure_valid(&json!({}));
        assert_eq!(sp.project_type, ProjectType::Other);
        assert_eq!(sp.stage, DesignStage::Schematic);
        assert_eq!(sp.enabled_category_ids, vec!["gen-interface", "gen-risk", "gen-deliver"]);
        assert_eq!(sp.tasks.len(), 4);
        assert_eq!(sp.name, DEFAULT_SUB_PROJECT_NAME);
        assert_eq!(sp.code, DEFAULT_SUB_PROJECT_CODE);
        assert!(sp.id.starts_with("sp_gen_"));
    }

    #[test]
    fn test_non_object_input_is_tolerated() {
        let sp = ensure_valid(&json!(42));
        assert_eq!(sp.tasks.len(), 4);
    }

    #[test]
    fn test_malformed_tasks_trigger_synthesis_with_enabled_subset() {
        let sp = ensure_valid(&json!({
            "type": "核岛厂房",
            "stage": "初步设计",
            "enabledCategoryIds": ["ni-risk"],
            "tasks": "oops"
        }));
        assert_eq!(sp.project_type, ProjectType::NuclearIsland);
        assert_eq!(sp.stage, DesignStage::Preliminary);
        assert_eq!(sp.tasks.len(), 2);
        assert!(sp.tasks.iter().all(|t| t.category_id == "ni-risk"));
    }

    #[test]
    fn test_malformed_task_entry_is_repaired_not_dropped() {
        let sp = ensure_valid(&json!({
            "id": "sp1",
            "stage": "preliminary",
            "tasks": [
                { "id": "t1", "categoryId": "gen-risk", "content": "check", "versions": "nope" },
                { "id": "t2", "group": "CALCULATION", "stage": "schematic", "isCompleted": true,
                  "versions": [{ "version": "A", "date": "2024-01-02", "files": [{ "name": "a.pdf" }] }, 7] },
                "not a task"
            ]
        }));
        assert_eq!(sp.tasks.len(), 2);
        let t1 = &sp.tasks[0];
        assert!(t1.versions.is_empty());
        assert_eq!(t1.group, TaskGroup::RiskControl);
        assert_eq!(t1.category, "安全与风险控制");
        assert_eq!(t1.stage, DesignStage::Preliminary);

        let t2 = &sp.tasks[1];
        assert_eq!(t2.group, TaskGroup::Deliverable);
        assert!(t2.is_completed);
        assert_eq!(t2.versions.len(), 1);
        assert_eq!(t2.versions[0].files[0].kind, "file");
        // A task from an earlier stage pulls that stage into the history.
        assert_eq!(sp.stage_history, vec![DesignStage::Schematic]);
    }

    #[test]
    fn test_present_empty_enabled_list_is_respected() {
        let sp = ensure_valid(&json!({ "enabledCategoryIds": [], "tasks": [] }));
        assert!(sp.enabled_category_ids.is_empty());
        assert!(sp.tasks.is_empty());
    }

    #[test]
    fn test_history_excludes_current_and_is_ordered() {
        let sp = ensure_valid(&json!({
            "stage": "construction-drawing",
            "stageHistory": ["preliminary", "schematic", "construction-drawing", "preliminary", "bogus"],
            "tasks": []
        }));
        assert_eq!(sp.stage_history, vec![DesignStage::Schematic, DesignStage::Preliminary]);
    }

    #[test]
    fn test_ensure_valid_is_idempotent() {
        let inputs = vec![
            json!({}),
            json!(null),
            json!({ "type": "附属工业厂房", "tasks": [{ "content": "x" }], "stageHistory": ["bad"] }),
            json!({ "code": 603, "plans": [{ "id": "p1", "name": "Issue", "date": "2024-06-01" }, { "bad": true }] }),
            json!({ "gallery": [{ "id": "g", "title": "t", "url": "u", "type": "pdf" }], "enabledCategoryIds": ["a", "a", "b"] }),
        ];
        for raw in inputs {
            let once = ensure_valid(&raw);
            let twice = roundtrip(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_numeric_code_kept_as_text() {
        let sp = ensure_valid(&json!({ "code": 603, "tasks": [] }));
        assert_eq!(sp.code, "603");
    }

    #[test]
    fn test_orphan_detection() {
        let mut sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        assert!(sp.tasks.iter().all(|t| !sp.is_orphan(t)));
        sp.tasks[0].category_id = "custom".into();
        assert!(sp.is_orphan(&sp.tasks[0]));
    }
}
