//! Main projects and identifier resolution.
//!
//! A main project owns its sub-projects and is the unit of persistence: one
//! document per main project. Sub-projects and tasks are addressed on the
//! command line either by id or by a case-insensitive name.

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::calendar::DesignPlan;
use crate::error::{Error, Result};
use crate::fields::{DesignStage, ProjectType};
use crate::subproject::{self, text, SubProject};
use crate::task::TaskItem;

pub const DEFAULT_PROJECT_NAME: &str = "Untitled project";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainProject {
    pub id: String,
    pub name: String,
    pub code: String,
    /// Set by the server for projects listed to administrators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub sub_projects: Vec<SubProject>,
}

impl MainProject {
    pub fn new(name: &str, code: &str) -> Self {
        MainProject {
            id: format!("mp_{}", Utc::now().timestamp_millis()),
            name: name.to_string(),
            code: code.to_string(),
            owner: None,
            sub_projects: Vec::new(),
        }
    }

    /// Normalize a main-project document of unknown shape.
    ///
    /// Entries of `subProjects` that are not objects are dropped; every other
    /// entry goes through [`subproject::ensure_valid`].
    pub fn ensure_valid(raw: &Value) -> MainProject {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);
        let sub_projects = obj
            .get("subProjects")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter(|v| v.is_object())
                    .map(subproject::ensure_valid)
                    .collect()
            })
            .unwrap_or_default();

        MainProject {
            id: text(obj, "id").unwrap_or_else(|| format!("mp_{}", Utc::now().timestamp_millis())),
            name: text(obj, "name").unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            code: text(obj, "code").unwrap_or_default(),
            owner: text(obj, "owner"),
            sub_projects,
        }
    }

    pub fn sub_project(&self, id: &str) -> Option<&SubProject> {
        self.sub_projects.iter().find(|sp| sp.id == id)
    }

    /// Replace the sub-project with the same id. Returns false when absent.
    pub fn replace_sub_project(&mut self, sp: SubProject) -> bool {
        match self.sub_projects.iter_mut().find(|s| s.id == sp.id) {
            Some(slot) => {
                *slot = sp;
                true
            }
            None => false,
        }
    }

    pub fn task_count(&self) -> usize {
        self.sub_projects.iter().map(|sp| sp.tasks.len()).sum()
    }
}

/// The demo project offered on first run.
pub fn seed_project() -> MainProject {
    let mut sp = SubProject::new(
        "氯气制备站",
        "01UTL",
        ProjectType::AuxiliaryIndustrial,
        DesignStage::Preliminary,
    );
    sp.id = "sp1".to_string();
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    sp.plans.push(DesignPlan {
        id: "p1".to_string(),
        name: "初步设计提交".to_string(),
        date: today,
    });
    sp.design_input_content = [
        "1. 室外计算参数按连云港气象参数执行。",
        "2. 室内设计温度：夏季26±2℃，冬季18±2℃。",
        "3. 氯气储存间需设置事故通风系统，换气次数不小于12次/h。",
        "4. 所有通风设备需采用防爆型。",
    ]
    .join("\n");

    MainProject {
        id: "mp1".to_string(),
        name: "田湾核电项目".to_string(),
        code: "0603".to_string(),
        owner: None,
        sub_projects: vec![sp],
    }
}

/// Convert a display name to a safe name for file naming.
/// Lowercases and collapses every run of non-alphanumeric characters to one underscore.
pub fn sanitize_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn ambiguous<'a>(kind: &str, ident: &str, matches: impl Iterator<Item = (&'a str, &'a str)>) -> Error {
    let mut msg = format!("Multiple {} match '{}':\n", kind, ident);
    for (id, label) in matches {
        msg.push_str(&format!("  {}: {}\n", id, label));
    }
    msg.push_str("Please use the specific ID instead.");
    Error::Ambiguous(msg)
}

/// Resolve a main project by id, code, or case-insensitive name.
pub fn resolve_project<'a>(projects: &'a [MainProject], ident: &str) -> Result<&'a MainProject> {
    if let Some(p) = projects.iter().find(|p| p.id == ident) {
        return Ok(p);
    }
    let needle = ident.to_lowercase();
    let matches: Vec<&MainProject> = projects
        .iter()
        .filter(|p| p.name.to_lowercase() == needle || p.code == ident)
        .collect();
    match matches.len() {
        0 => Err(Error::ProjectNotFound(ident.to_string())),
        1 => Ok(matches[0]),
        _ => Err(ambiguous(
            "projects",
            ident,
            matches.iter().map(|p| (p.id.as_str(), p.name.as_str())),
        )),
    }
}

/// Resolve a sub-project by id, code, or case-insensitive name.
pub fn resolve_sub_project<'a>(project: &'a MainProject, ident: &str) -> Result<&'a SubProject> {
    if let Some(sp) = project.sub_project(ident) {
        return Ok(sp);
    }
    let needle = ident.to_lowercase();
    let matches: Vec<&SubProject> = project
        .sub_projects
        .iter()
        .filter(|sp| sp.name.to_lowercase() == needle || sp.code == ident)
        .collect();
    match matches.len() {
        0 => Err(Error::SubProjectNotFound(ident.to_string())),
        1 => Ok(matches[0]),
        _ => Err(ambiguous(
            "sub-projects",
            ident,
            matches.iter().map(|sp| (sp.id.as_str(), sp.name.as_str())),
        )),
    }
}

/// Resolve a task by id or by a unique prefix of its content.
pub fn resolve_task<'a>(sp: &'a SubProject, ident: &str) -> Result<&'a TaskItem> {
    if let Some(t) = sp.task(ident) {
        return Ok(t);
    }
    let needle = ident.trim().to_lowercase();
    if needle.is_empty() {
        return Err(Error::TaskNotFound(ident.to_string()));
    }
    let mut matches: Vec<&TaskItem> = sp
        .tasks
        .iter()
        .filter(|t| t.content.to_lowercase().starts_with(&needle))
        .collect();
    // Earlier stages repeat template items; a prefix names the current one.
    if matches.len() > 1 && matches.iter().any(|t| t.stage == sp.stage) {
        matches.retain(|t| t.stage == sp.stage);
    }
    match matches.len() {
        0 => Err(Error::TaskNotFound(ident.to_string())),
        1 => Ok(matches[0]),
        _ => Err(ambiguous(
            "tasks",
            ident,
            matches.iter().map(|t| (t.id.as_str(), t.content.as_str())),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My Project"), "my_project");
        assert_eq!(sanitize_name("mp_1712-x"), "mp_1712_x");
        assert_eq!(sanitize_name("Special!@#$%Characters"), "special_characters");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_ensure_valid_main_project() {
        let mp = MainProject::ensure_valid(&json!({
            "id": "mp9",
            "code": 603,
            "subProjects": [{ "id": "a", "tasks": [] }, "junk", null, { "id": "b" }]
        }));
        assert_eq!(mp.id, "mp9");
        assert_eq!(mp.name, DEFAULT_PROJECT_NAME);
        assert_eq!(mp.code, "603");
        assert_eq!(mp.sub_projects.len(), 2);
        assert_eq!(mp.sub_projects[1].tasks.len(), 4);

        let again = MainProject::ensure_valid(&serde_json::to_value(&mp).unwrap());
        assert_eq!(again, mp);
    }

    #[test]
    fn test_ensure_valid_without_sub_projects() {
        let mp = MainProject::ensure_valid(&json!({ "subProjects": {} }));
        assert!(mp.id.starts_with("mp_"));
        assert!(mp.sub_projects.is_empty());
        assert_eq!(mp.owner, None);
    }

    #[test]
    fn test_seed_project_shape() {
        let mp = seed_project();
        assert_eq!(mp.code, "0603");
        let sp = &mp.sub_projects[0];
        assert_eq!(sp.project_type, ProjectType::AuxiliaryIndustrial);
        assert_eq!(sp.stage, DesignStage::Preliminary);
        assert_eq!(sp.tasks.len(), 5);
        assert_eq!(sp.plans.len(), 1);
        assert!(sp.design_input_content.contains("防爆"));
    }

    #[test]
    fn test_resolution() {
        let mut mp = seed_project();
        mp.sub_projects.push(SubProject::new("Pump house", "02PH", ProjectType::Other, DesignStage::Schematic));
        let projects = vec![mp];

        assert_eq!(resolve_project(&projects, "0603").unwrap().id, "mp1");
        assert!(matches!(resolve_project(&projects, "nope"), Err(Error::ProjectNotFound(_))));

        let mp = &projects[0];
        assert_eq!(resolve_sub_project(mp, "pump HOUSE").unwrap().code, "02PH");
        assert_eq!(resolve_sub_project(mp, "sp1").unwrap().name, "氯气制备站");

        let sp = resolve_sub_project(mp, "02PH").unwrap();
        let first = &sp.tasks[0];
        assert_eq!(resolve_task(sp, &first.id).unwrap().id, first.id);
        assert_eq!(resolve_task(sp, "当前阶段").unwrap().category_id, "gen-deliver");
        assert!(matches!(resolve_task(sp, "多专业接口条件"), Ok(_)));
        assert!(matches!(resolve_task(sp, ""), Err(Error::TaskNotFound(_))));
    }

    #[test]
    fn test_ambiguous_task_prefix() {
        let sp = SubProject::new("A", "1", ProjectType::NuclearIsland, DesignStage::Schematic);
        // Both nuclear-island interface items start with "核岛".
        assert!(matches!(resolve_task(&sp, "核岛"), Err(Error::Ambiguous(_))));
    }

    #[test]
    fn test_task_prefix_prefers_current_stage_after_advance() {
        let sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        let old_id = resolve_task(&sp, "关键边界条件").unwrap().id.clone();
        let sp = crate::stage::advance_stage(&sp);
        assert_eq!(sp.stage, DesignStage::Preliminary);

        let found = resolve_task(&sp, "关键边界条件").unwrap();
        assert_eq!(found.stage, DesignStage::Preliminary);
        assert_ne!(found.id, old_id);
        // The history item stays reachable by id.
        assert_eq!(resolve_task(&sp, &old_id).unwrap().stage, DesignStage::Schematic);
    }

    #[test]
    fn test_seed_project_resolves_deliverable_prefix() {
        let mp = seed_project();
        let task = resolve_task(&mp.sub_projects[0], "当前阶段").unwrap();
        assert_eq!(task.stage, mp.sub_projects[0].stage);
    }

    #[test]
    fn test_prefix_only_in_history_still_resolves() {
        let mut sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        sp.tasks[0].content = "只在方案阶段出现的检查项".into();
        let sp = crate::stage::advance_stage(&sp);
        let found = resolve_task(&sp, "只在方案阶段").unwrap();
        assert_eq!(found.stage, DesignStage::Schematic);
    }
}
