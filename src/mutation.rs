//! Task mutation operations.
//!
//! Each operation takes a sub-project by reference and returns the updated
//! copy. Unknown task ids and version tags leave the sub-project unchanged.
//! None of these check whether the task belongs to the current stage; the
//! caller decides what is editable.

use crate::catalog;
use crate::fields::{DesignStage, TaskGroup};
use crate::subproject::SubProject;
use crate::task::{new_id, version_tag, SubmissionFile, SubmissionVersion, TaskItem};

fn update_task(sp: &SubProject, task_id: &str, f: impl FnOnce(&mut TaskItem)) -> SubProject {
    let mut next = sp.clone();
    if let Some(task) = next.tasks.iter_mut().find(|t| t.id == task_id) {
        f(task);
    }
    next
}

pub fn toggle_complete(sp: &SubProject, task_id: &str) -> SubProject {
    update_task(sp, task_id, |t| t.is_completed = !t.is_completed)
}

pub fn delete_task(sp: &SubProject, task_id: &str) -> SubProject {
    let mut next = sp.clone();
    next.tasks.retain(|t| t.id != task_id);
    next
}

/// Attach a new submission version to a task, most recent first.
///
/// The tag is the letter at the task's current version count, so after a
/// deletion the next tag can repeat one that was used before: with versions
/// B and A, deleting A and adding again yields a second B.
pub fn add_version(sp: &SubProject, task_id: &str, files: Vec<SubmissionFile>, date: &str) -> SubProject {
    update_task(sp, task_id, |t| {
        let version = SubmissionVersion {
            version: version_tag(t.versions.len()),
            date: date.to_string(),
            files,
        };
        t.versions.insert(0, version);
    })
}

pub fn delete_version(sp: &SubProject, task_id: &str, tag: &str) -> SubProject {
    update_task(sp, task_id, |t| t.versions.retain(|v| v.version != tag))
}

/// Append a hand-written task.
pub fn add_ad_hoc_task(
    sp: &SubProject,
    group: TaskGroup,
    category: &str,
    category_id: &str,
    content: &str,
    stage: DesignStage,
) -> SubProject {
    let mut next = sp.clone();
    next.tasks.push(TaskItem {
        id: new_id("t"),
        category_id: category_id.to_string(),
        category: category.to_string(),
        group,
        stage,
        content: content.to_string(),
        is_completed: false,
        versions: Vec::new(),
    });
    next
}

/// Replace the enabled categories of the current stage.
///
/// Ids outside the catalog for the current stage are dropped, the rest kept
/// in catalog order. Newly enabled categories that have no tasks in the
/// current stage get their template tasks; disabling never removes tasks.
pub fn set_enabled_categories(sp: &SubProject, ids: &[String]) -> SubProject {
    let valid = catalog::category_ids(sp.project_type, sp.stage);
    let enabled: Vec<String> = valid.into_iter().filter(|id| ids.contains(id)).collect();

    let missing: Vec<String> = enabled
        .iter()
        .filter(|id| {
            !sp.tasks
                .iter()
                .any(|t| t.stage == sp.stage && &t.category_id == *id)
        })
        .cloned()
        .collect();

    let mut next = sp.clone();
    next.tasks
        .extend(crate::task::synthesize(sp.project_type, sp.stage, &missing));
    next.enabled_category_ids = enabled;
    next
}

/// Copy the tasks of another sub-project that the target lacks.
///
/// A task is considered present when one with the same content and category
/// exists. Copies get fresh ids, start incomplete and carry no versions.
/// Enabled categories valid for the target's current stage are merged in.
pub fn import_settings(target: &SubProject, source: &SubProject) -> SubProject {
    let mut next = target.clone();
    let imported: Vec<TaskItem> = source
        .tasks
        .iter()
        .filter(|s| {
            !target
                .tasks
                .iter()
                .any(|t| t.content == s.content && t.category == s.category)
        })
        .map(|s| TaskItem {
            id: new_id("imported"),
            is_completed: false,
            versions: Vec::new(),
            ..s.clone()
        })
        .collect();

    for t in &imported {
        if !next.stage_history.contains(&t.stage) && t.stage != next.stage {
            next.stage_history.push(t.stage);
        }
    }
    next.stage_history.sort();
    next.tasks.extend(imported);

    let valid = catalog::category_ids(target.project_type, target.stage);
    for id in &source.enabled_category_ids {
        if valid.contains(id) && !next.enabled_category_ids.contains(id) {
            next.enabled_category_ids.push(id.clone());
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ProjectType;

    fn sample() -> SubProject {
        SubProject::new("Chlorine station", "01UTL", ProjectType::Other, DesignStage::Schematic)
    }

    fn files(names: &[&str]) -> Vec<SubmissionFile> {
        names.iter().map(|n| SubmissionFile::from_name(n)).collect()
    }

    #[test]
    fn test_toggle_twice_restores() {
        let sp = sample();
        let id = sp.tasks[0].id.clone();
        let once = toggle_complete(&sp, &id);
        assert!(once.task(&id).unwrap().is_completed);
        let twice = toggle_complete(&once, &id);
        assert_eq!(twice, sp);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let sp = sample();
        assert_eq!(toggle_complete(&sp, "nope"), sp);
        assert_eq!(delete_task(&sp, "nope"), sp);
        assert_eq!(add_version(&sp, "nope", files(&["a.pdf"]), "2024-06-01"), sp);
        let id = sp.tasks[0].id.clone();
        assert_eq!(delete_version(&sp, &id, "Z"), sp);
    }

    #[test]
    fn test_delete_task() {
        let sp = sample();
        let id = sp.tasks[2].id.clone();
        let next = delete_task(&sp, &id);
        assert_eq!(next.tasks.len(), sp.tasks.len() - 1);
        assert!(next.task(&id).is_none());
    }

    #[test]
    fn test_versions_are_prepended_with_sequential_tags() {
        let sp = sample();
        let id = sp.tasks[0].id.clone();
        let sp = add_version(&sp, &id, files(&["a.dwg"]), "2024-06-01");
        let sp = add_version(&sp, &id, files(&["b.dwg", "b.pdf"]), "2024-06-02");
        let tags: Vec<&str> = sp.task(&id).unwrap().versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(tags, vec!["B", "A"]);
        assert_eq!(sp.task(&id).unwrap().versions[0].files.len(), 2);
    }

    #[test]
    fn test_tag_reused_after_deletion() {
        let sp = sample();
        let id = sp.tasks[0].id.clone();
        let sp = add_version(&sp, &id, files(&["a.pdf"]), "d1");
        let sp = add_version(&sp, &id, files(&["b.pdf"]), "d2");
        let sp = delete_version(&sp, &id, "A");
        let sp = add_version(&sp, &id, files(&["c.pdf"]), "d3");
        let tags: Vec<&str> = sp.task(&id).unwrap().versions.iter().map(|v| v.version.as_str()).collect();
        // Documented collision: the count after deletion is 1, so the new tag is B again.
        assert_eq!(tags, vec!["B", "B"]);
    }

    #[test]
    fn test_add_ad_hoc_task() {
        let sp = sample();
        let next = add_ad_hoc_task(&sp, TaskGroup::RiskControl, "Smoke control", "custom-smoke", "Verify smoke exhaust", DesignStage::Schematic);
        let added = next.tasks.last().unwrap();
        assert_eq!(next.tasks.len(), sp.tasks.len() + 1);
        assert!(!added.is_completed && added.versions.is_empty());
        assert_eq!(added.category_id, "custom-smoke");
        assert!(next.is_orphan(added));
    }

    #[test]
    fn test_set_enabled_categories_synthesizes_missing_only() {
        let mut sp = sample();
        sp.tasks.retain(|t| t.category_id != "gen-risk");
        sp.enabled_category_ids = vec!["gen-interface".into()];
        let next = set_enabled_categories(&sp, &["gen-risk".into(), "gen-interface".into(), "bogus".into()]);
        assert_eq!(next.enabled_category_ids, vec!["gen-interface", "gen-risk"]);
        assert_eq!(next.tasks.len(), sp.tasks.len() + 1);

        let disabled = set_enabled_categories(&next, &[]);
        assert!(disabled.enabled_category_ids.is_empty());
        assert_eq!(disabled.tasks.len(), next.tasks.len());
    }

    #[test]
    fn test_import_settings_copies_missing_tasks_reset() {
        let target = sample();
        let mut source = SubProject::new("Other", "2", ProjectType::NuclearIsland, DesignStage::Schematic);
        let sid = source.tasks[0].id.clone();
        source = toggle_complete(&source, &sid);
        source = add_version(&source, &sid, files(&["x.pdf"]), "d");
        let first = source.tasks[0].clone();
        let duplicate = TaskItem { id: "dup".into(), ..target.tasks[0].clone() };
        source.tasks.push(duplicate);

        let next = import_settings(&target, &source);
        assert_eq!(next.tasks.len(), target.tasks.len() + 5);
        let copied = next.tasks.iter().find(|t| t.content == first.content).unwrap();
        assert_ne!(copied.id, first.id);
        assert!(!copied.is_completed && copied.versions.is_empty());
        // Nuclear-island categories are not valid for a general sub-project.
        assert_eq!(next.enabled_category_ids, target.enabled_category_ids);
    }
}
