//! Design-stage transitions.
//!
//! Advancing a sub-project merges the next stage's template tasks into the
//! existing list. Completed work from earlier stages is kept as it was; a
//! stage that was visited before is never synthesized twice.

use crate::catalog;
use crate::fields::DesignStage;
use crate::subproject::SubProject;
use crate::task;

pub fn can_advance(sp: &SubProject) -> bool {
    !sp.stage.is_terminal()
}

/// Move a sub-project to the next design stage.
///
/// At construction drawing this returns an unchanged copy. Enabled
/// categories carry over where the next stage defines them; when none carry
/// over, every category of the next stage is enabled.
pub fn advance_stage(sp: &SubProject) -> SubProject {
    let Some(next_stage) = sp.stage.next() else {
        return sp.clone();
    };
    let mut next = sp.clone();

    if !next.stage_history.contains(&sp.stage) {
        next.stage_history.push(sp.stage);
        next.stage_history.sort();
    }
    next.stage_history.retain(|s| *s != next_stage);

    let valid = catalog::category_ids(sp.project_type, next_stage);
    let carried: Vec<String> = valid
        .iter()
        .filter(|id| sp.enabled_category_ids.contains(*id))
        .cloned()
        .collect();
    next.enabled_category_ids = if carried.is_empty() {
        tracing::debug!(
            sub_project = %sp.id,
            stage = ?next_stage,
            "no enabled category carries over, enabling all"
        );
        valid
    } else {
        carried
    };

    let visited = sp.tasks.iter().any(|t| t.stage == next_stage);
    if !visited {
        let batch = task::synthesize(sp.project_type, next_stage, &next.enabled_category_ids);
        tracing::debug!(sub_project = %sp.id, stage = ?next_stage, added = batch.len(), "stage tasks synthesized");
        next.tasks.extend(batch);
    }

    next.stage = next_stage;
    next
}

/// Tasks completed out of total for one stage.
pub fn stage_completion(sp: &SubProject, stage: DesignStage) -> (usize, usize) {
    let tasks: Vec<_> = sp.tasks_for_stage(stage).collect();
    let done = tasks.iter().filter(|t| t.is_completed).count();
    (done, tasks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ProjectType;
    use crate::mutation::toggle_complete;
    use crate::task::TaskItem;

    fn count(sp: &SubProject, stage: DesignStage) -> usize {
        sp.tasks_for_stage(stage).count()
    }

    #[test]
    fn test_advance_appends_next_stage_tasks() {
        let sp = SubProject::new("Chlorine station", "01UTL", ProjectType::AuxiliaryIndustrial, DesignStage::Schematic);
        let before = sp.tasks.len();
        let next = advance_stage(&sp);
        assert_eq!(next.stage, DesignStage::Preliminary);
        assert_eq!(next.stage_history, vec![DesignStage::Schematic]);
        assert_eq!(count(&next, DesignStage::Schematic), before);
        assert_eq!(count(&next, DesignStage::Preliminary), 5);
        // Input is untouched.
        assert_eq!(sp.stage, DesignStage::Schematic);
    }

    #[test]
    fn test_advance_past_terminal_is_noop() {
        let sp = SubProject::new("A", "1", ProjectType::NuclearIsland, DesignStage::Schematic);
        let last = advance_stage(&advance_stage(&sp));
        assert_eq!(last.stage, DesignStage::ConstructionDrawing);
        assert!(!can_advance(&last));
        let again = advance_stage(&last);
        let again = advance_stage(&again);
        assert_eq!(again, last);
    }

    #[test]
    fn test_enabled_categories_never_empty() {
        let mut sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        sp.enabled_category_ids = vec!["not-in-catalog".into()];
        let next = advance_stage(&sp);
        assert_eq!(next.enabled_category_ids, catalog::category_ids(ProjectType::Other, DesignStage::Preliminary));

        sp.enabled_category_ids.clear();
        let next = advance_stage(&sp);
        assert!(!next.enabled_category_ids.is_empty());
    }

    #[test]
    fn test_enabled_subset_carries_over() {
        let mut sp = SubProject::new("A", "1", ProjectType::NuclearIsland, DesignStage::Schematic);
        sp.enabled_category_ids = vec!["ni-deliver".into(), "ni-risk".into()];
        let next = advance_stage(&sp);
        // Catalog order, not insertion order.
        assert_eq!(next.enabled_category_ids, vec!["ni-risk", "ni-deliver"]);
        assert_eq!(count(&next, DesignStage::Preliminary), 3);
    }

    #[test]
    fn test_revisited_stage_is_not_duplicated() {
        let sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        let mut moved = advance_stage(&sp);
        let preliminary = count(&moved, DesignStage::Preliminary);
        // Step back by hand, as an edited document might.
        moved.stage = DesignStage::Schematic;
        let again = advance_stage(&moved);
        assert_eq!(count(&again, DesignStage::Preliminary), preliminary);
        assert_eq!(again.tasks.len(), moved.tasks.len());
        assert!(!again.stage_history.contains(&DesignStage::Preliminary));
    }

    #[test]
    fn test_completion_survives_advance() {
        let sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        let target = sp.tasks[1].id.clone();
        let sp = toggle_complete(&sp, &target);
        let next = advance_stage(&sp);
        let kept: &TaskItem = next.task(&target).unwrap();
        assert!(kept.is_completed);
        assert_eq!(kept.stage, DesignStage::Schematic);
        assert_eq!(stage_completion(&next, DesignStage::Schematic), (1, 4));
        assert_eq!(stage_completion(&next, DesignStage::Preliminary), (0, 4));
    }
}
