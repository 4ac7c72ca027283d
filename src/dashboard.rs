//! Derived view state for the dashboard and the `status` / `tasks` commands.
//!
//! Nothing here is stored. Progress and grouping are recomputed from a
//! sub-project whenever a view is drawn.

use crate::catalog;
use crate::fields::{DesignStage, TaskGroup};
use crate::subproject::SubProject;
use crate::task::TaskItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    fn of<'a>(tasks: impl Iterator<Item = &'a TaskItem>) -> Self {
        tasks.fold(Progress::default(), |acc, t| Progress {
            done: acc.done + usize::from(t.is_completed),
            total: acc.total + 1,
        })
    }

    /// Rounded percentage; an empty set is 0%.
    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            return 0;
        }
        ((self.done as f64 / self.total as f64) * 100.0).round() as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupProgress {
    pub group: TaskGroup,
    pub progress: Progress,
}

/// Progress of each task group within one stage, in group order.
pub fn group_progress(sp: &SubProject, stage: DesignStage) -> Vec<GroupProgress> {
    TaskGroup::ALL
        .iter()
        .map(|&group| GroupProgress {
            group,
            progress: Progress::of(sp.tasks_for_stage(stage).filter(|t| t.group == group)),
        })
        .collect()
}

pub fn stage_progress(sp: &SubProject, stage: DesignStage) -> Progress {
    Progress::of(sp.tasks_for_stage(stage))
}

/// Tasks of one category as shown under a heading.
#[derive(Debug, Clone)]
pub struct CategorySection<'a> {
    pub category_id: String,
    pub name: String,
    pub group: TaskGroup,
    /// The category is not defined in the template catalog for this stage.
    pub orphan: bool,
    pub tasks: Vec<&'a TaskItem>,
}

/// Filters for [`sections`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionFilter {
    pub group: Option<TaskGroup>,
    /// Only tasks flagged for the executive view.
    pub minimal: bool,
}

/// Whether a task matches a template item flagged for the executive view.
pub fn is_minimal(sp: &SubProject, task: &TaskItem) -> bool {
    catalog::find_category(sp.project_type, task.stage, &task.category_id)
        .map(|cat| cat.items.iter().any(|i| i.minimal && i.content == task.content))
        .unwrap_or(false)
}

/// Group a stage's tasks by category.
///
/// Catalog categories come first in catalog order, followed by orphan
/// categories in order of first appearance. Empty sections are omitted.
pub fn sections<'a>(sp: &'a SubProject, stage: DesignStage, filter: SectionFilter) -> Vec<CategorySection<'a>> {
    let mut out: Vec<CategorySection<'a>> = catalog::categories(sp.project_type, stage)
        .iter()
        .map(|cat| CategorySection {
            category_id: cat.id.to_string(),
            name: cat.name.to_string(),
            group: cat.group,
            orphan: false,
            tasks: Vec::new(),
        })
        .collect();

    let visible = sp
        .tasks_for_stage(stage)
        .filter(|t| filter.group.map_or(true, |g| t.group == g))
        .filter(|t| !filter.minimal || is_minimal(sp, t));

    for task in visible {
        match out.iter_mut().find(|s| s.category_id == task.category_id) {
            Some(section) => section.tasks.push(task),
            None => out.push(CategorySection {
                category_id: task.category_id.clone(),
                name: if task.category.is_empty() {
                    task.category_id.clone()
                } else {
                    task.category.clone()
                },
                group: task.group,
                orphan: sp.is_orphan(task),
                tasks: vec![task],
            }),
        }
    }

    out.retain(|s| !s.tasks.is_empty());
    out
}

/// Stages that can be viewed, with whether each is read-only.
pub fn stage_tabs(sp: &SubProject) -> Vec<(DesignStage, bool)> {
    sp.visited_stages()
        .into_iter()
        .map(|s| (s, sp.is_read_only(s)))
        .collect()
}
