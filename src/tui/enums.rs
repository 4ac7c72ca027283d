//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    Dashboard,
    Help,
    Confirm,
    AddTask,
    /// Popup showing an assistant answer.
    Answer,
}

/// A destructive action waiting for y/n.
#[derive(Clone, PartialEq, Debug)]
pub enum PendingAction {
    DeleteTask { id: String, content: String },
    AdvanceStage,
}

/// One line of the task table: a category heading or a task.
#[derive(Clone, PartialEq, Debug)]
pub enum DashboardRow {
    Section { name: String, group: crate::fields::TaskGroup, orphan: bool },
    Task { id: String },
}
