//! Error types shared by the tracker core, stores and assistant.

use thiserror::Error;

/// Result alias using the tracker's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}. Check that the project server is reachable.")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Project '{0}' not found. Run `hvt projects` to see all projects.")]
    ProjectNotFound(String),

    #[error("Sub-project '{0}' not found.")]
    SubProjectNotFound(String),

    #[error("Task '{0}' not found.")]
    TaskNotFound(String),

    #[error("Version '{0}' not found.")]
    VersionNotFound(String),

    #[error("{0}")]
    Ambiguous(String),

    #[error("Already at the final design stage ({0}).")]
    TerminalStage(String),

    #[error("AI assistant unavailable: {0}")]
    AiUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
