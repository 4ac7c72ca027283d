//! # HVT - HVAC Design-Stage Checklist Tracker
//!
//! A command-line tracker for HVAC design teams working through the design
//! stages of a building: schematic, preliminary and construction drawing.
//!
//! ## Key Features
//!
//! - **Template Checklists**: Each sub-project gets tasks synthesized from a
//!   catalog keyed by building type and stage, grouped as interface
//!   coordination, risk control and deliverables
//! - **Stage Progression**: Advancing freezes the finished stage as read-only
//!   history and adds the next stage's checklist
//! - **Submission Versions**: Lettered versions (A, B, ...) with attached file names
//! - **Plans and Design Input**: Milestone calendar with CSV import, plus a
//!   free-text design-input note
//! - **Reference Library**: Mandatory code clauses and common design errors
//! - **AI Assistant**: Check-up questions, design-input review and chat, with
//!   offline answers when no API key is set
//! - **Two Stores**: Local JSON files or a project server over HTTP
//!
//! ## Quick Start
//!
//! ```bash
//! # Create the demo project
//! hvt seed
//!
//! # Progress of the current sub-project
//! hvt status
//!
//! # Tick a task by id or by the start of its text
//! hvt toggle 当前阶段
//!
//! # Launch the dashboard
//! hvt ui
//! ```
//!
//! Data is stored in `~/.hvt/` with each main project as a separate JSON file.
//! Every change is saved in the background; the queue is drained before exit.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod assistant;
pub mod autosave;
pub mod calendar;
pub mod catalog;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod fields;
pub mod gallery;
pub mod library;
pub mod mutation;
pub mod project;
pub mod remote;
pub mod session;
pub mod stage;
pub mod subproject;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod utils;
}

use assistant::Assistant;
use cli::Cli;
use cmd::*;
use config::Config;
use db::{FileStore, ProjectStore};
use remote::HttpStore;
use session::Session;

fn init_tracing(quiet: bool) {
    let directive = if quiet { "hvac_tracker=warn" } else { "hvac_tracker=info" };
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::WARN.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // The dashboard owns the terminal, so only warnings reach stderr there.
    init_tracing(matches!(cli.command, Commands::Ui));

    let mut config = Config::load()?;

    // Handle commands that don't need a session first
    match &cli.command {
        Commands::Config { action } => return cmd_config(&mut config, action.clone()),
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return Ok(());
        }
        Commands::Library { action } => {
            cmd_library(action.clone());
            return Ok(());
        }
        _ => {}
    }

    let store: Arc<dyn ProjectStore> = match cli.remote.clone().or_else(|| config.remote.base_url.clone()) {
        Some(base_url) => Arc::new(HttpStore::from_env(&base_url, config.remote.timeout_secs)?),
        None => {
            let dir = cli.data_dir.clone().unwrap_or_else(|| config.resolved_data_dir());
            Arc::new(FileStore::new(dir))
        }
    };
    tracing::debug!(store = %store.describe(), "opening session");

    let mut session = Session::open(store).await?;
    let assistant = Assistant::from_config(&config.ai)?;

    let result = run(&mut session, &assistant, &cli).await;
    let stats = session.close().await;
    tracing::debug!(written = stats.written, skipped = stats.skipped, failed = stats.failed, deleted = stats.deleted, "saves drained");

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    if stats.failed > 0 {
        eprintln!("Error: {} change(s) could not be saved", stats.failed);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(session: &mut Session, assistant: &Assistant, cli: &Cli) -> error::Result<()> {
    if let Some(project) = cli.project.as_deref() {
        session.select_project(project)?;
    }
    if let Some(sub) = cli.sub.as_deref() {
        session.select_sub_project(sub)?;
    }

    match cli.command.clone() {
        Commands::Config { .. } | Commands::Completions { .. } | Commands::Library { .. } => Ok(()),

        Commands::Ui => cmd_ui(session, assistant).await,

        Commands::Projects => cmd_projects(session),

        Commands::New { action } => cmd_new(session, action),

        Commands::Remove { action } => cmd_remove(session, action).await,

        Commands::Seed => cmd_seed(session),

        Commands::Status => cmd_status(session),

        Commands::Tasks { stage, group, minimal } => cmd_tasks(session, stage, group, minimal),

        Commands::Toggle { task } => cmd_toggle(session, task),

        Commands::AddTask { content, category, group, category_id } =>
            cmd_add_task(session, content, category, group, category_id),

        Commands::DeleteTask { task, yes } => cmd_delete_task(session, task, yes),

        Commands::Advance => cmd_advance(session),

        Commands::Categories { enable, disable } => cmd_categories(session, enable, disable),

        Commands::ImportSettings { from, from_project } => cmd_import_settings(session, from, from_project),

        Commands::Version { action } => cmd_version(session, action),

        Commands::Plan { action } => cmd_plan(session, action),

        Commands::Input { action } => cmd_input(session, action),

        Commands::Gallery { action } => cmd_gallery(session, action),

        Commands::Ai { action } => cmd_ai(session, assistant, action).await,
    }
}
