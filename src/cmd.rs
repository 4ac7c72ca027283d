//! Command implementations for the CLI interface.
//!
//! Handlers that work on projects take the open [`Session`] and return the
//! tracker's `Result`; `main` reports errors and sets the exit status after
//! queued saves have been written. Configuration, completions and the
//! reference library do not need a session.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::assistant::Assistant;
use crate::calendar::{self, DesignPlan};
use crate::catalog;
use crate::config::Config;
use crate::dashboard::{self, Progress, SectionFilter};
use crate::error::{Error, Result};
use crate::fields::*;
use crate::gallery::{self, GalleryItem};
use crate::library;
use crate::mutation;
use crate::project::{resolve_project, resolve_sub_project, resolve_task};
use crate::session::Session;
use crate::stage;
use crate::subproject::SubProject;
use crate::task::{self, SubmissionFile};
use crate::tui::run::run_tui;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Launch the dashboard for the current sub-project.
    Ui,

    /// List main projects and their sub-projects.
    Projects,

    /// Create a main project or a sub-project.
    New {
        #[command(subcommand)]
        action: NewAction,
    },

    /// Delete a main project or a sub-project.
    Remove {
        #[command(subcommand)]
        action: RemoveAction,
    },

    /// Create the demo project when no project exists yet.
    Seed,

    /// Show progress of the current sub-project.
    Status,

    /// List tasks grouped by category.
    Tasks {
        /// Stage to show. Defaults to the current stage.
        #[arg(long, value_enum)]
        stage: Option<DesignStage>,
        /// Only tasks of one group.
        #[arg(long, value_enum)]
        group: Option<TaskGroup>,
        /// Executive view: only the key checklist items.
        #[arg(long)]
        minimal: bool,
    },

    /// Toggle completion of a task.
    Toggle {
        /// Task ID or unique content prefix
        task: String,
    },

    /// Add a hand-written task to the current stage.
    AddTask {
        /// Task text.
        content: String,
        /// Category name. Matches a template category by name when possible.
        #[arg(long)]
        category: String,
        /// Group: interface-coordination | risk-control | deliverable.
        #[arg(long, value_enum)]
        group: TaskGroup,
        /// Explicit category ID.
        #[arg(long)]
        category_id: Option<String>,
    },

    /// Delete a task.
    DeleteTask {
        /// Task ID or unique content prefix
        task: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Move the sub-project to the next design stage.
    Advance,

    /// Show or change the enabled template categories of the current stage.
    Categories {
        /// Category ID to enable. May be repeated.
        #[arg(long)]
        enable: Vec<String>,
        /// Category ID to disable. May be repeated.
        #[arg(long)]
        disable: Vec<String>,
    },

    /// Copy missing tasks and categories from another sub-project.
    ImportSettings {
        /// Source sub-project ID, code or name.
        from: String,
        /// Main project of the source. Defaults to the current one.
        #[arg(long)]
        from_project: Option<String>,
    },

    /// Manage submission versions of a task.
    Version {
        #[command(subcommand)]
        action: VersionAction,
    },

    /// Milestone plans and the month calendar.
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// Design-input notes.
    Input {
        #[command(subcommand)]
        action: InputAction,
    },

    /// Drawing gallery.
    Gallery {
        #[command(subcommand)]
        action: GalleryAction,
    },

    /// Mandatory clauses and common design errors.
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// AI assistant (offline answers when no API key is set).
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Show or change configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type: bash, zsh, fish, powershell, elvish.
        shell: Shell,
    },
}

#[derive(Subcommand, Clone)]
pub enum NewAction {
    /// Create a main project and select it.
    Project {
        name: String,
        #[arg(long, default_value = "")]
        code: String,
    },
    /// Add a sub-project to the current main project.
    Sub {
        name: String,
        #[arg(long, default_value = "0000")]
        code: String,
        /// Building type: nuclear-island | auxiliary-industrial | other.
        #[arg(long = "type", value_enum, default_value_t = ProjectType::Other)]
        project_type: ProjectType,
        /// Starting stage: schematic | preliminary | construction-drawing.
        #[arg(long, value_enum, default_value_t = DesignStage::Schematic)]
        stage: DesignStage,
        /// Start from the executive checklist: key items only.
        #[arg(long)]
        minimal: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum RemoveAction {
    /// Delete a main project with all its sub-projects.
    Project {
        /// Project ID, code or name
        project: String,
        #[arg(long)]
        yes: bool,
    },
    /// Delete a sub-project of the current main project.
    Sub {
        /// Sub-project ID, code or name
        sub: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum VersionAction {
    /// Attach a new version with the given files.
    Add {
        /// Task ID or unique content prefix
        task: String,
        /// Submitted files. Only the file names are recorded.
        #[arg(required = true)]
        files: Vec<String>,
        /// Submission date, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a version by its letter tag.
    Delete {
        /// Task ID or unique content prefix
        task: String,
        /// Version tag, e.g. A
        tag: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum PlanAction {
    /// Add a milestone.
    Add {
        name: String,
        /// Date, YYYY-MM-DD.
        date: String,
    },
    /// List milestones.
    List {
        /// Include past and undated milestones.
        #[arg(long)]
        all: bool,
    },
    /// Import milestones from a CSV export (date,milestone).
    Import { file: PathBuf },
    /// Remove a milestone by ID.
    Remove { id: String },
    /// Print a month calendar with milestones marked.
    Calendar {
        /// Month as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Print a CSV template for imports.
    Template,
}

#[derive(Subcommand, Clone)]
pub enum InputAction {
    /// Print the design-input note.
    Show,
    /// Append text to the note.
    Append { text: String },
    /// Append a file: text files are copied in, others leave a notice.
    Import { file: PathBuf },
    /// Print a design-input template.
    Template,
}

#[derive(Subcommand, Clone)]
pub enum GalleryAction {
    /// Register drawings or documents.
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        drawing_number: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List registered items.
    List,
    /// Remove an item by ID.
    Remove { id: String },
}

#[derive(Subcommand, Clone)]
pub enum LibraryAction {
    /// Mandatory code clauses.
    Clauses {
        /// Match against clause text or standard code.
        #[arg(long)]
        search: Option<String>,
        /// Number of random entries when not searching.
        #[arg(long, default_value_t = library::DEFAULT_DISPLAY_COUNT)]
        count: usize,
    },
    /// Common design errors.
    Errors {
        /// Match against title or description.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = library::DEFAULT_DISPLAY_COUNT)]
        count: usize,
    },
}

#[derive(Subcommand, Clone)]
pub enum AiAction {
    /// Ask for a check-up question about a design phase or category.
    Question {
        /// Category or phase name. Defaults to the current stage.
        category: Option<String>,
    },
    /// Review design-input text. Defaults to the sub-project's note.
    Review { text: Option<String> },
    /// Interactive chat. An empty line or `exit` ends it.
    Chat,
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show all settings.
    Show,
    /// Print one setting.
    Get { key: String },
    /// Change one setting. An empty value clears optional settings.
    Set { key: String, value: String },
    /// Print the configuration file path.
    Path,
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

fn progress_bar(progress: Progress, width: usize) -> String {
    let filled = (progress.percent() as usize * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled.min(width)))
}

/// Ask a yes/no question on stdin. Anything but y/yes is a no.
fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Resolve a task and check it belongs to the current, editable stage.
fn editable_task(sp: &SubProject, ident: &str) -> Result<String> {
    let task = resolve_task(sp, ident)?;
    if sp.is_read_only(task.stage) {
        return Err(Error::InvalidInput(format!(
            "task '{}' belongs to {}, which is read-only",
            truncate(&task.content, 30),
            format_stage(task.stage)
        )));
    }
    Ok(task.id.clone())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

/// List main projects with their sub-projects.
pub fn cmd_projects(session: &Session) -> Result<()> {
    if session.projects().is_empty() {
        println!("No projects yet. Run `hvt seed` for a demo or `hvt new project <name>`.");
        return Ok(());
    }
    let current = session.current_project().map(|p| p.id.as_str());
    let current_sub = session.current_sub().map(|sp| sp.id.as_str());
    println!("{:<2} {:<24} {:<8} {:<8} {}", "", "Project", "Code", "Subs", "Tasks");
    for p in session.projects() {
        let marker = if Some(p.id.as_str()) == current { "*" } else { "" };
        let owner = p.owner.as_deref().map(|o| format!(" [owner: {}]", o)).unwrap_or_default();
        println!(
            "{:<2} {:<24} {:<8} {:<8} {}{}",
            marker,
            truncate(&p.name, 24),
            truncate(&p.code, 8),
            p.sub_projects.len(),
            p.task_count(),
            owner
        );
        for sp in &p.sub_projects {
            let sub_marker = if Some(sp.id.as_str()) == current_sub && marker == "*" { ">" } else { " " };
            println!(
                "   {} {:<20} {:<8} {:<20} {}",
                sub_marker,
                truncate(&sp.name, 20),
                truncate(&sp.code, 8),
                format_project_type(sp.project_type),
                format_stage(sp.stage)
            );
        }
    }
    Ok(())
}

pub fn cmd_new(session: &mut Session, action: NewAction) -> Result<()> {
    match action {
        NewAction::Project { name, code } => {
            let project = session.create_project(&name, &code)?;
            println!("Created project {} ({}).", project.name, project.id);
            println!("Add a sub-project with `hvt new sub <name> --type <type>`.");
        }
        NewAction::Sub { name, code, project_type, stage, minimal } => {
            session.add_sub_project(&name, &code, project_type, stage)?;
            let sp = if minimal {
                session.update_current_sub(|sp| {
                    let mut next = sp.clone();
                    next.tasks = task::synthesize_minimal(sp.project_type, sp.stage, &sp.enabled_category_ids);
                    next
                })?
            } else {
                session.require_sub()?
            };
            println!(
                "Created sub-project {} ({}) at {} with {} tasks.",
                sp.name,
                sp.id,
                format_stage(sp.stage),
                sp.tasks.len()
            );
        }
    }
    Ok(())
}

pub async fn cmd_remove(session: &mut Session, action: RemoveAction) -> Result<()> {
    match action {
        RemoveAction::Project { project, yes } => {
            let target = resolve_project(session.projects(), &project)?;
            let (id, name, subs) = (target.id.clone(), target.name.clone(), target.sub_projects.len());
            if !yes && !confirm(&format!("Delete project '{}' and its {} sub-project(s)?", name, subs)) {
                println!("Cancelled.");
                return Ok(());
            }
            session.remove_project(&id).await?;
            println!("Deleted project {}.", name);
        }
        RemoveAction::Sub { sub, yes } => {
            let target = resolve_sub_project(session.require_project()?, &sub)?;
            let (id, name) = (target.id.clone(), target.name.clone());
            if !yes && !confirm(&format!("Delete sub-project '{}' and all its tasks?", name)) {
                println!("Cancelled.");
                return Ok(());
            }
            session.remove_sub_project(&id)?;
            println!("Deleted sub-project {}.", name);
        }
    }
    Ok(())
}

pub fn cmd_seed(session: &mut Session) -> Result<()> {
    if session.seed_if_empty() {
        let project = session.require_project()?;
        println!("Created demo project {} ({}).", project.name, project.code);
    } else {
        println!("Projects already exist; nothing seeded.");
    }
    Ok(())
}

/// Dashboard summary of the current sub-project.
pub fn cmd_status(session: &Session) -> Result<()> {
    let project = session.require_project()?;
    let sp = session.require_sub()?;
    println!("Project:     {} ({})", project.name, project.code);
    println!("Sub-project: {} ({})", sp.name, sp.code);
    println!("Type:        {}", format_project_type(sp.project_type));
    println!("Stage:       {}", format_stage(sp.stage));
    if !sp.stage_history.is_empty() {
        let history: Vec<&str> = sp.stage_history.iter().map(|s| format_stage(*s)).collect();
        println!("History:     {}", history.join(" → "));
    }
    println!();

    for g in dashboard::group_progress(sp, sp.stage) {
        println!(
            "{:<24} {} {:>3}%  ({}/{})",
            format_group(g.group),
            progress_bar(g.progress, 20),
            g.progress.percent(),
            g.progress.done,
            g.progress.total
        );
    }
    let overall = dashboard::stage_progress(sp, sp.stage);
    println!(
        "{:<24} {} {:>3}%  ({}/{})",
        "Overall",
        progress_bar(overall, 20),
        overall.percent(),
        overall.done,
        overall.total
    );
    for earlier in &sp.stage_history {
        let (done, total) = stage::stage_completion(sp, *earlier);
        println!("  {} (read-only): {}/{} done", format_stage(*earlier), done, total);
    }

    let upcoming = calendar::upcoming(&sp.plans, Local::now().date_naive(), 3);
    if !upcoming.is_empty() {
        println!();
        println!("Upcoming milestones:");
        for plan in upcoming {
            println!("  {}  {}", plan.date, plan.name);
        }
    }
    Ok(())
}

pub fn cmd_tasks(session: &Session, stage_filter: Option<DesignStage>, group: Option<TaskGroup>, minimal: bool) -> Result<()> {
    let sp = session.require_sub()?;
    let view_stage = stage_filter.unwrap_or(sp.stage);
    let read_only = if sp.is_read_only(view_stage) { " (read-only)" } else { "" };
    println!("{} / {}: {}{}", sp.name, sp.code, format_stage(view_stage), read_only);

    let sections = dashboard::sections(sp, view_stage, SectionFilter { group, minimal });
    if sections.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for section in sections {
        let orphan = if section.orphan { " (not in template)" } else { "" };
        println!();
        println!("== {} [{}]{} ==", section.name, format_group(section.group), orphan);
        for t in section.tasks {
            let mark = if t.is_completed { "[x]" } else { "[ ]" };
            let versions = if t.versions.is_empty() {
                String::new()
            } else {
                let tags: Vec<&str> = t.versions.iter().map(|v| v.version.as_str()).collect();
                format!("  (versions: {})", tags.join(", "))
            };
            println!("{} {:<32} {}{}", mark, truncate(&t.id, 32), t.content, versions);
        }
    }
    Ok(())
}

pub fn cmd_toggle(session: &mut Session, task: String) -> Result<()> {
    let id = editable_task(session.require_sub()?, &task)?;
    let sp = session.update_current_sub(|sp| mutation::toggle_complete(sp, &id))?;
    if let Some(t) = sp.task(&id) {
        let state = if t.is_completed { "done" } else { "open" };
        println!("Marked {}: {}", state, t.content);
    }
    Ok(())
}

pub fn cmd_add_task(
    session: &mut Session,
    content: String,
    category: String,
    group: TaskGroup,
    category_id: Option<String>,
) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("task text cannot be empty".to_string()));
    }
    let sp = session.require_sub()?;
    let stage_now = sp.stage;
    let category_id = category_id.unwrap_or_else(|| {
        catalog::categories(sp.project_type, stage_now)
            .iter()
            .find(|c| c.name == category.trim() && c.group == group)
            .map(|c| c.id.to_string())
            .unwrap_or_else(|| format!("custom-{}", crate::project::sanitize_name(&category)))
    });
    let sp = session.update_current_sub(|sp| {
        mutation::add_ad_hoc_task(sp, group, category.trim(), &category_id, content.trim(), stage_now)
    })?;
    if let Some(t) = sp.tasks.last() {
        println!("Added task {} to {}.", t.id, t.category);
    }
    Ok(())
}

pub fn cmd_delete_task(session: &mut Session, task: String, yes: bool) -> Result<()> {
    let sp = session.require_sub()?;
    let id = editable_task(sp, &task)?;
    let content = sp.task(&id).map(|t| t.content.clone()).unwrap_or_default();
    if !yes && !confirm(&format!("Delete task '{}'?", truncate(&content, 40))) {
        println!("Cancelled.");
        return Ok(());
    }
    session.update_current_sub(|sp| mutation::delete_task(sp, &id))?;
    println!("Deleted.");
    Ok(())
}

pub fn cmd_advance(session: &mut Session) -> Result<()> {
    let sp = session.require_sub()?;
    if !stage::can_advance(sp) {
        return Err(Error::TerminalStage(format_stage(sp.stage).to_string()));
    }
    let before = sp.tasks.len();
    let sp = session.update_current_sub(stage::advance_stage)?;
    println!(
        "Advanced {} to {}; {} new task(s).",
        sp.name,
        format_stage(sp.stage),
        sp.tasks.len() - before
    );
    Ok(())
}

pub fn cmd_categories(session: &mut Session, enable: Vec<String>, disable: Vec<String>) -> Result<()> {
    let sp = session.require_sub()?;
    let valid = catalog::category_ids(sp.project_type, sp.stage);

    if !enable.is_empty() || !disable.is_empty() {
        if let Some(bad) = enable.iter().chain(disable.iter()).find(|id| !valid.contains(*id)) {
            return Err(Error::InvalidInput(format!(
                "unknown category '{}'; valid for this stage: {}",
                bad,
                valid.join(", ")
            )));
        }
        let mut ids: Vec<String> = sp.enabled_category_ids.clone();
        ids.extend(enable);
        ids.retain(|id| !disable.contains(id));
        session.update_current_sub(|sp| mutation::set_enabled_categories(sp, &ids))?;
    }

    let sp = session.require_sub()?;
    println!("Categories for {}:", format_stage(sp.stage));
    for cat in catalog::categories(sp.project_type, sp.stage) {
        let mark = if sp.enabled_category_ids.iter().any(|id| id == cat.id) { "[x]" } else { "[ ]" };
        let count = sp
            .tasks_for_stage(sp.stage)
            .filter(|t| t.category_id == cat.id)
            .count();
        println!("{} {:<16} {:<12} {:<24} {} task(s)", mark, cat.id, cat.name, format_group(cat.group), count);
    }
    Ok(())
}

pub fn cmd_import_settings(session: &mut Session, from: String, from_project: Option<String>) -> Result<()> {
    let source_project = match from_project {
        Some(ident) => resolve_project(session.projects(), &ident)?,
        None => session.require_project()?,
    };
    let source = resolve_sub_project(source_project, &from)?.clone();
    if Some(source.id.as_str()) == session.current_sub().map(|sp| sp.id.as_str()) {
        return Err(Error::InvalidInput("cannot import settings from the same sub-project".to_string()));
    }
    let before = session.require_sub()?.tasks.len();
    let sp = session.update_current_sub(|sp| mutation::import_settings(sp, &source))?;
    println!("Imported {} task(s) from {}.", sp.tasks.len() - before, source.name);
    Ok(())
}

pub fn cmd_version(session: &mut Session, action: VersionAction) -> Result<()> {
    match action {
        VersionAction::Add { task, files, date } => {
            let id = editable_task(session.require_sub()?, &task)?;
            let date = match date {
                Some(d) => {
                    NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                        .map_err(|_| Error::InvalidInput(format!("invalid date '{}', expected YYYY-MM-DD", d)))?;
                    d.trim().to_string()
                }
                None => today(),
            };
            let files: Vec<SubmissionFile> = files.iter().map(|f| SubmissionFile::from_name(&file_name(f))).collect();
            let sp = session.update_current_sub(|sp| mutation::add_version(sp, &id, files, &date))?;
            if let Some(v) = sp.task(&id).and_then(|t| t.versions.first()) {
                println!("Added version {} ({} file(s)).", v.version, v.files.len());
            }
        }
        VersionAction::Delete { task, tag } => {
            let sp = session.require_sub()?;
            let id = editable_task(sp, &task)?;
            let exists = sp
                .task(&id)
                .map(|t| t.versions.iter().any(|v| v.version == tag))
                .unwrap_or(false);
            if !exists {
                return Err(Error::VersionNotFound(tag));
            }
            session.update_current_sub(|sp| mutation::delete_version(sp, &id, &tag))?;
            println!("Deleted version {}.", tag);
        }
    }
    Ok(())
}

fn parse_month(s: &str) -> Result<(i32, u32)> {
    let invalid = || Error::InvalidInput(format!("invalid month '{}', expected YYYY-MM", s));
    let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn print_calendar(plans: &[DesignPlan], year: i32, month: u32) -> Result<()> {
    let weeks = calendar::month_weeks(year, month)
        .ok_or_else(|| Error::InvalidInput(format!("invalid month {}-{:02}", year, month)))?;
    println!("{:^28}", format!("{}-{:02}", year, month));
    println!(" Sun Mon Tue Wed Thu Fri Sat");
    let mut marked: Vec<&DesignPlan> = Vec::new();
    for week in &weeks {
        let mut line = String::new();
        for day in week {
            match day {
                Some(d) => {
                    let on_day = calendar::plans_on(plans, *d);
                    let mark = if on_day.is_empty() { ' ' } else { '*' };
                    line.push_str(&format!(" {:>2}{}", d.day(), mark));
                    marked.extend(on_day);
                }
                None => line.push_str("    "),
            }
        }
        println!("{}", line);
    }
    if !marked.is_empty() {
        println!();
        for plan in marked {
            println!("  * {}  {}", plan.date, plan.name);
        }
    }
    Ok(())
}

pub fn cmd_plan(session: &mut Session, action: PlanAction) -> Result<()> {
    match action {
        PlanAction::Add { name, date } => {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput("milestone name cannot be empty".to_string()));
            }
            NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .map_err(|_| Error::InvalidInput(format!("invalid date '{}', expected YYYY-MM-DD", date)))?;
            let plan = DesignPlan::new(name.trim(), &date);
            let id = plan.id.clone();
            session.update_current_sub(|sp| calendar::add_plans(sp, vec![plan]))?;
            println!("Added milestone {}.", id);
        }
        PlanAction::List { all } => {
            let sp = session.require_sub()?;
            let plans: Vec<&DesignPlan> = if all {
                sp.plans.iter().collect()
            } else {
                calendar::upcoming(&sp.plans, Local::now().date_naive(), usize::MAX)
            };
            if plans.is_empty() {
                println!("No milestones.");
            }
            for plan in plans {
                println!("{:<12} {:<12} {}", truncate(&plan.id, 12), plan.date, plan.name);
            }
        }
        PlanAction::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let plans = calendar::parse_plan_csv(&content);
            let count = plans.len();
            session.update_current_sub(|sp| calendar::add_plans(sp, plans))?;
            println!("Imported {} milestone(s) from {}.", count, file.display());
        }
        PlanAction::Remove { id } => {
            if !session.require_sub()?.plans.iter().any(|p| p.id == id) {
                return Err(Error::InvalidInput(format!("no milestone with ID '{}'", id)));
            }
            session.update_current_sub(|sp| calendar::remove_plan(sp, &id))?;
            println!("Removed milestone {}.", id);
        }
        PlanAction::Calendar { month } => {
            let (year, month) = match month {
                Some(m) => parse_month(&m)?,
                None => {
                    let now = Local::now().date_naive();
                    (now.year(), now.month())
                }
            };
            print_calendar(&session.require_sub()?.plans, year, month)?;
        }
        PlanAction::Template => print!("{}", calendar::PLAN_CSV_TEMPLATE),
    }
    Ok(())
}

pub fn cmd_input(session: &mut Session, action: InputAction) -> Result<()> {
    match action {
        InputAction::Show => {
            let sp = session.require_sub()?;
            if sp.design_input_content.trim().is_empty() {
                println!("No design input recorded. Start from `hvt input template`.");
            } else {
                println!("{}", sp.design_input_content.trim_start());
            }
        }
        InputAction::Append { text } => {
            session.update_current_sub(|sp| {
                let mut next = sp.clone();
                next.design_input_content = if sp.design_input_content.is_empty() {
                    text.clone()
                } else {
                    format!("{}\n{}", sp.design_input_content, text)
                };
                next
            })?;
            println!("Appended.");
        }
        InputAction::Import { file } => {
            let name = file_name(&file.to_string_lossy());
            let content = if name.to_lowercase().ends_with(".txt") {
                Some(std::fs::read_to_string(&file)?)
            } else {
                None
            };
            session.update_current_sub(|sp| calendar::append_design_input(sp, &name, content.as_deref()))?;
            println!("Imported {}.", name);
        }
        InputAction::Template => print!("{}", calendar::DESIGN_INPUT_TEMPLATE),
    }
    Ok(())
}

pub fn cmd_gallery(session: &mut Session, action: GalleryAction) -> Result<()> {
    match action {
        GalleryAction::Add { files, title, drawing_number, category } => {
            let date = today();
            let mut items = Vec::new();
            for file in &files {
                let is_url = file.to_string_lossy().starts_with("http");
                if !is_url && !file.exists() {
                    return Err(Error::InvalidInput(format!("file not found: {}", file.display())));
                }
                items.push(GalleryItem::from_path(file, title.clone(), drawing_number.clone(), category.clone(), &date));
            }
            let count = items.len();
            session.update_current_sub(|sp| gallery::add_gallery_items(sp, items))?;
            println!("Added {} item(s) to the gallery.", count);
        }
        GalleryAction::List => {
            let sp = session.require_sub()?;
            if sp.gallery.is_empty() {
                println!("Gallery is empty.");
            }
            println!("{:<12} {:<6} {:<10} {:<12} {:<24} {}", "ID", "Type", "Drawing", "Category", "Title", "Location");
            for g in &sp.gallery {
                let kind = match g.kind {
                    GalleryKind::Image => "image",
                    GalleryKind::Pdf => "pdf",
                };
                println!(
                    "{:<12} {:<6} {:<10} {:<12} {:<24} {}",
                    truncate(&g.id, 12),
                    kind,
                    truncate(g.drawing_number.as_deref().unwrap_or("-"), 10),
                    truncate(&g.category, 12),
                    truncate(&g.title, 24),
                    g.url
                );
            }
        }
        GalleryAction::Remove { id } => {
            if !session.require_sub()?.gallery.iter().any(|g| g.id == id) {
                return Err(Error::InvalidInput(format!("no gallery item with ID '{}'", id)));
            }
            session.update_current_sub(|sp| gallery::remove_gallery_item(sp, &id))?;
            println!("Removed {}.", id);
        }
    }
    Ok(())
}

/// Browse the reference library.
pub fn cmd_library(action: LibraryAction) {
    match action {
        LibraryAction::Clauses { search, count } => {
            let clauses = library::browse_clauses(search.as_deref(), count);
            if clauses.is_empty() {
                println!("No matching clauses.");
            }
            for c in clauses {
                println!("{} {}", c.code, c.clause_number);
                println!("  {}", c.content);
            }
        }
        LibraryAction::Errors { search, count } => {
            let errors = library::browse_errors(search.as_deref(), count);
            if errors.is_empty() {
                println!("No matching errors.");
            }
            for e in errors {
                println!("{} [{}]", e.title, e.category);
                println!("  Problem:  {}", e.description);
                println!("  Solution: {}", e.solution);
            }
        }
    }
}

pub async fn cmd_ai(session: &Session, assistant: &Assistant, action: AiAction) -> Result<()> {
    if !assistant.is_online() {
        eprintln!("No AI key set (GEMINI_API_KEY or API_KEY); using offline answers.");
    }
    match action {
        AiAction::Question { category } => {
            let category = category
                .or_else(|| session.current_sub().map(|sp| format_stage(sp.stage).to_string()))
                .unwrap_or_else(|| "default".to_string());
            println!("{}", assistant.workflow_question(&category).await);
        }
        AiAction::Review { text } => {
            let text = match text {
                Some(t) => t,
                None => session.require_sub()?.design_input_content.clone(),
            };
            if text.trim().is_empty() {
                return Err(Error::InvalidInput("nothing to review; pass text or record design input first".to_string()));
            }
            println!("{}", assistant.review_design_input(&text).await);
        }
        AiAction::Chat => {
            let mut chat = assistant.chat();
            println!("Chatting with {} (empty line or `exit` to quit).", assistant.model());
            let stdin = io::stdin();
            loop {
                print!("> ");
                io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let line = line.trim();
                if line.is_empty() || line == "exit" {
                    break;
                }
                println!("{}", chat.send(line).await);
            }
            tracing::debug!(turns = chat.history().len(), "chat ended");
        }
    }
    Ok(())
}

/// Handle configuration commands.
pub fn cmd_config(config: &mut Config, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            for (key, value) in config.list()? {
                println!("{:<22} {}", key, value);
            }
        }
        ConfigAction::Get { key } => println!("{}", config.get(&key)?),
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {}.", key);
        }
        ConfigAction::Path => println!("{}", Config::config_path()?.display()),
    }
    Ok(())
}

/// Generate shell completion scripts for the specified shell.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Launch the terminal dashboard.
pub async fn cmd_ui(session: &mut Session, assistant: &Assistant) -> Result<()> {
    session.require_sub()?;
    run_tui(session, assistant).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("多专业接口条件", 4), "多专业…");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(Progress { done: 1, total: 2 }, 10), "[#####.....]");
        assert_eq!(progress_bar(Progress { done: 0, total: 0 }, 4), "[....]");
        assert_eq!(progress_bar(Progress { done: 3, total: 3 }, 4), "[####]");
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-06").unwrap(), (2024, 6));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("June").is_err());
    }

    #[test]
    fn test_editable_task_rejects_history() {
        let sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        let first = sp.tasks[0].id.clone();
        let sp = stage::advance_stage(&sp);
        assert!(matches!(editable_task(&sp, &first), Err(Error::InvalidInput(_))));
        let current = sp.tasks_for_stage(DesignStage::Preliminary).next().unwrap().id.clone();
        assert_eq!(editable_task(&sp, &current).unwrap(), current);
    }

    #[test]
    fn test_editable_task_by_prefix_after_advance() {
        let sp = SubProject::new("A", "1", ProjectType::Other, DesignStage::Schematic);
        let sp = stage::advance_stage(&sp);
        let id = editable_task(&sp, "关键边界条件").unwrap();
        assert_eq!(sp.task(&id).unwrap().stage, DesignStage::Preliminary);
    }

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_name("/tmp/drawings/AHU.dwg"), "AHU.dwg");
        assert_eq!(file_name("plain.pdf"), "plain.pdf");
        assert_eq!(task::version_tag(0), "A");
    }
}
