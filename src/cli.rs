use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Design-stage checklist tracker for HVAC design teams.
/// Projects are stored as JSON files in ~/.hvt, a directory passed via
/// --data-dir, or on a project server passed via --remote.
#[derive(Parser)]
#[command(name = "hvt", version, about = "HVAC design-stage checklist tracker")]
pub struct Cli {
    /// Directory of project files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of a project server, e.g. http://localhost:3001/api.
    #[arg(long, global = true)]
    pub remote: Option<String>,

    /// Main project to work on: id, code or name. Defaults to the most recent.
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Sub-project to work on: id, code or name. Defaults to the first.
    #[arg(short, long, global = true)]
    pub sub: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
