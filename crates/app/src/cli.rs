use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};

pub const DEFAULT_DB_URL: &str = "sqlite://backlog.sqlite3";

/// Backlog recovery planner: reclaim missed lectures without burning out.
#[derive(Debug, Parser)]
#[command(name = "backlog", version, about)]
pub struct Cli {
    /// Plan store: a `SQLite` URL, or a path ending in `.json` for a JSON file.
    #[arg(long = "db", global = true, env = "BACKLOG_DB_URL", default_value = DEFAULT_DB_URL)]
    pub db: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show the current plan (default).
    Status,

    /// Start a plan for one backlog of lectures.
    Start {
        /// Lectures behind.
        #[arg(long)]
        backlog: u32,
        /// Lectures to reclaim per day.
        #[arg(long)]
        daily_load: u32,
    },

    /// Start a plan split across subjects.
    StartSubjects {
        /// Subject and its backlog as `NAME=N`; repeat in priority order.
        #[arg(long = "subject", required = true)]
        subjects: Vec<SubjectArg>,
        /// Lectures to reclaim per day across all subjects.
        #[arg(long)]
        daily_load: u32,
    },

    /// Log today's load as done.
    Complete,

    /// Log today as missed.
    Miss,

    /// Show what to work on today.
    Today,

    /// Delete the plan and start over.
    Reset,
}

//
// ─── ARGUMENT PARSING ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    InvalidSubject { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidSubject { raw } => {
                write!(f, "invalid --subject value (expected NAME=N): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// One `NAME=N` pair from the command line. Validation of the values is left
/// to the plan draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectArg {
    pub name: String,
    pub backlog: u32,
}

impl FromStr for SubjectArg {
    type Err = ArgsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ArgsError::InvalidSubject {
            raw: raw.to_string(),
        };
        // Split on the last '=' so names may contain one.
        let (name, count) = raw.rsplit_once('=').ok_or_else(invalid)?;
        let backlog = count.trim().parse().map_err(|_| invalid())?;
        Ok(Self {
            name: name.to_string(),
            backlog,
        })
    }
}

/// Where plans are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Sqlite(String),
    Json(PathBuf),
}

impl StoreTarget {
    /// # Errors
    ///
    /// Returns `ArgsError::InvalidDbUrl` for a blank value.
    pub fn from_arg(raw: &str) -> Result<Self, ArgsError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ArgsError::InvalidDbUrl {
                raw: raw.to_string(),
            });
        }
        if trimmed.ends_with(".json") {
            let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
            return Ok(Self::Json(PathBuf::from(path)));
        }
        Ok(Self::Sqlite(normalize_sqlite_url(trimmed)))
    }
}

pub fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_string();
    }

    let path_str = raw.strip_prefix("sqlite:").unwrap_or(raw);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before connecting.
///
/// # Errors
///
/// Returns an error for a URL without a path or if the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
