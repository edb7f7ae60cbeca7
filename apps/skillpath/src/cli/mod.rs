//! # SkillPath CLI Module
//!
//! This module implements the CLI interface for SkillPath.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `seed` - Load the sample dataset
//! - `skills` - List skill definitions
//! - `categories` - List skill categories
//! - `user-skills` - List a user's proficiency records
//! - `update` - Set a proficiency
//! - `assess` - Assess a user's skills
//! - `history` - Show a user's assessment log
//! - `export` - Export all collections to JSON
//! - `import` - Import collections from JSON
//! - `status` - Show document counts

mod commands;

use crate::config::{Backend, FileConfig, StorageSettings};
use clap::{Parser, Subcommand};
use skillpath_core::SkillError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// SkillPath - skill assessment for career pathing
///
/// Track per-skill proficiency, score assessments and keep their history.
#[derive(Parser, Debug)]
#[command(name = "skillpath")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database [default: skillpath.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<Backend>,

    /// Path to a TOML config file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(short, long)]
        port: Option<u16>,

        /// Load the sample dataset if the store is empty
        #[arg(long)]
        seed: bool,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Load the sample dataset (JavaScript, React, Node.js; user 1)
    Seed,

    /// List skill definitions
    Skills,

    /// List skill categories with their member skills
    Categories,

    /// List a user's proficiency records
    UserSkills {
        /// User id
        #[arg(short, long)]
        user: String,
    },

    /// Set the proficiency of a user's skill
    Update {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Skill id
        #[arg(short, long)]
        skill: String,

        /// Proficiency, 0 to 100
        #[arg(short, long, allow_negative_numbers = true)]
        proficiency: i64,
    },

    /// Assess a user's skills and record the result
    Assess {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Skill ids (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        skills: Vec<String>,
    },

    /// Show a user's assessment log, oldest first
    History {
        /// User id
        #[arg(short, long)]
        user: String,
    },

    /// Export all collections to a JSON snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import collections from a JSON snapshot
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show document counts
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SkillError> {
    let file = FileConfig::load(cli.config.as_deref())?;
    let storage = StorageSettings::resolve(&file, cli.database, cli.backend);
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, seed }) => {
            cmd_server(&storage, &file, host, port, seed).await
        }
        Some(Commands::Init { force }) => cmd_init(&storage, force),
        Some(Commands::Seed) => cmd_seed(&storage, json_mode),
        Some(Commands::Skills) => cmd_skills(&storage, json_mode),
        Some(Commands::Categories) => cmd_categories(&storage, json_mode),
        Some(Commands::UserSkills { user }) => cmd_user_skills(&storage, json_mode, &user),
        Some(Commands::Update {
            user,
            skill,
            proficiency,
        }) => cmd_update(&storage, json_mode, &user, &skill, proficiency),
        Some(Commands::Assess { user, skills }) => cmd_assess(&storage, json_mode, &user, &skills),
        Some(Commands::History { user }) => cmd_history(&storage, json_mode, &user),
        Some(Commands::Export { output }) => cmd_export(&storage, &output),
        Some(Commands::Import { input }) => cmd_import(&storage, json_mode, &input),
        Some(Commands::Status) | None => cmd_status(&storage, json_mode),
    }
}
