//! # SkillPath
//!
//! The main binary for SkillPath skill assessment.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for catalog, proficiency and assessment operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                apps/skillpath (THE BINARY)            │
//! │                                                       │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────┐  │
//! │   │    CLI      │    │  HTTP API   │    │  config  │  │
//! │   │   (clap)    │    │   (axum)    │    │  (toml)  │  │
//! │   └──────┬──────┘    └──────┬──────┘    └────┬─────┘  │
//! │          └──────────────────┼────────────────┘        │
//! │                             ▼                         │
//! │                   ┌──────────────────┐                │
//! │                   │  skillpath-core  │                │
//! │                   │   (THE LOGIC)    │                │
//! │                   └──────────────────┘                │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Load sample data and start the HTTP server
//! skillpath seed
//! skillpath server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! skillpath update --user 1 --skill 2 --proficiency 90
//! skillpath assess --user 1 --skills 1,2,3
//! skillpath history --user 1
//! ```

use clap::Parser;
use skillpath::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // SKILLPATH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SKILLPATH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skillpath=info,skillpath_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(code = e.code(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the SkillPath startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗██╗  ██╗██╗██╗     ██╗     ██████╗  █████╗ ████████╗██╗  ██╗
  ██╔════╝██║ ██╔╝██║██║     ██║     ██╔══██╗██╔══██╗╚══██╔══╝██║  ██║
  ███████╗█████╔╝ ██║██║     ██║     ██████╔╝███████║   ██║   ███████║
  ╚════██║██╔═██╗ ██║██║     ██║     ██╔═══╝ ██╔══██║   ██║   ██╔══██║
  ███████║██║  ██╗██║███████╗███████╗██║     ██║  ██║   ██║   ██║  ██║
  ╚══════╝╚═╝  ╚═╝╚═╝╚══════╝╚══════╝╚═╝     ╚═╝  ╚═╝   ╚═╝   ╚═╝  ╚═╝

  Skill Assessment v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
