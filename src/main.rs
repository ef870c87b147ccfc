//! Commit Browser - serves commit history, diffs and line comments for a
//! local git repository.
//!
//! # Usage
//! ```bash
//! commit-browser /path/to/repository             # Start server
//! commit-browser . --page-size 20 --port 8080    # Smaller pages
//! commit-browser . --config browser.json --mail  # Config file, mail on
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commit_browser::config::Config;
use commit_browser::git::GitRepository;
use commit_browser::models::RepoRef;
use commit_browser::routes::{self, AppState};
use commit_browser::store::{LogNotifier, MemoryAccounts, MemoryCommentStore};

/// Commit Browser - browse history, diffs and comments over HTTP
#[derive(Parser)]
#[command(name = "commit-browser")]
#[command(about = "Commit history, diff and comment server for a git repository", long_about = None)]
struct Cli {
    /// Path to the git repository to serve
    #[arg(value_name = "REPO_PATH", default_value = ".")]
    repo_path: String,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// JSON config file (pageSize, maxDiffLines, mailEnabled, sniffBytes)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Commits per history page
    #[arg(long)]
    page_size: Option<usize>,

    /// Diff lines rendered per request
    #[arg(long)]
    max_diff_lines: Option<usize>,

    /// Send comment notification mail
    #[arg(long)]
    mail: bool,
}

impl Cli {
    /// Flags override the file, the file overrides defaults.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(max_diff_lines) = self.max_diff_lines {
            config.max_diff_lines = max_diff_lines;
        }
        if self.mail {
            config.mail_enabled = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn repo_owner(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "local".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (quieter for production)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.load_config()?;

    let repo = GitRepository::open(&cli.repo_path)
        .with_context(|| format!("failed to open repository at {}", cli.repo_path))?;
    let canonical_path = std::fs::canonicalize(&cli.repo_path)
        .unwrap_or_else(|_| PathBuf::from(&cli.repo_path));

    let default_branch = repo.head_branch()?.unwrap_or_else(|| "main".to_string());
    let repo_ref = RepoRef {
        id: 1,
        owner: repo_owner(&canonical_path),
        name: canonical_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| repo.name()),
    };

    tracing::info!(
        repo = %canonical_path.display(),
        branch = %default_branch,
        page_size = config.page_size,
        mail = config.mail_enabled,
        "starting commit browser"
    );

    let state = AppState::new(
        Arc::new(repo),
        Arc::new(MemoryAccounts::new()),
        Arc::new(MemoryCommentStore::new()),
        Arc::new(LogNotifier::new()),
        config,
        repo_ref,
        default_branch,
    );

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::create_router(Arc::new(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {} (try --port <PORT>)", addr))?;

    println!();
    println!("  Repository: {}", canonical_path.display());
    println!("  Server:     http://{}", addr);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            return;
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
