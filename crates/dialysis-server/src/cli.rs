//! Command-line interface: serve the API or run a maintenance task.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialysis_core::JsonFileStore;
use tracing::info;

use crate::config::AppConfig;
use crate::router::api_router;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "dialysis-server", version, about = "Dialysis records API and maintenance tools")]
pub struct Cli {
    /// Configuration file (defaults to ./dialysis.toml when present)
    #[arg(long, short, global = true, env = "DIALYSIS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the REST API (the default)
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the data quality report
    Report {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Reassign duplicated patient ids
    FixDuplicates,
    /// Rewrite record dates as YYYY-MM-DD
    StandardizeDates,
    /// Write a checksummed copy of the document to the backup directory
    Backup,
    /// Replace the document with a backup
    Restore {
        /// Backup file to restore
        file: PathBuf,
    },
    /// List backups, newest first
    ListBackups,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = AppConfig::load(self.config.as_deref()).context("loading configuration")?;
        crate::init_logging(&config.log.filter);

        let command = self.command.unwrap_or(Command::Serve { port: None });
        if let Command::Serve { port: Some(port) } = &command {
            config.server.port = *port;
        }

        let state = AppState::new(
            JsonFileStore::new(&config.store.path),
            config.staff.clone(),
            config.store.backup_dir.clone(),
        );

        match command {
            Command::Serve { .. } => serve(state, &config).await,
            Command::Report { json } => {
                let report = state.clinic.quality_report()?;
                if json {
                    println!("{}", report.to_json()?);
                } else {
                    print!("{}", report.render_text());
                }
                Ok(())
            }
            Command::FixDuplicates => {
                let summary = state.clinic.fix_duplicate_ids()?;
                for change in &summary.changes {
                    println!("{} -> {}", change.before, change.after);
                }
                for skipped in &summary.skipped {
                    println!("skipped: {}", skipped);
                }
                println!("Fixed {} duplicate patient IDs", summary.changes.len());
                Ok(())
            }
            Command::StandardizeDates => {
                let summary = state.clinic.standardize_dates()?;
                for c in &summary.changes {
                    println!("{} {} {}: {} -> {}", c.collection, c.record_id, c.field, c.before, c.after);
                }
                println!("Standardized {} dates", summary.changes.len());
                Ok(())
            }
            Command::Backup => {
                let info = state.clinic.backup(&state.backup_dir)?;
                println!("{}  {}", info.sha256, info.path.display());
                Ok(())
            }
            Command::Restore { file } => {
                let doc = state
                    .clinic
                    .restore(&file)
                    .with_context(|| format!("restoring {}", file.display()))?;
                println!("Restored {} patients from {}", doc.patients.len(), file.display());
                Ok(())
            }
            Command::ListBackups => {
                for backup in dialysis_core::store::list_backups(&state.backup_dir)? {
                    println!(
                        "{}  {}  {}",
                        backup.created_at.to_rfc3339(),
                        backup.sha256,
                        backup.path.display()
                    );
                }
                Ok(())
            }
        }
    }
}

async fn serve(state: AppState, config: &AppConfig) -> Result<()> {
    let app = api_router(state, &config.cors);
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, store = %config.store.path.display(), "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
