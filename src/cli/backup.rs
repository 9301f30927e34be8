//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use std::path::PathBuf;

use chrono::Local;
use clap::Subcommand;

use crate::backup::{BackupResult, BackupService};
use crate::display::{format_backup_details, format_backup_list};
use crate::error::{VaultError, VaultResult};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup of documents and photos
    Create {
        /// Directory to write the archive to (default: the backup directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an automatic backup unless one was made in the last hour
    Auto {
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all available backups
    List {
        /// List only this directory instead of the manual and automatic ones
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Show full paths
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a backup archive
    Delete {
        /// Backup filename or path
        backup: String,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },
}

/// Handle a backup command
pub fn handle_backup_command(service: &BackupService, cmd: BackupCommands) -> VaultResult<()> {
    match cmd {
        BackupCommands::Create { output, json } => {
            if !json {
                println!("Creating backup...");
            }
            report_backup(&service.backup(output.as_deref()), json)?;
        }

        BackupCommands::Auto { json } => {
            report_backup(&service.auto_backup(), json)?;
        }

        BackupCommands::List { dir, verbose } => {
            let backups = service.list_backups(dir.as_deref())?;

            println!("Available Backups");
            println!("=================");
            println!();
            print!("{}", format_backup_list(&backups, Local::now()));

            if backups.is_empty() {
                println!();
                println!("Create one with: docvault backup create");
            } else if verbose {
                println!();
                for backup in &backups {
                    println!("  {}", backup.path.display());
                }
            }
        }

        BackupCommands::Restore { backup, force } => {
            let backup_path = resolve_backup_path(service, &backup)?;

            // Validate before asking for confirmation
            let summary = service.inspect(&backup_path)?;
            let size = std::fs::metadata(&backup_path)?.len();
            print!("{}", format_backup_details(&backup_path, size, &summary));
            println!();

            if !force {
                println!("WARNING: This will overwrite ALL current documents and photos!");
                println!("A safety backup of the current data is taken first.");
                println!("To proceed, run again with --force flag:");
                println!("  docvault backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring from backup...");
            let result = service.restore(&backup_path);
            println!("{}", result.summary());

            if let Some(error) = result.error {
                if error.is_partial_state() {
                    if let Some(safety) = &result.safety_backup_path {
                        println!(
                            "\nData may be incomplete. Recover with:\n  docvault backup restore {} --force",
                            safety.display()
                        );
                    }
                }
                return Err(error);
            }
        }

        BackupCommands::Delete { backup } => {
            let backup_path = resolve_backup_path(service, &backup)?;

            if !service.delete_backup(&backup_path) {
                return Err(VaultError::Io(format!(
                    "Could not delete backup {}",
                    backup_path.display()
                )));
            }
            println!("Deleted backup: {}", backup_path.display());
        }

        BackupCommands::Info { backup } => {
            let backup_path = resolve_backup_path(service, &backup)?;

            let summary = service.inspect(&backup_path)?;
            let size = std::fs::metadata(&backup_path)?.len();

            println!("Backup Details");
            println!("==============");
            print!("{}", format_backup_details(&backup_path, size, &summary));
        }
    }

    Ok(())
}

/// Print a backup outcome, failing with its error
fn report_backup(result: &BackupResult, json: bool) -> VaultResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.success {
        println!("{}", result.summary());
    }

    match &result.error {
        Some(error) => Err(error.clone()),
        None => Ok(()),
    }
}

/// Resolve a backup identifier to a full path
///
/// Accepts `latest`, a path, or a filename (with or without `.zip`) in the
/// manual or automatic backup directory.
pub fn resolve_backup_path(service: &BackupService, backup: &str) -> VaultResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return service
            .latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| VaultError::backup_not_found("latest"));
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    let paths = service.paths();
    let names = [backup.to_string(), format!("{}.zip", backup)];
    for dir in [paths.backup_dir(), paths.auto_backup_dir()] {
        for name in &names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(VaultError::backup_not_found(backup))
}
