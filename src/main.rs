use anyhow::Result;
use clap::{Parser, Subcommand};

use docvault::backup::BackupService;
use docvault::cli::{handle_backup_command, BackupCommands};
use docvault::config::{paths::VaultPaths, settings::Settings};
use docvault::display::format_data_size;
use docvault::logging;

#[derive(Parser)]
#[command(
    name = "docvault",
    version,
    about = "Backup and restore for DocVault documents and photos",
    long_about = "DocVault keeps a document store and a photo library under one \
                  application directory. This tool archives both into a single zip \
                  file, restores them from such an archive, and manages automatic \
                  hourly backups."
)]
struct Cli {
    /// Log level used when RUST_LOG is not set (e.g. info, debug)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Show the size of the documents and photos
    Size,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level)?;

    // Initialize paths and settings
    let paths = VaultPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let service = BackupService::new(paths.clone(), &settings);

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&service, cmd)?;
        }
        Some(Commands::Size) => {
            print!(
                "{}",
                format_data_size(
                    &service.data_size_details(),
                    &paths.data_dir(),
                    &paths.photos_dir()
                )
            );
        }
        Some(Commands::Config) => {
            println!("DocVault Configuration");
            println!("======================");
            println!("Data directory:        {}", paths.base_dir().display());
            println!("Documents:             {}", paths.data_dir().display());
            println!("Photos:                {}", paths.photos_dir().display());
            println!("Backup directory:      {}", paths.backup_dir().display());
            println!("Auto backup directory: {}", paths.auto_backup_dir().display());
            println!("Settings file:         {}", paths.settings_file().display());
            println!();
            println!("Settings:");
            println!(
                "  Auto backup interval: {} minute(s)",
                settings.retention.min_interval_minutes
            );
            println!(
                "  Auto backups kept:    {}",
                settings.retention.max_auto_backups
            );
            println!("  Compression level:    {}", settings.compression_level);
            println!("  Store extension:      .{}", settings.structured_extension);
        }
        None => {
            println!("DocVault - document and photo backups");
            println!();
            println!("Run 'docvault --help' for usage information.");
            println!("Run 'docvault backup create' to back up now.");
        }
    }

    Ok(())
}
