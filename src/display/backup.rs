//! Backup display formatting
//!
//! Formats backup listings, archive details and data sizes for terminal output.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::archive::ArchiveSummary;
use crate::backup::{format_size, BackupInfo, DataSize};

/// Format a list of backups as a table, newest first
pub fn format_backup_list(backups: &[BackupInfo], now: DateTime<Local>) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let name_width = backups
        .iter()
        .map(|b| b.filename.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<9}  {:<19}  {:>10}  {}\n",
        "File",
        "Type",
        "Created",
        "Size",
        "Age",
        name_width = name_width,
    ));

    output.push_str(&format!(
        "{:-<name_width$}  {:-<9}  {:-<19}  {:->10}  {:-<6}\n",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for backup in backups {
        output.push_str(&format!(
            "{:<name_width$}  {:<9}  {:<19}  {:>10}  {}\n",
            backup.filename,
            backup.type_label(),
            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
            backup.size_formatted(),
            format_age(now.signed_duration_since(backup.created_at)),
            name_width = name_width,
        ));
    }

    let total: u64 = backups.iter().map(|b| b.size_bytes).sum();
    output.push_str(&format!(
        "\nTotal: {} backup(s), {}\n",
        backups.len(),
        format_size(total)
    ));

    output
}

/// Format the details of one archive
pub fn format_backup_details(path: &Path, size_bytes: u64, summary: &ArchiveSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Backup: {}\n", path.display()));
    output.push_str(&format!("  Size:           {}\n", format_size(size_bytes)));
    output.push_str(&format!("  Layout:         {}\n", summary.layout));
    output.push_str(&format!("  Entries:        {}\n", summary.entry_count));
    output.push_str(&format!("  Data entries:   {}\n", summary.data_entries));
    output.push_str(&format!("  Photo entries:  {}\n", summary.photo_entries));

    output
}

/// Format the sizes of the live data roots
pub fn format_data_size(size: &DataSize, data_dir: &Path, photos_dir: &Path) -> String {
    let mut output = String::new();

    output.push_str(&format!("Total data:   {}\n", format_size(size.total())));
    output.push_str(&format!(
        "  Documents:  {:>10}  ({})\n",
        format_size(size.structured_bytes),
        data_dir.display()
    ));
    output.push_str(&format!(
        "  Photos:     {:>10}  ({})\n",
        format_size(size.media_bytes),
        photos_dir.display()
    ));

    output
}

/// Format a duration in human-readable form
pub fn format_age(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}
