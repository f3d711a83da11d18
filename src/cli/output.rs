//! CLI output formatting

use console::Emoji;
use std::path::Path;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// One-line workspace summary for run output
pub fn format_workspace(branch: &str, commit: &str, directory: &Path) -> String {
    let short = &commit[..commit.len().min(8)];
    format!(
        "{} @ {} in {}",
        style(branch).cyan(),
        style(short).dim(),
        directory.display()
    )
}

/// Human-readable duration
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
