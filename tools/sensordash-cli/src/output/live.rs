//! Live Output Formatting (for watch command)

use chrono::{DateTime, Local};
use colored::Colorize;
use sensordash_ws_client::ConnectionStatus;

/// Format a status transition for live display
pub fn format_status(status: ConnectionStatus, at: DateTime<Local>) -> String {
    let time_str = at.format("%H:%M:%S%.3f").to_string().dimmed();
    let status_str = match status {
        ConnectionStatus::Connected => status.to_string().green(),
        ConnectionStatus::Connecting => status.to_string().cyan(),
        ConnectionStatus::Reconnecting => status.to_string().yellow(),
        ConnectionStatus::Disconnected => status.to_string().red(),
    };
    format!("{} | {}", time_str, status_str)
}

/// Heading printed above each snapshot
pub fn format_update_header(update: u64, clients: usize, sensors: usize, at: DateTime<Local>) -> String {
    format!(
        "{} | {} | {} clients, {} sensors",
        at.format("%H:%M:%S%.3f").to_string().dimmed(),
        format!("update:{update}").cyan(),
        clients,
        sensors
    )
}

/// Print a status transition to stdout
pub fn print_status(status: ConnectionStatus) {
    println!("{}", format_status(status, Local::now()));
}

/// Print subscription start message
pub fn print_watch_start(url: &str, pattern: &str) {
    println!(
        "📡 Watching sensors at: {} (subscription: {})",
        url.bold(),
        pattern.dimmed()
    );
    println!("{}", "Press Ctrl+C to stop".dimmed());
    println!();
}

/// Print subscription stop message
pub fn print_watch_stop() {
    println!();
    println!("{}", "✅ Stopped watching".green());
}
