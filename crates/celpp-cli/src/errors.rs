//! Error reporting on stderr

use colored::*;

/// Print a formatted error message
pub fn print_error(context: &str, error: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), context);
    let mut shown = error.to_string();
    for line in shown.lines() {
        eprintln!("  {}", line.red());
    }

    // Show chain of causes, skipping those already quoted by their parent
    let mut current = error.source();
    while let Some(cause) = current {
        let message = cause.to_string();
        if !shown.contains(&message) {
            eprintln!("  {} {}", "Caused by:".dimmed(), message.dimmed());
        }
        shown = message;
        current = std::error::Error::source(cause);
    }
}

/// Print an error with a suggestion
pub fn print_error_with_suggestion(context: &str, error: &anyhow::Error, suggestion: &str) {
    print_error(context, error);
    eprintln!("\n{} {}", "Suggestion:".cyan().bold(), suggestion);
}
