//! Pretty-printing messages to the console

use colored::Colorize;

/// Pretty-print an error message to the console
pub fn error(error_message: String) {
    let error_title = "error:".red().bold();
    eprintln!("{} {}", error_title, error_message);
}

/// Print one of the driver's stage banners
pub fn section(title: &str) {
    println!("{}", format!("--- {} ---", title).bold());
}
