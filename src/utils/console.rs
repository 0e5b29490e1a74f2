//! Console output shared by the session and its collaborators.
//!
//! Verbose output is switched on by `-v`, which exports [`VERBOSE_ENV`] so
//! every component can check it without threading a flag through.

use colored::Colorize;

pub const VERBOSE_ENV: &str = "DISTBUMP_VERBOSE";

pub fn verbose() -> bool {
    std::env::var(VERBOSE_ENV).is_ok()
}

pub fn debug(message: impl AsRef<str>) {
    if verbose() {
        eprintln!("{} {}", "[VERBOSE]".dimmed(), message.as_ref());
    }
}

pub fn info(message: impl AsRef<str>) {
    println!("{}", message.as_ref());
}

pub fn success(message: impl AsRef<str>) {
    println!("{}", format!("✓ {}", message.as_ref()).green());
}

pub fn warn(message: impl AsRef<str>) {
    println!("{}", format!("⚠ {}", message.as_ref()).yellow());
}

pub fn fail(message: impl AsRef<str>) {
    eprintln!("{}", format!("✗ {}", message.as_ref()).red().bold());
}
