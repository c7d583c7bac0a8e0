//! Colored status lines for CLI commands, written to stderr.

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

fn line(color: &str, mark: char, message: &str) -> String {
    format!("  {color}{mark}{RESET} {message}")
}

/// Reports a completed step.
#[allow(clippy::print_stderr)]
pub fn success(message: &str) {
    eprintln!("{}", line(GREEN, '✓', message));
}

/// Reports something worth noticing that is not an error.
#[allow(clippy::print_stderr)]
pub fn note(message: &str) {
    eprintln!("{}", line(YELLOW, '!', message));
}

/// Reports a failed step that did not abort the command.
#[allow(clippy::print_stderr)]
pub fn failure(message: &str) {
    eprintln!("{}", line(RED, '✗', message));
}
