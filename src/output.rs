use std::io::{self, BufRead, IsTerminal, Write};

/// Environment variable that disables every interactive prompt.
pub const NON_INTERACTIVE_ENV: &str = "TURBINE_NON_INTERACTIVE";

/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// output can be suppressed (`--quiet`) and prompts can be answered up front
/// (`--yes`) without touching command logic.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Creating farm...")
    fn status(&self, message: &str);

    /// Success message (e.g., "Project demo-astro-airflow created")
    fn success(&self, message: &str);

    /// Warning message (e.g., "Failed to drop database")
    fn warning(&self, message: &str);

    /// Error message.
    fn error(&self, message: &str);

    /// Machine-readable output (JSON). Printed even when quiet.
    fn data(&self, text: &str);

    /// A blank line separator.
    fn blank(&self);

    /// Ask a yes/no question. Returns `default` when no answer can be read.
    fn confirm(&self, question: &str, default: bool) -> bool;

    /// Ask for a line of text. `None` when not interactive.
    fn ask(&self, question: &str) -> Option<String>;
}

/// Standard CLI output: stdout for results, stderr for warnings and errors.
pub struct CliOutput {
    assume_yes: bool,
}

impl CliOutput {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("\x1b[32m{}\x1b[0m", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("\x1b[33m{}\x1b[0m", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }

    fn data(&self, text: &str) {
        println!("{}", text);
    }

    fn blank(&self) {
        println!();
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        if self.assume_yes {
            return true;
        }
        if !is_interactive() {
            tracing::debug!(question, default, "not interactive, using default answer");
            return default;
        }
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!("{} {} ", question, hint);
        io::stdout().flush().ok();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return default;
        }
        parse_answer(&answer, default)
    }

    fn ask(&self, question: &str) -> Option<String> {
        if !is_interactive() {
            return None;
        }
        print!("{} ", question);
        io::stdout().flush().ok();

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer).ok()?;
        Some(answer.trim().to_string())
    }
}

/// Suppresses everything except machine-readable data. Prompts resolve to
/// `yes` when `--yes` was given and to their default otherwise.
pub struct QuietOutput {
    assume_yes: bool,
}

impl QuietOutput {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, message: &str) {
        eprintln!("{}", message);
    }
    fn data(&self, text: &str) {
        println!("{}", text);
    }
    fn blank(&self) {}
    fn confirm(&self, _question: &str, default: bool) -> bool {
        self.assume_yes || default
    }
    fn ask(&self, _question: &str) -> Option<String> {
        None
    }
}

/// Whether prompts can be shown: stdin and stdout are terminals and
/// `TURBINE_NON_INTERACTIVE` is unset.
pub fn is_interactive() -> bool {
    if std::env::var_os(NON_INTERACTIVE_ENV).is_some() {
        return false;
    }
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n", false));
        assert!(parse_answer(" YES ", false));
        assert!(!parse_answer("n", true));
        assert!(parse_answer("", true));
        assert!(!parse_answer("maybe", false));
    }

    #[test]
    fn test_quiet_output_confirm() {
        assert!(QuietOutput::new(true).confirm("delete?", false));
        assert!(!QuietOutput::new(false).confirm("delete?", false));
    }
}
