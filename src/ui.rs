//! Terminal output style and interactive confirmation.
//!
//! Formatting state is carried in an explicit [`OutputStyle`] value passed
//! into the functions that need it; there is no process-wide mutable
//! formatting state. Progress and diagnostics elsewhere go through
//! `tracing`.
//!
//! The decision "should we attempt a privileged fix?" is separated from
//! its effect behind the [`Confirm`] trait, so the prerequisite checker is
//! drivable headlessly in tests.

use std::io::Write;

const BLUE: &str = "\x1b[94m";
const YELLOW: &str = "\x1b[93m";
const RESET: &str = "\x1b[0m";

/// Explicit formatting configuration.
#[derive(Debug, Clone, Copy)]
pub struct OutputStyle {
    /// Emit ANSI color codes.
    pub color: bool,
}

impl OutputStyle {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    /// Prints a section banner delimiting a top-level operation.
    pub fn section(&self, title: &str) {
        let rule = "=".repeat(60);
        println!("\n{}", self.paint(BLUE, &rule));
        println!("{}", self.paint(BLUE, &format!("  {}", title)));
        println!("{}\n", self.paint(BLUE, &rule));
    }
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self { color: true }
    }
}

// =============================================================================
// Confirmation
// =============================================================================

/// Answers yes/no questions before a privileged or mutating fix is
/// attempted.
pub trait Confirm: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Interactive confirmation on the controlling terminal.
pub struct StdinConfirm {
    style: OutputStyle,
}

impl StdinConfirm {
    pub fn new(style: OutputStyle) -> Self {
        Self { style }
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        loop {
            print!(
                "{} ",
                self.style.paint(YELLOW, &format!("[?] {} (y/n):", question))
            );
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                // Non-interactive stdin: decline rather than loop forever.
                return false;
            }
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => continue,
            }
        }
    }
}

/// Canned answer for headless runs and tests.
pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_style_has_no_escape_codes() {
        let style = OutputStyle::new(false);
        assert_eq!(style.paint(BLUE, "title"), "title");
    }

    #[test]
    fn colored_style_wraps_and_resets() {
        let style = OutputStyle::new(true);
        let painted = style.paint(BLUE, "title");
        assert!(painted.starts_with(BLUE));
        assert!(painted.ends_with(RESET));
    }

    #[test]
    fn fixed_confirm_is_canned() {
        assert!(FixedConfirm(true).confirm("anything?"));
        assert!(!FixedConfirm(false).confirm("anything?"));
    }
}
