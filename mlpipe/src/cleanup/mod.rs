//! Interactive removal of the working directories.
//!
//! Removal is opt-in: only a literal `y` or `Y` answer deletes anything.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Question asked at the end of a successful run.
pub const CLEANUP_QUESTION: &str = "Clean up test directories? (y/N): ";

/// Returns true only for `y` or `Y`, ignoring surrounding whitespace.
#[must_use]
pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim(), "y" | "Y")
}

/// Asks the operator a yes/no question.
pub trait Confirm: Send + Sync + std::fmt::Debug {
    /// Returns true if the operator agreed.
    fn confirm(&self, question: &str) -> bool;
}

/// Asks on the terminal: prompt on stdout, answer from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> bool {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        CleanupPrompt::new(stdin.lock(), stdout.lock()).ask(question)
    }
}

/// Answers every question the same way, for `--yes` and `--keep`.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, question: &str) -> bool {
        info!(question = question.trim(), answer = self.0, "Answered without prompting");
        self.0
    }
}

/// A y/N prompt over any reader/writer pair.
#[derive(Debug)]
pub struct CleanupPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> CleanupPrompt<R, W> {
    /// Creates a prompt.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes `question` and reads one line. EOF and read errors count as no.
    pub fn ask(&mut self, question: &str) -> bool {
        if write!(self.output, "{question}").and_then(|()| self.output.flush()).is_err() {
            return false;
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                let _ = writeln!(self.output);
                false
            }
            Ok(_) => parse_answer(&line),
        }
    }
}

/// Result of removing the working directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    /// Directories that were removed.
    pub removed: Vec<PathBuf>,
    /// Directories that did not exist.
    pub absent: Vec<PathBuf>,
    /// Directories that could not be removed, with the error.
    pub failed: Vec<(PathBuf, String)>,
}

/// Removes each directory recursively.
///
/// Best effort: failures are logged and collected, never returned as errors.
pub fn remove_dirs(dirs: &[PathBuf]) -> CleanupOutcome {
    let mut outcome = CleanupOutcome::default();
    for dir in dirs {
        match remove_dir(dir) {
            Ok(true) => {
                info!(dir = %dir.display(), "Removed");
                outcome.removed.push(dir.clone());
            }
            Ok(false) => outcome.absent.push(dir.clone()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to remove directory");
                outcome.failed.push((dir.clone(), e.to_string()));
            }
        }
    }
    outcome
}

fn remove_dir(dir: &Path) -> std::io::Result<bool> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
