// restoretool/src/restore/confirm.rs
use std::io::{BufRead, Write};

use crate::errors::{RestoreError, Result};
use crate::restore::manifest::{Component, Manifest};

/// Operator consent before anything on the live environment is touched.
pub trait ConfirmationGate {
    /// Returns `Ok(true)` only on an explicit affirmative answer.
    fn confirm(&mut self, manifest: &Manifest) -> Result<bool>;
}

/// Interactive prompt over any reader/writer pair (stdin/stdout in the CLI).
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        TerminalPrompt::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalPrompt { input, output }
    }
}

impl<R: BufRead, W: Write> ConfirmationGate for TerminalPrompt<R, W> {
    fn confirm(&mut self, _manifest: &Manifest) -> Result<bool> {
        let io_err = |e: std::io::Error| RestoreError::Confirmation(e.to_string());

        write!(
            self.output,
            "⚠️  This will overwrite live data. Continue with restore? (yes/no): "
        )
        .map_err(io_err)?;
        self.output.flush().map_err(io_err)?;

        let mut answer = String::new();
        // EOF reads zero bytes and falls through as a decline.
        self.input.read_line(&mut answer).map_err(io_err)?;
        Ok(is_affirmative(&answer))
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("yes") || answer.eq_ignore_ascii_case("y")
}

/// Human-readable restore plan shown before the prompt.
pub fn render_plan(manifest: &Manifest, database_engine: &str) -> String {
    let mut lines = vec![
        "📋 Restore plan".to_string(),
        format!("   Backup type: {}", manifest.backup_type),
        format!("   Created:     {}", manifest.timestamp.to_rfc3339()),
        format!(
            "   Files:       {} ({} bytes)",
            manifest.metadata.file_count, manifest.metadata.size
        ),
        "   Components:".to_string(),
    ];
    for component in Component::ORDER {
        let status = if manifest.components.includes(component) {
            "restore"
        } else {
            "skip"
        };
        let detail = if component == Component::Database && manifest.components.includes(component) {
            format!(" [{}]", database_engine)
        } else {
            String::new()
        };
        lines.push(format!("     - {:<14} {}{}", component.key(), status, detail));
    }
    lines.join("\n")
}
