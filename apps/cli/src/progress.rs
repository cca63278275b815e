//! Terminal progress bar and the interactive duplicate prompt.

use std::io::{BufRead, Write};

use indicatif::{ProgressBar, ProgressStyle};

use vanbuilder_core::{BatchProgress, Confirmer, Decision, TargetReport};
use vanbuilder_shared::{BuilderRecord, Target, VanBuilderError};

/// Batch progress on an indicatif bar.
pub(crate) struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub(crate) fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {wide_msg}")
        {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    /// Handle for collaborators that print while the bar is drawing.
    pub(crate) fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchProgress for CliProgress {
    fn target_started(&self, _index: usize, _total: usize, target: &Target) {
        self.bar.set_message(format!("{} ({})", target.url, target.state));
    }

    fn attempt_failed(&self, target: &Target, attempt: u32, error: &VanBuilderError) {
        self.bar
            .set_message(format!("{} attempt {attempt} failed: {error}", target.url));
    }

    fn target_finished(&self, entry: &TargetReport) {
        self.bar.inc(1);
        self.bar.println(format!(
            "  {:<7} {}",
            entry.outcome.as_str(),
            entry.name.as_deref().unwrap_or(&entry.url)
        ));
    }
}

/// Asks on stdin before an existing record is replaced.
pub(crate) struct StdinConfirmer {
    bar: Option<ProgressBar>,
}

impl StdinConfirmer {
    pub(crate) fn new(bar: Option<ProgressBar>) -> Self {
        Self { bar }
    }

    fn ask(existing: &BuilderRecord, proposed: &BuilderRecord, decision: Decision) -> bool {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err);
        let _ = writeln!(err, "  Duplicate: {} ({})", proposed.name, proposed.state);
        let _ = writeln!(
            err,
            "    existing: {} fields, {} photos, {}",
            existing.contact_completeness(),
            existing.photos.len(),
            existing.website
        );
        let _ = writeln!(
            err,
            "    incoming: {} fields, {} photos, {}",
            proposed.contact_completeness(),
            proposed.photos.len(),
            proposed.website
        );
        let _ = write!(err, "  Apply {decision}? [y/N] ");
        let _ = err.flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

impl Confirmer for StdinConfirmer {
    fn confirm(&self, existing: &BuilderRecord, proposed: &BuilderRecord, decision: Decision) -> bool {
        match &self.bar {
            Some(bar) => bar.suspend(|| Self::ask(existing, proposed, decision)),
            None => Self::ask(existing, proposed, decision),
        }
    }
}
