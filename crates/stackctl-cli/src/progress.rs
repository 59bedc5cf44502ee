//! Plain-line progress output for apply runs

use stackctl_core::apply::{Phase, ProgressEvent, ProgressSink};
use std::io::Write;

/// Prints one line per phase and per finished job
pub struct TerminalProgress<W: Write> {
    out: W,
    total: usize,
    done: usize,
}

impl<W: Write> TerminalProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: 0,
            done: 0,
        }
    }
}

fn phase_title(phase: Phase) -> &'static str {
    match phase {
        Phase::Remove => "Removing",
        Phase::Marketplaces => "Updating marketplaces",
        Phase::Install => "Installing",
    }
}

// Progress output is best effort; a closed stdout must not abort the apply.
impl<W: Write> ProgressSink for TerminalProgress<W> {
    fn phase_started(&mut self, phase: Phase, total: usize) {
        self.total = total;
        self.done = 0;
        let _ = writeln!(self.out, "==> {} ({total})", phase_title(phase));
    }

    fn item_finished(&mut self, event: &ProgressEvent) {
        self.done += 1;
        let counter = format!("[{}/{}]", self.done, self.total);
        let _ = match &event.error {
            None => writeln!(self.out, "  {counter} ok    {} {}", event.kind, event.name),
            Some(error) => writeln!(
                self.out,
                "  {counter} FAIL  {} {}: {}",
                event.kind,
                event.name,
                error.lines().next().unwrap_or_default()
            ),
        };
    }

    fn phase_finished(&mut self, phase: Phase, failed: usize) {
        if failed > 0 {
            let _ = writeln!(self.out, "    {failed} {phase} job(s) failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackctl_core::apply::JobKind;

    #[test]
    fn test_lines_per_phase_and_job() {
        let mut progress = TerminalProgress::new(Vec::new());
        progress.phase_started(Phase::Install, 2);
        progress.item_finished(&ProgressEvent {
            phase: Phase::Install,
            name: "lint@web".into(),
            kind: JobKind::Plugin,
            success: true,
            error: None,
        });
        progress.item_finished(&ProgressEvent {
            phase: Phase::Install,
            name: "db".into(),
            kind: JobKind::Mcp,
            success: false,
            error: Some("Command failed\nmore detail".into()),
        });
        progress.phase_finished(Phase::Install, 1);

        let text = String::from_utf8(progress.out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "==> Installing (2)");
        assert!(lines[1].starts_with("  [1/2] ok"));
        assert!(lines[1].ends_with("lint@web"));
        assert!(lines[2].contains("[2/2] FAIL"));
        assert!(lines[2].ends_with("db: Command failed"));
        assert_eq!(lines[3], "    1 install job(s) failed");
    }
}
