//! Showing a diff to the operator: change counts, pager discovery, and
//! rendering through a pager subprocess or directly to an output stream.

use crate::CoreError;
use console::Style;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use tracing::{debug, warn};

/// Count added and removed lines in a unified diff.
///
/// `+++`/`---` lines are file headers only outside a hunk. Inside a hunk,
/// whose extent comes from its `@@ -a,b +c,d @@` header, every `+`/`-` line
/// counts regardless of its content.
pub fn count_changes(diff: &str) -> (usize, usize) {
    let mut additions = 0;
    let mut removals = 0;
    let mut old_left = 0usize;
    let mut new_left = 0usize;

    for line in diff.lines() {
        if old_left == 0 && new_left == 0 {
            if let Some((old, new)) = parse_hunk_header(line) {
                old_left = old;
                new_left = new;
            } else if line.starts_with("+++") || line.starts_with("---") {
                // file header
            } else if line.starts_with('+') {
                additions += 1;
            } else if line.starts_with('-') {
                removals += 1;
            }
            continue;
        }

        match line.as_bytes().first() {
            Some(b'+') => {
                additions += 1;
                new_left = new_left.saturating_sub(1);
            }
            Some(b'-') => {
                removals += 1;
                old_left = old_left.saturating_sub(1);
            }
            Some(b'\\') => {}
            _ => {
                old_left = old_left.saturating_sub(1);
                new_left = new_left.saturating_sub(1);
            }
        }
    }
    (additions, removals)
}

fn parse_hunk_header(line: &str) -> Option<(usize, usize)> {
    let rest = line.strip_prefix("@@ -")?;
    let (ranges, _) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(" +")?;
    Some((range_len(old)?, range_len(new)?))
}

fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((_, len)) => len.parse().ok(),
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

/// A resolved pager program and the arguments to pass it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Look for a pager: `$PAGER` (which may carry arguments), then `pager`,
/// then `less`, each resolved on `PATH`.
pub fn find_pager() -> Option<PagerCommand> {
    let env = std::env::var("PAGER").ok();
    resolve_pager(env.as_deref(), |name| which::which(name).ok())
}

fn resolve_pager(
    env: Option<&str>,
    lookup: impl Fn(&str) -> Option<PathBuf>,
) -> Option<PagerCommand> {
    if let Some(value) = env {
        let mut parts = value.split_whitespace();
        if let Some(name) = parts.next() {
            if let Some(program) = lookup(name) {
                return Some(PagerCommand {
                    program,
                    args: parts.map(str::to_owned).collect(),
                });
            }
            debug!("$PAGER program '{name}' not found");
        }
    }
    ["pager", "less"].iter().find_map(|name| {
        lookup(name).map(|program| PagerCommand {
            program,
            args: Vec::new(),
        })
    })
}

/// A running pager with its input pipe.
///
/// `finish` closes the pipe and waits for the pager. Dropping an unfinished
/// session closes the pipe, then kills and reaps the child.
pub struct PagerSession {
    child: Child,
    stdin: Option<ChildStdin>,
    finished: bool,
}

impl PagerSession {
    pub fn spawn(command: &PagerCommand) -> io::Result<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child.stdin.take();
        Ok(Self {
            child,
            stdin,
            finished: false,
        })
    }

    /// Send text to the pager. A pager that already quit is not an error;
    /// any other write failure kills it.
    pub fn write(&mut self, text: &str) -> io::Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(());
        };
        match stdin.write_all(text.as_bytes()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("pager closed its input early");
                self.stdin = None;
                Ok(())
            }
            Err(e) => {
                self.stdin = None;
                let _ = self.child.kill();
                Err(e)
            }
        }
    }

    pub fn finish(mut self) -> io::Result<ExitStatus> {
        drop(self.stdin.take());
        let status = self.child.wait();
        self.finished = true;
        status
    }
}

impl Drop for PagerSession {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Renders diffs for the operator.
#[derive(Debug, Clone, Default)]
pub struct ChangePresenter {
    pager: Option<PagerCommand>,
    color: bool,
}

impl ChangePresenter {
    pub fn new(pager: Option<PagerCommand>, color: bool) -> Self {
        Self { pager, color }
    }

    /// Pager from the environment, color if the terminal supports it.
    pub fn detect() -> Self {
        Self::new(find_pager(), console::colors_enabled())
    }

    pub fn pager(&self) -> Option<&PagerCommand> {
        self.pager.as_ref()
    }

    /// Drop the pager so every render goes to the caller's output stream.
    #[must_use]
    pub fn without_pager(mut self) -> Self {
        self.pager = None;
        self
    }

    /// Show `diff` through the pager when one is available and `use_pager`
    /// is set, otherwise print it to `out` under a `Diff for <title>:` line.
    pub fn render(
        &self,
        diff: &str,
        title: &str,
        use_pager: bool,
        out: &mut dyn Write,
    ) -> Result<(), CoreError> {
        if use_pager {
            if let Some(pager) = &self.pager {
                if page(pager, diff) {
                    return Ok(());
                }
            }
        }

        writeln!(out, "Diff for {title}:")?;
        let added = Style::new().green().force_styling(true);
        let removed = Style::new().red().force_styling(true);
        for line in diff.lines() {
            if self.color && line.starts_with('+') && !line.starts_with("+++") {
                writeln!(out, "{}", added.apply_to(line))?;
            } else if self.color && line.starts_with('-') && !line.starts_with("---") {
                writeln!(out, "{}", removed.apply_to(line))?;
            } else {
                writeln!(out, "{line}")?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Returns false only when the pager could not be started, so the caller can
/// print the diff instead.
fn page(pager: &PagerCommand, diff: &str) -> bool {
    let mut session = match PagerSession::spawn(pager) {
        Ok(session) => session,
        Err(e) => {
            warn!("failed to start pager {}: {e}", pager.program.display());
            return false;
        }
    };
    if let Err(e) = session.write(diff) {
        warn!("failed to write diff to pager: {e}");
        return true;
    }
    match session.finish() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("pager {} exited with {status}", pager.program.display()),
        Err(e) => warn!("failed to wait for pager: {e}"),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(names: &'static [&'static str]) -> impl Fn(&str) -> Option<PathBuf> {
        move |name: &str| {
            names
                .iter()
                .any(|n| *n == name)
                .then(|| PathBuf::from(format!("/usr/bin/{name}")))
        }
    }

    #[test]
    fn counts_skip_file_headers() {
        assert_eq!(count_changes("+++ a\n--- b\n+x\n-y\n"), (1, 1));
    }

    #[test]
    fn counts_lines_inside_hunks_even_if_they_look_like_headers() {
        let diff = "--- version 1\n+++ version 2\n@@ -1,3 +1,3 @@\n\
                    \x20keep\n---comment\n+++comment\n tail\n";
        assert_eq!(count_changes(diff), (1, 1));
    }

    #[test]
    fn counts_across_multiple_hunks() {
        let diff = "--- version 1\n+++ version 2\n\
                    @@ -1,2 +1,2 @@\n a\n-b\n+c\n\
                    @@ -10 +10,2 @@\n x\n+y\n";
        assert_eq!(count_changes(diff), (2, 1));
    }

    #[test]
    fn empty_diff_counts_nothing() {
        assert_eq!(count_changes(""), (0, 0));
    }

    #[test]
    fn pager_env_wins_and_keeps_arguments() {
        let pager = resolve_pager(Some("less -R -F"), found(&["less", "pager"])).unwrap();
        assert_eq!(pager.program, PathBuf::from("/usr/bin/less"));
        assert_eq!(pager.args, vec!["-R".to_owned(), "-F".to_owned()]);
    }

    #[test]
    fn pager_falls_back_in_order() {
        let pager = resolve_pager(Some("most"), found(&["less", "pager"])).unwrap();
        assert_eq!(pager.program, PathBuf::from("/usr/bin/pager"));
        let pager = resolve_pager(None, found(&["less"])).unwrap();
        assert_eq!(pager.program, PathBuf::from("/usr/bin/less"));
    }

    #[test]
    fn no_pager_found() {
        assert_eq!(resolve_pager(Some(""), found(&[])), None);
    }

    #[test]
    fn render_without_pager_prints_directly() {
        let presenter = ChangePresenter::new(None, false);
        let mut out = Vec::new();
        presenter
            .render("-a\n+b\n", "edge-1 5 -> 6", true, &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Diff for edge-1 5 -> 6:\n-a\n+b\n"
        );
    }

    #[test]
    fn render_with_color_styles_changed_lines_only() {
        let presenter = ChangePresenter::new(None, true);
        let mut out = Vec::new();
        presenter
            .render("--- version 1\n context\n+b\n", "t", false, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("--- version 1\n context\n"));
        assert!(text.contains("\u{1b}["));
    }

    #[test]
    fn unstartable_pager_falls_back_to_direct_output() {
        let presenter = ChangePresenter::new(
            Some(PagerCommand {
                program: PathBuf::from("/nonexistent/edgectl-test-pager"),
                args: Vec::new(),
            }),
            false,
        );
        let mut out = Vec::new();
        presenter.render("+x\n", "t", true, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("Diff for t:"));
    }

    #[test]
    fn failing_pager_is_only_a_warning() {
        let Ok(program) = which::which("false") else {
            return;
        };
        let presenter = ChangePresenter::new(
            Some(PagerCommand {
                program,
                args: Vec::new(),
            }),
            false,
        );
        let mut out = Vec::new();
        presenter.render("+x\n-y\n", "t", true, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn without_pager_renders_into_the_given_stream() {
        let Ok(program) = which::which("cat") else {
            return;
        };
        let presenter = ChangePresenter::new(
            Some(PagerCommand {
                program,
                args: Vec::new(),
            }),
            false,
        )
        .without_pager();
        assert!(presenter.pager().is_none());
        let mut out = Vec::new();
        presenter.render("+x\n", "t", true, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Diff for t:\n+x\n");
    }

    #[test]
    fn pager_that_exits_early_is_not_an_error() {
        let Ok(program) = which::which("true") else {
            return;
        };
        let mut session = PagerSession::spawn(&PagerCommand {
            program,
            args: Vec::new(),
        })
        .unwrap();
        let big = "+line\n".repeat(100_000);
        session.write(&big).unwrap();
        assert!(session.finish().unwrap().success());
    }

    #[test]
    fn dropped_session_reaps_child() {
        let Ok(program) = which::which("sleep") else {
            return;
        };
        let session = PagerSession::spawn(&PagerCommand {
            program,
            args: vec!["30".to_owned()],
        })
        .unwrap();
        drop(session);
    }
}
