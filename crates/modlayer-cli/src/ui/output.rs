//! Console implementation of the core [`Reporter`].
//!
//! Status lines go to stdout, warnings and errors to stderr. Each call
//! prints whole lines, so messages from concurrent downloads never
//! interleave mid-line.

use crossterm::style::Stylize;
use modlayer_core::Reporter;

/// A cloneable handle commands and the core engine report through.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output;

#[allow(clippy::unused_self)]
impl Output {
    pub fn new() -> Self {
        Self
    }

    /// Prints a visual section header for an operation phase.
    pub fn section(&self, title: &str) {
        println!();
        println!("  {}", title.to_uppercase().bold());
    }

    /// Announces the refresh of one mod.
    pub fn fetching(&self, name: &str) {
        println!("  {} {}", "↻".dark_grey(), name);
    }

    /// Reports the start of a download. Byte progress is drawn by the
    /// command polling the task.
    pub fn downloading(&self, name: &str, tag: &str, current: u64, _total: Option<u64>) {
        if current == 0 {
            println!("  {} {} {}", "↓".cyan(), name, tag.dark_grey());
        }
    }

    /// Signals completion of a mod operation.
    pub fn done(&self, name: &str, tag: &str, detail: &str) {
        println!(
            "  {} {} {} {}",
            "✓".green(),
            name,
            tag.dark_grey(),
            detail.dark_grey()
        );
    }

    /// Marks a mod operation as failed with a visible reason.
    pub fn failed(&self, name: &str, tag: &str, reason: &str) {
        eprintln!("  {} {} {} {}", "✗".red(), name, tag.dark_grey(), reason);
    }

    pub fn info(&self, msg: &str) {
        println!("  {msg}");
    }

    pub fn success(&self, msg: &str) {
        println!("  {} {msg}", "✓".green());
    }

    pub fn warning(&self, msg: &str) {
        eprintln!("  {} {msg}", "warning:".yellow().bold());
    }

    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "error:".red().bold());
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        self.section(title);
    }

    fn fetching(&self, name: &str) {
        self.fetching(name);
    }

    fn downloading(&self, name: &str, tag: &str, current: u64, total: Option<u64>) {
        self.downloading(name, tag, current, total);
    }

    fn done(&self, name: &str, tag: &str, detail: &str) {
        self.done(name, tag, detail);
    }

    fn failed(&self, name: &str, tag: &str, reason: &str) {
        self.failed(name, tag, reason);
    }

    fn info(&self, msg: &str) {
        self.info(msg);
    }

    fn success(&self, msg: &str) {
        self.success(msg);
    }

    fn warning(&self, msg: &str) {
        self.warning(msg);
    }

    fn error(&self, msg: &str) {
        self.error(msg);
    }
}
