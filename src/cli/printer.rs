//! Terminal printer for streamed subprocess output
//!
//! Prints lines as they arrive from apt, pip and systemctl so long
//! operations stay visible instead of appearing all at once at the end.

use crate::system::{OutputCallback, OutputLine, OutputStream};
use console::style;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Callback that prints subprocess output lines to the terminal
#[derive(Debug, Default)]
pub struct StreamPrinter {
    lines_printed: AtomicUsize,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print a step header: `[N/M] Step Name`
    pub fn print_step_header(&self, step_num: usize, total: usize, step_name: &str) {
        println!(
            "\n[{} / {}] {}\n",
            style(step_num).cyan(),
            style(total).dim(),
            style(step_name).bold()
        );
    }

    /// Print a horizontal rule spanning the terminal width
    pub fn print_separator(&self) {
        let width = term_size::dimensions_stdout().map(|(w, _)| w).unwrap_or(80);
        println!("{}", "─".repeat(width));
    }

    pub fn lines_printed(&self) -> usize {
        self.lines_printed.load(Ordering::SeqCst)
    }

    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }
}

impl OutputCallback for StreamPrinter {
    fn on_line(&self, line: &OutputLine) {
        match line.stream {
            OutputStream::Stdout => println!("  {}", line.line),
            OutputStream::Stderr => println!("  {}", style(&line.line).yellow()),
        }
        self.lines_printed.fetch_add(1, Ordering::SeqCst);
        self.flush_stdout();
    }
}
