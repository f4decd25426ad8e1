use std::io::Write;

use client_core::{ComparisonView, Panel, ResultPresenter};

/// Prints the comparison as labelled lines.
pub struct TerminalPresenter<W: Write> {
    out: W,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultPresenter for TerminalPresenter<W> {
    fn render(&mut self, view: &ComparisonView) {
        for panel in view.panels() {
            let line = match panel {
                Panel::Loading { caption } => format!("... {caption}"),
                Panel::Image { label, source } => format!("{label:<18} {source}"),
            };
            if let Err(err) = writeln!(self.out, "{line}") {
                tracing::warn!(error = %err, "presenter: failed to write output");
                return;
            }
        }
    }
}
