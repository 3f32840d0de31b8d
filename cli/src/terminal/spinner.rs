use std::sync::{Arc, Mutex};
use std::time::Instant;

use colored::*;
use converge_core::{ProgressSink, Step};
use converge_protocols::status::ConvergenceState;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::{colors, format, print};

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// The step a run is in, readable from outside the run.
#[derive(Clone, Default)]
pub struct StepTracker(Arc<Mutex<Option<Step>>>);

impl StepTracker {
    pub fn current(&self) -> Option<Step> {
        self.0.lock().ok().and_then(|step| *step)
    }

    fn set(&self, step: Step) {
        if let Ok(mut current) = self.0.lock() {
            *current = Some(step);
        }
    }
}

/// Shows progress on a spinner line and prints remote log lines above it.
///
/// Dropping the sink closes its span, which removes the spinner.
pub struct SpinnerSink {
    span: Span,
    quiet: u8,
    tracker: StepTracker,
    total_steps: usize,
    steps_seen: usize,
    started: Instant,
}

impl SpinnerSink {
    pub fn new(quiet: u8, total_steps: usize, tracker: StepTracker) -> Self {
        let span: Span = info_span!("converge", indicatif.pb_show = true);
        let style: ProgressStyle = ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        span.pb_set_style(&style);
        // The bar appears on first entry and stays until the span closes.
        span.in_scope(|| {});

        Self {
            span,
            quiet,
            tracker,
            total_steps,
            steps_seen: 0,
            started: Instant::now(),
        }
    }

    fn elapsed(&self) -> String {
        format::elapsed(self.started.elapsed())
    }
}

impl ProgressSink for SpinnerSink {
    fn log_line(&mut self, line: &str) {
        if self.quiet < 2 {
            print::remote_line(line);
        }
    }

    fn state(&mut self, state: &ConvergenceState, cursor: usize) {
        let message: String = format!(
            "cloud-init {} · {} log lines · {}",
            format::state(state),
            cursor.to_string().color(colors::ACCENT),
            self.elapsed()
        );
        self.span.pb_set_message(&message);
    }

    fn address_switched(&mut self, from: &str, to: &str) {
        self.span.pb_set_message(&format!(
            "continuing on {} (was {from})",
            to.color(colors::MESH_ADDR)
        ));
    }

    fn step(&mut self, step: Step) {
        self.tracker.set(step);
        self.steps_seen += 1;
        if self.quiet == 0 {
            print::step_line(self.steps_seen, self.total_steps, step.title());
        }
        self.span
            .pb_set_message(&format!("{}...", step.title()).color(colors::TEXT_DEFAULT).to_string());
    }
}
