//! Progress reporting for long-running subprocess stages.
//!
//! A `Spinner` is started with a message and finishes exactly once: callers
//! consume it with `success` or `fail`, and a spinner dropped without either
//! reports a failure.
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerState {
    Started,
    Succeeded,
    Failed,
}

/// Receives spinner transitions.
pub trait ProgressSink: Send + Sync {
    fn update(&self, message: &str, state: SpinnerState);
}

/// Renders spinner transitions as log lines.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn update(&self, message: &str, state: SpinnerState) {
        match state {
            SpinnerState::Started => tracing::info!("{message}"),
            SpinnerState::Succeeded => tracing::info!("{message}: done"),
            SpinnerState::Failed => tracing::warn!("{message}: failed"),
        }
    }
}

/// Keeps every transition in memory; used by tests and `--json` runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, SpinnerState)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, SpinnerState)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn update(&self, message: &str, state: SpinnerState) {
        if let Ok(mut events) = self.events.lock() {
            events.push((message.to_string(), state));
        }
    }
}

pub struct Spinner<'a> {
    message: String,
    sink: &'a dyn ProgressSink,
    started: Instant,
    finished: bool,
}

impl<'a> Spinner<'a> {
    pub fn start(sink: &'a dyn ProgressSink, message: impl Into<String>) -> Self {
        let message = message.into();
        sink.update(&message, SpinnerState::Started);
        Self {
            message,
            sink,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn success(mut self) {
        self.finish(SpinnerState::Succeeded);
    }

    pub fn fail(mut self) {
        self.finish(SpinnerState::Failed);
    }

    fn finish(&mut self, state: SpinnerState) {
        if self.finished {
            return;
        }
        self.finished = true;
        tracing::debug!(
            elapsed_ms = self.started.elapsed().as_millis(),
            message = %self.message,
            ?state,
            "spinner finished"
        );
        self.sink.update(&self.message, state);
    }
}

impl Drop for Spinner<'_> {
    fn drop(&mut self) {
        self.finish(SpinnerState::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_reports_once() {
        let sink = RecordingSink::default();
        let spinner = Spinner::start(&sink, "Running terragrunt show");
        spinner.success();
        assert_eq!(
            sink.events(),
            vec![
                ("Running terragrunt show".to_string(), SpinnerState::Started),
                (
                    "Running terragrunt show".to_string(),
                    SpinnerState::Succeeded
                ),
            ]
        );
    }

    #[test]
    fn dropped_spinner_reports_failure() {
        let sink = RecordingSink::default();
        {
            let _spinner = Spinner::start(&sink, "Running terragrunt run-all plan");
        }
        let states: Vec<_> = sink.events().into_iter().map(|(_, state)| state).collect();
        assert_eq!(states, vec![SpinnerState::Started, SpinnerState::Failed]);
    }
}
