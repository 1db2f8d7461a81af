//! Step lifecycle sinks.
//!
//! Reporters are called synchronously and in step order. Their errors are
//! swallowed by the executor and never fail a run.

use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepEvent {
    pub pipeline: String,
    pub step: String,
    pub index: usize,
    pub total: usize,
}

pub trait ProgressReporter: Send + Sync {
    fn on_step_started(&self, event: &StepEvent) -> Result<()>;
    fn on_step_skipped(&self, event: &StepEvent) -> Result<()>;
    fn on_step_completed(&self, event: &StepEvent) -> Result<()>;
    fn on_step_failed(&self, event: &StepEvent, error: &Error) -> Result<()>;
}

impl<T: ProgressReporter + ?Sized> ProgressReporter for Arc<T> {
    fn on_step_started(&self, event: &StepEvent) -> Result<()> {
        (**self).on_step_started(event)
    }

    fn on_step_skipped(&self, event: &StepEvent) -> Result<()> {
        (**self).on_step_skipped(event)
    }

    fn on_step_completed(&self, event: &StepEvent) -> Result<()> {
        (**self).on_step_completed(event)
    }

    fn on_step_failed(&self, event: &StepEvent, error: &Error) -> Result<()> {
        (**self).on_step_failed(event, error)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_step_started(&self, _event: &StepEvent) -> Result<()> {
        Ok(())
    }

    fn on_step_skipped(&self, _event: &StepEvent) -> Result<()> {
        Ok(())
    }

    fn on_step_completed(&self, _event: &StepEvent) -> Result<()> {
        Ok(())
    }

    fn on_step_failed(&self, _event: &StepEvent, _error: &Error) -> Result<()> {
        Ok(())
    }
}

/// Writes `[flow] ...` status lines, to stderr when it is a terminal or to
/// an explicit sink. Write failures come back as `reporter.failed`.
#[derive(Default)]
pub struct LogReporter {
    sink: Option<Mutex<Box<dyn Write + Send>>>,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Some(Mutex::new(Box::new(writer))),
        }
    }

    fn line(&self, event: &StepEvent, status: fmt::Arguments<'_>) -> Result<()> {
        let written = match &self.sink {
            Some(sink) => {
                let mut sink = sink
                    .lock()
                    .map_err(|_| Error::reporter_failed("Log sink lock poisoned"))?;
                write_line(&mut *sink, event, status)
            }
            None => {
                let stderr = io::stderr();
                if !stderr.is_terminal() {
                    return Ok(());
                }
                write_line(&mut stderr.lock(), event, status)
            }
        };
        written.map_err(|e| Error::reporter_failed(format!("Failed to write status line: {}", e)))
    }
}

fn write_line(out: &mut dyn Write, event: &StepEvent, status: fmt::Arguments<'_>) -> io::Result<()> {
    writeln!(
        out,
        "[flow] [{}/{}] {} {}",
        event.index + 1,
        event.total,
        event.step,
        status
    )?;
    out.flush()
}

impl ProgressReporter for LogReporter {
    fn on_step_started(&self, event: &StepEvent) -> Result<()> {
        self.line(event, format_args!("..."))
    }

    fn on_step_skipped(&self, event: &StepEvent) -> Result<()> {
        self.line(event, format_args!("skipped (already satisfied)"))
    }

    fn on_step_completed(&self, event: &StepEvent) -> Result<()> {
        self.line(event, format_args!("done"))
    }

    fn on_step_failed(&self, event: &StepEvent, error: &Error) -> Result<()> {
        self.line(event, format_args!("failed: {}", error))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEventKind {
    Started,
    Skipped,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedEvent {
    pub kind: StepEventKind,
    #[serde(flatten)]
    pub event: StepEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Keeps every event in memory, in the order received.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn kinds(&self) -> Vec<StepEventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }

    fn record(&self, kind: StepEventKind, event: &StepEvent, error: Option<&Error>) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| Error::reporter_failed("Event log lock poisoned"))?;
        events.push(RecordedEvent {
            kind,
            event: event.clone(),
            error: error.map(|e| e.message.clone()),
        });
        Ok(())
    }
}

impl ProgressReporter for RecordingReporter {
    fn on_step_started(&self, event: &StepEvent) -> Result<()> {
        self.record(StepEventKind::Started, event, None)
    }

    fn on_step_skipped(&self, event: &StepEvent) -> Result<()> {
        self.record(StepEventKind::Skipped, event, None)
    }

    fn on_step_completed(&self, event: &StepEvent) -> Result<()> {
        self.record(StepEventKind::Completed, event, None)
    }

    fn on_step_failed(&self, event: &StepEvent, error: &Error) -> Result<()> {
        self.record(StepEventKind::Failed, event, Some(error))
    }
}

/// Fans one event out to several reporters. Every reporter is called even if
/// an earlier one fails; the first error is returned.
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Arc<dyn ProgressReporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Arc<dyn ProgressReporter>>) -> Self {
        Self { reporters }
    }

    fn each<F>(&self, f: F) -> Result<()>
    where
        F: Fn(&dyn ProgressReporter) -> Result<()>,
    {
        let mut first_error = None;
        for reporter in &self.reporters {
            if let Err(e) = f(reporter.as_ref()) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl ProgressReporter for MultiReporter {
    fn on_step_started(&self, event: &StepEvent) -> Result<()> {
        self.each(|r| r.on_step_started(event))
    }

    fn on_step_skipped(&self, event: &StepEvent) -> Result<()> {
        self.each(|r| r.on_step_skipped(event))
    }

    fn on_step_completed(&self, event: &StepEvent) -> Result<()> {
        self.each(|r| r.on_step_completed(event))
    }

    fn on_step_failed(&self, event: &StepEvent, error: &Error) -> Result<()> {
        self.each(|r| r.on_step_failed(event, error))
    }
}
