//! Diagnostic log of the commands executed during one logical request.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::command::SharedError;
use crate::metrics::Outcome;

/// One `execute()` call. The engine keeps writing to it after it has been
/// appended to the log, so readers always see the latest state.
#[derive(Debug)]
pub struct ExecutionRecord {
    command_key: String,
    state: Mutex<RecordState>,
}

#[derive(Debug, Default, Clone)]
struct RecordState {
    events: Vec<Outcome>,
    start_time_ms: Option<u64>,
    execution_time_ms: Option<i64>,
    error: Option<SharedError>,
}

impl ExecutionRecord {
    pub fn new(command_key: impl Into<String>) -> Self {
        Self {
            command_key: command_key.into(),
            state: Mutex::new(RecordState::default()),
        }
    }

    /// A finished record, as rendered by the log.
    pub fn completed(
        command_key: impl Into<String>,
        execution_time_ms: Option<i64>,
        events: impl IntoIterator<Item = Outcome>,
    ) -> Self {
        let record = Self::new(command_key);
        {
            let mut state = record.state.lock();
            state.events.extend(events);
            state.execution_time_ms = execution_time_ms;
        }
        record
    }

    pub fn command_key(&self) -> &str {
        &self.command_key
    }

    /// Events in emission order.
    pub fn events(&self) -> Vec<Outcome> {
        self.state.lock().events.clone()
    }

    /// Wall time spent in the work function; `None` when it never ran.
    pub fn execution_time_ms(&self) -> Option<i64> {
        self.state.lock().execution_time_ms
    }

    /// Clock reading, in epoch milliseconds, when the work function was
    /// invoked; `None` when it never ran.
    pub fn start_time_ms(&self) -> Option<u64> {
        self.state.lock().start_time_ms
    }

    /// Error raised by the work function, if any.
    pub fn error(&self) -> Option<SharedError> {
        self.state.lock().error.clone()
    }

    pub(crate) fn push_event(&self, outcome: Outcome) {
        self.state.lock().events.push(outcome);
    }

    pub(crate) fn set_start_time(&self, millis: u64) {
        self.state.lock().start_time_ms = Some(millis);
    }

    pub(crate) fn set_execution_time(&self, millis: i64) {
        self.state.lock().execution_time_ms = Some(millis);
    }

    pub(crate) fn set_error(&self, error: SharedError) {
        self.state.lock().error = Some(error);
    }

    fn label(&self) -> String {
        let state = self.state.lock();
        let events = if state.events.is_empty() {
            "Executed".to_string()
        } else {
            state
                .events
                .iter()
                .map(Outcome::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{}[{}]", self.command_key, events)
    }
}

/// Append-only list of execution records. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    records: Arc<Mutex<Vec<Arc<ExecutionRecord>>>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_executed_command(&self, record: Arc<ExecutionRecord>) {
        self.records.lock().push(record);
    }

    pub fn executed_commands(&self) -> Vec<Arc<ExecutionRecord>> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Human readable summary, e.g.
    /// `commandA[FAILURE][100ms], commandA[SUCCESS][65ms]x2, commandB[Executed][0ms]`.
    ///
    /// Consecutive records with the same label collapse into one entry whose
    /// time is the accumulated time of the run. Negative or missing times
    /// count as 0.
    pub fn executed_commands_as_string(&self) -> String {
        let mut runs: Vec<(String, i64, usize)> = Vec::new();
        for record in self.executed_commands() {
            let label = record.label();
            let millis = record.execution_time_ms().unwrap_or(0).max(0);
            match runs.last_mut() {
                Some((last, total, count)) if *last == label => {
                    *total += millis;
                    *count += 1;
                }
                _ => runs.push((label, millis, 1)),
            }
        }

        let mut output = String::new();
        for (label, total, count) in runs {
            if !output.is_empty() {
                output.push_str(", ");
            }
            let _ = write!(output, "{label}[{total}ms]");
            if count > 1 {
                let _ = write!(output, "x{count}");
            }
        }
        output
    }
}
