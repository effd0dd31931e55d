//! Captures `log` records emitted while unit tests run.

use log::{LevelFilter, Log, Metadata, Record};
use std::sync::Mutex;

pub(crate) struct CapturedLogs(Mutex<Vec<String>>);

static CAPTURED: CapturedLogs = CapturedLogs(Mutex::new(Vec::new()));

impl CapturedLogs {
    /// Every message captured so far, from all tests in this binary.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Log for CapturedLogs {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.0.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

/// Installs the capturing logger on first use.
pub(crate) fn capture() -> &'static CapturedLogs {
    if log::set_logger(&CAPTURED).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
    &CAPTURED
}
