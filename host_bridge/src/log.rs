//! Application log sink.
//!
//! Every line the client wants recorded on the host goes through [`log_message`], which
//! classifies it by keyword and forwards it to `tracing`.

use core::fmt;

/// Keywords marking a message as an error report. Matched case-insensitively.
const ERROR_MARKERS: [&str; 3] = ["error", "fail", "lỗi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Log,
    Error,
}

impl Severity {
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if ERROR_MARKERS.iter().any(|marker| lower.contains(marker)) {
            Self::Error
        } else {
            Self::Log
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Log => f.write_str("LOG"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Records `message` and returns the line as it was written.
pub fn log_message(message: &str) -> String {
    let severity = Severity::classify(message);
    match severity {
        Severity::Error => tracing::error!(target: "devicehub::app", "{message}"),
        Severity::Log => tracing::info!(target: "devicehub::app", "{message}"),
    }
    format!("[{severity}] {message}")
}
