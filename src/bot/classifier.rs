//! Output classification for bot stream lines.
//!
//! Lines are tagged purely by their originating stream: stdout is `info`,
//! stderr is `error`. The `system` kind is reserved for the synthetic
//! process-exit notice, produced exactly once per child lifetime. No
//! content-based parsing happens here; chat-message pattern matching is a
//! presentation-layer concern.

use serde::Serialize;

/// Which child output stream a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    /// The child's standard output.
    Stdout,
    /// The child's standard error.
    Stderr,
}

/// Display category assigned to an output event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Regular bot output (stdout).
    Info,
    /// Diagnostic output (stderr).
    Error,
    /// Shell-generated notice, currently only the process-exit message.
    System,
}

/// One classified line of bot output, or the exit notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEvent {
    /// Display category.
    pub kind: OutputKind,
    /// Line content, trimmed of surrounding whitespace.
    pub text: String,
}

/// Tag a completed line with the category of its originating stream.
#[must_use]
pub fn classify(source: StreamSource, text: &str) -> OutputEvent {
    let kind = match source {
        StreamSource::Stdout => OutputKind::Info,
        StreamSource::Stderr => OutputKind::Error,
    };
    OutputEvent {
        kind,
        text: text.to_owned(),
    }
}

/// Build the one-shot `system` notice for a child process exit.
///
/// `code` is `None` when the process was terminated by a signal.
#[must_use]
pub fn exit_event(code: Option<i32>) -> OutputEvent {
    let text = code.map_or_else(
        || "process terminated by signal".to_owned(),
        |c| format!("process exited (code: {c})"),
    );
    OutputEvent {
        kind: OutputKind::System,
        text,
    }
}
