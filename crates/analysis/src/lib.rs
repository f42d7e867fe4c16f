//! Incremental analysis of edited sources.
//!
//! Edit notifications flow through the [`ChangeClassifier`] into a
//! per-group [`BufferParser`], which debounces and serializes reparses onto
//! the shared [`ParseQueue`]. Parse results are published to a
//! [`DiagnosticsStore`](kestrel_diagnostics::DiagnosticsStore) as ordered
//! messages; the scheduler and the store never share a lock.

mod backend;
mod classify;
mod config;
mod dispatch;
mod error;
mod file_parse;
mod host;
mod scheduler;

pub use backend::{
	BufferEvents, BufferSnapshot, ParseCookie, ParseOutcome, ParsedDiagnostic, ParserBackend, ProjectEntry, SubscriptionId, SyntaxTree,
	TextBuffer,
};
pub use classify::{ChangeClassifier, ChangeKind, EditBatch, LINE_TERMINATOR, TextEdit};
pub use config::{AnalysisConfig, FileRetryConfig};
pub use dispatch::ParseQueue;
pub use error::{AnalysisError, ConfigError};
pub use file_parse::{FileSource, FsSource, is_transient, read_with_retry};
pub use host::AnalysisHost;
pub use scheduler::BufferParser;
