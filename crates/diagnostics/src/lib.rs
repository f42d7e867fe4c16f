//! Diagnostics aggregation for the analysis pipeline.
//!
//! Producers submit ordered [`WorkerMessage`]s to a [`DiagnosticsStore`]; one
//! consumer applies them to the [`DiagnosticsTable`] and a
//! [`RefreshCoalescer`] pushes the valid subset to the task list and to every
//! buffer registered in the [`ErrorSourceRegistry`], on the UI context.

mod config;
mod error;
mod item;
mod key;
mod message;
mod refresh;
mod registry;
mod sink;
mod store;
mod table;

pub use config::StoreConfig;
pub use error::{RenderError, StoreError};
pub use item::{DiagnosticItem, DiagnosticLevel, Severity, SnapshotVersion, SourcePosition, SourceSpan};
pub use key::EntryKey;
pub use message::{FlushSignal, WorkerMessage};
pub use refresh::{RefreshCoalescer, RefreshOutcome};
pub use registry::{BufferId, ErrorSourceRegistry};
pub use sink::{SquiggleRenderer, SquiggleTag, SquiggleTagger, TaskCategory, TaskItem, TaskListHandle, TaskListSink, TaskPriority};
pub use store::{DiagnosticsStore, DiagnosticsStoreBuilder};
pub use table::DiagnosticsTable;
