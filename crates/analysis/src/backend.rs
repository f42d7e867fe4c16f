//! Collaborators the pipeline drives: text buffers, the parser, and the
//! project entry that owns the analysis tree.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use kestrel_diagnostics::{BufferId, Severity, SnapshotVersion, SourceSpan};

use crate::EditBatch;

/// Immutable text of one buffer at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
	pub buffer: BufferId,
	pub text: Arc<str>,
	pub version: SnapshotVersion,
}

impl BufferSnapshot {
	/// Buffer id and version used for sources read straight from disk.
	pub const FILE_BUFFER: BufferId = BufferId(0);
	pub const FILE_VERSION: SnapshotVersion = SnapshotVersion::new(0);

	pub fn new(buffer: BufferId, text: impl Into<Arc<str>>, version: SnapshotVersion) -> Self {
		Self {
			buffer,
			text: text.into(),
			version,
		}
	}

	pub fn from_file(text: impl Into<Arc<str>>) -> Self {
		Self::new(Self::FILE_BUFFER, text, Self::FILE_VERSION)
	}
}

/// Handle returned by [`TextBuffer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receives change notifications. May be invoked from any thread.
pub trait BufferEvents: Send + Sync {
	fn on_edits(&self, buffer: BufferId, batch: &EditBatch);
	fn on_encoding_changed(&self, buffer: BufferId);
}

/// A live, editable document.
pub trait TextBuffer: Send + Sync {
	fn id(&self) -> BufferId;
	fn snapshot(&self) -> BufferSnapshot;
	fn subscribe(&self, events: Arc<dyn BufferEvents>) -> SubscriptionId;
	/// Unknown ids are ignored.
	fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Parser-owned tree; opaque to the pipeline.
pub type SyntaxTree = Arc<dyn Any + Send + Sync>;

/// One diagnostic reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDiagnostic {
	pub span: SourceSpan,
	pub message: String,
	pub severity: Severity,
}

#[derive(Default)]
pub struct ParseOutcome {
	pub tree: Option<SyntaxTree>,
	pub diagnostics: Vec<ParsedDiagnostic>,
}

impl fmt::Debug for ParseOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ParseOutcome")
			.field("tree", &self.tree.is_some())
			.field("diagnostics", &self.diagnostics)
			.finish()
	}
}

/// External parser. Called off the UI thread, concurrently across groups.
pub trait ParserBackend: Send + Sync {
	fn parse(&self, snapshots: &[BufferSnapshot]) -> ParseOutcome;
}

/// Identifies what a tree update was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCookie {
	/// Buffer versions parsed together, in group order.
	Buffers(Vec<(BufferId, SnapshotVersion)>),
	/// A file read from disk.
	File { path: PathBuf },
}

/// Project-side owner of a source's analysis tree.
pub trait ProjectEntry: Send + Sync {
	/// Path used to key diagnostics. `None` for ephemeral sources.
	fn file_path(&self) -> Option<&str>;
	/// Called exactly once, when the owning group is disposed.
	fn on_analysis_stopped(&self);
	/// Called exactly once per completed parse, successful or not.
	fn update_tree(&self, tree: Option<SyntaxTree>, cookie: Option<ParseCookie>);
}
