//! Consumer-facing interfaces driven by refresh.
//!
//! All methods are invoked on the UI context only.

use std::sync::Arc;

use crate::{BufferId, DiagnosticItem, EntryKey, RenderError, Severity, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPriority {
	High,
	Normal,
	Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskCategory {
	Error,
	Warning,
	Message,
}

/// Navigable error-list entry. Line and column are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
	pub file: String,
	pub line: u32,
	pub column: u32,
	pub message: String,
	pub priority: TaskPriority,
	pub category: TaskCategory,
}

impl TaskItem {
	pub(crate) fn from_item(file: &str, item: &DiagnosticItem) -> Self {
		let start = item.span().start;
		let (priority, category) = match item.severity() {
			Severity::Error | Severity::SyntaxError => (TaskPriority::High, TaskCategory::Error),
			Severity::Warning => (TaskPriority::Normal, TaskCategory::Warning),
			Severity::Other | Severity::None => (TaskPriority::Low, TaskCategory::Message),
		};
		Self {
			file: file.to_string(),
			line: start.line,
			column: start.column,
			message: item.message().to_string(),
			priority,
			category,
		}
	}
}

/// Registration token handed out by a [`TaskListSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskListHandle(pub u64);

/// Navigable task list (error list) that re-enumerates on demand.
pub trait TaskListSink: Send + Sync {
	fn register(&self) -> Result<TaskListHandle, RenderError>;
	fn refresh(&self, handle: TaskListHandle, items: &[TaskItem]) -> Result<(), RenderError>;
	fn unregister(&self, handle: TaskListHandle);
}

/// One inline marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SquiggleTag {
	pub key: EntryKey,
	pub span: SourceSpan,
	pub severity: Severity,
	pub message: String,
}

impl SquiggleTag {
	pub(crate) fn from_item(key: &EntryKey, item: &DiagnosticItem) -> Self {
		Self {
			key: key.clone(),
			span: item.span(),
			severity: item.severity(),
			message: item.message().to_string(),
		}
	}
}

/// Per-buffer marker surface.
pub trait SquiggleTagger: Send + Sync {
	/// Removes every tag for which `predicate` returns true.
	fn clear(&self, predicate: &dyn Fn(&SquiggleTag) -> bool);
	fn add(&self, tag: SquiggleTag) -> Result<(), RenderError>;
}

/// Looks up the tagger of a live buffer.
pub trait SquiggleRenderer: Send + Sync {
	fn tagger(&self, buffer: BufferId) -> Option<Arc<dyn SquiggleTagger>>;
}
