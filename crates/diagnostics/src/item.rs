//! Immutable diagnostic values.

use bitflags::bitflags;

/// One endpoint of a span: byte offset plus zero-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SourcePosition {
	pub offset: usize,
	pub line: u32,
	pub column: u32,
}

impl SourcePosition {
	pub const fn new(offset: usize, line: u32, column: u32) -> Self {
		Self { offset, line, column }
	}
}

/// Half-open source range `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceSpan {
	pub start: SourcePosition,
	pub end: SourcePosition,
}

impl SourceSpan {
	pub const fn new(start: SourcePosition, end: SourcePosition) -> Self {
		Self { start, end }
	}

	/// Returns true when the span covers no text.
	pub const fn is_empty(&self) -> bool {
		self.end.offset <= self.start.offset
	}
}

/// Diagnostic severity as reported by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
	Error,
	Warning,
	SyntaxError,
	Other,
	/// No mapped category; items with this severity are never rendered.
	None,
}

impl Severity {
	pub const fn is_error(self) -> bool {
		matches!(self, Self::Error | Self::SyntaxError)
	}
}

bitflags! {
	/// Analysis layer that produced a diagnostic.
	///
	/// Used as a mask by replace and clear operations: an item matches a mask
	/// when their bits intersect.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct DiagnosticLevel: u8 {
		const SYNTAX = 1 << 0;
		const SEMANTICS = 1 << 1;
		const COMMENT = 1 << 2;
		const BUILD = 1 << 3;
		const ALL = Self::SYNTAX.bits() | Self::SEMANTICS.bits() | Self::COMMENT.bits() | Self::BUILD.bits();
	}
}

impl DiagnosticLevel {
	/// Returns true if an item produced at `level` falls under this mask.
	pub fn matches(self, level: DiagnosticLevel) -> bool {
		self.intersects(level)
	}
}

/// Opaque token identifying the buffer snapshot a diagnostic was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotVersion(u64);

impl SnapshotVersion {
	pub const fn new(version: u64) -> Self {
		Self(version)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

/// A single diagnostic. Immutable once created.
///
/// Validity is decided at construction: an item without a snapshot, with an
/// empty span, or with [`Severity::None`] cannot be resolved for rendering
/// and is dropped at refresh time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagnosticItem {
	message: String,
	span: SourceSpan,
	severity: Severity,
	level: DiagnosticLevel,
	snapshot: Option<SnapshotVersion>,
	valid: bool,
}

impl DiagnosticItem {
	pub fn new(message: impl Into<String>, span: SourceSpan, severity: Severity, level: DiagnosticLevel, snapshot: Option<SnapshotVersion>) -> Self {
		let valid = snapshot.is_some() && !span.is_empty() && severity != Severity::None;
		Self {
			message: message.into(),
			span,
			severity,
			level,
			snapshot,
			valid,
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn span(&self) -> SourceSpan {
		self.span
	}

	pub fn severity(&self) -> Severity {
		self.severity
	}

	pub fn level(&self) -> DiagnosticLevel {
		self.level
	}

	pub fn snapshot(&self) -> Option<SnapshotVersion> {
		self.snapshot
	}

	pub fn is_valid(&self) -> bool {
		self.valid
	}
}
