//! Decides how urgently an edit batch should trigger a reparse.
//!
//! Holding Enter produces a stream of bare line-break insertions; those are
//! line-only and wait out the debounce without counting as text. Typing text
//! and then pressing Enter is the moment a user expects feedback, so a
//! line change arriving right after a text change is urgent.

use std::time::Duration;

/// Line terminator inserted by the Enter key on this platform.
pub const LINE_TERMINATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// One replaced range within an edit batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
	pub old_text: String,
	pub new_text: String,
}

impl TextEdit {
	pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
		Self {
			old_text: old_text.into(),
			new_text: new_text.into(),
		}
	}

	/// Returns true for a bare Enter: nothing removed, one terminator added.
	pub fn is_line_break_insert(&self) -> bool {
		self.old_text.is_empty() && self.new_text == LINE_TERMINATOR
	}
}

/// Edits delivered in one change notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBatch {
	pub edits: Vec<TextEdit>,
	/// Whether the batch changed line structure.
	pub line_changed: bool,
}

impl EditBatch {
	pub fn new(edits: Vec<TextEdit>, line_changed: bool) -> Self {
		Self { edits, line_changed }
	}

	/// Single-edit batch; `line_changed` is derived from either side
	/// containing a newline.
	pub fn single(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
		let edit = TextEdit::new(old_text, new_text);
		let line_changed = edit.old_text.contains('\n') || edit.new_text.contains('\n');
		Self {
			edits: vec![edit],
			line_changed,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
	/// Text change followed by a line change: reparse now.
	Urgent,
	/// Real text edit: debounce, and remember it.
	Text,
	/// Only line breaks were inserted: debounce.
	LineOnly,
}

impl ChangeKind {
	pub fn is_text_change(self) -> bool {
		matches!(self, Self::Text)
	}

	/// Delay before the reparse fires.
	pub fn delay(self, debounce: Duration) -> Duration {
		match self {
			Self::Urgent => Duration::ZERO,
			Self::Text | Self::LineOnly => debounce,
		}
	}
}

/// Per-group classifier. Carries the "previous batch was text" flag.
#[derive(Debug, Clone, Default)]
pub struct ChangeClassifier {
	pending_text_change: bool,
}

impl ChangeClassifier {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_pending_text_change(&self) -> bool {
		self.pending_text_change
	}

	pub fn classify(&mut self, batch: &EditBatch) -> ChangeKind {
		if self.pending_text_change && batch.line_changed {
			self.pending_text_change = false;
			return ChangeKind::Urgent;
		}
		// Any edit other than a bare Enter makes the batch text, including a
		// deletion mixed in with line breaks.
		let text = batch.edits.iter().any(|edit| !edit.is_line_break_insert());
		self.pending_text_change = text;
		if text { ChangeKind::Text } else { ChangeKind::LineOnly }
	}
}
