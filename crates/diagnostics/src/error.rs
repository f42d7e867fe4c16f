use thiserror::Error;

use crate::BufferId;

/// Errors from submitting to or waiting on the diagnostics store.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
	/// The store has been disposed.
	#[error("diagnostics store is closed")]
	Closed,
	/// The flush barrier was dropped before it completed.
	#[error("flush barrier dropped before completion")]
	FlushDropped,
}

/// Errors reported by UI-side consumers (task list, squiggle taggers).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
	/// The buffer's view went away between lookup and render.
	#[error("{0} has no live view")]
	Detached(BufferId),
	/// The consumer refused the update.
	#[error("renderer rejected update: {0}")]
	Rejected(String),
}
