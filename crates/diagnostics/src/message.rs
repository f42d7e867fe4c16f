use std::fmt;
use std::time::{Duration, Instant};

use crate::{DiagnosticItem, DiagnosticLevel, DiagnosticsTable, EntryKey};

/// Completion callback for a flush barrier.
///
/// Fires exactly once with the wall-clock time since submission. Dropping an
/// unfired signal releases its waiter with an error instead of hanging it.
pub struct FlushSignal {
	submitted_at: Instant,
	on_complete: Box<dyn FnOnce(Duration) + Send>,
}

impl FlushSignal {
	pub fn new(on_complete: impl FnOnce(Duration) + Send + 'static) -> Self {
		Self {
			submitted_at: Instant::now(),
			on_complete: Box::new(on_complete),
		}
	}

	pub fn complete(self) -> Duration {
		let elapsed = self.submitted_at.elapsed();
		(self.on_complete)(elapsed);
		elapsed
	}
}

impl fmt::Debug for FlushSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FlushSignal").field("submitted_at", &self.submitted_at).finish_non_exhaustive()
	}
}

/// Mutation request for the diagnostics store.
///
/// Messages are applied strictly in submission order by one consumer.
#[derive(Debug)]
pub enum WorkerMessage {
	/// Replace the `level` items of `key` with `items`.
	Replace {
		key: EntryKey,
		items: Vec<DiagnosticItem>,
		level: DiagnosticLevel,
	},
	/// Extend the items of `key`.
	Append { key: EntryKey, items: Vec<DiagnosticItem> },
	/// Clear `level` items of `key`; [`EntryKey::EMPTY`] targets every key.
	Clear { key: EntryKey, level: DiagnosticLevel },
	/// Clear `level` items of every key whose filepath starts with `prefix`.
	ClearPrefix { prefix: String, level: DiagnosticLevel },
	/// Barrier completed once every earlier message is applied and refreshed.
	Flush(FlushSignal),
}

impl WorkerMessage {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Replace { .. } => "replace",
			Self::Append { .. } => "append",
			Self::Clear { .. } => "clear",
			Self::ClearPrefix { .. } => "clear_prefix",
			Self::Flush(_) => "flush",
		}
	}

	/// Applies a mutation to `table`, returning whether it changed.
	///
	/// Flush barriers are scheduled by the consumer and never reach here.
	pub(crate) fn apply(self, table: &mut DiagnosticsTable) -> bool {
		match self {
			Self::Replace { key, items, level } => table.replace(key, items, level),
			Self::Append { key, items } => table.append(key, items),
			Self::Clear { key, level } => table.clear(&key, level),
			Self::ClearPrefix { prefix, level } => table.clear_prefix(&prefix, level),
			Self::Flush(signal) => {
				signal.complete();
				false
			}
		}
	}
}
