//! Debounced, serialized reparse of one buffer group.
//!
//! A group is one or more buffers parsed together for one project entry.
//! Edits arm a [`DebounceTimer`]; expiry snapshots every buffer under the
//! group lock and submits one job to the [`ParseQueue`]. The `parsing` flag
//! keeps at most one job per group running; edits that land mid-parse set
//! `requeue_pending` so the finishing job resubmits with fresh snapshots. A job
//! whose snapshots predate the last claimed parse is dropped as stale.
//!
//! The group lock is never held across the parser call, the store, or the
//! project entry.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use kestrel_diagnostics::{BufferId, DiagnosticItem, DiagnosticLevel, DiagnosticsStore, EntryKey, SnapshotVersion};
use kestrel_worker::{DebounceTimer, panic_message};
use parking_lot::Mutex;

use crate::{
	AnalysisError, BufferEvents, BufferSnapshot, ChangeClassifier, EditBatch, ParseCookie, ParseOutcome, ParseQueue, ParserBackend,
	ProjectEntry, SubscriptionId, TextBuffer,
};

struct Member {
	buffer: Arc<dyn TextBuffer>,
	subscription: SubscriptionId,
}

#[derive(Default)]
struct ParseState {
	members: Vec<Member>,
	parsing: bool,
	requeue_pending: bool,
	/// Versions of the most recent job that claimed the group.
	claimed: Vec<(BufferId, SnapshotVersion)>,
	classifier: ChangeClassifier,
	disposed: bool,
}

impl ParseState {
	/// Returns true if any snapshot is older than the claimed version of its buffer.
	fn is_stale(&self, snapshots: &[BufferSnapshot]) -> bool {
		snapshots.iter().any(|snapshot| {
			self.claimed
				.iter()
				.any(|&(buffer, version)| buffer == snapshot.buffer && snapshot.version < version)
		})
	}
}

/// Clears `parsing` on every exit from a claimed parse, unwinding included,
/// and resubmits when edits arrived meanwhile.
struct ParseTurn<'a> {
	parser: &'a BufferParser,
}

impl Drop for ParseTurn<'_> {
	fn drop(&mut self) {
		let resubmit = {
			let mut state = self.parser.state.lock();
			state.parsing = false;
			std::mem::take(&mut state.requeue_pending) && !state.disposed
		};
		if resubmit {
			self.parser.schedule_parse();
		}
	}
}

/// Forwards buffer notifications without keeping the group alive.
struct EventRelay {
	parser: Weak<BufferParser>,
}

impl BufferEvents for EventRelay {
	fn on_edits(&self, _buffer: BufferId, batch: &EditBatch) {
		if let Some(parser) = self.parser.upgrade() {
			parser.on_edits(batch);
		}
	}

	fn on_encoding_changed(&self, buffer: BufferId) {
		if let Some(parser) = self.parser.upgrade() {
			tracing::debug!(buffer = %buffer, "analysis.encoding_changed");
			parser.request_reparse();
		}
	}
}

/// Reparse scheduler for one buffer group.
pub struct BufferParser {
	key: EntryKey,
	entry: Arc<dyn ProjectEntry>,
	backend: Arc<dyn ParserBackend>,
	store: DiagnosticsStore,
	queue: ParseQueue,
	debounce: Duration,
	timer: DebounceTimer,
	state: Mutex<ParseState>,
	me: Weak<BufferParser>,
}

impl BufferParser {
	/// Creates an empty group. Add buffers with [`add_buffer`](Self::add_buffer).
	pub fn new(
		entry: Arc<dyn ProjectEntry>,
		backend: Arc<dyn ParserBackend>,
		store: DiagnosticsStore,
		queue: ParseQueue,
		debounce: Duration,
	) -> Arc<Self> {
		let key = EntryKey::parser(entry.file_path());
		Arc::new_cyclic(|me: &Weak<Self>| {
			let fire = me.clone();
			Self {
				key,
				entry,
				backend,
				store,
				queue,
				debounce,
				timer: DebounceTimer::new("analysis.reparse", move || {
					if let Some(parser) = fire.upgrade() {
						parser.schedule_parse();
					}
				}),
				state: Mutex::new(ParseState::default()),
				me: me.clone(),
			}
		})
	}

	/// Diagnostics key for this group.
	pub fn key(&self) -> &EntryKey {
		&self.key
	}

	pub fn is_parsing(&self) -> bool {
		self.state.lock().parsing
	}

	pub fn is_disposed(&self) -> bool {
		self.state.lock().disposed
	}

	pub fn is_reparse_scheduled(&self) -> bool {
		self.timer.is_armed()
	}

	pub fn buffer_ids(&self) -> Vec<BufferId> {
		self.state.lock().members.iter().map(|m| m.buffer.id()).collect()
	}

	/// Subscribes to `buffer` and registers it for this group's squiggles.
	///
	/// Adding a buffer already in the group is a no-op.
	pub fn add_buffer(&self, buffer: Arc<dyn TextBuffer>) -> Result<(), AnalysisError> {
		let id = buffer.id();
		{
			let state = self.state.lock();
			if state.disposed {
				return Err(AnalysisError::Disposed);
			}
			if state.members.iter().any(|m| m.buffer.id() == id) {
				return Ok(());
			}
		}

		// Subscribe outside the lock; a buffer may notify synchronously.
		let subscription = buffer.subscribe(Arc::new(EventRelay { parser: self.me.clone() }));
		let mut state = self.state.lock();
		if state.disposed {
			drop(state);
			buffer.unsubscribe(subscription);
			return Err(AnalysisError::Disposed);
		}
		if state.members.iter().any(|m| m.buffer.id() == id) {
			// A concurrent add of the same buffer won.
			drop(state);
			buffer.unsubscribe(subscription);
			return Ok(());
		}
		state.members.push(Member { buffer, subscription });
		drop(state);

		self.store.register_buffer(self.key.clone(), id);
		tracing::debug!(key = %self.key, buffer = %id, "analysis.buffer_added");
		Ok(())
	}

	/// Unsubscribes and unregisters `buffer`. Returns the buffers left.
	pub fn remove_buffer(&self, buffer: BufferId) -> usize {
		let (member, remaining) = {
			let mut state = self.state.lock();
			if state.disposed {
				return 0;
			}
			let member = state.members.iter().position(|m| m.buffer.id() == buffer).map(|i| state.members.remove(i));
			(member, state.members.len())
		};
		if let Some(member) = member {
			member.buffer.unsubscribe(member.subscription);
			self.store.unregister_buffer(&self.key, buffer);
			tracing::debug!(key = %self.key, buffer = %buffer, remaining, "analysis.buffer_removed");
		}
		remaining
	}

	/// Handles one edit notification.
	pub fn on_edits(&self, batch: &EditBatch) {
		let mut state = self.state.lock();
		if state.disposed {
			return;
		}
		if state.parsing {
			state.requeue_pending = true;
			self.timer.disarm();
			return;
		}
		let kind = state.classifier.classify(batch);
		let delay = kind.delay(self.debounce);
		tracing::trace!(key = %self.key, kind = ?kind, delay_ms = delay.as_millis() as u64, "analysis.edits");
		self.timer.arm(delay);
	}

	/// Reparses without waiting for the debounce window. Deferred like an
	/// edit when a parse is already running.
	pub fn request_reparse(&self) {
		let mut state = self.state.lock();
		if state.disposed {
			return;
		}
		if state.parsing {
			state.requeue_pending = true;
			self.timer.disarm();
			return;
		}
		self.timer.arm(Duration::ZERO);
	}

	/// Captures every member's snapshot together and submits one job.
	fn schedule_parse(&self) {
		let snapshots: Vec<BufferSnapshot> = {
			let state = self.state.lock();
			if state.disposed || state.members.is_empty() {
				return;
			}
			state.members.iter().map(|m| m.buffer.snapshot()).collect()
		};
		let Some(parser) = self.me.upgrade() else {
			return;
		};
		tracing::trace!(key = %self.key, buffers = snapshots.len(), "analysis.parse_submit");
		self.queue.submit(move || parser.run_parse(snapshots));
	}

	fn run_parse(&self, snapshots: Vec<BufferSnapshot>) {
		{
			let mut state = self.state.lock();
			if state.disposed {
				return;
			}
			if state.parsing {
				// The running parse resubmits, so these snapshots' edits are
				// not lost.
				state.requeue_pending = true;
				tracing::trace!(key = %self.key, "analysis.parse_duplicate");
				return;
			}
			if state.is_stale(&snapshots) {
				tracing::trace!(key = %self.key, "analysis.parse_stale");
				return;
			}
			state.parsing = true;
			state.claimed = snapshots.iter().map(|s| (s.buffer, s.version)).collect();
		}
		let _turn = ParseTurn { parser: self };

		let started = Instant::now();
		let outcome = match catch_unwind(AssertUnwindSafe(|| self.backend.parse(&snapshots))) {
			Ok(outcome) => outcome,
			Err(payload) => {
				let message = panic_message(payload.as_ref()).unwrap_or_else(|| "<opaque panic payload>".to_string());
				tracing::warn!(key = %self.key, panic = %message, "analysis.parse_panicked");
				ParseOutcome::default()
			}
		};
		tracing::debug!(
			key = %self.key,
			diagnostics = outcome.diagnostics.len(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"analysis.parse_done"
		);
		self.publish(&snapshots, outcome);
	}

	fn publish(&self, snapshots: &[BufferSnapshot], outcome: ParseOutcome) {
		let version = snapshots.last().map(|s| s.version);
		let items = outcome
			.diagnostics
			.into_iter()
			.map(|d| DiagnosticItem::new(d.message, d.span, d.severity, DiagnosticLevel::SYNTAX, version))
			.collect();
		if let Err(err) = self.store.replace(self.key.clone(), items, DiagnosticLevel::SYNTAX) {
			tracing::debug!(key = %self.key, error = %err, "analysis.publish_dropped");
		}
		let cookie = ParseCookie::Buffers(snapshots.iter().map(|s| (s.buffer, s.version)).collect());
		self.entry.update_tree(outcome.tree, Some(cookie));
	}

	/// Stops analysis for the group. Idempotent.
	///
	/// Safe against an in-flight parse or a pending timer: nothing is
	/// scheduled afterwards, though a running parse still publishes.
	pub fn dispose(&self) {
		let members = {
			let mut state = self.state.lock();
			if state.disposed {
				return;
			}
			state.disposed = true;
			state.requeue_pending = false;
			self.timer.disarm();
			std::mem::take(&mut state.members)
		};
		for member in &members {
			member.buffer.unsubscribe(member.subscription);
			self.store.unregister_buffer(&self.key, member.buffer.id());
		}
		tracing::debug!(key = %self.key, buffers = members.len(), "analysis.dispose");
		self.entry.on_analysis_stopped();
	}
}
