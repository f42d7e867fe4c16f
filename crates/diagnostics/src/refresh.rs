//! Pushes the aggregated diagnostics to the UI context.
//!
//! A refresh snapshots the table and registry under their own locks, builds a
//! [`RefreshPlan`] off the UI context, then applies the plan on the UI
//! context. Overlapping requests collapse: a refresh that finds another one in
//! flight returns [`RefreshOutcome::Skipped`] and relies on the caller's
//! change tracking to ask again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use kestrel_worker::UiExecutor;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Notify;

use crate::{
	BufferId, DiagnosticsTable, EntryKey, ErrorSourceRegistry, SquiggleRenderer, SquiggleTag, TaskItem, TaskListHandle, TaskListSink,
};

/// Result of one refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The plan was applied on the UI context.
	Completed,
	/// Another refresh was already in flight.
	Skipped,
	/// The UI context is gone or the apply step panicked.
	Unavailable,
}

/// Collects navigable task items for every valid item under a keyed filepath.
///
/// Sorted by file, then position, so enumeration order is stable.
pub(crate) fn collect_task_items(table: &DiagnosticsTable) -> Vec<TaskItem> {
	let mut tasks: Vec<TaskItem> = table
		.iter()
		.filter_map(|(key, items)| key.filepath().map(|file| (file, items)))
		.flat_map(|(file, items)| items.iter().filter(|item| item.is_valid()).map(move |item| TaskItem::from_item(file, item)))
		.collect();
	tasks.sort_by(|a, b| (&a.file, a.line, a.column).cmp(&(&b.file, b.line, b.column)));
	tasks
}

#[derive(Debug, Default)]
struct BufferPlan {
	keys: FxHashSet<EntryKey>,
	tags: Vec<SquiggleTag>,
}

/// Copied view of everything one refresh renders.
#[derive(Debug, Default)]
struct RefreshPlan {
	tasks: Option<Vec<TaskItem>>,
	buffers: FxHashMap<BufferId, BufferPlan>,
}

impl RefreshPlan {
	fn build(table: &Mutex<DiagnosticsTable>, registry: &ErrorSourceRegistry, with_tasks: bool) -> Self {
		// Registry first, table second; the two locks are never held together.
		let registrations = registry.snapshot();
		let table = table.lock();

		let tasks = with_tasks.then(|| collect_task_items(&table));
		let mut buffers: FxHashMap<BufferId, BufferPlan> = FxHashMap::default();
		for (key, ids) in registrations {
			let items = table.get(&key).unwrap_or_default();
			for id in ids {
				let plan = buffers.entry(id).or_default();
				plan.tags.extend(items.iter().filter(|item| item.is_valid()).map(|item| SquiggleTag::from_item(&key, item)));
				plan.keys.insert(key.clone());
			}
		}
		Self { tasks, buffers }
	}
}

/// State touched only from the UI context.
#[derive(Default)]
struct UiState {
	task_handle: Option<TaskListHandle>,
	rendered: FxHashMap<BufferId, FxHashSet<EntryKey>>,
	disposed: bool,
}

struct InFlight<'a> {
	coalescer: &'a RefreshCoalescer,
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.coalescer.in_progress.store(false, Ordering::Release);
		self.coalescer.settled.notify_waiters();
	}
}

/// Re-entrancy guarded refresh driver.
pub struct RefreshCoalescer {
	ui: Arc<dyn UiExecutor>,
	task_list: Option<Arc<dyn TaskListSink>>,
	squiggles: Option<Arc<dyn SquiggleRenderer>>,
	ui_state: Arc<Mutex<UiState>>,
	in_progress: AtomicBool,
	settled: Notify,
	completed: AtomicU64,
}

impl RefreshCoalescer {
	pub fn new(ui: Arc<dyn UiExecutor>, task_list: Option<Arc<dyn TaskListSink>>, squiggles: Option<Arc<dyn SquiggleRenderer>>) -> Self {
		Self {
			ui,
			task_list,
			squiggles,
			ui_state: Arc::new(Mutex::new(UiState::default())),
			in_progress: AtomicBool::new(false),
			settled: Notify::new(),
			completed: AtomicU64::new(0),
		}
	}

	pub fn ui(&self) -> &Arc<dyn UiExecutor> {
		&self.ui
	}

	/// Number of refreshes applied so far.
	pub fn completed_count(&self) -> u64 {
		self.completed.load(Ordering::Acquire)
	}

	pub fn is_in_progress(&self) -> bool {
		self.in_progress.load(Ordering::Acquire)
	}

	fn try_begin(&self) -> Option<InFlight<'_>> {
		self.in_progress
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| InFlight { coalescer: self })
	}

	fn ui_job(&self, plan: RefreshPlan) -> impl FnOnce() + Send + 'static {
		let state = Arc::clone(&self.ui_state);
		let task_list = self.task_list.clone();
		let squiggles = self.squiggles.clone();
		move || apply_plan(&mut state.lock(), task_list.as_deref(), squiggles.as_deref(), plan)
	}

	fn finish(&self, applied: Option<()>) -> RefreshOutcome {
		match applied {
			Some(()) => {
				let n = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
				tracing::trace!(refresh = n, "diagnostics.refresh");
				RefreshOutcome::Completed
			}
			None => {
				tracing::debug!("diagnostics.refresh_unavailable");
				RefreshOutcome::Unavailable
			}
		}
	}

	/// Builds a plan and applies it on the UI context, awaiting completion.
	pub async fn refresh(&self, table: &Mutex<DiagnosticsTable>, registry: &ErrorSourceRegistry) -> RefreshOutcome {
		let Some(_guard) = self.try_begin() else {
			tracing::trace!("diagnostics.refresh_skipped");
			return RefreshOutcome::Skipped;
		};
		let plan = RefreshPlan::build(table, registry, self.task_list.is_some());
		let applied = self.ui.invoke(self.ui_job(plan)).await;
		self.finish(applied)
	}

	/// Like [`refresh`](Self::refresh), but waits out an in-flight refresh
	/// and retries instead of skipping.
	pub async fn refresh_settled(&self, table: &Mutex<DiagnosticsTable>, registry: &ErrorSourceRegistry) -> RefreshOutcome {
		loop {
			let settled = self.settled.notified();
			match self.refresh(table, registry).await {
				RefreshOutcome::Skipped => {
					if self.is_in_progress() {
						settled.await;
					}
				}
				outcome => return outcome,
			}
		}
	}

	/// Blocking refresh for synchronous callers off the UI context.
	pub fn refresh_blocking(&self, table: &Mutex<DiagnosticsTable>, registry: &ErrorSourceRegistry) -> RefreshOutcome {
		debug_assert!(!self.ui.is_current(), "refresh_blocking called from the UI context");
		let Some(_guard) = self.try_begin() else {
			return RefreshOutcome::Skipped;
		};
		let plan = RefreshPlan::build(table, registry, self.task_list.is_some());
		let applied = self.ui.invoke_blocking(self.ui_job(plan));
		self.finish(applied)
	}

	/// Unregisters the task list on the UI context. Later refreshes only
	/// touch squiggles.
	pub fn dispose(&self) {
		let state = Arc::clone(&self.ui_state);
		let task_list = self.task_list.clone();
		let posted = self.ui.post(Box::new(move || {
			let mut state = state.lock();
			state.disposed = true;
			if let (Some(sink), Some(handle)) = (task_list, state.task_handle.take()) {
				sink.unregister(handle);
				tracing::debug!(handle = handle.0, "diagnostics.task_list_unregistered");
			}
		}));
		if !posted {
			tracing::debug!("diagnostics.dispose_ui_gone");
		}
	}
}

fn apply_plan(state: &mut UiState, task_list: Option<&dyn TaskListSink>, squiggles: Option<&dyn SquiggleRenderer>, plan: RefreshPlan) {
	if let (Some(sink), Some(tasks)) = (task_list, plan.tasks)
		&& !state.disposed
	{
		refresh_tasks(state, sink, &tasks);
	}

	let Some(renderer) = squiggles else {
		return;
	};

	let stale: Vec<BufferId> = state.rendered.keys().filter(|id| !plan.buffers.contains_key(id)).copied().collect();
	for id in stale {
		let Some(keys) = state.rendered.remove(&id) else {
			continue;
		};
		if let Some(tagger) = renderer.tagger(id) {
			tagger.clear(&|tag: &SquiggleTag| keys.contains(&tag.key));
		}
	}

	for (id, buffer) in plan.buffers {
		let Some(tagger) = renderer.tagger(id) else {
			tracing::trace!(buffer = %id, "diagnostics.tagger_missing");
			state.rendered.remove(&id);
			continue;
		};
		let mut owned = state.rendered.remove(&id).unwrap_or_default();
		owned.extend(buffer.keys.iter().cloned());
		tagger.clear(&|tag: &SquiggleTag| owned.contains(&tag.key));

		for tag in buffer.tags {
			if let Err(err) = tagger.add(tag) {
				tracing::warn!(buffer = %id, error = %err, "diagnostics.squiggle_failed");
			}
		}
		state.rendered.insert(id, buffer.keys);
	}
}

fn refresh_tasks(state: &mut UiState, sink: &dyn TaskListSink, tasks: &[TaskItem]) {
	let handle = match state.task_handle {
		Some(handle) => handle,
		None => match sink.register() {
			Ok(handle) => {
				tracing::debug!(handle = handle.0, "diagnostics.task_list_registered");
				*state.task_handle.insert(handle)
			}
			Err(err) => {
				tracing::warn!(error = %err, "diagnostics.task_list_register_failed");
				return;
			}
		},
	};
	if let Err(err) = sink.refresh(handle, tasks) {
		tracing::warn!(error = %err, items = tasks.len(), "diagnostics.task_list_refresh_failed");
	}
}
