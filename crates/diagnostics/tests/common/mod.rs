//! Shared fixtures for diagnostics integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use kestrel_diagnostics::{
	BufferId, DiagnosticItem, DiagnosticLevel, DiagnosticsStore, RenderError, Severity, SnapshotVersion, SourcePosition, SourceSpan,
	SquiggleRenderer, SquiggleTag, SquiggleTagger, StoreConfig, TaskItem, TaskListHandle, TaskListSink,
};
use kestrel_worker::UiThread;
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt::try_init();
}

pub fn fast_config() -> StoreConfig {
	StoreConfig {
		idle_timeout_ms: 30,
		refresh_interval_ms: 10,
	}
}

/// Store wired to a recording task list and squiggle renderer.
pub struct Harness {
	pub ui: Arc<UiThread>,
	pub tasks: Arc<RecordingTasks>,
	pub squiggles: Arc<RecordingSquiggles>,
	pub store: DiagnosticsStore,
}

pub fn harness() -> Harness {
	harness_with(fast_config())
}

pub fn harness_with(config: StoreConfig) -> Harness {
	init_tracing();
	let ui = Arc::new(UiThread::spawn("diagnostics-test-ui").expect("spawn ui thread"));
	let tasks = Arc::new(RecordingTasks::default());
	let squiggles = Arc::new(RecordingSquiggles::default());
	let store = DiagnosticsStore::builder(ui.clone())
		.config(config)
		.task_list(tasks.clone())
		.squiggles(squiggles.clone())
		.build();
	Harness { ui, tasks, squiggles, store }
}

pub fn span(line: u32, width: usize) -> SourceSpan {
	let start = line as usize * 100;
	SourceSpan::new(SourcePosition::new(start, line, 0), SourcePosition::new(start + width, line, width as u32))
}

/// Valid item at `line` with SYNTAX level.
pub fn item(message: &str, line: u32) -> DiagnosticItem {
	DiagnosticItem::new(message, span(line, 3), Severity::Error, DiagnosticLevel::SYNTAX, Some(SnapshotVersion::new(1)))
}

pub fn leveled(message: &str, level: DiagnosticLevel) -> DiagnosticItem {
	DiagnosticItem::new(message, span(0, 3), Severity::Warning, level, Some(SnapshotVersion::new(1)))
}

pub fn messages(items: &[DiagnosticItem]) -> Vec<String> {
	items.iter().map(|item| item.message().to_string()).collect()
}

/// Polls `cond` until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
	let deadline = tokio::time::Instant::now() + limit;
	while tokio::time::Instant::now() < deadline {
		if cond() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	cond()
}

/// One-way latch that parks UI-side callbacks until opened.
#[derive(Default)]
pub struct Gate {
	entered: AtomicBool,
	open: Mutex<bool>,
	opened: Condvar,
}

impl Gate {
	/// Blocks the calling thread until [`open`](Self::open).
	pub fn wait(&self) {
		self.entered.store(true, Ordering::SeqCst);
		let mut open = self.open.lock();
		while !*open {
			self.opened.wait(&mut open);
		}
	}

	pub fn open(&self) {
		*self.open.lock() = true;
		self.opened.notify_all();
	}

	/// Returns true once some thread has reached [`wait`](Self::wait).
	pub fn is_entered(&self) -> bool {
		self.entered.load(Ordering::SeqCst)
	}
}

#[derive(Default)]
pub struct RecordingTasks {
	next: AtomicU64,
	pub registered: Mutex<Vec<TaskListHandle>>,
	pub unregistered: Mutex<Vec<TaskListHandle>>,
	pub last: Mutex<Option<Vec<TaskItem>>>,
	/// Item count of every refresh, in order.
	pub history: Mutex<Vec<usize>>,
}

impl TaskListSink for RecordingTasks {
	fn register(&self) -> Result<TaskListHandle, RenderError> {
		let handle = TaskListHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
		self.registered.lock().push(handle);
		Ok(handle)
	}

	fn refresh(&self, _handle: TaskListHandle, items: &[TaskItem]) -> Result<(), RenderError> {
		*self.last.lock() = Some(items.to_vec());
		self.history.lock().push(items.len());
		Ok(())
	}

	fn unregister(&self, handle: TaskListHandle) {
		self.unregistered.lock().push(handle);
	}
}

#[derive(Default)]
pub struct RecordingTagger {
	pub tags: Mutex<Vec<SquiggleTag>>,
	pub reject_adds: Mutex<bool>,
	/// When set, `clear` parks the UI thread on this gate.
	pub gate: Mutex<Option<Arc<Gate>>>,
}

impl RecordingTagger {
	pub fn messages(&self) -> Vec<String> {
		let mut out: Vec<_> = self.tags.lock().iter().map(|tag| tag.message.clone()).collect();
		out.sort();
		out
	}
}

impl SquiggleTagger for RecordingTagger {
	fn clear(&self, predicate: &dyn Fn(&SquiggleTag) -> bool) {
		let gate = self.gate.lock().clone();
		if let Some(gate) = gate {
			gate.wait();
		}
		self.tags.lock().retain(|tag| !predicate(tag));
	}

	fn add(&self, tag: SquiggleTag) -> Result<(), RenderError> {
		if *self.reject_adds.lock() {
			return Err(RenderError::Rejected("read-only view".to_string()));
		}
		self.tags.lock().push(tag);
		Ok(())
	}
}

/// Renderer with a live tagger per opened buffer.
#[derive(Default)]
pub struct RecordingSquiggles {
	pub taggers: Mutex<FxHashMap<BufferId, Arc<RecordingTagger>>>,
}

impl RecordingSquiggles {
	pub fn open(&self, buffer: BufferId) -> Arc<RecordingTagger> {
		self.taggers.lock().entry(buffer).or_default().clone()
	}
}

impl SquiggleRenderer for RecordingSquiggles {
	fn tagger(&self, buffer: BufferId) -> Option<Arc<dyn SquiggleTagger>> {
		let tagger = self.taggers.lock().get(&buffer).cloned()?;
		Some(tagger)
	}
}
