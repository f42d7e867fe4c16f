//! Fakes for the collaborators the analysis pipeline drives.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use kestrel_analysis::{
	AnalysisConfig, AnalysisHost, BufferEvents, BufferSnapshot, EditBatch, FileRetryConfig, ParseCookie, ParseOutcome, ParsedDiagnostic,
	ParserBackend, ProjectEntry, SubscriptionId, SyntaxTree, TextBuffer,
};
use kestrel_diagnostics::{BufferId, DiagnosticsStore, Severity, SnapshotVersion, SourcePosition, SourceSpan, StoreConfig};
use kestrel_worker::UiThread;
use parking_lot::Mutex;

pub const LIMIT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt::try_init();
}

pub fn config(debounce_ms: u64) -> AnalysisConfig {
	AnalysisConfig {
		debounce_ms,
		max_concurrent_parses: 4,
		file_retry: FileRetryConfig { attempts: 3, backoff_ms: 1 },
		diagnostics: StoreConfig {
			idle_timeout_ms: 30,
			refresh_interval_ms: 10,
		},
	}
}

/// Host plus the UI thread its store renders on.
pub struct Harness {
	pub ui: Arc<UiThread>,
	pub backend: Arc<LineBackend>,
	pub host: AnalysisHost,
}

pub fn harness(debounce_ms: u64) -> Harness {
	harness_with(config(debounce_ms), LineBackend::default())
}

pub fn harness_with(config: AnalysisConfig, backend: LineBackend) -> Harness {
	init_tracing();
	let ui = Arc::new(UiThread::spawn("analysis-test-ui").expect("spawn ui thread"));
	let store = DiagnosticsStore::builder(ui.clone()).config(config.diagnostics.clone()).build();
	let backend = Arc::new(backend);
	let host = AnalysisHost::new(config, store, backend.clone());
	Harness { ui, backend, host }
}

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

/// Reports every non-blank line as a warning spanning that line.
///
/// Tracks call count and peak concurrency; panics on text containing
/// `panic_on`, and sleeps for `delay` per call.
#[derive(Default)]
pub struct LineBackend {
	pub delay: Duration,
	pub panic_on: Option<&'static str>,
	pub calls: AtomicUsize,
	pub active: AtomicUsize,
	pub peak: AtomicUsize,
	pub seen: Mutex<Vec<Vec<(BufferId, SnapshotVersion)>>>,
}

impl LineBackend {
	pub fn slow(delay: Duration) -> Self {
		Self {
			delay,
			..Self::default()
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}

	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::SeqCst) > 0
	}
}

impl ParserBackend for LineBackend {
	fn parse(&self, snapshots: &[BufferSnapshot]) -> ParseOutcome {
		let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.seen.lock().push(snapshots.iter().map(|s| (s.buffer, s.version)).collect());
		std::thread::sleep(self.delay);

		let mut diagnostics = Vec::new();
		let mut tripped = false;
		for snapshot in snapshots {
			if self.panic_on.is_some_and(|needle| snapshot.text.contains(needle)) {
				tripped = true;
			}
			let mut offset = 0;
			for (line, text) in snapshot.text.split('\n').enumerate() {
				if !text.trim().is_empty() {
					let start = SourcePosition::new(offset, line as u32, 0);
					let end = SourcePosition::new(offset + text.len(), line as u32, text.len() as u32);
					diagnostics.push(ParsedDiagnostic {
						span: SourceSpan::new(start, end),
						message: text.to_string(),
						severity: Severity::Warning,
					});
				}
				offset += text.len() + 1;
			}
		}
		self.active.fetch_sub(1, Ordering::SeqCst);
		if tripped {
			panic!("parser tripped");
		}
		let tree: SyntaxTree = Arc::new(diagnostics.len());
		ParseOutcome {
			tree: Some(tree),
			diagnostics,
		}
	}
}

/// In-memory buffer that notifies subscribers synchronously on edit.
pub struct FakeBuffer {
	id: BufferId,
	text: Mutex<String>,
	version: AtomicU64,
	next_subscription: AtomicU64,
	subscribers: Mutex<Vec<(SubscriptionId, Arc<dyn BufferEvents>)>>,
	pub unsubscribed: Mutex<Vec<SubscriptionId>>,
}

impl FakeBuffer {
	pub fn new(id: u64, text: &str) -> Arc<Self> {
		Arc::new(Self {
			id: BufferId(id),
			text: Mutex::new(text.to_string()),
			version: AtomicU64::new(1),
			next_subscription: AtomicU64::new(0),
			subscribers: Mutex::new(Vec::new()),
			unsubscribed: Mutex::new(Vec::new()),
		})
	}

	pub fn version(&self) -> SnapshotVersion {
		SnapshotVersion::new(self.version.load(Ordering::SeqCst))
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.lock().len()
	}

	fn listeners(&self) -> Vec<Arc<dyn BufferEvents>> {
		self.subscribers.lock().iter().map(|(_, events)| Arc::clone(events)).collect()
	}

	/// Appends `text` and delivers the matching edit batch.
	pub fn insert(&self, text: &str) {
		self.apply(EditBatch::single("", text), |buf| buf.push_str(text));
	}

	/// Replaces the whole text.
	pub fn replace_all(&self, text: &str) {
		let old = self.text.lock().clone();
		self.apply(EditBatch::single(old, text), |buf| *buf = text.to_string());
	}

	/// Delivers `batch` after mutating the text with `edit`.
	pub fn apply(&self, batch: EditBatch, edit: impl FnOnce(&mut String)) {
		{
			let mut text = self.text.lock();
			edit(&mut *text);
		}
		self.version.fetch_add(1, Ordering::SeqCst);
		for listener in self.listeners() {
			listener.on_edits(self.id, &batch);
		}
	}

	pub fn change_encoding(&self) {
		for listener in self.listeners() {
			listener.on_encoding_changed(self.id);
		}
	}
}

impl TextBuffer for FakeBuffer {
	fn id(&self) -> BufferId {
		self.id
	}

	fn snapshot(&self) -> BufferSnapshot {
		let text = self.text.lock();
		BufferSnapshot::new(self.id, text.as_str(), self.version())
	}

	fn subscribe(&self, events: Arc<dyn BufferEvents>) -> SubscriptionId {
		let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
		self.subscribers.lock().push((id, events));
		id
	}

	fn unsubscribe(&self, subscription: SubscriptionId) {
		self.subscribers.lock().retain(|(id, _)| *id != subscription);
		self.unsubscribed.lock().push(subscription);
	}
}

/// Project entry that records every callback.
pub struct RecordingEntry {
	path: Option<String>,
	fail_next_update: AtomicBool,
	pub stopped: AtomicUsize,
	pub updates: Mutex<Vec<(bool, Option<ParseCookie>)>>,
}

impl RecordingEntry {
	pub fn new(path: Option<&str>) -> Arc<Self> {
		Arc::new(Self {
			path: path.map(str::to_string),
			fail_next_update: AtomicBool::new(false),
			stopped: AtomicUsize::new(0),
			updates: Mutex::new(Vec::new()),
		})
	}

	/// Entry whose first `update_tree` records the call and then panics.
	pub fn failing_once(path: Option<&str>) -> Arc<Self> {
		let entry = Self::new(path);
		entry.fail_next_update.store(true, Ordering::SeqCst);
		entry
	}

	pub fn update_count(&self) -> usize {
		self.updates.lock().len()
	}

	pub fn last_update(&self) -> Option<(bool, Option<ParseCookie>)> {
		self.updates.lock().last().cloned()
	}

	pub fn stopped(&self) -> usize {
		self.stopped.load(Ordering::SeqCst)
	}
}

impl ProjectEntry for RecordingEntry {
	fn file_path(&self) -> Option<&str> {
		self.path.as_deref()
	}

	fn on_analysis_stopped(&self) {
		self.stopped.fetch_add(1, Ordering::SeqCst);
	}

	fn update_tree(&self, tree: Option<SyntaxTree>, cookie: Option<ParseCookie>) {
		self.updates.lock().push((tree.is_some(), cookie));
		if self.fail_next_update.swap(false, Ordering::SeqCst) {
			panic!("tree update rejected");
		}
	}
}
