//! The single-writer diagnostics store.
//!
//! Producers never touch the table. They enqueue [`WorkerMessage`]s into a
//! [`Mailbox`]; the first send into an idle mailbox spawns a consumer task
//! that applies messages in submission order, throttles refreshes while it
//! drains, and parks itself after the idle window.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use kestrel_worker::{Mailbox, MailboxRecv, MailboxSendOutcome, TaskClass, UiExecutor, panic_message};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::refresh::collect_task_items;
use crate::{
	BufferId, DiagnosticItem, DiagnosticLevel, DiagnosticsTable, EntryKey, ErrorSourceRegistry, FlushSignal, RefreshCoalescer,
	RefreshOutcome, SquiggleRenderer, StoreConfig, StoreError, TaskItem, TaskListSink, WorkerMessage,
};

struct StoreInner {
	config: StoreConfig,
	table: Mutex<DiagnosticsTable>,
	registry: ErrorSourceRegistry,
	mailbox: Mailbox<WorkerMessage>,
	coalescer: RefreshCoalescer,
}

impl StoreInner {
	/// Applies one mutation under the table lock. A panic is contained to
	/// this message.
	fn apply(&self, msg: WorkerMessage) -> bool {
		let kind = msg.kind();
		let mut table = self.table.lock();
		match catch_unwind(AssertUnwindSafe(|| msg.apply(&mut table))) {
			Ok(changed) => {
				tracing::trace!(kind, changed, keys = table.len(), "diagnostics.apply");
				changed
			}
			Err(payload) => {
				let message = panic_message(payload.as_ref()).unwrap_or_else(|| "<opaque panic payload>".to_string());
				tracing::error!(kind, panic = %message, "diagnostics.apply_panicked");
				true
			}
		}
	}

	async fn refresh(&self) -> RefreshOutcome {
		self.coalescer.refresh(&self.table, &self.registry).await
	}

	async fn refresh_settled(&self) -> RefreshOutcome {
		self.coalescer.refresh_settled(&self.table, &self.registry).await
	}
}

async fn run_consumer(inner: Arc<StoreInner>) {
	tracing::debug!("diagnostics.consumer_start");
	let idle = inner.config.idle_timeout();
	let interval = inner.config.refresh_interval();
	let mut changed = false;
	let mut last_refresh = Instant::now();
	let mut flushes: Vec<FlushSignal> = Vec::new();

	loop {
		let msg = match inner.mailbox.try_recv() {
			Some(msg) => msg,
			None => {
				if changed {
					inner.refresh_settled().await;
					changed = false;
					last_refresh = Instant::now();
				}
				for signal in flushes.drain(..) {
					let elapsed = signal.complete();
					tracing::trace!(elapsed_ms = elapsed.as_millis() as u64, "diagnostics.flush_complete");
				}
				match inner.mailbox.recv_or_park(idle).await {
					MailboxRecv::Message(msg) => msg,
					MailboxRecv::Idle | MailboxRecv::Closed => break,
				}
			}
		};

		match msg {
			WorkerMessage::Flush(signal) => flushes.push(signal),
			msg => {
				changed |= inner.apply(msg);
				if changed && last_refresh.elapsed() >= interval {
					changed = inner.refresh().await == RefreshOutcome::Skipped;
					last_refresh = Instant::now();
				}
			}
		}
	}

	if changed {
		inner.refresh_settled().await;
	}
	tracing::debug!("diagnostics.consumer_stop");
}

/// Ordered, single-consumer store of diagnostics keyed by [`EntryKey`].
///
/// Cheap to clone; clones share one store.
#[derive(Clone)]
pub struct DiagnosticsStore {
	inner: Arc<StoreInner>,
}

impl std::fmt::Debug for DiagnosticsStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DiagnosticsStore")
			.field("config", &self.inner.config)
			.field("queued", &self.inner.mailbox.len())
			.field("consumer_running", &self.inner.mailbox.is_consumer_active())
			.finish_non_exhaustive()
	}
}

/// Builder for [`DiagnosticsStore`].
pub struct DiagnosticsStoreBuilder {
	ui: Arc<dyn UiExecutor>,
	config: StoreConfig,
	task_list: Option<Arc<dyn TaskListSink>>,
	squiggles: Option<Arc<dyn SquiggleRenderer>>,
}

impl DiagnosticsStoreBuilder {
	pub fn config(mut self, config: StoreConfig) -> Self {
		self.config = config;
		self
	}

	pub fn task_list(mut self, sink: Arc<dyn TaskListSink>) -> Self {
		self.task_list = Some(sink);
		self
	}

	pub fn squiggles(mut self, renderer: Arc<dyn SquiggleRenderer>) -> Self {
		self.squiggles = Some(renderer);
		self
	}

	pub fn build(self) -> DiagnosticsStore {
		DiagnosticsStore {
			inner: Arc::new(StoreInner {
				config: self.config,
				table: Mutex::new(DiagnosticsTable::new()),
				registry: ErrorSourceRegistry::new(),
				mailbox: Mailbox::new(),
				coalescer: RefreshCoalescer::new(self.ui, self.task_list, self.squiggles),
			}),
		}
	}
}

impl DiagnosticsStore {
	pub fn builder(ui: Arc<dyn UiExecutor>) -> DiagnosticsStoreBuilder {
		DiagnosticsStoreBuilder {
			ui,
			config: StoreConfig::default(),
			task_list: None,
			squiggles: None,
		}
	}

	pub fn config(&self) -> &StoreConfig {
		&self.inner.config
	}

	/// Enqueues `msg`, spawning the consumer if none is running.
	pub fn submit(&self, msg: WorkerMessage) -> Result<(), StoreError> {
		let kind = msg.kind();
		match self.inner.mailbox.send(msg) {
			Ok(MailboxSendOutcome::ConsumerStarted) => {
				tracing::trace!(kind, "diagnostics.submit");
				kestrel_worker::spawn(TaskClass::Background, run_consumer(Arc::clone(&self.inner)));
				Ok(())
			}
			Ok(MailboxSendOutcome::Enqueued) => {
				tracing::trace!(kind, "diagnostics.submit");
				Ok(())
			}
			Err(_) => {
				tracing::trace!(kind, "diagnostics.submit_closed");
				Err(StoreError::Closed)
			}
		}
	}

	pub fn replace(&self, key: EntryKey, items: Vec<DiagnosticItem>, level: DiagnosticLevel) -> Result<(), StoreError> {
		self.submit(WorkerMessage::Replace { key, items, level })
	}

	pub fn append(&self, key: EntryKey, items: Vec<DiagnosticItem>) -> Result<(), StoreError> {
		self.submit(WorkerMessage::Append { key, items })
	}

	/// Clears `level` items of `key`, or of every key for [`EntryKey::EMPTY`].
	pub fn clear(&self, key: EntryKey, level: DiagnosticLevel) -> Result<(), StoreError> {
		self.submit(WorkerMessage::Clear { key, level })
	}

	pub fn clear_prefix(&self, prefix: impl Into<String>, level: DiagnosticLevel) -> Result<(), StoreError> {
		self.submit(WorkerMessage::ClearPrefix {
			prefix: prefix.into(),
			level,
		})
	}

	/// Waits until every message submitted before this call is applied and
	/// refreshed. Returns the time the barrier spent queued.
	pub async fn flush(&self) -> Result<Duration, StoreError> {
		let (tx, rx) = oneshot::channel();
		self.submit(WorkerMessage::Flush(FlushSignal::new(move |elapsed| {
			let _ = tx.send(elapsed);
		})))?;
		rx.await.map_err(|_| StoreError::FlushDropped)
	}

	/// Blocking [`flush`](Self::flush). Must not be called from the UI context.
	pub fn flush_blocking(&self) -> Result<Duration, StoreError> {
		debug_assert!(!self.inner.coalescer.ui().is_current(), "flush_blocking called from the UI context");
		let (tx, rx) = std::sync::mpsc::sync_channel(1);
		self.submit(WorkerMessage::Flush(FlushSignal::new(move |elapsed| {
			let _ = tx.send(elapsed);
		})))?;
		rx.recv().map_err(|_| StoreError::FlushDropped)
	}

	/// Requests a refresh now. Collapses into an in-flight one.
	pub async fn refresh(&self) -> RefreshOutcome {
		self.inner.refresh().await
	}

	/// Blocking [`refresh`](Self::refresh). Must not be called from the UI
	/// context.
	pub fn refresh_blocking(&self) -> RefreshOutcome {
		self.inner.coalescer.refresh_blocking(&self.inner.table, &self.inner.registry)
	}

	pub fn refresh_count(&self) -> u64 {
		self.inner.coalescer.completed_count()
	}

	fn schedule_refresh(&self) {
		if self.inner.mailbox.is_closed() {
			return;
		}
		let inner = Arc::clone(&self.inner);
		kestrel_worker::spawn(TaskClass::Background, async move {
			inner.refresh_settled().await;
		});
	}

	/// Subscribes `buffer` to squiggles for `key`.
	pub fn register_buffer(&self, key: EntryKey, buffer: BufferId) -> bool {
		let added = self.inner.registry.add(key, buffer);
		if added {
			self.schedule_refresh();
		}
		added
	}

	pub fn unregister_buffer(&self, key: &EntryKey, buffer: BufferId) -> bool {
		let removed = self.inner.registry.remove(key, buffer);
		if removed {
			self.schedule_refresh();
		}
		removed
	}

	/// Drops every registration of `buffer`, returning how many keys it had.
	pub fn unregister_all(&self, buffer: BufferId) -> usize {
		let removed = self.inner.registry.remove_buffer(buffer);
		if removed > 0 {
			self.schedule_refresh();
		}
		removed
	}

	pub fn registered_buffers(&self, key: &EntryKey) -> Vec<BufferId> {
		self.inner.registry.buffers(key)
	}

	pub fn items(&self, key: &EntryKey) -> Vec<DiagnosticItem> {
		self.inner.table.lock().get(key).map(<[_]>::to_vec).unwrap_or_default()
	}

	pub fn valid_items(&self, key: &EntryKey) -> Vec<DiagnosticItem> {
		let table = self.inner.table.lock();
		table.get(key).unwrap_or_default().iter().filter(|item| item.is_valid()).cloned().collect()
	}

	pub fn keys(&self) -> Vec<EntryKey> {
		self.inner.table.lock().keys().cloned().collect()
	}

	/// Navigable task items as the task list would enumerate them.
	pub fn task_items(&self) -> Vec<TaskItem> {
		collect_task_items(&self.inner.table.lock())
	}

	pub fn is_consumer_running(&self) -> bool {
		self.inner.mailbox.is_consumer_active()
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.mailbox.is_closed()
	}

	/// Rejects further submissions. Queued messages and flushes still drain;
	/// the task list is unregistered on the UI context.
	pub fn dispose(&self) {
		if self.inner.mailbox.close() {
			tracing::debug!("diagnostics.dispose");
			self.inner.coalescer.dispose();
		}
	}
}
