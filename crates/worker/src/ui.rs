//! The single execution context that owns rendering side effects.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::ThreadId;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::{TaskClass, panic_message, spawn_named_thread};

/// Unit of work executed on the UI context.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Execution context that serializes all UI-side effects.
pub trait UiExecutor: Send + Sync {
	/// Queues `job` for execution. Returns false if the context has shut down.
	fn post(&self, job: UiJob) -> bool;

	/// Returns true when called from the UI context itself.
	fn is_current(&self) -> bool;
}

impl dyn UiExecutor {
	/// Runs `f` on the UI context and waits for its result.
	///
	/// Returns `None` if the context is gone or `f` panicked.
	pub async fn invoke<R>(&self, f: impl FnOnce() -> R + Send + 'static) -> Option<R>
	where
		R: Send + 'static,
	{
		let (tx, rx) = oneshot::channel();
		if !self.post(Box::new(move || {
			let _ = tx.send(f());
		})) {
			return None;
		}
		rx.await.ok()
	}

	/// Blocking variant of [`invoke`](Self::invoke) for synchronous callers.
	///
	/// Calling this from the UI context would deadlock; debug builds assert.
	pub fn invoke_blocking<R>(&self, f: impl FnOnce() -> R + Send + 'static) -> Option<R>
	where
		R: Send + 'static,
	{
		debug_assert!(!self.is_current(), "invoke_blocking called from the UI context");
		let (tx, rx) = std::sync::mpsc::sync_channel(1);
		if !self.post(Box::new(move || {
			let _ = tx.send(f());
		})) {
			return None;
		}
		rx.recv().ok()
	}
}

/// Dedicated OS thread acting as the UI context.
///
/// Jobs run in FIFO order. A panicking job is caught and logged; the thread
/// keeps serving later jobs.
pub struct UiThread {
	tx: Mutex<Option<mpsc::UnboundedSender<UiJob>>>,
	thread_id: ThreadId,
	join: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl UiThread {
	pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
		let (tx, mut rx) = mpsc::unbounded_channel::<UiJob>();
		let handle = spawn_named_thread(TaskClass::Interactive, name, move || {
			while let Some(job) = rx.blocking_recv() {
				if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
					let message = panic_message(payload.as_ref()).unwrap_or_else(|| "<opaque panic payload>".to_string());
					tracing::error!(panic = %message, "ui.job_panicked");
				}
			}
			tracing::debug!("ui.thread_exit");
		})?;
		Ok(Self {
			tx: Mutex::new(Some(tx)),
			thread_id: handle.thread().id(),
			join: Mutex::new(Some(handle)),
		})
	}

	/// Stops accepting jobs, lets queued jobs finish, and joins the thread.
	///
	/// Idempotent. When called from the UI thread itself the join is skipped.
	pub fn shutdown(&self) {
		drop(self.tx.lock().take());
		if self.is_current() {
			return;
		}
		if let Some(handle) = self.join.lock().take() {
			let _ = handle.join();
		}
	}
}

impl UiExecutor for UiThread {
	fn post(&self, job: UiJob) -> bool {
		match self.tx.lock().as_ref() {
			Some(tx) => tx.send(job).is_ok(),
			None => false,
		}
	}

	fn is_current(&self) -> bool {
		std::thread::current().id() == self.thread_id
	}
}

impl Drop for UiThread {
	fn drop(&mut self) {
		drop(self.tx.lock().take());
	}
}
