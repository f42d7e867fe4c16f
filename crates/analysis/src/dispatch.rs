//! Bounded dispatch of parse jobs onto the blocking pool.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kestrel_worker::{TaskClass, panic_message};
use tokio::sync::{Notify, Semaphore};

struct QueueInner {
	pending: AtomicUsize,
	permits: Arc<Semaphore>,
	idle: Notify,
}

/// Decrements the pending count on every exit path of a job.
struct PendingGuard(Arc<QueueInner>);

impl Drop for PendingGuard {
	fn drop(&mut self) {
		if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
			self.0.idle.notify_waiters();
		}
	}
}

/// Runs submitted jobs with at most `max_concurrent` executing at once.
///
/// No ordering between jobs. The pending count covers queued and running
/// jobs, and drops even when a job panics.
#[derive(Clone)]
pub struct ParseQueue {
	inner: Arc<QueueInner>,
}

impl std::fmt::Debug for ParseQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ParseQueue").field("pending", &self.pending_count()).finish()
	}
}

impl ParseQueue {
	pub fn new(max_concurrent: usize) -> Self {
		Self {
			inner: Arc::new(QueueInner {
				pending: AtomicUsize::new(0),
				permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
				idle: Notify::new(),
			}),
		}
	}

	pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
		let pending = self.inner.pending.fetch_add(1, Ordering::AcqRel) + 1;
		tracing::trace!(pending, "parse_queue.submit");
		let guard = PendingGuard(Arc::clone(&self.inner));
		kestrel_worker::spawn(TaskClass::Background, async move {
			let Ok(permit) = Arc::clone(&guard.0.permits).acquire_owned().await else {
				return;
			};
			let joined = kestrel_worker::spawn_blocking(TaskClass::CpuBlocking, move || {
				let _permit = permit;
				catch_unwind(AssertUnwindSafe(job))
			})
			.await;
			match joined {
				Ok(Ok(())) => {}
				Ok(Err(payload)) => {
					let message = panic_message(payload.as_ref()).unwrap_or_else(|| "<opaque panic payload>".to_string());
					tracing::error!(panic = %message, "parse_queue.job_panicked");
				}
				Err(err) => tracing::warn!(error = %err, "parse_queue.join_failed"),
			}
		});
	}

	pub fn is_busy(&self) -> bool {
		self.pending_count() > 0
	}

	pub fn pending_count(&self) -> usize {
		self.inner.pending.load(Ordering::Acquire)
	}

	/// Resolves once no job is queued or running.
	pub async fn wait_idle(&self) {
		loop {
			let idle = self.inner.idle.notified();
			if self.pending_count() == 0 {
				return;
			}
			idle.await;
		}
	}
}
