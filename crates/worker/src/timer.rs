//! Single-shot, re-armable debounce timer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::token::{GenerationClock, GenerationToken};
use crate::{TaskClass, spawn};

type Callback = dyn Fn() + Send + Sync;

struct TimerInner {
	name: &'static str,
	callback: Box<Callback>,
	clock: GenerationClock,
	armed: Mutex<Option<GenerationToken>>,
}

/// Cancellable single-shot timer.
///
/// [`arm`](Self::arm) (re)starts the countdown and cancels any pending expiry;
/// [`disarm`](Self::disarm) cancels without firing. The callback runs on the
/// worker runtime, never on the caller's thread, so arming while holding a
/// lock the callback also takes is safe.
pub struct DebounceTimer {
	inner: Arc<TimerInner>,
}

impl DebounceTimer {
	/// Creates a disarmed timer. `name` is only used for tracing.
	pub fn new(name: &'static str, callback: impl Fn() + Send + Sync + 'static) -> Self {
		Self {
			inner: Arc::new(TimerInner {
				name,
				callback: Box::new(callback),
				clock: GenerationClock::new(),
				armed: Mutex::new(None),
			}),
		}
	}

	/// Arms the timer to fire once after `delay`, replacing any pending expiry.
	pub fn arm(&self, delay: Duration) {
		let token = GenerationToken::new(self.inner.clock.next());
		if let Some(previous) = self.inner.armed.lock().replace(token.clone()) {
			previous.cancel();
		}
		tracing::trace!(timer = self.inner.name, generation = token.generation(), delay_ms = delay.as_millis() as u64, "timer.arm");

		let weak = Arc::downgrade(&self.inner);
		let _ = spawn(TaskClass::Interactive, async move {
			tokio::select! {
				_ = token.cancelled() => {}
				_ = tokio::time::sleep(delay) => fire(&weak, &token),
			}
		});
	}

	/// Cancels a pending expiry. No-op when not armed.
	pub fn disarm(&self) {
		if let Some(token) = self.inner.armed.lock().take() {
			tracing::trace!(timer = self.inner.name, generation = token.generation(), "timer.disarm");
			token.cancel();
		}
	}

	/// Returns true while an expiry is pending.
	pub fn is_armed(&self) -> bool {
		self.inner.armed.lock().is_some()
	}
}

impl Drop for DebounceTimer {
	fn drop(&mut self) {
		self.disarm();
	}
}

fn fire(weak: &Weak<TimerInner>, token: &GenerationToken) {
	let Some(inner) = weak.upgrade() else {
		return;
	};
	let current = {
		let mut armed = inner.armed.lock();
		if armed.as_ref().is_some_and(|t| t.generation() == token.generation()) {
			armed.take();
			true
		} else {
			false
		}
	};
	if current {
		tracing::trace!(timer = inner.name, generation = token.generation(), "timer.fire");
		(inner.callback)();
	}
}
