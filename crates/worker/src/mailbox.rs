//! Ordered message queue with a self-parking consumer.
//!
//! The queue tracks whether a consumer is live. [`Mailbox::send`] flips the
//! consumer flag from inactive to active under the same lock that pushes the
//! message, and [`Mailbox::recv_or_park`] flips it back only after observing
//! an empty queue under that lock. A message can therefore never be stranded
//! between a consumer deciding to exit and a producer deciding not to start
//! a new one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Outcome from enqueueing a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxSendOutcome {
	/// A consumer is already live and will see the message.
	Enqueued,
	/// No consumer was live; the caller now owns starting one.
	ConsumerStarted,
}

/// Mailbox send error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxSendError {
	/// Mailbox has been closed.
	Closed,
}

/// Result of a parking receive.
#[derive(Debug, PartialEq, Eq)]
pub enum MailboxRecv<T> {
	/// Next message in submission order.
	Message(T),
	/// No message arrived within the idle window; the consumer is now marked
	/// inactive and must exit.
	Idle,
	/// Mailbox is closed and drained; the consumer is marked inactive.
	Closed,
}

struct MailboxState<T> {
	queue: VecDeque<T>,
	consumer_active: bool,
	closed: bool,
}

struct MailboxInner<T> {
	state: Mutex<MailboxState<T>>,
	notify_recv: Notify,
}

/// Unbounded FIFO mailbox with single-consumer lifecycle tracking.
pub struct Mailbox<T> {
	inner: Arc<MailboxInner<T>>,
}

impl<T> Clone for Mailbox<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Default for Mailbox<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Mailbox<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(MailboxInner {
				state: Mutex::new(MailboxState {
					queue: VecDeque::new(),
					consumer_active: false,
					closed: false,
				}),
				notify_recv: Notify::new(),
			}),
		}
	}

	/// Enqueues `msg`.
	///
	/// Returns [`MailboxSendOutcome::ConsumerStarted`] when this send
	/// transitioned the consumer from inactive to active; the caller must
	/// then spawn exactly one consumer.
	pub fn send(&self, msg: T) -> Result<MailboxSendOutcome, MailboxSendError> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(MailboxSendError::Closed);
		}
		state.queue.push_back(msg);
		let start = !state.consumer_active;
		state.consumer_active = true;
		drop(state);
		self.inner.notify_recv.notify_one();
		Ok(if start {
			MailboxSendOutcome::ConsumerStarted
		} else {
			MailboxSendOutcome::Enqueued
		})
	}

	/// Pops the next message without waiting.
	pub fn try_recv(&self) -> Option<T> {
		self.inner.state.lock().queue.pop_front()
	}

	/// Receives the next message, parking the consumer after `idle` of silence.
	pub async fn recv_or_park(&self, idle: Duration) -> MailboxRecv<T> {
		loop {
			// Register before checking so a send between the check and the
			// await still wakes us.
			let notified = self.inner.notify_recv.notified();
			{
				let mut state = self.inner.state.lock();
				if let Some(msg) = state.queue.pop_front() {
					return MailboxRecv::Message(msg);
				}
				if state.closed {
					state.consumer_active = false;
					return MailboxRecv::Closed;
				}
			}

			if tokio::time::timeout(idle, notified).await.is_err() {
				let mut state = self.inner.state.lock();
				if let Some(msg) = state.queue.pop_front() {
					return MailboxRecv::Message(msg);
				}
				state.consumer_active = false;
				return if state.closed { MailboxRecv::Closed } else { MailboxRecv::Idle };
			}
		}
	}

	/// Closes the mailbox. Queued messages remain receivable.
	///
	/// Returns true if this call performed the transition.
	pub fn close(&self) -> bool {
		let mut state = self.inner.state.lock();
		if state.closed {
			return false;
		}
		state.closed = true;
		drop(state);
		self.inner.notify_recv.notify_waiters();
		true
	}

	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Returns true while a consumer owns the queue.
	pub fn is_consumer_active(&self) -> bool {
		self.inner.state.lock().consumer_active
	}

	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.state.lock().queue.is_empty()
	}
}
