//! Shared worker runtime primitives for the analysis pipeline.
//!
//! Everything that runs off the UI thread goes through this crate:
//! - [`spawn`] / [`spawn_blocking`]: task spawning tagged with a [`TaskClass`],
//!   falling back to a lazily built global runtime when called from a thread
//!   that is not inside one (edit notifications can arrive from anywhere).
//! - [`DebounceTimer`]: single-shot, re-armable, cancellable timer.
//! - [`Mailbox`]: ordered consumer queue whose consumer parks itself after an
//!   idle window and is re-spawned by the next send.
//! - [`UiThread`]: the single execution context that owns rendering side effects.

mod class;
mod mailbox;
mod panic;
mod spawn;
mod timer;
mod token;
mod ui;

pub use class::TaskClass;
pub use mailbox::{Mailbox, MailboxRecv, MailboxSendError, MailboxSendOutcome};
pub use panic::panic_message;
pub use spawn::{spawn, spawn_blocking, spawn_named_thread};
pub use timer::DebounceTimer;
pub use ui::{UiExecutor, UiJob, UiThread};
