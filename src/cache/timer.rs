//! Re-armable timers backed by spawned Tokio tasks.

// std
use std::{ops::ControlFlow, time::Duration as StdDuration};
// crates.io
use tokio::{
	runtime::Handle,
	task::JoinHandle,
	time::{Instant, MissedTickBehavior},
};
// self
use crate::_prelude::*;

/// A single pending task that fires after a delay or on a fixed period.
///
/// Starting the timer replaces (and aborts) whatever was pending, so at most one task is armed at
/// a time. Dropping the timer aborts the pending task.
#[derive(Debug, Default)]
pub struct Timer {
	pending: Mutex<Option<JoinHandle<()>>>,
}
impl Timer {
	/// Arms the timer to run `task` once after `delay`.
	pub fn start<F>(&self, runtime: &Handle, delay: StdDuration, task: F)
	where
		F: 'static + Send + FnOnce(),
	{
		let handle = runtime.spawn(async move {
			tokio::time::sleep(delay).await;

			task();
		});

		self.replace(handle);
	}

	/// Arms the timer to run `tick` every `period`, first firing one period from now.
	///
	/// The loop ends when `tick` returns [`ControlFlow::Break`].
	pub fn start_repeating<F>(&self, runtime: &Handle, period: StdDuration, mut tick: F)
	where
		F: 'static + Send + FnMut() -> ControlFlow<()>,
	{
		let handle = runtime.spawn(async move {
			let mut interval = tokio::time::interval_at(Instant::now() + period, period);

			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				interval.tick().await;

				if tick().is_break() {
					break;
				}
			}
		});

		self.replace(handle);
	}

	/// Cancels the pending task, if any.
	pub fn stop(&self) {
		if let Some(handle) = self.pending.lock().take() {
			handle.abort();
		}
	}

	/// Returns `true` while a task is armed and has not finished.
	pub fn is_running(&self) -> bool {
		self.pending.lock().as_ref().is_some_and(|handle| !handle.is_finished())
	}

	fn replace(&self, handle: JoinHandle<()>) {
		// The replaced task may be the caller itself; it has no await left, so abort is inert.
		if let Some(previous) = self.pending.lock().replace(handle) {
			previous.abort();
		}
	}
}
impl Drop for Timer {
	fn drop(&mut self) {
		self.stop();
	}
}
