//! Monotonic wall-clock source, injectable for tests.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Milliseconds since an unspecified, monotonic epoch.
pub type Millis = u64;

/// Single operation: `now()` returns milliseconds.
pub trait Clock: Send + Sync {
	fn now(&self) -> Millis;
}

/// Real clock, backed by `Instant`. Monotonic across the process.
pub struct SystemClock {
	started_at: Instant,
}

impl SystemClock {
	#[must_use]
	pub fn new() -> Self {
		Self { started_at: Instant::now() }
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now(&self) -> Millis {
		self.started_at.elapsed().as_millis() as Millis
	}
}

/// Deterministic clock for tests. `advance`/`set` move time forward
/// explicitly; `tick` additionally flushes any due timers registered via
/// `on_tick`.
#[derive(Clone)]
pub struct ManualClock {
	inner: Arc<Mutex<ManualClockState>>,
}

struct ManualClockState {
	now: Millis,
	callbacks: Vec<Box<dyn FnMut(Millis) + Send>>,
}

impl ManualClock {
	#[must_use]
	pub fn new(start: Millis) -> Self {
		Self {
			inner: Arc::new(Mutex::new(ManualClockState { now: start, callbacks: Vec::new() })),
		}
	}

	pub fn set(&self, time: Millis) {
		let mut state = self.inner.lock().expect("manual clock poisoned");
		state.now = time;
	}

	pub fn advance(&self, delta: Millis) {
		let mut state = self.inner.lock().expect("manual clock poisoned");
		state.now += delta;
	}

	/// Register a callback invoked with the new time on every `advance`/`tick`.
	pub fn on_tick<F>(&self, callback: F)
	where
		F: FnMut(Millis) + Send + 'static,
	{
		let mut state = self.inner.lock().expect("manual clock poisoned");
		state.callbacks.push(Box::new(callback));
	}

	/// Advance time by `delta` and run every registered callback.
	pub fn tick(&self, delta: Millis) {
		let now = {
			let mut state = self.inner.lock().expect("manual clock poisoned");
			state.now += delta;
			state.now
		};
		let mut state = self.inner.lock().expect("manual clock poisoned");
		for callback in &mut state.callbacks {
			callback(now);
		}
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Millis {
		self.inner.lock().expect("manual clock poisoned").now
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn manual_clock_advances_monotonically() {
		let clock = ManualClock::new(1_000);
		assert_eq!(clock.now(), 1_000);
		clock.advance(500);
		assert_eq!(clock.now(), 1_500);
		clock.set(10_000);
		assert_eq!(clock.now(), 10_000);
	}

	#[test]
	fn manual_clock_tick_flushes_callbacks() {
		let clock = ManualClock::new(0);
		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_clone = Arc::clone(&seen);
		clock.on_tick(move |now| seen_clone.lock().unwrap().push(now));

		clock.tick(100);
		clock.tick(50);

		assert_eq!(*seen.lock().unwrap(), vec![100, 150]);
	}

	#[test]
	fn system_clock_is_monotonic() {
		let clock = SystemClock::new();
		let a = clock.now();
		let b = clock.now();
		assert!(b >= a);
	}
}
