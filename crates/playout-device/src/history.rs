use crate::{DeviceState, Millis};
use std::collections::BTreeMap;

/// Time-indexed history of device states. `state_before(t)` returns the
/// greatest recorded entry with key `<= t`, falling back to
/// `S::default_state()` if none exists yet.
#[derive(Debug, Clone)]
pub struct StateHistory<S: DeviceState> {
	entries: BTreeMap<Millis, S>,
}

impl<S: DeviceState> StateHistory<S> {
	#[must_use]
	pub fn new() -> Self {
		Self { entries: BTreeMap::new() }
	}

	pub fn set_state(&mut self, time: Millis, state: S) {
		self.entries.insert(time, state);
	}

	#[must_use]
	pub fn state_before(&self, time: Millis) -> S {
		self.entries.range(..=time).next_back().map(|(_, state)| state.clone()).unwrap_or_else(S::default_state)
	}

	/// Drop every entry older than the one needed to answer
	/// `state_before(retention_from)` — i.e. keep the greatest key `<=
	/// retention_from` (and anything newer than it, including states
	/// already written ahead of time by look-ahead).
	pub fn prune_older_than(&mut self, retention_from: Millis) {
		let Some(&keep_from) = self.entries.range(..=retention_from).next_back().map(|(k, _)| k) else {
			return;
		};
		self.entries.retain(|&time, _| time >= keep_from);
	}

	/// Discard every entry, overwriting history entirely (used by
	/// `make_ready(force = true)`).
	pub fn reset(&mut self) {
		self.entries.clear();
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<S: DeviceState> Default for StateHistory<S> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Clone, PartialEq)]
	struct TestState(i32);

	impl DeviceState for TestState {
		fn default_state() -> Self {
			TestState(0)
		}
	}

	#[test]
	fn state_before_falls_back_to_default() {
		let history: StateHistory<TestState> = StateHistory::new();
		assert_eq!(history.state_before(1_000), TestState(0));
	}

	#[test]
	fn state_before_returns_greatest_entry_leq_t() {
		let mut history = StateHistory::new();
		history.set_state(100, TestState(1));
		history.set_state(200, TestState(2));
		history.set_state(300, TestState(3));

		assert_eq!(history.state_before(250), TestState(2));
		assert_eq!(history.state_before(300), TestState(3));
		assert_eq!(history.state_before(50), TestState(0));
	}

	#[test]
	fn pruning_keeps_the_entry_needed_for_future_lookups() {
		let mut history = StateHistory::new();
		history.set_state(100, TestState(1));
		history.set_state(200, TestState(2));
		history.set_state(300, TestState(3));

		history.prune_older_than(250);

		assert_eq!(history.len(), 2);
		assert_eq!(history.state_before(260), TestState(2));
		assert_eq!(history.state_before(300), TestState(3));
	}
}
