use crate::{CommandWithContext, DeviceState, Millis, StateHistory};
use playout_timeline::ResolvedState;

/// The universal `handle_state` algorithm (`spec.md` §4.3, steps 1-6),
/// shared by every adapter so each one only has to supply its own pure
/// `convert`/`diff` pair.
///
/// Returns `(t, commands)`. The caller is responsible for the queue side
/// effects in the exact order the spec requires: `clear_queue_now_and_after(t)`
/// on its `DoOnTimeQueue`, then enqueuing every command **at
/// `resolved.time`** (not at `t` — `t` only governs which old state is
/// diffed against and where pruning starts).
#[tracing::instrument(skip(history, convert, diff))]
pub fn run_handle_state<S, C>(
	now: Millis,
	resolved: &ResolvedState,
	history: &mut StateHistory<S>,
	convert: impl FnOnce(&ResolvedState) -> S,
	diff: impl FnOnce(&S, &S) -> Vec<CommandWithContext<C>>,
) -> (Millis, Vec<CommandWithContext<C>>)
where
	S: DeviceState,
{
	let t = now.max(resolved.time);
	let old_state = history.state_before(t);
	let new_state = convert(resolved);
	let commands = diff(&old_state, &new_state);
	tracing::debug!(t, command_count = commands.len(), "computed handle_state diff");
	history.set_state(t, new_state);
	history.prune_older_than(t);
	(t, commands)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::CommandContext;
	use std::collections::BTreeMap;

	#[derive(Debug, Clone, PartialEq)]
	struct Counter(i32);

	impl DeviceState for Counter {
		fn default_state() -> Self {
			Counter(0)
		}
	}

	#[test]
	fn uses_max_of_now_and_resolved_time_as_t() {
		let mut history: StateHistory<Counter> = StateHistory::new();
		let resolved = ResolvedState {
			time: 500,
			layers: BTreeMap::new(),
		};

		let (t, _commands) = run_handle_state(1_000, &resolved, &mut history, |_| Counter(1), |_old, _new| Vec::new());
		assert_eq!(t, 1_000);

		let (t, _) = run_handle_state(200, &resolved, &mut history, |_| Counter(1), |_old, _new| Vec::new());
		assert_eq!(t, 500);
	}

	#[test]
	fn diff_of_identical_states_is_empty() {
		let mut history: StateHistory<Counter> = StateHistory::new();
		history.set_state(0, Counter(5));
		let resolved = ResolvedState {
			time: 100,
			layers: BTreeMap::new(),
		};

		let (_t, commands) = run_handle_state(
			100,
			&resolved,
			&mut history,
			|_| Counter(5),
			|old: &Counter, new: &Counter| {
				if old == new {
					Vec::new()
				} else {
					vec![CommandWithContext::new("changed", CommandContext::note("test"))]
				}
			},
		);
		assert!(commands.is_empty());
	}
}
