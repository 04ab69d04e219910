use crate::{Enable, Millis, ResolvedObject, ResolvedState, TimeReference, TimelineObject};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolverError {
	#[error("symbolic time reference {0:?} could not be resolved")]
	UnresolvedReference(String),
	#[error("cyclic symbolic time reference detected starting at object {0:?}")]
	CyclicReference(String),
}

/// `resolve(timeline, time) -> { time, layers }`, pure with respect to its
/// inputs. Implementations must support symbolic time references
/// (`#id.start|.end`) and `while` enable expressions.
pub trait Resolver: Send + Sync {
	fn resolve(&self, timeline: &[TimelineObject], time: Millis) -> Result<ResolvedState, ResolverError>;

	/// Discrete times within `(from, from + horizon]` at which the resolved
	/// state may change. The conductor uses this to pick tick snapshots
	/// instead of polling at a fixed rate.
	fn change_points(&self, timeline: &[TimelineObject], from: Millis, horizon: Millis) -> Vec<Millis>;
}

#[derive(Clone, Copy, Debug)]
struct Interval {
	start: Millis,
	end: Option<Millis>,
}

impl Interval {
	fn contains(&self, time: Millis) -> bool {
		time >= self.start && self.end.map_or(true, |end| time < end)
	}
}

/// Minimal reference resolver: resolves `#id.start|.end` symbolic
/// references via a fixed-point pass, treats `while` expressions as the
/// literal strings `"true"`/`"false"` (a deliberate simplification — real
/// `while` expression evaluation is a resolver concern, out of scope here),
/// and merges the latest-matching keyframe into `content` at the query
/// time. Exists to give the conductor and its tests something real to call;
/// it is not a production timeline resolver.
#[derive(Debug, Default)]
pub struct StaticResolver;

impl StaticResolver {
	#[must_use]
	pub fn new() -> Self {
		Self
	}

	fn resolve_intervals(timeline: &[TimelineObject]) -> Result<HashMap<&str, Interval>, ResolverError> {
		let mut resolved: HashMap<&str, Interval> = HashMap::new();
		let mut pending: Vec<&TimelineObject> = timeline.iter().collect();

		// Fixed-point pass: each round resolves every object whose
		// dependencies are already known. `while`-enabled objects resolve
		// immediately since they don't reference other objects' times.
		for _round in 0..=timeline.len() {
			if pending.is_empty() {
				break;
			}
			let mut next_pending = Vec::new();
			for object in pending {
				match Self::try_resolve_one(object, &resolved) {
					Some(interval) => {
						resolved.insert(object.id.as_str(), interval);
					}
					None => next_pending.push(object),
				}
			}
			pending = next_pending;
		}

		if let Some(object) = pending.first() {
			return Err(ResolverError::CyclicReference(object.id.clone()));
		}

		Ok(resolved)
	}

	fn try_resolve_one(object: &TimelineObject, resolved: &HashMap<&str, Interval>) -> Option<Interval> {
		match &object.enable {
			Enable::While { expr } => Some(Interval {
				start: 0,
				end: if expr == "true" { None } else { Some(0) },
			}),
			Enable::StartDuration { start, duration } => {
				let start_ms = match start {
					TimeReference::Absolute(ms) => *ms,
					TimeReference::Symbolic(reference) => Self::lookup_symbolic(reference, resolved)?,
				};
				Some(Interval {
					start: start_ms,
					end: duration.map(|d| start_ms + d),
				})
			}
		}
	}

	/// `reference` is of the form `"#id.start"` or `"#id.end"`.
	fn lookup_symbolic(reference: &str, resolved: &HashMap<&str, Interval>) -> Option<Millis> {
		let body = reference.strip_prefix('#')?;
		let (id, field) = body.split_once('.')?;
		let interval = resolved.get(id)?;
		match field {
			"start" => Some(interval.start),
			"end" => interval.end,
			_ => None,
		}
	}

	fn active_content(object: &TimelineObject, time: Millis) -> crate::Content {
		let mut content = object.content.clone();
		let mut applied: Option<&crate::Keyframe> = None;
		for keyframe in &object.keyframes {
			let active = time >= keyframe.start && keyframe.duration.map_or(true, |d| time < keyframe.start + d);
			let supersedes = applied.map_or(true, |current| keyframe.start >= current.start);
			if active && supersedes {
				applied = Some(keyframe);
			}
		}
		if let (Some(keyframe), serde_json::Value::Object(base)) = (applied, &mut content.payload) {
			if let serde_json::Value::Object(overrides) = &keyframe.content {
				for (key, value) in overrides {
					base.insert(key.clone(), value.clone());
				}
			}
		}
		content
	}
}

impl Resolver for StaticResolver {
	fn resolve(&self, timeline: &[TimelineObject], time: Millis) -> Result<ResolvedState, ResolverError> {
		let intervals = Self::resolve_intervals(timeline)?;
		let mut state = ResolvedState::empty(time);

		for object in timeline {
			let Some(interval) = intervals.get(object.id.as_str()) else {
				continue;
			};
			if !interval.contains(time) {
				continue;
			}
			// Open Question per spec.md §9: two objects colliding on the
			// same layer at the same instant is assumed not to happen; the
			// reference resolver keeps the first one found, deterministic
			// by timeline order.
			state.layers.entry(object.layer.clone()).or_insert_with(|| ResolvedObject {
				id: object.id.clone(),
				content: Self::active_content(object, time),
				start: interval.start,
				duration: interval.end.map(|end| end - interval.start),
				is_lookahead: object.is_lookahead,
			});
		}

		Ok(state)
	}

	fn change_points(&self, timeline: &[TimelineObject], from: Millis, horizon: Millis) -> Vec<Millis> {
		let Ok(intervals) = Self::resolve_intervals(timeline) else {
			return Vec::new();
		};
		let until = from + horizon;
		let mut points = BTreeSet::new();
		for interval in intervals.values() {
			if interval.start > from && interval.start <= until {
				points.insert(interval.start);
			}
			if let Some(end) = interval.end {
				if end > from && end <= until {
					points.insert(end);
				}
			}
		}
		points.into_iter().collect()
	}
}
