use crate::{Content, Millis, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type LayerId = String;

/// One resolved object per active layer at `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedObject {
	pub id: ObjectId,
	pub content: Content,
	pub start: Millis,
	pub duration: Option<Millis>,
	pub is_lookahead: bool,
}

/// Produced by the resolver, consumed by the core. `layers` uses a
/// `BTreeMap` so every downstream consumer iterates layers in lexicographic
/// order for free (`spec.md` §4.4 determinism rule), instead of having to
/// re-sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedState {
	pub time: Millis,
	pub layers: BTreeMap<LayerId, ResolvedObject>,
}

impl ResolvedState {
	#[must_use]
	pub fn empty(time: Millis) -> Self {
		Self { time, layers: BTreeMap::new() }
	}
}
