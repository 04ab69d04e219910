use crate::content::{ClipRef, SourceKind, Transition};
use playout_device::{DeviceState, Millis};
use std::collections::BTreeMap;

pub type LayerId = String;

/// What a single layer is currently doing. A layer absent from
/// [`PlayoutDeviceState::layers`] is equivalent to `Empty` — both represent
/// "nothing set up" and are treated identically by `diff`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum LayerState {
	Empty,
	/// Loaded but not playing: the result of a lookahead preload.
	/// `scheduled_play_at` is the following non-lookahead object's start —
	/// under the resolver's contiguity guarantee for lookahead objects,
	/// that's this object's own end — or `None` if its duration is unknown
	/// and no scheduled play can be derived.
	Background {
		clip: ClipRef,
		scheduled_play_at: Option<Millis>,
	},
	Playing {
		clip: ClipRef,
		looping: bool,
		seek_frames: u64,
		source: SourceKind,
		in_transition: Option<Transition>,
		out_transition: Option<Transition>,
		/// This object's end, if known; drives the scheduled exit transition.
		ends_at: Option<Millis>,
	},
}

/// Idempotent snapshot of every layer this device owns. Two snapshots with
/// the same layer contents are equal regardless of how they were produced,
/// which is what makes `diff` well-defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayoutDeviceState {
	pub layers: BTreeMap<LayerId, LayerState>,
}

impl PlayoutDeviceState {
	#[must_use]
	pub fn layer(&self, id: &str) -> &LayerState {
		self.layers.get(id).unwrap_or(&LayerState::Empty)
	}
}

impl DeviceState for PlayoutDeviceState {
	fn default_state() -> Self {
		Self { layers: BTreeMap::new() }
	}
}
