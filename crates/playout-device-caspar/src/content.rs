use playout_device::Millis;
use serde::{Deserialize, Serialize};

/// What to play. `Empty` is a distinct value (not the absence of content) so
/// a transition into silence can still carry transition attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipRef {
	Named(String),
	Empty,
}

/// Where the frames for a layer come from. Controls whether a seek is
/// meaningful: a `Live` feed or a looping `File` of unknown length has no
/// well-defined seek position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SourceKind {
	File {
		#[serde(default = "default_true")]
		length_known: bool,
	},
	Live,
	Route {
		source_layer: String,
	},
}

fn default_true() -> bool {
	true
}

impl Default for SourceKind {
	fn default() -> Self {
		SourceKind::File { length_known: true }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionKind {
	Cut,
	Mix,
	Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
	Linear,
	EaseInOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
	Left,
	Right,
	None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
	pub kind: TransitionKind,
	pub duration_ms: Millis,
	#[serde(default = "Easing::linear")]
	pub easing: Easing,
	#[serde(default = "Direction::none")]
	pub direction: Direction,
}

impl Easing {
	fn linear() -> Self {
		Easing::Linear
	}
}

impl Direction {
	fn none() -> Self {
		Direction::None
	}
}

/// The device-specific payload carried by `playout-timeline::Content` for
/// objects whose `deviceType` is `"playout"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlayoutContent {
	pub clip: ClipRef,
	#[serde(default)]
	pub looping: bool,
	#[serde(default)]
	pub source: SourceKind,
	#[serde(default)]
	pub in_transition: Option<Transition>,
	#[serde(default)]
	pub out_transition: Option<Transition>,
}
