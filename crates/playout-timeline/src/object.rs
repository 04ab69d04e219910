use crate::Millis;
use serde::{Deserialize, Serialize};

pub type ObjectId = String;

/// `start` may be an absolute milliseconds value or a symbolic reference
/// such as `"#other.end"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeReference {
	Absolute(Millis),
	Symbolic(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Enable {
	StartDuration { start: TimeReference, duration: Option<Millis> },
	While { expr: String },
}

/// A time-scoped partial override, merged into `content` by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
	pub start: Millis,
	pub duration: Option<Millis>,
	pub content: serde_json::Value,
}

/// `content` carries a `deviceType` tag and a device-specific payload.
/// Unrecognized `deviceType`s are round-tripped as opaque JSON and ignored
/// by every adapter (`spec.md` §4.3 step 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
	pub device_type: String,
	pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineObject {
	pub id: ObjectId,
	pub enable: Enable,
	pub layer: String,
	pub content: Content,
	#[serde(default)]
	pub keyframes: Vec<Keyframe>,
	#[serde(default)]
	pub classes: Vec<String>,
	#[serde(default)]
	pub is_lookahead: bool,
}
