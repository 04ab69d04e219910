use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Process-wide table `layerName -> { deviceType, deviceId, ...routing }`.
/// Authoritative; changes cause a full re-resolve (owned by the conductor,
/// see `apps/conductor`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMapping {
	pub device_type: String,
	pub device_id: String,
	#[serde(default)]
	pub routing: serde_json::Value,
}

pub type Mapping = HashMap<String, LayerMapping>;
