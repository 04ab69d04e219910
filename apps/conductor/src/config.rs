use playout_clock::Millis;
use playout_device::DeviceOptions;
use playout_timeline::Mapping;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// On-disk configuration for the `conductor` binary: which devices to
/// stand up and how, the layer mapping, and the look-ahead horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConductorConfig {
	#[serde(default)]
	pub devices: HashMap<String, DeviceOptions>,
	#[serde(default)]
	pub mapping: Mapping,
	pub horizon_ms: Option<Millis>,
	#[serde(default)]
	pub initialize_as_clear: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_minimal_config() {
		let raw = serde_json::json!({
			"devices": {"caspar1": {"timeBase": 25}},
			"mapping": {"layer0": {"deviceType": "playout", "deviceId": "caspar1", "routing": {"channel": 1, "layer": 10}}},
			"horizonMs": 2000,
		});
		let config: ConductorConfig = serde_json::from_value(raw).unwrap();
		assert_eq!(config.horizon_ms, Some(2_000));
		assert!(config.devices.contains_key("caspar1"));
	}

	#[test]
	fn rejects_unknown_top_level_fields() {
		let raw = serde_json::json!({"devices": {}, "mapping": {}, "typo": true});
		let result: Result<ConductorConfig, _> = serde_json::from_value(raw);
		assert!(result.is_err());
	}
}
