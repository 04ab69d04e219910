use serde::{Deserialize, Serialize};

/// Configuration options recognized by every device adapter. Unknown
/// options are rejected at `init` (`spec.md` §6) via
/// `#[serde(deny_unknown_fields)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DeviceOptions {
	pub host: Option<String>,
	pub port: Option<u16>,
	#[serde(default)]
	pub use_scheduling: bool,
	pub time_base: Option<u32>,
	pub min_recording_time_secs: Option<u32>,
	#[serde(default)]
	pub initialize_as_clear: bool,
}
