use serde::{Deserialize, Serialize};

/// Ordered worst-to-best so `get_status()` aggregation can just take the
/// maximum across children (`spec.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusCode {
	Good,
	WarningMinor,
	WarningMajor,
	Bad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
	pub code: StatusCode,
	pub messages: Vec<String>,
}

impl DeviceStatus {
	#[must_use]
	pub fn good() -> Self {
		Self {
			code: StatusCode::Good,
			messages: Vec::new(),
		}
	}

	#[must_use]
	pub fn bad(message: impl Into<String>) -> Self {
		Self {
			code: StatusCode::Bad,
			messages: vec![message.into()],
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_code_ordering_puts_bad_as_worst() {
		assert!(StatusCode::Bad > StatusCode::WarningMajor);
		assert!(StatusCode::WarningMajor > StatusCode::WarningMinor);
		assert!(StatusCode::WarningMinor > StatusCode::Good);
	}
}
