use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("unknown device option: {0}")]
	UnknownOption(String),
	#[error("invalid device configuration: {0}")]
	Invalid(String),
}

#[derive(Debug, Error)]
pub enum DeviceError {
	#[error("device not connected")]
	NotConnected,
	#[error("diff invariant violated: {0}")]
	DiffInvariant(String),
	#[error("resolver error: {0}")]
	Resolver(#[from] playout_timeline::ResolverError),
}
