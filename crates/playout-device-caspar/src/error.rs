use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayoutDeviceError {
	#[error("unrecognized content payload on layer {layer}: {source}")]
	InvalidContent { layer: String, source: serde_json::Error },
	#[error(transparent)]
	Device(#[from] playout_device::DeviceError),
}
