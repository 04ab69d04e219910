//! Shape shared by every device adapter: a state machine with history.
//!
//! Each adapter implements [`Device`] against its own [`DeviceState`] and
//! command type; the pure `convert`/`diff` pair an adapter supplies plugs
//! into [`diffing::run_handle_state`], which performs the universal
//! `handle_state` algorithm from `spec.md` §4.3 once, for every adapter.

mod command;
mod diffing;
mod error;
mod history;
mod options;
mod status;

pub use command::{CommandContext, CommandWithContext, ContextReason};
pub use diffing::run_handle_state;
pub use error::{ConfigError, DeviceError};
pub use history::StateHistory;
pub use options::DeviceOptions;
pub use status::{DeviceStatus, StatusCode};

use async_trait::async_trait;
use playout_timeline::{Mapping, ResolvedState};

pub type Millis = playout_clock::Millis;

/// An idempotent description of what a device should currently be doing.
/// A default/empty state must be well-defined.
pub trait DeviceState: Clone + PartialEq + Send + Sync + 'static {
	fn default_state() -> Self;
}

/// Operations a conductor drives every adapter through; see `spec.md` §4.3.
#[async_trait]
pub trait Device: Send + Sync {
	type State: DeviceState;
	type Command: Send + 'static;

	/// Establish transport; on first ready, resolve; subsequent reconnects
	/// re-query and emit `resetResolver`.
	async fn init(&mut self, options: DeviceOptions) -> Result<(), ConfigError>;

	/// Dispose queue, cancel timers, close transport.
	async fn terminate(&mut self);

	/// If `force`: clear queue, re-query device, overwrite history.
	async fn make_ready(&mut self, force: bool) -> Result<(), DeviceError>;

	/// Compute device state, diff, enqueue commands.
	async fn handle_state(&mut self, resolved: &ResolvedState, mapping: &Mapping) -> Result<(), DeviceError>;

	/// Fire whatever queued commands are now due. Adapters with an internal
	/// timed queue (`playout-device-caspar`) override this; adapters that
	/// dispatch synchronously inside `handle_state` can leave the default.
	async fn advance(&mut self) {}

	/// Drop queued commands with time > t.
	async fn clear_future(&mut self, t: Millis);

	fn get_status(&self) -> DeviceStatus;
	fn device_id(&self) -> &str;
	fn device_type(&self) -> &str;
	fn connected(&self) -> bool;
}
