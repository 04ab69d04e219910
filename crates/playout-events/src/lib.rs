//! Typed publish channel for conductor/device diagnostics.
//!
//! Mirrors the `error|warning|info|debug|commandError|connectionChanged|resetResolver|slowCommand`
//! event surface: one `tokio::sync::broadcast` channel, one enum, many
//! subscribers. A slow subscriber lags and misses events rather than
//! blocking publishers.

use playout_clock::Millis;
use tokio::sync::broadcast;
use tracing::warn;

pub type DeviceId = String;

#[derive(Debug, Clone)]
pub enum Event {
	Error(String),
	Warning(String),
	Info(String),
	Debug(String),
	CommandError {
		command: String,
		context: String,
		timeline_obj_id: Option<String>,
	},
	ConnectionChanged {
		device_id: DeviceId,
		connected: bool,
	},
	ResetResolver,
	SlowCommand {
		device_id: DeviceId,
		waited: Millis,
	},
}

const CHANNEL_CAPACITY: usize = 1024;

/// Thin wrapper over a broadcast sender; cloning an `EventBus` shares the
/// same channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<Event>,
}

impl EventBus {
	#[must_use]
	pub fn new() -> Self {
		let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
		Self { sender }
	}

	pub fn publish(&self, event: Event) {
		// No receivers is the common case when nothing has subscribed yet;
		// that's not an error condition.
		let _ = self.sender.send(event);
	}

	#[must_use]
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.sender.subscribe()
	}

	/// Drain every event currently queued for `rx`, warning once if the
	/// receiver fell behind and missed some.
	pub async fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
		let mut events = Vec::new();
		loop {
			match rx.try_recv() {
				Ok(event) => events.push(event),
				Err(broadcast::error::TryRecvError::Lagged(missed)) => {
					warn!(missed, "event subscriber lagged, dropped events");
				}
				Err(_) => break,
			}
		}
		events
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new()
	}
}
