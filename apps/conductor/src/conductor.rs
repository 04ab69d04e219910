use dashmap::DashMap;
use playout_clock::{Clock, Millis};
use playout_device::{ConfigError, Device, DeviceError, DeviceOptions, DeviceStatus};
use playout_events::{Event, EventBus};
use playout_timeline::{Mapping, ResolvedState, Resolver, ResolverError, TimelineObject};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::instrument;

#[derive(Debug, Error)]
pub enum ConductorError {
	#[error("device configuration rejected: {0}")]
	Config(#[from] ConfigError),
	#[error("device error: {0}")]
	Device(#[from] DeviceError),
	#[error("resolver error: {0}")]
	Resolver(#[from] ResolverError),
}

const DEFAULT_HORIZON_MS: Millis = 2_000;

struct DeviceEntry<D> {
	device: D,
	ready: bool,
	/// `handleState` calls that arrived while `init` was still in flight,
	/// flushed once the device reports ready (`spec.md` §4.5).
	pending: VecDeque<(ResolvedState, Mapping)>,
}

#[derive(Default, Clone)]
struct ConductorState {
	timeline: Vec<TimelineObject>,
	mapping: Mapping,
}

/// Resolver-driven tick loop plus device registry. Generic over a single
/// concrete [`Device`] implementation — this workspace ships one
/// representative adapter (`playout-device-caspar`), so the registry does
/// not need to erase across device kinds the way a production deployment
/// with several device families would (see `DESIGN.md`).
pub struct Conductor<D: Device> {
	clock: Arc<dyn Clock>,
	resolver: Arc<dyn Resolver>,
	state: RwLock<ConductorState>,
	devices: DashMap<String, DeviceEntry<D>>,
	events: EventBus,
	horizon: Millis,
	initialize_as_clear: bool,
}

impl<D: Device> Conductor<D> {
	#[must_use]
	pub fn new(clock: Arc<dyn Clock>, resolver: Arc<dyn Resolver>, events: EventBus, initialize_as_clear: bool) -> Self {
		Self {
			clock,
			resolver,
			state: RwLock::new(ConductorState::default()),
			devices: DashMap::new(),
			events,
			horizon: DEFAULT_HORIZON_MS,
			initialize_as_clear,
		}
	}

	#[must_use]
	pub fn with_horizon(mut self, horizon: Millis) -> Self {
		self.horizon = horizon;
		self
	}

	#[must_use]
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.events.subscribe()
	}

	pub async fn set_timeline(&self, timeline: Vec<TimelineObject>) -> Result<(), ConductorError> {
		{
			let mut state = self.state.write().await;
			state.timeline = timeline;
		}
		self.tick().await
	}

	pub async fn set_mapping(&self, mapping: Mapping) -> Result<(), ConductorError> {
		{
			let mut state = self.state.write().await;
			state.mapping = mapping;
		}
		self.tick().await
	}

	/// Registers a device, awaits `init`, then flushes any `handle_state`
	/// calls this device missed while initializing. If
	/// `initialize_as_clear` is set, immediately feeds it an empty resolved
	/// state so it tears down to `default_state()`.
	pub async fn add_device(&self, device_id: impl Into<String>, device: D, options: DeviceOptions) -> Result<(), ConductorError> {
		let device_id = device_id.into();
		self.devices.insert(
			device_id.clone(),
			DeviceEntry {
				device,
				ready: false,
				pending: VecDeque::new(),
			},
		);

		let Some((_, mut entry)) = self.devices.remove(&device_id) else {
			return Ok(());
		};
		if let Err(err) = entry.device.init(options).await {
			return Err(ConductorError::Config(err));
		}
		entry.ready = true;
		let pending = std::mem::take(&mut entry.pending);
		self.devices.insert(device_id.clone(), entry);

		for (resolved, mapping) in pending {
			let Some((_, mut entry)) = self.devices.remove(&device_id) else { break };
			if let Err(err) = entry.device.handle_state(&resolved, &mapping).await {
				self.events.publish(Event::Error(format!("{device_id}: {err}")));
			}
			entry.device.advance().await;
			self.devices.insert(device_id.clone(), entry);
		}

		if self.initialize_as_clear {
			let now = self.clock.now();
			let empty = ResolvedState::empty(now);
			let mapping = self.state.read().await.mapping.clone();
			let Some((_, mut entry)) = self.devices.remove(&device_id) else {
				return Ok(());
			};
			let result = entry.device.handle_state(&empty, &mapping).await;
			entry.device.advance().await;
			self.devices.insert(device_id, entry);
			result?;
		}

		Ok(())
	}

	/// Best-effort teardown; a device that errors on `terminate` is still
	/// dropped from the registry.
	pub async fn remove_device(&self, device_id: &str) {
		if let Some((_, mut entry)) = self.devices.remove(device_id) {
			entry.device.terminate().await;
		}
	}

	/// Worst status across every registered device.
	#[must_use]
	pub fn get_status(&self) -> DeviceStatus {
		self.devices.iter().map(|entry| entry.device.get_status()).max_by_key(|status| status.code).unwrap_or_else(DeviceStatus::good)
	}

	/// Resolves the timeline at `now` and at every change point within the
	/// look-ahead horizon, dispatching each snapshot to every device in
	/// turn (`spec.md` §4.5).
	#[instrument(skip(self))]
	pub async fn tick(&self) -> Result<(), ConductorError> {
		let now = self.clock.now();
		let (timeline, mapping) = {
			let state = self.state.read().await;
			(state.timeline.clone(), state.mapping.clone())
		};

		let mut times = vec![now];
		times.extend(self.resolver.change_points(&timeline, now, self.horizon));
		times.sort_unstable();
		times.dedup();

		for t in times {
			// Resolver errors are recoverable: skip this change point, emit
			// an event, and keep going rather than rejecting the whole tick.
			let resolved = match self.resolver.resolve(&timeline, t) {
				Ok(resolved) => resolved,
				Err(err) => {
					self.events.publish(Event::Error(format!("resolver: {err}")));
					continue;
				}
			};
			self.dispatch(&resolved, &mapping).await;
		}

		Ok(())
	}

	async fn dispatch(&self, resolved: &ResolvedState, mapping: &Mapping) {
		let device_ids: Vec<String> = self.devices.iter().map(|entry| entry.key().clone()).collect();

		for device_id in device_ids {
			let Some((_, mut entry)) = self.devices.remove(&device_id) else { continue };
			if entry.ready {
				if let Err(err) = entry.device.handle_state(resolved, mapping).await {
					self.events.publish(Event::Error(format!("{device_id}: {err}")));
				}
				entry.device.advance().await;
			} else {
				entry.pending.push_back((resolved.clone(), mapping.clone()));
			}
			self.devices.insert(device_id, entry);
		}
	}
}
