use crate::command::{Dispatch, PlayoutCommand, ScheduleToken};
use crate::content::{ClipRef, PlayoutContent, SourceKind};
use crate::error::PlayoutDeviceError;
use crate::state::{LayerId, LayerState, PlayoutDeviceState};
use crate::timecode::{format_timecode, seek_frames};
use async_trait::async_trait;
use playout_clock::Clock;
use playout_device::{CommandContext, ConfigError, Device, DeviceError, DeviceOptions, DeviceStatus, Millis, StateHistory};
use playout_do_on_time::{CommandError, DoOnTimeQueue, SendMode};
use playout_events::{Event, EventBus};
use playout_timeline::{Mapping, ResolvedState};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

const DEFAULT_TIME_BASE: u32 = 25;
const DEFAULT_CHANNEL: u32 = 1;
const DEFAULT_LAYER: u32 = 10;
const SLOW_COMMAND_THRESHOLD: Duration = Duration::from_millis(40);

#[derive(Debug, Deserialize)]
struct Routing {
	channel: u32,
	layer: u32,
}

#[derive(Debug, Clone)]
struct ScheduledEntry {
	layer: LayerId,
	effective_time: Millis,
	paired_background: bool,
	via_schedule_set: bool,
}

struct ScheduledCommand {
	fire_at: Millis,
	layer: LayerId,
	command: PlayoutCommand,
	context: CommandContext,
}

pub type CommandReceiver = Arc<dyn Fn(Dispatch) -> futures::future::BoxFuture<'static, Result<(), CommandError>> + Send + Sync>;

/// A representative scheduling-capable playout-server adapter: a
/// channel/layer video mixer addressed by `(channel, layer)` pairs, able to
/// preload content in the background and accept a future execution timecode
/// via `ScheduleSet`/`ScheduleRemove` (`spec.md` §4.4, §6).
pub struct CasparDevice {
	device_id: String,
	options: DeviceOptions,
	clock: Arc<dyn Clock>,
	events: EventBus,
	history: StateHistory<PlayoutDeviceState>,
	queue: DoOnTimeQueue<Dispatch>,
	routing: HashMap<LayerId, (u32, u32)>,
	ledger: HashMap<ScheduleToken, ScheduledEntry>,
	object_ids: HashMap<LayerId, String>,
	next_token: u64,
	connected: bool,
}

impl CasparDevice {
	#[must_use]
	pub fn new(device_id: impl Into<String>, clock: Arc<dyn Clock>, events: EventBus, receiver: CommandReceiver) -> Self {
		let device_id = device_id.into();
		let queue = DoOnTimeQueue::new(device_id.clone(), SendMode::InOrder, Arc::clone(&clock), events.clone(), SLOW_COMMAND_THRESHOLD, move |dispatch: Dispatch| {
			let receiver = Arc::clone(&receiver);
			async move { receiver(dispatch).await }
		});

		Self {
			device_id,
			options: DeviceOptions::default(),
			clock,
			events,
			history: StateHistory::new(),
			queue,
			routing: HashMap::new(),
			ledger: HashMap::new(),
			object_ids: HashMap::new(),
			next_token: 0,
			connected: false,
		}
	}

	fn time_base(&self) -> u32 {
		self.options.time_base.unwrap_or(DEFAULT_TIME_BASE)
	}

	fn next_token(&mut self) -> ScheduleToken {
		let token = self.next_token;
		self.next_token += 1;
		token
	}

	fn channel_layer(&self, layer: &str) -> (u32, u32) {
		self.routing.get(layer).copied().unwrap_or((DEFAULT_CHANNEL, DEFAULT_LAYER))
	}

	/// Pure projection of the resolved timeline onto this device's layers.
	/// Also refreshes the routing cache used to turn layer names into
	/// `(channel, layer)` addresses when `diff` builds commands, and returns
	/// the timeline object id each layer came from so emitted commands can
	/// attribute themselves back to it.
	fn convert(&mut self, resolved: &ResolvedState, mapping: &Mapping, time_base: u32) -> Result<(PlayoutDeviceState, HashMap<LayerId, String>), PlayoutDeviceError> {
		let mut layers = std::collections::BTreeMap::new();
		let mut object_ids = HashMap::new();

		for (layer_id, object) in &resolved.layers {
			let Some(layer_mapping) = mapping.get(layer_id) else { continue };
			if layer_mapping.device_type != "playout" || layer_mapping.device_id != self.device_id {
				continue;
			}
			if object.content.device_type != "playout" {
				continue;
			}

			if let Ok(routing) = serde_json::from_value::<Routing>(layer_mapping.routing.clone()) {
				self.routing.insert(layer_id.clone(), (routing.channel, routing.layer));
			}

			let content: PlayoutContent = serde_json::from_value(object.content.payload.clone()).map_err(|source| PlayoutDeviceError::InvalidContent {
				layer: layer_id.clone(),
				source,
			})?;

			let ends_at = object.duration.map(|duration| object.start + duration);

			let state = if object.is_lookahead {
				LayerState::Background {
					clip: content.clip,
					scheduled_play_at: ends_at,
				}
			} else {
				LayerState::Playing {
					seek_frames: seek_frames(resolved.time, object.start, time_base, &content.source),
					clip: content.clip,
					looping: content.looping,
					source: content.source,
					in_transition: content.in_transition,
					out_transition: content.out_transition,
					ends_at,
				}
			};
			object_ids.insert(layer_id.clone(), object.id.clone());
			layers.insert(layer_id.clone(), state);
		}

		Ok((PlayoutDeviceState { layers }, object_ids))
	}

	/// `diff(old, new) -> commands`, generalized to return each command's own
	/// execution time rather than assuming every command fires at
	/// `resolvedState.time` — the exception §4.4 carves out for
	/// scheduling-aware devices.
	#[allow(clippy::too_many_arguments)]
	fn diff(&mut self, old: &PlayoutDeviceState, new: &PlayoutDeviceState, old_ids: &HashMap<LayerId, String>, new_ids: &HashMap<LayerId, String>, t: Millis, enqueue_at: Millis, time_base: u32) -> Vec<ScheduledCommand> {
		let mut out = Vec::new();
		let all_layers: BTreeSet<&LayerId> = old.layers.keys().chain(new.layers.keys()).collect();

		// Routed layers diff after every direct layer, so a layer that reads
		// another layer's output settles after its source does.
		let (direct, routed): (Vec<&LayerId>, Vec<&LayerId>) = all_layers.into_iter().partition(|id| !matches!(new.layer(id.as_str()), LayerState::Playing { source: SourceKind::Route { .. }, .. }));

		for layer in direct.into_iter().chain(routed) {
			let old_layer = old.layer(layer).clone();
			let new_layer = new.layer(layer).clone();
			if old_layer == new_layer {
				continue;
			}
			let old_id = old_ids.get(layer.as_str()).map(String::as_str);
			let new_id = new_ids.get(layer.as_str()).map(String::as_str);
			self.diff_layer(layer, &old_layer, &new_layer, old_id, new_id, t, enqueue_at, time_base, &mut out);
		}

		out
	}

	#[allow(clippy::too_many_arguments)]
	fn diff_layer(&mut self, layer: &str, old: &LayerState, new: &LayerState, old_id: Option<&str>, new_id: Option<&str>, t: Millis, enqueue_at: Millis, time_base: u32, out: &mut Vec<ScheduledCommand>) {
		let (channel, layer_num) = self.channel_layer(layer);
		self.retract_pending(layer, old_id, new_id, t, enqueue_at, channel, layer_num, out);

		match new {
			LayerState::Empty => {
				if matches!(old, LayerState::Playing { .. }) {
					out.push(ScheduledCommand {
						fire_at: enqueue_at,
						layer: layer.to_string(),
						command: PlayoutCommand::Clear { channel, layer: layer_num },
						context: attribute(CommandContext::note("timeline no longer covers this layer"), old_id),
					});
				}
			}
			LayerState::Background { clip, scheduled_play_at } => {
				out.push(ScheduledCommand {
					fire_at: enqueue_at,
					layer: layer.to_string(),
					command: PlayoutCommand::LoadBackground {
						channel,
						layer: layer_num,
						clip: clip.clone(),
					},
					context: attribute(CommandContext::note("lookahead preload"), new_id),
				});

				if let Some(play_at) = scheduled_play_at {
					let token = self.next_token();
					let via_schedule_set = self.options.use_scheduling;
					self.ledger.insert(
						token,
						ScheduledEntry {
							layer: layer.to_string(),
							effective_time: *play_at,
							paired_background: true,
							via_schedule_set,
						},
					);

					let inner = PlayoutCommand::Play {
						channel,
						layer: layer_num,
						clip: clip.clone(),
						looping: false,
						seek: 0,
						no_clear: true,
						in_transition: None,
						out_transition: None,
					};

					if via_schedule_set {
						out.push(ScheduledCommand {
							fire_at: enqueue_at,
							layer: layer.to_string(),
							command: PlayoutCommand::ScheduleSet {
								timecode: format_timecode(*play_at, time_base),
								inner: Box::new(inner),
							},
							context: attribute(CommandContext::note("lookahead paired play scheduled on device"), new_id),
						});
					} else {
						out.push(ScheduledCommand {
							fire_at: *play_at,
							layer: layer.to_string(),
							command: inner,
							context: attribute(CommandContext::note("lookahead paired play queued locally"), new_id),
						});
					}
				} else {
					warn!(device_id = %self.device_id, layer, "lookahead object has unknown duration, cannot schedule paired play");
					self.events.publish(Event::Warning(format!("layer {layer}: lookahead object has unknown duration, cannot schedule paired play")));
				}
			}
			LayerState::Playing {
				clip,
				looping,
				seek_frames,
				source,
				in_transition,
				out_transition,
				ends_at,
			} => {
				let needs_teardown = match old {
					LayerState::Playing { clip: old_clip, source: old_source, .. } => (old_clip != clip || std::mem::discriminant(old_source) != std::mem::discriminant(source)) && in_transition.is_none(),
					_ => false,
				};

				if needs_teardown {
					out.push(ScheduledCommand {
						fire_at: enqueue_at,
						layer: layer.to_string(),
						command: PlayoutCommand::Clear { channel, layer: layer_num },
						context: attribute(CommandContext::note("incompatible content change, tearing down before set-up"), new_id),
					});
				}

				out.push(ScheduledCommand {
					fire_at: enqueue_at,
					layer: layer.to_string(),
					command: PlayoutCommand::Play {
						channel,
						layer: layer_num,
						clip: clip.clone(),
						looping: *looping,
						seek: *seek_frames,
						no_clear: needs_teardown,
						in_transition: in_transition.clone(),
						out_transition: out_transition.clone(),
					},
					context: attribute(CommandContext::note("play"), new_id),
				});

				if let (Some(out_tr), Some(end)) = (out_transition, ends_at) {
					let token = self.next_token();
					let via_schedule_set = self.options.use_scheduling;
					self.ledger.insert(
						token,
						ScheduledEntry {
							layer: layer.to_string(),
							effective_time: *end,
							paired_background: false,
							via_schedule_set,
						},
					);

					let inner = PlayoutCommand::Play {
						channel,
						layer: layer_num,
						clip: ClipRef::Empty,
						looping: false,
						seek: 0,
						no_clear: true,
						in_transition: None,
						out_transition: Some(out_tr.clone()),
					};

					if via_schedule_set {
						out.push(ScheduledCommand {
							fire_at: enqueue_at,
							layer: layer.to_string(),
							command: PlayoutCommand::ScheduleSet {
								timecode: format_timecode(*end, time_base),
								inner: Box::new(inner),
							},
							context: attribute(CommandContext::note("scheduled exit transition"), new_id),
						});
					} else {
						out.push(ScheduledCommand {
							fire_at: *end,
							layer: layer.to_string(),
							command: inner,
							context: attribute(CommandContext::note("exit transition queued locally"), new_id),
						});
					}
				}
			}
		}
	}

	/// Retracts every schedule still pending for `layer` whose effective time
	/// has not yet passed `t`. A paired-background schedule also clears the
	/// preload it was paired with (`spec.md` §4.4).
	#[allow(clippy::too_many_arguments)]
	fn retract_pending(&mut self, layer: &str, old_id: Option<&str>, new_id: Option<&str>, t: Millis, enqueue_at: Millis, channel: u32, layer_num: u32, out: &mut Vec<ScheduledCommand>) {
		let superseded: Vec<(ScheduleToken, ScheduledEntry)> = self.ledger.iter().filter(|(_, entry)| entry.layer == layer && entry.effective_time >= t).map(|(token, entry)| (*token, entry.clone())).collect();
		let attributed_id = new_id.or(old_id);

		for (token, entry) in superseded {
			self.ledger.remove(&token);
			if entry.via_schedule_set {
				out.push(ScheduledCommand {
					fire_at: enqueue_at,
					layer: layer.to_string(),
					command: PlayoutCommand::ScheduleRemove { token },
					context: attribute(CommandContext::note("retracting superseded schedule"), attributed_id),
				});
			}
			if entry.paired_background {
				out.push(ScheduledCommand {
					fire_at: enqueue_at,
					layer: layer.to_string(),
					command: PlayoutCommand::LoadBackground {
						channel,
						layer: layer_num,
						clip: ClipRef::Empty,
					},
					context: attribute(CommandContext::note("clearing paired background on retraction"), attributed_id),
				});
			}
		}
	}
}

fn attribute(context: CommandContext, id: Option<&str>) -> CommandContext {
	match id {
		Some(id) => context.for_object(id),
		None => context,
	}
}

#[async_trait]
impl Device for CasparDevice {
	type State = PlayoutDeviceState;
	type Command = PlayoutCommand;

	async fn init(&mut self, options: DeviceOptions) -> Result<(), ConfigError> {
		self.options = options;
		self.connected = true;
		self.events.publish(Event::ConnectionChanged {
			device_id: self.device_id.clone(),
			connected: true,
		});
		Ok(())
	}

	async fn terminate(&mut self) {
		self.queue.dispose();
		self.connected = false;
		self.events.publish(Event::ConnectionChanged {
			device_id: self.device_id.clone(),
			connected: false,
		});
	}

	async fn make_ready(&mut self, force: bool) -> Result<(), DeviceError> {
		if force {
			self.history.reset();
			self.ledger.clear();
			self.events.publish(Event::ResetResolver);
		}
		Ok(())
	}

	#[instrument(skip(self, resolved, mapping), fields(device_id = %self.device_id))]
	async fn handle_state(&mut self, resolved: &ResolvedState, mapping: &Mapping) -> Result<(), DeviceError> {
		let now = self.clock.now();
		let t = now.max(resolved.time);
		let time_base = self.time_base();

		let old_state = self.history.state_before(t);
		let old_ids = self.object_ids.clone();
		let (new_state, new_ids) = self.convert(resolved, mapping, time_base).map_err(|err| {
			error!(device_id = %self.device_id, error = %err, "failed to convert resolved state");
			DeviceError::DiffInvariant(err.to_string())
		})?;
		let commands = self.diff(&old_state, &new_state, &old_ids, &new_ids, t, resolved.time, time_base);
		debug!(device_id = %self.device_id, t, command_count = commands.len(), "computed commands for resolved state");

		self.queue.clear_queue_now_and_after(t);
		for scheduled in commands {
			self.queue.queue(
				scheduled.fire_at,
				scheduled.layer,
				Dispatch {
					time: scheduled.fire_at,
					command: scheduled.command,
					context: scheduled.context,
				},
			);
		}

		self.object_ids = new_ids;
		self.history.set_state(t, new_state);
		self.history.prune_older_than(t);
		Ok(())
	}

	async fn advance(&mut self) {
		self.queue.advance().await;
	}

	async fn clear_future(&mut self, t: Millis) {
		self.queue.clear_queue_after(t);
	}

	fn get_status(&self) -> DeviceStatus {
		if self.connected {
			DeviceStatus::good()
		} else {
			DeviceStatus::bad("device not connected")
		}
	}

	fn device_id(&self) -> &str {
		&self.device_id
	}

	fn device_type(&self) -> &str {
		"playout"
	}

	fn connected(&self) -> bool {
		self.connected
	}
}
