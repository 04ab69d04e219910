use futures::future::{join_all, BoxFuture};
use playout_clock::{Clock, Millis};
use playout_events::{Event, EventBus};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, instrument};

#[derive(Debug, Error)]
pub enum CommandError {
	#[error("{0}")]
	Failed(String),
}

/// Two modes, chosen per device at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendMode {
	/// At firing time, all entries with `time <= now` are fired
	/// concurrently, in ascending `(time, insertion_order)` order.
	Burst,
	/// Entries fire strictly sequentially; each handler's returned future
	/// is awaited before the next is fired, so a slow command cannot be
	/// overtaken.
	InOrder,
}

/// A stable, cloneable view of one queued entry.
#[derive(Clone, Debug)]
pub struct QueueEntry<P> {
	pub id: super::QueueToken,
	pub time: Millis,
	pub group: super::QueueGroup,
	pub payload: P,
}

struct Slot<P> {
	id: u64,
	time: Millis,
	group: String,
	seq: u64,
	payload: P,
}

type Handler<P> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<(), CommandError>> + Send + Sync>;

/// Per-device timed dispatch queue. `P` is the command payload handed to
/// the injected handler (typically a device's command-receiver seam, see
/// `spec.md` §6).
pub struct DoOnTimeQueue<P> {
	device_id: String,
	mode: SendMode,
	clock: Arc<dyn Clock>,
	handler: Handler<P>,
	events: EventBus,
	slow_command_threshold: Duration,
	entries: Mutex<Vec<Slot<P>>>,
	next_token: AtomicU64,
	next_seq: AtomicU64,
	disposed: AtomicBool,
}

impl<P> DoOnTimeQueue<P>
where
	P: Clone + fmt::Debug + Send + 'static,
{
	pub fn new<H, F>(device_id: impl Into<String>, mode: SendMode, clock: Arc<dyn Clock>, events: EventBus, slow_command_threshold: Duration, handler: H) -> Self
	where
		H: Fn(P) -> F + Send + Sync + 'static,
		F: std::future::Future<Output = Result<(), CommandError>> + Send + 'static,
	{
		Self {
			device_id: device_id.into(),
			mode,
			clock,
			handler: Arc::new(move |payload| Box::pin(handler(payload))),
			events,
			slow_command_threshold,
			entries: Mutex::new(Vec::new()),
			next_token: AtomicU64::new(0),
			next_seq: AtomicU64::new(0),
			disposed: AtomicBool::new(false),
		}
	}

	/// `queue(time, queueGroup, payload) -> token`.
	pub fn queue(&self, time: Millis, group: impl Into<String>, payload: P) -> super::QueueToken {
		let id = self.next_token.fetch_add(1, Ordering::SeqCst);
		let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
		let mut entries = self.entries.lock().expect("do-on-time queue poisoned");
		entries.push(Slot { id, time, group: group.into(), seq, payload });
		id
	}

	/// Removes all entries with time strictly after `t`.
	pub fn clear_queue_after(&self, t: Millis) {
		let mut entries = self.entries.lock().expect("do-on-time queue poisoned");
		entries.retain(|slot| slot.time <= t);
	}

	/// Removes all entries with time greater than or equal to `t`.
	pub fn clear_queue_now_and_after(&self, t: Millis) {
		let mut entries = self.entries.lock().expect("do-on-time queue poisoned");
		entries.retain(|slot| slot.time < t);
	}

	/// A stable snapshot of everything still queued.
	pub fn get_queue(&self) -> Vec<QueueEntry<P>> {
		let entries = self.entries.lock().expect("do-on-time queue poisoned");
		entries
			.iter()
			.map(|slot| QueueEntry {
				id: slot.id,
				time: slot.time,
				group: slot.group.clone(),
				payload: slot.payload.clone(),
			})
			.collect()
	}

	/// Disposable; after disposal all future firings are suppressed.
	pub fn dispose(&self) {
		self.disposed.store(true, Ordering::SeqCst);
		let mut entries = self.entries.lock().expect("do-on-time queue poisoned");
		entries.clear();
	}

	/// Fire every entry due at or before `clock.now()`. Called on each
	/// internal tick and on external nudges (e.g. right after `queue()`
	/// enqueues something already in the past).
	#[instrument(skip(self), fields(device_id = %self.device_id))]
	pub async fn advance(&self) {
		if self.disposed.load(Ordering::SeqCst) {
			return;
		}

		let now = self.clock.now();
		let due = {
			let mut entries = self.entries.lock().expect("do-on-time queue poisoned");
			let (mut due, remaining): (Vec<_>, Vec<_>) = entries.drain(..).partition(|slot| slot.time <= now);
			*entries = remaining;
			due.sort_by_key(|slot| (slot.time, slot.seq));
			due
		};

		if due.is_empty() {
			return;
		}

		match self.mode {
			SendMode::Burst => self.fire_burst(due).await,
			SendMode::InOrder => self.fire_in_order(due).await,
		}
	}

	async fn fire_burst(&self, due: Vec<Slot<P>>) {
		let futures = due.into_iter().map(|slot| self.fire_one(slot));
		join_all(futures).await;
	}

	async fn fire_in_order(&self, due: Vec<Slot<P>>) {
		for slot in due {
			let started = Instant::now();
			self.fire_one(slot).await;
			let waited = started.elapsed();
			if waited > self.slow_command_threshold {
				self.events.publish(Event::SlowCommand {
					device_id: self.device_id.clone(),
					waited: waited.as_millis() as Millis,
				});
			}
		}
	}

	async fn fire_one(&self, slot: Slot<P>) {
		let description = format!("{:?}", slot.payload);
		let group = slot.group.clone();
		// Handler errors are caught and surfaced on the event bus; they
		// never block the queue.
		if let Err(err) = (self.handler)(slot.payload).await {
			error!(device_id = %self.device_id, group = %group, error = %err, "queued command failed");
			self.events.publish(Event::CommandError {
				command: description,
				context: err.to_string(),
				timeline_obj_id: None,
			});
		}
	}
}
