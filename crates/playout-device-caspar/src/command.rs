use crate::content::{ClipRef, Transition};
use playout_device::{CommandContext, Millis};

pub type ScheduleToken = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayoutCommand {
	Play {
		channel: u32,
		layer: u32,
		clip: ClipRef,
		looping: bool,
		seek: u64,
		no_clear: bool,
		in_transition: Option<Transition>,
		out_transition: Option<Transition>,
	},
	Clear {
		channel: u32,
		layer: u32,
	},
	LoadBackground {
		channel: u32,
		layer: u32,
		clip: ClipRef,
	},
	ScheduleSet {
		timecode: String,
		inner: Box<PlayoutCommand>,
	},
	ScheduleRemove {
		token: ScheduleToken,
	},
}

/// What the queue actually hands to the command receiver: a command plus the
/// time it was scheduled to fire at and the context that produced it. The
/// time travels with the payload (rather than living only on the queue slot)
/// because scheduling-aware commands fire at a time different from the
/// `resolvedState.time` they were enqueued at (`spec.md` §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
	pub time: Millis,
	pub command: PlayoutCommand,
	pub context: CommandContext,
}
