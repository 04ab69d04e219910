//! A representative device adapter: a scheduling-capable multi-channel
//! video-playout server addressed by `(channel, layer)` pairs. Exercises the
//! full device-agnostic diffing contract from `playout-device`, including
//! the scheduling-aware exceptions `spec.md` §4.4 carves out for
//! transitions and lookahead preloads.

mod command;
mod content;
mod device;
mod error;
mod state;
mod timecode;

pub use command::{Dispatch, PlayoutCommand, ScheduleToken};
pub use content::{ClipRef, Direction, Easing, PlayoutContent, SourceKind, Transition, TransitionKind};
pub use device::{CasparDevice, CommandReceiver};
pub use error::PlayoutDeviceError;
pub use state::{LayerId, LayerState, PlayoutDeviceState};
pub use timecode::{format_timecode, seek_frames};
