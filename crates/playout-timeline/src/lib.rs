//! Timeline object / layer mapping / resolved-state shapes, plus the
//! `Resolver` seam that the conductor calls through.
//!
//! The real resolution algorithm is explicitly out of scope (`spec.md` §1):
//! it is "taken as a black box that maps timeline + time to a layer→object
//! mapping". [`StaticResolver`] is a minimal reference implementation that
//! is just real enough to drive the conductor and its tests; production
//! deployments are expected to plug in their own [`Resolver`].

mod mapping;
mod object;
mod resolved;
mod resolver;

pub use mapping::{LayerMapping, Mapping};
pub use object::{Content, Enable, Keyframe, ObjectId, TimeReference, TimelineObject};
pub use resolved::{LayerId, ResolvedObject, ResolvedState};
pub use resolver::{Resolver, ResolverError, StaticResolver};

pub type Millis = playout_clock::Millis;
