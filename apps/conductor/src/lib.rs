//! Resolver-driven tick loop that owns the device registry, mapping table,
//! and timeline, and drives every device through the `handle_state`
//! contract each tick (`spec.md` §4.5).

mod conductor;
mod config;

pub use conductor::{Conductor, ConductorError};
pub use config::ConductorConfig;
