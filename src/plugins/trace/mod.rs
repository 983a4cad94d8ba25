//! Trace renderer plugin.
//!
//! Logs device metadata when a device appears and disappears. Useful to
//! check match criteria before wiring up a real renderer.
//!
//! Enable with feature flag: `plugin-trace`

pub mod plugin;

pub use plugin::{TracePlugin, TraceRenderer};
