//! DockWatch core: Docker Engine HTTP API gateway.
//!
//! Lists containers, images, networks and volumes, aggregates a host
//! snapshot and demultiplexes container log streams, talking the Engine
//! API directly over HTTP(S).

pub mod config;
pub mod engine;
pub mod hub;
pub mod logs;
pub mod profile;
pub mod stats;
pub mod utils;

pub use engine::{EngineApi, EngineClient, Tail};
pub use profile::{ConnectionProfile, ProfileSpec, Scheme};
pub use stats::{host_snapshot, HostMetrics, HostSnapshot};
pub use utils::{DockwatchError, LogLine, Result, StreamKind};
