//! Runtime layer around the engine: the single-writer actor service and the
//! periodic quest-expiry sweep.

pub mod service;
pub mod sweeper;

pub use service::{GrantTarget, Service, ServiceConfig, ServiceHandle};
pub use sweeper::{spawn_sweeper, SweeperConfig};
