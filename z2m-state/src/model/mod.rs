//! Model types for z2m-state

mod discovered;
mod domain;
mod host;

pub use discovered::DiscoveredEntity;
pub use domain::Domain;
pub use host::{Device, Entity, EntityData, SyncStatus};
