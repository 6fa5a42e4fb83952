//! Discovered-entity state for the bridge
//!
//! # Architecture
//!
//! ```text
//! DiscoveryRecord → DiscoveredEntity → ReconciliationStore ─┬─► storage blob
//!                                                           └─► reconcile_* ─► host devices/entities
//! ```
//!
//! The store is the single owner of discovered entities. Reconciliation works
//! on a snapshot and is pure, so the host's callbacks never run under the
//! store's lock.
//!
//! # Quick Start
//!
//! ```
//! use z2m_state::{reconcile_devices, Device, DiscoveredEntity, ReconciliationStore};
//!
//! let store = ReconciliationStore::new();
//! store.upsert(DiscoveredEntity {
//!     unique_id: "0x1234_light".into(),
//!     device_key: "hw-mac-001".into(),
//!     device_name: "Updated Firmware Name".into(),
//!     ..Default::default()
//! });
//!
//! let existing = Device {
//!     id: "device-hw-mac-001".into(),
//!     source_id: "hw-mac-001".into(),
//!     source_name: "Original".into(),
//!     local_name: "Basement Bar 01".into(),
//! };
//!
//! let devices = reconcile_devices(&store.snapshot(), vec![existing]);
//! assert_eq!(devices[0].source_name, "Updated Firmware Name");
//! assert_eq!(devices[0].local_name, "Basement Bar 01");
//! ```

pub mod error;
pub mod ids;
pub mod model;
pub mod reconcile;
pub mod store;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Result, StateError};
pub use model::{DiscoveredEntity, Device, Domain, Entity, EntityData, SyncStatus};
pub use store::{ReconciliationStore, UpsertOutcome};

// ============================================================================
// Reconciliation
// ============================================================================

pub use ids::{device_id, entity_id, sanitize};
pub use reconcile::{
    device_raw_config, entity_raw_config, reconcile_device, reconcile_devices, reconcile_entities,
};
