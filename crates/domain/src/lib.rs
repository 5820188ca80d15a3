//! costcat-sync domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `fingerprint`: Canonical JSON hashing used for change detection
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Collection, change detection, rule building and publishing

pub mod fingerprint;
pub mod model;
pub mod ports;
pub mod usecases;

pub use fingerprint::{
    Fingerprint, FingerprintError, canonical_json, fingerprint, fingerprint_value,
};
pub use model::*;
pub use ports::*;
