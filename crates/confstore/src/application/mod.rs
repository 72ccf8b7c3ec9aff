//! Application layer: mount coordination and the configuration service.
//!
//! Both use cases depend only on the `confstore-core` contract types;
//! concrete backends are injected at construction time.

pub mod mount;
pub mod store_service;
