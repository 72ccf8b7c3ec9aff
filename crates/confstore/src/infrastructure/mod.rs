//! Storage backend implementations.
//!
//! Each backend satisfies the `confstore-core` capability contract. The mock
//! backend is compiled unconditionally so integration tests can use it.

pub mod file_system;
pub mod local_store;
pub mod mock;
