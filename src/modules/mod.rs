//! Modules layer - Infrastructure components for external integrations
//!
//! Contains clients for blob storage and the managed secret vault.

pub mod storage;
pub mod vault;
