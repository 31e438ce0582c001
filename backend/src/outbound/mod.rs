//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits:
//!
//! - **memory**: tenant-partitioned in-memory repositories
//! - **dispatch**: automation action dispatch recorded through `tracing`
//!
//! Adapters are thin translators between domain types and their storage or
//! delivery mechanism. They contain no business logic.

pub mod dispatch;
pub mod memory;
