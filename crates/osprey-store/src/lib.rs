//! Osprey Store - Durable persistence adapters
//!
//! Ports for the survey document store, the photo blob store, and the
//! storage health probe, with in-memory and SQLite implementations.

pub mod memory;
pub mod ports;
pub mod sqlite;
