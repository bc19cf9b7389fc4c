//! Audit log and compliance query surface for the Reaper platform (C13).

pub mod audit;

pub use audit::InMemoryAuditSink;
pub use reaper_core;
