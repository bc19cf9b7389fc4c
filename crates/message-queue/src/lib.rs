//! Kill registry and propagation channel for the Reaper platform (C9).

pub mod kill_registry;

pub use kill_registry::InMemoryKillRegistry;
pub use reaper_core;
