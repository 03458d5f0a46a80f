//! Structured-logging vocabulary shared across the harness.
//!
//! Library code emits `tracing` events and never installs a global
//! subscriber; test binaries own one-time subscriber initialization.

pub mod events;
pub mod fields;
