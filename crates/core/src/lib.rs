//! Shared types for the generation relay.
//!
//! Holds the ID/timestamp aliases used across crates and the delivery
//! channel registry for push-mode result delivery.

pub mod channels;
pub mod types;
