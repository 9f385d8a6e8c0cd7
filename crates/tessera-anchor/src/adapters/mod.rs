//! Anchor client implementations.

pub mod memory;
