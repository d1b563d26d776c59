//! Shared leaf types for the WaveScope control workspace.
//!
//! This crate contains small building blocks used by every other crate.
//! It has no business logic and no I/O.
//!
//! ## Architecture
//!
//! - **common** (this crate): shared leaf types
//! - **control-core**: the viewer control channel built on top of them
//!
//! Keeping the leaf types in their own crate avoids dependency cycles
//! between error types and the modules that raise them.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
