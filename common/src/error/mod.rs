//! Error building blocks shared by every crate in the workspace.

pub mod error_location;
