//! Shared plumbing for the `courier-bot` and `courier` binaries.
pub mod platform;
