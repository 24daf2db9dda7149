//! memfits command-line front end.
//!
//! Loads an image manifest and a mount configuration, then drives the
//! kernel's callback dispatcher directly.

pub mod commands;
pub mod manifest;

pub use manifest::ManifestError;
