//! Filesystem-facing helpers: configuration and route manifests.

pub mod config;
pub mod manifest;
