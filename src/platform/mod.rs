//! Platform-specific helpers.

pub mod file_ops;
