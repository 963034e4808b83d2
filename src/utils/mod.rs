//! Utility functions module

pub mod path;

pub use path::*;
