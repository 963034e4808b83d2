//! Operations module
//!
//! Coordinates a pull: building the request, running the selected strategy
//! and presenting its progress

pub mod pull;
pub mod report;

pub use pull::*;
pub use report::*;
