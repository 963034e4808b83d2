//! Git operations module
//!
//! Drives the external git client through a sparse checkout

pub mod repository;
pub mod runner;
pub mod sparse_checkout;

pub use repository::*;
pub use runner::*;
pub use sparse_checkout::*;
