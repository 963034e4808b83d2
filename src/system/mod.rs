//! System abstraction for filesystem operations
//!
//! Both fetch strategies touch the local filesystem only through this trait,
//! allowing for easy testing with mock implementations.

use std::io;
use std::path::Path;

pub mod mock;
pub mod real;

pub use mock::MockSystem;
pub use real::RealSystem;

/// Unified trait for filesystem operations
///
/// # Implementations
/// - `RealSystem`: Production implementation using `std::fs`
/// - `MockSystem`: Test implementation using in-memory storage
pub trait System: Send + Sync {
    /// Read entire file contents as a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read entire file contents as bytes
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write bytes to a file, creating or truncating it
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Recursively create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path points to a directory
    fn is_dir(&self, path: &Path) -> bool;
}
