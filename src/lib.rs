//! `subpull` - download a single folder of a GitHub repository
//!
//! Two strategies are available:
//! - **api**: walk the folder through the GitHub contents API, listing and
//!   downloading concurrently under a bounded gate ([`fetch::ApiFetch`]).
//! - **sparse**: drive the local `git` client through a sparse checkout
//!   that materialises only the folder ([`git::SparseCheckout`]).
//!
//! Both report progress through an [`progress::EventSink`] and write only
//! below the destination root.
//!
//! ```sh
//! subpull --owner rust-lang --repo rust --folder src/tools --token "$GITHUB_TOKEN"
//! subpull --owner rust-lang --repo rust --folder src/tools --mode sparse --dest ./vendor
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod git;
pub mod operations;
pub mod progress;
pub mod request;
pub mod system;
pub mod utils;

use anyhow::Result;
use cli::Args;
use operations::pull::PullOperation;
use std::sync::Arc;
use system::RealSystem;

/// Main entry point for the subpull library
///
/// # Errors
///
/// Returns an error if the configuration or arguments are invalid, or if
/// the selected strategy fails
pub async fn run(args: Args) -> Result<()> {
    let system = Arc::new(RealSystem::new());
    let pull_operation = PullOperation::new(&args, system)?;
    pull_operation.execute().await?;
    Ok(())
}
