//! # rustopenalex
//!
//! OpenAlex citation metrics toolkit
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with explicit configuration and bounded retry
//! - [`fetcher`] - Cursor-paginated fetch with item cap and partial results
//! - [`work`] - Field accessors over raw work records
//! - [`stats`] - Citation totals, averages and time-window statistics
//! - [`classify`] - Keyword filtering and two-way keyword classification
//! - [`export`] - CSV output and input
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustopenalex::client::{ClientConfig, OpenAlexClient};
//! use rustopenalex::fetcher::{self, Query};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OpenAlexClient::new(ClientConfig::default())?;
//!     let query = Query::primary_source_works("S199447588")?
//!         .sort("cited_by_count:desc")
//!         .item_cap(800)?;
//!     let outcome = fetcher::fetch(&client, &query).await;
//!     println!("Fetched {} works (complete: {})", outcome.records.len(), outcome.is_complete());
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod client;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod stats;
pub mod work;

pub use error::{OpenAlexError, Result};
