//! # tabula-common
//!
//! Common types, errors, and configuration for Tabula.
//!
//! This crate provides the foundational pieces shared by the storage
//! engine and the command-line interpreter:
//!
//! - **Errors**: Unified error handling with `TabulaError`
//! - **Config**: Store configuration and cascade policies
//! - **Constants**: Reserved separators, sentinels, and file naming
//!
//! ## Example
//!
//! ```rust
//! use tabula_common::config::StoreConfig;
//! use tabula_common::error::TabulaResult;
//!
//! fn example() -> TabulaResult<()> {
//!     let config = StoreConfig::with_workdir("/tmp/tabula");
//!     assert!(config.sync_writes);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod error;

pub use config::{CatalogDeletePolicy, FullNamePolicy, StoreConfig};
pub use constants::*;
pub use error::{ErrorCode, TabulaError, TabulaResult};
