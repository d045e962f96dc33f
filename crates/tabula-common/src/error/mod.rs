//! Error handling for Tabula.
//!
//! This module provides a unified error type and result alias used
//! across all Tabula components.

mod store;

pub use store::{ErrorCode, TabulaError};

/// Result type alias for Tabula operations.
pub type TabulaResult<T> = std::result::Result<T, TabulaError>;
