//! Configuration for Tabula.
//!
//! This module provides the store configuration and the policies that
//! govern how cascades behave.

mod store;

pub use store::{CatalogDeletePolicy, FullNamePolicy, StoreConfig};
