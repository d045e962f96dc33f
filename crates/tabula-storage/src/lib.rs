//! # tabula-storage
//!
//! Plain-text table storage for Tabula.
//!
//! Each schema is a directory and each table is one text file: a header line
//! describing the columns, then one line per row. This crate provides:
//!
//! - **Codec**: header and row line encoding
//! - **Table**: insert/update/delete/scan with unique and primary-key checks
//! - **Schema**: the four table kinds and their cascades
//! - **Database**: all schemas of a working directory and the default schema
//! - **Import**: bulk loading and random variant assignment
//!
//! ## Example
//!
//! ```rust,no_run
//! use tabula_common::StoreConfig;
//! use tabula_storage::{fields, Database};
//!
//! fn example() -> tabula_common::TabulaResult<()> {
//!     let mut db = Database::open(StoreConfig::with_workdir("/tmp/tabula"))?;
//!     let schema = db.create_schema("school")?;
//!     schema.create_table("students")?;
//!     schema.insert("students", &fields([("name", "Ann"), ("surname", "Lee")]))?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cascade;
pub mod codec;
pub mod database;
pub mod fs;
pub mod import;
pub mod kind;
pub mod schema;
pub mod sequence;
pub mod table;

pub use cascade::fields;
pub use codec::{Column, Fields, Row};
pub use database::{Database, Restored};
pub use kind::TableKind;
pub use schema::Schema;
pub use sequence::Sequence;
pub use table::Table;
