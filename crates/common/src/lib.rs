//! Common crate
//!
//! Shared error handling and the lookup-table catalog used by the Floe planner.
//!
//! # Example
//! ```rust
//! use floe_common::Error;
//! let err = Error::plan("example error");
//! assert_eq!(err.to_string(), "Planning error: example error");
//! ```

pub mod catalog;
pub mod error;

pub use catalog::{LookupCapability, LookupCatalog, LookupTableEntry};
pub use error::{Error, Result};
