//! Planner crate
//!
//! Plans lookup joins: derives the lookup keys a join can push into a
//! key-addressed table, the residual condition evaluated after the lookup,
//! the joined row type and whether the keys cover the table's primary key.
//!
//! # Example
//! ```rust
//! use arrow::datatypes::{DataType, Field, Schema};
//! use floe_planner::{JoinInfo, JoinType, LookupJoinInput, LookupJoinPlan, TemporalTable};
//! use std::sync::Arc;
//!
//! let orders = Arc::new(Schema::new(vec![Field::new("user_id", DataType::Int32, false)]));
//! let users = Arc::new(Schema::new(vec![Field::new("id", DataType::Int32, false)]));
//! let input = LookupJoinInput::new(
//!     orders,
//!     TemporalTable::new("users", users).with_primary_key(["id"]),
//!     JoinType::Inner,
//!     JoinInfo::of_pairs([(0, 0)]),
//! );
//! let plan = LookupJoinPlan::try_new(input).unwrap();
//! assert!(plan.remaining_condition().is_none());
//! assert!(plan.lookup_key_contains_primary_key().unwrap());
//! ```

pub mod condition;
pub mod config;
pub mod exec;
pub mod explain;
pub mod hint;
pub mod join;
pub mod logical_plan;
pub mod lookup_key;
pub mod plan;
pub mod primary_key;

pub use config::{AsyncLookupSettings, Settings};
pub use exec::{ExecutionMode, LookupJoinExecSpec};
pub use explain::LookupJoinExplain;
pub use hint::{AsyncLookupOptions, LookupJoinHint, OutputMode, RetryStrategy};
pub use join::{JoinInfo, JoinKeyPair, JoinType};
pub use logical_plan::LogicalPlan;
pub use lookup_key::{LookupKey, LookupKeys};
pub use plan::{LookupJoinInput, LookupJoinPlan, TemporalTable};
