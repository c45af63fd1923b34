//! Expression crate
//!
//! The typed scalar expression tree shared by the Floe planner: input
//! references, literals and operator calls, plus the projection/filter
//! program (`CalcProgram`) that may sit on top of a lookup table.
//!
//! # Example
//! ```rust
//! use arrow::datatypes::{DataType, Field, Schema};
//! use floe_expr::Expr;
//!
//! let schema = Schema::new(vec![Field::new("id", DataType::Int32, false)]);
//! let pred = Expr::eq(Expr::input_ref(0, &schema).unwrap(), Expr::literal(11i32)).unwrap();
//! assert_eq!(pred.display(&schema).to_string(), "(id = 11)");
//! ```

pub mod calc;
pub mod expr;
pub mod types;

pub use calc::CalcProgram;
pub use expr::{conjunction, conjunctions, format_scalar, Expr, ExprDisplay, Operator};
pub use types::is_interoperable;

/// Literal values carried by `Expr::Literal`.
pub use datafusion::scalar::ScalarValue;
