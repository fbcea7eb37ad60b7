//! Composable runtime schemas for parsing and validating JSON values.
//!
//! A [`Schema`] parses a [`serde_json::Value`] into a new value, or fails
//! with a [`ParseError`] listing every issue found along with its path.
//!
//! ```
//! use serde_json::json;
//! use vetted::{int, object, string, IssueCode};
//!
//! let user = object(vec![
//!     ("name", string().min(1)),
//!     ("age", int().gte(0)),
//!     ("role", string().default("member")),
//! ])
//! .strict()
//! .unwrap();
//!
//! assert_eq!(
//!     json!({"name": "Ada", "age": 36, "role": "member"}),
//!     user.parse(&json!({"name": "Ada", "age": 36})).unwrap()
//! );
//!
//! let err = user.parse(&json!({"name": "", "age": -1, "x": 0})).unwrap_err();
//! assert_eq!(
//!     vec![IssueCode::TooSmall, IssueCode::TooSmall, IssueCode::UnrecognizedKeys],
//!     err.issues().iter().map(|issue| issue.code).collect::<Vec<_>>()
//! );
//! ```

pub mod coerce;
pub mod config;
pub mod registry;

mod check;
mod context;
mod engine;
mod internals;
mod issue;
mod messages;
mod schema;
mod tag;
mod types;

pub use check::*;
pub use context::*;
pub use internals::*;
pub use issue::*;
pub use messages::*;
pub use registry::{Meta, Registry};
pub use schema::*;
pub use tag::*;
pub use types::*;
