//! Schemas that convert foreign input into their base type before
//! validating.
//!
//! ```
//! use serde_json::json;
//! use vetted::coerce;
//!
//! assert_eq!(json!(42), coerce::int().parse(&json!("42")).unwrap());
//! assert_eq!(json!("1.5"), coerce::string().parse(&json!(1.5)).unwrap());
//! ```

use crate::schema::Schema;
use crate::types;

pub fn string() -> Schema {
    types::string().coerce()
}

pub fn number() -> Schema {
    types::number().coerce()
}

pub fn int() -> Schema {
    types::int().coerce()
}

pub fn boolean() -> Schema {
    types::boolean().coerce()
}
