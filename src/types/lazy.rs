use crate::context::{ParseContext, ParsePayload};
use crate::schema::{Schema, SchemaDef};
use crate::tag::TypeTag;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Getter = dyn Fn() -> Schema + Send + Sync;

/// Defers building the inner schema until it is first parsed with, which
/// lets a schema refer to itself.
pub struct LazyDef {
    getter: Arc<Getter>,
    resolved: OnceCell<Schema>,
}

impl LazyDef {
    pub fn resolve(&self) -> &Schema {
        self.resolved.get_or_init(|| (self.getter)())
    }
}

impl fmt::Debug for LazyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyDef")
            .field("resolved", &self.resolved.get().is_some())
            .finish()
    }
}

impl SchemaDef for LazyDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Lazy
    }

    fn expected(&self) -> String {
        self.resolve().def().expected()
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Ok(input)
    }

    fn validate(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let result = self.resolve().run(payload.take_value(), ctx);
        payload.value = result.value;
        payload.issues.extend(result.issues);
    }

    fn passes_nil(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A schema built on first use.
///
/// ```
/// use serde_json::json;
/// use vetted::{array, lazy, object, string, Schema};
///
/// fn tree() -> Schema {
///     object(vec![("name", string()), ("children", array(lazy(tree)))])
/// }
///
/// let input = json!({"name": "a", "children": [{"name": "b", "children": []}]});
/// assert!(tree().parse(&input).is_ok());
/// ```
pub fn lazy<F>(getter: F) -> Schema
where
    F: Fn() -> Schema + Send + Sync + 'static,
{
    Schema::new(LazyDef {
        getter: Arc::new(getter),
        resolved: OnceCell::new(),
    })
}
