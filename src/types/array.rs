use crate::context::{ParseContext, ParsePayload};
use crate::issue::{PathSegment, RawIssue};
use crate::schema::{Schema, SchemaDef, SchemaError};
use crate::tag::TypeTag;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// A positional sequence: fixed leading `items`, then any number of `rest`
/// elements. A plain array has no items and a rest schema; a tuple without
/// rest has an exact length.
#[derive(Clone, Debug)]
pub struct ArrayDef {
    tag: TypeTag,
    items: Vec<Schema>,
    rest: Option<Schema>,
}

impl ArrayDef {
    pub fn items(&self) -> &[Schema] {
        &self.items
    }

    pub fn rest(&self) -> Option<&Schema> {
        self.rest.as_ref()
    }

    fn fits(&self, len: usize) -> bool {
        let fixed = self.items.len();
        len == fixed || (len > fixed && self.rest.is_some())
    }

    fn length_issue(&self, len: usize, input: &Value) -> RawIssue {
        let fixed = self.items.len() as f64;
        let mut issue = if len < self.items.len() {
            RawIssue::too_small("array", fixed, true, input)
        } else {
            RawIssue::too_big("array", fixed, true, input)
        };
        if self.rest.is_none() {
            issue.properties.exact = Some(true);
        }
        issue
    }
}

impl SchemaDef for ArrayDef {
    fn type_tag(&self) -> TypeTag {
        self.tag
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        if input.is_array() {
            Ok(input)
        } else {
            Err(input)
        }
    }

    fn validate(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let elements = match payload.take_value() {
            Value::Array(elements) => elements,
            other => {
                payload.push(RawIssue::invalid_type(self.expected(), &other));
                payload.value = other;
                return;
            }
        };

        let len = elements.len();
        if !self.fits(len) {
            let input = Value::Array(elements);
            payload.push(self.length_issue(len, &input));
            payload.value = input;
            return;
        }

        let mut out = Vec::with_capacity(len);
        for (index, element) in elements.into_iter().enumerate() {
            let schema = match self.items.get(index).or(self.rest.as_ref()) {
                Some(schema) => schema,
                None => break,
            };
            let result = schema.run(element, ctx);
            if !result.issues.is_empty() {
                payload.extend_prefixed(result.issues, &PathSegment::Index(index));
            }
            out.push(result.value);
        }
        payload.value = Value::Array(out);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn array(element: Schema) -> Schema {
    Schema::new(ArrayDef {
        tag: TypeTag::Array,
        items: Vec::new(),
        rest: Some(element),
    })
}

/// A fixed-length sequence.
///
/// ```
/// use serde_json::json;
/// use vetted::{int, string, tuple};
///
/// let pair = tuple(vec![string(), int()]);
/// assert!(pair.parse(&json!(["a", 1])).is_ok());
/// assert!(pair.parse(&json!(["a", 1, 2])).is_err());
/// ```
pub fn tuple(items: Vec<Schema>) -> Schema {
    Schema::new(ArrayDef {
        tag: TypeTag::Tuple,
        items,
        rest: None,
    })
}

pub fn tuple_with_rest(items: Vec<Schema>, rest: Schema) -> Schema {
    Schema::new(ArrayDef {
        tag: TypeTag::Tuple,
        items,
        rest: Some(rest),
    })
}

impl Schema {
    /// Accepts any number of trailing elements matching `rest` after a
    /// tuple's fixed items.
    pub fn rest(&self, rest: &Schema) -> Result<Schema, SchemaError> {
        let def = self
            .downcast_def::<ArrayDef>()
            .filter(|def| def.tag == TypeTag::Tuple)
            .ok_or(SchemaError::NotATuple(self.type_tag()))?;
        let def = ArrayDef {
            rest: Some(rest.clone()),
            ..def.clone()
        };
        Ok(self.derive(Arc::new(def), self.internals().clone()))
    }
}
