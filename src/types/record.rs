use crate::context::{ParseContext, ParsePayload};
use crate::issue::{PathSegment, RawIssue};
use crate::schema::{Schema, SchemaDef};
use crate::tag::TypeTag;
use serde_json::{Map, Value};
use std::any::Any;

/// An object with arbitrary keys, each parsed by `key`, and values parsed
/// by `value`.
#[derive(Clone, Debug)]
pub struct RecordDef {
    key: Schema,
    value: Schema,
}

impl SchemaDef for RecordDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Record
    }

    fn expected(&self) -> String {
        TypeTag::Object.to_string()
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        if input.is_object() {
            Ok(input)
        } else {
            Err(input)
        }
    }

    fn validate(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let input = match payload.take_value() {
            Value::Object(map) => map,
            other => {
                payload.push(RawIssue::invalid_type(self.expected(), &other));
                payload.value = other;
                return;
            }
        };

        let mut out = Map::new();
        for (key, value) in input {
            let segment = PathSegment::from(key.as_str());
            let raw_key = Value::String(key);
            let key_result = self.key.run(raw_key.clone(), ctx);
            if !key_result.issues.is_empty() {
                let issue = RawIssue::invalid_key("record", key_result.issues, &raw_key)
                    .with_path(vec![segment]);
                payload.push(issue);
                continue;
            }
            let key = match key_result.value {
                Value::String(s) => s,
                other => other.to_string(),
            };

            let value_result = self.value.run(value, ctx);
            if value_result.issues.is_empty() {
                out.insert(key, value_result.value);
            } else {
                payload.extend_prefixed(value_result.issues, &segment);
            }
        }
        payload.value = Value::Object(out);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn record(key: Schema, value: Schema) -> Schema {
    Schema::new(RecordDef { key, value })
}
