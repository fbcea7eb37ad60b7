use crate::context::{ParseContext, ParsePayload};
use crate::issue::RawIssue;
use crate::schema::{Schema, SchemaDef};
use crate::tag::TypeTag;
use serde_json::Value;
use std::any::Any;

/// Parses the input with both sides and deep-merges the two outputs.
#[derive(Clone, Debug)]
pub struct IntersectionDef {
    left: Schema,
    right: Schema,
}

/// Merges two parse outputs: equal values merge to themselves, objects
/// merge key by key, and arrays of equal length merge element-wise.
fn merge_values(left: Value, right: Value) -> Option<Value> {
    if left == right {
        return Some(left);
    }
    match (left, right) {
        (Value::Object(mut left), Value::Object(right)) => {
            for (key, theirs) in right {
                let merged = match left.remove(&key) {
                    Some(ours) => merge_values(ours, theirs)?,
                    None => theirs,
                };
                left.insert(key, merged);
            }
            Some(Value::Object(left))
        }
        (Value::Array(left), Value::Array(right)) if left.len() == right.len() => left
            .into_iter()
            .zip(right)
            .map(|(a, b)| merge_values(a, b))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        _ => None,
    }
}

impl SchemaDef for IntersectionDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Intersection
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Ok(input)
    }

    fn validate(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let input = payload.take_value();
        let left = self.left.run(input.clone(), ctx);
        let right = self.right.run(input.clone(), ctx);

        if !left.issues.is_empty() || !right.issues.is_empty() {
            payload.issues.extend(left.issues);
            payload.issues.extend(right.issues);
            payload.value = input;
            return;
        }

        match merge_values(left.value, right.value) {
            Some(merged) => payload.value = merged,
            None => {
                payload.push(RawIssue::custom(&input).with_message("Unmergeable intersection"));
                payload.value = input;
            }
        }
    }

    fn passes_nil(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn intersection(left: &Schema, right: &Schema) -> Schema {
    Schema::new(IntersectionDef {
        left: left.clone(),
        right: right.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::merge_values;
    use crate::*;
    use serde_json::json;

    #[test]
    fn merges_object_outputs() {
        let s = object(vec![("a", string())]).and(&object(vec![("b", int())]));
        assert_eq!(
            json!({"a": "x", "b": 1}),
            s.parse(&json!({"a": "x", "b": 1, "c": true})).unwrap()
        );
    }

    #[test]
    fn both_sides_report() {
        let s = object(vec![("a", string())]).and(&object(vec![("b", int())]));
        let err = s.parse(&json!({})).unwrap_err();
        assert_eq!(2, err.issues().len());
    }

    #[test]
    fn conflicting_outputs_fail() {
        assert_eq!(None, merge_values(json!(1), json!(2)));
        assert_eq!(None, merge_values(json!([1]), json!([1, 2])));
        assert_eq!(
            Some(json!({"a": {"x": 1, "y": 2}})),
            merge_values(json!({"a": {"x": 1}}), json!({"a": {"y": 2}}))
        );

        let s = string().and(&string().to_uppercase());
        let err = s.parse(&json!("a")).unwrap_err();
        assert_eq!("Unmergeable intersection", err.issues()[0].message);
    }
}
