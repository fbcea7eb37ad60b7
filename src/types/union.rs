use crate::context::{ParseContext, ParsePayload};
use crate::issue::{received_type, PathSegment, RawIssue};
use crate::schema::{Schema, SchemaDef, SchemaError};
use crate::tag::TypeTag;
use crate::types::{EnumDef, LiteralDef, ObjectDef};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use tracing::trace;

/// Tries every option against the same input.
///
/// In the inclusive mode the first success whose output kind matches the
/// input's is preferred, then the first success. In the exclusive mode
/// exactly one option must succeed.
#[derive(Clone, Debug)]
pub struct UnionDef {
    options: Vec<Schema>,
    exclusive: bool,
}

impl UnionDef {
    pub fn options(&self) -> &[Schema] {
        &self.options
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }
}

impl SchemaDef for UnionDef {
    fn type_tag(&self) -> TypeTag {
        if self.exclusive {
            TypeTag::Xor
        } else {
            TypeTag::Union
        }
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Ok(input)
    }

    fn validate(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let input = payload.take_value();
        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for (index, option) in self.options.iter().enumerate() {
            let result = option.run(input.clone(), ctx);
            if !result.issues.is_empty() {
                failures.push(result.issues);
                continue;
            }
            if !self.exclusive && received_type(&result.value) == received_type(&input) {
                trace!(option = index, "union matched");
                payload.value = result.value;
                return;
            }
            successes.push(result.value);
        }

        match (self.exclusive, successes.len()) {
            (_, 0) => {
                payload.push(RawIssue::invalid_union(failures, &input));
                payload.value = input;
            }
            (true, 1) | (false, _) => {
                payload.value = successes.swap_remove(0);
            }
            (true, matched) => {
                payload.push(RawIssue::invalid_xor(matched, &input));
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

/// Succeeds when any option does.
pub fn union(options: Vec<Schema>) -> Schema {
    Schema::new(UnionDef {
        options,
        exclusive: false,
    })
}

/// Succeeds when exactly one option does.
pub fn xor(options: Vec<Schema>) -> Schema {
    Schema::new(UnionDef {
        options,
        exclusive: true,
    })
}

/// A union of object schemas selected by the value of one key. Each
/// option must declare that key as a literal or an enum.
#[derive(Clone, Debug)]
pub struct DiscriminatedUnionDef {
    key: String,
    options: Vec<Schema>,
    mapping: BTreeMap<String, usize>,
}

impl DiscriminatedUnionDef {
    pub fn discriminator(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> &[Schema] {
        &self.options
    }
}

fn discriminator_values(option: &Schema, key: &str) -> Option<Vec<Value>> {
    let field = option.downcast_def::<ObjectDef>()?.shape().get(key)?;
    if let Some(literal) = field.downcast_def::<LiteralDef>() {
        return Some(literal.values().to_vec());
    }
    field
        .downcast_def::<EnumDef>()
        .map(|e| e.values().iter().cloned().map(Value::String).collect())
}

impl SchemaDef for DiscriminatedUnionDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Union
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
        let input = payload.take_value();
        let tag = match &input {
            Value::Object(map) => map.get(&self.key).cloned().unwrap_or(Value::Null),
            _ => {
                payload.push(RawIssue::invalid_type(self.expected(), &input));
                payload.value = input;
                return;
            }
        };

        match self.mapping.get(&tag.to_string()) {
            Some(&index) => {
                let result = self.options[index].run(input, ctx);
                payload.value = result.value;
                payload.issues.extend(result.issues);
            }
            None => {
                let mut issue = RawIssue::invalid_union(Vec::new(), &input)
                    .with_path(vec![PathSegment::from(self.key.as_str())]);
                issue.properties.discriminator = Some(self.key.clone());
                issue.properties.note = Some("No matching discriminator".to_owned());
                payload.push(issue);
                payload.value = input;
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds a discriminated union over object `options`.
///
/// ```
/// use serde_json::json;
/// use vetted::{discriminated_union, int, literal, object, string};
///
/// let shape = discriminated_union(
///     "kind",
///     vec![
///         object(vec![("kind", literal("circle")), ("radius", int())]),
///         object(vec![("kind", literal("label")), ("text", string())]),
///     ],
/// )
/// .unwrap();
/// assert!(shape.parse(&json!({"kind": "circle", "radius": 2})).is_ok());
/// assert!(shape.parse(&json!({"kind": "square"})).is_err());
/// ```
pub fn discriminated_union(
    key: impl Into<String>,
    options: Vec<Schema>,
) -> Result<Schema, SchemaError> {
    let key = key.into();
    let mut mapping = BTreeMap::new();

    for (index, option) in options.iter().enumerate() {
        if option.downcast_def::<ObjectDef>().is_none() {
            return Err(SchemaError::NotAnObject(option.type_tag()));
        }
        let values = discriminator_values(option, &key).ok_or_else(|| {
            SchemaError::MissingDiscriminator {
                index,
                key: key.clone(),
            }
        })?;
        for value in values {
            let encoded = value.to_string();
            if mapping.insert(encoded.clone(), index).is_some() {
                return Err(SchemaError::DuplicateDiscriminator(encoded));
            }
        }
    }

    Ok(Schema::new(DiscriminatedUnionDef {
        key,
        options,
        mapping,
    }))
}
