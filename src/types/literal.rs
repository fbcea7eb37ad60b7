use crate::context::{ParseContext, ParsePayload};
use crate::issue::RawIssue;
use crate::schema::{Schema, SchemaDef};
use crate::tag::TypeTag;
use serde_json::Value;
use std::any::Any;

/// Accepts only values equal to one of `values`.
#[derive(Clone, Debug)]
pub struct LiteralDef {
    values: Vec<Value>,
}

impl LiteralDef {
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl SchemaDef for LiteralDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Literal
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        if self.values.contains(&input) {
            Ok(input)
        } else {
            Err(input)
        }
    }

    fn validate(&self, payload: &mut ParsePayload, _ctx: &ParseContext) {
        if !self.values.contains(&payload.value) {
            let issue = RawIssue::invalid_value(self.values.clone(), &payload.value);
            payload.push(issue);
        }
    }

    fn passes_nil(&self) -> bool {
        self.values.contains(&Value::Null)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn literal(value: impl Into<Value>) -> Schema {
    Schema::new(LiteralDef {
        values: vec![value.into()],
    })
}

pub fn literals<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Schema {
    Schema::new(LiteralDef {
        values: values.into_iter().map(Into::into).collect(),
    })
}

/// A closed set of string names.
#[derive(Clone, Debug)]
pub struct EnumDef {
    values: Vec<String>,
}

impl EnumDef {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn options(&self) -> Vec<Value> {
        self.values.iter().cloned().map(Value::String).collect()
    }
}

impl SchemaDef for EnumDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Enum
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        match &input {
            Value::String(s) if self.values.contains(s) => Ok(input),
            _ => Err(input),
        }
    }

    fn validate(&self, payload: &mut ParsePayload, _ctx: &ParseContext) {
        let known = payload
            .value
            .as_str()
            .map_or(false, |s| self.values.iter().any(|v| v == s));
        if !known {
            let issue = RawIssue::invalid_value(self.options(), &payload.value);
            payload.push(issue);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn enum_<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Schema {
    Schema::new(EnumDef {
        values: values.into_iter().map(Into::into).collect(),
    })
}
