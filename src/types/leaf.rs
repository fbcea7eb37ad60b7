use crate::context::{ParseContext, ParsePayload, RefinementContext};
use crate::issue::RawIssue;
use crate::schema::{Schema, SchemaDef};
use crate::tag::TypeTag;
use serde_json::Value;
use std::any::Any;

const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

/// Runs `extract` and reports `invalid_type` on failure. Returns whether
/// extraction succeeded.
fn extract_into<D: SchemaDef + ?Sized>(def: &D, payload: &mut ParsePayload) -> bool {
    match def.extract(payload.take_value()) {
        Ok(value) => {
            payload.value = value;
            true
        }
        Err(value) => {
            payload.push(RawIssue::invalid_type(def.expected(), &value));
            payload.value = value;
            false
        }
    }
}

fn check_range(payload: &mut ParsePayload, min: f64, max: f64) {
    if let Some(n) = payload.value.as_f64() {
        if n < min {
            payload.push(RawIssue::too_small("number", min, true, &payload.value));
        } else if n > max {
            payload.push(RawIssue::too_big("number", max, true, &payload.value));
        }
    }
}

fn finite(n: f64) -> Option<Value> {
    if n.is_finite() {
        Some(Value::from(n))
    } else {
        None
    }
}

#[derive(Clone, Debug, Default)]
pub struct StringDef;

impl SchemaDef for StringDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::String
    }

    fn coerce(&self, input: &Value) -> Option<Value> {
        match input {
            Value::String(_) => Some(input.clone()),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        }
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        if input.is_string() {
            Ok(input)
        } else {
            Err(input)
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn string() -> Schema {
    Schema::new(StringDef)
}

#[derive(Clone, Debug)]
pub struct NumberDef {
    tag: TypeTag,
}

impl SchemaDef for NumberDef {
    fn type_tag(&self) -> TypeTag {
        self.tag
    }

    fn expected(&self) -> String {
        "number".to_owned()
    }

    fn coerce(&self, input: &Value) -> Option<Value> {
        match input {
            Value::Number(_) => Some(input.clone()),
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(finite),
            Value::Bool(b) => Some(Value::from(if *b { 1 } else { 0 })),
            _ => None,
        }
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        if input.is_number() {
            Ok(input)
        } else {
            Err(input)
        }
    }

    fn validate(&self, payload: &mut ParsePayload, _ctx: &ParseContext) {
        if extract_into(self, payload) && self.tag == TypeTag::Float32 {
            check_range(payload, f32::MIN as f64, f32::MAX as f64);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A float64.
pub fn number() -> Schema {
    Schema::new(NumberDef {
        tag: TypeTag::Float64,
    })
}

pub fn float32() -> Schema {
    Schema::new(NumberDef {
        tag: TypeTag::Float32,
    })
}

/// A whole number within `[min, max]`. Fractional input is a type error;
/// out-of-range input is `too_small` / `too_big`.
#[derive(Clone, Debug)]
pub struct IntDef {
    tag: TypeTag,
    min: f64,
    max: f64,
}

impl IntDef {
    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl SchemaDef for IntDef {
    fn type_tag(&self) -> TypeTag {
        self.tag
    }

    fn coerce(&self, input: &Value) -> Option<Value> {
        match input {
            Value::Number(_) => Some(input.clone()),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Value::from)
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(finite))
            }
            Value::Bool(b) => Some(Value::from(if *b { 1 } else { 0 })),
            _ => None,
        }
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        match &input {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(input),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                    Ok(Value::from(f as i64))
                }
                _ => Err(input),
            },
            _ => Err(input),
        }
    }

    fn validate(&self, payload: &mut ParsePayload, _ctx: &ParseContext) {
        if extract_into(self, payload) {
            check_range(payload, self.min, self.max);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn int_schema(tag: TypeTag, min: f64, max: f64) -> Schema {
    Schema::new(IntDef { tag, min, max })
}

/// A safe integer, within `±(2^53 - 1)`.
pub fn int() -> Schema {
    int_schema(TypeTag::Int, -MAX_SAFE_INTEGER, MAX_SAFE_INTEGER)
}

pub fn int8() -> Schema {
    int_schema(TypeTag::Int8, -128.0, 127.0)
}

pub fn uint8() -> Schema {
    int_schema(TypeTag::Uint8, 0.0, 255.0)
}

pub fn int16() -> Schema {
    int_schema(TypeTag::Int16, -32768.0, 32767.0)
}

pub fn uint16() -> Schema {
    int_schema(TypeTag::Uint16, 0.0, 65535.0)
}

pub fn int32() -> Schema {
    int_schema(TypeTag::Int32, -2147483648.0, 2147483647.0)
}

pub fn uint32() -> Schema {
    int_schema(TypeTag::Uint32, 0.0, 4294967295.0)
}

#[derive(Clone, Debug, Default)]
pub struct BoolDef;

impl SchemaDef for BoolDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Bool
    }

    fn coerce(&self, input: &Value) -> Option<Value> {
        let truthy = match input {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        };
        Some(Value::Bool(truthy))
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        if input.is_boolean() {
            Ok(input)
        } else {
            Err(input)
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn boolean() -> Schema {
    Schema::new(BoolDef)
}

#[derive(Clone, Debug, Default)]
pub struct NullDef;

impl SchemaDef for NullDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Null
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        if input.is_null() {
            Ok(input)
        } else {
            Err(input)
        }
    }

    fn passes_nil(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn null() -> Schema {
    Schema::new(NullDef)
}

/// Accepts every value, nil included. Backs both `any` and `unknown`.
#[derive(Clone, Debug)]
pub struct AnyDef {
    tag: TypeTag,
}

impl SchemaDef for AnyDef {
    fn type_tag(&self) -> TypeTag {
        self.tag
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Ok(input)
    }

    fn passes_nil(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn any() -> Schema {
    Schema::new(AnyDef { tag: TypeTag::Any })
}

pub fn unknown() -> Schema {
    Schema::new(AnyDef {
        tag: TypeTag::Unknown,
    })
}

#[derive(Clone, Debug, Default)]
pub struct NeverDef;

impl SchemaDef for NeverDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Never
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Err(input)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn never() -> Schema {
    Schema::new(NeverDef)
}

/// The escape hatch: every input, nil included, reaches the attached
/// predicate unchanged.
#[derive(Clone, Debug, Default)]
pub struct CustomDef;

impl SchemaDef for CustomDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Custom
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Ok(input)
    }

    fn passes_nil(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn custom<F>(predicate: F) -> Schema
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Schema::new(CustomDef).refine(predicate)
}

/// A custom schema driven by a callback that reports its own issues.
pub fn custom_check<F>(f: F) -> Schema
where
    F: Fn(&Value, &mut RefinementContext<'_>) + Send + Sync + 'static,
{
    Schema::new(CustomDef).super_refine(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueCode;
    use serde_json::json;

    fn first_code(schema: &Schema, input: Value) -> IssueCode {
        schema.parse(&input).unwrap_err().issues()[0].code
    }

    #[test]
    fn strings() {
        assert_eq!(json!("a"), string().parse(&json!("a")).unwrap());
        assert_eq!(IssueCode::InvalidType, first_code(&string(), json!(1)));
        assert_eq!(json!("1"), string().coerce().parse(&json!(1)).unwrap());
        assert_eq!(json!("true"), string().coerce().parse(&json!(true)).unwrap());
        assert_eq!(IssueCode::InvalidType, first_code(&string().coerce(), json!([1])));
    }

    #[test]
    fn integers_reject_fractions() {
        assert_eq!(json!(3), int().parse(&json!(3.0)).unwrap());
        assert_eq!(IssueCode::InvalidType, first_code(&int(), json!(3.5)));
        assert_eq!(IssueCode::InvalidType, first_code(&int(), json!("3")));
    }

    #[test]
    fn sized_integers_enforce_range() {
        assert_eq!(json!(255), uint8().parse(&json!(255)).unwrap());
        assert_eq!(IssueCode::TooBig, first_code(&uint8(), json!(256)));
        assert_eq!(IssueCode::TooSmall, first_code(&uint8(), json!(-1)));
        assert_eq!(IssueCode::TooSmall, first_code(&int8(), json!(-129)));
        assert_eq!(IssueCode::TooBig, first_code(&int32(), json!(2147483648_i64)));
        assert_eq!(json!(4294967295_u32), uint32().parse(&json!(4294967295_u32)).unwrap());
        assert_eq!(IssueCode::TooBig, first_code(&uint32(), json!(4294967296_i64)));

        let err = uint8().parse(&json!(300)).unwrap_err();
        assert_eq!(Some(255.0), err.issues()[0].maximum());
        assert_eq!(Some("number"), err.issues()[0].origin.as_deref());
    }

    #[test]
    fn int_coercion() {
        assert_eq!(json!(42), int().coerce().parse(&json!(" 42 ")).unwrap());
        assert_eq!(json!(1), int().coerce().parse(&json!(true)).unwrap());
        assert_eq!(IssueCode::InvalidType, first_code(&int().coerce(), json!("4.5")));
    }

    #[test]
    fn float32_range() {
        assert_eq!(IssueCode::TooBig, first_code(&float32(), json!(1e39)));
        assert_eq!(json!(1.5), float32().parse(&json!(1.5)).unwrap());
    }

    #[test]
    fn boolean_coercion_uses_truthiness() {
        let s = boolean().coerce();
        assert_eq!(json!(false), s.parse(&json!(0)).unwrap());
        assert_eq!(json!(false), s.parse(&json!("")).unwrap());
        assert_eq!(json!(true), s.parse(&json!("no")).unwrap());
        assert_eq!(json!(true), s.parse(&json!({})).unwrap());
    }

    #[test]
    fn null_any_unknown_accept_nil() {
        assert_eq!(json!(null), null().parse(&json!(null)).unwrap());
        assert_eq!(IssueCode::InvalidType, first_code(&null(), json!(0)));
        assert_eq!(json!(null), any().parse(&json!(null)).unwrap());
        assert_eq!(json!([1]), unknown().parse(&json!([1])).unwrap());
    }

    #[test]
    fn never_rejects_everything() {
        assert_eq!(IssueCode::InvalidType, first_code(&never(), json!(1)));
        assert_eq!(IssueCode::InvalidType, first_code(&never(), json!(null)));
    }

    #[test]
    fn custom_runs_predicate_on_raw_input() {
        let even = custom(|v| v.as_i64().map_or(false, |n| n % 2 == 0));
        assert_eq!(json!(4), even.parse(&json!(4)).unwrap());
        assert_eq!(IssueCode::Custom, first_code(&even, json!(3)));
        assert_eq!(IssueCode::Custom, first_code(&even, json!(null)));
    }

    #[test]
    fn custom_check_reports_structured_issues() {
        let pair = custom_check(|value, ctx| {
            if value.get("a") != value.get("b") {
                let issue = RawIssue::custom(value)
                    .with_path(vec!["b".into()])
                    .with_message("must match a");
                ctx.add_issue(issue);
            }
        });
        assert!(pair.parse(&json!({"a": 1, "b": 1})).is_ok());

        let err = pair.parse(&json!({"a": 1, "b": 2})).unwrap_err();
        assert_eq!("b: must match a", err.to_string());
    }
}
