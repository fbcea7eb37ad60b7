use crate::check::Check;
use crate::context::{ParseContext, ParsePayload, RefinementContext};
use crate::engine;
use crate::internals::{BoxError, ErrorCustomizer, Fallback, Internals, Params};
use crate::issue::{ParseError, RawIssue};
use crate::registry::{self, Meta};
use crate::tag::TypeTag;
use crate::types;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// The contract every schema kind fulfils so the engine can drive it.
///
/// Leaves only need `type_tag`, `extract` and `as_any`; the default
/// `validate` turns a failed extraction into an `invalid_type` issue.
/// Composites override `validate` to parse their children.
pub trait SchemaDef: fmt::Debug + Send + Sync + 'static {
    fn type_tag(&self) -> TypeTag;

    /// The `expected` name reported in `invalid_type` issues.
    fn expected(&self) -> String {
        self.type_tag().to_string()
    }

    /// Converts a foreign value into this kind's base type. Only consulted
    /// when the schema has the coerce flag.
    fn coerce(&self, input: &Value) -> Option<Value> {
        let _ = input;
        None
    }

    /// Returns the value as this kind's base type, or gives the input back
    /// if it is of the wrong type.
    fn extract(&self, input: Value) -> Result<Value, Value>;

    fn validate(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let _ = ctx;
        match self.extract(payload.take_value()) {
            Ok(value) => payload.value = value,
            Err(value) => {
                payload.push(RawIssue::invalid_type(self.expected(), &value));
                payload.value = value;
            }
        }
    }

    /// Runs after the checks, only when no issue has been raised.
    fn transform(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let _ = (payload, ctx);
    }

    /// Whether a nil input with no wrapper flags is handed to `validate`
    /// instead of being rejected by the engine.
    fn passes_nil(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Errors raised while building a schema.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("expected an object schema, found {0}")]
    NotAnObject(TypeTag),

    #[error("expected a tuple schema, found {0}")]
    NotATuple(TypeTag),

    #[error("pick cannot be used on object schemas containing refinements")]
    RefinedPick,

    #[error("omit cannot be used on object schemas containing refinements")]
    RefinedOmit,

    #[error("extend would overwrite key {0:?} on an object schema containing refinements; use safe_extend")]
    RefinedExtend(String),

    #[error("key {0:?} is not in the object shape")]
    UnknownKey(String),

    #[error("option {index} has no literal value for discriminator {key:?}")]
    MissingDiscriminator { index: usize, key: String },

    #[error("discriminator value {0} is claimed by more than one option")]
    DuplicateDiscriminator(String),
}

/// Identity of a schema. Handles cloned from one another share an identity;
/// every modifier produces a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

/// An immutable, composable description of a value.
#[derive(Clone)]
pub struct Schema {
    def: Arc<dyn SchemaDef>,
    internals: Arc<Internals>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("def", &self.def)
            .field("internals", &self.internals)
            .finish()
    }
}

impl Schema {
    pub fn new<D: SchemaDef>(def: D) -> Self {
        Self::from_parts(Arc::new(def), Internals::default())
    }

    pub(crate) fn from_parts(def: Arc<dyn SchemaDef>, internals: Internals) -> Self {
        Self {
            def,
            internals: Arc::new(internals),
        }
    }

    /// Builds a schema of the same kind around fresh internals.
    pub fn rebuild(&self, internals: Internals) -> Self {
        Self::from_parts(self.def.clone(), internals)
    }

    pub fn def(&self) -> &dyn SchemaDef {
        self.def.as_ref()
    }

    pub fn downcast_def<D: SchemaDef>(&self) -> Option<&D> {
        self.def.as_any().downcast_ref::<D>()
    }

    pub fn internals(&self) -> &Internals {
        &self.internals
    }

    pub(crate) fn internals_arc(&self) -> &Arc<Internals> {
        &self.internals
    }

    pub fn id(&self) -> SchemaId {
        SchemaId(Arc::as_ptr(&self.internals) as *const () as usize)
    }

    pub fn type_tag(&self) -> TypeTag {
        self.def.type_tag()
    }

    /// Whether parsing nil can succeed, through a wrapper flag, a stored
    /// default or prefault, or a kind that accepts nil itself.
    pub fn admits_nil(&self) -> bool {
        self.internals.admits_nil() || (!self.internals.nonoptional && self.def.passes_nil())
    }

    /// Builds a schema derived from this one, carrying over its global
    /// metadata.
    pub(crate) fn derive(&self, def: Arc<dyn SchemaDef>, internals: Internals) -> Self {
        let derived = Self::from_parts(def, internals);
        registry::global().inherit(self, &derived);
        derived
    }

    pub(crate) fn modify(&self, f: impl FnOnce(&mut Internals)) -> Self {
        let mut internals = (*self.internals).clone();
        f(&mut internals);
        self.derive(self.def.clone(), internals)
    }

    pub fn optional(&self) -> Self {
        self.modify(|i| {
            i.optional = true;
            i.nonoptional = false;
        })
    }

    /// Optional, but inside an object only an absent key is accepted: an
    /// explicit null is rejected.
    pub fn exact_optional(&self) -> Self {
        self.modify(|i| {
            i.optional = true;
            i.exact_optional = true;
            i.nonoptional = false;
        })
    }

    pub fn nilable(&self) -> Self {
        self.modify(|i| {
            i.nilable = true;
            i.nonoptional = false;
        })
    }

    pub fn nullish(&self) -> Self {
        self.modify(|i| {
            i.optional = true;
            i.nilable = true;
            i.nonoptional = false;
        })
    }

    pub fn nonoptional(&self) -> Self {
        self.modify(|i| {
            i.nonoptional = true;
            i.optional = false;
            i.nilable = false;
            i.exact_optional = false;
        })
    }

    /// A value returned as-is for nil input, without validation.
    pub fn default(&self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.modify(|i| i.default = Some(Fallback::Value(value)))
    }

    pub fn default_with<F>(&self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.modify(|i| i.default = Some(Fallback::Func(Arc::new(f))))
    }

    /// A value substituted for nil input, or for input that fails to parse,
    /// and then parsed like any other. Substitution happens at most once.
    pub fn prefault(&self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.modify(|i| i.prefault = Some(Fallback::Value(value)))
    }

    pub fn prefault_with<F>(&self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.modify(|i| i.prefault = Some(Fallback::Func(Arc::new(f))))
    }

    pub fn coerce(&self) -> Self {
        self.modify(|i| i.coerce = true)
    }

    pub fn error(&self, error: impl Into<ErrorCustomizer>) -> Self {
        let error = error.into();
        self.modify(|i| i.error = Some(error))
    }

    /// Applies the schema-level parts of `params`: error customizer, coerce
    /// flag and description. `abort` and `path` only apply to checks.
    pub fn with_params(&self, params: Params) -> Self {
        let schema = self.modify(|i| {
            if params.error.is_some() {
                i.error = params.error.clone();
            }
            i.coerce = i.coerce || params.coerce;
        });
        match params.description {
            Some(description) => schema.describe(description),
            None => schema,
        }
    }

    pub fn check(&self, check: Check) -> Self {
        self.modify(|i| i.push_check(check))
    }

    pub fn refine<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.check(Check::refine(predicate))
    }

    pub fn refine_with<F>(&self, predicate: F, params: impl Into<Params>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.check(Check::refine(predicate).with_params(params.into()))
    }

    pub fn refine_typed<T, F>(&self, predicate: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.check(Check::refine_typed(predicate))
    }

    pub fn super_refine<F>(&self, f: F) -> Self
    where
        F: Fn(&Value, &mut RefinementContext<'_>) + Send + Sync + 'static,
    {
        self.check(Check::super_refine(f))
    }

    pub fn overwrite<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.check(Check::overwrite(f))
    }

    /// Lower bound: a value for numbers, a key count for objects and
    /// records, a length for strings and arrays.
    pub fn min(&self, n: impl Into<f64>) -> Self {
        let n = n.into();
        let tag = self.type_tag();
        if tag.is_numeric() {
            self.check(Check::gte(n))
        } else if tag.is_keyed() {
            self.check(Check::min_size(to_len(n)))
        } else {
            self.check(Check::min_length(to_len(n)))
        }
    }

    pub fn max(&self, n: impl Into<f64>) -> Self {
        let n = n.into();
        let tag = self.type_tag();
        if tag.is_numeric() {
            self.check(Check::lte(n))
        } else if tag.is_keyed() {
            self.check(Check::max_size(to_len(n)))
        } else {
            self.check(Check::max_length(to_len(n)))
        }
    }

    pub fn length(&self, n: usize) -> Self {
        if self.type_tag().is_keyed() {
            self.check(Check::size(n))
        } else {
            self.check(Check::length(n))
        }
    }

    pub fn nonempty(&self) -> Self {
        self.min(1)
    }

    pub fn gt(&self, n: impl Into<f64>) -> Self {
        self.check(Check::gt(n))
    }

    pub fn gte(&self, n: impl Into<f64>) -> Self {
        self.check(Check::gte(n))
    }

    pub fn lt(&self, n: impl Into<f64>) -> Self {
        self.check(Check::lt(n))
    }

    pub fn lte(&self, n: impl Into<f64>) -> Self {
        self.check(Check::lte(n))
    }

    pub fn positive(&self) -> Self {
        self.gt(0)
    }

    pub fn negative(&self) -> Self {
        self.lt(0)
    }

    pub fn nonnegative(&self) -> Self {
        self.gte(0)
    }

    pub fn nonpositive(&self) -> Self {
        self.lte(0)
    }

    pub fn multiple_of(&self, step: impl Into<f64>) -> Self {
        self.check(Check::multiple_of(step))
    }

    pub fn regex(&self, regex: Regex) -> Self {
        self.check(Check::regex(regex))
    }

    pub fn email(&self) -> Self {
        self.check(Check::email())
    }

    pub fn uuid(&self) -> Self {
        self.check(Check::uuid())
    }

    pub fn url(&self) -> Self {
        self.check(Check::url())
    }

    pub fn datetime(&self) -> Self {
        self.check(Check::datetime())
    }

    pub fn starts_with(&self, prefix: impl Into<String>) -> Self {
        self.check(Check::starts_with(prefix))
    }

    pub fn ends_with(&self, suffix: impl Into<String>) -> Self {
        self.check(Check::ends_with(suffix))
    }

    pub fn includes(&self, needle: impl Into<String>) -> Self {
        self.check(Check::includes(needle))
    }

    pub fn trim(&self) -> Self {
        self.overwrite(|value| map_str(value, |s| s.trim().to_owned()))
    }

    pub fn to_lowercase(&self) -> Self {
        self.overwrite(|value| map_str(value, str::to_lowercase))
    }

    pub fn to_uppercase(&self) -> Self {
        self.overwrite(|value| map_str(value, str::to_uppercase))
    }

    pub fn mime<S: Into<String>>(&self, types: Vec<S>) -> Self {
        self.check(Check::mime(types))
    }

    pub fn property(&self, name: impl Into<String>, schema: &Schema) -> Self {
        self.check(Check::property(name, schema.clone()))
    }

    /// Intersection with `other`.
    pub fn and(&self, other: &Schema) -> Schema {
        types::intersection(self, other)
    }

    /// Union with `other`.
    pub fn or(&self, other: &Schema) -> Schema {
        types::union(vec![self.clone(), other.clone()])
    }

    pub fn pipe(&self, out: &Schema) -> Schema {
        types::pipe(self, out)
    }

    /// Pipes the parsed value through `f`. Issues pushed on the context, or
    /// an `Err` return, fail the parse.
    pub fn transform<F>(&self, f: F) -> Schema
    where
        F: Fn(Value, &mut RefinementContext<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        types::pipe(self, &types::transform(f))
    }

    /// Returns a copy of this schema registered with `meta` in the global
    /// registry.
    pub fn meta(&self, meta: Meta) -> Self {
        let schema = self.modify(|_| {});
        registry::global().add(&schema, meta);
        schema
    }

    pub fn describe(&self, description: impl Into<String>) -> Self {
        let mut meta = self.metadata().unwrap_or_default();
        meta.description = Some(description.into());
        self.meta(meta)
    }

    pub fn metadata(&self) -> Option<Meta> {
        registry::global().get(self)
    }

    pub fn description(&self) -> Option<String> {
        self.metadata().and_then(|meta| meta.description)
    }

    pub fn parse(&self, input: &Value) -> Result<Value, ParseError> {
        self.parse_with(input, &ParseContext::new())
    }

    pub fn parse_with(&self, input: &Value, ctx: &ParseContext) -> Result<Value, ParseError> {
        let result = engine::finish(self.run(input.clone(), ctx), ctx);
        if let Err(err) = &result {
            debug!(
                kind = %self.type_tag(),
                issue_count = err.issues().len(),
                paths = ?err.by_path().keys().collect::<Vec<_>>(),
                "parse failed"
            );
        }
        result
    }

    /// Parses or panics with the error's message.
    pub fn must_parse(&self, input: &Value) -> Value {
        match self.parse(input) {
            Ok(value) => value,
            Err(err) => panic!("{}", err),
        }
    }

    /// Parses any serializable value. Struct fields are read through serde,
    /// so `#[serde(rename)]` attributes apply.
    pub fn parse_from<T: Serialize + ?Sized>(&self, input: &T) -> Result<Value, ParseError> {
        let ctx = ParseContext::new();
        match serde_json::to_value(input) {
            Ok(value) => self.parse_with(&value, &ctx),
            Err(err) => {
                let issue = RawIssue::invalid_type(self.def.expected(), &Value::Null)
                    .with_message(format!("Invalid input: {}", err))
                    .with_inst(self);
                Err(engine::into_error(vec![issue], &ctx))
            }
        }
    }

    pub fn parse_into<T: DeserializeOwned>(&self, input: &Value) -> Result<T, ParseError> {
        self.parse_into_with(input, &ParseContext::new())
    }

    /// Parses, then converts the output into `T`. Output that does not
    /// deserialize into `T` is reported as `invalid_type`.
    pub fn parse_into_with<T: DeserializeOwned>(
        &self,
        input: &Value,
        ctx: &ParseContext,
    ) -> Result<T, ParseError> {
        let value = self.parse_with(input, ctx)?;
        match serde_json::from_value::<T>(value.clone()) {
            Ok(typed) => Ok(typed),
            Err(_) => {
                let issue = RawIssue::invalid_type(std::any::type_name::<T>(), &value)
                    .with_inst(self);
                Err(engine::into_error(vec![issue], ctx))
            }
        }
    }

    pub(crate) fn run(&self, input: Value, ctx: &ParseContext) -> ParsePayload {
        engine::run(self, input, ctx)
    }
}

fn to_len(n: f64) -> usize {
    if n <= 0.0 {
        0
    } else {
        n as usize
    }
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use serde_json::json;

    #[test]
    fn modifiers_leave_the_original_untouched() {
        let base = string();
        let before = base.id();
        let optional = base.optional();
        let refined = base.min(3);

        assert_eq!(before, base.id());
        assert!(!base.internals().is_optional());
        assert!(base.internals().checks().is_empty());
        assert!(optional.internals().is_optional());
        assert_eq!(1, refined.internals().checks().len());
        assert_ne!(base.id(), optional.id());
    }

    #[test]
    fn clones_share_identity() {
        let s = int();
        assert_eq!(s.id(), s.clone().id());
    }

    #[test]
    fn optional_and_nonoptional_are_exclusive() {
        let s = string().optional().nonoptional();
        assert!(!s.internals().is_optional());
        assert!(s.internals().is_nonoptional());

        let s = s.optional();
        assert!(s.internals().is_optional());
        assert!(!s.internals().is_nonoptional());
    }

    #[test]
    fn min_dispatches_on_kind() {
        assert_eq!("gte", number().min(1).internals().checks()[0].name());
        assert_eq!("min_length", string().min(1).internals().checks()[0].name());
        assert_eq!(
            "min_size",
            object(Vec::<(&str, Schema)>::new()).min(1).internals().checks()[0].name()
        );
    }

    #[test]
    fn bag_records_bounds() {
        let s = string().min(2).max(5).regex(regex::Regex::new("^a").unwrap());
        assert_eq!(Some(&json!(2)), s.internals().bag().get("minimum"));
        assert_eq!(Some(&json!(5)), s.internals().bag().get("maximum"));
        assert_eq!(Some(&json!(["^a"])), s.internals().bag().get("patterns"));
    }

    #[test]
    fn rebuild_keeps_kind() {
        let s = int();
        let rebuilt = s.rebuild(Internals::default());
        assert_eq!(TypeTag::Int, rebuilt.type_tag());
        assert_ne!(s.id(), rebuilt.id());
    }

    #[test]
    fn overwrites_on_strings() {
        assert_eq!(
            json!("hello"),
            string().trim().to_lowercase().parse(&json!("  HeLLo ")).unwrap()
        );
    }

    #[test]
    fn parse_from_uses_serde_names() {
        #[derive(serde::Serialize)]
        struct User {
            #[serde(rename = "userName")]
            user_name: String,
        }

        let schema = object(vec![("userName", string().min(1))]);
        let out = schema
            .parse_from(&User {
                user_name: "ada".to_owned(),
            })
            .unwrap();
        assert_eq!(json!({"userName": "ada"}), out);
    }

    #[test]
    fn parse_into_converts_to_caller_type() {
        let n: i64 = int().parse_into(&json!(5)).unwrap();
        assert_eq!(5, n);

        let absent: Option<String> = string().optional().parse_into(&json!(null)).unwrap();
        assert_eq!(None, absent);

        let err = number().parse_into::<u8>(&json!(1.5)).unwrap_err();
        assert_eq!(IssueCode::InvalidType, err.issues()[0].code);
        assert_eq!(Some("u8"), err.issues()[0].expected());
    }

    #[test]
    #[should_panic(expected = "Invalid input: expected string, received number")]
    fn must_parse_panics() {
        string().must_parse(&json!(1));
    }

    #[test]
    fn with_params_sets_error_and_description() {
        let s = string().with_params(Params::new().error("text please").description("a name"));
        assert_eq!(Some("a name".to_owned()), s.description());
        let err = s.parse(&json!(1)).unwrap_err();
        assert_eq!("text please", err.issues()[0].message);
    }
}
