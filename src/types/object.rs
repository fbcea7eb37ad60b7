use crate::context::{ParseContext, ParsePayload};
use crate::issue::{PathSegment, RawIssue};
use crate::schema::{Schema, SchemaDef, SchemaError};
use crate::tag::TypeTag;
use crate::types::enum_;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

/// What an object does with keys that are not in its shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownKeys {
    /// Report them as a single `unrecognized_keys` issue.
    Strict,
    /// Drop them from the output.
    #[default]
    Strip,
    /// Copy them to the output, through the catchall if one is set.
    Passthrough,
}

#[derive(Clone, Debug, Default)]
pub struct ObjectDef {
    shape: IndexMap<String, Schema>,
    catchall: Option<Schema>,
    unknown_keys: UnknownKeys,
    partial: bool,
    partial_exceptions: BTreeSet<String>,
}

impl ObjectDef {
    pub fn shape(&self) -> &IndexMap<String, Schema> {
        &self.shape
    }

    pub fn catchall(&self) -> Option<&Schema> {
        self.catchall.as_ref()
    }

    pub fn unknown_keys(&self) -> UnknownKeys {
        self.unknown_keys
    }

    fn is_partial_field(&self, name: &str) -> bool {
        self.partial && !self.partial_exceptions.contains(name)
    }

    fn parse_field(
        &self,
        name: &str,
        child: &Schema,
        input: &Map<String, Value>,
        out: &mut Map<String, Value>,
        payload: &mut ParsePayload,
        ctx: &ParseContext,
    ) {
        let segment = PathSegment::from(name);
        let value = match input.get(name) {
            Some(value) => value,
            None => {
                let internals = child.internals();
                if self.is_partial_field(name)
                    && internals.default_value().is_none()
                    && internals.prefault_value().is_none()
                {
                    return;
                }
                if internals.admits_absence() {
                    let result = child.run(Value::Null, ctx);
                    if result.issues.is_empty() {
                        if !result.value.is_null() {
                            out.insert(name.to_owned(), result.value);
                        }
                    } else {
                        payload.extend_prefixed(result.issues, &segment);
                    }
                    return;
                }
                let issue = RawIssue::invalid_type("nonoptional", &Value::Null)
                    .with_path(vec![segment])
                    .with_inst(child);
                payload.push(issue);
                return;
            }
        };

        if value.is_null() && child.internals().is_exact_optional() {
            let issue = RawIssue::invalid_type(child.def().expected(), value)
                .with_path(vec![segment])
                .with_inst(child);
            payload.push(issue);
            return;
        }
        if value.is_null() && self.is_partial_field(name) && !child.admits_nil() {
            out.insert(name.to_owned(), Value::Null);
            return;
        }

        let result = child.run(value.clone(), ctx);
        if result.issues.is_empty() {
            out.insert(name.to_owned(), result.value);
        } else {
            payload.extend_prefixed(result.issues, &segment);
        }
    }
}

impl SchemaDef for ObjectDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Object
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
        for (name, child) in &self.shape {
            self.parse_field(name, child, &input, &mut out, payload, ctx);
        }

        let mut unrecognized = Vec::new();
        for (key, value) in &input {
            if self.shape.contains_key(key) {
                continue;
            }
            match (self.unknown_keys, &self.catchall) {
                (UnknownKeys::Strict, _) => unrecognized.push(key.clone()),
                (UnknownKeys::Strip, _) => {}
                (UnknownKeys::Passthrough, Some(catchall)) => {
                    let result = catchall.run(value.clone(), ctx);
                    if result.issues.is_empty() {
                        out.insert(key.clone(), result.value);
                    } else {
                        payload.extend_prefixed(result.issues, &PathSegment::from(key.as_str()));
                    }
                }
                (UnknownKeys::Passthrough, None) => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }

        if !unrecognized.is_empty() {
            let input = Value::Object(input);
            payload.push(RawIssue::unrecognized_keys(unrecognized, &input));
        }
        payload.value = Value::Object(out);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn shape_of<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> IndexMap<String, Schema> {
    fields
        .into_iter()
        .map(|(name, schema)| (name.into(), schema))
        .collect()
}

fn object_with<K: Into<String>>(
    fields: impl IntoIterator<Item = (K, Schema)>,
    unknown_keys: UnknownKeys,
) -> Schema {
    Schema::new(ObjectDef {
        shape: shape_of(fields),
        unknown_keys,
        ..ObjectDef::default()
    })
}

/// A keyed schema that strips unknown keys.
///
/// ```
/// use serde_json::json;
/// use vetted::{int, object, string};
///
/// let user = object(vec![("name", string()), ("age", int())]);
/// let out = user.parse(&json!({"name": "Ada", "age": 36, "admin": true})).unwrap();
/// assert_eq!(json!({"name": "Ada", "age": 36}), out);
/// ```
pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Schema {
    object_with(fields, UnknownKeys::Strip)
}

/// An object that rejects unknown keys.
pub fn strict_object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Schema {
    object_with(fields, UnknownKeys::Strict)
}

/// An object that keeps unknown keys.
pub fn loose_object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Schema {
    object_with(fields, UnknownKeys::Passthrough)
}

/// Shape modifiers. Each fails with [`SchemaError::NotAnObject`] on
/// anything but an object schema.
impl Schema {
    fn object_def(&self) -> Result<&ObjectDef, SchemaError> {
        self.downcast_def::<ObjectDef>()
            .ok_or(SchemaError::NotAnObject(self.type_tag()))
    }

    fn with_object_def(&self, f: impl FnOnce(&mut ObjectDef)) -> Result<Schema, SchemaError> {
        let mut def = self.object_def()?.clone();
        f(&mut def);
        Ok(self.derive(Arc::new(def), self.internals().clone()))
    }

    pub fn shape(&self) -> Result<&IndexMap<String, Schema>, SchemaError> {
        Ok(self.object_def()?.shape())
    }

    pub fn strict(&self) -> Result<Schema, SchemaError> {
        self.with_object_def(|def| {
            def.unknown_keys = UnknownKeys::Strict;
            def.catchall = None;
        })
    }

    pub fn strip(&self) -> Result<Schema, SchemaError> {
        self.with_object_def(|def| {
            def.unknown_keys = UnknownKeys::Strip;
            def.catchall = None;
        })
    }

    pub fn passthrough(&self) -> Result<Schema, SchemaError> {
        self.with_object_def(|def| def.unknown_keys = UnknownKeys::Passthrough)
    }

    /// Validates unknown keys through `schema`. Implies passthrough.
    pub fn catchall(&self, schema: &Schema) -> Result<Schema, SchemaError> {
        self.with_object_def(|def| {
            def.unknown_keys = UnknownKeys::Passthrough;
            def.catchall = Some(schema.clone());
        })
    }

    /// Makes every field optional.
    pub fn partial(&self) -> Result<Schema, SchemaError> {
        self.with_object_def(|def| {
            def.partial = true;
            def.partial_exceptions.clear();
        })
    }

    /// Makes only `keys` optional.
    pub fn partial_keys<S: AsRef<str>>(&self, keys: &[S]) -> Result<Schema, SchemaError> {
        let def = self.object_def()?;
        let mut missing = keys.iter().map(AsRef::as_ref).filter(|k| !def.shape.contains_key(*k));
        if let Some(key) = missing.next() {
            return Err(SchemaError::UnknownKey(key.to_owned()));
        }
        self.with_object_def(|def| {
            let wanted: BTreeSet<&str> = keys.iter().map(AsRef::as_ref).collect();
            def.partial = true;
            def.partial_exceptions = def
                .shape
                .keys()
                .filter(|k| !wanted.contains(k.as_str()))
                .cloned()
                .collect();
        })
    }

    /// Makes every field required, wrapping children as `nonoptional`.
    pub fn required(&self) -> Result<Schema, SchemaError> {
        self.with_object_def(|def| {
            def.partial = false;
            def.partial_exceptions.clear();
            for child in def.shape.values_mut() {
                *child = child.nonoptional();
            }
        })
    }

    pub fn required_keys<S: AsRef<str>>(&self, keys: &[S]) -> Result<Schema, SchemaError> {
        let def = self.object_def()?;
        for key in keys {
            if !def.shape.contains_key(key.as_ref()) {
                return Err(SchemaError::UnknownKey(key.as_ref().to_owned()));
            }
        }
        self.with_object_def(|def| {
            for key in keys {
                let key = key.as_ref();
                if let Some(child) = def.shape.get_mut(key) {
                    *child = child.nonoptional();
                }
                if def.partial {
                    def.partial_exceptions.insert(key.to_owned());
                }
            }
        })
    }

    /// Keeps only `keys`. Fails on a schema carrying checks, since those
    /// were written against the full shape.
    pub fn pick<S: AsRef<str>>(&self, keys: &[S]) -> Result<Schema, SchemaError> {
        let def = self.object_def()?;
        if !self.internals().checks().is_empty() {
            return Err(SchemaError::RefinedPick);
        }
        for key in keys {
            if !def.shape.contains_key(key.as_ref()) {
                return Err(SchemaError::UnknownKey(key.as_ref().to_owned()));
            }
        }
        let wanted: BTreeSet<&str> = keys.iter().map(AsRef::as_ref).collect();
        self.with_object_def(|def| def.shape.retain(|k, _| wanted.contains(k.as_str())))
    }

    pub fn omit<S: AsRef<str>>(&self, keys: &[S]) -> Result<Schema, SchemaError> {
        let def = self.object_def()?;
        if !self.internals().checks().is_empty() {
            return Err(SchemaError::RefinedOmit);
        }
        for key in keys {
            if !def.shape.contains_key(key.as_ref()) {
                return Err(SchemaError::UnknownKey(key.as_ref().to_owned()));
            }
        }
        let dropped: BTreeSet<&str> = keys.iter().map(AsRef::as_ref).collect();
        self.with_object_def(|def| def.shape.retain(|k, _| !dropped.contains(k.as_str())))
    }

    /// Adds or replaces fields. Replacing a field of a schema that carries
    /// checks fails; use [`Schema::safe_extend`] to force it.
    pub fn extend<K: Into<String>>(
        &self,
        fields: impl IntoIterator<Item = (K, Schema)>,
    ) -> Result<Schema, SchemaError> {
        let fields = shape_of(fields);
        let def = self.object_def()?;
        if !self.internals().checks().is_empty() {
            if let Some(key) = fields.keys().find(|k| def.shape.contains_key(*k)) {
                return Err(SchemaError::RefinedExtend(key.clone()));
            }
        }
        self.with_object_def(|def| def.shape.extend(fields))
    }

    pub fn safe_extend<K: Into<String>>(
        &self,
        fields: impl IntoIterator<Item = (K, Schema)>,
    ) -> Result<Schema, SchemaError> {
        let fields = shape_of(fields);
        self.with_object_def(|def| def.shape.extend(fields))
    }

    /// Combines two object shapes; `other` wins on collisions and its
    /// unknown-key policy is kept.
    pub fn merge(&self, other: &Schema) -> Result<Schema, SchemaError> {
        let theirs = other.object_def()?.clone();
        self.with_object_def(|def| {
            def.shape.extend(theirs.shape);
            def.unknown_keys = theirs.unknown_keys;
            def.catchall = theirs.catchall;
        })
    }

    /// An enum of the shape's keys.
    pub fn keyof(&self) -> Result<Schema, SchemaError> {
        Ok(enum_(self.object_def()?.shape.keys().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use serde_json::json;

    fn user() -> Schema {
        object(vec![("name", string()), ("age", int().optional())])
    }

    #[test]
    fn strips_unknown_keys_by_default() {
        assert_eq!(
            json!({"name": "a"}),
            user().parse(&json!({"name": "a", "x": 1})).unwrap()
        );
    }

    #[test]
    fn absent_optional_field_is_omitted() {
        let out = user().parse(&json!({"name": "a"})).unwrap();
        assert_eq!(None, out.get("age"));
    }

    #[test]
    fn absent_required_field() {
        let err = user().parse(&json!({})).unwrap_err();
        let issue = &err.issues()[0];
        assert_eq!(IssueCode::InvalidType, issue.code);
        assert_eq!(Some("nonoptional"), issue.expected());
        assert_eq!(vec![PathSegment::from("name")], issue.path);
    }

    #[test]
    fn absent_field_needs_an_optional_child() {
        for child in [
            string().nilable(),
            union(vec![string(), int()]),
            any(),
            string().pipe(&string()),
        ] {
            let err = object(vec![("a", child)]).parse(&json!({})).unwrap_err();
            assert_eq!(1, err.issues().len());
            assert_eq!(IssueCode::InvalidType, err.issues()[0].code);
            assert_eq!(Some("nonoptional"), err.issues()[0].expected());
            assert_eq!(vec![PathSegment::from("a")], err.issues()[0].path);
        }

        let nilable = object(vec![("a", string().nilable())]);
        assert_eq!(json!({"a": null}), nilable.parse(&json!({"a": null})).unwrap());
        let nullish = object(vec![("a", string().nullish())]);
        assert_eq!(json!({}), nullish.parse(&json!({})).unwrap());
        let prefaulted = object(vec![("a", string().prefault("p"))]);
        assert_eq!(json!({"a": "p"}), prefaulted.parse(&json!({})).unwrap());
    }

    #[test]
    fn absent_field_with_default_is_filled() {
        let s = object(vec![("role", string().default("user"))]);
        assert_eq!(json!({"role": "user"}), s.parse(&json!({})).unwrap());
    }

    #[test]
    fn exact_optional_rejects_explicit_null() {
        let s = object(vec![("nick", string().exact_optional())]);
        assert_eq!(json!({}), s.parse(&json!({})).unwrap());
        assert!(s.parse(&json!({"nick": null})).is_err());

        let loose = object(vec![("nick", string().optional())]);
        assert!(loose.parse(&json!({"nick": null})).is_ok());
    }

    #[test]
    fn field_issues_accumulate() {
        let s = object(vec![("a", string()), ("b", string())]);
        let err = s.parse(&json!({"a": 1, "b": 2})).unwrap_err();
        assert_eq!(2, err.issues().len());
        assert_eq!("a: Invalid input: expected string, received number\nb: Invalid input: expected string, received number", err.to_string());
    }

    #[test]
    fn strict_reports_every_unknown_key_once() {
        let s = user().strict().unwrap();
        let err = s.parse(&json!({"name": "a", "x": 1, "y": 2})).unwrap_err();
        assert_eq!(1, err.issues().len());
        assert_eq!(Some(&["x".to_owned(), "y".to_owned()][..]), err.issues()[0].keys());
        assert!(err.issues()[0].path.is_empty());
    }

    #[test]
    fn passthrough_and_catchall() {
        let loose = user().passthrough().unwrap();
        assert_eq!(
            json!({"name": "a", "x": 1}),
            loose.parse(&json!({"name": "a", "x": 1})).unwrap()
        );

        let counted = user().catchall(&int()).unwrap();
        assert!(counted.parse(&json!({"name": "a", "x": 1})).is_ok());
        let err = counted.parse(&json!({"name": "a", "x": "1"})).unwrap_err();
        assert_eq!(vec![PathSegment::from("x")], err.issues()[0].path);
    }

    #[test]
    fn partial_and_required() {
        let partial = user().partial().unwrap();
        assert_eq!(json!({}), partial.parse(&json!({})).unwrap());

        let some = user().partial_keys(&["name"]).unwrap();
        assert!(some.parse(&json!({})).is_ok());

        let required = user().required().unwrap();
        let err = required.parse(&json!({"name": "a"})).unwrap_err();
        assert_eq!(vec![PathSegment::from("age")], err.issues()[0].path);

        let age = user().required_keys(&["age"]).unwrap();
        assert!(age.parse(&json!({"name": "a"})).is_err());
        assert_eq!(
            Err(SchemaError::UnknownKey("nope".to_owned())),
            user().required_keys(&["nope"]).map(|_| ())
        );
    }

    #[test]
    fn pick_and_omit() {
        let name = user().pick(&["name"]).unwrap();
        assert_eq!(vec!["name"], name.shape().unwrap().keys().collect::<Vec<_>>());

        let age = user().omit(&["name"]).unwrap();
        assert_eq!(vec!["age"], age.shape().unwrap().keys().collect::<Vec<_>>());

        let refined = user().refine(|_| true);
        assert_eq!(Err(SchemaError::RefinedPick), refined.pick(&["name"]).map(|_| ()));
        assert_eq!(Err(SchemaError::RefinedOmit), refined.omit(&["name"]).map(|_| ()));

        let refined_string = string().min(1);
        assert_eq!(
            Err(SchemaError::NotAnObject(TypeTag::String)),
            refined_string.pick(&["name"]).map(|_| ())
        );
        assert_eq!(
            Err(SchemaError::NotAnObject(TypeTag::String)),
            refined_string.omit(&["name"]).map(|_| ())
        );
    }

    #[test]
    fn shape_modifiers_keep_metadata() {
        let described = user().describe("A user");
        assert_eq!(Some("A user".to_owned()), described.strict().unwrap().description());
        assert_eq!(
            Some("A user".to_owned()),
            described.pick(&["name"]).unwrap().description()
        );
    }

    #[test]
    fn extend_and_merge() {
        let s = user().extend(vec![("email", string().email())]).unwrap();
        assert_eq!(3, s.shape().unwrap().len());

        let refined = user().refine(|_| true);
        assert_eq!(
            Err(SchemaError::RefinedExtend("name".to_owned())),
            refined.extend(vec![("name", int())]).map(|_| ())
        );
        assert!(refined.safe_extend(vec![("name", int())]).is_ok());

        let merged = user().merge(&object(vec![("name", int())]).strict().unwrap()).unwrap();
        assert!(merged.parse(&json!({"name": 1})).is_ok());
        assert!(merged.parse(&json!({"name": 1, "x": 0})).is_err());
    }

    #[test]
    fn keyof_lists_fields() {
        let keys = user().keyof().unwrap();
        assert!(keys.parse(&json!("age")).is_ok());
        assert!(keys.parse(&json!("nope")).is_err());
    }

    #[test]
    fn shape_modifiers_need_an_object() {
        assert_eq!(
            Err(SchemaError::NotAnObject(TypeTag::String)),
            string().strict().map(|_| ())
        );
    }

    #[test]
    fn modifiers_keep_original() {
        let base = user();
        let _ = base.strict().unwrap();
        assert!(base.parse(&json!({"name": "a", "x": 1})).is_ok());
    }
}
