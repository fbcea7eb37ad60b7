use crate::context::{ParseContext, ParsePayload, RefinementContext};
use crate::internals::{ErrorCustomizer, Params};
use crate::issue::{Path, PathSegment, RawIssue};
use crate::schema::Schema;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-]+(\.[A-Za-z0-9_'+\-]+)*@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email regex")
});
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid regex")
});
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+\S*$").expect("url regex"));

pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type SuperRefineFn = Arc<dyn Fn(&Value, &mut RefinementContext<'_>) + Send + Sync>;
pub type OverwriteFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum CheckKind {
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    MultipleOf(f64),
    MinSize(usize),
    MaxSize(usize),
    Size(usize),
    MinLength(usize),
    MaxLength(usize),
    Length(usize),
    Regex { regex: Regex, format: String },
    StartsWith(String),
    EndsWith(String),
    Includes(String),
    Datetime,
    Mime(Vec<String>),
    Property { name: String, schema: Schema },
    Refine(Predicate),
    SuperRefine(SuperRefineFn),
    Overwrite(OverwriteFn),
}

impl fmt::Debug for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gt(v) => f.debug_tuple("Gt").field(v).finish(),
            Self::Gte(v) => f.debug_tuple("Gte").field(v).finish(),
            Self::Lt(v) => f.debug_tuple("Lt").field(v).finish(),
            Self::Lte(v) => f.debug_tuple("Lte").field(v).finish(),
            Self::MultipleOf(v) => f.debug_tuple("MultipleOf").field(v).finish(),
            Self::MinSize(n) => f.debug_tuple("MinSize").field(n).finish(),
            Self::MaxSize(n) => f.debug_tuple("MaxSize").field(n).finish(),
            Self::Size(n) => f.debug_tuple("Size").field(n).finish(),
            Self::MinLength(n) => f.debug_tuple("MinLength").field(n).finish(),
            Self::MaxLength(n) => f.debug_tuple("MaxLength").field(n).finish(),
            Self::Length(n) => f.debug_tuple("Length").field(n).finish(),
            Self::Regex { regex, format } => f
                .debug_struct("Regex")
                .field("pattern", &regex.as_str())
                .field("format", format)
                .finish(),
            Self::StartsWith(s) => f.debug_tuple("StartsWith").field(s).finish(),
            Self::EndsWith(s) => f.debug_tuple("EndsWith").field(s).finish(),
            Self::Includes(s) => f.debug_tuple("Includes").field(s).finish(),
            Self::Datetime => f.write_str("Datetime"),
            Self::Mime(types) => f.debug_tuple("Mime").field(types).finish(),
            Self::Property { name, schema } => f
                .debug_struct("Property")
                .field("name", name)
                .field("schema", schema)
                .finish(),
            Self::Refine(_) => f.write_str("Refine"),
            Self::SuperRefine(_) => f.write_str("SuperRefine"),
            Self::Overwrite(_) => f.write_str("Overwrite"),
        }
    }
}

/// A predicate or in-place transformation attached to a schema. Checks run
/// in insertion order after the schema's own type extraction.
#[derive(Clone, Debug)]
pub struct Check {
    kind: CheckKind,
    error: Option<ErrorCustomizer>,
    abort: bool,
    path: Path,
    params: Map<String, Value>,
}

impl Check {
    pub fn new(kind: CheckKind) -> Self {
        Self {
            kind,
            error: None,
            abort: false,
            path: Vec::new(),
            params: Map::new(),
        }
    }

    pub fn gt(value: impl Into<f64>) -> Self {
        Self::new(CheckKind::Gt(value.into()))
    }

    pub fn gte(value: impl Into<f64>) -> Self {
        Self::new(CheckKind::Gte(value.into()))
    }

    pub fn lt(value: impl Into<f64>) -> Self {
        Self::new(CheckKind::Lt(value.into()))
    }

    pub fn lte(value: impl Into<f64>) -> Self {
        Self::new(CheckKind::Lte(value.into()))
    }

    pub fn multiple_of(step: impl Into<f64>) -> Self {
        Self::new(CheckKind::MultipleOf(step.into()))
    }

    pub fn min_size(size: usize) -> Self {
        Self::new(CheckKind::MinSize(size))
    }

    pub fn max_size(size: usize) -> Self {
        Self::new(CheckKind::MaxSize(size))
    }

    pub fn size(size: usize) -> Self {
        Self::new(CheckKind::Size(size))
    }

    pub fn min_length(length: usize) -> Self {
        Self::new(CheckKind::MinLength(length))
    }

    pub fn max_length(length: usize) -> Self {
        Self::new(CheckKind::MaxLength(length))
    }

    pub fn length(length: usize) -> Self {
        Self::new(CheckKind::Length(length))
    }

    pub fn regex(regex: Regex) -> Self {
        Self::new(CheckKind::Regex {
            regex,
            format: "regex".to_owned(),
        })
    }

    pub fn email() -> Self {
        Self::format("email", &EMAIL_RE)
    }

    pub fn uuid() -> Self {
        Self::format("uuid", &UUID_RE)
    }

    pub fn url() -> Self {
        Self::format("url", &URL_RE)
    }

    fn format(format: &str, regex: &Regex) -> Self {
        Self::new(CheckKind::Regex {
            regex: regex.clone(),
            format: format.to_owned(),
        })
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self::new(CheckKind::StartsWith(prefix.into()))
    }

    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Self::new(CheckKind::EndsWith(suffix.into()))
    }

    pub fn includes(needle: impl Into<String>) -> Self {
        Self::new(CheckKind::Includes(needle.into()))
    }

    /// RFC 3339 timestamp.
    pub fn datetime() -> Self {
        Self::new(CheckKind::Datetime)
    }

    pub fn mime<S: Into<String>>(types: Vec<S>) -> Self {
        Self::new(CheckKind::Mime(types.into_iter().map(Into::into).collect()))
    }

    pub fn property(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(CheckKind::Property {
            name: name.into(),
            schema,
        })
    }

    pub fn refine<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(CheckKind::Refine(Arc::new(predicate)))
    }

    /// A refinement over the deserialized value. A value that does not
    /// deserialize into `T` fails the refinement.
    pub fn refine_typed<T, F>(predicate: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::refine(move |value| {
            serde_json::from_value::<T>(value.clone())
                .map(|typed| predicate(&typed))
                .unwrap_or(false)
        })
    }

    pub fn super_refine<F>(f: F) -> Self
    where
        F: Fn(&Value, &mut RefinementContext<'_>) + Send + Sync + 'static,
    {
        Self::new(CheckKind::SuperRefine(Arc::new(f)))
    }

    pub fn overwrite<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::new(CheckKind::Overwrite(Arc::new(f)))
    }

    pub fn error(mut self, error: impl Into<ErrorCustomizer>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Stops the remaining checks once this one reports an issue.
    pub fn abort(mut self) -> Self {
        self.abort = true;
        self
    }

    pub fn path<S: Into<PathSegment>>(mut self, path: Vec<S>) -> Self {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        if params.error.is_some() {
            self.error = params.error;
        }
        self.abort = self.abort || params.abort;
        if !params.path.is_empty() {
            self.path = params.path;
        }
        self.params.extend(params.params);
        self
    }

    pub fn kind(&self) -> &CheckKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            CheckKind::Gt(_) => "gt",
            CheckKind::Gte(_) => "gte",
            CheckKind::Lt(_) => "lt",
            CheckKind::Lte(_) => "lte",
            CheckKind::MultipleOf(_) => "multiple_of",
            CheckKind::MinSize(_) => "min_size",
            CheckKind::MaxSize(_) => "max_size",
            CheckKind::Size(_) => "size",
            CheckKind::MinLength(_) => "min_length",
            CheckKind::MaxLength(_) => "max_length",
            CheckKind::Length(_) => "length",
            CheckKind::Regex { format, .. } => format.as_str(),
            CheckKind::StartsWith(_) => "starts_with",
            CheckKind::EndsWith(_) => "ends_with",
            CheckKind::Includes(_) => "includes",
            CheckKind::Datetime => "datetime",
            CheckKind::Mime(_) => "mime",
            CheckKind::Property { .. } => "property",
            CheckKind::Refine(_) | CheckKind::SuperRefine(_) => "custom",
            CheckKind::Overwrite(_) => "overwrite",
        }
    }

    /// Whether the check was attached by the caller as an arbitrary
    /// predicate or transformation rather than a built-in bound.
    pub fn is_refinement(&self) -> bool {
        matches!(
            self.kind,
            CheckKind::Refine(_) | CheckKind::SuperRefine(_) | CheckKind::Overwrite(_)
        )
    }

    pub(crate) fn bag_entry(&self) -> Option<(&'static str, Value)> {
        match &self.kind {
            CheckKind::Gt(v) | CheckKind::Gte(v) => Some(("minimum", Value::from(*v))),
            CheckKind::Lt(v) | CheckKind::Lte(v) => Some(("maximum", Value::from(*v))),
            CheckKind::MultipleOf(v) => Some(("multipleOf", Value::from(*v))),
            CheckKind::MinSize(n) | CheckKind::MinLength(n) => Some(("minimum", Value::from(*n))),
            CheckKind::MaxSize(n) | CheckKind::MaxLength(n) => Some(("maximum", Value::from(*n))),
            CheckKind::Size(n) | CheckKind::Length(n) => Some(("length", Value::from(*n))),
            CheckKind::Regex { regex, format } if format == "regex" => {
                Some(("patterns", Value::from(regex.as_str())))
            }
            CheckKind::Regex { format, .. } => Some(("format", Value::from(format.as_str()))),
            CheckKind::Datetime => Some(("format", Value::from("datetime"))),
            CheckKind::Mime(types) => Some(("mime", Value::from(types.clone()))),
            _ => None,
        }
    }

    pub(crate) fn run(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let start = payload.issues.len();
        self.apply(payload, ctx);

        for issue in &mut payload.issues[start..] {
            if issue.check_error.is_none() {
                issue.check_error = self.error.clone();
            }
            if issue.properties.params.is_none() && !self.params.is_empty() {
                issue.properties.params = Some(self.params.clone());
            }
            if !self.path.is_empty() {
                let mut path = self.path.clone();
                path.append(&mut issue.path);
                issue.path = path;
            }
            issue.continuable = !self.abort;
        }
    }

    fn apply(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let value = &payload.value;
        let issue = match &self.kind {
            CheckKind::Gt(min) => value
                .as_f64()
                .filter(|n| !(n > min))
                .map(|_| RawIssue::too_small("number", *min, false, value)),
            CheckKind::Gte(min) => value
                .as_f64()
                .filter(|n| !(n >= min))
                .map(|_| RawIssue::too_small("number", *min, true, value)),
            CheckKind::Lt(max) => value
                .as_f64()
                .filter(|n| !(n < max))
                .map(|_| RawIssue::too_big("number", *max, false, value)),
            CheckKind::Lte(max) => value
                .as_f64()
                .filter(|n| !(n <= max))
                .map(|_| RawIssue::too_big("number", *max, true, value)),
            CheckKind::MultipleOf(step) => value
                .as_f64()
                .filter(|n| !is_multiple(*n, *step))
                .map(|_| RawIssue::not_multiple_of(*step, value)),
            CheckKind::MinSize(min) => value
                .as_object()
                .filter(|map| map.len() < *min)
                .map(|_| RawIssue::too_small("object", *min as f64, true, value)),
            CheckKind::MaxSize(max) => value
                .as_object()
                .filter(|map| map.len() > *max)
                .map(|_| RawIssue::too_big("object", *max as f64, true, value)),
            CheckKind::Size(size) => value
                .as_object()
                .and_then(|map| exact_bound("object", map.len(), *size, value)),
            CheckKind::MinLength(min) => length_of(value)
                .filter(|(_, len)| len < min)
                .map(|(origin, _)| RawIssue::too_small(origin, *min as f64, true, value)),
            CheckKind::MaxLength(max) => length_of(value)
                .filter(|(_, len)| len > max)
                .map(|(origin, _)| RawIssue::too_big(origin, *max as f64, true, value)),
            CheckKind::Length(length) => length_of(value)
                .and_then(|(origin, len)| exact_bound(origin, len, *length, value)),
            CheckKind::Regex { regex, format } => value
                .as_str()
                .filter(|s| !regex.is_match(s))
                .map(|_| {
                    let mut issue = RawIssue::invalid_format(format.as_str(), value);
                    if format == "regex" {
                        issue.properties.pattern = Some(regex.as_str().to_owned());
                    }
                    issue
                }),
            CheckKind::StartsWith(prefix) => value
                .as_str()
                .filter(|s| !s.starts_with(prefix.as_str()))
                .map(|_| with_pattern(RawIssue::invalid_format("starts_with", value), prefix)),
            CheckKind::EndsWith(suffix) => value
                .as_str()
                .filter(|s| !s.ends_with(suffix.as_str()))
                .map(|_| with_pattern(RawIssue::invalid_format("ends_with", value), suffix)),
            CheckKind::Includes(needle) => value
                .as_str()
                .filter(|s| !s.contains(needle.as_str()))
                .map(|_| with_pattern(RawIssue::invalid_format("includes", value), needle)),
            CheckKind::Datetime => value
                .as_str()
                .filter(|s| DateTime::parse_from_rfc3339(s).is_err())
                .map(|_| RawIssue::invalid_format("datetime", value)),
            CheckKind::Mime(types) => mime_of(value)
                .filter(|mime| !types.iter().any(|t| t == mime))
                .map(|_| {
                    RawIssue::invalid_value(
                        types.iter().map(|t| Value::from(t.as_str())).collect(),
                        value,
                    )
                    .with_origin("file")
                }),
            CheckKind::Property { name, schema } => {
                let field = value.get(name.as_str()).cloned().unwrap_or(Value::Null);
                let child = schema.run(field, ctx);
                payload.extend_prefixed(child.issues, &PathSegment::from(name.as_str()));
                None
            }
            CheckKind::Refine(predicate) => {
                if predicate(value) {
                    None
                } else {
                    Some(RawIssue::custom(value))
                }
            }
            CheckKind::SuperRefine(f) => {
                let mut rctx = RefinementContext::new(ctx, value.clone());
                f(value, &mut rctx);
                payload.issues.extend(rctx.into_issues());
                None
            }
            CheckKind::Overwrite(f) => {
                let value = payload.take_value();
                payload.value = f(value);
                None
            }
        };

        if let Some(issue) = issue {
            payload.push(issue);
        }
    }
}

fn is_multiple(value: f64, step: f64) -> bool {
    if step == 0.0 {
        return false;
    }
    let ratio = value / step;
    (ratio - ratio.round()).abs() < 1e-9 * ratio.abs().max(1.0)
}

fn length_of(value: &Value) -> Option<(&'static str, usize)> {
    match value {
        Value::String(s) => Some(("string", s.chars().count())),
        Value::Array(items) => Some(("array", items.len())),
        _ => None,
    }
}

fn exact_bound(origin: &str, actual: usize, expected: usize, input: &Value) -> Option<RawIssue> {
    let mut issue = if actual < expected {
        RawIssue::too_small(origin, expected as f64, true, input)
    } else if actual > expected {
        RawIssue::too_big(origin, expected as f64, true, input)
    } else {
        return None;
    };
    issue.properties.exact = Some(true);
    Some(issue)
}

fn with_pattern(mut issue: RawIssue, pattern: &str) -> RawIssue {
    issue.properties.pattern = Some(pattern.to_owned());
    issue
}

fn mime_of(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("type").and_then(Value::as_str),
        _ => None,
    }
}
