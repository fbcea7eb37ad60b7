use crate::config::Config;
use crate::context::ParseContext;
use crate::internals::ErrorCustomizer;
use crate::messages;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    TooSmall,
    TooBig,
    InvalidFormat,
    NotMultipleOf,
    InvalidValue,
    InvalidUnion,
    InvalidXor,
    UnrecognizedKeys,
    InvalidElement,
    InvalidKey,
    Custom,
    NonoptionalViolation,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidType => "invalid_type",
            Self::TooSmall => "too_small",
            Self::TooBig => "too_big",
            Self::InvalidFormat => "invalid_format",
            Self::NotMultipleOf => "not_multiple_of",
            Self::InvalidValue => "invalid_value",
            Self::InvalidUnion => "invalid_union",
            Self::InvalidXor => "invalid_xor",
            Self::UnrecognizedKeys => "unrecognized_keys",
            Self::InvalidElement => "invalid_element",
            Self::InvalidKey => "invalid_key",
            Self::Custom => "custom",
            Self::NonoptionalViolation => "nonoptional_violation",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step into a nested value: an object key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

pub type Path = Vec<PathSegment>;

/// Renders a path as dot-separated segments; the root path is the empty
/// string.
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// The name used for `received` in `invalid_type` issues.
pub fn received_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Code-specific details carried by an issue.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusive: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub divisor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

/// An issue as emitted during a parse, before its message is resolved.
#[derive(Clone, Debug)]
pub struct RawIssue {
    pub code: IssueCode,
    pub origin: Option<String>,
    pub input: Value,
    pub path: Path,
    pub message: Option<String>,
    pub properties: IssueProperties,
    /// Per-option issue lists for `invalid_union`, nested issues for
    /// `invalid_key` and `invalid_element`.
    pub errors: Vec<Vec<RawIssue>>,
    /// The schema that emitted the issue.
    pub inst: Option<Schema>,
    pub(crate) check_error: Option<ErrorCustomizer>,
    pub(crate) continuable: bool,
}

impl RawIssue {
    pub fn new(code: IssueCode, input: Value) -> Self {
        Self {
            code,
            origin: None,
            input,
            path: Vec::new(),
            message: None,
            properties: IssueProperties::default(),
            errors: Vec::new(),
            inst: None,
            check_error: None,
            continuable: false,
        }
    }

    pub fn invalid_type(expected: impl Into<String>, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::InvalidType, input.clone());
        issue.properties.expected = Some(expected.into());
        issue.properties.received = Some(received_type(input).to_owned());
        issue
    }

    pub fn too_small(
        origin: impl Into<String>,
        minimum: f64,
        inclusive: bool,
        input: &Value,
    ) -> Self {
        let mut issue = Self::new(IssueCode::TooSmall, input.clone()).with_origin(origin);
        issue.properties.minimum = Some(minimum);
        issue.properties.inclusive = Some(inclusive);
        issue
    }

    pub fn too_big(origin: impl Into<String>, maximum: f64, inclusive: bool, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::TooBig, input.clone()).with_origin(origin);
        issue.properties.maximum = Some(maximum);
        issue.properties.inclusive = Some(inclusive);
        issue
    }

    pub fn invalid_format(format: impl Into<String>, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::InvalidFormat, input.clone()).with_origin("string");
        issue.properties.format = Some(format.into());
        issue
    }

    pub fn not_multiple_of(divisor: f64, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::NotMultipleOf, input.clone()).with_origin("number");
        issue.properties.divisor = Some(divisor);
        issue
    }

    pub fn invalid_value(options: Vec<Value>, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::InvalidValue, input.clone());
        issue.properties.options = Some(options);
        issue
    }

    pub fn invalid_union(errors: Vec<Vec<RawIssue>>, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::InvalidUnion, input.clone());
        issue.errors = errors;
        issue
    }

    pub fn invalid_xor(match_count: usize, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::InvalidXor, input.clone());
        issue.properties.match_count = Some(match_count);
        issue
    }

    pub fn unrecognized_keys(keys: Vec<String>, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::UnrecognizedKeys, input.clone());
        issue.properties.keys = Some(keys);
        issue
    }

    pub fn invalid_key(origin: impl Into<String>, errors: Vec<RawIssue>, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::InvalidKey, input.clone()).with_origin(origin);
        issue.errors = vec![errors];
        issue
    }

    pub fn invalid_element(origin: impl Into<String>, errors: Vec<RawIssue>, input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::InvalidElement, input.clone()).with_origin(origin);
        issue.errors = vec![errors];
        issue
    }

    pub fn custom(input: &Value) -> Self {
        Self::new(IssueCode::Custom, input.clone())
    }

    pub fn nonoptional_violation(input: &Value) -> Self {
        let mut issue = Self::new(IssueCode::NonoptionalViolation, input.clone());
        issue.properties.expected = Some("nonoptional".to_owned());
        issue.properties.received = Some(received_type(input).to_owned());
        issue
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        if !params.is_empty() {
            self.properties.params = Some(params);
        }
        self
    }

    pub fn with_inst(mut self, schema: &Schema) -> Self {
        self.inst = Some(schema.clone());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Marks the issue as one that does not stop later checks from running.
    pub fn continuable(mut self) -> Self {
        self.continuable = true;
        self
    }

    pub(crate) fn prefixed(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Resolves the message and canonicalizes the path.
    ///
    /// The message comes from the first of: an explicit message on the
    /// issue, the per-call customizer, the per-check customizer, the
    /// customizer of the emitting schema, the global customizer, and finally
    /// the default English message for the code.
    pub fn finalize(self, ctx: &ParseContext, config: &Config) -> Issue {
        let message = self
            .message
            .clone()
            .or_else(|| ctx.error().and_then(|error| error.resolve(&self)))
            .or_else(|| self.check_error.as_ref().and_then(|error| error.resolve(&self)))
            .or_else(|| {
                self.inst
                    .as_ref()
                    .and_then(|schema| schema.internals().error())
                    .and_then(|error| error.resolve(&self))
            })
            .or_else(|| {
                config
                    .custom_error
                    .as_ref()
                    .and_then(|error| error.resolve(&self))
            })
            .unwrap_or_else(|| messages::default_message(&self));

        let mut path = ctx.path().to_vec();
        path.extend(self.path);

        let nested_ctx = ctx.nested();
        let errors = self
            .errors
            .into_iter()
            .map(|issues| {
                issues
                    .into_iter()
                    .map(|issue| issue.finalize(&nested_ctx, config))
                    .collect()
            })
            .collect();

        let report_input = ctx.report_input().unwrap_or(config.report_input);

        Issue {
            code: self.code,
            path,
            message,
            origin: self.origin,
            input: if report_input { Some(self.input) } else { None },
            properties: self.properties,
            errors,
        }
    }
}

/// An issue with its message resolved, as surfaced to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub path: Path,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    #[serde(flatten)]
    pub properties: IssueProperties,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Vec<Issue>>,
}

impl Issue {
    pub fn expected(&self) -> Option<&str> {
        self.properties.expected.as_deref()
    }

    pub fn received(&self) -> Option<&str> {
        self.properties.received.as_deref()
    }

    pub fn minimum(&self) -> Option<f64> {
        self.properties.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.properties.maximum
    }

    pub fn inclusive(&self) -> Option<bool> {
        self.properties.inclusive
    }

    pub fn keys(&self) -> Option<&[String]> {
        self.properties.keys.as_deref()
    }

    pub fn options(&self) -> Option<&[Value]> {
        self.properties.options.as_deref()
    }
}

/// Every issue produced by a failed parse, in emission order.
#[derive(Clone, Debug, PartialEq, Serialize, Error)]
#[error("{}", render_issues(.issues))]
pub struct ParseError {
    issues: Vec<Issue>,
}

fn render_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| {
            if issue.path.is_empty() {
                issue.message.clone()
            } else {
                format!("{}: {}", format_path(&issue.path), issue.message)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Issues grouped for form display: root-level messages and messages keyed
/// by the first path segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedError {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ParseError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    pub fn by_path(&self) -> BTreeMap<String, Vec<&Issue>> {
        let mut out: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            out.entry(format_path(&issue.path)).or_default().push(issue);
        }
        out
    }

    pub fn flatten(&self) -> FlattenedError {
        let mut out = FlattenedError::default();
        for issue in &self.issues {
            match issue.path.first() {
                None => out.form_errors.push(issue.message.clone()),
                Some(segment) => out
                    .field_errors
                    .entry(segment.to_string())
                    .or_default()
                    .push(issue.message.clone()),
            }
        }
        out
    }

    /// Recovers a `ParseError` from a type-erased error.
    pub fn from_dyn<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a ParseError> {
        err.downcast_ref::<ParseError>()
    }
}

pub fn is_parse_error(err: &(dyn std::error::Error + 'static)) -> bool {
    ParseError::from_dyn(err).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finalize(issue: RawIssue) -> Issue {
        issue.finalize(&ParseContext::new(), &Config::default())
    }

    #[test]
    fn path_formatting() {
        assert_eq!("", format_path(&[]));
        assert_eq!(
            "user.emails.2",
            format_path(&[
                PathSegment::from("user"),
                PathSegment::from("emails"),
                PathSegment::from(2)
            ])
        );
    }

    #[test]
    fn path_segments_serialize_untagged() {
        let path: Path = vec!["a".into(), 0.into()];
        assert_eq!(json!(["a", 0]), serde_json::to_value(&path).unwrap());
    }

    #[test]
    fn invalid_type_records_received() {
        let issue = finalize(RawIssue::invalid_type("string", &json!(3)));
        assert_eq!(IssueCode::InvalidType, issue.code);
        assert_eq!(Some("string"), issue.expected());
        assert_eq!(Some("number"), issue.received());
        assert_eq!("Invalid input: expected string, received number", issue.message);
    }

    #[test]
    fn explicit_message_wins() {
        let issue = RawIssue::custom(&json!(null)).with_message("nope");
        assert_eq!("nope", finalize(issue).message);
    }

    #[test]
    fn context_customizer_beats_check_customizer() {
        let mut issue = RawIssue::too_small("string", 3.0, true, &json!("ab"));
        issue.check_error = Some(ErrorCustomizer::from("from check"));

        let ctx = ParseContext::new().with_error("from context");
        assert_eq!(
            "from context",
            issue.clone().finalize(&ctx, &Config::default()).message
        );
        assert_eq!("from check", finalize(issue).message);
    }

    #[test]
    fn customizer_may_decline() {
        let ctx = ParseContext::new().with_error(ErrorCustomizer::new(|issue| {
            if issue.code == IssueCode::TooBig {
                Some("too big!".to_owned())
            } else {
                None
            }
        }));

        let issue = RawIssue::too_small("number", 1.0, false, &json!(0));
        assert_eq!(
            "Too small: expected number to be >1",
            issue.finalize(&ctx, &Config::default()).message
        );
    }

    #[test]
    fn context_path_prefixes_issue_path() {
        let ctx = ParseContext::new().with_path(vec!["body".into()]);
        let issue = RawIssue::custom(&json!(1)).with_path(vec!["a".into()]);
        assert_eq!(
            vec![PathSegment::from("body"), PathSegment::from("a")],
            issue.finalize(&ctx, &Config::default()).path
        );
    }

    #[test]
    fn report_input_can_be_disabled() {
        let ctx = ParseContext::new().with_report_input(false);
        let issue = RawIssue::custom(&json!({"secret": 1}));
        assert_eq!(None, issue.finalize(&ctx, &Config::default()).input);
    }

    #[test]
    fn error_groups_by_path() {
        let err = ParseError::new(vec![
            finalize(RawIssue::custom(&json!(1)).with_path(vec!["a".into()])),
            finalize(RawIssue::custom(&json!(1)).with_path(vec!["a".into()])),
            finalize(RawIssue::custom(&json!(1))),
        ]);

        let grouped = err.by_path();
        assert_eq!(2, grouped["a"].len());
        assert_eq!(1, grouped[""].len());

        let flat = err.flatten();
        assert_eq!(vec!["Invalid input".to_owned()], flat.form_errors);
        assert_eq!(2, flat.field_errors["a"].len());
    }

    #[test]
    fn display_lists_every_issue() {
        let err = ParseError::new(vec![
            finalize(RawIssue::custom(&json!(1)).with_path(vec!["a".into(), 0.into()])),
            finalize(RawIssue::custom(&json!(1))),
        ]);
        assert_eq!("a.0: Invalid input\nInvalid input", err.to_string());
    }

    #[test]
    fn recovers_from_dyn_error() {
        let err: Box<dyn std::error::Error + Send + Sync> = Box::new(ParseError::new(vec![]));
        assert!(is_parse_error(err.as_ref()));

        let other: Box<dyn std::error::Error + Send + Sync> = "plain".into();
        assert!(!is_parse_error(other.as_ref()));
    }

    #[test]
    fn issue_serializes_flat() {
        let issue = finalize(RawIssue::unrecognized_keys(
            vec!["extra".to_owned()],
            &json!({"extra": 1}),
        ));
        assert_eq!(
            json!({
                "code": "unrecognized_keys",
                "path": [],
                "message": "Unrecognized key: \"extra\"",
                "input": {"extra": 1},
                "keys": ["extra"],
            }),
            serde_json::to_value(&issue).unwrap()
        );
    }
}
