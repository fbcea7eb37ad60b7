use crate::check::Check;
use crate::issue::{Path, PathSegment, RawIssue};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Maps an issue to a replacement message. Returning `None` defers to the
/// next customizer in line.
#[derive(Clone)]
pub struct ErrorCustomizer(Arc<dyn Fn(&RawIssue) -> Option<String> + Send + Sync>);

impl ErrorCustomizer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RawIssue) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| Some(message.clone()))
    }

    pub fn resolve(&self, issue: &RawIssue) -> Option<String> {
        (self.0)(issue)
    }
}

impl fmt::Debug for ErrorCustomizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorCustomizer")
    }
}

impl From<&str> for ErrorCustomizer {
    fn from(message: &str) -> Self {
        Self::message(message)
    }
}

impl From<String> for ErrorCustomizer {
    fn from(message: String) -> Self {
        Self::message(message)
    }
}

/// A stored default or prefault: either a fixed value or a producer called
/// on every use.
#[derive(Clone)]
pub enum Fallback {
    Value(Value),
    Func(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl Fallback {
    pub fn produce(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Func(f) => f(),
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Func(_) => f.write_str("Func"),
        }
    }
}

/// State shared by every schema kind. Never mutated once a schema holding
/// it has been handed out; modifiers clone it.
#[derive(Clone, Debug, Default)]
pub struct Internals {
    pub(crate) checks: Vec<Check>,
    pub(crate) optional: bool,
    pub(crate) nilable: bool,
    pub(crate) nonoptional: bool,
    pub(crate) exact_optional: bool,
    pub(crate) coerce: bool,
    pub(crate) default: Option<Fallback>,
    pub(crate) prefault: Option<Fallback>,
    pub(crate) error: Option<ErrorCustomizer>,
    pub(crate) bag: Map<String, Value>,
}

impl Internals {
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_nilable(&self) -> bool {
        self.nilable
    }

    pub fn is_nonoptional(&self) -> bool {
        self.nonoptional
    }

    pub fn is_exact_optional(&self) -> bool {
        self.exact_optional
    }

    pub fn is_coerce(&self) -> bool {
        self.coerce
    }

    pub fn default_value(&self) -> Option<&Fallback> {
        self.default.as_ref()
    }

    pub fn prefault_value(&self) -> Option<&Fallback> {
        self.prefault.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorCustomizer> {
        self.error.as_ref()
    }

    /// Per-kind auxiliary state recorded by checks (bounds, patterns,
    /// formats).
    pub fn bag(&self) -> &Map<String, Value> {
        &self.bag
    }

    /// Whether the nil branch of the engine can succeed without running the
    /// schema's own validation.
    pub fn admits_nil(&self) -> bool {
        !self.nonoptional
            && (self.optional || self.nilable || self.default.is_some() || self.prefault.is_some())
    }

    /// Whether a missing object key may be parsed as nil rather than
    /// reported. `nilable` alone only admits an explicit null.
    pub fn admits_absence(&self) -> bool {
        !self.nonoptional
            && (self.optional || self.default.is_some() || self.prefault.is_some())
    }

    pub(crate) fn push_check(&mut self, check: Check) {
        if let Some((key, value)) = check.bag_entry() {
            match key {
                "patterns" => {
                    let patterns = self
                        .bag
                        .entry("patterns")
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(patterns) = patterns {
                        patterns.push(value);
                    }
                }
                _ => {
                    self.bag.insert(key.to_owned(), value);
                }
            }
        }
        self.checks.push(check);
    }
}

/// Options accepted by factories and refinements.
///
/// ```
/// use vetted::Params;
///
/// let params = Params::new()
///     .error("must be positive")
///     .abort()
///     .path(vec!["amount"]);
/// assert!(params.is_abort());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Params {
    pub(crate) error: Option<ErrorCustomizer>,
    pub(crate) description: Option<String>,
    pub(crate) coerce: bool,
    pub(crate) abort: bool,
    pub(crate) path: Path,
    pub(crate) params: Map<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(mut self, error: impl Into<ErrorCustomizer>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    pub fn abort(mut self) -> Self {
        self.abort = true;
        self
    }

    pub fn path<S: Into<PathSegment>>(mut self, path: Vec<S>) -> Self {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn is_abort(&self) -> bool {
        self.abort
    }
}

impl From<&str> for Params {
    fn from(message: &str) -> Self {
        Self::new().error(message)
    }
}

impl From<String> for Params {
    fn from(message: String) -> Self {
        Self::new().error(message)
    }
}
