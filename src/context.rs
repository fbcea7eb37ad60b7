use crate::internals::ErrorCustomizer;
use crate::issue::{Path, PathSegment, RawIssue};
use serde_json::Value;

/// Per-call parse options.
///
/// ```
/// use vetted::ParseContext;
///
/// let ctx = ParseContext::new()
///     .with_error("bad input")
///     .with_report_input(false);
/// assert_eq!(Some(false), ctx.report_input());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    error: Option<ErrorCustomizer>,
    report_input: Option<bool>,
    path: Path,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, error: impl Into<ErrorCustomizer>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_report_input(mut self, report_input: bool) -> Self {
        self.report_input = Some(report_input);
        self
    }

    /// A base path prepended to every issue path.
    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    pub fn error(&self) -> Option<&ErrorCustomizer> {
        self.error.as_ref()
    }

    pub fn report_input(&self) -> Option<bool> {
        self.report_input
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    pub(crate) fn nested(&self) -> Self {
        Self {
            error: self.error.clone(),
            report_input: self.report_input,
            path: Vec::new(),
        }
    }
}

/// The in-flight state of one schema's parse: the current value and the
/// issues raised so far.
#[derive(Clone, Debug)]
pub struct ParsePayload {
    pub value: Value,
    pub issues: Vec<RawIssue>,
}

impl ParsePayload {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, issue: RawIssue) {
        self.issues.push(issue);
    }

    /// Merges issues from a child parse, prefixing each path with the
    /// child's position inside this value.
    pub fn extend_prefixed(&mut self, issues: Vec<RawIssue>, segment: &PathSegment) {
        self.issues
            .extend(issues.into_iter().map(|issue| issue.prefixed(segment.clone())));
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// True once an issue has been raised that stops later checks.
    pub fn is_aborted(&self) -> bool {
        self.issues.iter().any(|issue| !issue.continuable)
    }

    pub(crate) fn take_value(&mut self) -> Value {
        std::mem::take(&mut self.value)
    }
}

/// Handed to transforms and super-refinements so they can report issues of
/// their own.
#[derive(Debug)]
pub struct RefinementContext<'a> {
    ctx: &'a ParseContext,
    input: Value,
    issues: Vec<RawIssue>,
}

impl<'a> RefinementContext<'a> {
    pub(crate) fn new(ctx: &'a ParseContext, input: Value) -> Self {
        Self {
            ctx,
            input,
            issues: Vec::new(),
        }
    }

    pub fn context(&self) -> &ParseContext {
        self.ctx
    }

    /// The value under refinement.
    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn add_issue(&mut self, issue: RawIssue) {
        self.issues.push(issue);
    }

    /// Reports a `custom` issue against the current value.
    pub fn issue(&mut self, message: impl Into<String>) {
        let issue = RawIssue::custom(&self.input).with_message(message);
        self.issues.push(issue);
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub(crate) fn into_issues(self) -> Vec<RawIssue> {
        self.issues
    }
}
