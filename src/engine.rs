use crate::config;
use crate::context::{ParseContext, ParsePayload};
use crate::issue::{ParseError, RawIssue};
use crate::schema::Schema;
use serde_json::Value;
use tracing::trace;

/// The stage a parse has completed. `Returned` and `Errored` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    NilHandling,
    PrefaultRetry,
    Coerced,
    Extracted,
    Checked,
    Transformed,
    Converted,
    Errored,
    Returned,
}

struct Pipeline<'a> {
    schema: &'a Schema,
    ctx: &'a ParseContext,
    payload: ParsePayload,
    retried: bool,
}

impl<'a> Pipeline<'a> {
    fn advance(&mut self, state: State) -> State {
        match state {
            State::NilHandling => self.handle_nil(),
            State::PrefaultRetry => self.coerce(),
            State::Coerced => self.extract(),
            State::Extracted => self.run_checks(),
            State::Checked => self.transform(),
            State::Transformed => State::Converted,
            State::Converted => {
                if self.payload.has_issues() {
                    State::Errored
                } else {
                    State::Returned
                }
            }
            State::Errored | State::Returned => state,
        }
    }

    fn handle_nil(&mut self) -> State {
        if !self.payload.value.is_null() {
            return self.coerce();
        }

        let internals = self.schema.internals();
        if internals.nonoptional {
            self.payload
                .push(RawIssue::nonoptional_violation(&self.payload.value));
            return State::Errored;
        }
        if internals.optional || internals.nilable {
            return State::Returned;
        }
        if let Some(default) = &internals.default {
            trace!(kind = %self.schema.type_tag(), "nil input replaced by default");
            self.payload.value = default.produce();
            return State::Converted;
        }
        if let Some(prefault) = &internals.prefault {
            trace!(kind = %self.schema.type_tag(), "nil input replaced by prefault");
            self.payload.value = prefault.produce();
            self.retried = true;
            return State::PrefaultRetry;
        }
        if self.schema.def().passes_nil() {
            return self.coerce();
        }

        self.payload.push(RawIssue::invalid_type(
            self.schema.def().expected(),
            &self.payload.value,
        ));
        State::Errored
    }

    fn coerce(&mut self) -> State {
        if !self.schema.internals().coerce {
            return State::Coerced;
        }

        match self.schema.def().coerce(&self.payload.value) {
            Some(value) => {
                self.payload.value = value;
                State::Coerced
            }
            None => {
                self.payload.push(RawIssue::invalid_type(
                    self.schema.def().expected(),
                    &self.payload.value,
                ));
                self.fail()
            }
        }
    }

    fn extract(&mut self) -> State {
        self.schema.def().validate(&mut self.payload, self.ctx);
        if self.payload.is_aborted() {
            self.fail()
        } else {
            State::Extracted
        }
    }

    fn run_checks(&mut self) -> State {
        for check in self.schema.internals().checks() {
            if self.payload.is_aborted() {
                break;
            }
            check.run(&mut self.payload, self.ctx);
        }
        if self.payload.has_issues() {
            self.fail()
        } else {
            State::Checked
        }
    }

    /// Discards a failed attempt in favour of the prefault, once per parse.
    fn fail(&mut self) -> State {
        if self.retried {
            return State::Errored;
        }
        match &self.schema.internals().prefault {
            Some(prefault) => {
                trace!(kind = %self.schema.type_tag(), "failed input replaced by prefault");
                self.payload = ParsePayload::new(prefault.produce());
                self.retried = true;
                State::PrefaultRetry
            }
            None => State::Errored,
        }
    }

    fn transform(&mut self) -> State {
        self.schema.def().transform(&mut self.payload, self.ctx);
        State::Transformed
    }
}

/// Drives `schema` over `input`. Issues are left raw so that enclosing
/// composites can prefix their paths before finalization.
pub(crate) fn run(schema: &Schema, input: Value, ctx: &ParseContext) -> ParsePayload {
    trace!(kind = %schema.type_tag(), "parse");

    let mut pipeline = Pipeline {
        schema,
        ctx,
        payload: ParsePayload::new(input),
        retried: false,
    };

    let mut state = State::NilHandling;
    while !matches!(state, State::Errored | State::Returned) {
        state = pipeline.advance(state);
    }

    let mut payload = pipeline.payload;
    trace!(kind = %schema.type_tag(), state = ?state, issue_count = payload.issues.len(), "parsed");
    for issue in &mut payload.issues {
        if issue.inst.is_none() {
            issue.inst = Some(schema.clone());
        }
    }
    payload
}

pub(crate) fn into_error(issues: Vec<RawIssue>, ctx: &ParseContext) -> ParseError {
    let config = config::current();
    ParseError::new(
        issues
            .into_iter()
            .map(|issue| issue.finalize(ctx, &config))
            .collect(),
    )
}

pub(crate) fn finish(payload: ParsePayload, ctx: &ParseContext) -> Result<Value, ParseError> {
    if payload.issues.is_empty() {
        Ok(payload.value)
    } else {
        Err(into_error(payload.issues, ctx))
    }
}
