use crate::context::{ParseContext, ParsePayload, RefinementContext};
use crate::internals::BoxError;
use crate::issue::RawIssue;
use crate::schema::{Schema, SchemaDef};
use crate::tag::TypeTag;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Parses with `input`, then parses that output with `output`. The second
/// stage does not run when the first one raised issues.
#[derive(Clone, Debug)]
pub struct PipeDef {
    input: Schema,
    output: Schema,
}

impl PipeDef {
    pub fn input(&self) -> &Schema {
        &self.input
    }

    pub fn output(&self) -> &Schema {
        &self.output
    }
}

impl SchemaDef for PipeDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Pipe
    }

    fn expected(&self) -> String {
        self.input.def().expected()
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Ok(input)
    }

    fn validate(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let first = self.input.run(payload.take_value(), ctx);
        if !first.issues.is_empty() {
            payload.value = first.value;
            payload.issues.extend(first.issues);
            return;
        }
        let second = self.output.run(first.value, ctx);
        payload.value = second.value;
        payload.issues.extend(second.issues);
    }

    fn passes_nil(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn pipe(input: &Schema, output: &Schema) -> Schema {
    Schema::new(PipeDef {
        input: input.clone(),
        output: output.clone(),
    })
}

pub type TransformFn =
    dyn Fn(Value, &mut RefinementContext<'_>) -> Result<Value, BoxError> + Send + Sync;

/// Maps any input through a function. Issues added to the refinement
/// context, or an `Err`, fail the parse.
#[derive(Clone)]
pub struct TransformDef {
    func: Arc<TransformFn>,
}

impl fmt::Debug for TransformDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformDef").finish_non_exhaustive()
    }
}

impl SchemaDef for TransformDef {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Transform
    }

    fn extract(&self, input: Value) -> Result<Value, Value> {
        Ok(input)
    }

    fn transform(&self, payload: &mut ParsePayload, ctx: &ParseContext) {
        let input = payload.take_value();
        let mut refinement = RefinementContext::new(ctx, input.clone());
        match (self.func)(input, &mut refinement) {
            Ok(value) => payload.value = value,
            Err(err) => {
                let issue = RawIssue::custom(refinement.input()).with_message(err.to_string());
                payload.value = refinement.input().clone();
                payload.push(issue);
            }
        }
        payload.issues.extend(refinement.into_issues());
    }

    fn passes_nil(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn transform<F>(f: F) -> Schema
where
    F: Fn(Value, &mut RefinementContext<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    Schema::new(TransformDef { func: Arc::new(f) })
}
