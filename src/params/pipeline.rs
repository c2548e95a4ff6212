//! Decode-then-validate access to request parameters.

use serde_json::Value;

use crate::failure::Failure;
use crate::http::context::RequestContext;
use crate::params::decode::decode_value;
use crate::params::validator::{TypeValidator, PARAMS_SECTION};

/// Parameter access for one request, bound to a type validator.
#[derive(Clone, Copy)]
pub struct ParamPipeline<'a> {
    ctx: &'a RequestContext,
    validator: &'a dyn TypeValidator,
}

impl<'a> ParamPipeline<'a> {
    pub fn new(ctx: &'a RequestContext, validator: &'a dyn TypeValidator) -> Self {
        Self { ctx, validator }
    }

    pub fn context(&self) -> &'a RequestContext {
        self.ctx
    }

    /// Decode `raw`; validate it only when present. Absence is not an error.
    pub fn optional(
        &self,
        name: &str,
        raw: Option<&Value>,
        declared: &str,
    ) -> Result<Option<Value>, Failure> {
        let decoded = decode_value(raw);
        if let Some(value) = &decoded {
            self.validate(name, value, declared)?;
        }
        Ok(decoded)
    }

    /// Decode and validate `raw`, failing when it is absent.
    #[track_caller]
    pub fn required(&self, name: &str, raw: Option<&Value>, declared: &str) -> Result<Value, Failure> {
        match decode_value(raw) {
            Some(value) => {
                self.validate(name, &value, declared)?;
                Ok(value)
            }
            None => Err(Failure::generic(format!(
                "Required parameter is missing - {}",
                name
            ))),
        }
    }

    /// Like [`required`](Self::required), but keeps the raw text instead of decoding it.
    #[track_caller]
    pub fn required_text(
        &self,
        name: &str,
        raw: Option<&Value>,
        declared: &str,
    ) -> Result<String, Failure> {
        let text = match raw {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => {
                return Err(Failure::generic(format!(
                    "Required parameter is missing - {}",
                    name
                )))
            }
            Some(other) => other.to_string(),
        };
        self.validate(name, &Value::String(text.clone()), declared)?;
        Ok(text)
    }

    /// Look `param` up in the request (or use `default`), then decode and validate.
    pub fn named_with_default(
        &self,
        declared: &str,
        param: &str,
        default: Option<Value>,
    ) -> Result<Option<Value>, Failure> {
        let raw = match self.ctx.param(param) {
            Some(value) => Some(value.clone()),
            None => default,
        };
        self.optional(param, raw.as_ref(), declared)
    }

    /// Run the type validator; any reported error becomes a validation failure.
    pub fn validate(&self, name: &str, value: &Value, declared: &str) -> Result<(), Failure> {
        let report = self
            .validator
            .check_types(name, value, declared, PARAMS_SECTION);
        if report.is_passed() {
            Ok(())
        } else {
            tracing::debug!(param = name, declared, errors = ?report.errors, "Parameter rejected");
            Err(Failure::validation(report.errors))
        }
    }
}
