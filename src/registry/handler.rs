//! # Command Handler Contract
//!
//! A command is a named, async operation with a fixed set of required
//! parameters. Handlers are registered explicitly at startup and looked up by
//! name for every job.

use crate::messaging::{CommandParams, JobId};
use async_trait::async_trait;
use serde_json::Value;

/// What a handler produced for one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Status code 0 with a result value
    Completed(Value),
    /// Status code 1 with a reason for the client
    Rejected(String),
}

impl CommandOutcome {
    pub fn completed(value: impl Into<Value>) -> Self {
        Self::Completed(value.into())
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    pub fn status_code(&self) -> u8 {
        match self {
            Self::Completed(_) => 0,
            Self::Rejected(_) => 1,
        }
    }
}

/// Per-invocation context handed to a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub job_id: JobId,
    pub worker_id: String,
}

impl CommandContext {
    pub fn new(job_id: JobId, worker_id: impl Into<String>) -> Self {
        Self {
            job_id,
            worker_id: worker_id.into(),
        }
    }
}

/// A registered command
///
/// `invoke` may suspend on external I/O; it runs on the worker's task and must not
/// block the thread. Returning `Err` is a handler failure: the worker converts it
/// into a failure response carrying the error chain as the trace.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Name clients use to call this command
    fn name(&self) -> &str;

    /// Parameters that must be present in every request
    fn required_params(&self) -> &[&'static str] {
        &[]
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome>;
}

/// String parameter `name`
pub fn param_str<'a>(params: &'a CommandParams, name: &str) -> anyhow::Result<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("param '{name}' must be a string"))
}

/// Parameter `name` as text: strings as-is, numbers in their JSON form
///
/// Clients send numeric settings either as `"1.5"` or `1.5`.
pub fn param_text(params: &CommandParams, name: &str) -> anyhow::Result<String> {
    match params.get(name) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(anyhow::anyhow!(
            "param '{name}' must be a string or number, got {other}"
        )),
        None => Err(anyhow::anyhow!("param '{name}' is missing")),
    }
}

/// Array-of-strings parameter `name`
pub fn param_str_list(params: &CommandParams, name: &str) -> anyhow::Result<Vec<String>> {
    let items = params
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("param '{name}' must be a list"))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("param '{name}' must only contain strings"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> CommandParams {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_param_helpers() {
        let p = params(json!({"text": "hi", "pitch": 2.5, "rolls": ["1d4", "2d6"]}));

        assert_eq!(param_str(&p, "text").unwrap(), "hi");
        assert!(param_str(&p, "pitch").is_err());
        assert_eq!(param_text(&p, "pitch").unwrap(), "2.5");
        assert_eq!(param_str_list(&p, "rolls").unwrap(), vec!["1d4", "2d6"]);
        assert!(param_str_list(&p, "text").is_err());
    }

    #[test]
    fn test_outcome_status_codes() {
        assert_eq!(CommandOutcome::completed("ok").status_code(), 0);
        assert_eq!(CommandOutcome::rejected("no").status_code(), 1);
    }
}
