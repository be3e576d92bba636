//! # Command Registry
//!
//! Name-indexed table of [`CommandHandler`]s, built once at startup and shared
//! read-only by every worker.
//!
//! `dispatch` is the single entry point workers use: it validates a request against
//! the registry, invokes the handler and folds every outcome (success, rejection,
//! validation error, handler error or panic) into a [`CommandResponse`].

use super::errors::CommandError;
use super::handler::{CommandContext, CommandHandler, CommandOutcome};
use crate::messaging::{CommandRequest, CommandResponse};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Registry of every command the broker can execute
#[derive(Default, Clone)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("handler_count", &self.handlers.len())
            .field("handler_names", &self.names())
            .finish()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own name, replacing any previous handler
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        let name = handler.name().to_string();
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!(command = %name, "Replacing existing command handler");
        } else {
            debug!(command = %name, "📝 Registered command handler");
        }
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(command).cloned()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve the handler for `request` and check its required parameters
    ///
    /// Parameters are checked in the order the handler declares them, so the first
    /// missing one is the one reported.
    pub fn validate(
        &self,
        request: &CommandRequest,
    ) -> Result<Arc<dyn CommandHandler>, CommandError> {
        let handler = self
            .get(&request.command)
            .ok_or_else(|| CommandError::unknown_command(&request.command))?;

        if let Some(missing) = handler
            .required_params()
            .iter()
            .find(|param| !request.params.contains_key(**param))
        {
            return Err(CommandError::missing_parameter(&request.command, *missing));
        }

        Ok(handler)
    }

    /// Validate and execute `request`, producing the response for the client
    ///
    /// Never fails: every error is recovered into a failure response.
    pub async fn dispatch(&self, request: &CommandRequest, ctx: &CommandContext) -> CommandResponse {
        match self.execute(request, ctx).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    job_id = %ctx.job_id,
                    worker_id = %ctx.worker_id,
                    command = %request.command,
                    kind = err.kind(),
                    error = %err,
                    "Command failed"
                );
                CommandResponse::from(err)
            }
        }
    }

    async fn execute(
        &self,
        request: &CommandRequest,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandError> {
        let handler = self.validate(request)?;
        let started = Instant::now();

        let invocation = AssertUnwindSafe(handler.invoke(&request.params, ctx))
            .catch_unwind()
            .await;

        let outcome = match invocation {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                error!(
                    job_id = %ctx.job_id,
                    worker_id = %ctx.worker_id,
                    command = %request.command,
                    error = ?err,
                    "❌ Command handler returned an error"
                );
                return Err(CommandError::handler_failure(&request.command, &err));
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    job_id = %ctx.job_id,
                    worker_id = %ctx.worker_id,
                    command = %request.command,
                    panic = %message,
                    "❌ Command handler panicked"
                );
                return Err(CommandError::HandlerFailure {
                    command: request.command.clone(),
                    message: format!("handler panicked: {message}"),
                    trace: String::new(),
                });
            }
        };

        info!(
            job_id = %ctx.job_id,
            worker_id = %ctx.worker_id,
            command = %request.command,
            status = outcome.status_code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command executed"
        );

        match outcome {
            CommandOutcome::Completed(result) => Ok(CommandResponse::success(result)),
            CommandOutcome::Rejected(reason) => {
                Err(CommandError::rejected(&request.command, reason))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
