//! # Command Registry
//!
//! Typed dispatch table from command name to handler.
//!
//! ## Overview
//!
//! Commands implement [`CommandHandler`] and are registered explicitly at startup.
//! Workers share the finished [`CommandRegistry`] behind an `Arc` and never mutate it.
//!
//! ## Architecture
//!
//! ```text
//! Command Registry
//! ├── CommandHandler   (name, required params, async invoke)
//! ├── CommandRegistry  (lookup, validation, dispatch)
//! └── CommandError     (client-facing failure taxonomy)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use dispatch_broker::commands::register_builtin_commands;
//! use dispatch_broker::messaging::{CommandRequest, JobId};
//! use dispatch_broker::registry::{CommandContext, CommandRegistry};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//! assert!(registry.contains("dnd_dice_roll"));
//!
//! let params = json!({"rolls": ["2d6"]}).as_object().cloned().unwrap();
//! let request = CommandRequest::new("dnd_dice_roll", params);
//! let ctx = CommandContext::new(JobId::generate(), "worker-0".to_string());
//! let response = registry.dispatch(&request, &ctx).await;
//! assert!(response.is_success());
//! # });
//! ```

pub mod command_registry;
pub mod errors;
pub mod handler;

pub use command_registry::CommandRegistry;
pub use errors::CommandError;
pub use handler::{
    param_str, param_str_list, param_text, CommandContext, CommandHandler, CommandOutcome,
};
