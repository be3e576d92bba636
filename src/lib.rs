#![allow(clippy::doc_markdown)] // Allow technical terms like ZeroMQ, PostgreSQL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Dispatch Broker
//!
//! Asynchronous job dispatch broker: accepts command requests from many clients
//! on one multiplexing socket, hands them to a pool of workers through a durable
//! queue, and routes each result back to the client that asked for it.
//!
//! ## Overview
//!
//! Ingress and execution are decoupled by the queue. The router never runs a
//! command and a worker never touches the socket, so the two sides share no
//! in-process state. The router alone keeps the time-bounded correlation map
//! from job id to client.
//!
//! ```text
//! client → Router.ingress → Queue(work) → Worker → handler
//!        ← Router.egress  ← Queue(response) ←──────┘
//! ```
//!
//! Delivery is at-most-once: a job a worker crashes on is lost, and a response
//! that arrives after its correlation entry expired is dropped.
//!
//! ## Module Organization
//!
//! - [`router`] - ingress and egress loops over the client socket
//! - [`worker`] - worker loop and pool
//! - [`registry`] - command handler contract, validation and dispatch
//! - [`commands`] - built-in command handlers
//! - [`queue`] - Durable Queue contract, adapters and retry policy
//! - [`correlation`] - expiring correlation map from job id to client envelope
//! - [`timing`] - per-job latency timer
//! - [`transport`] - socket contract and adapters
//! - [`messaging`] - wire payloads, envelopes and queue records
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging setup
//! - [`bootstrap`] - wiring and task supervision
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dispatch_broker::bootstrap::BrokerSystem;
//! use dispatch_broker::commands::register_builtin_commands;
//! use dispatch_broker::config::ConfigManager;
//! use dispatch_broker::registry::CommandRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let broker = BrokerSystem::start(manager.config(), registry).await?;
//! broker.shutdown_signal().trigger_on_ctrl_c();
//! broker.run_until_shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test                                   # unit + integration tests
//! TEST_DATABASE_URL=postgresql://... cargo test  # include pgmq tests
//! ```

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod constants;
pub mod correlation;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod queue;
pub mod registry;
pub mod router;
pub mod shutdown;
pub mod timing;
pub mod transport;
pub mod worker;

pub use bootstrap::BrokerSystem;
pub use config::{BrokerConfig, ConfigManager, ConfigurationError};
pub use constants::ResponseCode;
pub use error::{BrokerError, BrokerResult};
pub use messaging::{ClientEnvelope, CommandRequest, CommandResponse, JobId};
pub use queue::{InMemoryQueue, JobQueue, QueueError, RetryPolicy};
pub use registry::{CommandError, CommandHandler, CommandOutcome, CommandRegistry};
pub use router::Router;
pub use shutdown::ShutdownSignal;
pub use worker::{Worker, WorkerPool};
