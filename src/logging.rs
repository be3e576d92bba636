//! # Logging
//!
//! Console output plus a JSON log file per process, so a job can be followed
//! from ingress through a worker to egress by its `job_id`.
//!
//! The environment (`BROKER_ENV`, then `APP_ENV`, default `development`) picks the
//! default level; `RUST_LOG` replaces it entirely.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGING: OnceLock<()> = OnceLock::new();

const LOG_DIR: &str = "log";

type JsonFileLayer<S> = fmt::Layer<S, JsonFields, Format<Json>, NonBlocking>;

/// Install the global subscriber
///
/// Only the first call does anything. An already installed global subscriber is
/// kept as is.
pub fn init_structured_logging() {
    LOGGING.get_or_init(|| {
        let environment = broker_environment();
        let level = default_level(&environment);
        let log_dir = PathBuf::from(LOG_DIR);
        let log_file = format!(
            "{environment}.{}.{}.log",
            std::process::id(),
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(level_filter(level));

        let (file, guard) = match json_file_layer(&log_dir, &log_file) {
            Some((layer, guard)) => (Some(layer.with_filter(level_filter(level))), Some(guard)),
            None => (None, None),
        };
        let writes_file = file.is_some();

        if tracing_subscriber::registry()
            .with(console)
            .with(file)
            .try_init()
            .is_err()
        {
            tracing::debug!("Tracing subscriber already installed, keeping it");
        }

        if writes_file {
            tracing::info!(
                environment = %environment,
                log_file = %log_dir.join(&log_file).display(),
                "🔧 Logging to console and file"
            );
        } else {
            tracing::warn!(
                environment = %environment,
                log_dir = LOG_DIR,
                "🔧 Log directory unavailable, logging to console only"
            );
        }

        // the writer thread must outlive every log call
        std::mem::forget(guard);
    });
}

fn json_file_layer<S>(dir: &Path, file_name: &str) -> Option<(JsonFileLayer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if !dir.exists() && std::fs::create_dir_all(dir).is_err() {
        return None;
    }
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(false);
    Some((layer, guard))
}

fn level_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn broker_environment() -> String {
    std::env::var("BROKER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| String::from("development"))
}

fn default_level(environment: &str) -> &'static str {
    if environment == "production" {
        "info"
    } else {
        "debug"
    }
}

/// One step in a job's life: enqueue, execute, deliver
pub fn log_job_operation(
    operation: &str,
    job_id: &str,
    command: Option<&str>,
    worker_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        job_id = %job_id,
        command = command,
        worker_id = worker_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 JOB_OPERATION"
    );
}

/// Durable Queue call with its outcome
pub fn log_queue_operation(
    operation: &str,
    queue: &str,
    backend: &str,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        queue = %queue,
        backend = %backend,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💾 QUEUE_OPERATION"
    );
}

pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
