//! Shared helpers for broker integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use dispatch_broker::commands::{register_builtin_commands, register_speech_commands};
use dispatch_broker::commands::{SpeechSynthesizer, VoiceSettings};
use dispatch_broker::config::BrokerConfig;
use dispatch_broker::messaging::{CommandParams, CommandResponse};
use dispatch_broker::queue::{InMemoryQueue, JobQueue, QueueError, QueueResult, RetryPolicy};
use dispatch_broker::registry::{CommandContext, CommandHandler, CommandOutcome, CommandRegistry};
use dispatch_broker::router::Router;
use dispatch_broker::transport::MemoryTransport;
use dispatch_broker::worker::{Worker, WorkerSettings};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Queue whose writes always fail with a transient error
#[derive(Debug, Default)]
pub struct FailingQueue {
    pub push_attempts: AtomicU32,
    pub expire_attempts: AtomicU32,
}

impl FailingQueue {
    pub fn push_attempts(&self) -> u32 {
        self.push_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobQueue for FailingQueue {
    async fn push(&self, _queue: &str, _record: &str) -> QueueResult<()> {
        self.push_attempts.fetch_add(1, Ordering::SeqCst);
        Err(QueueError::connection("connection refused"))
    }

    async fn pop(&self, _queue: &str) -> QueueResult<Option<String>> {
        Ok(None)
    }

    async fn expire(&self, _queue: &str, _ttl: Duration) -> QueueResult<()> {
        self.expire_attempts.fetch_add(1, Ordering::SeqCst);
        Err(QueueError::connection("connection refused"))
    }

    async fn len(&self, _queue: &str) -> QueueResult<usize> {
        Ok(0)
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Queue that reads from an in-memory store but refuses writes to one list
#[derive(Debug)]
pub struct ReadOnlyListQueue {
    pub inner: InMemoryQueue,
    pub refused_queue: String,
    pub refused_attempts: AtomicU32,
}

impl ReadOnlyListQueue {
    pub fn new(refused_queue: &str) -> Self {
        Self {
            inner: InMemoryQueue::new(),
            refused_queue: refused_queue.to_string(),
            refused_attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl JobQueue for ReadOnlyListQueue {
    async fn push(&self, queue: &str, record: &str) -> QueueResult<()> {
        if queue == self.refused_queue {
            self.refused_attempts.fetch_add(1, Ordering::SeqCst);
            return Err(QueueError::connection("connection refused"));
        }
        self.inner.push(queue, record).await
    }

    async fn pop(&self, queue: &str) -> QueueResult<Option<String>> {
        self.inner.pop(queue).await
    }

    async fn expire(&self, queue: &str, ttl: Duration) -> QueueResult<()> {
        self.inner.expire(queue, ttl).await
    }

    async fn len(&self, queue: &str) -> QueueResult<usize> {
        self.inner.len(queue).await
    }

    fn backend_name(&self) -> &'static str {
        "read_only_list"
    }
}

/// In-memory queue whose expiry refreshes always fail
#[derive(Debug, Default)]
pub struct NoExpiryQueue {
    pub inner: InMemoryQueue,
    pub expire_attempts: AtomicU32,
}

#[async_trait]
impl JobQueue for NoExpiryQueue {
    async fn push(&self, queue: &str, record: &str) -> QueueResult<()> {
        self.inner.push(queue, record).await
    }

    async fn pop(&self, queue: &str) -> QueueResult<Option<String>> {
        self.inner.pop(queue).await
    }

    async fn expire(&self, _queue: &str, _ttl: Duration) -> QueueResult<()> {
        self.expire_attempts.fetch_add(1, Ordering::SeqCst);
        Err(QueueError::connection("connection reset"))
    }

    async fn len(&self, queue: &str) -> QueueResult<usize> {
        self.inner.len(queue).await
    }

    fn backend_name(&self) -> &'static str {
        "no_expiry"
    }
}

/// Handler that counts invocations and answers with its call number
#[derive(Debug)]
pub struct CountingHandler {
    name: String,
    required: &'static [&'static str],
    pub calls: AtomicUsize,
}

impl CountingHandler {
    pub fn new(name: &str, required: &'static [&'static str]) -> Self {
        Self {
            name: name.to_string(),
            required,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandHandler for CountingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_params(&self) -> &[&'static str] {
        self.required
    }

    async fn invoke(
        &self,
        _params: &CommandParams,
        _ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CommandOutcome::completed(call))
    }
}

/// Handler that errors, or panics when called with `{"panic": true}`
#[derive(Debug, Default)]
pub struct ExplodingHandler;

#[async_trait]
impl CommandHandler for ExplodingHandler {
    fn name(&self) -> &str {
        "explode"
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        _ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        if params.get("panic").and_then(Value::as_bool) == Some(true) {
            panic!("exploded on purpose");
        }
        Err(anyhow::anyhow!("exploded on purpose"))
    }
}

/// Synthesiser that returns the text as audio and counts calls
#[derive(Debug, Default)]
pub struct StubSynthesizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceSettings) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.as_bytes().to_vec())
    }
}

/// Defaults with a short retry delay
pub fn test_config() -> BrokerConfig {
    let mut config = BrokerConfig::default();
    config.queue.retry_delay_ms = 5;
    config.workers.count = 2;
    config.heartbeat.interval_secs = 3600;
    config
}

/// Built-in commands plus speech commands around `synthesizer`
pub fn full_registry(config: &BrokerConfig, synthesizer: Arc<StubSynthesizer>) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    register_speech_commands(&mut registry, synthesizer, &config.speech);
    registry
}

/// Router and one worker over an in-memory queue and transport
pub struct Harness {
    pub config: BrokerConfig,
    pub transport: Arc<MemoryTransport>,
    pub queue: Arc<InMemoryQueue>,
    pub router: Router,
    pub worker: Worker,
}

impl Harness {
    pub fn new(registry: CommandRegistry) -> Self {
        Self::with_config(test_config(), registry)
    }

    pub fn with_config(config: BrokerConfig, registry: CommandRegistry) -> Self {
        let transport = Arc::new(MemoryTransport::new());
        let queue = Arc::new(InMemoryQueue::new());
        let router = Router::new(transport.clone(), queue.clone(), &config);
        let worker = Worker::new(
            "worker-test",
            queue.clone(),
            Arc::new(registry),
            RetryPolicy::from_config(&config.queue),
            WorkerSettings::from_config(&config),
        );
        Self {
            config,
            transport,
            queue,
            router,
            worker,
        }
    }

    /// Inject a REQ-style request from `identity`
    pub fn send(&self, identity: &[u8], request: &Value) {
        self.transport.inject(vec![
            identity.to_vec(),
            Vec::new(),
            request.to_string().into_bytes(),
        ]);
    }

    /// Run ingress, one worker iteration and egress once each
    pub async fn step(&self) {
        self.router.ingress_tick().await.expect("ingress failed");
        self.worker.process_next().await.expect("worker failed");
        self.router.egress_tick().await;
    }

    /// Decoded replies sent so far, with the identity they were addressed to
    pub fn replies(&self) -> Vec<(Vec<u8>, CommandResponse)> {
        self.transport
            .take_sent()
            .into_iter()
            .map(|frames| {
                let payload = frames.last().cloned().unwrap_or_default();
                let response = CommandResponse::from_bytes(&payload).expect("reply is not a response");
                (frames[0].clone(), response)
            })
            .collect()
    }
}
