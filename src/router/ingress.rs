//! Ingress loop: socket frames in, jobs onto the work queue.

use super::Router;
use crate::error::BrokerResult;
use crate::logging::log_error;
use crate::messaging::{ClientEnvelope, CommandRequest, CommandResponse, JobId, WorkRecord};
use crate::shutdown::ShutdownSignal;
use crate::transport::Frames;
use tracing::{debug, error, info, warn};

/// What one ingress iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressOutcome {
    /// Nothing was waiting on the socket
    Idle,
    /// A job was queued
    Enqueued(JobId),
    /// The message was answered with a failure reply (or dropped) and not queued
    Rejected,
    /// The socket reported an error
    TransportError,
}

impl Router {
    /// Receive and handle at most one message
    ///
    /// Only a queue write that exhausted its retries is returned as `Err`.
    pub async fn ingress_tick(&self) -> BrokerResult<IngressOutcome> {
        let frames = match self.transport.try_recv() {
            Ok(Some(frames)) => frames,
            Ok(None) => return Ok(IngressOutcome::Idle),
            Err(e) => {
                log_error("router", "receive", &e.to_string(), Some("ingress"));
                return Ok(IngressOutcome::TransportError);
            }
        };

        self.handle_frames(frames).await
    }

    async fn handle_frames(&self, frames: Frames) -> BrokerResult<IngressOutcome> {
        let (envelope, payload) = match ClientEnvelope::split_frames(frames.clone()) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(parts = frames.len(), error = %e, "Rejecting malformed frame");
                if let Some(envelope) = ClientEnvelope::salvage_identity(&frames) {
                    self.reply(&envelope, &CommandResponse::failure(e.to_string(), ""));
                }
                return Ok(IngressOutcome::Rejected);
            }
        };

        let request = match CommandRequest::parse(&payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(client = %envelope.identity_hex(), error = %e, "Rejecting malformed request");
                self.reply(&envelope, &CommandResponse::from(&e));
                return Ok(IngressOutcome::Rejected);
            }
        };

        match self.enqueue(envelope.clone(), &payload).await {
            Ok(job_id) => {
                info!(
                    job_id = %job_id,
                    command = %request.command,
                    client = %envelope.identity_hex(),
                    "📥 Job enqueued"
                );
                Ok(IngressOutcome::Enqueued(job_id))
            }
            Err(e) if e.is_queue_exhausted() => {
                error!(
                    command = %request.command,
                    client = %envelope.identity_hex(),
                    error = %e,
                    "💥 Work queue unreachable, giving up"
                );
                self.reply(
                    &envelope,
                    &CommandResponse::failure("Job could not be queued", e.to_string()),
                );
                Err(e)
            }
            Err(e) => {
                log_error("router", "enqueue", &e.to_string(), Some(&request.command));
                self.reply(
                    &envelope,
                    &CommandResponse::failure("Request could not be processed", e.to_string()),
                );
                Ok(IngressOutcome::Rejected)
            }
        }
    }

    /// Persist one job and remember where its reply goes
    ///
    /// The correlation entry and timer exist before the job is visible to any
    /// worker, and are removed again if the job never reaches the queue.
    pub async fn enqueue(&self, envelope: ClientEnvelope, payload: &[u8]) -> BrokerResult<JobId> {
        let job_id = JobId::generate();
        let record = WorkRecord::new(&job_id, &envelope, payload).to_record()?;

        self.correlation.register(&job_id, envelope);
        self.timer.start(&job_id);

        if let Err(e) = self.push_work(&record).await {
            self.correlation.forget(&job_id);
            self.timer.discard(&job_id);
            return Err(e.into());
        }

        Ok(job_id)
    }

    async fn push_work(&self, record: &str) -> crate::queue::QueueResult<()> {
        let queue = &self.queue;
        let name = self.settings.work_queue.as_str();
        let ttl = self.settings.work_ttl;

        self.retry
            .run(name, "push", move || async move { queue.push(name, record).await })
            .await?;

        // the job is queued at this point, so a lost expiry refresh must not fail it
        if let Err(e) = self
            .retry
            .run(name, "expire", move || async move { queue.expire(name, ttl).await })
            .await
        {
            warn!(queue = %name, error = %e, "Work queue expiry not refreshed");
        }
        Ok(())
    }

    pub(super) fn reply(&self, envelope: &ClientEnvelope, response: &CommandResponse) {
        if let Err(e) = self
            .transport
            .send(envelope.reply_frames(response.to_bytes()))
        {
            log_error("router", "send", &e.to_string(), Some("failure reply"));
        }
    }

    /// Run ingress until shutdown
    pub async fn run_ingress(&self, shutdown: ShutdownSignal) -> BrokerResult<()> {
        info!(
            transport = self.transport_name(),
            work_queue = %self.settings.work_queue,
            "🚀 Ingress loop started"
        );

        while !shutdown.is_triggered() {
            match self.ingress_tick().await? {
                IngressOutcome::Idle | IngressOutcome::TransportError => {
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
                IngressOutcome::Enqueued(_) | IngressOutcome::Rejected => {
                    tokio::task::yield_now().await;
                }
            }
        }

        debug!("Ingress loop stopped");
        Ok(())
    }
}
