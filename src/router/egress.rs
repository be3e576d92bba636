//! Egress loop: responses off the response queue, replies out on the socket.

use super::Router;
use crate::error::BrokerResult;
use crate::logging::log_error;
use crate::messaging::{JobId, ResponseRecord};
use crate::shutdown::ShutdownSignal;
use tracing::{debug, info, warn};

/// What one egress iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The response queue was empty
    Idle,
    /// The reply was written to the socket
    Sent(JobId),
    /// No live correlation entry; the response was dropped
    Stale(JobId),
    /// The record could not be decoded or the socket write failed
    Failed,
}

impl Router {
    /// Pop and route at most one response. Never fails.
    pub async fn egress_tick(&self) -> Delivery {
        let queue = self.settings.response_queue.as_str();
        let record = match self.queue.pop(queue).await {
            Ok(Some(record)) => record,
            Ok(None) => return Delivery::Idle,
            Err(e) => {
                log_error("router", "pop", &e.to_string(), Some(queue));
                return Delivery::Failed;
            }
        };

        let response = match ResponseRecord::from_record(&record) {
            Ok(response) => response,
            Err(e) => {
                warn!(queue = %queue, error = %e, "Dropping undecodable response record");
                return Delivery::Failed;
            }
        };
        let job_id = response.job_id.clone();

        let Some(envelope) = self.correlation.take(&job_id) else {
            self.timer.discard(&job_id);
            warn!(job_id = %job_id, "Invalid or expired job, dropping response");
            return Delivery::Stale(job_id);
        };

        let payload = match response.payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.timer.discard(&job_id);
                warn!(job_id = %job_id, error = %e, "Dropping response with undecodable payload");
                return Delivery::Failed;
            }
        };

        let elapsed = self.timer.stop(&job_id);
        match self.transport.send(envelope.reply_frames(payload)) {
            Ok(()) => {
                info!(
                    job_id = %job_id,
                    client = %envelope.identity_hex(),
                    elapsed_ms = elapsed.map(|d| d.as_millis() as u64),
                    "📤 Response delivered"
                );
                Delivery::Sent(job_id)
            }
            Err(e) => {
                log_error("router", "send", &e.to_string(), Some(job_id.as_str()));
                Delivery::Failed
            }
        }
    }

    /// Run egress until shutdown
    pub async fn run_egress(&self, shutdown: ShutdownSignal) -> BrokerResult<()> {
        info!(
            response_queue = %self.settings.response_queue,
            "🚀 Egress loop started"
        );

        while !shutdown.is_triggered() {
            match self.egress_tick().await {
                Delivery::Idle | Delivery::Failed => {
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
                Delivery::Sent(_) | Delivery::Stale(_) => tokio::task::yield_now().await,
            }
        }

        debug!("Egress loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::BrokerConfig;
    use crate::messaging::{ClientEnvelope, CommandResponse, Job, ResponseRecord, WorkRecord};
    use crate::queue::{InMemoryQueue, JobQueue};
    use crate::router::{Delivery, IngressOutcome, Router};
    use crate::transport::MemoryTransport;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn router() -> (Router, Arc<MemoryTransport>, Arc<InMemoryQueue>) {
        let transport = Arc::new(MemoryTransport::new());
        let queue = Arc::new(InMemoryQueue::new());
        let router = Router::new(transport.clone(), queue.clone(), &BrokerConfig::default());
        (router, transport, queue)
    }

    /// Pop the queued job and answer it the way a worker would
    async fn complete_job(queue: &InMemoryQueue, response: &CommandResponse) -> Job {
        let record = queue.pop("job_queue").await.unwrap().unwrap();
        let job = WorkRecord::from_record(&record).unwrap().into_job().unwrap();
        let reply = ResponseRecord::new(&job, response).to_record().unwrap();
        queue.push("response_queue", &reply).await.unwrap();
        job
    }

    #[tokio::test]
    async fn test_reply_reuses_request_framing() {
        let (router, transport, queue) = router();
        transport.inject(vec![
            b"peer".to_vec(),
            Vec::new(),
            br#"{"command":"test_async","params":{}}"#.to_vec(),
        ]);

        let IngressOutcome::Enqueued(job_id) = router.ingress_tick().await.unwrap() else {
            panic!("expected job to be enqueued");
        };
        let response = CommandResponse::success(json!("slept"));
        complete_job(&queue, &response).await;

        assert_eq!(router.egress_tick().await, Delivery::Sent(job_id));
        assert_eq!(
            transport.take_sent(),
            vec![vec![b"peer".to_vec(), Vec::new(), response.to_bytes()]]
        );
        assert_eq!(router.correlation().pending(), 0);
        assert_eq!(router.timer().active(), 0);
    }

    #[tokio::test]
    async fn test_late_response_is_dropped() {
        let transport = Arc::new(MemoryTransport::new());
        let queue = Arc::new(InMemoryQueue::new());
        let mut config = BrokerConfig::default();
        config.correlation.ttl_secs = 1;
        let router = Router::new(transport.clone(), queue.clone(), &config);
        router
            .enqueue(ClientEnvelope::new(b"peer".to_vec(), None), b"{}")
            .await
            .unwrap();
        let job = complete_job(&queue, &CommandResponse::success(json!(1))).await;

        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert_eq!(router.egress_tick().await, Delivery::Stale(job.job_id));
        assert_eq!(transport.sent_count(), 0);
        assert_eq!(router.timer().active(), 0);
    }

    #[tokio::test]
    async fn test_empty_and_garbage_records() {
        let (router, _transport, queue) = router();
        assert_eq!(router.egress_tick().await, Delivery::Idle);

        queue.push("response_queue", "not a record").await.unwrap();
        assert_eq!(router.egress_tick().await, Delivery::Failed);
    }

    #[tokio::test]
    async fn test_malformed_request_gets_immediate_reply() {
        let (router, transport, queue) = router();
        transport.inject(vec![b"peer".to_vec(), br#"{"params":{}}"#.to_vec()]);

        assert_eq!(router.ingress_tick().await.unwrap(), IngressOutcome::Rejected);
        assert_eq!(queue.len("job_queue").await.unwrap(), 0);

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0], b"peer".to_vec());
        let reply = CommandResponse::from_bytes(&sent[0][1]).unwrap();
        assert!(!reply.is_success());
    }

    #[tokio::test]
    async fn test_unsplittable_frame_without_identity_is_dropped() {
        let (router, transport, _queue) = router();
        transport.inject(vec![b"lonely".to_vec()]);

        assert_eq!(router.ingress_tick().await.unwrap(), IngressOutcome::Rejected);
        assert_eq!(transport.sent_count(), 0);
    }
}
