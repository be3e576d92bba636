//! # PostgreSQL Message Queue Adapter
//!
//! [`JobQueue`] backed by pgmq. Records are stored as JSON strings.
//!
//! `pop` is pgmq's own pop, which reads and deletes the head message in one
//! statement, so a record is never handed to two consumers. pgmq has no key expiry;
//! `expire` instead records a lifetime for the queue and `pop` skips (and deletes)
//! any record enqueued before that window.

use super::errors::{QueueError, QueueResult};
use super::JobQueue;
use async_trait::async_trait;
use dashmap::DashMap;
use pgmq::PGMQueue;
use std::time::Duration;
use tracing::{debug, info};

/// pgmq-backed Durable Queue
#[derive(Debug, Clone)]
pub struct PgmqJobQueue {
    pgmq: PGMQueue,
    lifetimes: DashMap<String, Duration>,
}

impl PgmqJobQueue {
    /// Connect to PostgreSQL and make sure every named queue exists
    pub async fn connect(database_url: &str, queues: &[&str]) -> QueueResult<Self> {
        info!("🚀 Connecting job queue to pgmq");

        let pgmq = PGMQueue::new(database_url.to_string()).await?;
        for queue in queues {
            validate_queue_name(queue)?;
            pgmq.create(queue)
                .await
                .map_err(|e| QueueError::operation(*queue, "create", e.to_string()))?;
            debug!(queue = %queue, "📋 pgmq queue ready");
        }

        info!("✅ pgmq job queue connected");
        Ok(Self {
            pgmq,
            lifetimes: DashMap::new(),
        })
    }

    fn is_stale(&self, queue: &str, enqueued_at: chrono::DateTime<chrono::Utc>) -> bool {
        let Some(lifetime) = self.lifetimes.get(queue).map(|entry| *entry) else {
            return false;
        };
        let age = chrono::Utc::now().signed_duration_since(enqueued_at);
        age.to_std().map(|age| age > lifetime).unwrap_or(false)
    }
}

/// pgmq queue names become table names, so only a conservative charset is allowed
fn validate_queue_name(queue: &str) -> QueueResult<()> {
    let valid = !queue.is_empty()
        && queue
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(QueueError::operation(
            queue,
            "validate",
            "queue names may only contain ASCII letters, digits and underscores",
        ))
    }
}

#[async_trait]
impl JobQueue for PgmqJobQueue {
    async fn push(&self, queue: &str, record: &str) -> QueueResult<()> {
        let message = serde_json::Value::String(record.to_string());
        let msg_id = self
            .pgmq
            .send(queue, &message)
            .await
            .map_err(|e| QueueError::operation(queue, "push", e.to_string()))?;
        debug!(queue = %queue, msg_id = msg_id, "📤 Record pushed");
        Ok(())
    }

    async fn pop(&self, queue: &str) -> QueueResult<Option<String>> {
        loop {
            let message = self
                .pgmq
                .pop::<serde_json::Value>(queue)
                .await
                .map_err(|e| QueueError::operation(queue, "pop", e.to_string()))?;

            let Some(message) = message else {
                return Ok(None);
            };

            if self.is_stale(queue, message.enqueued_at) {
                debug!(
                    queue = %queue,
                    msg_id = message.msg_id,
                    "🗑️ Discarding record older than queue lifetime"
                );
                continue;
            }

            return match message.message {
                serde_json::Value::String(record) => Ok(Some(record)),
                other => Ok(Some(other.to_string())),
            };
        }
    }

    async fn expire(&self, queue: &str, ttl: Duration) -> QueueResult<()> {
        self.lifetimes.insert(queue.to_string(), ttl);
        Ok(())
    }

    async fn len(&self, queue: &str) -> QueueResult<usize> {
        validate_queue_name(queue)?;
        let sql = format!("SELECT count(*) FROM pgmq.q_{queue}");
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pgmq.connection)
            .await
            .map_err(|e| QueueError::operation(queue, "len", e.to_string()))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "pgmq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_name_validation() {
        assert!(validate_queue_name("job_queue").is_ok());
        assert!(validate_queue_name("response_queue_2").is_ok());
        assert!(validate_queue_name("").is_err());
        assert!(validate_queue_name("jobs; drop table").is_err());
        assert!(validate_queue_name("job-queue").is_err());
    }

    #[tokio::test]
    async fn test_push_pop_round_trip() {
        // Requires PostgreSQL with the pgmq extension
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            println!("Skipping pgmq test - no TEST_DATABASE_URL provided");
            return;
        };

        let queue = PgmqJobQueue::connect(&database_url, &["broker_test_queue"])
            .await
            .expect("Failed to connect pgmq job queue");

        while queue.pop("broker_test_queue").await.unwrap().is_some() {}

        queue.push("broker_test_queue", "first").await.unwrap();
        queue.push("broker_test_queue", "second").await.unwrap();
        assert_eq!(queue.len("broker_test_queue").await.unwrap(), 2);

        assert_eq!(
            queue.pop("broker_test_queue").await.unwrap().as_deref(),
            Some("first")
        );
        assert_eq!(queue.len("broker_test_queue").await.unwrap(), 1);
        assert_eq!(
            queue.pop("broker_test_queue").await.unwrap().as_deref(),
            Some("second")
        );
        assert_eq!(queue.pop("broker_test_queue").await.unwrap(), None);
        assert_eq!(queue.len("broker_test_queue").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_pops_never_share_a_record() {
        // Requires PostgreSQL with the pgmq extension
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            println!("Skipping pgmq test - no TEST_DATABASE_URL provided");
            return;
        };

        let queue = std::sync::Arc::new(
            PgmqJobQueue::connect(&database_url, &["broker_claim_queue"])
                .await
                .expect("Failed to connect pgmq job queue"),
        );
        while queue.pop("broker_claim_queue").await.unwrap().is_some() {}

        for i in 0..20 {
            queue.push("broker_claim_queue", &format!("record-{i}")).await.unwrap();
        }

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            consumers.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                while let Some(record) = queue.pop("broker_claim_queue").await.unwrap() {
                    claimed.push(record);
                }
                claimed
            }));
        }

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 20);
        assert_eq!(queue.len("broker_claim_queue").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_older_than_lifetime_are_skipped() {
        // Requires PostgreSQL with the pgmq extension
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            println!("Skipping pgmq test - no TEST_DATABASE_URL provided");
            return;
        };

        let queue = PgmqJobQueue::connect(&database_url, &["broker_stale_queue"])
            .await
            .expect("Failed to connect pgmq job queue");
        while queue.pop("broker_stale_queue").await.unwrap().is_some() {}

        queue.push("broker_stale_queue", "old").await.unwrap();
        queue.expire("broker_stale_queue", Duration::from_millis(200)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        queue.push("broker_stale_queue", "fresh").await.unwrap();

        assert_eq!(
            queue.pop("broker_stale_queue").await.unwrap().as_deref(),
            Some("fresh")
        );
        assert_eq!(queue.len("broker_stale_queue").await.unwrap(), 0);
    }
}
