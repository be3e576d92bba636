//! `test_async`: suspends without blocking its worker, then answers `"slept"`.

use crate::messaging::CommandParams;
use crate::registry::{CommandContext, CommandHandler, CommandOutcome};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_SLEEP: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct TestAsync {
    duration: Duration,
}

impl Default for TestAsync {
    fn default() -> Self {
        Self::new(DEFAULT_SLEEP)
    }
}

impl TestAsync {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl CommandHandler for TestAsync {
    fn name(&self) -> &str {
        "test_async"
    }

    async fn invoke(
        &self,
        _params: &CommandParams,
        _ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        tokio::time::sleep(self.duration).await;
        Ok(CommandOutcome::completed("slept"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::JobId;

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_then_answers() {
        let started = tokio::time::Instant::now();
        let outcome = TestAsync::default()
            .invoke(
                &CommandParams::new(),
                &CommandContext::new(JobId::generate(), "worker-0"),
            )
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::completed("slept"));
        assert!(started.elapsed() >= DEFAULT_SLEEP);
    }
}
