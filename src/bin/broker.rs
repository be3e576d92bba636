//! # Dispatch Broker Server
//!
//! Loads configuration, registers the built-in commands and runs the broker
//! until Ctrl-C or a fatal queue failure. No speech synthesiser is wired in, so
//! the speech commands are not served by this binary.
//!
//! ```bash
//! BROKER_ENV=production BROKER__WORKERS__COUNT=8 dispatch-broker
//! ```

use dispatch_broker::commands::register_builtin_commands;
use dispatch_broker::logging::init_structured_logging;
use dispatch_broker::{BrokerSystem, CommandRegistry, ConfigManager};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let manager = ConfigManager::load()?;
    info!(
        environment = %manager.environment(),
        config_dir = %manager.config_directory().display(),
        "🔧 Configuration ready"
    );

    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let broker = BrokerSystem::start(manager.config(), registry).await?;
    broker.shutdown_signal().trigger_on_ctrl_c();

    if let Err(e) = broker.run_until_shutdown().await {
        error!(error = %e, "❌ Dispatch broker terminated");
        return Err(e.into());
    }

    info!("👋 Dispatch broker exited cleanly");
    Ok(())
}
