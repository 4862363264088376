//! Development relay for running components on one machine.

use bus_transport::TcpRelay;
use tracing::info;
use viewer_config_and_utils::Config;

/// Fan every published line out to every subscriber until Ctrl+C.
///
/// Components publish to `publish_port` and subscribe on `subscribe_port`.
pub fn relay(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let inbound = format!("{}:{}", config.relay_host, config.publish_port);
        let outbound = format!("{}:{}", config.relay_host, config.subscribe_port);
        let relay = TcpRelay::bind(&inbound, &outbound).await?;

        tokio::select! {
            result = relay.run() => result?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                relay.shutdown();
            }
        }

        info!("Relay stopped");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
