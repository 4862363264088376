//! Viewer component: bus I/O on a background thread, commands on this one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bus_runtime::{CommandRegistry, ComponentClient, Identity};
use bus_transport::{TcpEndpoints, TcpTransport};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::info;
use viewer_commands::ViewerState;
use viewer_config_and_utils::Config;

/// Run the viewer until SIGINT/SIGTERM or until the I/O thread stops.
pub fn serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let identity = Identity::new(&config.logical_address, &config.physical_address())
        .with_component_type(&config.component_type);
    let endpoints = TcpEndpoints::new(
        &config.relay_host,
        config.subscribe_port,
        config.publish_port,
    );

    info!(
        logical_address = %identity.logical_address,
        physical_address = %identity.physical_address,
        subscribe = %endpoints.subscribe_addr(),
        publish = %endpoints.publish_addr(),
        "Starting viewer"
    );

    let mut registry = CommandRegistry::new();
    viewer_commands::register(&mut registry);

    let (mut client, mut inbox) = ComponentClient::builder(identity)
        .poll_timeout(config.poll_interval())
        .send_received(config.send_received)
        .start(registry, move || async move {
            TcpTransport::connect(&endpoints).await
        })?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown))?;

    let mut state = ViewerState::default();
    let tick = config.owner_tick();

    info!("Viewer ready");

    while !shutdown.load(Ordering::Relaxed) {
        inbox.drain(&mut state);
        if inbox.is_disconnected() || !client.is_running() {
            info!("Bus I/O thread stopped");
            break;
        }
        std::thread::sleep(tick);
    }

    if shutdown.load(Ordering::Relaxed) {
        info!("Received shutdown signal");
    }

    // Answer anything already handed over before the I/O thread flushes.
    inbox.drain(&mut state);
    client.shutdown();

    info!("Viewer stopped");
    Ok(())
}
