//! One-shot command sender.

use std::time::Duration;

use bus_runtime::{CommandRegistry, ComponentClient, Envelope, Identity, ReplyKind};
use bus_transport::{TcpEndpoints, TcpTransport};
use tracing::debug;
use viewer_config_and_utils::Config;

/// Subscriptions are not replayed, so give the relay a moment to register
/// ours before publishing.
const RELAY_SETTLE: Duration = Duration::from_millis(100);

/// What to send, and to whom.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub to: String,
    pub instance: String,
    pub command: String,
    pub arg1: String,
    pub arg2: String,
    pub timeout: Duration,
}

/// Publish one request, print every reply to it, and fail on `ERROR`.
pub fn send(config: &Config, request: SendRequest) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(send_and_wait(config, request))
}

async fn send_and_wait(
    config: &Config,
    request: SendRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let pid = std::process::id();
    let identity = Identity::new("viewer-bus-cli", &format!("viewer-bus-cli-{}", pid))
        .with_component_type("cli");
    let endpoints = TcpEndpoints::new(
        &config.relay_host,
        config.subscribe_port,
        config.publish_port,
    );

    let envelope = Envelope::request(&request.to, &request.instance, &request.command)
        .with_args(&request.arg1, &request.arg2)
        .with_component_type("cli");
    let correlation_id = envelope.correlation_id().to_string();

    // The CLI answers no commands of its own.
    let registry: CommandRegistry<()> = CommandRegistry::new();
    let watched = correlation_id.clone();
    let (mut client, _inbox) = ComponentClient::builder(identity)
        .poll_timeout(config.poll_interval())
        .on_deliver(move |reply| {
            if reply.correlation_id() == watched && !reply.is_terminal() {
                print_reply(reply);
            }
        })
        .start(registry, move || async move {
            TcpTransport::connect(&endpoints).await
        })?;

    tokio::time::sleep(RELAY_SETTLE).await;

    debug!(
        correlation_id = %correlation_id,
        command = %request.command,
        to = %request.to,
        "Sending command"
    );

    let result = client.call(envelope, request.timeout).await;
    client.shutdown();

    let reply = result?;
    print_reply(&reply);
    if let Some(data) = reply.data() {
        println!("{}", serde_json::to_string_pretty(data)?);
    }

    match reply.reply_kind() {
        Some(ReplyKind::Error) => {
            Err(format!("{} failed: {}", request.command, reply.reply_text()).into())
        }
        _ => Ok(()),
    }
}

fn print_reply(reply: &Envelope) {
    let kind = reply.reply_kind().map(ReplyKind::as_str).unwrap_or("?");
    println!("{:<5} {}", kind, reply.reply_text());
}
