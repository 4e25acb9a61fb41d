use std::sync::Arc;

use wa_bridge::bridge::WsBridgeTransport;
use wa_bridge::channels::{Channel, WhatsAppChannel};
use wa_bridge::config::WhatsAppConfig;
use wa_bridge::pipeline::QueueHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WhatsAppConfig::from_env();

    eprintln!("📱 wa-bridge v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Bridge: {}", config.bridge_url);
    eprintln!("   Group logs: {}", config.group_log_dir.display());
    eprintln!(
        "   Monitored groups: {}",
        if config.monitor_groups.is_empty() {
            "all".to_string()
        } else {
            config.monitor_groups.join(", ")
        }
    );
    eprintln!("   Ctrl-C to exit.\n");

    let (inbound_tx, mut inbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let channel = Arc::new(WhatsAppChannel::new(
        config,
        Arc::new(WsBridgeTransport),
        Arc::new(QueueHandler::new(inbound_tx)),
    ));

    // Inbound consumer — the agent loop sits here in a full deployment;
    // standalone, messages are surfaced in the log.
    tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            tracing::info!(
                sender = %msg.sender_id,
                chat = %msg.chat_id,
                "Inbound: {}",
                msg.content
            );
        }
    });

    let runner = Arc::clone(&channel);
    let run_handle = tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    eprintln!("\nShutting down...");
    channel.stop().await;
    let _ = run_handle.await;

    Ok(())
}
