use std::sync::Arc;

use otalink::config::Config;
use otalink::device::SystemReset;
use otalink::server::listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load();

    // The update pipeline runs as a dedicated background worker for the
    // lifetime of the device; a successful install tears it down via reset.
    let worker = tokio::spawn(async move {
        let server = listener::bind(&cfg, Arc::new(SystemReset)).await;
        server.run().await
    });

    tokio::select! {
        res = worker => {
            res??;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
