//! Remote signing coordinator binary.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use claimchain_bus::{Announcer, NatsAnnouncer};
use claimchain_signer::{router, Coordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = env::var("CLAIMCHAIN_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let listen_addr =
        env::var("CLAIMCHAIN_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into());
    let callback_url =
        env::var("CLAIMCHAIN_CALLBACK_URL").unwrap_or_else(|_| "http://localhost:5000".into());

    // The bus is optional: without it, sign notifications are skipped
    // and devices poll instead.
    let bus: Option<Arc<dyn Announcer>> = match env::var("CLAIMCHAIN_NATS_URL") {
        Ok(url) => match NatsAnnouncer::connect(&url, "claimchain-signer").await {
            Ok(announcer) => {
                info!(url = %url, "connected to announcement bus");
                Some(Arc::new(announcer))
            }
            Err(err) => {
                warn!(url = %url, error = %err, "bus unavailable, notifications disabled");
                None
            }
        },
        Err(_) => None,
    };

    let coordinator = Arc::new(Coordinator::new(callback_url, bus));
    let app = router(coordinator);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;
    info!(addr = %listen_addr, "signing coordinator listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
