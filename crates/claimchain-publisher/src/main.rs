//! Anchoring publisher binary.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use claimchain_bus::NatsAnnouncer;
use claimchain_core::Keypair;
use claimchain_oracle::InsightOracle;
use claimchain_publisher::{router, AppState, Publisher};
use claimchain_rules::CertificationEngine;

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
        env::var("CLAIMCHAIN_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:6000".into());
    let oracle_url = env::var("CLAIMCHAIN_ORACLE_URL")
        .context("CLAIMCHAIN_ORACLE_URL must point at an insight API")?;
    let nats_url = env::var("CLAIMCHAIN_NATS_URL").context("CLAIMCHAIN_NATS_URL is required")?;
    let anchor_address =
        env::var("CLAIMCHAIN_ANCHOR_ADDRESS").context("CLAIMCHAIN_ANCHOR_ADDRESS is required")?;

    let keypair = load_keypair().context("failed to load publisher key")?;

    let oracle = Arc::new(InsightOracle::new(oracle_url));
    let bus = Arc::new(
        NatsAnnouncer::connect(&nats_url, "claimchain-publisher")
            .await
            .context("failed to connect to NATS")?,
    );

    let state = Arc::new(AppState {
        publisher: Publisher::new(
            keypair.clone(),
            anchor_address.clone(),
            oracle.clone(),
            bus,
        ),
        engine: CertificationEngine::new(oracle),
    });
    let app = router(state);

    info!(
        addr = %listen_addr,
        anchor = %anchor_address,
        publisher_key = %keypair.public_key().to_hex(),
        "publisher listening"
    );
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// The publisher key comes in as a 32-byte hex seed. Generated fresh when
/// unset, which only makes sense for local development.
fn load_keypair() -> anyhow::Result<Keypair> {
    match env::var("CLAIMCHAIN_KEY_SEED") {
        Ok(seed_hex) => {
            let bytes = hex::decode(seed_hex.trim()).context("CLAIMCHAIN_KEY_SEED is not hex")?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("CLAIMCHAIN_KEY_SEED must be 32 bytes"))?;
            Ok(Keypair::from_seed(&seed)?)
        }
        Err(_) => {
            tracing::warn!("CLAIMCHAIN_KEY_SEED unset, generating an ephemeral publisher key");
            Ok(Keypair::generate())
        }
    }
}
