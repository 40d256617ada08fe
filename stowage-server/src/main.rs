//! Local S3-compatible endpoint

use anyhow::Context;
use clap::{Arg, Command};
use std::net::SocketAddr;
use stowage_core::auth::Credentials;
use stowage_server::{ObjectStore, StowageServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = Command::new("stowage-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("In-memory S3-compatible endpoint")
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Bind address")
                .default_value("127.0.0.1:9000"),
        )
        .arg(
            Arg::new("access-key-id")
                .long("access-key-id")
                .value_name("ID")
                .env("STOWAGE_S3_ACCESS_KEY_ID")
                .help("Access key id accepted in signed requests")
                .required(true),
        )
        .arg(
            Arg::new("secret-key")
                .long("secret-key")
                .value_name("SECRET")
                .env("STOWAGE_S3_SECRET_KEY")
                .hide_env_values(true)
                .help("Secret key used to verify signatures")
                .required(true),
        )
        .get_matches();

    let bind_addr: SocketAddr = matches
        .get_one::<String>("bind")
        .context("missing bind address")?
        .parse()
        .context("Invalid bind address")?;
    let access_key_id = matches
        .get_one::<String>("access-key-id")
        .context("missing access key id")?;
    let secret_key = matches
        .get_one::<String>("secret-key")
        .context("missing secret key")?;

    info!("Starting stowage server");
    info!("Bind address: {}", bind_addr);
    info!("Access key id: {}", access_key_id);

    let server = StowageServer::new(
        ObjectStore::new(),
        Credentials::new(access_key_id.as_str(), secret_key.as_str()),
    );

    if let Err(e) = server.serve(bind_addr).await {
        warn!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
