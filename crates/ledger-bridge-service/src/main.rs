use clap::Parser;
use ledger_bridge_core::{BridgeConfig, ConfigurationError};
use ledger_bridge_service::{build_router, ServiceState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "ledger-bridged", version, about = "Ledger bridge REST service")]
struct Cli {
    /// REST socket address to bind, e.g. 0.0.0.0:8082
    #[arg(long, default_value = "127.0.0.1:8082", env = "LEDGER_BRIDGE_LISTEN")]
    listen: SocketAddr,
    /// TOML file describing identity, trust roots, peers and phase timeouts.
    #[arg(long, default_value = "config/ledger-bridge.toml", env = "LEDGER_BRIDGE_CONFIG")]
    config: PathBuf,
    /// Overrides `default_peer`; must name a configured peer.
    #[arg(long, env = "LEDGER_BRIDGE_DEFAULT_PEER")]
    default_peer: Option<String>,
    #[arg(long, env = "LEDGER_BRIDGE_MSP_ID")]
    msp_id: Option<String>,
    #[arg(long, env = "LEDGER_BRIDGE_CHANNEL")]
    channel: Option<String>,
    #[arg(long, env = "LEDGER_BRIDGE_CONTRACT")]
    contract: Option<String>,
}

impl Cli {
    /// Reads the config file, applies command-line and environment overrides, then validates.
    fn resolve_config(&self) -> Result<BridgeConfig, ConfigurationError> {
        let mut config = BridgeConfig::read(&self.config)?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut BridgeConfig) {
        if let Some(peer) = &self.default_peer {
            config.default_peer = peer.clone();
        }
        if let Some(msp_id) = &self.msp_id {
            config.msp_id = msp_id.clone();
        }
        if let Some(channel) = &self.channel {
            config.channel = channel.clone();
        }
        if let Some(contract) = &self.contract {
            config.contract = contract.clone();
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "ledger_bridge_service=info,ledger_bridge_core=info,info".to_string()
        }))
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let state = ServiceState::bootstrap(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!("ledger-bridge-service REST listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    const PARTIAL: &str = r#"
msp_id = ""
cert_path = "/app/org1/msp/signcerts/cert.pem"
key_path = "/app/org1/msp/keystore/priv_sk"
tls_ca_path = "/app/org1/tls/ca.crt"
channel = ""
contract = "vitaledgechaincode"
default_peer = "clinicians.xmed.ai"

[peers."clinicians.xmed.ai"]
endpoint = "peer0.clinicians.xmed.ai:7051"

[peers."scientists.xnome.net"]
endpoint = "peer0.scientists.xnome.net:9051"
"#;

    fn partial_config() -> PathBuf {
        let path = std::env::temp_dir().join(format!("ledger-bridged-{}.toml", Uuid::new_v4()));
        fs::write(&path, PARTIAL).unwrap();
        path
    }

    #[test]
    fn overrides_complete_a_partial_config_file() {
        let path = partial_config();
        let cli = Cli::try_parse_from([
            "ledger-bridged",
            "--config",
            path.to_str().unwrap(),
            "--msp-id",
            "Org1MSP",
            "--channel",
            "vitaledgechannel",
            "--default-peer",
            "scientists.xnome.net",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.msp_id, "Org1MSP");
        assert_eq!(config.channel, "vitaledgechannel");
        assert_eq!(config.default_peer, "scientists.xnome.net");
    }

    #[test]
    fn partial_config_without_overrides_is_rejected() {
        let path = partial_config();
        let cli =
            Cli::try_parse_from(["ledger-bridged", "--config", path.to_str().unwrap()]).unwrap();

        assert!(matches!(
            cli.resolve_config(),
            Err(ConfigurationError::Invalid(_))
        ));
    }
}
