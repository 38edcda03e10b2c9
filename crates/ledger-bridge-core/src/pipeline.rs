//! End-to-end submission: credentials, channel, session and submitter wired together.

use crate::channel::{build_channel, PeerEndpoint};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, ConfigurationError};
use crate::identity::{load_identity, Credentials};
use crate::proposal::TransactionRequest;
use crate::session::{GatewaySession, PhaseTimeouts};
use crate::submit::{SubmittedTransaction, TransactionResult};
use async_trait::async_trait;
use std::fs;
use std::sync::Arc;
use tracing::{info, instrument};

/// Submits `request` to `channel`/`contract` and closes `session` on every exit path.
///
/// Dropping the returned future before it completes drops the session, which also releases
/// the transport.
pub async fn run_submission(
    session: GatewaySession,
    channel: &str,
    contract: &str,
    request: TransactionRequest,
) -> TransactionResult {
    let outcome = session
        .network(channel)
        .contract(contract)
        .submit(&request)
        .await;
    session.close();
    outcome
}

/// Seam between the HTTP layer and the ledger.
#[async_trait]
pub trait TransactionInvoker: Send + Sync {
    /// Submits `request` through the named peer, or the default peer when `peer` is `None`
    /// or unknown.
    async fn invoke(
        &self,
        peer: Option<&str>,
        request: TransactionRequest,
    ) -> Result<SubmittedTransaction, BridgeError>;

    fn channel(&self) -> &str;

    fn contract(&self) -> &str;
}

/// Production invoker: credentials are loaded once; every call dials its own channel and owns
/// its own session.
#[derive(Clone)]
pub struct LedgerInvoker {
    config: Arc<BridgeConfig>,
    credentials: Credentials,
    trusted_roots: Arc<Vec<u8>>,
    timeouts: PhaseTimeouts,
}

impl LedgerInvoker {
    /// Validates `config`, loads the signing identity and the TLS trust roots.
    pub fn from_config(config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let credentials = load_identity(&config.msp_id, &config.cert_path, &config.key_source()?)?;

        let trusted_roots =
            fs::read(&config.tls_ca_path).map_err(|source| ConfigurationError::Read {
                path: config.tls_ca_path.clone(),
                source,
            })?;
        let invoker = Self {
            timeouts: config.timeouts.into(),
            config: Arc::new(config),
            credentials,
            trusted_roots: Arc::new(trusted_roots),
        };
        let (default_peer, _) = invoker.peer_endpoint(None)?;

        info!(
            msp_id = %invoker.config.msp_id,
            channel = %invoker.config.channel,
            contract = %invoker.config.contract,
            peers = invoker.config.peers.len(),
            default_peer = %default_peer,
            "ledger invoker ready"
        );
        Ok(invoker)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn peer_endpoint(
        &self,
        requested: Option<&str>,
    ) -> Result<(String, PeerEndpoint), BridgeError> {
        let (name, peer) = self.config.select_peer(requested)?;
        let mut endpoint = PeerEndpoint::new(peer.endpoint.clone(), &self.trusted_roots)?;
        if let Some(server_name) = &peer.server_name {
            endpoint = endpoint.with_server_name(server_name.clone());
        }
        Ok((name.to_string(), endpoint))
    }
}

#[async_trait]
impl TransactionInvoker for LedgerInvoker {
    #[instrument(skip_all, fields(function = %request.function, peer = tracing::field::Empty))]
    async fn invoke(
        &self,
        peer: Option<&str>,
        request: TransactionRequest,
    ) -> Result<SubmittedTransaction, BridgeError> {
        let (name, endpoint) = self.peer_endpoint(peer)?;
        tracing::Span::current().record("peer", name.as_str());

        let transport = build_channel(&endpoint, self.config.dial_timeout()).await?;
        let session =
            GatewaySession::from_credentials(self.credentials.clone(), transport, self.timeouts);

        Ok(run_submission(session, &self.config.channel, &self.config.contract, request).await?)
    }

    fn channel(&self) -> &str {
        &self.config.channel
    }

    fn contract(&self) -> &str {
        &self.config.contract
    }
}
