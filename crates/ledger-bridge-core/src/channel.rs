//! Secure Channel Builder: TLS connections to gateway peers, validated against a configured
//! trust root.

use crate::error::{ConnectionError, DialFailure};
use crate::identity::load_pem_certificates;
use crate::transport::GrpcTransport;
use std::fmt;
use std::time::{Duration, Instant};
use tonic::transport::{Certificate as TlsCertificate, ClientTlsConfig, Endpoint};
use tracing::{debug, info, instrument, warn};

/// A peer address together with the roots its certificate must chain to. Immutable once built.
#[derive(Clone)]
pub struct PeerEndpoint {
    address: String,
    server_name: String,
    trusted_roots_pem: Vec<u8>,
    root_count: usize,
}

impl PeerEndpoint {
    /// Validates `host:port` and loads the trusted root pool from PEM bytes.
    pub fn new(
        address: impl Into<String>,
        trusted_ca_pem: &[u8],
    ) -> Result<Self, ConnectionError> {
        let address = address.into();
        let host = host_of(&address)?;

        let roots = load_pem_certificates(trusted_ca_pem)
            .map_err(ConnectionError::InvalidRootCertificate)?;

        Ok(Self {
            server_name: host.to_string(),
            address,
            trusted_roots_pem: trusted_ca_pem.to_vec(),
            root_count: roots.len(),
        })
    }

    /// Verifies the peer certificate against `name` instead of the address host.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn root_count(&self) -> usize {
        self.root_count
    }

    fn uri(&self) -> String {
        format!("https://{}", self.address)
    }
}

impl fmt::Debug for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerEndpoint")
            .field("address", &self.address)
            .field("server_name", &self.server_name)
            .field("root_count", &self.root_count)
            .finish()
    }
}

fn host_of(address: &str) -> Result<&str, ConnectionError> {
    let invalid = |message: &str| ConnectionError::InvalidEndpoint {
        endpoint: address.to_string(),
        message: message.to_string(),
    };

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected host:port"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
    Ok(host)
}

/// Dials `peer` over TLS. Fails with [`ConnectionError::DialFailed`] when no connection is
/// established within `dial_timeout`, whatever the cause.
#[instrument(
    level = "debug",
    skip_all,
    fields(endpoint = %peer.address(), server_name = %peer.server_name())
)]
pub async fn build_channel(
    peer: &PeerEndpoint,
    dial_timeout: Duration,
) -> Result<GrpcTransport, ConnectionError> {
    let tls = ClientTlsConfig::new()
        .ca_certificate(TlsCertificate::from_pem(&peer.trusted_roots_pem))
        .domain_name(peer.server_name.clone());

    let endpoint = Endpoint::from_shared(peer.uri())
        .map_err(|err| ConnectionError::InvalidEndpoint {
            endpoint: peer.address.clone(),
            message: err.to_string(),
        })?
        .tls_config(tls)
        .map_err(|err| ConnectionError::dial_failed(peer.address.clone(), err.into()))?
        .connect_timeout(dial_timeout);

    let started = Instant::now();
    debug!("dialing peer");
    let channel = match tokio::time::timeout(dial_timeout, endpoint.connect()).await {
        Ok(Ok(channel)) => channel,
        Ok(Err(err)) => {
            let err = ConnectionError::dial_failed(peer.address.clone(), err.into());
            warn!(error = %err, "peer dial failed");
            return Err(err);
        }
        Err(_) => {
            warn!(timeout = ?dial_timeout, "peer dial timed out");
            return Err(ConnectionError::dial_failed(
                peer.address.clone(),
                DialFailure::TimedOut(dial_timeout),
            ));
        }
    };

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "secure channel established");
    Ok(GrpcTransport::new(channel))
}
