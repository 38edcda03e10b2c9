//! Gateway Session: one identity, one signer and one transport, plus the four phase budgets.

use crate::config::TimeoutSettings;
use crate::error::SubmissionError;
use crate::identity::{Credentials, Identity};
use crate::signer::SigningKey;
use crate::transport::LedgerTransport;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// Independent deadlines for each network-bound phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimeouts {
    pub evaluate: Duration,
    pub endorse: Duration,
    pub submit: Duration,
    pub commit: Duration,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        TimeoutSettings::default().into()
    }
}

impl From<TimeoutSettings> for PhaseTimeouts {
    fn from(settings: TimeoutSettings) -> Self {
        Self {
            evaluate: Duration::from_secs(settings.evaluate_secs),
            endorse: Duration::from_secs(settings.endorse_secs),
            submit: Duration::from_secs(settings.submit_secs),
            commit: Duration::from_secs(settings.commit_secs),
        }
    }
}

/// A bound client context. Owns its transport exclusively and releases it exactly once,
/// either through [`GatewaySession::close`] or when dropped.
pub struct GatewaySession {
    identity: Identity,
    signer: SigningKey,
    transport: Box<dyn LedgerTransport>,
    timeouts: PhaseTimeouts,
    released: bool,
}

/// Binds already-validated parts into a session. Performs no I/O.
pub fn open_session(
    identity: Identity,
    signer: SigningKey,
    transport: impl LedgerTransport + 'static,
    timeouts: PhaseTimeouts,
) -> GatewaySession {
    debug!(msp_id = identity.msp_id(), ?timeouts, "gateway session opened");
    GatewaySession {
        identity,
        signer,
        transport: Box::new(transport),
        timeouts,
        released: false,
    }
}

impl GatewaySession {
    pub fn from_credentials(
        credentials: Credentials,
        transport: impl LedgerTransport + 'static,
        timeouts: PhaseTimeouts,
    ) -> Self {
        open_session(credentials.identity, credentials.signer, transport, timeouts)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn timeouts(&self) -> PhaseTimeouts {
        self.timeouts
    }

    pub(crate) fn transport(&self) -> &dyn LedgerTransport {
        self.transport.as_ref()
    }

    /// Signs `SHA-256(message)` with the session's key.
    pub fn sign(&self, what: &'static str, message: &[u8]) -> Result<Vec<u8>, SubmissionError> {
        let digest = Sha256::digest(message);
        self.signer
            .sign_digest(&digest)
            .map_err(|err| SubmissionError::Signing {
                what,
                message: err.to_string(),
            })
    }

    /// Releases the transport.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.transport.close();
        debug!(msp_id = self.identity.msp_id(), "gateway session closed");
    }
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_deadlines_are_strictly_increasing() {
        let timeouts = PhaseTimeouts::default();
        assert_eq!(timeouts.evaluate, Duration::from_secs(10));
        assert_eq!(timeouts.endorse, Duration::from_secs(15));
        assert_eq!(timeouts.submit, Duration::from_secs(20));
        assert_eq!(timeouts.commit, Duration::from_secs(30));
        assert!(timeouts.evaluate < timeouts.endorse);
        assert!(timeouts.endorse < timeouts.submit);
        assert!(timeouts.submit < timeouts.commit);
    }

    #[test]
    fn settings_convert_field_by_field() {
        let timeouts = PhaseTimeouts::from(TimeoutSettings {
            evaluate_secs: 1,
            endorse_secs: 2,
            submit_secs: 3,
            commit_secs: 4,
        });
        assert_eq!(timeouts.commit, Duration::from_secs(4));
        assert_eq!(timeouts.evaluate, Duration::from_secs(1));
    }
}
