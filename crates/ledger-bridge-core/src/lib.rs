//! Ledger bridge core.
//!
//! Client side of a permissioned ledger gateway: loads an X.509 signing identity, dials a
//! peer over TLS, and drives evaluate/endorse/submit/commit with an independent deadline per
//! phase. Every failure comes back typed and tagged with the phase it happened in.

#![deny(unsafe_code)]

pub mod channel;
pub mod config;
pub mod error;
pub mod flow;
pub mod identity;
pub mod pb;
pub mod pipeline;
pub mod proposal;
pub mod session;
pub mod signer;
pub mod submit;
pub mod transport;

#[cfg(test)]
mod testing;

pub use channel::{build_channel, PeerEndpoint};
pub use config::{BridgeConfig, PeerConfig, TimeoutSettings};
pub use error::{
    BridgeError, ConfigurationError, ConnectionError, DialFailure, ErrorClass, IdentityError,
    Phase, SubmissionError,
};
pub use flow::PhaseMachine;
pub use identity::{load_identity, parse_certificate_pem, Credentials, Identity, KeySource};
pub use pipeline::{run_submission, LedgerInvoker, TransactionInvoker};
pub use proposal::TransactionRequest;
pub use session::{open_session, GatewaySession, PhaseTimeouts};
pub use signer::{KeyAlgorithm, SignDigest, SigningError, SigningKey};
pub use submit::{submit, Contract, Network, SubmittedTransaction, TransactionResult};
pub use transport::{GrpcTransport, LedgerTransport};
