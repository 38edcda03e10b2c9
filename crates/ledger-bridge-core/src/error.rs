use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Protocol phase a submission is in when an operation starts or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Resolve,
    Serialize,
    Evaluate,
    Endorse,
    Submit,
    Commit,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Serialize => "serialize",
            Self::Evaluate => "evaluate",
            Self::Endorse => "endorse",
            Self::Submit => "submit",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operator-facing configuration faults. Never retriable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Credential loading faults. The caller must fix the credentials, not retry.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no key material found in keystore directory '{0}'")]
    NoKeyMaterial(PathBuf),

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("malformed private key: {0}")]
    MalformedKey(String),

    #[error("unsupported private key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    #[error("private key does not match the certificate public key")]
    KeyCertMismatch,
}

impl IdentityError {
    /// Missing files and empty keystores are configuration faults at the policy layer.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Unreadable { .. } | Self::NoKeyMaterial(_))
    }
}

/// Why a dial attempt did not produce a connection.
#[derive(Debug, Error)]
pub enum DialFailure {
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    #[error("no connection established within {0:?}")]
    TimedOut(Duration),
}

/// Secure channel faults. Potentially transient; this crate never retries them.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid trusted root certificate: {0}")]
    InvalidRootCertificate(String),

    #[error("invalid peer endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("failed to dial peer '{endpoint}': {reason}")]
    DialFailed {
        endpoint: String,
        reason: String,
        #[source]
        source: DialFailure,
    },
}

impl ConnectionError {
    pub(crate) fn dial_failed(endpoint: impl Into<String>, source: DialFailure) -> Self {
        Self::DialFailed {
            endpoint: endpoint.into(),
            reason: describe_error(&source),
            source,
        }
    }
}

/// Faults raised while driving the submission protocol.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("unknown target '{channel}/{contract}': {message}")]
    UnknownTarget {
        channel: String,
        contract: String,
        message: String,
    },

    #[error(
        "{phase} phase timed out after {after:?} (transaction {})",
        .transaction_id.as_deref().unwrap_or("-")
    )]
    Timeout {
        phase: Phase,
        transaction_id: Option<String>,
        after: Duration,
    },

    #[error("transaction {transaction_id} failed during {phase}: {message}")]
    RemoteExecutionFailed {
        phase: Phase,
        transaction_id: String,
        message: String,
    },

    #[error("{phase} rejected by gateway ({code:?}): {message}")]
    Rejected {
        phase: Phase,
        code: tonic::Code,
        message: String,
    },

    #[error("malformed {phase} response: {message}")]
    MalformedResponse { phase: Phase, message: String },

    #[error("failed to encode {what}: {message}")]
    Encoding { what: &'static str, message: String },

    #[error("failed to sign {what}: {message}")]
    Signing { what: &'static str, message: String },

    #[error("phase order violation: expected '{expected}', got '{actual}'")]
    PhaseOrder {
        expected: &'static str,
        actual: &'static str,
    },
}

impl SubmissionError {
    /// Phase the failure is attributed to, when one applies.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::UnknownTarget { .. } => Some(Phase::Resolve),
            Self::Timeout { phase, .. }
            | Self::RemoteExecutionFailed { phase, .. }
            | Self::Rejected { phase, .. }
            | Self::MalformedResponse { phase, .. } => Some(*phase),
            Self::Encoding { .. } | Self::Signing { .. } => Some(Phase::Serialize),
            Self::PhaseOrder { .. } => None,
        }
    }

    /// True when the transaction may or may not have landed on the ledger.
    ///
    /// Callers should reconcile against ledger state instead of resubmitting.
    pub fn is_ambiguous(&self) -> bool {
        match self {
            Self::Timeout { phase, .. } => matches!(phase, Phase::Submit | Phase::Commit),
            Self::Rejected { phase, code, .. } => {
                matches!(phase, Phase::Submit | Phase::Commit)
                    && matches!(code, tonic::Code::Unavailable | tonic::Code::Unknown)
            }
            _ => false,
        }
    }

    /// True when resubmitting cannot produce a duplicate ledger write.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Timeout { phase, .. } => matches!(phase, Phase::Evaluate | Phase::Endorse),
            Self::Rejected { phase, code, .. } => {
                matches!(phase, Phase::Evaluate | Phase::Endorse)
                    && matches!(
                        code,
                        tonic::Code::Unavailable
                            | tonic::Code::ResourceExhausted
                            | tonic::Code::DeadlineExceeded
                    )
            }
            _ => false,
        }
    }
}

/// Coarse classification used by outer layers to pick a response class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Credentials,
    Connection,
    Submission,
}

impl ErrorClass {
    /// Configuration and credential faults are the operator's or caller's to fix.
    pub fn is_client_fault(self) -> bool {
        matches!(self, Self::Configuration | Self::Credentials)
    }
}

/// Any failure of the submission pipeline.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl BridgeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration(_) => ErrorClass::Configuration,
            Self::Identity(err) if err.is_configuration() => ErrorClass::Configuration,
            Self::Identity(_) => ErrorClass::Credentials,
            Self::Connection(_) => ErrorClass::Connection,
            Self::Submission(_) => ErrorClass::Submission,
        }
    }

    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Identity(_) => false,
            Self::Connection(ConnectionError::DialFailed { .. }) => true,
            Self::Connection(_) => false,
            Self::Submission(err) => err.is_retriable(),
        }
    }
}

/// Renders an error and its source chain on one line.
pub(crate) fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
