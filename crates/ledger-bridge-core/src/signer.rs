//! Digest signing capability.
//!
//! Private keys are accepted as PEM (`PRIVATE KEY` PKCS#8 or `EC PRIVATE KEY` SEC1) and turned
//! into a [`SigningKey`] only when a signer implementation exists for their algorithm. Support
//! for another algorithm is one more [`SignDigest`] implementation plus a match arm in
//! [`SigningKey::from_pkcs8_der`]; callers never see the concrete key type.

use crate::error::IdentityError;
use der::asn1::ObjectIdentifier;
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");
const SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");
const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Algorithms a [`SigningKey`] can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    EcdsaP256,
}

impl KeyAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::EcdsaP256 => "ECDSA P-256",
        }
    }
}

#[derive(Debug, Error)]
#[error("signing failed: {0}")]
pub struct SigningError(String);

/// Produces a signature over a precomputed digest with the key's native algorithm.
pub trait SignDigest: Send + Sync {
    fn algorithm(&self) -> KeyAlgorithm;

    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError>;

    /// Whether `spki_der` (a DER `SubjectPublicKeyInfo`) is this key's public half.
    fn matches_public_key(&self, spki_der: &[u8]) -> bool;
}

/// Private key material reduced to the one capability the pipeline needs.
#[derive(Clone)]
pub struct SigningKey {
    inner: Arc<dyn SignDigest>,
}

impl SigningKey {
    pub fn new(inner: Arc<dyn SignDigest>) -> Self {
        Self { inner }
    }

    /// Parses a PEM private key and checks that its algorithm can sign.
    pub fn from_pem(pem: &[u8]) -> Result<Self, IdentityError> {
        let (label, der) = der::pem::decode_vec(pem)
            .map_err(|err| IdentityError::MalformedKey(format!("invalid PEM: {err}")))?;

        match label {
            "PRIVATE KEY" => Self::from_pkcs8_der(&der),
            "EC PRIVATE KEY" => Self::from_sec1_der(&der),
            "RSA PRIVATE KEY" => Err(IdentityError::UnsupportedKeyAlgorithm("RSA".to_string())),
            "ENCRYPTED PRIVATE KEY" => Err(IdentityError::MalformedKey(
                "encrypted private keys are not supported".to_string(),
            )),
            other => Err(IdentityError::MalformedKey(format!(
                "unexpected PEM block '{other}'"
            ))),
        }
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, IdentityError> {
        let info = pkcs8::PrivateKeyInfo::try_from(der).map_err(|err| {
            IdentityError::MalformedKey(format!("invalid PKCS#8 structure: {err}"))
        })?;

        if info.algorithm.oid != ID_EC_PUBLIC_KEY {
            return Err(IdentityError::UnsupportedKeyAlgorithm(algorithm_name(
                info.algorithm.oid,
            )));
        }

        let curve = info.algorithm.parameters_oid().map_err(|err| {
            IdentityError::MalformedKey(format!("missing elliptic curve parameters: {err}"))
        })?;
        if curve != SECP256R1 {
            return Err(IdentityError::UnsupportedKeyAlgorithm(format!(
                "ECDSA over {}",
                curve_name(curve)
            )));
        }

        let secret = p256::SecretKey::from_pkcs8_der(der)
            .map_err(|err| IdentityError::MalformedKey(format!("invalid P-256 key: {err}")))?;
        Ok(Self::new(Arc::new(EcdsaP256Signer::from(secret))))
    }

    pub fn from_sec1_der(der: &[u8]) -> Result<Self, IdentityError> {
        let key = sec1::EcPrivateKey::try_from(der).map_err(|err| {
            IdentityError::MalformedKey(format!("invalid SEC1 structure: {err}"))
        })?;

        if let Some(curve) = key.parameters.and_then(|params| params.named_curve()) {
            if curve != SECP256R1 {
                return Err(IdentityError::UnsupportedKeyAlgorithm(format!(
                    "ECDSA over {}",
                    curve_name(curve)
                )));
            }
        }

        let secret = p256::SecretKey::from_sec1_der(der)
            .map_err(|err| IdentityError::MalformedKey(format!("invalid P-256 key: {err}")))?;
        Ok(Self::new(Arc::new(EcdsaP256Signer::from(secret))))
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.inner.algorithm()
    }

    pub fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        self.inner.sign_digest(digest)
    }

    pub fn matches_public_key(&self, spki_der: &[u8]) -> bool {
        self.inner.matches_public_key(spki_der)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm().name())
            .finish_non_exhaustive()
    }
}

/// ECDSA over NIST P-256 with low-S, DER-encoded signatures.
pub struct EcdsaP256Signer {
    key: p256::ecdsa::SigningKey,
}

impl From<p256::SecretKey> for EcdsaP256Signer {
    fn from(secret: p256::SecretKey) -> Self {
        Self {
            key: p256::ecdsa::SigningKey::from(secret),
        }
    }
}

impl SignDigest for EcdsaP256Signer {
    fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::EcdsaP256
    }

    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        let signature: Signature = self
            .key
            .sign_prehash(digest)
            .map_err(|err| SigningError(err.to_string()))?;
        // Peers reject high-S signatures as malleable.
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn matches_public_key(&self, spki_der: &[u8]) -> bool {
        VerifyingKey::from_public_key_der(spki_der)
            .map(|candidate| &candidate == self.key.verifying_key())
            .unwrap_or(false)
    }
}

fn algorithm_name(oid: ObjectIdentifier) -> String {
    let known = [(RSA_ENCRYPTION, "RSA"), (ED25519, "Ed25519")];
    lookup_name(&known, oid)
}

fn curve_name(oid: ObjectIdentifier) -> String {
    let known = [
        (SECP256R1, "P-256"),
        (SECP384R1, "P-384"),
        (SECP521R1, "P-521"),
        (SECP256K1, "secp256k1"),
    ];
    lookup_name(&known, oid)
}

fn lookup_name(known: &[(ObjectIdentifier, &str)], oid: ObjectIdentifier) -> String {
    known
        .iter()
        .find(|(candidate, _)| *candidate == oid)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| oid.to_string())
}
