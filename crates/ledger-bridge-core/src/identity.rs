//! Identity Loader.
//!
//! Turns a PEM leaf certificate and a PEM private key on disk into [`Credentials`]: an
//! [`Identity`] scoped to a membership (MSP) id plus the [`SigningKey`] that proves it. The key
//! is checked against the certificate here, so a mismatch can never surface later as a
//! signing or endorsement failure.

use crate::error::IdentityError;
use crate::pb::msp::SerializedIdentity;
use crate::signer::SigningKey;
use der::pem::LineEnding;
use der::{Encode, EncodePem};
use prost::Message;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use x509_cert::Certificate;

/// Where the private key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// An explicit key file.
    File(PathBuf),
    /// A keystore directory expected to hold a single key file. The lexically first regular
    /// file is used; meant for single-key test networks.
    Directory(PathBuf),
}

impl KeySource {
    /// Resolves the source to the key file that will be read.
    pub fn resolve(&self) -> Result<PathBuf, IdentityError> {
        match self {
            Self::File(path) => Ok(path.clone()),
            Self::Directory(dir) => first_key_file(dir),
        }
    }
}

fn first_key_file(dir: &Path) -> Result<PathBuf, IdentityError> {
    let entries = fs::read_dir(dir).map_err(|source| IdentityError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| IdentityError::Unreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    let mut candidates = candidates.into_iter();
    let selected = candidates
        .next()
        .ok_or_else(|| IdentityError::NoKeyMaterial(dir.to_path_buf()))?;

    let ignored = candidates.count();
    if ignored > 0 {
        warn!(
            keystore = %dir.display(),
            selected = %selected.display(),
            ignored,
            "keystore holds more than one file; configure key_path explicitly"
        );
    }

    Ok(selected)
}

/// An X.509 identity bound to a membership id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    msp_id: String,
    certificate: Certificate,
    certificate_pem: String,
    public_key_der: Vec<u8>,
}

impl Identity {
    pub fn new(msp_id: impl Into<String>, certificate: Certificate) -> Result<Self, IdentityError> {
        let certificate_pem = certificate
            .to_pem(LineEnding::LF)
            .map_err(|err| IdentityError::MalformedCertificate(err.to_string()))?;
        let public_key_der = certificate
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|err| IdentityError::MalformedCertificate(err.to_string()))?;

        Ok(Self {
            msp_id: msp_id.into(),
            certificate,
            certificate_pem,
            public_key_der,
        })
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// DER `SubjectPublicKeyInfo` taken from the certificate.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// Wire form used as the transaction creator.
    pub fn serialize(&self) -> Vec<u8> {
        SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: self.certificate_pem.as_bytes().to_vec(),
        }
        .encode_to_vec()
    }
}

/// A verified identity and the key that signs on its behalf.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identity: Identity,
    pub signer: SigningKey,
}

/// Decodes every certificate in a PEM document. Fails when there is none.
pub(crate) fn load_pem_certificates(pem: &[u8]) -> Result<Vec<Certificate>, String> {
    // load_pem_chain cannot take blank input.
    if pem.iter().all(u8::is_ascii_whitespace) {
        return Err("no CERTIFICATE block found".to_string());
    }
    let chain = Certificate::load_pem_chain(pem).map_err(|err| err.to_string())?;
    if chain.is_empty() {
        return Err("no CERTIFICATE block found".to_string());
    }
    Ok(chain)
}

/// Parses the first certificate of a PEM document.
pub fn parse_certificate_pem(pem: &[u8]) -> Result<Certificate, IdentityError> {
    let mut chain = load_pem_certificates(pem).map_err(IdentityError::MalformedCertificate)?;
    Ok(chain.swap_remove(0))
}

/// Loads and cross-checks an identity. Reads files only; never touches the network.
pub fn load_identity(
    msp_id: &str,
    cert_path: &Path,
    key_source: &KeySource,
) -> Result<Credentials, IdentityError> {
    let cert_pem = read_file(cert_path)?;
    let identity = Identity::new(msp_id, parse_certificate_pem(&cert_pem)?)?;

    let key_path = key_source.resolve()?;
    let signer = SigningKey::from_pem(&read_file(&key_path)?)?;

    if !signer.matches_public_key(identity.public_key_der()) {
        return Err(IdentityError::KeyCertMismatch);
    }

    info!(
        msp_id,
        subject = %identity.subject(),
        certificate = %cert_path.display(),
        key = %key_path.display(),
        algorithm = signer.algorithm().name(),
        "loaded signing identity"
    );

    Ok(Credentials { identity, signer })
}

fn read_file(path: &Path) -> Result<Vec<u8>, IdentityError> {
    fs::read(path).map_err(|source| IdentityError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ledger-bridge-{tag}-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn empty_keystore_is_no_key_material() {
        let dir = scratch_dir("empty-keystore");
        let err = KeySource::Directory(dir.clone()).resolve().unwrap_err();
        assert!(matches!(err, IdentityError::NoKeyMaterial(path) if path == dir));
    }

    #[test]
    fn keystore_with_only_subdirectories_is_no_key_material() {
        let dir = scratch_dir("nested-keystore");
        fs::create_dir_all(dir.join("archive")).unwrap();
        let err = KeySource::Directory(dir).resolve().unwrap_err();
        assert!(matches!(err, IdentityError::NoKeyMaterial(_)));
    }

    #[test]
    fn keystore_selection_is_lexically_first_file() {
        let dir = scratch_dir("multi-keystore");
        fs::write(dir.join("b_sk"), b"b").unwrap();
        fs::write(dir.join("a_sk"), b"a").unwrap();

        let selected = KeySource::Directory(dir.clone()).resolve().unwrap();
        assert_eq!(selected, dir.join("a_sk"));
    }

    #[test]
    fn missing_keystore_is_unreadable() {
        let dir = std::env::temp_dir().join(format!("ledger-bridge-missing-{}", Uuid::new_v4()));
        let err = KeySource::Directory(dir).resolve().unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, IdentityError::Unreadable { .. }));
    }

    #[test]
    fn explicit_key_file_resolves_to_itself() {
        let path = PathBuf::from("/etc/keys/priv_sk");
        assert_eq!(KeySource::File(path.clone()).resolve().unwrap(), path);
    }

    #[test]
    fn serialized_identity_carries_msp_and_pem() {
        let pem = include_bytes!("../tests/fixtures/org1/msp/signcerts/cert.pem");
        let identity = Identity::new("Org1MSP", parse_certificate_pem(pem).unwrap()).unwrap();

        let decoded = SerializedIdentity::decode(identity.serialize().as_slice()).unwrap();
        assert_eq!(decoded.mspid, "Org1MSP");
        assert!(String::from_utf8(decoded.id_bytes)
            .unwrap()
            .starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(identity.subject().contains("User1@clinicians.xmed.ai"));
    }
}
