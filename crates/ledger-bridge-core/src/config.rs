//! Bridge configuration: identity material, peer directory, ledger coordinates and phase
//! deadlines. Loaded once from TOML; nothing here is taken from inbound requests.

use crate::error::ConfigurationError;
use crate::identity::KeySource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 10;

/// Per-phase deadlines in whole seconds, as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub evaluate_secs: u64,
    pub endorse_secs: u64,
    pub submit_secs: u64,
    pub commit_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            evaluate_secs: 10,
            endorse_secs: 15,
            submit_secs: 20,
            commit_secs: 30,
        }
    }
}

/// A named peer the bridge may dial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// `host:port` of the peer's gateway service.
    pub endpoint: String,
    /// TLS name to verify instead of the endpoint host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub msp_id: String,
    pub cert_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystore_dir: Option<PathBuf>,
    pub tls_ca_path: PathBuf,
    pub channel: String,
    pub contract: String,
    pub default_peer: String,
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub peers: BTreeMap<String, PeerConfig>,
}

fn default_dial_timeout_secs() -> u64 {
    DEFAULT_DIAL_TIMEOUT_SECS
}

impl BridgeConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML configuration file without validating it, so overrides can still be
    /// applied. Call [`BridgeConfig::validate`] afterwards.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|err| ConfigurationError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("msp_id", &self.msp_id),
            ("channel", &self.channel),
            ("contract", &self.contract),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationError::Invalid(format!("{field} must not be empty")));
            }
        }

        self.key_source()?;

        if !self.peers.contains_key(&self.default_peer) {
            return Err(ConfigurationError::Invalid(format!(
                "default_peer '{}' is not listed under [peers]",
                self.default_peer
            )));
        }
        if let Some((name, _)) = self
            .peers
            .iter()
            .find(|(_, peer)| peer.endpoint.trim().is_empty())
        {
            return Err(ConfigurationError::Invalid(format!(
                "peer '{name}' has an empty endpoint"
            )));
        }

        if self.dial_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "dial_timeout_secs must be greater than zero".to_string(),
            ));
        }
        let TimeoutSettings {
            evaluate_secs,
            endorse_secs,
            submit_secs,
            commit_secs,
        } = self.timeouts;
        for (field, value) in [
            ("timeouts.evaluate_secs", evaluate_secs),
            ("timeouts.endorse_secs", endorse_secs),
            ("timeouts.submit_secs", submit_secs),
            ("timeouts.commit_secs", commit_secs),
        ] {
            if value == 0 {
                return Err(ConfigurationError::Invalid(format!(
                    "{field} must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    /// Exactly one of `key_path` and `keystore_dir` must be set.
    pub fn key_source(&self) -> Result<KeySource, ConfigurationError> {
        match (&self.key_path, &self.keystore_dir) {
            (Some(path), None) => Ok(KeySource::File(path.clone())),
            (None, Some(dir)) => Ok(KeySource::Directory(dir.clone())),
            (Some(_), Some(_)) => Err(ConfigurationError::Invalid(
                "set only one of key_path and keystore_dir".to_string(),
            )),
            (None, None) => Err(ConfigurationError::Invalid(
                "one of key_path or keystore_dir is required".to_string(),
            )),
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Looks up a peer by name, falling back to `default_peer` for missing or unknown names.
    pub fn select_peer(
        &self,
        requested: Option<&str>,
    ) -> Result<(&str, &PeerConfig), ConfigurationError> {
        if let Some(name) = requested.filter(|name| !name.is_empty()) {
            if let Some((name, peer)) = self.peers.get_key_value(name) {
                return Ok((name.as_str(), peer));
            }
            warn!(
                requested = name,
                fallback = %self.default_peer,
                "unknown peer requested; using default peer"
            );
        }

        self.peers
            .get_key_value(&self.default_peer)
            .map(|(name, peer)| (name.as_str(), peer))
            .ok_or_else(|| {
                ConfigurationError::Invalid(format!(
                    "default_peer '{}' is not listed under [peers]",
                    self.default_peer
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SAMPLE: &str = r#"
msp_id = "Org1MSP"
cert_path = "/app/org1/msp/signcerts/cert.pem"
key_path = "/app/org1/msp/keystore/priv_sk"
tls_ca_path = "/app/org1/tls/ca.crt"
channel = "vitaledgechannel"
contract = "vitaledgechaincode"
default_peer = "clinicians.xmed.ai"

[peers."clinicians.xmed.ai"]
endpoint = "peer0.clinicians.xmed.ai:7051"

[peers."scientists.xnome.net"]
endpoint = "peer0.scientists.xnome.net:9051"
server_name = "peer0.scientists.xnome.net"
"#;

    fn sample() -> BridgeConfig {
        toml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn defaults_reproduce_reference_deadlines() {
        let config = sample();
        config.validate().unwrap();

        assert_eq!(config.timeouts, TimeoutSettings::default());
        assert_eq!(config.dial_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.key_source().unwrap(),
            KeySource::File(PathBuf::from("/app/org1/msp/keystore/priv_sk"))
        );
    }

    #[test]
    fn load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("ledger-bridge-{}.toml", Uuid::new_v4()));
        fs::write(&path, SAMPLE).unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.channel, "vitaledgechannel");
        assert_eq!(config.peers.len(), 2);
    }

    #[test]
    fn shipped_sample_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/ledger-bridge.toml");
        let config = BridgeConfig::load(path).unwrap();
        assert_eq!(config.default_peer, "clinicians.xmed.ai");
        assert_eq!(config.timeouts, TimeoutSettings::default());
    }

    #[test]
    fn load_reports_missing_file_and_bad_syntax() {
        let missing = std::env::temp_dir().join(format!("ledger-bridge-{}.toml", Uuid::new_v4()));
        assert!(matches!(
            BridgeConfig::load(&missing),
            Err(ConfigurationError::Read { .. })
        ));

        fs::write(&missing, "msp_id = ").unwrap();
        assert!(matches!(
            BridgeConfig::load(&missing),
            Err(ConfigurationError::Parse { .. })
        ));
    }

    #[test]
    fn read_defers_validation_to_caller() {
        let path = std::env::temp_dir().join(format!("ledger-bridge-{}.toml", Uuid::new_v4()));
        fs::write(&path, SAMPLE.replace(r#"msp_id = "Org1MSP""#, r#"msp_id = """#)).unwrap();

        assert!(matches!(
            BridgeConfig::load(&path),
            Err(ConfigurationError::Invalid(_))
        ));
        let mut config = BridgeConfig::read(&path).unwrap();
        assert!(config.validate().is_err());

        config.msp_id = "Org1MSP".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn key_path_and_keystore_dir_are_exclusive() {
        let mut config = sample();
        config.keystore_dir = Some(PathBuf::from("/app/org1/msp/keystore"));
        assert!(config.validate().is_err());

        config.key_path = None;
        assert_eq!(
            config.key_source().unwrap(),
            KeySource::Directory(PathBuf::from("/app/org1/msp/keystore"))
        );

        config.keystore_dir = None;
        assert!(config.key_source().is_err());
    }

    #[test]
    fn rejects_zero_timeouts_and_unknown_default_peer() {
        let mut config = sample();
        config.timeouts.commit_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeouts.commit_secs"));

        let mut config = sample();
        config.default_peer = "nowhere".to_string();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.contract = "  ".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("contract"));
    }

    #[test]
    fn peer_selection_falls_back_to_default() {
        let config = sample();

        let (name, peer) = config.select_peer(Some("scientists.xnome.net")).unwrap();
        assert_eq!(name, "scientists.xnome.net");
        assert_eq!(peer.endpoint, "peer0.scientists.xnome.net:9051");

        let (name, _) = config.select_peer(Some("mallory.example")).unwrap();
        assert_eq!(name, "clinicians.xmed.ai");

        let (name, peer) = config.select_peer(None).unwrap();
        assert_eq!(name, "clinicians.xmed.ai");
        assert!(peer.server_name.is_none());
    }
}
