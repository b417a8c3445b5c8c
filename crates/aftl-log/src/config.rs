// crates/aftl-log/src/config.rs

//! One transparency log as configured on the command line.

use std::path::PathBuf;
use std::str::FromStr;

use aftl_core::Result;
use aftl_crypto::LogPublicKey;

/// A transparency log endpoint and the key to check its responses with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransparencyLogConfig {
    /// `host:port` of the gRPC endpoint.
    pub target: String,
    /// Path to the log's public key PEM.
    pub pub_key: PathBuf,
    /// Optional API key sent as `x-api-key` metadata.
    pub api_key: Option<String>,
}

impl TransparencyLogConfig {
    /// Loads the configured public key from disk.
    ///
    /// # Errors
    /// As [`LogPublicKey::from_pem_file`].
    pub fn load_pub_key(&self) -> Result<LogPublicKey> {
        LogPublicKey::from_pem_file(&self.pub_key)
    }
}

impl FromStr for TransparencyLogConfig {
    type Err = String;

    /// Parses `host:port,pubkey_pem_path[,api_key]`.
    fn from_str(arg: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = arg.splitn(3, ',');
        let target = parts.next().unwrap_or_default();
        let Some(pub_key) = parts.next() else {
            return Err(
                "incorrect format for transparency log server, expected \
                 host:port,publickey_file[,api_key]"
                    .into(),
            );
        };
        if target.is_empty() {
            return Err("transparency log server: host:port cannot be empty".into());
        }
        if pub_key.is_empty() {
            return Err("transparency log server: publickey_file cannot be empty".into());
        }
        Ok(Self {
            target: target.to_owned(),
            pub_key: PathBuf::from(pub_key),
            api_key: parts.next().map(str::to_owned),
        })
    }
}
