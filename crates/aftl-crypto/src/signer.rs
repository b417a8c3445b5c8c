// crates/aftl-crypto/src/signer.rs

//! The manufacturer signing key used for firmware-info submissions.
//!
//! Signing either happens in-process (RSA PKCS#1 v1.5 over SHA-256) or is
//! delegated to an external helper program, mirroring the build-system
//! integration where production keys never leave an HSM frontend.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use aftl_core::{AftlError, Result};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use signature::{SignatureEncoding, Signer};
use tempfile::NamedTempFile;

/// The only submission signing algorithm the logs accept today.
pub const ALGORITHM_SHA256_RSA4096: &str = "SHA256_RSA4096";

/// External signing-helper program.
#[derive(Clone, Debug)]
pub enum SigningHelper {
    /// `helper <algorithm> <key_path>` with the message on stdin and the
    /// raw signature on stdout.
    Stdin(PathBuf),
    /// `helper <algorithm> <key_path> <input_file> <output_file>` with the
    /// handoff going through scoped temporary files.
    WithFiles(PathBuf),
}

/// RSA manufacturer key, loaded from a PKCS#8 or PKCS#1 PEM file.
#[derive(Clone, Debug)]
pub struct ManufacturerKey {
    key: RsaPrivateKey,
    path: PathBuf,
    helper: Option<SigningHelper>,
}

impl ManufacturerKey {
    /// Loads the private key from `path`, optionally attaching a signing
    /// helper that will be used instead of in-process signing.
    ///
    /// # Errors
    /// [`AftlError::Io`] on read failure, [`AftlError::KeyFormat`] when the
    /// PEM is neither a PKCS#8 nor a PKCS#1 RSA private key.
    pub fn from_pem_file<P: AsRef<Path>>(path: P, helper: Option<SigningHelper>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let pem = fs::read_to_string(&path)?;
        let key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .map_err(|e| AftlError::KeyFormat(format!("{}: {e}", path.display())))?;
        Ok(Self { key, path, helper })
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    /// The public half as DER-encoded `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    /// [`AftlError::KeyFormat`] if the key cannot be re-encoded.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        let doc = self
            .key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| AftlError::KeyFormat(format!("SPKI encode: {e}")))?;
        Ok(doc.into_vec())
    }

    /// Signs `message` with the named algorithm.
    ///
    /// # Errors
    /// [`AftlError::Signing`] for an unknown algorithm, a failing helper
    /// program, or an in-process signing failure.
    pub fn sign(&self, algorithm: &str, message: &[u8]) -> Result<Vec<u8>> {
        if algorithm != ALGORITHM_SHA256_RSA4096 {
            return Err(AftlError::Signing(format!(
                "unsupported algorithm {algorithm}"
            )));
        }
        match &self.helper {
            Some(helper) => self.sign_with_helper(helper, algorithm, message),
            None => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(self.key.clone());
                let sig = signing_key
                    .try_sign(message)
                    .map_err(|e| AftlError::Signing(e.to_string()))?;
                Ok(sig.to_vec())
            }
        }
    }

    fn sign_with_helper(
        &self,
        helper: &SigningHelper,
        algorithm: &str,
        message: &[u8],
    ) -> Result<Vec<u8>> {
        match helper {
            SigningHelper::Stdin(program) => {
                let mut child = Command::new(program)
                    .arg(algorithm)
                    .arg(&self.path)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                    .map_err(|e| AftlError::Signing(format!("{}: {e}", program.display())))?;
                if let Some(stdin) = child.stdin.as_mut() {
                    stdin
                        .write_all(message)
                        .map_err(|e| AftlError::Signing(format!("helper stdin: {e}")))?;
                }
                let out = child
                    .wait_with_output()
                    .map_err(|e| AftlError::Signing(format!("helper wait: {e}")))?;
                if !out.status.success() {
                    return Err(AftlError::Signing(format!(
                        "helper exited with {}: {}",
                        out.status,
                        String::from_utf8_lossy(&out.stderr)
                    )));
                }
                Ok(out.stdout)
            }
            SigningHelper::WithFiles(program) => {
                // Both files are dropped (and unlinked) on every exit path.
                let mut input = NamedTempFile::new()
                    .map_err(|e| AftlError::Signing(format!("temp input: {e}")))?;
                input
                    .write_all(message)
                    .and_then(|()| input.flush())
                    .map_err(|e| AftlError::Signing(format!("temp input: {e}")))?;
                let output = NamedTempFile::new()
                    .map_err(|e| AftlError::Signing(format!("temp output: {e}")))?;

                let status = Command::new(program)
                    .arg(algorithm)
                    .arg(&self.path)
                    .arg(input.path())
                    .arg(output.path())
                    .status()
                    .map_err(|e| AftlError::Signing(format!("{}: {e}", program.display())))?;
                if !status.success() {
                    return Err(AftlError::Signing(format!("helper exited with {status}")));
                }
                fs::read(output.path())
                    .map_err(|e| AftlError::Signing(format!("helper output: {e}")))
            }
        }
    }
}
