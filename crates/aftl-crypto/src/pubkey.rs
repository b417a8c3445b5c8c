// crates/aftl-crypto/src/pubkey.rs

//! Transparency-log public keys and signed-log-root verification.
//!
//! The log's key arrives as a PEM `SubjectPublicKeyInfo`; the algorithm
//! identifier decides whether signatures are RSA PKCS#1 v1.5 or ECDSA
//! P-256, both over SHA-256 of the raw descriptor bytes.

use std::fs;
use std::path::Path;

use aftl_core::{AftlError, Result};
use sha2::Sha256;
use signature::Verifier;
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};

/// rsaEncryption (RFC 8017).
const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// id-ecPublicKey (RFC 5480).
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// A transparency log's public key.
#[derive(Clone, Debug)]
pub enum LogPublicKey {
    /// RSA key verifying PKCS#1 v1.5 signatures over SHA-256.
    Rsa(rsa::RsaPublicKey),
    /// NIST P-256 key verifying ECDSA signatures over SHA-256.
    EcdsaP256(p256::ecdsa::VerifyingKey),
}

impl LogPublicKey {
    /// Parses a PEM-encoded `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    /// [`AftlError::KeyFormat`] if the PEM cannot be decoded or the key
    /// algorithm is neither RSA nor id-ecPublicKey.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let (label, der) = pem_rfc7468::decode_vec(pem)
            .map_err(|e| AftlError::KeyFormat(format!("PEM decode: {e}")))?;
        if label != "PUBLIC KEY" {
            return Err(AftlError::KeyFormat(format!(
                "expected PUBLIC KEY PEM, got {label}"
            )));
        }
        Self::from_der(&der)
    }

    /// Parses a DER-encoded `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    /// [`AftlError::KeyFormat`] on malformed DER or an unsupported
    /// algorithm identifier.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let info = SubjectPublicKeyInfoRef::try_from(der)
            .map_err(|e| AftlError::KeyFormat(format!("SPKI decode: {e}")))?;
        let oid = info.algorithm.oid;
        if oid == OID_RSA_ENCRYPTION {
            use rsa::pkcs8::DecodePublicKey;
            let key = rsa::RsaPublicKey::from_public_key_der(der)
                .map_err(|e| AftlError::KeyFormat(format!("RSA public key: {e}")))?;
            Ok(Self::Rsa(key))
        } else if oid == OID_EC_PUBLIC_KEY {
            use p256::pkcs8::DecodePublicKey;
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(der)
                .map_err(|e| AftlError::KeyFormat(format!("P-256 public key: {e}")))?;
            Ok(Self::EcdsaP256(key))
        } else {
            Err(AftlError::KeyFormat(format!(
                "unsupported public key algorithm {oid}"
            )))
        }
    }

    /// Reads a PEM public key from disk.
    ///
    /// # Errors
    /// [`AftlError::Io`] on read failure, [`AftlError::KeyFormat`] on
    /// decode failure.
    pub fn from_pem_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let pem = fs::read(path.as_ref())?;
        Self::from_pem(&pem)
    }

    /// Checks a detached SHA-256 signature over `message`.
    ///
    /// Both signature kinds reduce to a plain boolean so that callers
    /// cannot tell a parse failure from a mismatch.
    #[must_use]
    pub fn verify_sha256(&self, message: &[u8], sig: &[u8]) -> bool {
        match self {
            Self::Rsa(key) => {
                let verifier = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
                rsa::pkcs1v15::Signature::try_from(sig)
                    .map(|s| verifier.verify(message, &s).is_ok())
                    .unwrap_or(false)
            }
            Self::EcdsaP256(key) => {
                // Trillian emits ASN.1 DER signatures; accept the fixed
                // 64-byte form as well.
                let parsed = p256::ecdsa::Signature::from_der(sig)
                    .or_else(|_| p256::ecdsa::Signature::from_slice(sig));
                parsed.map(|s| key.verify(message, &s).is_ok()).unwrap_or(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use signature::Signer;

    #[test]
    fn rsa_roundtrip_and_tamper() {
        use rsa::pkcs8::EncodePublicKey;

        let private = rsa::RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let signing = rsa::pkcs1v15::SigningKey::<Sha256>::new(private.clone());
        let msg = b"signed log root bytes";
        let sig = signature::SignatureEncoding::to_vec(&signing.sign(msg));

        let pem = private
            .to_public_key()
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .unwrap();
        let key = LogPublicKey::from_pem(pem.as_bytes()).unwrap();
        assert!(matches!(key, LogPublicKey::Rsa(_)));
        assert!(key.verify_sha256(msg, &sig));
        assert!(!key.verify_sha256(b"other message", &sig));

        let mut bad = sig.clone();
        bad[0] ^= 0x80;
        assert!(!key.verify_sha256(msg, &bad));

        // Truncated signature parses to nothing and verifies to false.
        assert!(!key.verify_sha256(msg, &sig[..sig.len() - 1]));
    }

    #[test]
    fn ecdsa_roundtrip_and_tamper() {
        use p256::pkcs8::EncodePublicKey;

        let signing = p256::ecdsa::SigningKey::random(&mut OsRng);
        let msg = b"signed log root bytes";
        let sig: p256::ecdsa::Signature = signing.sign(msg);
        let der = sig.to_der();

        let pem = signing
            .verifying_key()
            .to_public_key_pem(p256::pkcs8::LineEnding::LF)
            .unwrap();
        let key = LogPublicKey::from_pem(pem.as_bytes()).unwrap();
        assert!(matches!(key, LogPublicKey::EcdsaP256(_)));
        assert!(key.verify_sha256(msg, der.as_bytes()));
        assert!(key.verify_sha256(msg, sig.to_bytes().as_slice()));
        assert!(!key.verify_sha256(b"other message", der.as_bytes()));
    }

    #[test]
    fn rejects_non_key_pem() {
        let err = LogPublicKey::from_pem(b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n");
        assert!(matches!(err, Err(AftlError::KeyFormat(_))));
    }
}
