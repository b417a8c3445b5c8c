// crates/aftl-log/src/submit.rs

//! Building, signing, and submitting a firmware-info record, and turning
//! the log's answer into an ICP entry.

use aftl_core::{AftlError, Result};
use aftl_crypto::{sha256, ManufacturerKey, ALGORITHM_SHA256_RSA4096};
use aftl_image::{AftlIcpEntry, FirmwareInfoLeaf, TrillianLogRootDescriptor};
use prost::Message;
use tracing::debug;

use crate::config::TransparencyLogConfig;
use crate::messages::{
    AddFirmwareInfoRequest, AddFirmwareInfoResponse, DigitallySigned, FirmwareInfo,
    HashAlgorithm, SignatureAlgorithm, SignedFirmwareInfo,
};
use crate::transport::LogTransport;

/// Submits `vbmeta_image` to one log and returns the resulting entry.
///
/// The record carries the vbmeta hash, the build tag, and the SHA-256 of
/// the manufacturer public key (SPKI DER), and is signed `SHA256_RSA4096`.
///
/// # Errors
/// [`AftlError::KeyStrength`] unless the manufacturer key is RSA-4096;
/// [`AftlError::Signing`] when signing fails; transport errors from the
/// log call; codec errors when the response does not translate.
pub fn request_inclusion_proof(
    log_config: &TransparencyLogConfig,
    vbmeta_image: &[u8],
    version_incremental: &str,
    manufacturer_key: &ManufacturerKey,
    transport: &dyn LogTransport,
) -> Result<AftlIcpEntry> {
    let vbmeta_hash = sha256(vbmeta_image);

    let bits = manufacturer_key.bits();
    if bits != 4096 {
        return Err(AftlError::KeyStrength { bits });
    }
    let m_key_hash = sha256(&manufacturer_key.public_key_der()?);

    let fw_info = FirmwareInfo {
        vbmeta_hash: vbmeta_hash.to_vec(),
        version_incremental: version_incremental.to_owned(),
        manufacturer_key_hash: m_key_hash.to_vec(),
        ..FirmwareInfo::default()
    };
    let signature =
        manufacturer_key.sign(ALGORITHM_SHA256_RSA4096, &fw_info.encode_to_vec())?;
    let request = AddFirmwareInfoRequest {
        vbmeta: vbmeta_image.to_vec(),
        fw_info: Some(SignedFirmwareInfo {
            info: Some(fw_info),
            info_signature: Some(DigitallySigned {
                hash_algorithm: HashAlgorithm::Sha256 as i32,
                signature_algorithm: SignatureAlgorithm::Rsa as i32,
                signature,
            }),
        }),
    };

    debug!(server = %log_config.target, version_incremental, "submitting firmware info");
    let response = transport.add_firmware_info(request)?;
    entry_from_response(&log_config.target, &response)
}

/// Translates an `AddFirmwareInfo` response into an [`AftlIcpEntry`].
///
/// # Errors
/// [`AftlError::Transport`] when the response is missing required fields;
/// codec errors from the embedded descriptor and leaf;
/// [`AftlError::FieldRange`] for a negative leaf index or an audit-path
/// hash that is not 32 bytes.
pub fn entry_from_response(
    log_url: &str,
    response: &AddFirmwareInfoResponse,
) -> Result<AftlIcpEntry> {
    let bundle = response
        .fw_info_proof
        .as_ref()
        .ok_or_else(|| AftlError::Transport("response missing fw_info_proof".into()))?;
    let proof = bundle
        .proof
        .as_ref()
        .ok_or_else(|| AftlError::Transport("response missing proof".into()))?;
    let sth = bundle
        .sth
        .as_ref()
        .ok_or_else(|| AftlError::Transport("response missing sth".into()))?;

    let leaf_index = u64::try_from(proof.leaf_index)
        .map_err(|_| AftlError::FieldRange(format!("negative leaf_index {}", proof.leaf_index)))?;
    let proofs = proof
        .hashes
        .iter()
        .map(|h| {
            <[u8; 32]>::try_from(h.as_slice()).map_err(|_| {
                AftlError::FieldRange(format!("audit-path hash of {} bytes", h.len()))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AftlIcpEntry {
        log_url: log_url.to_owned(),
        leaf_index,
        log_root_descriptor: TrillianLogRootDescriptor::decode(&sth.log_root)?,
        fw_info_leaf: FirmwareInfoLeaf::from_bytes(&response.fw_info_leaf)?,
        log_root_signature: sth.log_root_signature.clone(),
        proofs,
    })
}
