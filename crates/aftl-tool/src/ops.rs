// crates/aftl-tool/src/ops.rs

//! The make / info / verify operations over augmented vbmeta images.
//!
//! File layout produced by `make` and consumed by `info`/`verify`:
//!
//! ```text
//! [ original vbmeta ][ AftlImageHeader ][ AftlIcpEntry × N ][ NUL padding ]
//! ```
//!
//! The AFTL image is located by skipping exactly the vbmeta's own declared
//! length.

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Duration;

use aftl_avb::get_vbmeta_image;
use aftl_core::Result;
use aftl_crypto::{LogPublicKey, ManufacturerKey};
use aftl_image::{
    verify_entry_against_vbmeta, verify_image, AftlImage, AftlImageHeader, IMAGE_HEADER_SIZE,
};
use aftl_log::{request_inclusion_proof, GrpcTransport, LogTransport, TransparencyLogConfig};
use tracing::{error, info, warn};

/// Reads the AFTL image appended to the vbmeta in `image_path`.
///
/// Returns `Ok(None)` when nothing follows the vbmeta or what follows does
/// not parse as an AFTL image (logged, not fatal: `info` and `verify`
/// answer `false` in that case).
///
/// # Errors
/// Fails only when the file itself cannot be read as a vbmeta image.
pub fn get_aftl_image(image_path: &Path) -> Result<Option<AftlImage>> {
    let (vbmeta_image, _) = get_vbmeta_image(image_path)?;
    let data = fs::read(image_path)?;
    let offset = vbmeta_image.len();

    let Some(header_bytes) = data.get(offset..offset + IMAGE_HEADER_SIZE) else {
        warn!("image does not contain an AftlImage");
        return Ok(None);
    };
    let header = match AftlImageHeader::decode(header_bytes) {
        Ok(header) => header,
        Err(e) => {
            warn!(error = %e, "image does not contain a valid AftlImage");
            return Ok(None);
        }
    };

    let Some(image_bytes) = data.get(offset..offset + header.aftl_image_size as usize) else {
        warn!("AftlImage is truncated");
        return Ok(None);
    };
    match AftlImage::decode(image_bytes) {
        Ok(image) => Ok(Some(image)),
        Err(e) => {
            warn!(error = %e, "image does not contain a valid AftlImage");
            Ok(None)
        }
    }
}

/// Implements the `info_image_icp` command: pretty-prints the AFTL image.
///
/// Returns `false` when the image carries no (valid) AFTL image.
///
/// # Errors
/// Propagates writer failures.
pub fn info_image_icp<W: Write>(image_path: &Path, output: &mut W) -> Result<bool> {
    let image = match get_aftl_image(image_path) {
        Ok(Some(image)) => image,
        Ok(None) => return Ok(false),
        Err(e) => {
            error!(error = %e, "cannot read vbmeta image");
            return Ok(false);
        }
    };
    image.print_desc(output)?;
    Ok(true)
}

/// Implements the `verify_image_icp` command.
///
/// Emits exactly one verdict line once verification actually ran, and
/// returns the verdict.
///
/// # Errors
/// Propagates writer failures.
pub fn verify_image_icp<W: Write>(
    image_path: &Path,
    transparency_log_pub_keys: &[impl AsRef<Path>],
    output: &mut W,
) -> Result<bool> {
    let (vbmeta_image, image) = match get_vbmeta_image(image_path) {
        Ok((vbmeta, _)) => match get_aftl_image(image_path) {
            Ok(Some(image)) => (vbmeta, image),
            Ok(None) => return Ok(false),
            Err(e) => {
                error!(error = %e, "cannot read AftlImage");
                return Ok(false);
            }
        },
        Err(e) => {
            error!(error = %e, "cannot read vbmeta image");
            return Ok(false);
        }
    };

    let pub_keys = load_pub_keys(transparency_log_pub_keys);
    if verify_image(&image, &vbmeta_image, &pub_keys) {
        writeln!(output, "The inclusion proofs for the image successfully validate.")?;
        Ok(true)
    } else {
        writeln!(output, "The inclusion proofs for the image do not validate.")?;
        Ok(false)
    }
}

/// Implements the `make_icp_from_vbmeta` command with the production gRPC
/// transport.
///
/// # Errors
/// As [`make_icp_with`].
pub fn make_icp_from_vbmeta<W: Write + Seek>(
    vbmeta_image_path: &Path,
    output: &mut W,
    version_incremental: &str,
    transparency_log_configs: &[TransparencyLogConfig],
    manufacturer_key: &ManufacturerKey,
    padding_size: usize,
    timeout: Option<Duration>,
) -> Result<bool> {
    make_icp_with(
        vbmeta_image_path,
        output,
        version_incremental,
        transparency_log_configs,
        manufacturer_key,
        padding_size,
        |config| Box::new(GrpcTransport::new(config, timeout)),
    )
}

/// [`make_icp_from_vbmeta`] with an injectable transport per log.
///
/// Fetches one inclusion proof per configured log, collects them into an
/// AFTL image, verifies the result offline, and writes the augmented
/// vbmeta. A per-log request failure is logged and skipped; the operation
/// succeeds only if every log contributed an entry and the final image
/// verifies against the configured keys.
///
/// # Errors
/// I/O failures reading the vbmeta or writing the output; codec failures
/// assembling the image. Per-log transport and signing failures are *not*
/// errors; they surface as an `Ok(false)` overall result.
pub fn make_icp_with<W, F>(
    vbmeta_image_path: &Path,
    output: &mut W,
    version_incremental: &str,
    transparency_log_configs: &[TransparencyLogConfig],
    manufacturer_key: &ManufacturerKey,
    padding_size: usize,
    transport_for: F,
) -> Result<bool>
where
    W: Write + Seek,
    F: Fn(&TransparencyLogConfig) -> Box<dyn LogTransport>,
{
    let (vbmeta_image, footer) = get_vbmeta_image(vbmeta_image_path)?;

    // Chained partitions are not logged; bail before any log traffic.
    if footer.is_some() {
        error!("image has a footer and ICP for this format is not implemented");
        return Ok(false);
    }

    let mut aftl_image = AftlImage::new();
    for config in transparency_log_configs {
        let transport = transport_for(config);
        match request_inclusion_proof(
            config,
            &vbmeta_image,
            version_incremental,
            manufacturer_key,
            transport.as_ref(),
        ) {
            Ok(entry) => {
                let locally_verified = config
                    .load_pub_key()
                    .map(|key| verify_entry_against_vbmeta(&entry, &vbmeta_image, &key))
                    .unwrap_or(false);
                if !locally_verified {
                    warn!(
                        server = %config.target,
                        "the inclusion proof could not be verified"
                    );
                }
                aftl_image.add_entry(entry)?;
            }
            Err(e) => {
                // The request failed; continue and see if the others work.
                warn!(server = %config.target, error = %e, "requesting inclusion proof failed");
            }
        }
    }

    if usize::from(aftl_image.header.icp_count) != transparency_log_configs.len() {
        error!(
            "valid inclusion proofs could only be retrieved from {} out of {} transparency logs",
            aftl_image.header.icp_count,
            transparency_log_configs.len()
        );
        return Ok(false);
    }

    let pub_keys = load_pub_keys(
        &transparency_log_configs
            .iter()
            .map(|c| c.pub_key.clone())
            .collect::<Vec<_>>(),
    );
    if !verify_image(&aftl_image, &vbmeta_image, &pub_keys) {
        error!("resulting AftlImage inclusion proofs do not validate");
        return Ok(false);
    }

    output.seek(SeekFrom::Start(0))?;
    output.write_all(&vbmeta_image)?;
    let encoded = aftl_image.encode()?;
    output.write_all(&encoded)?;

    if padding_size > 0 {
        let total = vbmeta_image.len() + encoded.len();
        let padded = total.div_ceil(padding_size) * padding_size;
        output.write_all(&vec![0u8; padded - total])?;
    }

    info!("VBMeta image with AFTL image successfully created");
    Ok(true)
}

/// Loads the key files that parse; unloadable keys are logged and dropped,
/// so they simply cannot vouch for any entry.
fn load_pub_keys(paths: &[impl AsRef<Path>]) -> Vec<LogPublicKey> {
    paths
        .iter()
        .filter_map(|path| match LogPublicKey::from_pem_file(path.as_ref()) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "skipping unusable log key");
                None
            }
        })
        .collect()
}
