// crates/aftl-image/src/leaf.rs

//! The firmware-info leaf as stored by the transparency log.
//!
//! The log hashes the leaf bytes exactly as it returned them, so the
//! original byte slice is kept verbatim and never re-serialized; the JSON
//! parse exists only to expose typed fields. The recognized key set is
//! closed: an unknown key is a validation failure, so a typo variant can
//! never shadow a recognized field.

use std::io::Write;

use aftl_core::{AftlError, Result};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde_json::{Map, Value};

/// Keys the submitted firmware-info schema allows.
const RECOGNIZED_KEYS: [&str; 5] = [
    "vbmeta_hash",
    "version_incremental",
    "platform_key",
    "manufacturer_key_hash",
    "description",
];

/// A firmware-info leaf: exact original bytes plus a parsed field view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FirmwareInfoLeaf {
    raw: Vec<u8>,
    fields: Map<String, Value>,
}

impl FirmwareInfoLeaf {
    /// Parses a leaf, keeping `data` verbatim for hashing.
    ///
    /// An empty slice yields the empty leaf (the state of a freshly
    /// constructed entry). Anything else must be a JSON document with an
    /// object at `Value.FwInfo.info.info` whose keys are all recognized.
    ///
    /// # Errors
    /// [`AftlError::JsonShape`] on malformed JSON, a missing path, or an
    /// unknown key.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        let doc: Value = serde_json::from_slice(data)
            .map_err(|e| AftlError::JsonShape(format!("parse: {e}")))?;
        let info = doc
            .pointer("/Value/FwInfo/info/info")
            .ok_or_else(|| AftlError::JsonShape("missing Value.FwInfo.info.info".into()))?;
        let fields = info
            .as_object()
            .ok_or_else(|| AftlError::JsonShape("Value.FwInfo.info.info is not an object".into()))?
            .clone();
        for key in fields.keys() {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                return Err(AftlError::JsonShape(format!("unrecognized key {key:?}")));
            }
        }
        Ok(Self {
            raw: data.to_vec(),
            fields,
        })
    }

    /// The exact bytes the log returned; this is what gets leaf-hashed.
    #[must_use]
    pub fn encode(&self) -> &[u8] {
        &self.raw
    }

    /// Length of the stored bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// SHA-256 of the vbmeta image this leaf describes.
    #[must_use]
    pub fn vbmeta_hash(&self) -> Option<Vec<u8>> {
        self.base64_field("vbmeta_hash")
    }

    /// `version_incremental` component of the build fingerprint.
    #[must_use]
    pub fn version_incremental(&self) -> Option<&str> {
        self.fields.get("version_incremental").and_then(Value::as_str)
    }

    /// Public key of the platform (the vbmeta signing key).
    #[must_use]
    pub fn platform_key(&self) -> Option<Vec<u8>> {
        self.base64_field("platform_key")
    }

    /// SHA-256 of the manufacturer public key (SPKI DER).
    #[must_use]
    pub fn manufacturer_key_hash(&self) -> Option<Vec<u8>> {
        self.base64_field("manufacturer_key_hash")
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.fields.get("description").and_then(Value::as_str)
    }

    /// Decodes a Base64 field lazily; undecodable values read as absent,
    /// so dependent checks fail closed.
    fn base64_field(&self, key: &str) -> Option<Vec<u8>> {
        let s = self.fields.get(key)?.as_str()?;
        BASE64_STANDARD.decode(s).ok()
    }

    /// Writes the human-readable description used by `info_image_icp`.
    ///
    /// # Errors
    /// Propagates writer failures.
    pub fn print_desc<W: Write>(&self, o: &mut W) -> std::io::Result<()> {
        writeln!(o, "    Firmware Info Leaf:")?;
        let i = " ".repeat(6);
        if let Some(h) = self.vbmeta_hash() {
            writeln!(o, "{i}{:<23}{}", "VBMeta hash:", hex::encode(h))?;
        }
        if let Some(v) = self.version_incremental() {
            writeln!(o, "{i}{:<23}{v}", "Version incremental:")?;
        }
        if let Some(k) = self.platform_key() {
            writeln!(o, "{i}{:<23}{}", "Platform key:", String::from_utf8_lossy(&k))?;
        }
        if let Some(h) = self.manufacturer_key_hash() {
            writeln!(o, "{i}{:<23}{}", "Manufacturer key hash:", hex::encode(h))?;
        }
        if let Some(d) = self.description() {
            writeln!(o, "{i}{:<23}{d}", "Description:")?;
        }
        Ok(())
    }
}
