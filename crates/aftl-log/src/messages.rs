// crates/aftl-log/src/messages.rs

//! Protobuf messages of the `aftl.AFTLog` service.
//!
//! Hand-maintained prost structs; the tag numbers follow the upstream
//! `aftl.proto` / `api.proto` / Trillian / sigpb definitions and must not
//! change.

/// One firmware submission record.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct FirmwareInfo {
    /// SHA-256 of the vbmeta image.
    #[prost(bytes = "vec", tag = "1")]
    pub vbmeta_hash: Vec<u8>,
    /// `version_incremental` component of the build fingerprint.
    #[prost(string, tag = "2")]
    pub version_incremental: String,
    /// Public key of the platform (the vbmeta signing key).
    #[prost(bytes = "vec", tag = "3")]
    pub platform_key: Vec<u8>,
    /// SHA-256 of the manufacturer public key (SPKI DER).
    #[prost(bytes = "vec", tag = "4")]
    pub manufacturer_key_hash: Vec<u8>,
    /// Free-form description.
    #[prost(string, tag = "5")]
    pub description: String,
}

/// Hash algorithms of the sigpb `DigitallySigned` message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum HashAlgorithm {
    /// No hash algorithm.
    None = 0,
    /// MD5 (unused).
    Md5 = 1,
    /// SHA-1 (unused).
    Sha1 = 2,
    /// SHA-224 (unused).
    Sha224 = 3,
    /// SHA-256; the only value this client emits.
    Sha256 = 4,
    /// SHA-384 (unused).
    Sha384 = 5,
    /// SHA-512 (unused).
    Sha512 = 6,
}

/// Signature algorithms of the sigpb `DigitallySigned` message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignatureAlgorithm {
    /// Anonymous (unused).
    Anonymous = 0,
    /// RSA; the only value this client emits.
    Rsa = 1,
    /// DSA (unused).
    Dsa = 2,
    /// ECDSA (accepted from logs).
    Ecdsa = 3,
}

/// A detached signature with its algorithm pair.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct DigitallySigned {
    /// One of [`HashAlgorithm`].
    #[prost(enumeration = "HashAlgorithm", tag = "1")]
    pub hash_algorithm: i32,
    /// One of [`SignatureAlgorithm`].
    #[prost(enumeration = "SignatureAlgorithm", tag = "2")]
    pub signature_algorithm: i32,
    /// Raw signature bytes.
    #[prost(bytes = "vec", tag = "3")]
    pub signature: Vec<u8>,
}

/// A firmware-info record plus the manufacturer's signature over it.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SignedFirmwareInfo {
    /// The signed record.
    #[prost(message, optional, tag = "1")]
    pub info: Option<FirmwareInfo>,
    /// Signature over the serialized record.
    #[prost(message, optional, tag = "2")]
    pub info_signature: Option<DigitallySigned>,
}

/// Request of the `AddFirmwareInfo` RPC.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct AddFirmwareInfoRequest {
    /// The full vbmeta image being logged.
    #[prost(bytes = "vec", tag = "1")]
    pub vbmeta: Vec<u8>,
    /// The signed firmware-info record.
    #[prost(message, optional, tag = "2")]
    pub fw_info: Option<SignedFirmwareInfo>,
}

/// Trillian Merkle audit path.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Proof {
    /// Index of the proven leaf.
    #[prost(int64, tag = "1")]
    pub leaf_index: i64,
    /// Sibling hashes, leaf-to-root order.
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub hashes: Vec<Vec<u8>>,
}

/// Trillian signed log root.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SignedLogRoot {
    /// Hint identifying the signing key.
    #[prost(bytes = "vec", tag = "7")]
    pub key_hint: Vec<u8>,
    /// Serialized `log_root` descriptor; the bytes that are signed.
    #[prost(bytes = "vec", tag = "8")]
    pub log_root: Vec<u8>,
    /// Detached signature over `log_root`.
    #[prost(bytes = "vec", tag = "9")]
    pub log_root_signature: Vec<u8>,
}

/// Audit path plus the tree head it chains to.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct InclusionProof {
    /// The audit path.
    #[prost(message, optional, tag = "1")]
    pub proof: Option<Proof>,
    /// The signed tree head.
    #[prost(message, optional, tag = "2")]
    pub sth: Option<SignedLogRoot>,
}

/// Response of the `AddFirmwareInfo` RPC.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct AddFirmwareInfoResponse {
    /// Inclusion proof for the stored leaf.
    #[prost(message, optional, tag = "1")]
    pub fw_info_proof: Option<InclusionProof>,
    /// The leaf exactly as stored by the log.
    #[prost(bytes = "vec", tag = "2")]
    pub fw_info_leaf: Vec<u8>,
}

/// Full method path of the unary RPC this client calls.
pub const ADD_FIRMWARE_INFO_PATH: &str = "/aftl.AFTLog/AddFirmwareInfo";
