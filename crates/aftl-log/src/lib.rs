// crates/aftl-log/src/lib.rs

//! Client side of the AFTL transparency log.
//!
//! - [`messages`]: the protobuf messages exchanged with the log.
//! - [`transport`]: the [`LogTransport`] capability and its gRPC
//!   implementation; everything above the transport stays synchronous.
//! - [`submit`]: builds, signs, and submits a firmware-info record, and
//!   translates the response into an [`aftl_image::AftlIcpEntry`].
//! - [`config`]: the `host:port,pubkey_pem[,api_key]` log configuration.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod config;
pub mod messages;
pub mod submit;
pub mod transport;

pub use config::TransparencyLogConfig;
pub use submit::{entry_from_response, request_inclusion_proof};
pub use transport::{GrpcTransport, LogTransport};
