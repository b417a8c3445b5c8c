// crates/aftl-tool/src/lib.rs

//! Business logic behind the `aftltool` binary: the make/info/verify
//! operations over augmented vbmeta images, and the load-test harness.

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

pub mod ops;
