// crates/aftl-tool/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use aftl_crypto::{ManufacturerKey, SigningHelper};
use aftl_log::TransparencyLogConfig;
use aftl_tool::{load_test, ops};

#[derive(Parser, Debug)]
#[command(
    name = "aftltool",
    about = "AFTL support for Android Verified Boot images",
    long_about = "AFTL support for Android Verified Boot images.\n\nUse this tool to append \
                  transparency-log inclusion proofs to vbmeta images, and to inspect and verify \
                  images that carry them.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Makes an ICP enhanced vbmeta image from an existing vbmeta image.
    #[command(name = "make_icp_from_vbmeta")]
    MakeIcpFromVbmeta {
        /// Output file name.
        #[arg(long)]
        output: PathBuf,

        /// Path to the vbmeta image file.
        #[arg(long)]
        vbmeta_image_path: PathBuf,

        /// Current build ID.
        #[arg(long)]
        version_incremental: String,

        /// Path to the PEM file containing the manufacturer key for use
        /// with the log.
        #[arg(long)]
        manufacturer_key: PathBuf,

        /// Transparency log servers in host:port,publickey_file[,api_key]
        /// format. The publickey_file must be in the PEM format.
        #[arg(long, required = true, num_args = 1..)]
        transparency_log_servers: Vec<TransparencyLogConfig>,

        /// If non-zero, pads output with NUL bytes so its size is a
        /// multiple of NUMBER.
        #[arg(long, value_name = "NUMBER", default_value_t = 0)]
        padding_size: usize,

        /// Timeout in seconds for transparency log requests. A value of 0
        /// means no timeout.
        #[arg(long, value_name = "SECONDS", default_value_t = 600)]
        timeout: u64,

        /// Program which signs a hash and returns a signature.
        #[arg(long)]
        signing_helper: Option<PathBuf>,

        /// Same as --signing_helper but uses files instead.
        #[arg(long)]
        signing_helper_with_files: Option<PathBuf>,
    },

    /// Show information about AFTL ICPs in vbmeta or footer.
    #[command(name = "info_image_icp")]
    InfoImageIcp {
        /// Path to vbmeta image for AFTL information.
        #[arg(long)]
        vbmeta_image_path: PathBuf,

        /// Write info to file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Verify AFTL ICPs in vbmeta or footer.
    #[command(name = "verify_image_icp")]
    VerifyImageIcp {
        /// Image to verify the inclusion proofs.
        #[arg(long)]
        vbmeta_image_path: PathBuf,

        /// Paths to PEM files containing transparency log server key(s).
        #[arg(long, required = true, num_args = 1..)]
        transparency_log_pub_keys: Vec<PathBuf>,

        /// Write info to file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Perform load testing against one AFTL log server. Note: This MUST
    /// not be performed against a production system.
    #[command(name = "load_test_aftl")]
    LoadTestAftl {
        /// Path to the vbmeta image file.
        #[arg(long)]
        vbmeta_image_path: PathBuf,

        /// Write report to file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Path to the PEM file containing the manufacturer key for use
        /// with the log.
        #[arg(long)]
        manufacturer_key: PathBuf,

        /// Transparency log server to test against in
        /// host:port,publickey_file[,api_key] format.
        #[arg(long)]
        transparency_log_server: TransparencyLogConfig,

        /// Number of parallel workers to use for testing.
        #[arg(long, default_value_t = 1)]
        processes: usize,

        /// Number of submissions to perform against the log per worker.
        #[arg(long, default_value_t = 1)]
        submissions: usize,

        /// Path to the stats file to write the raw execution data to.
        #[arg(long)]
        stats_file: Option<PathBuf>,

        /// Keep the generated vbmeta image files with inclusion proofs.
        #[arg(long, default_value_t = false)]
        preserve_icp_images: bool,

        /// Timeout in seconds for transparency log requests. A value of 0
        /// means no timeout.
        #[arg(long, value_name = "SECONDS", default_value_t = 0)]
        timeout: u64,
    },
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match run(cli.cmd) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("aftltool: {e:#}");
            std::process::exit(2);
        }
    }
}

fn run(cmd: Cmd) -> Result<bool> {
    match cmd {
        Cmd::MakeIcpFromVbmeta {
            output,
            vbmeta_image_path,
            version_incremental,
            manufacturer_key,
            transparency_log_servers,
            padding_size,
            timeout,
            signing_helper,
            signing_helper_with_files,
        } => {
            let helper = signing_helper_with_files
                .map(SigningHelper::WithFiles)
                .or(signing_helper.map(SigningHelper::Stdin));
            let key = ManufacturerKey::from_pem_file(&manufacturer_key, helper)
                .with_context(|| format!("loading {}", manufacturer_key.display()))?;
            let mut out = File::create(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            let ok = ops::make_icp_from_vbmeta(
                &vbmeta_image_path,
                &mut out,
                &version_incremental,
                &transparency_log_servers,
                &key,
                padding_size,
                seconds(timeout),
            )
            .context("making ICP enhanced vbmeta image")?;
            Ok(ok)
        }

        Cmd::InfoImageIcp {
            vbmeta_image_path,
            output,
        } => {
            let mut out = open_output(output.as_deref())?;
            Ok(ops::info_image_icp(&vbmeta_image_path, &mut out)?)
        }

        Cmd::VerifyImageIcp {
            vbmeta_image_path,
            transparency_log_pub_keys,
            output,
        } => {
            let mut out = open_output(output.as_deref())?;
            Ok(ops::verify_image_icp(
                &vbmeta_image_path,
                &transparency_log_pub_keys,
                &mut out,
            )?)
        }

        Cmd::LoadTestAftl {
            vbmeta_image_path,
            output,
            manufacturer_key,
            transparency_log_server,
            processes,
            submissions,
            stats_file,
            preserve_icp_images,
            timeout,
        } => {
            let key = ManufacturerKey::from_pem_file(&manufacturer_key, None)
                .with_context(|| format!("loading {}", manufacturer_key.display()))?;
            let mut out = open_output(output.as_deref())?;
            let ok = load_test::load_test_aftl(
                &vbmeta_image_path,
                &mut out,
                &transparency_log_server,
                &key,
                processes,
                submissions,
                stats_file.as_deref(),
                preserve_icp_images,
                seconds(timeout),
            )
            .context("load testing")?;
            Ok(ok)
        }
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Zero means "no timeout".
fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Ok(Box::new(f))
        }
        None => Ok(Box::new(io::stdout())),
    }
}
