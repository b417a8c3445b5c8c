// crates/aftl-log/src/transport.rs

//! The transport capability and its gRPC implementation.
//!
//! The rest of the workspace is synchronous; the tokio runtime lives
//! entirely inside [`GrpcTransport::add_firmware_info`], so callers only
//! see a blocking call bounded by their timeout.

use std::time::Duration;

use aftl_core::{AftlError, Result};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::Channel;
use tracing::info;

use crate::config::TransparencyLogConfig;
use crate::messages::{AddFirmwareInfoRequest, AddFirmwareInfoResponse, ADD_FIRMWARE_INFO_PATH};

/// Capability to submit a firmware-info record to one log.
///
/// Production code uses [`GrpcTransport`]; tests substitute doubles.
pub trait LogTransport {
    /// Performs the `AddFirmwareInfo` call.
    ///
    /// # Errors
    /// [`AftlError::Transport`] or [`AftlError::TransportTimeout`].
    fn add_firmware_info(&self, request: AddFirmwareInfoRequest)
        -> Result<AddFirmwareInfoResponse>;
}

/// gRPC transport to a transparency log.
#[derive(Clone, Debug)]
pub struct GrpcTransport {
    target: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl GrpcTransport {
    /// Builds a transport for `config`; `timeout` bounds both connect and
    /// request, `None` means no deadline.
    #[must_use]
    pub fn new(config: &TransparencyLogConfig, timeout: Option<Duration>) -> Self {
        Self {
            target: config.target.clone(),
            api_key: config.api_key.clone(),
            timeout,
        }
    }

    async fn call(&self, request: AddFirmwareInfoRequest) -> Result<AddFirmwareInfoResponse> {
        let mut endpoint = Channel::from_shared(format!("http://{}", self.target))
            .map_err(|e| AftlError::Transport(format!("bad target {}: {e}", self.target)))?;
        if let Some(timeout) = self.timeout {
            endpoint = endpoint.connect_timeout(timeout).timeout(timeout);
        }
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| AftlError::Transport(format!("connect {}: {e}", self.target)))?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| AftlError::Transport(format!("service not ready: {e}")))?;

        let mut req = tonic::Request::new(request);
        if let Some(timeout) = self.timeout {
            req.set_timeout(timeout);
        }
        if let Some(api_key) = &self.api_key {
            let value: MetadataValue<Ascii> = api_key
                .parse()
                .map_err(|_| AftlError::Transport("api key is not valid metadata".into()))?;
            req.metadata_mut().insert("x-api-key", value);
        }

        let codec: tonic::codec::ProstCodec<AddFirmwareInfoRequest, AddFirmwareInfoResponse> =
            tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(ADD_FIRMWARE_INFO_PATH);
        let response = grpc
            .unary(req, path, codec)
            .await
            .map_err(|status| self.map_status(&status))?;
        Ok(response.into_inner())
    }

    fn map_status(&self, status: &tonic::Status) -> AftlError {
        if status.code() == tonic::Code::DeadlineExceeded {
            AftlError::TransportTimeout(self.timeout.unwrap_or_default())
        } else {
            AftlError::Transport(format!("grpc failure ({status})"))
        }
    }
}

impl LogTransport for GrpcTransport {
    fn add_firmware_info(
        &self,
        request: AddFirmwareInfoRequest,
    ) -> Result<AddFirmwareInfoResponse> {
        info!(server = %self.target, "requesting inclusion proof; this can take ~30 seconds");
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| AftlError::Transport(format!("runtime: {e}")))?;
        runtime.block_on(self.call(request))
    }
}
