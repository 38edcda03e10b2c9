use crate::pb::gateway::gateway_client::GatewayClient;
use crate::pb::gateway::{
    CommitStatusResponse, EndorseRequest, EndorseResponse, EvaluateRequest, EvaluateResponse,
    SignedCommitStatusRequest, SubmitRequest, SubmitResponse,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tonic::transport::Channel;
use tonic::{Request, Status};
use tracing::debug;

/// The four gateway calls a session drives, plus release of the underlying connection.
///
/// `timeout` is forwarded to the remote side; the caller still enforces it locally.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn evaluate(
        &self,
        request: EvaluateRequest,
        timeout: Duration,
    ) -> Result<EvaluateResponse, Status>;

    async fn endorse(
        &self,
        request: EndorseRequest,
        timeout: Duration,
    ) -> Result<EndorseResponse, Status>;

    async fn submit(
        &self,
        request: SubmitRequest,
        timeout: Duration,
    ) -> Result<SubmitResponse, Status>;

    async fn commit_status(
        &self,
        request: SignedCommitStatusRequest,
        timeout: Duration,
    ) -> Result<CommitStatusResponse, Status>;

    /// Releases the connection. Calls after the first are no-ops.
    fn close(&self);
}

/// gRPC transport over a tonic channel.
pub struct GrpcTransport {
    client: Mutex<Option<GatewayClient<Channel>>>,
}

impl fmt::Debug for GrpcTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcTransport")
            .field("open", &self.is_open())
            .finish()
    }
}

impl GrpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: Mutex::new(Some(GatewayClient::new(channel))),
        }
    }

    pub fn is_open(&self) -> bool {
        self.client
            .lock()
            .map(|client| client.is_some())
            .unwrap_or(false)
    }

    fn client(&self) -> Result<GatewayClient<Channel>, Status> {
        let guard = self
            .client
            .lock()
            .map_err(|_| Status::internal("gateway client lock poisoned"))?;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| Status::unavailable("gateway transport is closed"))
    }
}

fn with_timeout<T>(message: T, timeout: Duration) -> Request<T> {
    let mut request = Request::new(message);
    request.set_timeout(timeout);
    request
}

#[async_trait]
impl LedgerTransport for GrpcTransport {
    async fn evaluate(
        &self,
        request: EvaluateRequest,
        timeout: Duration,
    ) -> Result<EvaluateResponse, Status> {
        let mut client = self.client()?;
        Ok(client
            .evaluate(with_timeout(request, timeout))
            .await?
            .into_inner())
    }

    async fn endorse(
        &self,
        request: EndorseRequest,
        timeout: Duration,
    ) -> Result<EndorseResponse, Status> {
        let mut client = self.client()?;
        Ok(client
            .endorse(with_timeout(request, timeout))
            .await?
            .into_inner())
    }

    async fn submit(
        &self,
        request: SubmitRequest,
        timeout: Duration,
    ) -> Result<SubmitResponse, Status> {
        let mut client = self.client()?;
        Ok(client
            .submit(with_timeout(request, timeout))
            .await?
            .into_inner())
    }

    async fn commit_status(
        &self,
        request: SignedCommitStatusRequest,
        timeout: Duration,
    ) -> Result<CommitStatusResponse, Status> {
        let mut client = self.client()?;
        Ok(client
            .commit_status(with_timeout(request, timeout))
            .await?
            .into_inner())
    }

    fn close(&self) {
        let released = match self.client.lock() {
            Ok(mut client) => client.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if released.is_some() {
            debug!("gateway transport closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::transport::Endpoint;

    #[tokio::test]
    async fn calls_after_close_are_unavailable() {
        let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
        let transport = GrpcTransport::new(channel);
        assert!(transport.is_open());
        assert_eq!(format!("{transport:?}"), "GrpcTransport { open: true }");

        transport.close();
        transport.close();
        assert!(!transport.is_open());

        let status = transport
            .submit(SubmitRequest::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }
}
