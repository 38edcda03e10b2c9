// @generated
// Generated from: proto/gateway/gateway.proto
// Manual check-in for offline builds.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndorseRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub channel_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub proposed_transaction: ::core::option::Option<super::protos::SignedProposal>,
    #[prost(string, repeated, tag = "4")]
    pub endorsing_organizations: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndorseResponse {
    #[prost(message, optional, tag = "1")]
    pub prepared_transaction: ::core::option::Option<super::common::Envelope>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub channel_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub prepared_transaction: ::core::option::Option<super::common::Envelope>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SubmitResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedCommitStatusRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub request: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitStatusRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub channel_id: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "3")]
    pub identity: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CommitStatusResponse {
    #[prost(enumeration = "super::protos::TxValidationCode", tag = "1")]
    pub result: i32,
    #[prost(uint64, tag = "2")]
    pub block_number: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EvaluateRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub channel_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub proposed_transaction: ::core::option::Option<super::protos::SignedProposal>,
    #[prost(string, repeated, tag = "4")]
    pub target_organizations: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EvaluateResponse {
    #[prost(message, optional, tag = "1")]
    pub result: ::core::option::Option<super::protos::Response>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorDetail {
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub msp_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
}

pub mod gateway_client {
    #![allow(clippy::derive_partial_eq_without_eq)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct GatewayClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl GatewayClient<tonic::transport::Channel> {
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> GatewayClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub async fn endorse(
            &mut self,
            request: impl tonic::IntoRequest<super::EndorseRequest>,
        ) -> Result<tonic::Response<super::EndorseResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                tonic::codegen::http::uri::PathAndQuery::from_static("/gateway.Gateway/Endorse");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn submit(
            &mut self,
            request: impl tonic::IntoRequest<super::SubmitRequest>,
        ) -> Result<tonic::Response<super::SubmitResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                tonic::codegen::http::uri::PathAndQuery::from_static("/gateway.Gateway/Submit");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn commit_status(
            &mut self,
            request: impl tonic::IntoRequest<super::SignedCommitStatusRequest>,
        ) -> Result<tonic::Response<super::CommitStatusResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                tonic::codegen::http::uri::PathAndQuery::from_static("/gateway.Gateway/CommitStatus");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn evaluate(
            &mut self,
            request: impl tonic::IntoRequest<super::EvaluateRequest>,
        ) -> Result<tonic::Response<super::EvaluateResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                tonic::codegen::http::uri::PathAndQuery::from_static("/gateway.Gateway/Evaluate");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
}

pub mod gateway_server {
    #![allow(clippy::derive_partial_eq_without_eq)]
    use tonic::codegen::*;

    #[tonic::async_trait]
    pub trait Gateway: Send + Sync + 'static {
        async fn endorse(
            &self,
            request: tonic::Request<super::EndorseRequest>,
        ) -> Result<tonic::Response<super::EndorseResponse>, tonic::Status>;
        async fn submit(
            &self,
            request: tonic::Request<super::SubmitRequest>,
        ) -> Result<tonic::Response<super::SubmitResponse>, tonic::Status>;
        async fn commit_status(
            &self,
            request: tonic::Request<super::SignedCommitStatusRequest>,
        ) -> Result<tonic::Response<super::CommitStatusResponse>, tonic::Status>;
        async fn evaluate(
            &self,
            request: tonic::Request<super::EvaluateRequest>,
        ) -> Result<tonic::Response<super::EvaluateResponse>, tonic::Status>;
    }

    pub struct GatewayServer<T: Gateway> {
        inner: Arc<T>,
    }

    impl<T: Gateway> GatewayServer<T> {
        pub fn new(inner: T) -> Self {
            Self::from_arc(Arc::new(inner))
        }

        pub fn from_arc(inner: Arc<T>) -> Self {
            Self { inner }
        }
    }

    impl<T: Gateway> Clone for GatewayServer<T> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
            }
        }
    }

    impl<T, B> Service<http::Request<B>> for GatewayServer<T>
    where
        T: Gateway,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/gateway.Gateway/Endorse" => {
                    struct EndorseSvc<T: Gateway>(pub Arc<T>);
                    impl<T: Gateway> tonic::server::UnaryService<super::EndorseRequest> for EndorseSvc<T> {
                        type Response = super::EndorseResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::EndorseRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            Box::pin(async move { inner.endorse(request).await })
                        }
                    }
                    Box::pin(async move {
                        let method = EndorseSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    })
                }
                "/gateway.Gateway/Submit" => {
                    struct SubmitSvc<T: Gateway>(pub Arc<T>);
                    impl<T: Gateway> tonic::server::UnaryService<super::SubmitRequest> for SubmitSvc<T> {
                        type Response = super::SubmitResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::SubmitRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            Box::pin(async move { inner.submit(request).await })
                        }
                    }
                    Box::pin(async move {
                        let method = SubmitSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    })
                }
                "/gateway.Gateway/CommitStatus" => {
                    struct CommitStatusSvc<T: Gateway>(pub Arc<T>);
                    impl<T: Gateway> tonic::server::UnaryService<super::SignedCommitStatusRequest> for CommitStatusSvc<T> {
                        type Response = super::CommitStatusResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::SignedCommitStatusRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            Box::pin(async move { inner.commit_status(request).await })
                        }
                    }
                    Box::pin(async move {
                        let method = CommitStatusSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    })
                }
                "/gateway.Gateway/Evaluate" => {
                    struct EvaluateSvc<T: Gateway>(pub Arc<T>);
                    impl<T: Gateway> tonic::server::UnaryService<super::EvaluateRequest> for EvaluateSvc<T> {
                        type Response = super::EvaluateResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::EvaluateRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            Box::pin(async move { inner.evaluate(request).await })
                        }
                    }
                    Box::pin(async move {
                        let method = EvaluateSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    })
                }
                _ => Box::pin(async move {
                    let mut response = http::Response::new(tonic::body::empty_body());
                    let headers = response.headers_mut();
                    headers.insert(
                        tonic::Status::GRPC_STATUS,
                        (tonic::Code::Unimplemented as i32).into(),
                    );
                    headers.insert(
                        http::header::CONTENT_TYPE,
                        tonic::metadata::GRPC_CONTENT_TYPE,
                    );
                    Ok(response)
                }),
            }
        }
    }

    impl<T: Gateway> tonic::server::NamedService for GatewayServer<T> {
        const NAME: &'static str = "gateway.Gateway";
    }
}
