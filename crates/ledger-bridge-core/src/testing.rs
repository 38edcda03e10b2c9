//! Scripted in-memory transport and fixture credentials for unit tests.

use crate::identity::{load_identity, Credentials, KeySource};
use crate::pb::common::Envelope;
use crate::pb::gateway::{
    CommitStatusResponse, EndorseRequest, EndorseResponse, EvaluateRequest, EvaluateResponse,
    SignedCommitStatusRequest, SubmitRequest, SubmitResponse,
};
use crate::pb::protos::{Response, TxValidationCode};
use crate::proposal::tests::prepared_transaction;
use crate::transport::LedgerTransport;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonic::Status;

pub(crate) fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/org1")
        .join(relative)
}

pub(crate) fn credentials() -> Credentials {
    load_identity(
        "Org1MSP",
        &fixture("msp/signcerts/cert.pem"),
        &KeySource::Directory(fixture("msp/keystore")),
    )
    .unwrap()
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Ok,
    Fail(Status),
    Hang,
}

/// What each gateway call does, plus everything the transport observed.
#[derive(Clone)]
pub(crate) struct FakeTransport {
    pub endorse: Reply,
    pub submit: Reply,
    pub commit: Reply,
    pub evaluate: Reply,
    pub commit_code: TxValidationCode,
    pub result: Vec<u8>,
    pub evaluate_status: i32,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
    pub submitted: Arc<Mutex<Vec<Envelope>>>,
    pub closes: Arc<AtomicUsize>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            endorse: Reply::Ok,
            submit: Reply::Ok,
            commit: Reply::Ok,
            evaluate: Reply::Ok,
            commit_code: TxValidationCode::Valid,
            result: br#"{"status":"logged"}"#.to_vec(),
            evaluate_status: 200,
            calls: Arc::default(),
            submitted: Arc::default(),
            closes: Arc::default(),
        }
    }
}

impl FakeTransport {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    async fn reply(&self, call: &'static str, reply: &Reply) -> Result<(), Status> {
        self.calls.lock().unwrap().push(call);
        match reply {
            Reply::Ok => Ok(()),
            Reply::Fail(status) => Err(status.clone()),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl LedgerTransport for FakeTransport {
    async fn evaluate(
        &self,
        _request: EvaluateRequest,
        _timeout: Duration,
    ) -> Result<EvaluateResponse, Status> {
        self.reply("evaluate", &self.evaluate).await?;
        Ok(EvaluateResponse {
            result: Some(Response {
                status: self.evaluate_status,
                message: if self.evaluate_status >= 400 {
                    "asset evt-9 does not exist".to_string()
                } else {
                    String::new()
                },
                payload: self.result.clone(),
            }),
        })
    }

    async fn endorse(
        &self,
        _request: EndorseRequest,
        _timeout: Duration,
    ) -> Result<EndorseResponse, Status> {
        self.reply("endorse", &self.endorse).await?;
        Ok(EndorseResponse {
            prepared_transaction: Some(prepared_transaction(&self.result)),
        })
    }

    async fn submit(
        &self,
        request: SubmitRequest,
        _timeout: Duration,
    ) -> Result<SubmitResponse, Status> {
        self.reply("submit", &self.submit).await?;
        if let Some(envelope) = request.prepared_transaction {
            self.submitted.lock().unwrap().push(envelope);
        }
        Ok(SubmitResponse {})
    }

    async fn commit_status(
        &self,
        _request: SignedCommitStatusRequest,
        _timeout: Duration,
    ) -> Result<CommitStatusResponse, Status> {
        self.reply("commit_status", &self.commit).await?;
        Ok(CommitStatusResponse {
            result: self.commit_code as i32,
            block_number: 7,
        })
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
