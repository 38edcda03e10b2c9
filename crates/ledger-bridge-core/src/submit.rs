//! Transaction Submitter.
//!
//! Drives one transaction through resolve, serialize, endorse, submit and commit, each
//! network-bound phase under its own deadline from the session. Nothing is retried here: every
//! failure is returned with the phase it happened in, and [`SubmissionError::is_ambiguous`]
//! tells callers when the ledger outcome is unknown.

use crate::error::{Phase, SubmissionError};
use crate::flow::PhaseMachine;
use crate::pb::gateway::{
    CommitStatusRequest, EndorseRequest, ErrorDetail, EvaluateRequest, SignedCommitStatusRequest,
    SubmitRequest,
};
use crate::pb::google::rpc::Status as RpcStatus;
use crate::pb::protos::{SignedProposal, TxValidationCode};
use crate::proposal::{build_proposal, extract_result, TransactionRequest};
use crate::session::GatewaySession;
use prost::Message;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tonic::{Code, Status};
use tracing::{debug, info, instrument, warn};

/// A transaction the ledger reported as committed and valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub transaction_id: String,
    pub block_number: u64,
    /// Opaque payload returned by the contract function.
    pub result: Vec<u8>,
}

pub type TransactionResult = Result<SubmittedTransaction, SubmissionError>;

/// A named channel reachable through a session.
pub struct Network<'a> {
    session: &'a GatewaySession,
    name: String,
}

impl GatewaySession {
    pub fn network(&self, name: impl Into<String>) -> Network<'_> {
        Network {
            session: self,
            name: name.into(),
        }
    }
}

impl<'a> Network<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self, name: impl Into<String>) -> Contract<'a> {
        Contract {
            session: self.session,
            channel: self.name.clone(),
            name: name.into(),
        }
    }
}

/// A (channel, contract) coordinate bound to a session.
pub struct Contract<'a> {
    session: &'a GatewaySession,
    channel: String,
    name: String,
}

struct Prepared {
    transaction_id: String,
    creator: Vec<u8>,
    signed: SignedProposal,
}

impl Contract<'_> {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endorses, orders and waits for commit of `request`.
    #[instrument(
        name = "submit_transaction",
        skip_all,
        fields(channel = %self.channel, contract = %self.name, function = %request.function)
    )]
    pub async fn submit(&self, request: &TransactionRequest) -> TransactionResult {
        let timeouts = self.session.timeouts();
        let mut phases = PhaseMachine::new(&self.channel, &self.name);
        let Prepared {
            transaction_id,
            creator,
            signed,
        } = self.prepare(&mut phases, request)?;
        let tx = transaction_id.as_str();

        phases.mark_endorse()?;
        let endorsed = self
            .run_phase(
                Phase::Endorse,
                tx,
                timeouts.endorse,
                self.session.transport().endorse(
                    EndorseRequest {
                        transaction_id: transaction_id.clone(),
                        channel_id: self.channel.clone(),
                        proposed_transaction: Some(signed),
                        endorsing_organizations: Vec::new(),
                    },
                    timeouts.endorse,
                ),
            )
            .await?;
        let mut prepared = endorsed
            .prepared_transaction
            .ok_or_else(|| SubmissionError::MalformedResponse {
                phase: Phase::Endorse,
                message: "endorse response carries no prepared transaction".to_string(),
            })?;
        let result = extract_result(&prepared)?;
        prepared.signature = self.session.sign("prepared transaction", &prepared.payload)?;

        phases.mark_submit()?;
        self.run_phase(
            Phase::Submit,
            tx,
            timeouts.submit,
            self.session.transport().submit(
                SubmitRequest {
                    transaction_id: transaction_id.clone(),
                    channel_id: self.channel.clone(),
                    prepared_transaction: Some(prepared),
                },
                timeouts.submit,
            ),
        )
        .await?;

        phases.mark_commit()?;
        let status_request = CommitStatusRequest {
            transaction_id: transaction_id.clone(),
            channel_id: self.channel.clone(),
            identity: creator,
        }
        .encode_to_vec();
        let signature = self.session.sign("commit status request", &status_request)?;
        let status = self
            .run_phase(
                Phase::Commit,
                tx,
                timeouts.commit,
                self.session.transport().commit_status(
                    SignedCommitStatusRequest {
                        request: status_request,
                        signature,
                    },
                    timeouts.commit,
                ),
            )
            .await?;

        match TxValidationCode::try_from(status.result) {
            Ok(TxValidationCode::Valid) => {
                info!(
                    transaction_id = tx,
                    block_number = status.block_number,
                    "transaction committed"
                );
                Ok(SubmittedTransaction {
                    transaction_id,
                    block_number: status.block_number,
                    result,
                })
            }
            code => {
                let code = code
                    .map(|code| code.as_str_name().to_string())
                    .unwrap_or_else(|_| format!("validation code {}", status.result));
                warn!(transaction_id = tx, %code, "transaction invalidated at commit");
                Err(SubmissionError::RemoteExecutionFailed {
                    phase: Phase::Commit,
                    transaction_id,
                    message: format!(
                        "committed with status {code} in block {}",
                        status.block_number
                    ),
                })
            }
        }
    }

    /// Runs `request` on a peer without ordering it and returns the contract's payload.
    #[instrument(
        name = "evaluate_transaction",
        skip_all,
        fields(channel = %self.channel, contract = %self.name, function = %request.function)
    )]
    pub async fn evaluate(
        &self,
        request: &TransactionRequest,
    ) -> Result<Vec<u8>, SubmissionError> {
        let timeouts = self.session.timeouts();
        let mut phases = PhaseMachine::new(&self.channel, &self.name);
        let Prepared {
            transaction_id,
            signed,
            ..
        } = self.prepare(&mut phases, request)?;

        phases.mark_evaluate()?;
        let evaluated = self
            .run_phase(
                Phase::Evaluate,
                &transaction_id,
                timeouts.evaluate,
                self.session.transport().evaluate(
                    EvaluateRequest {
                        transaction_id: transaction_id.clone(),
                        channel_id: self.channel.clone(),
                        proposed_transaction: Some(signed),
                        target_organizations: Vec::new(),
                    },
                    timeouts.evaluate,
                ),
            )
            .await?;

        let response = evaluated
            .result
            .ok_or_else(|| SubmissionError::MalformedResponse {
                phase: Phase::Evaluate,
                message: "evaluate response carries no result".to_string(),
            })?;
        if response.status >= 400 {
            return Err(SubmissionError::RemoteExecutionFailed {
                phase: Phase::Evaluate,
                transaction_id,
                message: format!(
                    "contract returned status {}: {}",
                    response.status, response.message
                ),
            });
        }
        Ok(response.payload)
    }

    fn prepare(
        &self,
        phases: &mut PhaseMachine,
        request: &TransactionRequest,
    ) -> Result<Prepared, SubmissionError> {
        phases.mark_resolve()?;
        if self.channel.trim().is_empty() || self.name.trim().is_empty() {
            return Err(self.unknown_target("channel and contract names must not be empty"));
        }
        debug!(phase = %Phase::Resolve, "contract coordinate bound");

        phases.mark_serialize()?;
        let creator = self.session.identity().serialize();
        let draft = build_proposal(&self.channel, &self.name, &creator, request)?;
        let signature = self.session.sign("proposal", &draft.proposal_bytes)?;
        debug!(
            phase = %Phase::Serialize,
            transaction_id = %draft.transaction_id,
            args = request.args.len(),
            "proposal signed"
        );

        Ok(Prepared {
            transaction_id: draft.transaction_id,
            creator,
            signed: SignedProposal {
                proposal_bytes: draft.proposal_bytes,
                signature,
            },
        })
    }

    async fn run_phase<T>(
        &self,
        phase: Phase,
        transaction_id: &str,
        budget: Duration,
        call: impl Future<Output = Result<T, Status>>,
    ) -> Result<T, SubmissionError> {
        let started = Instant::now();
        debug!(%phase, transaction_id, budget_ms = budget.as_millis() as u64, "phase started");

        let outcome = match tokio::time::timeout(budget, call).await {
            Ok(Ok(value)) => Ok(value),
            // Servers enforcing the forwarded deadline answer with their own status.
            Ok(Err(_)) if started.elapsed() >= budget => Err(SubmissionError::Timeout {
                phase,
                transaction_id: Some(transaction_id.to_string()),
                after: budget,
            }),
            Ok(Err(status)) => Err(self.classify(phase, transaction_id, budget, status)),
            Err(_) => Err(SubmissionError::Timeout {
                phase,
                transaction_id: Some(transaction_id.to_string()),
                after: budget,
            }),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => info!(%phase, transaction_id, elapsed_ms, "phase completed"),
            Err(err) => warn!(
                %phase,
                transaction_id,
                elapsed_ms,
                ambiguous = err.is_ambiguous(),
                error = %err,
                "phase failed"
            ),
        }
        outcome
    }

    fn classify(
        &self,
        phase: Phase,
        transaction_id: &str,
        budget: Duration,
        status: Status,
    ) -> SubmissionError {
        let code = status.code();
        let message = describe_status(&status);

        if code == Code::DeadlineExceeded {
            return SubmissionError::Timeout {
                phase,
                transaction_id: Some(transaction_id.to_string()),
                after: budget,
            };
        }
        // Once the proposal is endorsed the target exists; later faults keep their phase.
        if matches!(phase, Phase::Evaluate | Phase::Endorse)
            && (code == Code::NotFound || self.names_missing_target(status.message()))
        {
            return self.unknown_target(message);
        }
        if matches!(phase, Phase::Evaluate | Phase::Endorse)
            && matches!(code, Code::Aborted | Code::Unknown | Code::FailedPrecondition)
        {
            return SubmissionError::RemoteExecutionFailed {
                phase,
                transaction_id: transaction_id.to_string(),
                message,
            };
        }
        SubmissionError::Rejected {
            phase,
            code,
            message,
        }
    }

    /// Peers report an undeployed contract or unjoined channel in fixed phrases naming it.
    fn names_missing_target(&self, message: &str) -> bool {
        let contract = &self.name;
        let channel = &self.channel;
        [
            format!("chaincode definition for '{contract}'"),
            format!("chaincode {contract} has been successfully defined on channel"),
            format!("chaincode {contract} not found"),
            format!("channel '{channel}' not found"),
            format!("channel {channel} not found"),
        ]
        .iter()
        .any(|phrase| message.contains(phrase.as_str()))
    }

    fn unknown_target(&self, message: impl Into<String>) -> SubmissionError {
        SubmissionError::UnknownTarget {
            channel: self.channel.clone(),
            contract: self.name.clone(),
            message: message.into(),
        }
    }
}

/// Status message followed by any per-peer `gateway.ErrorDetail` entries.
fn describe_status(status: &Status) -> String {
    let mut message = status.message().to_string();
    let Ok(rich) = RpcStatus::decode(status.details()) else {
        return message;
    };
    for any in rich
        .details
        .iter()
        .filter(|any| any.type_url.ends_with("gateway.ErrorDetail"))
    {
        if let Ok(detail) = ErrorDetail::decode(any.value.as_slice()) {
            message.push_str(&format!(
                "; peer {} ({}): {}",
                detail.address, detail.msp_id, detail.message
            ));
        }
    }
    message
}

/// Binds `network_name`/`contract_name` on `session` and submits `function(args)`.
pub async fn submit(
    session: &GatewaySession,
    network_name: &str,
    contract_name: &str,
    function_name: &str,
    args: Vec<Value>,
) -> TransactionResult {
    let request = TransactionRequest {
        function: function_name.to_string(),
        args,
    };
    session
        .network(network_name)
        .contract(contract_name)
        .submit(&request)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{open_session, PhaseTimeouts};
    use crate::testing::{credentials, FakeTransport, Reply};
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::{Signature, VerifyingKey};
    use p256::pkcs8::DecodePublicKey;
    use prost_types::Any;
    use serde_json::json;

    const CHANNEL: &str = "vitaledgechannel";
    const CONTRACT: &str = "vitaledgechaincode";

    fn session(transport: &FakeTransport) -> GatewaySession {
        let credentials = credentials();
        open_session(
            credentials.identity,
            credentials.signer,
            transport.clone(),
            PhaseTimeouts::default(),
        )
    }

    fn log_event_args() -> Vec<Value> {
        ["evt-1", "login", "ok", "alice", "2024-01-01T00:00:00Z"]
            .into_iter()
            .map(Value::from)
            .collect()
    }

    #[tokio::test]
    async fn log_event_commits_and_returns_contract_payload() {
        let transport = FakeTransport::default();
        let session = session(&transport);

        let committed = submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap();

        assert_eq!(committed.result, br#"{"status":"logged"}"#);
        assert_eq!(committed.block_number, 7);
        assert_eq!(committed.transaction_id.len(), 64);
        assert_eq!(transport.calls(), vec!["endorse", "submit", "commit_status"]);

        session.close();
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn prepared_transaction_is_signed_by_session_key() {
        let transport = FakeTransport::default();
        let session = session(&transport);
        submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap();

        let envelope = transport.submitted.lock().unwrap()[0].clone();
        let key = VerifyingKey::from_public_key_der(session.identity().public_key_der()).unwrap();
        let signature = Signature::from_der(&envelope.signature).unwrap();
        assert!(key.verify(&envelope.payload, &signature).is_ok());
    }

    #[tokio::test]
    async fn unknown_contract_is_unknown_target() {
        let transport = FakeTransport {
            endorse: Reply::Fail(Status::not_found(
                "chaincode definition for 'nosuchcc' not found on channel",
            )),
            ..Default::default()
        };
        let session = session(&transport);

        let err = submit(&session, CHANNEL, "nosuchcc", "LogEvent", log_event_args())
            .await
            .unwrap_err();

        match err {
            SubmissionError::UnknownTarget {
                channel, contract, ..
            } => {
                assert_eq!(channel, CHANNEL);
                assert_eq!(contract, "nosuchcc");
            }
            other => panic!("expected UnknownTarget, got {other:?}"),
        }
        assert_eq!(transport.calls(), vec!["endorse"]);
    }

    #[tokio::test]
    async fn missing_chaincode_message_without_not_found_code_is_unknown_target() {
        let transport = FakeTransport {
            endorse: Reply::Fail(Status::aborted(
                "make sure the chaincode nosuchcc has been successfully defined on channel \
                 vitaledgechannel and try again",
            )),
            ..Default::default()
        };
        let session = session(&transport);

        let err = submit(&session, CHANNEL, "nosuchcc", "LogEvent", log_event_args())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::UnknownTarget { .. }));
    }

    #[tokio::test]
    async fn endorsement_failure_carries_peer_details() {
        let detail = ErrorDetail {
            address: "peer0.clinicians.xmed.ai:7051".to_string(),
            msp_id: "Org1MSP".to_string(),
            message: "chaincode response 500, event evt-1 already logged".to_string(),
        };
        let rich = RpcStatus {
            code: Code::Aborted as i32,
            message: "failed to endorse transaction".to_string(),
            details: vec![Any {
                type_url: "type.googleapis.com/gateway.ErrorDetail".to_string(),
                value: detail.encode_to_vec(),
            }],
        };
        let transport = FakeTransport {
            endorse: Reply::Fail(Status::with_details(
                Code::Aborted,
                "failed to endorse transaction",
                rich.encode_to_vec().into(),
            )),
            ..Default::default()
        };
        let session = session(&transport);

        let err = submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap_err();
        match &err {
            SubmissionError::RemoteExecutionFailed { phase, message, .. } => {
                assert_eq!(*phase, Phase::Endorse);
                assert!(message.contains("peer0.clinicians.xmed.ai:7051"));
                assert!(message.contains("already logged"));
            }
            other => panic!("expected RemoteExecutionFailed, got {other:?}"),
        }
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn invalid_commit_is_remote_execution_failure() {
        let transport = FakeTransport {
            commit_code: TxValidationCode::MvccReadConflict,
            ..Default::default()
        };
        let session = session(&transport);

        let args = vec![json!("u1"), json!("VITAL"), json!(5)];
        let err = submit(&session, CHANNEL, CONTRACT, "IncrementToken", args)
            .await
            .unwrap_err();
        match err {
            SubmissionError::RemoteExecutionFailed { phase, message, .. } => {
                assert_eq!(phase, Phase::Commit);
                assert!(message.contains("MVCC_READ_CONFLICT"));
            }
            other => panic!("expected RemoteExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unavailable_submit_is_rejected_and_ambiguous() {
        let transport = FakeTransport {
            submit: Reply::Fail(Status::unavailable("orderer connection reset")),
            ..Default::default()
        };
        let session = session(&transport);

        let err = submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Rejected {
                phase: Phase::Submit,
                code: Code::Unavailable,
                ..
            }
        ));
        assert!(err.is_ambiguous());
        assert_eq!(transport.calls(), vec!["endorse", "submit"]);
    }

    #[tokio::test]
    async fn remote_deadline_exceeded_is_a_timeout() {
        let transport = FakeTransport {
            endorse: Reply::Fail(Status::deadline_exceeded("endorsement timed out")),
            ..Default::default()
        };
        let session = session(&transport);

        let err = submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Timeout {
                phase: Phase::Endorse,
                ..
            }
        ));
        assert!(err.is_retriable());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_commit_status_times_out_after_commit_budget() {
        let transport = FakeTransport {
            commit: Reply::Hang,
            ..Default::default()
        };
        let session = session(&transport);

        let started = Instant::now();
        let err = submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap_err();
        let waited = started.elapsed();

        match &err {
            SubmissionError::Timeout {
                phase,
                transaction_id,
                after,
            } => {
                assert_eq!(*phase, Phase::Commit);
                assert!(transaction_id.is_some());
                assert_eq!(*after, Duration::from_secs(30));
            }
            other => panic!("expected commit timeout, got {other:?}"),
        }
        assert!(err.is_ambiguous());
        assert!(waited >= Duration::from_secs(30));
        assert!(waited < Duration::from_secs(31));

        session.close();
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_submit_never_exceeds_submit_budget() {
        let transport = FakeTransport {
            submit: Reply::Hang,
            ..Default::default()
        };
        let session = session(&transport);

        let started = Instant::now();
        let err = submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubmissionError::Timeout {
                phase: Phase::Submit,
                ..
            }
        ));
        assert!(started.elapsed() < Duration::from_secs(21));
        assert_eq!(transport.calls(), vec!["endorse", "submit"]);
    }

    #[tokio::test]
    async fn evaluate_returns_payload_without_ordering() {
        let transport = FakeTransport {
            result: br#"{"balance":5}"#.to_vec(),
            ..Default::default()
        };
        let session = session(&transport);
        let contract = session.network(CHANNEL).contract(CONTRACT);

        let payload = contract
            .evaluate(&TransactionRequest::new("GetToken", ["u1", "VITAL"]))
            .await
            .unwrap();
        assert_eq!(payload, br#"{"balance":5}"#);
        assert_eq!(transport.calls(), vec!["evaluate"]);
    }

    #[tokio::test]
    async fn evaluate_error_status_is_remote_execution_failure() {
        let transport = FakeTransport {
            evaluate_status: 500,
            ..Default::default()
        };
        let session = session(&transport);

        let err = session
            .network(CHANNEL)
            .contract(CONTRACT)
            .evaluate(&TransactionRequest::new("ReadEvent", ["evt-9"]))
            .await
            .unwrap_err();
        match err {
            SubmissionError::RemoteExecutionFailed { phase, message, .. } => {
                assert_eq!(phase, Phase::Evaluate);
                assert!(message.contains("status 500"));
            }
            other => panic!("expected RemoteExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn contract_not_found_error_is_remote_execution_failure() {
        let transport = FakeTransport {
            endorse: Reply::Fail(Status::aborted("chaincode response 500, user u1 not found")),
            ..Default::default()
        };
        let session = session(&transport);

        let args = vec![json!("u1"), json!("VITAL"), json!(5)];
        let err = submit(&session, CHANNEL, CONTRACT, "IncrementToken", args)
            .await
            .unwrap_err();
        match err {
            SubmissionError::RemoteExecutionFailed { phase, message, .. } => {
                assert_eq!(phase, Phase::Endorse);
                assert!(message.contains("user u1 not found"));
            }
            other => panic!("expected RemoteExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn evaluate_missing_record_is_remote_execution_failure() {
        let transport = FakeTransport {
            evaluate: Reply::Fail(Status::unknown(
                "evaluate call to endorser returned error: chaincode response 500, \
                 event evt-9 does not exist",
            )),
            ..Default::default()
        };
        let session = session(&transport);

        let err = session
            .network(CHANNEL)
            .contract(CONTRACT)
            .evaluate(&TransactionRequest::new("ReadEvent", ["evt-9"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::RemoteExecutionFailed {
                phase: Phase::Evaluate,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn not_found_after_endorsement_keeps_its_phase() {
        let transport = FakeTransport {
            commit: Reply::Fail(Status::not_found("transaction not submitted")),
            ..Default::default()
        };
        let committing = session(&transport);

        let err = submit(&committing, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Rejected {
                phase: Phase::Commit,
                code: Code::NotFound,
                ..
            }
        ));
        assert_eq!(err.phase(), Some(Phase::Commit));

        let transport = FakeTransport {
            submit: Reply::Fail(Status::not_found(format!("channel '{CHANNEL}' not found"))),
            ..Default::default()
        };
        let submitting = session(&transport);

        let err = submit(&submitting, CHANNEL, CONTRACT, "LogEvent", log_event_args())
            .await
            .unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Submit));
        assert!(!matches!(err, SubmissionError::UnknownTarget { .. }));
    }

    #[tokio::test]
    async fn empty_contract_name_is_unknown_target_without_network_calls() {
        let transport = FakeTransport::default();
        let session = session(&transport);

        let err = submit(&session, CHANNEL, "", "LogEvent", log_event_args())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::UnknownTarget { .. }));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn dropping_session_releases_transport_once() {
        let transport = FakeTransport::default();
        {
            let session = session(&transport);
            let _ = submit(&session, CHANNEL, CONTRACT, "LogEvent", log_event_args()).await;
        }
        assert_eq!(transport.close_count(), 1);
    }
}
