//! Transaction construction: proposal framing, argument encoding, transaction ids, and
//! extraction of the contract result from a prepared transaction.

use crate::error::{Phase, SubmissionError};
use crate::pb::common::{ChannelHeader, Envelope, Header, HeaderType, Payload, SignatureHeader};
use crate::pb::protos::{
    chaincode_spec, ChaincodeAction, ChaincodeActionPayload, ChaincodeHeaderExtension,
    ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec, ChaincodeProposalPayload,
    ChaincodeSpec, Proposal, ProposalResponsePayload, Transaction,
};
use chrono::Utc;
use prost::Message;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const NONCE_LEN: usize = 24;

/// A contract function call: a name and ordered, opaque JSON arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub function: String,
    pub args: Vec<Value>,
}

impl TransactionRequest {
    pub fn new<I, V>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Chaincode input: the function name followed by one compact JSON array holding every
    /// argument in order. The receiving contract decodes the same array.
    pub fn encode_args(&self) -> Result<Vec<Vec<u8>>, SubmissionError> {
        let blob = serde_json::to_vec(&self.args).map_err(|err| SubmissionError::Encoding {
            what: "transaction arguments",
            message: err.to_string(),
        })?;
        Ok(vec![self.function.as_bytes().to_vec(), blob])
    }
}

pub fn new_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Lowercase hex of `SHA-256(nonce || creator)`.
pub fn transaction_id(nonce: &[u8], creator: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator);
    hex::encode(hasher.finalize())
}

/// An unsigned proposal and the id the gateway will track it under.
#[derive(Debug, Clone)]
pub struct ProposalDraft {
    pub transaction_id: String,
    pub proposal_bytes: Vec<u8>,
}

pub fn build_proposal(
    channel: &str,
    contract: &str,
    creator: &[u8],
    request: &TransactionRequest,
) -> Result<ProposalDraft, SubmissionError> {
    build_proposal_with_nonce(channel, contract, creator, request, &new_nonce())
}

pub(crate) fn build_proposal_with_nonce(
    channel: &str,
    contract: &str,
    creator: &[u8],
    request: &TransactionRequest,
    nonce: &[u8],
) -> Result<ProposalDraft, SubmissionError> {
    let transaction_id = transaction_id(nonce, creator);
    let chaincode_id = ChaincodeId {
        name: contract.to_string(),
        ..Default::default()
    };

    let now = Utc::now();
    let channel_header = ChannelHeader {
        r#type: HeaderType::EndorserTransaction as i32,
        timestamp: Some(prost_types::Timestamp {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos() as i32,
        }),
        channel_id: channel.to_string(),
        tx_id: transaction_id.clone(),
        extension: ChaincodeHeaderExtension {
            chaincode_id: Some(chaincode_id.clone()),
        }
        .encode_to_vec(),
        ..Default::default()
    };
    let signature_header = SignatureHeader {
        creator: creator.to_vec(),
        nonce: nonce.to_vec(),
    };

    let invocation = ChaincodeInvocationSpec {
        chaincode_spec: Some(ChaincodeSpec {
            r#type: chaincode_spec::Type::Undefined as i32,
            chaincode_id: Some(chaincode_id),
            input: Some(ChaincodeInput {
                args: request.encode_args()?,
                ..Default::default()
            }),
            timeout: 0,
        }),
    };
    let payload = ChaincodeProposalPayload {
        input: invocation.encode_to_vec(),
        ..Default::default()
    };

    let proposal = Proposal {
        header: Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signature_header.encode_to_vec(),
        }
        .encode_to_vec(),
        payload: payload.encode_to_vec(),
        extension: Vec::new(),
    };

    Ok(ProposalDraft {
        transaction_id,
        proposal_bytes: proposal.encode_to_vec(),
    })
}

fn malformed(phase: Phase, what: &str, err: impl std::fmt::Display) -> SubmissionError {
    SubmissionError::MalformedResponse {
        phase,
        message: format!("{what}: {err}"),
    }
}

/// Walks a prepared transaction down to the contract's response payload.
pub fn extract_result(envelope: &Envelope) -> Result<Vec<u8>, SubmissionError> {
    let phase = Phase::Endorse;
    let payload = Payload::decode(envelope.payload.as_slice())
        .map_err(|err| malformed(phase, "payload", err))?;
    let transaction = Transaction::decode(payload.data.as_slice())
        .map_err(|err| malformed(phase, "transaction", err))?;
    let action = transaction
        .actions
        .first()
        .ok_or_else(|| malformed(phase, "transaction", "no actions"))?;
    let action_payload = ChaincodeActionPayload::decode(action.payload.as_slice())
        .map_err(|err| malformed(phase, "chaincode action payload", err))?;
    let endorsed = action_payload
        .action
        .ok_or_else(|| malformed(phase, "chaincode action payload", "no endorsed action"))?;
    let response_payload =
        ProposalResponsePayload::decode(endorsed.proposal_response_payload.as_slice())
            .map_err(|err| malformed(phase, "proposal response payload", err))?;
    let chaincode_action = ChaincodeAction::decode(response_payload.extension.as_slice())
        .map_err(|err| malformed(phase, "chaincode action", err))?;

    Ok(chaincode_action
        .response
        .map(|response| response.payload)
        .unwrap_or_default())
}
