use crate::error::{Phase, SubmissionError};

/// Enforces resolve->serialize->(evaluate | endorse->submit->commit) ordering for one
/// transaction, so a phase can never start before its predecessor finished.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    channel: String,
    contract: String,
    current: Option<Phase>,
}

impl PhaseMachine {
    pub fn new(channel: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            contract: contract.into(),
            current: None,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    pub fn mark_resolve(&mut self) -> Result<(), SubmissionError> {
        self.advance(None, Phase::Resolve)
    }

    pub fn mark_serialize(&mut self) -> Result<(), SubmissionError> {
        self.advance(Some(Phase::Resolve), Phase::Serialize)
    }

    pub fn mark_evaluate(&mut self) -> Result<(), SubmissionError> {
        self.advance(Some(Phase::Serialize), Phase::Evaluate)
    }

    pub fn mark_endorse(&mut self) -> Result<(), SubmissionError> {
        self.advance(Some(Phase::Serialize), Phase::Endorse)
    }

    pub fn mark_submit(&mut self) -> Result<(), SubmissionError> {
        self.advance(Some(Phase::Endorse), Phase::Submit)
    }

    pub fn mark_commit(&mut self) -> Result<(), SubmissionError> {
        self.advance(Some(Phase::Submit), Phase::Commit)
    }

    fn advance(&mut self, expected: Option<Phase>, next: Phase) -> Result<(), SubmissionError> {
        if self.current != expected {
            return Err(SubmissionError::PhaseOrder {
                expected: stage_name(expected),
                actual: stage_name(self.current),
            });
        }
        self.current = Some(next);
        Ok(())
    }
}

fn stage_name(phase: Option<Phase>) -> &'static str {
    phase.map(Phase::name).unwrap_or("initialized")
}
