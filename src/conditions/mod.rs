//! Typed unlock predicates.
//!
//! Predicates form a closed enumeration: time locks, inactivity windows,
//! signature quorums, oracle comparisons, and boolean composites over them.
//! They are immutable after validation and evaluate as a pure fold over the
//! evaluation environment; no predicate touches the repository.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::interfaces::{OracleReader, OracleValue, SignatureVerifier};
use crate::types::capsule_types::validate_address;
use crate::types::error::{CapsuleError, ConditionDiagnostic, Result};
use crate::types::message_types::PresentedSignature;

/// Comparison operator for oracle predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean connective for composite predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

/// The closed set of unlock predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnlockCondition {
    /// Passes once block time reaches `unlock_time`.
    Time { unlock_time: u64 },

    /// Passes once `inactivity_secs` (+ grace) elapse after the last
    /// recorded owner activity.
    Inactivity { inactivity_secs: u64, grace_secs: u64 },

    /// Passes when at least `required_sigs` distinct authorized signers
    /// present valid signatures over the open message.
    MultiSig {
        required_sigs: u32,
        signers: Vec<String>,
    },

    /// Passes when the named oracle feed compares true against `expected`.
    Oracle {
        feed: String,
        operator: CompareOp,
        expected: OracleValue,
    },

    /// Boolean combination of other predicates. `Not` takes exactly one
    /// child; `And`/`Or` take one or more.
    Composite {
        operator: BoolOp,
        children: Vec<UnlockCondition>,
    },
}

/// Everything a predicate may consult during evaluation.
pub struct EvalEnv<'a> {
    pub block_time: u64,
    pub block_height: u64,
    pub capsule_id: u64,
    /// Last recorded owner activity, for inactivity predicates.
    pub last_activity_at: Option<u64>,
    pub signatures: &'a [PresentedSignature],
    /// Opaque proof parameters the opener attached to the request.
    pub proof_params: &'a BTreeMap<String, String>,
    pub oracle: &'a dyn OracleReader,
    pub signature_verifier: &'a dyn SignatureVerifier,
}

impl EvalEnv<'_> {
    /// Canonical message multi-sig openers sign:
    /// `be64(capsule_id) || "open" || be64(block_height)`.
    pub fn open_message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(20);
        msg.extend_from_slice(&self.capsule_id.to_be_bytes());
        msg.extend_from_slice(b"open");
        msg.extend_from_slice(&self.block_height.to_be_bytes());
        msg
    }
}

impl UnlockCondition {
    /// Structural validation; pure, no environment access.
    pub fn validate(&self) -> Result<()> {
        match self {
            UnlockCondition::Time { unlock_time } => {
                if *unlock_time == 0 {
                    return Err(CapsuleError::invalid_timelock("unlock time cannot be zero"));
                }
            }
            UnlockCondition::Inactivity { inactivity_secs, .. } => {
                if *inactivity_secs == 0 {
                    return Err(CapsuleError::invalid_kind(
                        "inactivity period must be at least one second",
                    ));
                }
            }
            UnlockCondition::MultiSig {
                required_sigs,
                signers,
            } => {
                if *required_sigs == 0 {
                    return Err(CapsuleError::invalid_threshold(
                        "multi-sig predicate requires at least one signature",
                    ));
                }
                if signers.is_empty() {
                    return Err(CapsuleError::invalid_kind("empty signer set"));
                }
                for signer in signers {
                    validate_address(signer)?;
                }
                let mut distinct = signers.clone();
                distinct.sort();
                distinct.dedup();
                if *required_sigs as usize > distinct.len() {
                    return Err(CapsuleError::invalid_threshold(
                        "required signatures exceed distinct signer count",
                    ));
                }
            }
            UnlockCondition::Oracle { feed, .. } => {
                if feed.is_empty() {
                    return Err(CapsuleError::bad_metadata("oracle feed name cannot be empty"));
                }
            }
            UnlockCondition::Composite { operator, children } => {
                if children.is_empty() {
                    return Err(CapsuleError::bad_metadata(
                        "composite predicate needs at least one child",
                    ));
                }
                if *operator == BoolOp::Not && children.len() != 1 {
                    return Err(CapsuleError::bad_metadata(
                        "NOT takes exactly one child predicate",
                    ));
                }
                for child in children {
                    child.validate()?;
                }
            }
        }
        Ok(())
    }

    /// Evaluates the predicate against the environment.
    pub fn evaluate(&self, env: &EvalEnv<'_>) -> Result<bool> {
        match self {
            UnlockCondition::Time { unlock_time } => Ok(env.block_time >= *unlock_time),

            UnlockCondition::Inactivity {
                inactivity_secs,
                grace_secs,
            } => {
                let last = match env.last_activity_at {
                    Some(t) => t,
                    None => return Ok(false),
                };
                let deadline = last
                    .saturating_add(*inactivity_secs)
                    .saturating_add(*grace_secs);
                Ok(env.block_time >= deadline)
            }

            UnlockCondition::MultiSig {
                required_sigs,
                signers,
            } => Ok(count_valid_signatures(signers, env) >= *required_sigs),

            UnlockCondition::Oracle {
                feed,
                operator,
                expected,
            } => {
                let actual = env.oracle.read(feed)?;
                match compare_values(&actual, expected, *operator) {
                    Some(result) => Ok(result),
                    None => Err(CapsuleError::condition_not_met(ConditionDiagnostic::new(
                        format!("oracle feed {} returned a mismatched value type", feed),
                    ))),
                }
            }

            UnlockCondition::Composite { operator, children } => match operator {
                BoolOp::And => {
                    for child in children {
                        if !child.evaluate(env)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                BoolOp::Or => {
                    // erroring children do not veto an OR
                    for child in children {
                        if let Ok(true) = child.evaluate(env) {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                BoolOp::Not => {
                    let inner = children[0].evaluate(env)?;
                    Ok(!inner)
                }
            },
        }
    }

    /// Explains a false evaluation in structured form.
    pub fn diagnose(&self, env: &EvalEnv<'_>) -> ConditionDiagnostic {
        match self {
            UnlockCondition::Time { unlock_time } => ConditionDiagnostic::with_remaining(
                "capsule is still time-locked",
                unlock_time.saturating_sub(env.block_time),
            ),
            UnlockCondition::Inactivity {
                inactivity_secs,
                grace_secs,
            } => match env.last_activity_at {
                Some(last) => {
                    let deadline = last
                        .saturating_add(*inactivity_secs)
                        .saturating_add(*grace_secs);
                    ConditionDiagnostic::with_remaining(
                        "owner is still considered active",
                        deadline.saturating_sub(env.block_time),
                    )
                }
                None => ConditionDiagnostic::new("no activity record"),
            },
            UnlockCondition::MultiSig {
                required_sigs,
                signers,
            } => {
                let have = count_valid_signatures(signers, env);
                ConditionDiagnostic::with_missing_signatures(
                    "signature quorum not reached",
                    required_sigs.saturating_sub(have),
                )
            }
            UnlockCondition::Oracle { feed, .. } => {
                ConditionDiagnostic::new(format!("oracle condition on feed {} not met", feed))
            }
            UnlockCondition::Composite { .. } => {
                ConditionDiagnostic::new("composite predicate not satisfied")
            }
        }
    }
}

/// Counts distinct authorized signers with a valid signature over the open
/// message. Duplicate presentations of the same signer count once.
fn count_valid_signatures(signers: &[String], env: &EvalEnv<'_>) -> u32 {
    let message = env.open_message();
    let mut seen: Vec<&str> = Vec::new();
    let mut valid = 0u32;
    for presented in env.signatures {
        if !signers.iter().any(|s| s == &presented.signer) {
            continue;
        }
        if seen.contains(&presented.signer.as_str()) {
            continue;
        }
        if env
            .signature_verifier
            .verify(&presented.signer, &message, &presented.signature)
        {
            seen.push(&presented.signer);
            valid += 1;
        }
    }
    valid
}

fn compare_values(actual: &OracleValue, expected: &OracleValue, op: CompareOp) -> Option<bool> {
    match (actual, expected) {
        (OracleValue::Int(a), OracleValue::Int(b)) => Some(compare_ordered(a, b, op)),
        (OracleValue::Text(a), OracleValue::Text(b)) => Some(compare_ordered(a, b, op)),
        _ => None,
    }
}

fn compare_ordered<T: Ord>(a: &T, b: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}
