//! Capsule lifecycle transitions: create, open, cancel, touch-activity and
//! emergency void.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{info, warn};

use crate::conditions::{EvalEnv, UnlockCondition};
use crate::crypto::{self, shamir, SecretKey};
use crate::engine::{authorization, BlockContext, CapsuleEngine};
use crate::interfaces::BlobMetadata;
use crate::storage::StoreTxn;
use crate::types::capsule_types::{Capsule, CapsuleKind, CapsuleStatus, ConditionContract};
use crate::types::error::{CapsuleError, Result};
use crate::types::event_types::Event;
use crate::types::message_types::{
    CancelCapsule, CreateCapsule, CreateCapsuleResponse, EmergencyVoidCondition, OpenCapsule,
    OpenCapsuleResponse, TouchActivity,
};
use crate::types::params::{EngineParams, MAX_PLAINTEXT_CEILING};
use crate::types::transfer_types::{EmergencyAction, EmergencyActionKind};

impl CapsuleEngine {
    /// Creates a capsule: encrypts the payload, splits the key into
    /// custodian shares, and persists everything atomically.
    pub fn create_capsule(
        &self,
        ctx: &BlockContext,
        msg: CreateCapsule,
    ) -> Result<CreateCapsuleResponse> {
        msg.validate_basic()?;
        let params = self.params_snapshot();
        validate_create_preconditions(ctx, &msg, &params)?;

        let mut txn = self.store().begin();
        let mut events = Vec::new();

        let capsule_id = txn.peek_next_capsule_id()?;
        let plaintext_digest = crypto::hash(&msg.plaintext);
        let plaintext_size = msg.plaintext.len() as u64;

        // All per-capsule randomness flows from this seed; replays with the
        // same message stream and block times reproduce it exactly.
        let seed = crypto::derive_entropy_seed(
            self.entropy_seed(),
            "capsule-create",
            &[
                &capsule_id.to_be_bytes(),
                &ctx.time.to_be_bytes(),
                &plaintext_digest,
            ],
        );
        let mut rng = ChaCha20Rng::from_seed(seed);

        let key = crypto::generate_key(&mut rng);
        let sealed = crypto::encrypt(&msg.plaintext, &key, &mut rng)?;
        let algorithm = sealed.algorithm;
        let ciphertext_version = sealed.version;

        let metadata = BlobMetadata {
            capsule_id,
            content_len: sealed.ciphertext.len() as u64,
            created_at: ctx.time,
        };
        let binding = self.payload_store().store(
            sealed.ciphertext,
            sealed.nonce,
            plaintext_size,
            params.inline_threshold,
            &metadata,
        )?;

        let shares = shamir::split(key.as_bytes(), msg.threshold, msg.total_shares, &mut rng)?;

        let allocated = txn.next_capsule_id()?;
        if allocated != capsule_id {
            return Err(CapsuleError::internal_invariant(
                "capsule counter moved between peek and allocation",
            ));
        }

        let share_holders = self.custodians().select(capsule_id, msg.total_shares);
        if share_holders.len() != msg.total_shares as usize {
            return Err(CapsuleError::internal_invariant(
                "custodian selector returned the wrong number of holders",
            ));
        }

        let capsule = Capsule {
            id: capsule_id,
            owner: msg.owner.clone(),
            recipient: msg.recipient.clone(),
            kind: msg.kind,
            status: CapsuleStatus::Active,
            payload: binding,
            plaintext_digest,
            algorithm,
            ciphertext_version,
            plaintext_size,
            threshold: msg.threshold,
            total_shares: msg.total_shares,
            share_holders: share_holders.clone(),
            unlock_time: msg.unlock_time,
            condition_ref: msg.condition_ref.clone(),
            required_sigs: msg.required_sigs,
            authorized_signers: msg.authorized_signers.clone(),
            inactivity_period_secs: msg.inactivity_period_secs,
            grace_period_secs: msg.grace_period_secs,
            last_activity_at: (msg.kind == CapsuleKind::DeadMansSwitch).then_some(ctx.time),
            expires_at: msg.expires_at,
            created_at: ctx.time,
            updated_at: ctx.time,
            title: msg.title.clone().unwrap_or_default(),
            description: msg.description.clone().unwrap_or_default(),
            tags: msg.tags.clone(),
            metadata: msg.metadata.clone(),
        };
        capsule.validate()?;

        // Register the condition body, first writer wins.
        if msg.kind == CapsuleKind::Conditional {
            if let (Some(address), Some(condition)) = (&msg.condition_ref, &msg.condition) {
                if txn.get_condition_contract(address).is_err() {
                    txn.put_condition_contract(&ConditionContract {
                        address: address.clone(),
                        condition: condition.clone(),
                        created_by: msg.owner.clone(),
                        created_at: ctx.time,
                    })?;
                }
            }
        }

        txn.insert_capsule_new(&capsule)?;

        for (index, share) in shares.iter().enumerate() {
            let share_index = index as u32;
            let custodian_id = share_holders[index].clone();
            txn.insert_key_share_new(&crate::types::capsule_types::KeyShareRecord {
                capsule_id,
                share_index,
                custodian_id: custodian_id.clone(),
                share_bytes: share.to_bytes(),
                created_at: ctx.time,
            })?;
            events.push(Event::ShareDistributed {
                capsule_id,
                custodian_id,
                share_index,
                block_time: ctx.time,
            });
        }

        txn.index_owner(&msg.owner, capsule_id);

        if !params.creation_fee.is_zero() {
            self.accounting()
                .debit(&msg.owner, &params.creation_fee)
                .map_err(|e| CapsuleError::fee_debit_failed(e.to_string()))?;
        }

        events.push(Event::CapsuleCreated {
            capsule_id,
            owner: msg.owner.clone(),
            recipient: msg.recipient.clone(),
            kind: msg.kind,
            plaintext_digest,
            block_time: ctx.time,
        });

        txn.commit();
        self.record_events(events);
        info!(
            capsule_id,
            owner = %msg.owner,
            kind = %msg.kind,
            size = plaintext_size,
            "capsule created"
        );
        Ok(CreateCapsuleResponse { capsule_id })
    }

    /// Opens a capsule: authorization, predicate, share reconstruction,
    /// decryption and the terminal transition, in that order.
    pub fn open_capsule(&self, ctx: &BlockContext, msg: OpenCapsule) -> Result<OpenCapsuleResponse> {
        msg.validate_basic()?;
        let mut txn = self.store().begin();
        let mut capsule = txn.get_capsule(msg.capsule_id)?;

        // A voided conditional capsule is the one unlocked state that still
        // admits an open.
        let post_void = capsule.kind == CapsuleKind::Conditional
            && capsule.status == CapsuleStatus::Unlocked
            && capsule.condition_ref.as_deref().unwrap_or("").is_empty();
        if capsule.status != CapsuleStatus::Active && !post_void {
            return Err(CapsuleError::already_terminal(capsule.status));
        }

        authorization::authorize_open(&capsule, &msg.accessor, post_void)?;

        if !post_void {
            if let Some(condition) = condition_for(&capsule, &txn)? {
                let env = EvalEnv {
                    block_time: ctx.time,
                    block_height: ctx.height,
                    capsule_id: capsule.id,
                    last_activity_at: capsule.last_activity_at,
                    signatures: &msg.signatures,
                    proof_params: &msg.condition_proof,
                    oracle: self.oracle(),
                    signature_verifier: self.signature_verifier(),
                };
                if !condition.evaluate(&env)? {
                    return Err(CapsuleError::condition_not_met(condition.diagnose(&env)));
                }
            }
        }

        let plaintext = self.reconstruct_plaintext(&txn, &capsule, &msg)?;

        if capsule.status == CapsuleStatus::Active {
            capsule.status = CapsuleStatus::Unlocked;
        }
        capsule.updated_at = ctx.time;
        txn.put_capsule(&capsule)?;

        txn.commit();
        self.record_events(vec![Event::CapsuleOpened {
            capsule_id: msg.capsule_id,
            accessor: msg.accessor.clone(),
            block_time: ctx.time,
        }]);
        info!(capsule_id = msg.capsule_id, accessor = %msg.accessor, "capsule opened");
        Ok(OpenCapsuleResponse { data: plaintext })
    }

    /// Validates presented shares, rebuilds the key, loads and decrypts the
    /// ciphertext and checks the plaintext digest.
    fn reconstruct_plaintext(
        &self,
        txn: &StoreTxn<'_>,
        capsule: &Capsule,
        msg: &OpenCapsule,
    ) -> Result<Vec<u8>> {
        let needed = capsule.threshold;
        if (msg.shares.len() as u32) < needed {
            return Err(CapsuleError::InsufficientShares {
                needed,
                got: msg.shares.len() as u32,
            });
        }

        let mut presented = msg.shares.clone();
        presented.sort_by_key(|s| s.share_index);
        for pair in presented.windows(2) {
            if pair[0].share_index == pair[1].share_index {
                return Err(CapsuleError::invalid_share(format!(
                    "share index {} presented twice",
                    pair[0].share_index
                )));
            }
        }

        let mut parsed = Vec::with_capacity(needed as usize);
        for share in &presented {
            if share.share_index >= capsule.total_shares {
                return Err(CapsuleError::invalid_share(format!(
                    "share index {} out of range for capsule {}",
                    share.share_index, capsule.id
                )));
            }
            // the share must be one this capsule actually distributed
            txn.get_key_share(capsule.id, share.share_index)?;
            let decoded = shamir::Share::from_bytes(&share.bytes)?;
            if decoded.index_hint() != Some(share.share_index + 1) {
                return Err(CapsuleError::invalid_share(format!(
                    "share x coordinate does not match index {}",
                    share.share_index
                )));
            }
            parsed.push(decoded);
            if parsed.len() == needed as usize {
                break;
            }
        }

        // zeroized on every exit below
        let key = SecretKey::from_bytes(shamir::combine(&parsed)?);

        let ciphertext = self.payload_store().load(&capsule.payload)?;
        let plaintext = crypto::decrypt(
            &ciphertext,
            capsule.payload.nonce(),
            &key,
            capsule.algorithm,
            capsule.ciphertext_version,
        )?;

        if !crypto::verify_integrity(&plaintext, &capsule.plaintext_digest) {
            warn!(capsule_id = capsule.id, "plaintext digest mismatch after decrypt");
            return Err(CapsuleError::integrity_violation(
                "decrypted payload does not match the recorded digest",
            ));
        }
        Ok(plaintext)
    }

    /// Cancels an active capsule. Payload data is retained for audit but
    /// the capsule can never be opened again.
    pub fn cancel_capsule(&self, ctx: &BlockContext, msg: CancelCapsule) -> Result<()> {
        msg.validate_basic()?;
        let mut txn = self.store().begin();
        let mut capsule = txn.get_capsule(msg.capsule_id)?;
        authorization::require_owner(&capsule, &msg.owner, "cancel")?;
        if capsule.status != CapsuleStatus::Active {
            return Err(CapsuleError::already_terminal(capsule.status));
        }

        capsule.status = CapsuleStatus::Cancelled;
        capsule.updated_at = ctx.time;
        txn.put_capsule(&capsule)?;

        let reason = msg.reason.unwrap_or_default();
        txn.commit();
        self.record_events(vec![Event::CapsuleCancelled {
            capsule_id: msg.capsule_id,
            owner: msg.owner.clone(),
            reason,
            block_time: ctx.time,
        }]);
        info!(capsule_id = msg.capsule_id, "capsule cancelled");
        Ok(())
    }

    /// Records owner activity on a dead man's switch capsule.
    pub fn touch_activity(&self, ctx: &BlockContext, msg: TouchActivity) -> Result<()> {
        msg.validate_basic()?;
        let mut txn = self.store().begin();
        let mut capsule = txn.get_capsule(msg.capsule_id)?;
        authorization::require_owner(&capsule, &msg.owner, "touch")?;
        if capsule.kind != CapsuleKind::DeadMansSwitch {
            return Err(CapsuleError::wrong_kind(
                "activity applies only to dead man's switch capsules",
            ));
        }
        if capsule.status != CapsuleStatus::Active {
            return Err(CapsuleError::already_terminal(capsule.status));
        }

        capsule.touch_activity(ctx.time);
        txn.put_capsule(&capsule)?;
        txn.commit();
        Ok(())
    }

    /// Irreversibly voids the condition contract of a conditional capsule,
    /// leaving it openable by the owner.
    pub fn emergency_void_condition(
        &self,
        ctx: &BlockContext,
        msg: EmergencyVoidCondition,
    ) -> Result<()> {
        msg.validate_basic()?;
        let mut txn = self.store().begin();
        let mut capsule = txn.get_capsule(msg.capsule_id)?;

        if capsule.kind != CapsuleKind::Conditional {
            return Err(CapsuleError::wrong_kind(
                "emergency void applies only to conditional capsules",
            ));
        }
        authorization::require_owner(&capsule, &msg.owner, "void")?;
        if capsule.status != CapsuleStatus::Active {
            return Err(CapsuleError::already_terminal(capsule.status));
        }
        if capsule.condition_ref.as_deref().unwrap_or("").is_empty() {
            return Err(CapsuleError::wrong_kind("no condition to void"));
        }

        // structural shape first, host semantics second
        let expected_prefix = format!("EMERGENCY_VOID_{}_", capsule.id);
        let suffix = msg
            .confirmation_code
            .strip_prefix(&expected_prefix)
            .unwrap_or("");
        if suffix.is_empty() {
            return Err(CapsuleError::unauthorized("malformed confirmation code"));
        }
        if !self
            .confirmation()
            .validate(&msg.confirmation_code, capsule.id, &msg.owner)
        {
            return Err(CapsuleError::unauthorized("confirmation code rejected"));
        }

        let action_id = format!("emergency_{}_{}", capsule.id, ctx.height);
        txn.insert_emergency_action_new(&EmergencyAction {
            action_id: action_id.clone(),
            capsule_id: capsule.id,
            actor: msg.owner.clone(),
            kind: EmergencyActionKind::VoidCondition,
            reason: msg.reason.clone(),
            confirmation_code: msg.confirmation_code.clone(),
            committed_at: ctx.time,
            block_height: ctx.height,
            irreversible: true,
        })?;

        capsule.condition_ref = None;
        capsule.status = CapsuleStatus::Unlocked;
        capsule.updated_at = ctx.time;
        txn.put_capsule(&capsule)?;

        txn.commit();
        self.record_events(vec![Event::EmergencyConditionVoided {
            capsule_id: msg.capsule_id,
            actor: msg.owner.clone(),
            action_id,
            block_time: ctx.time,
        }]);
        warn!(
            capsule_id = msg.capsule_id,
            actor = %msg.owner,
            reason = %msg.reason,
            "emergency condition void executed"
        );
        Ok(())
    }
}

fn validate_create_preconditions(
    ctx: &BlockContext,
    msg: &CreateCapsule,
    params: &EngineParams,
) -> Result<()> {
    if !params.kind_allowed(msg.kind) {
        return Err(CapsuleError::invalid_kind(format!(
            "capsule kind {} not allowed",
            msg.kind
        )));
    }

    let size = msg.plaintext.len() as u64;
    if size > MAX_PLAINTEXT_CEILING {
        return Err(CapsuleError::PayloadTooLarge {
            size,
            max: MAX_PLAINTEXT_CEILING,
        });
    }
    if size > params.max_plaintext_size {
        return Err(CapsuleError::PayloadTooLarge {
            size,
            max: params.max_plaintext_size,
        });
    }

    if msg.threshold == 0 {
        return Err(CapsuleError::ThresholdZero);
    }
    if msg.threshold < params.min_threshold {
        return Err(CapsuleError::invalid_threshold(format!(
            "threshold {} below minimum {}",
            msg.threshold, params.min_threshold
        )));
    }
    if msg.total_shares > params.max_shares {
        return Err(CapsuleError::invalid_threshold(format!(
            "total shares {} exceed maximum {}",
            msg.total_shares, params.max_shares
        )));
    }
    if msg.threshold > msg.total_shares {
        return Err(CapsuleError::ThresholdTooLarge {
            threshold: msg.threshold,
            total: msg.total_shares,
        });
    }

    match msg.kind {
        CapsuleKind::Safe => {}
        CapsuleKind::TimeLock => {
            let unlock_time = msg
                .unlock_time
                .ok_or_else(|| CapsuleError::invalid_timelock("unlock time required"))?;
            if unlock_time <= ctx.time {
                return Err(CapsuleError::invalid_timelock(
                    "unlock time must be in the future",
                ));
            }
            if unlock_time - ctx.time > params.max_capsule_duration_secs {
                return Err(CapsuleError::invalid_timelock(format!(
                    "unlock time exceeds the maximum duration of {} seconds",
                    params.max_capsule_duration_secs
                )));
            }
        }
        CapsuleKind::Conditional => {
            if msg.condition_ref.as_deref().unwrap_or("").is_empty() {
                return Err(CapsuleError::invalid_kind(
                    "conditional capsule requires a condition reference",
                ));
            }
            if let Some(condition) = &msg.condition {
                condition.validate()?;
            }
        }
        CapsuleKind::MultiSig => {
            let required = msg.required_sigs.unwrap_or(0);
            if required == 0 {
                return Err(CapsuleError::invalid_threshold(
                    "multi-sig capsule must require at least one signature",
                ));
            }
            let mut distinct = msg.authorized_signers.clone();
            distinct.sort();
            distinct.dedup();
            if distinct.is_empty() || (required as usize) > distinct.len() {
                return Err(CapsuleError::invalid_threshold(
                    "required signatures exceed distinct authorized signers",
                ));
            }
        }
        CapsuleKind::DeadMansSwitch => {
            let period = msg.inactivity_period_secs.unwrap_or(0);
            if period < params.min_inactivity_secs || period > params.max_inactivity_secs {
                return Err(CapsuleError::invalid_kind(format!(
                    "inactivity period must be within [{}, {}] seconds",
                    params.min_inactivity_secs, params.max_inactivity_secs
                )));
            }
            if msg.recipient.is_none() {
                return Err(CapsuleError::invalid_kind(
                    "dead man's switch capsule requires a recipient",
                ));
            }
        }
    }

    if let Some(expires_at) = msg.expires_at {
        if expires_at <= ctx.time {
            return Err(CapsuleError::invalid_timelock(
                "expiry must be in the future",
            ));
        }
    }

    Ok(())
}

/// The predicate gating an open of this capsule, when the kind has one.
fn condition_for(capsule: &Capsule, txn: &StoreTxn<'_>) -> Result<Option<UnlockCondition>> {
    match capsule.kind {
        CapsuleKind::Safe => Ok(None),
        CapsuleKind::TimeLock => {
            let unlock_time = capsule.unlock_time.ok_or_else(|| {
                CapsuleError::internal_invariant("time-locked capsule missing unlock time")
            })?;
            Ok(Some(UnlockCondition::Time { unlock_time }))
        }
        CapsuleKind::Conditional => {
            let address = capsule.condition_ref.as_deref().ok_or_else(|| {
                CapsuleError::internal_invariant("conditional capsule missing condition reference")
            })?;
            let contract = txn.get_condition_contract(address)?;
            Ok(Some(contract.condition))
        }
        CapsuleKind::MultiSig => {
            let required_sigs = capsule.required_sigs.ok_or_else(|| {
                CapsuleError::internal_invariant("multi-sig capsule missing quorum")
            })?;
            Ok(Some(UnlockCondition::MultiSig {
                required_sigs,
                signers: capsule.authorized_signers.clone(),
            }))
        }
        CapsuleKind::DeadMansSwitch => {
            let inactivity_secs = capsule.inactivity_period_secs.ok_or_else(|| {
                CapsuleError::internal_invariant("dead man's switch missing inactivity period")
            })?;
            Ok(Some(UnlockCondition::Inactivity {
                inactivity_secs,
                grace_secs: capsule.grace_period_secs.unwrap_or(0),
            }))
        }
    }
}
