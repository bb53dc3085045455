//! End-to-end scenarios for the capsule engine: lifecycle, custody,
//! transfers and emergency flows against in-memory collaborators.

mod common;

use chronovault::conditions::{CompareOp, UnlockCondition};
use chronovault::engine::BlockContext;
use chronovault::interfaces::OracleValue;
use chronovault::types::capsule_types::{CapsuleKind, CapsuleStatus};
use chronovault::types::error::CapsuleError;
use chronovault::types::message_types::{
    ApproveTransfer, BatchTransfer, BatchTransferItem, CancelCapsule, EmergencyVoidCondition,
    PresentedSignature, TouchActivity, TransferCapsule,
};
use chronovault::types::params::Coin;

use common::{base_create, host, open_msg, open_message, shares_for};

const T0: u64 = 1_000_000;

fn ctx(time: u64, height: u64) -> BlockContext {
    BlockContext::new(time, height)
}

#[test]
fn timelock_happy_path() {
    // S1: alice locks "hello" for bob until T0 + 60
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::TimeLock);
    msg.recipient = Some("bob".into());
    msg.unlock_time = Some(T0 + 60);
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    let capsule = host.engine.get_capsule(id).unwrap();
    assert_eq!(capsule.status, CapsuleStatus::Active);
    assert_eq!(capsule.total_shares as usize, shares_for(&host.engine, id).len());

    // too early: structured diagnostic with the remaining time
    let early = host
        .engine
        .open_capsule(&ctx(T0 + 30, 2), open_msg("bob", id, shares_for(&host.engine, id)[..2].to_vec()));
    match early {
        Err(CapsuleError::ConditionNotMet { diagnostic }) => {
            assert_eq!(diagnostic.remaining_secs, Some(30));
        }
        other => panic!("expected ConditionNotMet, got {:?}", other),
    }

    // on time: plaintext returned, capsule unlocked
    let opened = host
        .engine
        .open_capsule(&ctx(T0 + 60, 3), open_msg("bob", id, shares_for(&host.engine, id)[..2].to_vec()))
        .unwrap();
    assert_eq!(opened.data, b"hello");
    assert_eq!(
        host.engine.get_capsule(id).unwrap().status,
        CapsuleStatus::Unlocked
    );

    // replaying the open hits the terminal status
    let replay = host
        .engine
        .open_capsule(&ctx(T0 + 60, 3), open_msg("bob", id, shares_for(&host.engine, id)[..2].to_vec()));
    assert!(matches!(replay, Err(CapsuleError::AlreadyTerminal { .. })));
}

#[test]
fn insufficient_and_tampered_shares() {
    // S2
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::TimeLock);
    msg.recipient = Some("bob".into());
    msg.unlock_time = Some(T0 + 60);
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    let shares = shares_for(&host.engine, id);

    // one share is below the threshold of two
    let few = host
        .engine
        .open_capsule(&ctx(T0 + 120, 2), open_msg("bob", id, shares[..1].to_vec()));
    assert!(matches!(
        few,
        Err(CapsuleError::InsufficientShares { needed: 2, got: 1 })
    ));

    // a flipped byte in y must never yield plaintext
    let mut tampered = shares[..2].to_vec();
    let last = tampered[1].bytes.len() - 1;
    tampered[1].bytes[last] ^= 0x40;
    let result = host
        .engine
        .open_capsule(&ctx(T0 + 120, 2), open_msg("bob", id, tampered));
    assert!(matches!(
        result,
        Err(CapsuleError::DecryptionFailure)
            | Err(CapsuleError::IntegrityViolation { .. })
            | Err(CapsuleError::ShareOutOfField { .. })
    ));
    // and the capsule is still locked
    assert_eq!(
        host.engine.get_capsule(id).unwrap().status,
        CapsuleStatus::Active
    );
}

#[test]
fn dead_mans_switch_fires_after_inactivity() {
    // S3: inactivity 100 s, activity touch at +50 re-arms the switch
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::DeadMansSwitch);
    msg.recipient = Some("carol".into());
    msg.inactivity_period_secs = Some(100);
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    host.engine
        .touch_activity(
            &ctx(T0 + 50, 2),
            TouchActivity {
                owner: "alice".into(),
                capsule_id: id,
            },
        )
        .unwrap();
    assert_eq!(
        host.engine.get_capsule(id).unwrap().last_activity_at,
        Some(T0 + 50)
    );

    // owner cannot open a dead man's switch at all
    let by_owner = host
        .engine
        .open_capsule(&ctx(T0 + 149, 3), open_msg("alice", id, shares_for(&host.engine, id)[..2].to_vec()));
    assert!(matches!(by_owner, Err(CapsuleError::Unauthorized { .. })));

    // recipient too early
    let early = host
        .engine
        .open_capsule(&ctx(T0 + 149, 3), open_msg("carol", id, shares_for(&host.engine, id)[..2].to_vec()));
    assert!(matches!(early, Err(CapsuleError::ConditionNotMet { .. })));

    // recipient after the window
    let opened = host
        .engine
        .open_capsule(&ctx(T0 + 151, 4), open_msg("carol", id, shares_for(&host.engine, id)[..2].to_vec()))
        .unwrap();
    assert_eq!(opened.data, b"hello");
    assert_eq!(
        host.engine.get_capsule(id).unwrap().status,
        CapsuleStatus::Unlocked
    );
}

#[test]
fn touch_activity_is_idempotent_within_a_block() {
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::DeadMansSwitch);
    msg.recipient = Some("carol".into());
    msg.inactivity_period_secs = Some(100);
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    let touch = TouchActivity {
        owner: "alice".into(),
        capsule_id: id,
    };
    host.engine.touch_activity(&ctx(T0 + 10, 2), touch.clone()).unwrap();
    let first = host.engine.get_capsule(id).unwrap().last_activity_at;
    host.engine.touch_activity(&ctx(T0 + 10, 2), touch).unwrap();
    assert_eq!(host.engine.get_capsule(id).unwrap().last_activity_at, first);
}

#[test]
fn batch_transfer_with_partial_failures() {
    // S4: one good item, one missing capsule, one cancelled capsule
    let host = host();
    let a = host
        .engine
        .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
        .unwrap()
        .capsule_id;
    let b = host
        .engine
        .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
        .unwrap()
        .capsule_id;
    host.engine
        .cancel_capsule(
            &ctx(T0 + 1, 2),
            CancelCapsule {
                owner: "alice".into(),
                capsule_id: b,
                reason: None,
            },
        )
        .unwrap();

    let debits_before = host.accounting.debits().len();
    let response = host
        .engine
        .batch_transfer(
            &ctx(T0 + 2, 3),
            BatchTransfer {
                from: "alice".into(),
                transfers: vec![
                    BatchTransferItem {
                        capsule_id: a,
                        to: "bob".into(),
                        message: None,
                    },
                    BatchTransferItem {
                        capsule_id: 99,
                        to: "dave".into(),
                        message: None,
                    },
                    BatchTransferItem {
                        capsule_id: b,
                        to: "eve".into(),
                        message: None,
                    },
                ],
                transfer_fee: Some(Coin::new("stake", 500)),
                needs_approval: false,
            },
        )
        .unwrap();

    assert_eq!(response.transferred, vec![a]);
    assert_eq!(response.failed.len(), 2);
    assert_eq!(response.failed[0].code, "capsule_not_found");
    assert_eq!(response.failed[1].code, "already_terminal");

    // the fee was debited exactly once
    let debits = host.accounting.debits();
    assert_eq!(debits.len(), debits_before + 1);
    assert_eq!(debits.last().unwrap().1, Coin::new("stake", 500));

    // exactly one history entry; ownership and index moved
    assert_eq!(host.engine.list_transfer_history().unwrap().len(), 1);
    host.engine.audit_invariants().unwrap();
    assert_eq!(host.engine.get_capsule(a).unwrap().owner, "bob");
    let bob_ids: Vec<u64> = host
        .engine
        .list_capsules_by_owner("bob", Default::default())
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(bob_ids, vec![a]);
    let alice_ids: Vec<u64> = host
        .engine
        .list_capsules_by_owner("alice", Default::default())
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(alice_ids, vec![b]);
}

#[test]
fn emergency_void_then_owner_open() {
    // S5
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::Conditional);
    msg.condition_ref = Some("policy#42".into());
    msg.condition = Some(UnlockCondition::Oracle {
        feed: "policy-42".into(),
        operator: CompareOp::Eq,
        expected: OracleValue::Int(1),
    });
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    // the oracle reports 0, so the condition gates the open
    let gated = host
        .engine
        .open_capsule(&ctx(T0 + 5, 2), open_msg("alice", id, shares_for(&host.engine, id)[..2].to_vec()));
    assert!(matches!(gated, Err(CapsuleError::ConditionNotMet { .. })));

    // a bad confirmation code is refused
    let refused = host.engine.emergency_void_condition(
        &ctx(T0 + 6, 3),
        EmergencyVoidCondition {
            owner: "alice".into(),
            capsule_id: id,
            reason: "oracle compromised".into(),
            confirmation_code: format!("EMERGENCY_VOID_{}_wrong", id),
        },
    );
    assert!(matches!(refused, Err(CapsuleError::Unauthorized { .. })));

    // the host-derived code voids the condition
    host.engine
        .emergency_void_condition(
            &ctx(T0 + 6, 3),
            EmergencyVoidCondition {
                owner: "alice".into(),
                capsule_id: id,
                reason: "oracle compromised".into(),
                confirmation_code: host.confirmation.expected_code(id, "alice"),
            },
        )
        .unwrap();

    let capsule = host.engine.get_capsule(id).unwrap();
    assert_eq!(capsule.status, CapsuleStatus::Unlocked);
    assert_eq!(capsule.condition_ref, None);

    let actions = host.engine.list_emergency_actions().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].capsule_id, id);
    assert!(actions[0].irreversible);

    // only the owner may open a voided capsule
    let not_owner = host
        .engine
        .open_capsule(&ctx(T0 + 7, 4), open_msg("bob", id, shares_for(&host.engine, id)[..2].to_vec()));
    assert!(matches!(not_owner, Err(CapsuleError::Unauthorized { .. })));

    let opened = host
        .engine
        .open_capsule(&ctx(T0 + 7, 4), open_msg("alice", id, shares_for(&host.engine, id)[..2].to_vec()))
        .unwrap();
    assert_eq!(opened.data, b"hello");
}

#[test]
fn multisig_requires_a_quorum_of_valid_signatures() {
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::MultiSig);
    msg.required_sigs = Some(2);
    msg.authorized_signers = vec!["sig-a".into(), "sig-b".into(), "sig-c".into()];
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    let height = 2;
    let message = open_message(id, height);
    let shares = shares_for(&host.engine, id);

    // outsiders are not permitted at all
    let outsider = host
        .engine
        .open_capsule(&ctx(T0 + 1, height), open_msg("alice", id, shares[..2].to_vec()));
    assert!(matches!(outsider, Err(CapsuleError::Unauthorized { .. })));

    // one valid signature is below the quorum
    let mut open = open_msg("sig-a", id, shares[..2].to_vec());
    open.signatures = vec![PresentedSignature {
        signer: "sig-a".into(),
        signature: host.verifier.sign("sig-a", &message),
    }];
    let short = host.engine.open_capsule(&ctx(T0 + 1, height), open.clone());
    match short {
        Err(CapsuleError::ConditionNotMet { diagnostic }) => {
            assert_eq!(diagnostic.missing_signatures, Some(1));
        }
        other => panic!("expected ConditionNotMet, got {:?}", other),
    }

    // two distinct valid signatures meet it
    open.signatures.push(PresentedSignature {
        signer: "sig-b".into(),
        signature: host.verifier.sign("sig-b", &message),
    });
    let opened = host.engine.open_capsule(&ctx(T0 + 1, height), open).unwrap();
    assert_eq!(opened.data, b"hello");
}

#[test]
fn approval_flow_and_expiry() {
    let host = host();
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
        .unwrap()
        .capsule_id;

    let response = host
        .engine
        .batch_transfer(
            &ctx(T0 + 1, 2),
            BatchTransfer {
                from: "alice".into(),
                transfers: vec![BatchTransferItem {
                    capsule_id: id,
                    to: "bob".into(),
                    message: Some("take over".into()),
                }],
                transfer_fee: None,
                needs_approval: true,
            },
        )
        .unwrap();
    let transfer_id = response.pending[0].clone();

    // the capsule is not re-owned yet
    assert_eq!(host.engine.get_capsule(id).unwrap().owner, "alice");

    // only the recipient may approve
    let wrong = host.engine.approve_transfer(
        &ctx(T0 + 2, 3),
        ApproveTransfer {
            approver: "eve".into(),
            transfer_id: transfer_id.clone(),
            capsule_id: id,
            approved: true,
        },
    );
    assert!(matches!(wrong, Err(CapsuleError::Unauthorized { .. })));

    host.engine
        .approve_transfer(
            &ctx(T0 + 2, 3),
            ApproveTransfer {
                approver: "bob".into(),
                transfer_id: transfer_id.clone(),
                capsule_id: id,
                approved: true,
            },
        )
        .unwrap();
    assert_eq!(host.engine.get_capsule(id).unwrap().owner, "bob");

    // re-approval is a terminal no-op
    let replay = host.engine.approve_transfer(
        &ctx(T0 + 2, 3),
        ApproveTransfer {
            approver: "bob".into(),
            transfer_id,
            capsule_id: id,
            approved: true,
        },
    );
    assert!(matches!(replay, Err(CapsuleError::AlreadyTerminal { .. })));
}

#[test]
fn pending_transfers_expire_in_the_tick() {
    let host = host();
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
        .unwrap()
        .capsule_id;
    let window = host.engine.get_params().pending_approval_window_secs;

    let response = host
        .engine
        .batch_transfer(
            &ctx(T0 + 1, 2),
            BatchTransfer {
                from: "alice".into(),
                transfers: vec![BatchTransferItem {
                    capsule_id: id,
                    to: "bob".into(),
                    message: None,
                }],
                transfer_fee: None,
                needs_approval: true,
            },
        )
        .unwrap();
    let transfer_id = response.pending[0].clone();

    // a late approval fails and mutates nothing
    let late = host.engine.approve_transfer(
        &ctx(T0 + 1 + window, 3),
        ApproveTransfer {
            approver: "bob".into(),
            transfer_id: transfer_id.clone(),
            capsule_id: id,
            approved: true,
        },
    );
    assert!(matches!(late, Err(CapsuleError::PendingTransferExpired { .. })));
    assert_eq!(
        host.engine
            .get_pending_transfer(&transfer_id)
            .unwrap()
            .status
            .as_str(),
        "pending"
    );

    // the tick performs the expiry
    host.engine.process_block_tick(&ctx(T0 + 1 + window, 3)).unwrap();
    assert_eq!(
        host.engine
            .get_pending_transfer(&transfer_id)
            .unwrap()
            .status
            .as_str(),
        "expired"
    );
    assert_eq!(host.engine.get_capsule(id).unwrap().owner, "alice");

    // and approving afterwards is terminal
    let after = host.engine.approve_transfer(
        &ctx(T0 + 2 + window, 4),
        ApproveTransfer {
            approver: "bob".into(),
            transfer_id,
            capsule_id: id,
            approved: true,
        },
    );
    assert!(matches!(after, Err(CapsuleError::AlreadyTerminal { .. })));
}

#[test]
fn dead_mans_switch_hard_expiry_via_tick() {
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::DeadMansSwitch);
    msg.recipient = Some("carol".into());
    msg.inactivity_period_secs = Some(100);
    msg.expires_at = Some(T0 + 500);
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    host.engine.process_block_tick(&ctx(T0 + 499, 2)).unwrap();
    assert_eq!(
        host.engine.get_capsule(id).unwrap().status,
        CapsuleStatus::Active
    );

    host.engine.process_block_tick(&ctx(T0 + 500, 3)).unwrap();
    assert_eq!(
        host.engine.get_capsule(id).unwrap().status,
        CapsuleStatus::Expired
    );

    // expired capsules are no longer openable, even by the recipient
    let opened = host
        .engine
        .open_capsule(&ctx(T0 + 600, 4), open_msg("carol", id, shares_for(&host.engine, id)[..2].to_vec()));
    assert!(matches!(opened, Err(CapsuleError::AlreadyTerminal { .. })));
}

#[test]
fn payload_size_boundaries() {
    let mut params = common::test_params();
    params.max_plaintext_size = 64;
    let host = common::host_with(params, [7u8; 32]);

    let mut at_limit = base_create("alice", CapsuleKind::Safe);
    at_limit.plaintext = vec![1u8; 64];
    host.engine.create_capsule(&ctx(T0, 1), at_limit).unwrap();

    let mut over = base_create("alice", CapsuleKind::Safe);
    over.plaintext = vec![1u8; 65];
    assert!(matches!(
        host.engine.create_capsule(&ctx(T0, 1), over),
        Err(CapsuleError::PayloadTooLarge { size: 65, max: 64 })
    ));
}

#[test]
fn timelock_boundaries() {
    let host = host();
    let mut at_now = base_create("alice", CapsuleKind::TimeLock);
    at_now.unlock_time = Some(T0);
    assert!(matches!(
        host.engine.create_capsule(&ctx(T0, 1), at_now),
        Err(CapsuleError::InvalidTimelock { .. })
    ));

    let mut next_second = base_create("alice", CapsuleKind::TimeLock);
    next_second.unlock_time = Some(T0 + 1);
    host.engine.create_capsule(&ctx(T0, 1), next_second).unwrap();
}

#[test]
fn large_payloads_are_stored_externally_and_open() {
    let mut params = common::test_params();
    params.inline_threshold = 16;
    let host = common::host_with(params, [7u8; 32]);

    let mut msg = base_create("alice", CapsuleKind::Safe);
    msg.plaintext = vec![0xC3u8; 4096];
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    assert!(!host.engine.get_capsule(id).unwrap().payload.is_inline());
    assert_eq!(host.blobs.len(), 1);

    let opened = host
        .engine
        .open_capsule(&ctx(T0 + 1, 2), open_msg("alice", id, shares_for(&host.engine, id)[..2].to_vec()))
        .unwrap();
    assert_eq!(opened.data, vec![0xC3u8; 4096]);
}

#[test]
fn direct_transfer_updates_owner_index_exactly_once() {
    let host = host();
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
        .unwrap()
        .capsule_id;

    host.engine
        .transfer_capsule(
            &ctx(T0 + 1, 2),
            TransferCapsule {
                from: "alice".into(),
                to: "bob".into(),
                capsule_id: id,
            },
        )
        .unwrap();

    assert!(host
        .engine
        .list_capsules_by_owner("alice", Default::default())
        .unwrap()
        .is_empty());
    assert_eq!(
        host.engine
            .list_capsules_by_owner("bob", Default::default())
            .unwrap()
            .len(),
        1
    );

    // the old owner can no longer transfer it
    let stale = host.engine.transfer_capsule(
        &ctx(T0 + 2, 3),
        TransferCapsule {
            from: "alice".into(),
            to: "carol".into(),
            capsule_id: id,
        },
    );
    assert!(matches!(stale, Err(CapsuleError::Unauthorized { .. })));
}

#[test]
fn cancelled_capsules_are_never_openable_again() {
    let host = host();
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
        .unwrap()
        .capsule_id;
    host.engine
        .cancel_capsule(
            &ctx(T0 + 1, 2),
            CancelCapsule {
                owner: "alice".into(),
                capsule_id: id,
                reason: Some("obsolete".into()),
            },
        )
        .unwrap();

    let opened = host
        .engine
        .open_capsule(&ctx(T0 + 2, 3), open_msg("alice", id, shares_for(&host.engine, id)[..2].to_vec()));
    assert!(matches!(opened, Err(CapsuleError::AlreadyTerminal { .. })));

    // cancelling twice is terminal too
    let again = host.engine.cancel_capsule(
        &ctx(T0 + 3, 4),
        CancelCapsule {
            owner: "alice".into(),
            capsule_id: id,
            reason: None,
        },
    );
    assert!(matches!(again, Err(CapsuleError::AlreadyTerminal { .. })));
}

#[test]
fn share_records_match_total_shares_and_stats_add_up() {
    let host = host();
    let mut msg = base_create("alice", CapsuleKind::Safe);
    msg.threshold = 3;
    msg.total_shares = 7;
    let id = host
        .engine
        .create_capsule(&ctx(T0, 1), msg)
        .unwrap()
        .capsule_id;

    let shares = host.engine.list_key_shares(id).unwrap();
    assert_eq!(shares.len(), 7);
    for (i, record) in shares.iter().enumerate() {
        assert_eq!(record.share_index, i as u32);
        assert_eq!(record.capsule_id, id);
        assert_eq!(record.custodian_id, format!("custodian-{}", i));
    }

    let stats = host.engine.stats().unwrap();
    assert_eq!(stats.capsules.total_capsules, 1);
    assert_eq!(stats.capsules.active_capsules, 1);
    assert_eq!(stats.capsules.kind_distribution["safe"], 1);
}

#[test]
fn creation_fee_failures_roll_back_everything() {
    // an accounting collaborator that refuses the debit
    use chronovault::interfaces::{Accounting, PlaceholderCustodians};
    use chronovault::types::params::Coin;
    use std::sync::Arc;

    struct BrokeAccounting;
    impl Accounting for BrokeAccounting {
        fn debit(&self, _account: &str, _amount: &Coin) -> chronovault::Result<()> {
            Err(CapsuleError::fee_debit_failed("insufficient funds"))
        }
        fn transfer(&self, _account: &str, _amount: &Coin) -> chronovault::Result<()> {
            Ok(())
        }
    }

    let engine = chronovault::CapsuleEngine::new(
        chronovault::EngineConfig {
            entropy_seed: [7u8; 32],
            params: common::test_params(),
        },
        Arc::new(chronovault::payload::MemoryBlobStore::new()),
        Arc::new(BrokeAccounting),
        Arc::new(chronovault::interfaces::StaticOracle::default()),
        Arc::new(chronovault::interfaces::HmacConfirmationValidator::new([6u8; 32])),
        Arc::new(chronovault::interfaces::KeyedSignatureVerifier::new([5u8; 32])),
        Arc::new(PlaceholderCustodians),
    )
    .unwrap();

    let result = engine.create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe));
    assert!(matches!(result, Err(CapsuleError::FeeDebitFailed { .. })));

    // nothing persisted, no events
    assert!(matches!(
        engine.get_capsule(1),
        Err(CapsuleError::CapsuleNotFound { id: 1 })
    ));
    assert!(engine.list_key_shares(1).unwrap().is_empty());
    assert!(engine.event_log().is_empty());
}
