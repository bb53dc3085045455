//! Replay determinism: the same message stream with the same block times
//! must produce byte-identical repository state and an identical event log
//! on a fresh engine.

mod common;

use chronovault::conditions::{CompareOp, UnlockCondition};
use chronovault::engine::{BlockContext, CapsuleEngine};
use chronovault::interfaces::OracleValue;
use chronovault::types::capsule_types::CapsuleKind;
use chronovault::types::message_types::{
    ApproveTransfer, BatchTransfer, BatchTransferItem, EmergencyVoidCondition, TouchActivity,
    TransferCapsule,
};

use common::{base_create, host_with, open_msg, shares_for, test_params, TestHost};

const T0: u64 = 2_000_000;

fn ctx(time: u64, height: u64) -> BlockContext {
    BlockContext::new(time, height)
}

/// Drives a representative message stream: creations of every kind,
/// transfers, approvals, an emergency void, opens and ticks.
fn run_scripted_session(host: &TestHost) {
    let engine = &host.engine;

    // block 1: create one capsule of each kind
    let mut timelock = base_create("alice", CapsuleKind::TimeLock);
    timelock.recipient = Some("bob".into());
    timelock.unlock_time = Some(T0 + 60);
    let tl = engine.create_capsule(&ctx(T0, 1), timelock).unwrap().capsule_id;

    let safe = engine
        .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
        .unwrap()
        .capsule_id;

    let mut dms = base_create("alice", CapsuleKind::DeadMansSwitch);
    dms.recipient = Some("carol".into());
    dms.inactivity_period_secs = Some(100);
    dms.expires_at = Some(T0 + 10_000);
    let dms = engine.create_capsule(&ctx(T0, 1), dms).unwrap().capsule_id;

    let mut conditional = base_create("alice", CapsuleKind::Conditional);
    conditional.condition_ref = Some("policy#42".into());
    conditional.condition = Some(UnlockCondition::Oracle {
        feed: "policy-42".into(),
        operator: CompareOp::Eq,
        expected: OracleValue::Int(1),
    });
    let cond = engine
        .create_capsule(&ctx(T0, 1), conditional)
        .unwrap()
        .capsule_id;

    engine.process_block_tick(&ctx(T0, 1)).unwrap();

    // block 2: activity, a direct transfer, a pending transfer
    engine
        .touch_activity(
            &ctx(T0 + 10, 2),
            TouchActivity {
                owner: "alice".into(),
                capsule_id: dms,
            },
        )
        .unwrap();
    engine
        .transfer_capsule(
            &ctx(T0 + 10, 2),
            TransferCapsule {
                from: "alice".into(),
                to: "bob".into(),
                capsule_id: safe,
            },
        )
        .unwrap();
    let pending = engine
        .batch_transfer(
            &ctx(T0 + 10, 2),
            BatchTransfer {
                from: "alice".into(),
                transfers: vec![BatchTransferItem {
                    capsule_id: tl,
                    to: "bob".into(),
                    message: Some("custody handover".into()),
                }],
                transfer_fee: None,
                needs_approval: true,
            },
        )
        .unwrap()
        .pending[0]
        .clone();
    engine.process_block_tick(&ctx(T0 + 10, 2)).unwrap();

    // block 3: reject the pending transfer, void the conditional capsule
    engine
        .approve_transfer(
            &ctx(T0 + 20, 3),
            ApproveTransfer {
                approver: "bob".into(),
                transfer_id: pending,
                capsule_id: tl,
                approved: false,
            },
        )
        .unwrap();
    engine
        .emergency_void_condition(
            &ctx(T0 + 20, 3),
            EmergencyVoidCondition {
                owner: "alice".into(),
                capsule_id: cond,
                reason: "oracle compromised".into(),
                confirmation_code: host.confirmation.expected_code(cond, "alice"),
            },
        )
        .unwrap();
    engine.process_block_tick(&ctx(T0 + 20, 3)).unwrap();

    // block 4: opens
    engine
        .open_capsule(
            &ctx(T0 + 60, 4),
            open_msg("bob", tl, shares_for(engine, tl)[..2].to_vec()),
        )
        .unwrap();
    engine
        .open_capsule(
            &ctx(T0 + 60, 4),
            open_msg("alice", cond, shares_for(engine, cond)[..2].to_vec()),
        )
        .unwrap();
    engine.process_block_tick(&ctx(T0 + 60, 4)).unwrap();
}

#[test]
fn replaying_the_stream_reproduces_state_and_events_byte_for_byte() {
    let a = host_with(test_params(), [21u8; 32]);
    let b = host_with(test_params(), [21u8; 32]);

    run_scripted_session(&a);
    run_scripted_session(&b);

    assert_eq!(a.engine.snapshot_bytes(), b.engine.snapshot_bytes());
    assert_eq!(a.engine.event_log(), b.engine.event_log());
    assert!(!a.engine.event_log().is_empty());

    a.engine.audit_invariants().unwrap();
    b.engine.audit_invariants().unwrap();
}

#[test]
fn different_entropy_seeds_produce_different_ciphertexts() {
    let a = host_with(test_params(), [1u8; 32]);
    let b = host_with(test_params(), [2u8; 32]);

    run_scripted_session(&a);
    run_scripted_session(&b);

    assert_ne!(a.engine.snapshot_bytes(), b.engine.snapshot_bytes());
}

#[test]
fn reconstructed_plaintext_is_identical_across_replicas() {
    let a = host_with(test_params(), [9u8; 32]);
    let b = host_with(test_params(), [9u8; 32]);

    for host in [&a, &b] {
        host.engine
            .create_capsule(&ctx(T0, 1), base_create("alice", CapsuleKind::Safe))
            .unwrap();
    }

    let open = |engine: &CapsuleEngine| {
        engine
            .open_capsule(
                &ctx(T0 + 1, 2),
                open_msg("alice", 1, shares_for(engine, 1)[..2].to_vec()),
            )
            .unwrap()
            .data
    };
    assert_eq!(open(&a.engine), open(&b.engine));
}
