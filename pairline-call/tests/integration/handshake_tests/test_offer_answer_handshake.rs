use crate::integration::{init_tracing, wait_for_status, wait_until};
use crate::utils::endpoint;
use pairline_call::{CallConfig, CallController};
use pairline_core::{CallStatus, SignalKind};
use pairline_relay::{MemorySignalStore, SignalStore};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn full_offer_answer_handshake() {
    init_tracing();

    let store = Arc::new(MemorySignalStore::new());
    let alice = endpoint("alice");

    let caller = CallController::call(
        "alice".into(),
        "bob".into(),
        store.clone(),
        alice.devices.as_ref(),
        alice.transports.as_ref(),
        CallConfig::default(),
    )
    .await
    .expect("caller setup failed");

    // Exactly one offer is parked in the callee's mailbox.
    let pending = store
        .read_pending(&"bob".into(), caller.call_id())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, SignalKind::Offer);
    assert_eq!(pending[0].payload, "offer-from-alice");

    let bob = endpoint("bob");
    let callee = CallController::join(
        "bob".into(),
        "alice".into(),
        caller.call_id().clone(),
        store.clone(),
        bob.devices.as_ref(),
        bob.transports.as_ref(),
        CallConfig::default(),
    )
    .await
    .expect("callee setup failed");

    // Callee polls the offer and answers; caller polls the answer back.
    wait_until(|| bob.transports.transport().remote_description().is_some())
        .await
        .expect("condition not reached");
    assert_eq!(
        bob.transports.transport().remote_description().unwrap(),
        "offer-from-alice"
    );

    wait_until(|| alice.transports.transport().remote_description().is_some())
        .await
        .expect("condition not reached");
    assert_eq!(
        alice.transports.transport().remote_description().unwrap(),
        "answer-from-bob"
    );

    // Each signal was consumed exactly once: nothing left in the store.
    wait_until(|| store.is_empty()).await.expect("condition not reached");

    // Connected is declared on transport readiness, not on any signal.
    let mut caller_status = caller.status();
    let mut callee_status = callee.status();
    assert_ne!(*caller_status.borrow(), CallStatus::Connected);

    alice.transports.transport().emit_ready().await;
    bob.transports.transport().emit_ready().await;
    wait_for_status(&mut caller_status, CallStatus::Connected).await.expect("status not reached");
    wait_for_status(&mut callee_status, CallStatus::Connected).await.expect("status not reached");

    // Candidates keep trickling after the descriptions are exchanged.
    alice.transports.transport().emit_candidate("cand-late").await;
    wait_until(|| {
        bob.transports
            .transport()
            .applied_candidates()
            .contains(&"cand-late".to_string())
    })
    .await
    .expect("late candidate never applied");

    caller.hangup().await;
    callee.hangup().await;
}
